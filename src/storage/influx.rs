use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::InfluxConfig;
use crate::models::Table;
use crate::query::Query;
use crate::storage::annotated_csv::parse_tables;
use crate::storage::{EventStore, StoreError, StoreResult};

/// InfluxDB v2 HTTP API client.
///
/// Flux is posted to `/api/v2/query` and the annotated CSV response is decoded
/// into tables. The client is cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct InfluxStore {
    client: Client,
    query_url: Url,
    health_url: Url,
    token: Option<String>,
}

impl InfluxStore {
    pub fn new(config: &InfluxConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("insite-realtime-read/0.1.0")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client for InfluxDB")?;

        let base = config.url.trim_end_matches('/');
        let mut query_url =
            Url::parse(&format!("{base}/api/v2/query")).context("Invalid INFLUX_URL")?;
        query_url.query_pairs_mut().append_pair("org", &config.org);
        let health_url = Url::parse(&format!("{base}/health")).context("Invalid INFLUX_URL")?;

        Ok(Self {
            client,
            query_url,
            health_url,
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Token {token}")),
            None => request,
        }
    }
}

#[async_trait]
impl EventStore for InfluxStore {
    async fn execute(&self, query: &Query) -> StoreResult<Vec<Table>> {
        let flux = query.to_flux();
        debug!("Executing flux query:\n{}", flux);

        let body = json!({
            "query": flux,
            "type": "flux",
            "dialect": {
                "header": true,
                "annotations": ["datatype", "group", "default"],
            },
        });

        let response = self
            .authorize(self.client.post(self.query_url.clone()))
            .header("Accept", "application/csv")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        check_status(status, &text)?;

        parse_tables(&text)
    }

    async fn health(&self) -> StoreResult<()> {
        let response = self
            .client
            .get(self.health_url.clone())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(StoreError::Unavailable(format!("health check {status}: {text}")))
        }
    }
}

fn transport_error(e: reqwest::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn check_status(status: StatusCode, body: &str) -> StoreResult<()> {
    if status.is_success() {
        return Ok(());
    }

    let message = format!("InfluxDB error {status}: {}", body.trim());
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Err(StoreError::Unavailable(message))
    } else {
        Err(StoreError::Query(message))
    }
}
