use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;

use super::MemberValidator;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MemberValidRequest<'a> {
    application_token: &'a str,
}

/// Asks the member service whether a member owns an application
#[derive(Clone)]
pub struct HttpMemberValidator {
    client: Client,
    validation_url: Url,
}

impl HttpMemberValidator {
    pub fn new(member_service_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("insite-member-validator/0.1.0")
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for member validation")?;

        let base = member_service_url.trim_end_matches('/');
        let validation_url = Url::parse(&format!("{base}/api/v1/member/validation"))
            .context("Invalid MEMBER_SERVICE_URL")?;

        Ok(Self {
            client,
            validation_url,
        })
    }
}

#[async_trait]
impl MemberValidator for HttpMemberValidator {
    async fn validate(&self, member_id: i64, application_token: &str) -> Result<()> {
        let response = self
            .client
            .post(self.validation_url.clone())
            .header("X-Member-Id", member_id.to_string())
            .json(&MemberValidRequest { application_token })
            .send()
            .await
            .context("member service request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("member service rejected validation ({status}): {}", body.trim());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_url() {
        let validator =
            HttpMemberValidator::new("http://member:8081/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            validator.validation_url.as_str(),
            "http://member:8081/api/v1/member/validation"
        );
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_string(&MemberValidRequest {
            application_token: "app-1",
        })
        .unwrap();
        assert_eq!(body, r#"{"applicationToken":"app-1"}"#);
    }

    #[tokio::test]
    async fn test_unreachable_service_fails() {
        let validator =
            HttpMemberValidator::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        assert!(validator.validate(1, "app").await.is_err());
    }
}
