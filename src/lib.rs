pub mod analytics;
pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod query;
pub mod storage;

use std::sync::Arc;

use crate::config::Config;
use crate::storage::{EventStore, InfluxStore};

/// Build the InfluxDB store handle shared by the read path
pub fn build_store(config: &Config) -> anyhow::Result<Arc<dyn EventStore>> {
    tracing::info!("Using InfluxDB store: {}", config.influx.url);
    Ok(Arc::new(InfluxStore::new(&config.influx)?))
}

/// Initialize tracing from `RUST_LOG`, defaulting to `info`
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InfluxConfig, ServerConfig, ValidationConfig};
    use crate::storage::StoreError;

    fn config(url: &str) -> Config {
        Config {
            influx: InfluxConfig {
                url: url.to_string(),
                org: "insite".to_string(),
                token: None,
                bucket: "insite".to_string(),
                timeout_secs: 2,
            },
            api_server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            validation: ValidationConfig::disabled(),
        }
    }

    #[tokio::test]
    async fn test_build_store_targets_influx() {
        // nothing listens on port 1, so only a remote store reports itself unavailable
        let store = build_store(&config("http://127.0.0.1:1")).unwrap();
        assert!(matches!(
            store.health().await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn test_build_store_rejects_bad_url() {
        assert!(build_store(&config("not a url")).is_err());
    }
}
