use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub influx: InfluxConfig,
    pub api_server: ServerConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    pub url: String,
    pub org: String,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    pub bucket: String,
    #[serde(default = "InfluxConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    None,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub mode: ValidationMode,
    /// Base URL of the member service, required in `member` mode
    #[serde(default)]
    pub member_service_url: Option<String>,
    /// Upper bound on a single validation call; the read path never waits longer
    #[serde(default = "ValidationConfig::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl InfluxConfig {
    const fn default_timeout_secs() -> u64 {
        30
    }
}

impl ValidationConfig {
    const fn default_timeout_ms() -> u64 {
        2000
    }

    pub fn disabled() -> Self {
        Self {
            mode: ValidationMode::None,
            member_service_url: None,
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let influx = InfluxConfig {
            url: std::env::var("INFLUX_URL")
                .unwrap_or_else(|_| "http://localhost:8086".to_string()),
            org: std::env::var("INFLUX_ORG").unwrap_or_default(),
            token: std::env::var("INFLUX_TOKEN").ok(),
            bucket: std::env::var("INFLUX_BUCKET").unwrap_or_else(|_| "insite".to_string()),
            timeout_secs: std::env::var("INFLUX_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or_else(InfluxConfig::default_timeout_secs),
        };

        if influx.org.is_empty() {
            tracing::warn!(
                "INFLUX_ORG is not set; queries will use the token's default organization"
            );
        }

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let mode = match std::env::var("VALIDATION_MODE")
            .unwrap_or_else(|_| "none".to_string())
            .to_lowercase()
            .as_str()
        {
            "none" => ValidationMode::None,
            "member" => ValidationMode::Member,
            other => {
                tracing::warn!(
                    "Unknown VALIDATION_MODE '{other}', falling back to 'none'. Supported values: none, member"
                );
                ValidationMode::None
            }
        };

        let member_service_url = if mode == ValidationMode::Member {
            Some(
                std::env::var("MEMBER_SERVICE_URL")
                    .context("MEMBER_SERVICE_URL must be set when VALIDATION_MODE=member")?,
            )
        } else {
            None
        };

        let timeout_ms = std::env::var("VALIDATION_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(ValidationConfig::default_timeout_ms);

        Ok(Config {
            influx,
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            validation: ValidationConfig {
                mode,
                member_service_url,
                timeout_ms,
            },
        })
    }
}
