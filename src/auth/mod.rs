//! Best-effort access checks for the analytics read path
//!
//! Every read asks the member service whether the caller owns the application
//! token. The answer is advisory: rejections, transport errors and timeouts are
//! logged and reported as an [`AccessOutcome`], and the read proceeds anyway so
//! analytics stay available while the member service is degraded.

pub mod member;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::{ValidationConfig, ValidationMode};

pub use member::HttpMemberValidator;

#[async_trait]
pub trait MemberValidator: Send + Sync {
    /// Succeeds when `member_id` may read analytics for `application_token`
    async fn validate(&self, member_id: i64, application_token: &str) -> Result<()>;
}

/// Validator used when validation is disabled
pub struct AllowAllValidator;

#[async_trait]
impl MemberValidator for AllowAllValidator {
    async fn validate(&self, _member_id: i64, _application_token: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    Granted,
    /// The validator failed or refused; carries its message
    Rejected(String),
    TimedOut,
}

impl AccessOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessOutcome::Granted)
    }
}

pub struct AccessGuard {
    validator: Arc<dyn MemberValidator>,
    timeout: Duration,
}

impl AccessGuard {
    pub fn new(validator: Arc<dyn MemberValidator>, timeout: Duration) -> Self {
        Self { validator, timeout }
    }

    pub fn allow_all() -> Self {
        let config = ValidationConfig::disabled();
        Self::new(
            Arc::new(AllowAllValidator),
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn from_config(config: &ValidationConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        match config.mode {
            ValidationMode::None => Ok(Self::new(Arc::new(AllowAllValidator), timeout)),
            ValidationMode::Member => {
                let url = config.member_service_url.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("member validation enabled without MEMBER_SERVICE_URL")
                })?;
                let validator = HttpMemberValidator::new(url, timeout)?;
                Ok(Self::new(Arc::new(validator), timeout))
            }
        }
    }

    /// Run the validator under the guard's timeout. Never fails.
    pub async fn check(&self, member_id: i64, application_token: &str) -> AccessOutcome {
        let validation = self.validator.validate(member_id, application_token);

        match tokio::time::timeout(self.timeout, validation).await {
            Ok(Ok(())) => {
                debug!(member_id, "Member validation passed");
                AccessOutcome::Granted
            }
            Ok(Err(e)) => {
                error!(
                    member_id,
                    "Member validation failed, continuing without authorization: {:#}", e
                );
                AccessOutcome::Rejected(format!("{e:#}"))
            }
            Err(_) => {
                warn!(
                    member_id,
                    "Member validation timed out after {:?}, continuing without authorization",
                    self.timeout
                );
                AccessOutcome::TimedOut
            }
        }
    }
}
