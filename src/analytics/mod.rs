//! Analytics over application interaction events
//!
//! [`AnalyticsService`] is the entry point for the four read operations. Each
//! one runs the best-effort access check, queries the event store and reduces
//! the returned tables with one of the functions in [`aggregator`].

pub mod aggregator;
pub mod service;

use thiserror::Error;

use crate::models::DecodeError;
use crate::storage::StoreError;

pub use service::AnalyticsService;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// No records qualified where a result needs at least one
    #[error("no data recorded for this application")]
    NoData,
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The store returned a record whose value could not be decoded
    #[error("malformed record: {0}")]
    Decode(#[from] DecodeError),
}

impl AnalyticsError {
    pub fn is_no_data(&self) -> bool {
        matches!(self, AnalyticsError::NoData)
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
