use crate::models::Table;
use crate::query::Query;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Store could not be reached or failed server-side
    #[error("time-series store unavailable: {0}")]
    Unavailable(String),
    /// Store rejected the query or returned something unreadable
    #[error("query failed: {0}")]
    Query(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Run a query and return its result tables in store order
    async fn execute(&self, query: &Query) -> StoreResult<Vec<Table>>;

    /// Check that the store is reachable
    async fn health(&self) -> StoreResult<()>;
}
