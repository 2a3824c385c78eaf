use std::sync::Arc;
use tracing::debug;

use crate::analytics::{aggregator, AnalyticsResult};
use crate::auth::AccessGuard;
use crate::models::{fields, AbnormalFlag, Distribution, ResponseTime, Table};
use crate::query::Query;
use crate::storage::EventStore;

/// Marker columns of the abnormal measurement, in lookup order
const ABNORMAL_MARKERS: &[&str] = &[fields::IS_READ, fields::CREATE_TIME];

/// Read-side facade over the event store.
///
/// Holds shared handles only, so clones are cheap and calls can run
/// concurrently without coordination.
#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn EventStore>,
    guard: Arc<AccessGuard>,
    bucket: String,
}

impl AnalyticsService {
    pub fn new(
        store: Arc<dyn EventStore>,
        guard: Arc<AccessGuard>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            store,
            guard,
            bucket: bucket.into(),
        }
    }

    pub async fn response_time(
        &self,
        member_id: i64,
        token: &str,
    ) -> AnalyticsResult<ResponseTime> {
        self.guard.check(member_id, token).await;
        let tables = self.run(Query::response_time(&self.bucket, token)).await?;
        aggregator::average_response_time(&tables)
    }

    /// Where visitors came from (`beforeUrl`)
    pub async fn referrer_distribution(
        &self,
        member_id: i64,
        token: &str,
    ) -> AnalyticsResult<Distribution> {
        self.guard.check(member_id, token).await;
        let query = Query::distribution(&self.bucket, token, fields::BEFORE_URL);
        let tables = self.run(query).await?;
        aggregator::distribution(&tables, fields::BEFORE_URL)
    }

    /// Which pages visitors are on (`currentUrl`)
    pub async fn page_distribution(
        &self,
        member_id: i64,
        token: &str,
    ) -> AnalyticsResult<Distribution> {
        self.guard.check(member_id, token).await;
        let query = Query::distribution(&self.bucket, token, fields::CURRENT_URL);
        let tables = self.run(query).await?;
        aggregator::distribution(&tables, fields::CURRENT_URL)
    }

    pub async fn abnormal_flag(
        &self,
        member_id: i64,
        token: &str,
    ) -> AnalyticsResult<AbnormalFlag> {
        self.guard.check(member_id, token).await;
        let tables = self.run(Query::abnormal(&self.bucket, token)).await?;
        aggregator::abnormal_flag(&tables, ABNORMAL_MARKERS)
    }

    async fn run(&self, query: Query) -> AnalyticsResult<Vec<Table>> {
        debug!("query= {}", query);
        let tables = self.store.execute(&query).await?;
        debug!(
            "'{}' query returned {} tables",
            query.measurement,
            tables.len()
        );
        Ok(tables)
    }
}
