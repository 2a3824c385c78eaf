//! In-memory event store
//!
//! Holds points the way the time-series store does (tags identify a series,
//! fields carry values) and evaluates [`Query`] directly instead of rendering
//! Flux. Result tables follow the store's partitioning: one table per series
//! for plain and pivoted reads, one table per group key for grouped reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::models::{fields, EventRecord, Table};
use crate::query::{Aggregation, Pivot, Query};
use crate::storage::{EventStore, StoreError, StoreResult};

/// A single written point
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub time: DateTime<Utc>,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, String>,
}

impl Point {
    pub fn new(measurement: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            time,
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.fields.insert(key.into(), value.to_string());
        self
    }

    /// Tag or field value for a column
    fn value(&self, column: &str) -> Option<&str> {
        self.tags
            .get(column)
            .or_else(|| self.fields.get(column))
            .map(String::as_str)
    }

    fn series_key(&self) -> String {
        let tags: Vec<String> = self.tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{},{}", self.measurement, tags.join(","))
    }
}

/// Points keyed by their `applicationToken` tag
#[derive(Default)]
pub struct MemoryStore {
    points: DashMap<String, Vec<Point>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a point. Points without an `applicationToken` tag can never be
    /// queried and are dropped.
    pub fn insert(&self, point: Point) {
        let Some(token) = point.tags.get(fields::APPLICATION_TOKEN).cloned() else {
            warn!(
                "Dropping '{}' point without {} tag",
                point.measurement,
                fields::APPLICATION_TOKEN
            );
            return;
        };

        self.points.entry(token).or_default().push(point);
    }

    pub fn extend<I: IntoIterator<Item = Point>>(&self, points: I) {
        for point in points {
            self.insert(point);
        }
    }

    /// Total number of stored points
    pub fn len(&self) -> usize {
        self.points.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, query: &Query) -> Vec<Point> {
        let mut matched: Vec<Point> = match self.points.get(&query.application_token) {
            Some(entry) => entry
                .iter()
                .filter(|p| {
                    p.measurement == query.measurement && query.range_start.includes(Some(p.time))
                })
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        // Series are always read back in time order
        matched.sort_by_key(|p| p.time);
        matched
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn execute(&self, query: &Query) -> StoreResult<Vec<Table>> {
        let matched = self.select(query);
        debug!(
            "Memory store matched {} '{}' points",
            matched.len(),
            query.measurement
        );

        let partitions = match &query.group_by {
            // Rows lacking the group column have no key to report and are skipped
            Some(column) => partition(matched, |p| p.value(column).map(str::to_string)),
            None => partition(matched, |p| Some(p.series_key())),
        };

        let mut tables = Vec::with_capacity(partitions.len());
        for (key, points) in partitions {
            let mut table = match (query.aggregation, &query.pivot) {
                (Some(Aggregation::Count), _) => {
                    count_table(&query.measurement, query.group_by.as_deref(), &key, points.len())
                }
                (None, Some(pivot)) => pivot_table(pivot, points)?,
                (None, None) => raw_table(points),
            };
            sort_records(&mut table.records, &query.sort);
            tables.push(table);
        }

        Ok(tables)
    }

    async fn health(&self) -> StoreResult<()> {
        Ok(())
    }
}

fn partition<F>(points: Vec<Point>, key_of: F) -> BTreeMap<String, Vec<Point>>
where
    F: Fn(&Point) -> Option<String>,
{
    let mut partitions: BTreeMap<String, Vec<Point>> = BTreeMap::new();
    for point in points {
        if let Some(key) = key_of(&point) {
            partitions.entry(key).or_default().push(point);
        }
    }
    partitions
}

fn count_table(measurement: &str, group_by: Option<&str>, key: &str, count: usize) -> Table {
    let mut record = EventRecord::new(measurement).with_field(fields::VALUE, count.to_string());
    if let Some(column) = group_by {
        record = record.with_field(column, key);
    }
    Table::new(vec![record])
}

/// One row per timestamp carrying every tag and field written at that time
fn pivot_table(pivot: &Pivot, points: Vec<Point>) -> StoreResult<Table> {
    if pivot.row_key != fields::TIME
        || pivot.column_key != fields::FIELD
        || pivot.value_column != fields::VALUE
    {
        return Err(StoreError::Query(format!(
            "unsupported pivot (rowKey: {}, columnKey: {}, valueColumn: {})",
            pivot.row_key, pivot.column_key, pivot.value_column
        )));
    }

    let mut rows: BTreeMap<DateTime<Utc>, EventRecord> = BTreeMap::new();
    for point in points {
        let row = rows
            .entry(point.time)
            .or_insert_with(|| EventRecord::new(point.measurement.clone()).at(point.time));
        row.fields.extend(point.tags);
        row.fields.extend(point.fields);
    }

    Ok(rows.into_values().collect())
}

/// One row per (point, field), the store's native shape
fn raw_table(points: Vec<Point>) -> Table {
    let mut records = Vec::new();
    for point in points {
        for (field, value) in &point.fields {
            let mut record = EventRecord::new(point.measurement.clone()).at(point.time);
            record.fields = point.tags.clone().into_iter().collect();
            record.fields.insert(fields::FIELD.to_string(), field.clone());
            record.fields.insert(fields::VALUE.to_string(), value.clone());
            records.push(record);
        }
    }
    Table::new(records)
}

fn sort_records(records: &mut [EventRecord], columns: &[String]) {
    if columns.is_empty() {
        return;
    }

    records.sort_by(|a, b| {
        columns
            .iter()
            .map(|column| compare_column(a, b, column))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

fn compare_column(a: &EventRecord, b: &EventRecord, column: &str) -> Ordering {
    if column == fields::TIME {
        a.time.cmp(&b.time)
    } else {
        a.get(column).cmp(&b.get(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{RangeStart, ABNORMAL_MEASUREMENT, DATA_MEASUREMENT};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn visit(token: &str, secs: i64, before: &str, current: &str, rt: u32) -> Point {
        Point::new(DATA_MEASUREMENT, at(secs))
            .tag(fields::APPLICATION_TOKEN, token)
            .tag(fields::BEFORE_URL, before)
            .tag(fields::CURRENT_URL, current)
            .field(fields::RESPONSE_TIME, rt)
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.extend([
            visit("app", 0, "/", "/a", 100),
            visit("app", 1, "/", "/b", 200),
            visit("app", 2, "/a", "/b", 300),
            visit("other", 3, "/", "/a", 900),
        ]);
        store
    }

    #[tokio::test]
    async fn test_pivot_partitions_by_series() {
        let store = seeded();
        let tables = store
            .execute(&Query::response_time("insite", "app"))
            .await
            .unwrap();

        // three distinct tag sets for token "app"
        assert_eq!(tables.len(), 3);
        let total: usize = tables.iter().map(Table::len).sum();
        assert_eq!(total, 3);
        for record in tables.iter().flat_map(|t| &t.records) {
            assert_eq!(record.get(fields::APPLICATION_TOKEN), Some("app"));
            assert!(record.get(fields::RESPONSE_TIME).is_some());
            assert!(record.time.is_some());
        }
    }

    #[tokio::test]
    async fn test_group_count() {
        let store = seeded();
        let tables = store
            .execute(&Query::distribution("insite", "app", fields::CURRENT_URL))
            .await
            .unwrap();

        assert_eq!(tables.len(), 2);
        let counts: Vec<(&str, &str)> = tables
            .iter()
            .map(|t| {
                let r = &t.records[0];
                (r.get(fields::CURRENT_URL).unwrap(), r.get(fields::VALUE).unwrap())
            })
            .collect();
        assert_eq!(counts, vec![("/a", "1"), ("/b", "2")]);
    }

    #[tokio::test]
    async fn test_unknown_token_yields_no_tables() {
        let store = seeded();
        let tables = store
            .execute(&Query::response_time("insite", ""))
            .await
            .unwrap();
        assert!(tables.is_empty());
    }

    #[tokio::test]
    async fn test_sort_and_range() {
        let store = MemoryStore::new();
        for (secs, read) in [(5, "true"), (1, "false"), (3, "false")] {
            store.insert(
                Point::new(ABNORMAL_MEASUREMENT, at(secs))
                    .tag(fields::APPLICATION_TOKEN, "app")
                    .field(fields::IS_READ, read),
            );
        }

        let tables = store
            .execute(&Query::abnormal("insite", "app"))
            .await
            .unwrap();
        assert_eq!(tables.len(), 1);
        let times: Vec<_> = tables[0].records.iter().map(|r| r.time.unwrap()).collect();
        assert_eq!(times, vec![at(1), at(3), at(5)]);

        let tables = store
            .execute(&Query::abnormal("insite", "app").since(RangeStart::Since(at(2))))
            .await
            .unwrap();
        assert_eq!(tables[0].len(), 2);
    }

    #[tokio::test]
    async fn test_raw_rows_per_field() {
        let store = MemoryStore::new();
        store.insert(
            Point::new(DATA_MEASUREMENT, at(0))
                .tag(fields::APPLICATION_TOKEN, "app")
                .field(fields::RESPONSE_TIME, 10)
                .field("cookieId", "c-1"),
        );

        let query = Query::new("insite").measurement(DATA_MEASUREMENT).token("app");
        let tables = store.execute(&query).await.unwrap();
        assert_eq!(tables[0].len(), 2);
        assert!(tables[0]
            .records
            .iter()
            .all(|r| r.get(fields::FIELD).is_some() && r.get(fields::VALUE).is_some()));
    }

    #[test]
    fn test_point_without_token_is_dropped() {
        let store = MemoryStore::new();
        store.insert(Point::new(DATA_MEASUREMENT, at(0)).field(fields::RESPONSE_TIME, 1));
        assert!(store.is_empty());
    }
}
