//! Query builder for the time-series store
//!
//! A [`Query`] describes one read against a bucket: the measurement, the
//! application token tag filter, the lower time bound and an optional
//! group/count, pivot and sort stage. It is built per request, handed to an
//! [`EventStore`](crate::storage::EventStore) and dropped afterwards.
//!
//! Stores that speak Flux render it with [`Query::to_flux`]; the in-memory
//! store interprets the same structure directly.

mod flux;

use chrono::{DateTime, Utc};

use crate::models::fields;

/// Measurement holding page-view / navigation / response-time events
pub const DATA_MEASUREMENT: &str = "data";

/// Measurement holding abnormal-session markers
pub const ABNORMAL_MEASUREMENT: &str = "abnormal";

/// Lower bound of the queried time range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeStart {
    /// Since the beginning of retention (epoch 0)
    #[default]
    Beginning,
    Since(DateTime<Utc>),
}

impl RangeStart {
    pub fn includes(&self, time: Option<DateTime<Utc>>) -> bool {
        match (self, time) {
            (RangeStart::Beginning, _) => true,
            (RangeStart::Since(start), Some(t)) => t >= *start,
            (RangeStart::Since(_), None) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Count,
}

/// Reshape per-field rows sharing `row_key` into one row with a column per field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pivot {
    pub row_key: String,
    pub column_key: String,
    pub value_column: String,
}

impl Pivot {
    /// Join every field written at the same timestamp into one row
    pub fn on_time() -> Self {
        Self {
            row_key: fields::TIME.to_string(),
            column_key: fields::FIELD.to_string(),
            value_column: fields::VALUE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub bucket: String,
    pub measurement: String,
    pub application_token: String,
    pub range_start: RangeStart,
    pub group_by: Option<String>,
    pub aggregation: Option<Aggregation>,
    pub pivot: Option<Pivot>,
    /// Ascending sort columns
    pub sort: Vec<String>,
}

impl Query {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            measurement: String::new(),
            application_token: String::new(),
            range_start: RangeStart::Beginning,
            group_by: None,
            aggregation: None,
            pivot: None,
            sort: Vec::new(),
        }
    }

    pub fn measurement(mut self, measurement: impl Into<String>) -> Self {
        self.measurement = measurement.into();
        self
    }

    /// Equality filter on the `applicationToken` tag. An empty token is
    /// passed through and matches nothing.
    pub fn token(mut self, application_token: impl Into<String>) -> Self {
        self.application_token = application_token.into();
        self
    }

    pub fn since(mut self, start: RangeStart) -> Self {
        self.range_start = start;
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by = Some(column.into());
        self
    }

    pub fn count(mut self) -> Self {
        self.aggregation = Some(Aggregation::Count);
        self
    }

    pub fn pivot(mut self, pivot: Pivot) -> Self {
        self.pivot = Some(pivot);
        self
    }

    pub fn sort<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Every interaction row for a token, pivoted so `responseTime` sits on one row
    pub fn response_time(bucket: &str, application_token: &str) -> Self {
        Self::new(bucket)
            .measurement(DATA_MEASUREMENT)
            .token(application_token)
            .pivot(Pivot::on_time())
    }

    /// One row per distinct value of `key_field` carrying its count in `_value`
    pub fn distribution(bucket: &str, application_token: &str, key_field: &str) -> Self {
        Self::new(bucket)
            .measurement(DATA_MEASUREMENT)
            .token(application_token)
            .group_by(key_field)
            .count()
    }

    /// Abnormal markers for a token in ascending time order
    pub fn abnormal(bucket: &str, application_token: &str) -> Self {
        Self::new(bucket)
            .measurement(ABNORMAL_MEASUREMENT)
            .token(application_token)
            .pivot(Pivot::on_time())
            .sort([fields::TIME])
    }

    pub fn to_flux(&self) -> String {
        flux::render(self)
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_flux())
    }
}
