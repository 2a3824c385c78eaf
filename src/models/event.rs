use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Field names carried by interaction and abnormality records
pub mod fields {
    pub const APPLICATION_TOKEN: &str = "applicationToken";
    pub const RESPONSE_TIME: &str = "responseTime";
    pub const BEFORE_URL: &str = "beforeUrl";
    pub const CURRENT_URL: &str = "currentUrl";
    pub const IS_READ: &str = "isRead";
    pub const CREATE_TIME: &str = "createTime";
    /// Column the store writes aggregation output (e.g. `count()`) into
    pub const VALUE: &str = "_value";
    pub const FIELD: &str = "_field";
    pub const TIME: &str = "_time";
}

/// Failure to turn a raw store value into its semantic type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("field '{field}' missing from record")]
    Missing { field: String },
    #[error("field '{field}' has malformed value '{value}' (expected {expected})")]
    Malformed {
        field: String,
        value: String,
        expected: &'static str,
    },
}

/// One row returned by a time-series query.
///
/// Fields are sparse: a pivoted interaction row carries `responseTime`,
/// `beforeUrl` and `currentUrl`, while a grouped count row only carries the
/// group column and `_value`. Values arrive string-typed and are decoded on
/// access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventRecord {
    pub measurement: String,
    pub time: Option<DateTime<Utc>>,
    pub fields: HashMap<String, String>,
}

impl EventRecord {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Raw lookup without decoding
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn text(&self, field: &str) -> Result<&str, DecodeError> {
        self.get(field).ok_or_else(|| DecodeError::Missing {
            field: field.to_string(),
        })
    }

    pub fn int(&self, field: &str) -> Result<i64, DecodeError> {
        let raw = self.text(field)?;
        raw.trim()
            .parse::<i64>()
            .map_err(|_| malformed(field, raw, "integer"))
    }

    pub fn float(&self, field: &str) -> Result<f64, DecodeError> {
        let raw = self.text(field)?;
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(malformed(field, raw, "finite number")),
        }
    }

    /// Non-negative count, as written by the store's `count()` aggregation
    pub fn count(&self, field: &str) -> Result<u64, DecodeError> {
        let raw = self.text(field)?;
        raw.trim()
            .parse::<u64>()
            .map_err(|_| malformed(field, raw, "non-negative integer"))
    }

    /// Boolean-like marker: exactly `true` or `false`, case-insensitive
    pub fn flag(&self, field: &str) -> Result<bool, DecodeError> {
        let raw = self.text(field)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(malformed(field, raw, "\"true\" or \"false\"")),
        }
    }
}

fn malformed(field: &str, value: &str, expected: &'static str) -> DecodeError {
    DecodeError::Malformed {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    }
}

/// A group of records the store returned together (one series or one group key)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub records: Vec<EventRecord>,
}

impl Table {
    pub fn new(records: Vec<EventRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<EventRecord> for Table {
    fn from_iter<I: IntoIterator<Item = EventRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
