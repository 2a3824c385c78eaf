//! Reductions from query result tables to derived analytics
//!
//! The store may split one logical result across several tables (one per
//! series or group key), so every aggregator treats its input as a single
//! sequence of records spanning all tables.

use std::collections::HashMap;

use tracing::debug;

use crate::analytics::{AnalyticsError, AnalyticsResult};
use crate::models::{
    fields, AbnormalFlag, DecodeError, Distribution, DistributionEntry, EventRecord,
    ResponseTime, Table,
};

fn records(tables: &[Table]) -> impl Iterator<Item = &EventRecord> {
    tables.iter().flat_map(|table| table.records.iter())
}

/// Mean `responseTime` over every record of every table
pub fn average_response_time(tables: &[Table]) -> AnalyticsResult<ResponseTime> {
    let mut sum = 0.0;
    let mut count: u64 = 0;

    for record in records(tables) {
        sum += record.float(fields::RESPONSE_TIME)?;
        count += 1;
    }

    if count == 0 {
        return Err(AnalyticsError::NoData);
    }

    Ok(ResponseTime {
        average: sum / count as f64,
    })
}

/// Share of each `key_field` value among grouped count rows.
///
/// Each row carries one key and its count in `_value`. If a key shows up
/// more than once the last count wins. Rows without the key (series that never
/// wrote `key_field`) are skipped. No rows gives an empty distribution.
pub fn distribution(tables: &[Table], key_field: &str) -> AnalyticsResult<Distribution> {
    let mut counts: HashMap<String, u64> = HashMap::new();

    for record in records(tables) {
        let Some(key) = record.get(key_field) else {
            debug!("skipping group without {}: {:?}", key_field, record.get(fields::VALUE));
            continue;
        };
        let count = record.count(fields::VALUE)?;
        counts.insert(key.to_string(), count);
    }

    let total: u64 = counts.values().sum();
    let mut entries: Vec<DistributionEntry> = counts
        .into_iter()
        .map(|(key, count)| DistributionEntry {
            ratio: if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            },
            key,
            count,
        })
        .collect();

    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));

    Ok(Distribution { entries })
}

/// Abnormal marker of the latest record.
///
/// Records are expected in ascending time order; the latest timestamp wins and
/// equal timestamps fall back to arrival order. The marker is read from the
/// first of `marker_fields` present on that record.
pub fn abnormal_flag(tables: &[Table], marker_fields: &[&str]) -> AnalyticsResult<AbnormalFlag> {
    let latest = records(tables)
        .max_by(|a, b| a.time.cmp(&b.time))
        .ok_or(AnalyticsError::NoData)?;

    let field = marker_fields
        .iter()
        .find(|field| latest.get(field).is_some())
        .ok_or_else(|| DecodeError::Missing {
            field: marker_fields.join("|"),
        })?;

    Ok(AbnormalFlag {
        abnormal: latest.flag(field)?,
    })
}
