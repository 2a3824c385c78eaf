use chrono::SecondsFormat;

use super::{Aggregation, Query, RangeStart};
use crate::models::fields;

pub(super) fn render(query: &Query) -> String {
    let mut flux = format!("from(bucket: {})", literal(&query.bucket));

    let start = match query.range_start {
        RangeStart::Beginning => "0".to_string(),
        RangeStart::Since(t) => t.to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    flux.push_str(&format!("\n  |> range(start: {start})"));

    flux.push_str(&format!(
        "\n  |> filter(fn: (r) => r[\"_measurement\"] == {} and r[{}] == {})",
        literal(&query.measurement),
        literal(fields::APPLICATION_TOKEN),
        literal(&query.application_token),
    ));

    if let Some(column) = &query.group_by {
        flux.push_str(&format!("\n  |> group(columns: [{}])", literal(column)));
    }

    if let Some(Aggregation::Count) = query.aggregation {
        flux.push_str("\n  |> count()");
    }

    if let Some(pivot) = &query.pivot {
        flux.push_str(&format!(
            "\n  |> pivot(rowKey: [{}], columnKey: [{}], valueColumn: {})",
            literal(&pivot.row_key),
            literal(&pivot.column_key),
            literal(&pivot.value_column),
        ));
    }

    if !query.sort.is_empty() {
        let columns: Vec<String> = query.sort.iter().map(|c| literal(c)).collect();
        flux.push_str(&format!(
            "\n  |> sort(columns: [{}], desc: false)",
            columns.join(", ")
        ));
    }

    flux
}

/// Quote a Flux string literal
fn literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '$' => out.push_str("\\$"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
