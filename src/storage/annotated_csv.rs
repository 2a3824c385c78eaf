//! Decoder for the store's annotated CSV query responses
//!
//! A response is a sequence of sections separated by blank lines. Each section
//! has `#datatype`/`#group`/`#default` annotation rows, a header row and data
//! rows. The `table` column assigns rows to result tables.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::models::{fields, EventRecord, Table};
use crate::storage::{StoreError, StoreResult};

pub fn parse_tables(body: &str) -> StoreResult<Vec<Table>> {
    let mut tables: Vec<Table> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut header: Option<Vec<String>> = None;
    let mut defaults: Vec<String> = Vec::new();

    for row in split_rows(body)? {
        if row.iter().all(|cell| cell.is_empty()) {
            header = None;
            defaults.clear();
            continue;
        }

        if row[0].starts_with('#') {
            if row[0] == "#default" {
                defaults = row;
            }
            continue;
        }

        match header.as_ref() {
            None => header = Some(row),
            Some(columns) => {
                let (table_key, record) = decode_row(columns, &row, &defaults)?;
                let slot = *slots.entry(table_key).or_insert_with(|| {
                    tables.push(Table::default());
                    tables.len() - 1
                });
                tables[slot].records.push(record);
            }
        }
    }

    Ok(tables)
}

fn decode_row(
    columns: &[String],
    row: &[String],
    defaults: &[String],
) -> StoreResult<(String, EventRecord)> {
    let mut record = EventRecord::default();
    let mut result = String::new();
    let mut table = String::new();

    for (i, column) in columns.iter().enumerate() {
        let value = row
            .get(i)
            .filter(|v| !v.is_empty())
            .or_else(|| defaults.get(i).filter(|v| !v.is_empty()));
        let Some(value) = value else {
            continue;
        };

        match column.as_str() {
            "" => {}
            "result" => result = value.clone(),
            "table" => table = value.clone(),
            "error" => return Err(StoreError::Query(value.clone())),
            "_measurement" => record.measurement = value.clone(),
            fields::TIME => record.time = Some(parse_time(value)?),
            _ => {
                record.fields.insert(column.clone(), value.clone());
            }
        }
    }

    Ok((format!("{result}:{table}"), record))
}

fn parse_time(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("malformed _time '{value}': {e}")))
}

/// Split CSV text into rows of cells. Quoted cells may contain commas,
/// newlines and doubled quotes. A blank line becomes a single empty cell.
fn split_rows(body: &str) -> StoreResult<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if quoted {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cell.push('"');
                } else {
                    quoted = false;
                }
            } else {
                cell.push(c);
            }
            continue;
        }

        match c {
            '"' => quoted = true,
            ',' => row.push(std::mem::take(&mut cell)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut cell));
                rows.push(std::mem::take(&mut row));
            }
            _ => cell.push(c),
        }
    }

    if quoted {
        return Err(StoreError::Query(
            "unterminated quoted field in query response".to_string(),
        ));
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }

    Ok(rows)
}
