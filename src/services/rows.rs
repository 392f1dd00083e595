//! Data-row parsing: timestamp resolution, metric extraction, raw snapshots,
//! and the numeric/text split applied before storage.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::catalog::MetricKey;
use crate::services::columns::{ColumnBinding, normalize_header};
use crate::services::header::ResolvedHeader;
use crate::workbook::{Cell, Grid};

const TIME_COLUMN_KEYS: &[&str] = &["观测日期", "观测时间", "日期", "时间"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
    "%Y年%m月%d日 %H:%M:%S",
    "%Y年%m月%d日 %H:%M",
    "%Y年%m月%d日%H时%M分",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];

// Serial day counts beyond this are not dates in any spreadsheet we read.
const MAX_SERIAL_DAYS: f64 = 2_958_465.0;

static EMPTY_CELL: Cell = Cell::Empty;

/// One observation row: a timestamp, the mapped metric cells, and every column verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub reading_time: NaiveDateTime,
    pub metrics: BTreeMap<MetricKey, MetricCell>,
    pub raw: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricCell {
    pub value: Cell,
    pub unit: Option<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRows {
    pub rows: Vec<ParsedRow>,
    /// Rows dropped because no timestamp could be resolved.
    pub dropped: usize,
}

/// Storage form of a cell: exactly one of numeric or text.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Numeric(f64),
    Text(String),
}

impl StoredValue {
    pub fn into_columns(self) -> (Option<f64>, Option<String>) {
        match self {
            StoredValue::Numeric(n) => (Some(n), None),
            StoredValue::Text(t) => (None, Some(t)),
        }
    }
}

/// `None` means the cell carries no value and no reading should be created.
pub fn split_value(cell: &Cell) -> Option<StoredValue> {
    match cell {
        Cell::Empty => None,
        Cell::Int(i) => Some(StoredValue::Numeric(*i as f64)),
        Cell::Float(f) if f.is_finite() => Some(StoredValue::Numeric(*f)),
        Cell::Float(_) => None,
        Cell::Bool(b) => Some(StoredValue::Numeric(if *b { 1.0 } else { 0.0 })),
        Cell::DateTime(dt) => Some(StoredValue::Text(dt.format("%Y-%m-%dT%H:%M:%S").to_string())),
        Cell::Text(s) => {
            let text = s.trim();
            if text.is_empty() {
                return None;
            }
            match text.parse::<f64>() {
                Ok(n) if n.is_finite() => Some(StoredValue::Numeric(n)),
                _ => Some(StoredValue::Text(text.to_string())),
            }
        }
    }
}

/// First header naming a date/time, else the first column.
pub fn find_time_column(headers: &[String]) -> Option<usize> {
    if headers.is_empty() {
        return None;
    }
    headers
        .iter()
        .position(|h| {
            let norm = normalize_header(h);
            TIME_COLUMN_KEYS.iter().any(|k| norm.contains(k))
        })
        .or(Some(0))
}

pub fn parse_timestamp(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Int(i) => from_serial_days(*i as f64),
        Cell::Float(f) => from_serial_days(*f),
        Cell::Text(s) => parse_timestamp_text(s),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

/// Day count on the 1899-12-30 spreadsheet epoch, fractional part as time of day.
pub fn from_serial_days(days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() || days.abs() > MAX_SERIAL_DAYS {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    let millis = (days * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

pub fn parse_timestamp_text(raw: &str) -> Option<NaiveDateTime> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Snapshot key for a column; unnamed columns are keyed by 1-based position.
fn snapshot_key(header: &str, column: usize) -> String {
    if header.is_empty() {
        format!("#{}", column + 1)
    } else {
        header.to_string()
    }
}

pub fn parse_rows(grid: &Grid, header: &ResolvedHeader, bindings: &[ColumnBinding]) -> ParsedRows {
    let mut out = ParsedRows::default();
    let Some(time_column) = find_time_column(&header.columns) else {
        return out;
    };

    for cells in grid.rows().skip(header.data_start) {
        let cell_at = |i: usize| cells.get(i).unwrap_or(&EMPTY_CELL);

        let Some(reading_time) = parse_timestamp(cell_at(time_column)) else {
            out.dropped += 1;
            continue;
        };

        let mut raw = Map::new();
        for (i, name) in header.columns.iter().enumerate() {
            let value = cell_at(i).to_json();
            let key = snapshot_key(name, i);
            // duplicate header names keep the first non-null value
            match raw.get(&key) {
                Some(existing) if !existing.is_null() => {}
                _ => {
                    raw.insert(key, value);
                }
            }
        }

        // several columns can feed one metric; the rightmost non-blank one wins
        let mut metrics = BTreeMap::new();
        for binding in bindings {
            let cell = cell_at(binding.column);
            if cell.is_blank() {
                continue;
            }
            metrics.insert(
                binding.metric,
                MetricCell {
                    value: cell.clone(),
                    unit: binding.unit,
                },
            );
        }

        out.rows.push(ParsedRow {
            reading_time,
            metrics,
            raw,
        });
    }
    out
}
