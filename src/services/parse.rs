//! Whole-file parse: grid in, store-independent [`ParsedWorkbook`] out.

use log::{debug, warn};
use serde::Serialize;
use std::path::Path;

use crate::catalog::{PrefixCatalog, SensorTypeDef};
use crate::services::columns::{ColumnBinding, map_columns};
use crate::services::header::{self, ResolvedHeader};
use crate::services::metadata::{self, FileMetadata};
use crate::services::rows::{self, ParsedRow};
use crate::workbook::Grid;

#[derive(Debug, Clone)]
pub struct ParsedWorkbook {
    pub point_code: String,
    pub prefix: String,
    pub sensor_type: SensorTypeDef,
    pub metadata: FileMetadata,
    pub header: ResolvedHeader,
    pub bindings: Vec<ColumnBinding>,
    pub rows: Vec<ParsedRow>,
    pub dropped_rows: usize,
}

/// Compact view printed by `--dry-run`.
#[derive(Debug, Clone, Serialize)]
pub struct ParseSummary {
    pub path: String,
    pub point_code: String,
    pub prefix: String,
    pub sensor_type: String,
    pub header_row: usize,
    pub header_detected: bool,
    pub mapped_columns: Vec<(String, &'static str)>,
    pub rows: usize,
    pub dropped_rows: usize,
}

impl ParsedWorkbook {
    pub fn summary(&self, path: &Path) -> ParseSummary {
        ParseSummary {
            path: path.display().to_string(),
            point_code: self.point_code.clone(),
            prefix: self.prefix.clone(),
            sensor_type: self.sensor_type.code.clone(),
            header_row: self.header.row.index(),
            header_detected: !self.header.row.is_fallback(),
            mapped_columns: self
                .bindings
                .iter()
                .map(|b| (b.header.clone(), b.metric.as_str()))
                .collect(),
            rows: self.rows.len(),
            dropped_rows: self.dropped_rows,
        }
    }
}

pub fn parse_grid(grid: &Grid, file_name: &str, catalog: &PrefixCatalog) -> ParsedWorkbook {
    let metadata = metadata::extract(grid, file_name);
    let header = header::resolve(grid);
    if header.row.is_fallback() {
        warn!(
            "Import: {} has no recognisable header row; assuming row {}",
            file_name,
            header.row.index() + 1
        );
    }

    let point_code = metadata
        .point_code
        .clone()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| file_stem(file_name));
    let prefix = catalog.detect_prefix(&point_code, file_name);
    let sensor_type = catalog.sensor_type(&prefix);
    if catalog.category(&prefix).is_none() {
        warn!(
            "Import: prefix {:?} of {} is not catalogued; columns kept as raw values only",
            prefix, point_code
        );
    }

    let bindings = map_columns(catalog.metric_rules(&prefix), &header.columns);
    let parsed = rows::parse_rows(grid, &header, &bindings);
    debug!(
        "Import: {} header_row={} two_row={} mapped={:?} rows={} dropped={}",
        file_name,
        header.row.index(),
        header.two_row,
        bindings.iter().map(|b| b.metric.as_str()).collect::<Vec<_>>(),
        parsed.rows.len(),
        parsed.dropped
    );

    ParsedWorkbook {
        point_code,
        prefix,
        sensor_type,
        metadata,
        header,
        bindings,
        rows: parsed.rows,
        dropped_rows: parsed.dropped,
    }
}

fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}
