//! Spreadsheet loading.
//!
//! The first worksheet is read with `calamine` and flattened into a [`Grid`] of
//! plain [`Cell`] values anchored at A1, so every later stage is a pure function
//! over in-memory rows with no spreadsheet library types leaking through.

use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveDateTime;
use std::path::Path;

use crate::services::importer::ImportError;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Blank, whitespace-only, or a NaN placeholder.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => {
                let t = s.trim();
                t.is_empty() || t.eq_ignore_ascii_case("nan")
            }
            Cell::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Text rendering used when matching labels and building header names.
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) if f.is_nan() => String::new(),
            Cell::Float(f) => f.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// JSON form kept in the raw row snapshot: timestamps as ISO-8601, blanks as null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Empty => serde_json::Value::Null,
            Cell::Text(s) => serde_json::Value::String(s.clone()),
            Cell::Int(i) => serde_json::Value::from(*i),
            // non-finite floats become null
            Cell::Float(f) => serde_json::Value::from(*f),
            Cell::Bool(b) => serde_json::Value::Bool(*b),
            Cell::DateTime(dt) => serde_json::Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
        }
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Float(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(ndt) => Cell::DateTime(ndt),
                None => Cell::Float(dt.as_f64()),
            },
            Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .map(Cell::DateTime)
                .unwrap_or_else(|_| Cell::Text(s.clone())),
            Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(_) => Cell::Empty,
        }
    }
}

/// Rectangular-ish cell rows starting at A1; rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Grid { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Non-blank cells of a row concatenated with no separator.
    pub fn row_text(&self, index: usize) -> String {
        self.row(index)
            .map(|cells| {
                cells
                    .iter()
                    .filter(|c| !c.is_blank())
                    .map(Cell::render)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Read the first worksheet of an `.xlsx`/`.xls` file into a [`Grid`].
pub fn read_first_sheet(path: &Path) -> Result<Grid, ImportError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ImportError::Workbook {
        path: path.to_path_buf(),
        source: e,
    })?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ImportError::EmptyWorkbook(path.to_path_buf()))?;
    let range = workbook.worksheet_range(&sheet_name).map_err(|e| ImportError::Workbook {
        path: path.to_path_buf(),
        source: e,
    })?;

    // calamine trims leading empty rows/columns; re-anchor at A1 so row offsets match the sheet
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for data_row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(data_row.iter().map(Cell::from));
        rows.push(cells);
    }
    Ok(Grid::new(rows))
}
