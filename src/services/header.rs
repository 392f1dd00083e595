//! Header row location and column-name reconstruction.

use crate::workbook::{Cell, Grid};

const HEADER_SEARCH_ROWS: usize = 12;
/// Row used when no header row is recognised. Tuned to one file family only.
pub const FALLBACK_HEADER_ROW: usize = 6;

const INDEX_MARKER: &str = "序号";
const TIME_MARKERS: &[&str] = &["观测日期", "观测日期时间", "日期", "时间"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRow {
    Detected(usize),
    /// Nothing matched; [`FALLBACK_HEADER_ROW`] was assumed and needs review.
    Fallback(usize),
}

impl HeaderRow {
    pub fn index(self) -> usize {
        match self {
            HeaderRow::Detected(i) | HeaderRow::Fallback(i) => i,
        }
    }

    pub fn is_fallback(self) -> bool {
        matches!(self, HeaderRow::Fallback(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHeader {
    pub row: HeaderRow,
    pub two_row: bool,
    /// One name per column of the header row; may be empty strings.
    pub columns: Vec<String>,
    pub data_start: usize,
}

/// First row within the search window carrying both the index marker and a date/time marker.
pub fn locate(grid: &Grid) -> HeaderRow {
    let window = grid.len().min(HEADER_SEARCH_ROWS);
    (0..window)
        .find(|&i| {
            let line = grid.row_text(i);
            line.contains(INDEX_MARKER) && TIME_MARKERS.iter().any(|m| line.contains(m))
        })
        .map(HeaderRow::Detected)
        .unwrap_or(HeaderRow::Fallback(FALLBACK_HEADER_ROW))
}

pub fn resolve(grid: &Grid) -> ResolvedHeader {
    let row = locate(grid);
    let index = row.index();
    let base: &[Cell] = grid.row(index).unwrap_or(&[]);
    let sub: &[Cell] = grid.row(index + 1).unwrap_or(&[]);
    let two_row = sub.iter().any(|c| !c.is_blank());

    let columns = base
        .iter()
        .enumerate()
        .map(|(i, head)| {
            let head = if head.is_blank() { String::new() } else { head.render() };
            let sub_label = match sub.get(i) {
                Some(c) if two_row && !c.is_blank() => c.render(),
                _ => String::new(),
            };
            if sub_label.is_empty() {
                head
            } else {
                format!("{head} {sub_label}").trim().to_string()
            }
        })
        .collect();

    ResolvedHeader {
        row,
        two_row,
        columns,
        data_start: if two_row { index + 2 } else { index + 1 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(cells: &[&str]) -> Vec<Cell> {
        cells
            .iter()
            .map(|s| if s.is_empty() { Cell::Empty } else { Cell::Text((*s).to_string()) })
            .collect()
    }

    #[test]
    fn merges_two_row_header() {
        let grid = Grid::new(vec![
            text_row(&["序号", "观测日期", "水位", "", "温度"]),
            text_row(&["", "", "m", "", "℃"]),
        ]);
        let header = resolve(&grid);
        assert_eq!(header.row, HeaderRow::Detected(0));
        assert!(header.two_row);
        assert_eq!(header.columns, vec!["序号", "观测日期", "水位 m", "", "温度 ℃"]);
        assert_eq!(header.data_start, 2);
    }

    #[test]
    fn sub_label_without_head_keeps_sub_label() {
        let grid = Grid::new(vec![text_row(&["序号", "日期", ""]), text_row(&["", "", "kPa"])]);
        assert_eq!(resolve(&grid).columns, vec!["序号", "日期", "kPa"]);
    }

    #[test]
    fn blank_sub_row_keeps_single_row_names() {
        let grid = Grid::new(vec![
            text_row(&["序号", "观测日期", "水位", "", "温度"]),
            text_row(&["", "nan", " ", "", ""]),
        ]);
        let header = resolve(&grid);
        assert!(!header.two_row);
        assert_eq!(header.columns, vec!["序号", "观测日期", "水位", "", "温度"]);
        assert_eq!(header.data_start, 1);
    }

    #[test]
    fn detects_header_below_preamble() {
        let mut rows: Vec<Vec<Cell>> = (0..8).map(|_| text_row(&["测点编号：Pf-1"])).collect();
        rows.push(text_row(&["序号", "观测时间", "渗透压力"]));
        let header = resolve(&Grid::new(rows));
        assert_eq!(header.row, HeaderRow::Detected(8));
    }

    #[test]
    fn falls_back_to_fixed_row_when_nothing_matches() {
        let rows: Vec<Vec<Cell>> = (0..10).map(|i| text_row(&[&format!("row {i}")])).collect();
        let header = resolve(&Grid::new(rows));
        assert_eq!(header.row, HeaderRow::Fallback(FALLBACK_HEADER_ROW));
        assert!(header.row.is_fallback());
        // the row below is non-blank, so it is read as a sub-label row
        assert_eq!(header.columns, vec!["row 6 row 7"]);
        assert_eq!(header.data_start, 8);
    }

    #[test]
    fn header_row_past_end_yields_no_columns() {
        let header = resolve(&Grid::new(vec![text_row(&["only one row"])]));
        assert!(header.columns.is_empty());
        assert!(!header.two_row);
    }
}
