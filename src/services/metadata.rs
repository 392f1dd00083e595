//! Preamble metadata extraction.
//!
//! Instrument files open with a block of free-form "label：value" rows before
//! the header. Only the first [`PREAMBLE_ROWS`] rows are scanned; anything past
//! that is treated as table body.

use std::collections::BTreeMap;

use crate::workbook::Grid;

pub const PREAMBLE_ROWS: usize = 10;

/// Label → field, checked in this order against every preamble row.
const METADATA_LABELS: &[(&str, MetaField)] = &[
    ("测点编号", MetaField::PointCode),
    ("测点代号", MetaField::PointCode),
    ("出厂编号", MetaField::FactoryCode),
    ("埋设桩号", MetaField::InstallChainage),
    ("埋设日期", MetaField::InstallDate),
    ("埋设位置", MetaField::InstallLocation),
    ("安装高程", MetaField::InstallElevation),
    ("观测仪表", MetaField::ReadingDevice),
    ("仪器厂家", MetaField::InstrumentManufacturer),
    ("仪器型号", MetaField::InstrumentModel),
];

const PARAMETER_LABELS: &[&str] = &["灵敏度", "灵敏度系数", "温度修正", "温度系数", "初始频率", "初始温度"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MetaField {
    PointCode,
    FactoryCode,
    InstallChainage,
    InstallDate,
    InstallLocation,
    InstallElevation,
    ReadingDevice,
    InstrumentManufacturer,
    InstrumentModel,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMetadata {
    pub point_code: Option<String>,
    pub factory_code: Option<String>,
    pub install_chainage_raw: Option<String>,
    pub install_date: Option<String>,
    pub install_location_desc: Option<String>,
    pub install_elevation: Option<String>,
    pub reading_device: Option<String>,
    pub instrument_manufacturer: Option<String>,
    pub instrument_model: Option<String>,
    /// Calibration rows keyed by the label that matched, kept verbatim.
    pub parameters: BTreeMap<String, String>,
    pub source_file: String,
}

impl FileMetadata {
    fn slot(&mut self, field: MetaField) -> &mut Option<String> {
        match field {
            MetaField::PointCode => &mut self.point_code,
            MetaField::FactoryCode => &mut self.factory_code,
            MetaField::InstallChainage => &mut self.install_chainage_raw,
            MetaField::InstallDate => &mut self.install_date,
            MetaField::InstallLocation => &mut self.install_location_desc,
            MetaField::InstallElevation => &mut self.install_elevation,
            MetaField::ReadingDevice => &mut self.reading_device,
            MetaField::InstrumentManufacturer => &mut self.instrument_manufacturer,
            MetaField::InstrumentModel => &mut self.instrument_model,
        }
    }

    pub fn parameters_json(&self) -> Option<serde_json::Value> {
        if self.parameters.is_empty() {
            return None;
        }
        serde_json::to_value(&self.parameters).ok()
    }
}

/// Scan the preamble of `grid`. The first row that carries a label wins; later
/// rows never overwrite a captured field.
pub fn extract(grid: &Grid, source_file: &str) -> FileMetadata {
    let mut meta = FileMetadata {
        source_file: source_file.to_string(),
        ..FileMetadata::default()
    };
    let window = grid.len().min(PREAMBLE_ROWS);

    for index in 0..window {
        let line = grid.row_text(index);
        if line.is_empty() {
            continue;
        }
        for (label, field) in METADATA_LABELS {
            let slot = meta.slot(*field);
            if slot.is_some() {
                continue;
            }
            if let Some(value) = value_after_label(&line, label) {
                *slot = Some(value);
            }
        }
    }

    for label in PARAMETER_LABELS {
        for index in 0..window {
            let line = grid.row_text(index);
            if line.contains(label) {
                meta.parameters.insert((*label).to_string(), line);
            }
        }
    }

    meta
}

fn value_after_label(line: &str, label: &str) -> Option<String> {
    let (_, rest) = line.split_once(label)?;
    let value = rest.trim_start_matches(['：', ':', ' ']).trim();
    Some(value.to_string())
}
