//! Per-file import: parse, checksum gate, hierarchy resolution and reading
//! persistence, run as one unit of work against a [`MonitoringStore`].

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::catalog::{MetricKey, PrefixCatalog};
use crate::config::{Config, SiteConfig};
use crate::db::models::{
    NewChainageCoordinate, NewIngestFile, NewMonitoringFacility, NewMonitoringSection, NewSensor, NewSensorMetric,
    NewSensorReading, NewSensorType, Sensor, ingest_status, quality_flag, sensor_status,
};
use crate::db::store::MonitoringStore;
use crate::services::checksum::file_checksum;
use crate::services::parse::{ParsedWorkbook, parse_grid};
use crate::services::rows::split_value;
use crate::utils::{normalize_chainage, parse_date, relative_to, to_float};
use crate::workbook::read_first_sheet;

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Workbook { path: PathBuf, source: calamine::Error },
    EmptyWorkbook(PathBuf),
    Database {
        context: &'static str,
        source: diesel::result::Error,
    },
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Io(e) => write!(f, "I/O error: {}", e),
            ImportError::Workbook { path, source } => write!(f, "cannot read {}: {}", path.display(), source),
            ImportError::EmptyWorkbook(path) => write!(f, "{} has no worksheets", path.display()),
            ImportError::Database { context, source } => write!(f, "{} failed: {}", context, source),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(e) => Some(e),
            ImportError::Workbook { source, .. } => Some(source),
            ImportError::EmptyWorkbook(_) => None,
            ImportError::Database { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(e: std::io::Error) -> Self {
        ImportError::Io(e)
    }
}

impl From<diesel::result::Error> for ImportError {
    fn from(source: diesel::result::Error) -> Self {
        ImportError::Database {
            context: "database operation",
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Success,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    FileNotFound,
    DuplicateChecksum,
}

/// Result of one `import_file` call, printed as a JSON line by the batch driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub status: ImportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ImportOutcome {
    fn skipped(reason: SkipReason, path: &Path, sensor: Option<String>) -> Self {
        ImportOutcome {
            status: ImportStatus::Skipped,
            reason: Some(reason),
            path: path.display().to_string(),
            sensor,
            rows: None,
            warnings: Vec::new(),
        }
    }
}

/// What the checksum gate decided for this file.
enum Gate {
    Duplicate,
    Proceed { ingest_id: i64 },
}

pub struct Importer {
    data_root: PathBuf,
    catalog: PrefixCatalog,
    site: SiteConfig,
    batch_size: NonZeroUsize,
}

impl Importer {
    pub fn new(data_root: impl Into<PathBuf>, site: SiteConfig, batch_size: NonZeroUsize) -> Self {
        Importer {
            data_root: data_root.into(),
            catalog: PrefixCatalog::builtin(),
            site,
            batch_size,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.data_root.clone(), cfg.site.clone(), cfg.batch_size)
    }

    /// Absolute form of `path`; relative paths are taken against the data root.
    pub fn resolve_path(&self, path: &Path) -> Result<PathBuf, ImportError> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_root.join(path)
        };
        Ok(std::path::absolute(joined)?)
    }

    /// Read and parse without touching the store.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedWorkbook, ImportError> {
        let grid = read_first_sheet(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(parse_grid(&grid, &file_name, &self.catalog))
    }

    pub fn import_file<S: MonitoringStore>(&self, store: &mut S, path: &Path) -> Result<ImportOutcome, ImportError> {
        let abs_path = self.resolve_path(path)?;
        if !abs_path.exists() {
            info!("Import: {} not found; skipping", abs_path.display());
            return Ok(ImportOutcome::skipped(SkipReason::FileNotFound, &abs_path, None));
        }

        let parsed = self.parse_file(&abs_path)?;
        let checksum = file_checksum(&abs_path)?;
        let file_mtime = std::fs::metadata(&abs_path)?
            .modified()
            .ok()
            .map(DateTime::<Utc>::from);
        let stored_path = relative_to(&abs_path, &std::path::absolute(&self.data_root)?);

        let mut warnings = Vec::new();
        if parsed.header.row.is_fallback() {
            warnings.push(format!(
                "header row not recognised; assumed row {}",
                parsed.header.row.index() + 1
            ));
        }
        let final_status = if warnings.is_empty() {
            ingest_status::SUCCESS
        } else {
            ingest_status::NEEDS_REVIEW
        };

        store.atomically(|store| {
            let sensor = self.resolve_sensor(store, &parsed)?;

            let ingest_id = match Self::gate(store, sensor.id, &checksum, &stored_path, file_mtime)? {
                Gate::Duplicate => {
                    info!(
                        "Import: {} already imported for {} (checksum {}); skipping",
                        abs_path.display(),
                        sensor.point_code,
                        &checksum[..12.min(checksum.len())]
                    );
                    return Ok(ImportOutcome::skipped(
                        SkipReason::DuplicateChecksum,
                        &abs_path,
                        Some(sensor.point_code),
                    ));
                }
                Gate::Proceed { ingest_id } => ingest_id,
            };

            let metric_ids = self.ensure_metrics(store, sensor.id, &parsed)?;
            let rows = self.store_readings(store, sensor.id, ingest_id, &parsed, &metric_ids)?;
            let rows_i64 = i64::try_from(rows).unwrap_or(i64::MAX);
            store.finish_ingest_file(ingest_id, rows_i64, final_status)?;

            info!(
                "Import: {} -> {} readings for {} ({} rows parsed, {} dropped)",
                stored_path,
                rows,
                sensor.point_code,
                parsed.rows.len(),
                parsed.dropped_rows
            );
            Ok(ImportOutcome {
                status: ImportStatus::Success,
                reason: None,
                path: abs_path.display().to_string(),
                sensor: Some(sensor.point_code),
                rows: Some(rows),
                warnings,
            })
        })
    }

    /// Facility, section, optional chainage and the sensor itself. Idempotent, and
    /// run even for duplicates since the gate is keyed by sensor.
    fn resolve_sensor<S: MonitoringStore>(&self, store: &mut S, parsed: &ParsedWorkbook) -> Result<Sensor, ImportError> {
        let sensor_type = store.get_or_create_sensor_type(&NewSensorType {
            code: parsed.sensor_type.code.clone(),
            name: parsed.sensor_type.name.clone(),
            unit: parsed.sensor_type.unit.clone(),
            is_simulated: false,
        })?;
        let facility = store.get_or_create_facility(&NewMonitoringFacility {
            code: self.site.facility_code.clone(),
            name: self.site.facility_name.clone(),
            facility_type: self.site.facility_type.clone(),
            is_simulated: false,
        })?;
        let section = store.get_or_create_section(&NewMonitoringSection {
            facility_id: facility.id,
            code: self.site.section_code.clone(),
            name: self.site.section_name.clone(),
            section_type: self.site.section_type.clone(),
            is_simulated: false,
        })?;

        let meta = &parsed.metadata;
        let elevation = to_float(meta.install_elevation.as_deref());
        let chainage_id = match meta.install_chainage_raw.as_deref().filter(|raw| !raw.is_empty()) {
            Some(raw) => {
                let chainage = normalize_chainage(raw);
                let row = store.get_or_create_chainage(&NewChainageCoordinate {
                    facility_id: facility.id,
                    chainage_raw: chainage.raw,
                    chainage_normalized: chainage.normalized,
                    chainage_value: chainage.value,
                    chainage_direction: chainage.direction,
                    elevation,
                    is_simulated: false,
                })?;
                Some(row.id)
            }
            None => None,
        };

        let sensor = store.get_or_create_sensor(&NewSensor {
            section_id: section.id,
            sensor_type_id: sensor_type.id,
            chainage_id,
            point_code: parsed.point_code.clone(),
            factory_code: meta.factory_code.clone(),
            install_chainage_raw: meta.install_chainage_raw.clone(),
            install_elevation: elevation,
            install_date: parse_date(meta.install_date.as_deref()),
            install_location_desc: meta.install_location_desc.clone(),
            instrument_model: meta.instrument_model.clone(),
            instrument_manufacturer: meta.instrument_manufacturer.clone(),
            reading_device: meta.reading_device.clone(),
            parameters: meta.parameters_json(),
            status: sensor_status::ACTIVE.to_string(),
            source_file: Some(meta.source_file.clone()),
            is_simulated: false,
        })?;
        debug!(
            "Import: sensor {} (id={}, type={}, chainage={:?})",
            sensor.point_code, sensor.id, sensor_type.code, chainage_id
        );
        Ok(sensor)
    }

    /// A prior ingest with rows blocks the import; one with zero rows is reused.
    fn gate<S: MonitoringStore>(
        store: &mut S,
        sensor_id: i64,
        checksum: &str,
        stored_path: &str,
        file_mtime: Option<DateTime<Utc>>,
    ) -> Result<Gate, ImportError> {
        match store.find_ingest_file(sensor_id, checksum)? {
            Some(existing) if existing.rows_imported > 0 => Ok(Gate::Duplicate),
            Some(existing) => {
                debug!(
                    "Import: retrying ingest {} ({}) which previously imported no rows",
                    existing.id, existing.path
                );
                store.refresh_ingest_file(existing.id, file_mtime, ingest_status::PENDING)?;
                Ok(Gate::Proceed { ingest_id: existing.id })
            }
            None => {
                let created = store.create_ingest_file(&NewIngestFile {
                    sensor_id,
                    path: stored_path.to_string(),
                    checksum: checksum.to_string(),
                    file_mtime,
                    status: ingest_status::PENDING.to_string(),
                    rows_imported: 0,
                    is_simulated: false,
                })?;
                Ok(Gate::Proceed { ingest_id: created.id })
            }
        }
    }

    fn ensure_metrics<S: MonitoringStore>(
        &self,
        store: &mut S,
        sensor_id: i64,
        parsed: &ParsedWorkbook,
    ) -> Result<BTreeMap<MetricKey, i64>, ImportError> {
        let mut ids = BTreeMap::new();
        for binding in &parsed.bindings {
            if ids.contains_key(&binding.metric) {
                continue;
            }
            let thresholds = binding.metric.warn_thresholds();
            let metric = store.get_or_create_metric(&NewSensorMetric {
                sensor_id,
                metric_key: binding.metric.as_str().to_string(),
                name: binding.metric.display_name().to_string(),
                unit: binding.unit.map(String::from),
                data_type: binding.data_type.to_string(),
                warn_low: thresholds.low,
                warn_high: thresholds.high,
                is_simulated: false,
            })?;
            ids.insert(binding.metric, metric.id);
        }
        Ok(ids)
    }

    fn store_readings<S: MonitoringStore>(
        &self,
        store: &mut S,
        sensor_id: i64,
        ingest_id: i64,
        parsed: &ParsedWorkbook,
        metric_ids: &BTreeMap<MetricKey, i64>,
    ) -> Result<usize, ImportError> {
        let mut pending = Vec::new();
        for row in &parsed.rows {
            let raw_values = serde_json::Value::Object(row.raw.clone());
            for (metric, cell) in &row.metrics {
                let Some(&metric_id) = metric_ids.get(metric) else {
                    continue;
                };
                let Some(value) = split_value(&cell.value) else {
                    continue;
                };
                let (value_num, value_text) = value.into_columns();
                pending.push(NewSensorReading {
                    sensor_id,
                    metric_id,
                    reading_time: row.reading_time,
                    value_num,
                    value_text,
                    unit: cell.unit.map(String::from),
                    raw_values: Some(raw_values.clone()),
                    source_file_id: ingest_id,
                    quality_flag: quality_flag::NORMAL.to_string(),
                    remark: None,
                    is_simulated: false,
                });
            }
        }

        let mut total = 0usize;
        for chunk in pending.chunks(self.batch_size.get()) {
            let affected = store.insert_readings(chunk)?;
            if affected.is_none() {
                warn!("Import: backend did not report affected rows; counting the batch of {}", chunk.len());
            }
            total += affected.unwrap_or(chunk.len());
        }
        debug!(
            "Import: {} readings prepared, {} inserted in batches of {}",
            pending.len(),
            total,
            self.batch_size
        );
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    fn data_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data")
    }

    fn importer(root: &Path) -> Importer {
        Importer::new(
            root,
            SiteConfig::default(),
            NonZeroUsize::new(500).expect("non-zero"),
        )
    }

    fn copy_fixture(dir: &Path, fixture: &str, as_name: &str) -> PathBuf {
        let target = dir.join(as_name);
        std::fs::copy(data_dir().join(fixture), &target).expect("copy fixture");
        target
    }

    #[test]
    fn first_import_succeeds_and_second_is_duplicate() {
        let importer = importer(&data_dir());
        let mut store = MemoryStore::new();

        let first = importer
            .import_file(&mut store, Path::new("Pf-1.xlsx"))
            .expect("first import");
        assert_eq!(first.status, ImportStatus::Success);
        assert_eq!(first.sensor.as_deref(), Some("Pf-1"));
        assert_eq!(first.rows, Some(8));
        assert!(first.warnings.is_empty());
        assert!(Path::new(&first.path).is_absolute());
        assert_eq!(store.state.readings.len(), 8);

        let ingest = &store.state.ingest_files[0];
        assert_eq!(ingest.path, "Pf-1.xlsx");
        assert_eq!(ingest.rows_imported, 8);
        assert_eq!(ingest.status, ingest_status::SUCCESS);
        assert!(ingest.file_mtime.is_some());

        let second = importer
            .import_file(&mut store, Path::new("Pf-1.xlsx"))
            .expect("second import");
        assert_eq!(second.status, ImportStatus::Skipped);
        assert_eq!(second.reason, Some(SkipReason::DuplicateChecksum));
        assert_eq!(second.sensor.as_deref(), Some("Pf-1"));
        assert_eq!(second.rows, None);
        assert_eq!(store.state.readings.len(), 8);
        assert_eq!(store.state.ingest_files.len(), 1);
    }

    #[test]
    fn hierarchy_and_metrics_are_created_once() {
        let importer = importer(&data_dir());
        let mut store = MemoryStore::new();
        importer
            .import_file(&mut store, Path::new("Pf-1.xlsx"))
            .expect("import");

        let state = &store.state;
        assert_eq!(state.facilities.len(), 1);
        assert_eq!(state.facilities[0].code, "MMK-FDYSD");
        assert_eq!(state.sections[0].code, "SEC-1");
        assert_eq!(state.sensor_types[0].code, "pore_pressure");
        assert_eq!(state.sensor_types[0].name, "渗压计");

        let chainage = &state.chainages[0];
        assert_eq!(chainage.chainage_normalized, "出0+123.45");
        assert_eq!(chainage.chainage_value, Some(123.45));
        assert_eq!(chainage.chainage_direction.as_deref(), Some("出"));
        assert_eq!(chainage.elevation, Some(1520.5));

        let sensor = &state.sensors[0];
        assert_eq!(sensor.chainage_id, Some(chainage.id));
        assert_eq!(sensor.factory_code.as_deref(), Some("12345"));
        assert_eq!(sensor.install_date, chrono::NaiveDate::from_ymd_opt(2020, 5, 1));
        assert_eq!(sensor.instrument_model.as_deref(), Some("BGK-4500S"));
        assert_eq!(sensor.source_file.as_deref(), Some("Pf-1.xlsx"));
        assert!(sensor.parameters.as_ref().is_some_and(|p| p.get("灵敏度").is_some()));

        let mut keys: Vec<&str> = state.metrics.iter().map(|m| m.metric_key.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["freq_modulus", "pore_pressure", "temperature"]);
        let pore = state
            .metrics
            .iter()
            .find(|m| m.metric_key == "pore_pressure")
            .expect("pore metric");
        assert_eq!(pore.name, "渗透压力");
        assert_eq!(pore.unit.as_deref(), Some("kPa"));
        assert_eq!(pore.warn_high, Some(80.0));
        assert_eq!(pore.warn_low, None);
    }

    #[test]
    fn readings_split_numeric_and_text_values() {
        let importer = importer(&data_dir());
        let mut store = MemoryStore::new();
        importer
            .import_file(&mut store, Path::new("Pf-1.xlsx"))
            .expect("import");

        let readings = store.readings_for("Pf-1");
        assert_eq!(readings.len(), 8);
        for r in &readings {
            assert!(r.value_num.is_some() != r.value_text.is_some());
            assert_eq!(r.quality_flag, "normal");
            assert!(r.raw_values.as_ref().is_some_and(|v| v.get("备注").is_some()));
        }
        let text: Vec<&str> = readings.iter().filter_map(|r| r.value_text.as_deref()).collect();
        assert_eq!(text, vec!["故障"]);
        let faulty = readings
            .iter()
            .find(|r| r.value_text.is_some())
            .expect("text reading");
        assert_eq!(store.metric_key_of(faulty.metric_id), Some("pore_pressure"));
    }

    #[test]
    fn renamed_copy_with_same_bytes_is_duplicate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = copy_fixture(dir.path(), "Pf-1.xlsx", "Pf-1.xlsx");
        let renamed = copy_fixture(dir.path(), "Pf-1.xlsx", "Pf-1 (copy).xlsx");
        let importer = importer(dir.path());
        let mut store = MemoryStore::new();

        importer.import_file(&mut store, &original).expect("first import");
        let outcome = importer.import_file(&mut store, &renamed).expect("renamed import");
        assert_eq!(outcome.reason, Some(SkipReason::DuplicateChecksum));
        assert_eq!(store.state.readings.len(), 8);
    }

    #[test]
    fn changed_bytes_import_as_new_ingest() {
        let importer = importer(&data_dir());
        let mut store = MemoryStore::new();

        importer
            .import_file(&mut store, Path::new("Pf-1.xlsx"))
            .expect("original");
        let revised = importer
            .import_file(&mut store, Path::new("Pf-1_rev.xlsx"))
            .expect("revision");
        assert_eq!(revised.status, ImportStatus::Success);
        assert_eq!(revised.rows, Some(11));
        assert_eq!(store.state.ingest_files.len(), 2);
        assert_eq!(store.state.sensors.len(), 1);
    }

    #[test]
    fn missing_file_is_skipped_without_writes() {
        let importer = importer(&data_dir());
        let mut store = MemoryStore::new();
        let outcome = importer
            .import_file(&mut store, Path::new("does-not-exist.xlsx"))
            .expect("not an error");
        assert_eq!(outcome.status, ImportStatus::Skipped);
        assert_eq!(outcome.reason, Some(SkipReason::FileNotFound));
        assert!(outcome.path.ends_with("does-not-exist.xlsx"));
        assert!(store.state.sensors.is_empty());
    }

    #[test]
    fn zero_row_file_can_be_retried_on_the_same_record() {
        let importer = importer(&data_dir());
        let mut store = MemoryStore::new();

        let first = importer
            .import_file(&mut store, Path::new("Df-3.xlsx"))
            .expect("first");
        assert_eq!(first.status, ImportStatus::Success);
        assert_eq!(first.rows, Some(0));
        assert_eq!(store.zero_row_ingest_paths().expect("listing"), vec!["Df-3.xlsx"]);

        let retry = importer
            .import_file(&mut store, Path::new("Df-3.xlsx"))
            .expect("retry");
        assert_eq!(retry.status, ImportStatus::Success);
        assert_eq!(store.state.ingest_files.len(), 1);
        assert_eq!(store.state.metrics.len(), 3);
    }

    #[test]
    fn zero_row_record_is_reused_and_row_count_grows() {
        let importer = importer(&data_dir());
        let mut store = MemoryStore::new();

        // simulate an earlier attempt at the same bytes that produced nothing
        importer
            .import_file(&mut store, Path::new("Pf-1.xlsx"))
            .expect("seed");
        store.state.readings.clear();
        let seeded_id = store.state.ingest_files[0].id;
        store.state.ingest_files[0].rows_imported = 0;

        let outcome = importer
            .import_file(&mut store, Path::new("Pf-1.xlsx"))
            .expect("retry");
        assert_eq!(outcome.rows, Some(8));
        assert_eq!(store.state.ingest_files.len(), 1);
        assert_eq!(store.state.ingest_files[0].id, seeded_id);
        assert_eq!(store.state.ingest_files[0].rows_imported, 8);
        assert!(store.readings_for("Pf-1").iter().all(|r| r.source_file_id == seeded_id));
    }

    #[test]
    fn replay_over_existing_readings_adds_no_duplicates() {
        let importer = importer(&data_dir());
        let mut store = MemoryStore::new();
        importer
            .import_file(&mut store, Path::new("Pf-1.xlsx"))
            .expect("first import");
        let keys = |store: &MemoryStore| {
            store
                .state
                .readings
                .iter()
                .map(|r| (r.metric_id, r.reading_time, r.source_file_id))
                .collect::<Vec<_>>()
        };
        let before = keys(&store);
        // the row count was lost but the readings were committed
        store.state.ingest_files[0].rows_imported = 0;

        let outcome = importer
            .import_file(&mut store, Path::new("Pf-1.xlsx"))
            .expect("replay");
        assert_eq!(outcome.status, ImportStatus::Success);
        assert_eq!(outcome.rows, Some(0));
        assert_eq!(store.state.ingest_files.len(), 1);
        assert_eq!(store.state.readings.len(), 8);
        assert_eq!(keys(&store), before);
    }

    #[test]
    fn existing_sensor_metadata_is_not_overwritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let importer = importer(dir.path());
        let mut store = MemoryStore::new();
        let rev = copy_fixture(dir.path(), "Pf-1_rev.xlsx", "Pf-1_rev.xlsx");
        importer.import_file(&mut store, &rev).expect("revision first");
        store.state.sensors[0].factory_code = Some("edited".to_string());

        let original = copy_fixture(dir.path(), "Pf-1.xlsx", "Pf-1.xlsx");
        importer.import_file(&mut store, &original).expect("original");
        assert_eq!(store.state.sensors.len(), 1);
        assert_eq!(store.state.sensors[0].factory_code.as_deref(), Some("edited"));
        assert_eq!(store.state.sensors[0].source_file.as_deref(), Some("Pf-1_rev.xlsx"));
    }

    #[test]
    fn batching_and_unknown_counts() {
        let importer = Importer::new(
            data_dir(),
            SiteConfig::default(),
            NonZeroUsize::new(3).expect("non-zero"),
        );
        let mut store = MemoryStore::new();
        store.hide_insert_counts = true;

        let outcome = importer
            .import_file(&mut store, Path::new("Pf-1.xlsx"))
            .expect("import");
        // 8 readings in batches of 3, each counted by its length
        assert_eq!(outcome.rows, Some(8));
        assert_eq!(store.state.readings.len(), 8);
    }

    #[test]
    fn failure_mid_file_leaves_nothing_behind() {
        let importer = Importer::new(
            data_dir(),
            SiteConfig::default(),
            NonZeroUsize::new(3).expect("non-zero"),
        );
        let mut store = MemoryStore::new();
        store.fail_on_insert_batch = Some(2);

        let err = importer
            .import_file(&mut store, Path::new("Pf-1.xlsx"))
            .expect_err("second batch fails");
        assert!(matches!(err, ImportError::Database { context: "insert readings", .. }));
        assert!(store.state.sensors.is_empty());
        assert!(store.state.ingest_files.is_empty());
        assert!(store.state.readings.is_empty());

        store.fail_on_insert_batch = None;
        let outcome = importer
            .import_file(&mut store, Path::new("Pf-1.xlsx"))
            .expect("clean retry");
        assert_eq!(outcome.status, ImportStatus::Success);
        assert_eq!(outcome.rows, Some(8));
    }

    #[test]
    fn header_fallback_is_flagged_for_review() {
        let importer = importer(&data_dir());
        let mut store = MemoryStore::new();
        let outcome = importer
            .import_file(&mut store, Path::new("Tf-7.xlsx"))
            .expect("import");
        assert_eq!(outcome.status, ImportStatus::Success);
        assert_eq!(outcome.sensor.as_deref(), Some("Tf-7"));
        assert_eq!(outcome.rows, Some(2));
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(store.state.ingest_files[0].status, ingest_status::NEEDS_REVIEW);
    }

    #[test]
    fn outcome_serializes_compactly() {
        let outcome = ImportOutcome::skipped(
            SkipReason::DuplicateChecksum,
            Path::new("/data/Pf-1.xlsx"),
            Some("Pf-1".to_string()),
        );
        let json = serde_json::to_value(&outcome).expect("serializes");
        assert_eq!(
            json,
            serde_json::json!({
                "status": "skipped",
                "reason": "duplicate_checksum",
                "path": "/data/Pf-1.xlsx",
                "sensor": "Pf-1",
            })
        );
    }
}
