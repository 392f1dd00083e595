//! In-memory [`MonitoringStore`] for tests. Enforces the same uniqueness keys as
//! the migration and rolls back by restoring a snapshot.

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::db::models::{
    ChainageCoordinate, IngestFile, MonitoringFacility, MonitoringSection, NewChainageCoordinate, NewIngestFile,
    NewMonitoringFacility, NewMonitoringSection, NewSensor, NewSensorMetric, NewSensorReading, NewSensorType, Sensor,
    SensorMetric, SensorType,
};
use crate::db::store::MonitoringStore;
use crate::services::importer::ImportError;

fn reading_key(row: &NewSensorReading) -> (i64, NaiveDateTime, i64) {
    (row.metric_id, row.reading_time, row.source_file_id)
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    next_id: i64,
    pub sensor_types: Vec<SensorType>,
    pub facilities: Vec<MonitoringFacility>,
    pub sections: Vec<MonitoringSection>,
    pub chainages: Vec<ChainageCoordinate>,
    pub sensors: Vec<Sensor>,
    pub metrics: Vec<SensorMetric>,
    pub ingest_files: Vec<IngestFile>,
    pub readings: Vec<NewSensorReading>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub state: MemoryState,
    /// Report `None` from `insert_readings`, like drivers that cannot count affected rows.
    pub hide_insert_counts: bool,
    /// Fail the n-th call to `insert_readings` (1-based).
    pub fail_on_insert_batch: Option<usize>,
    insert_calls: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn readings_for(&self, point_code: &str) -> Vec<&NewSensorReading> {
        let Some(sensor) = self.state.sensors.iter().find(|s| s.point_code == point_code) else {
            return Vec::new();
        };
        self.state
            .readings
            .iter()
            .filter(|r| r.sensor_id == sensor.id)
            .collect()
    }

    pub fn metric_key_of(&self, metric_id: i64) -> Option<&str> {
        self.state
            .metrics
            .iter()
            .find(|m| m.id == metric_id)
            .map(|m| m.metric_key.as_str())
    }
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

impl MonitoringStore for MemoryStore {
    fn get_or_create_sensor_type(&mut self, new: &NewSensorType) -> Result<SensorType, ImportError> {
        if let Some(found) = self.state.sensor_types.iter().find(|t| t.code == new.code) {
            return Ok(found.clone());
        }
        let row = SensorType {
            id: self.state.next_id(),
            code: new.code.clone(),
            name: new.name.clone(),
            unit: new.unit.clone(),
            is_simulated: new.is_simulated,
            created_at: now(),
        };
        self.state.sensor_types.push(row.clone());
        Ok(row)
    }

    fn get_or_create_facility(&mut self, new: &NewMonitoringFacility) -> Result<MonitoringFacility, ImportError> {
        if let Some(found) = self.state.facilities.iter().find(|f| f.code == new.code) {
            return Ok(found.clone());
        }
        let row = MonitoringFacility {
            id: self.state.next_id(),
            code: new.code.clone(),
            name: new.name.clone(),
            facility_type: new.facility_type.clone(),
            is_simulated: new.is_simulated,
            created_at: now(),
        };
        self.state.facilities.push(row.clone());
        Ok(row)
    }

    fn get_or_create_section(&mut self, new: &NewMonitoringSection) -> Result<MonitoringSection, ImportError> {
        if let Some(found) = self
            .state
            .sections
            .iter()
            .find(|s| s.facility_id == new.facility_id && s.code == new.code)
        {
            return Ok(found.clone());
        }
        let row = MonitoringSection {
            id: self.state.next_id(),
            facility_id: new.facility_id,
            code: new.code.clone(),
            name: new.name.clone(),
            section_type: new.section_type.clone(),
            is_simulated: new.is_simulated,
            created_at: now(),
        };
        self.state.sections.push(row.clone());
        Ok(row)
    }

    fn get_or_create_chainage(&mut self, new: &NewChainageCoordinate) -> Result<ChainageCoordinate, ImportError> {
        if let Some(found) = self
            .state
            .chainages
            .iter()
            .find(|c| c.facility_id == new.facility_id && c.chainage_normalized == new.chainage_normalized)
        {
            return Ok(found.clone());
        }
        let row = ChainageCoordinate {
            id: self.state.next_id(),
            facility_id: new.facility_id,
            chainage_raw: new.chainage_raw.clone(),
            chainage_normalized: new.chainage_normalized.clone(),
            chainage_value: new.chainage_value,
            chainage_direction: new.chainage_direction.clone(),
            elevation: new.elevation,
            is_simulated: new.is_simulated,
            created_at: now(),
        };
        self.state.chainages.push(row.clone());
        Ok(row)
    }

    fn get_or_create_sensor(&mut self, new: &NewSensor) -> Result<Sensor, ImportError> {
        if let Some(found) = self.state.sensors.iter().find(|s| s.point_code == new.point_code) {
            return Ok(found.clone());
        }
        let row = Sensor {
            id: self.state.next_id(),
            section_id: new.section_id,
            sensor_type_id: new.sensor_type_id,
            chainage_id: new.chainage_id,
            point_code: new.point_code.clone(),
            factory_code: new.factory_code.clone(),
            install_chainage_raw: new.install_chainage_raw.clone(),
            install_elevation: new.install_elevation,
            install_date: new.install_date,
            install_location_desc: new.install_location_desc.clone(),
            instrument_model: new.instrument_model.clone(),
            instrument_manufacturer: new.instrument_manufacturer.clone(),
            reading_device: new.reading_device.clone(),
            parameters: new.parameters.clone(),
            status: new.status.clone(),
            source_file: new.source_file.clone(),
            is_simulated: new.is_simulated,
            created_at: now(),
        };
        self.state.sensors.push(row.clone());
        Ok(row)
    }

    fn get_or_create_metric(&mut self, new: &NewSensorMetric) -> Result<SensorMetric, ImportError> {
        if let Some(found) = self
            .state
            .metrics
            .iter()
            .find(|m| m.sensor_id == new.sensor_id && m.metric_key == new.metric_key)
        {
            return Ok(found.clone());
        }
        let row = SensorMetric {
            id: self.state.next_id(),
            sensor_id: new.sensor_id,
            metric_key: new.metric_key.clone(),
            name: new.name.clone(),
            unit: new.unit.clone(),
            data_type: new.data_type.clone(),
            warn_low: new.warn_low,
            warn_high: new.warn_high,
            is_simulated: new.is_simulated,
            created_at: now(),
        };
        self.state.metrics.push(row.clone());
        Ok(row)
    }

    fn find_ingest_file(&mut self, sensor_id: i64, checksum: &str) -> Result<Option<IngestFile>, ImportError> {
        Ok(self
            .state
            .ingest_files
            .iter()
            .find(|i| i.sensor_id == sensor_id && i.checksum == checksum)
            .cloned())
    }

    fn create_ingest_file(&mut self, new: &NewIngestFile) -> Result<IngestFile, ImportError> {
        if self
            .state
            .ingest_files
            .iter()
            .any(|i| i.sensor_id == new.sensor_id && i.checksum == new.checksum)
        {
            return Err(ImportError::Database {
                context: "insert ingest file",
                source: DieselError::DatabaseError(
                    DatabaseErrorKind::UniqueViolation,
                    Box::new("uq_ingest_files_sensor_checksum".to_string()),
                ),
            });
        }
        let row = IngestFile {
            id: self.state.next_id(),
            sensor_id: new.sensor_id,
            path: new.path.clone(),
            checksum: new.checksum.clone(),
            file_mtime: new.file_mtime,
            status: new.status.clone(),
            rows_imported: new.rows_imported,
            is_simulated: new.is_simulated,
            created_at: now(),
            updated_at: now(),
        };
        self.state.ingest_files.push(row.clone());
        Ok(row)
    }

    fn refresh_ingest_file(
        &mut self,
        id: i64,
        file_mtime: Option<DateTime<Utc>>,
        status: &str,
    ) -> Result<(), ImportError> {
        if let Some(row) = self.state.ingest_files.iter_mut().find(|i| i.id == id) {
            row.file_mtime = file_mtime;
            row.status = status.to_string();
            row.updated_at = now();
        }
        Ok(())
    }

    fn finish_ingest_file(&mut self, id: i64, rows_imported: i64, status: &str) -> Result<(), ImportError> {
        if let Some(row) = self.state.ingest_files.iter_mut().find(|i| i.id == id) {
            row.rows_imported = rows_imported;
            row.status = status.to_string();
            row.updated_at = now();
        }
        Ok(())
    }

    fn zero_row_ingest_paths(&mut self) -> Result<Vec<String>, ImportError> {
        let mut paths: Vec<String> = self
            .state
            .ingest_files
            .iter()
            .filter(|i| i.rows_imported == 0)
            .map(|i| i.path.clone())
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    fn insert_readings(&mut self, rows: &[NewSensorReading]) -> Result<Option<usize>, ImportError> {
        self.insert_calls += 1;
        if self.fail_on_insert_batch == Some(self.insert_calls) {
            return Err(ImportError::Database {
                context: "insert readings",
                source: DieselError::DatabaseError(
                    DatabaseErrorKind::ClosedConnection,
                    Box::new("connection lost".to_string()),
                ),
            });
        }

        let mut inserted = 0;
        for row in rows {
            let key = reading_key(row);
            if self.state.readings.iter().any(|r| reading_key(r) == key) {
                continue;
            }
            self.state.readings.push(row.clone());
            inserted += 1;
        }
        Ok(if self.hide_insert_counts { None } else { Some(inserted) })
    }

    fn atomically<T, F>(&mut self, f: F) -> Result<T, ImportError>
    where
        F: FnOnce(&mut Self) -> Result<T, ImportError>,
    {
        let snapshot = self.state.clone();
        let result = f(self);
        if result.is_err() {
            self.state = snapshot;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::quality_flag;
    use chrono::NaiveDate;

    fn reading(metric_id: i64, day: u32, value: f64) -> NewSensorReading {
        NewSensorReading {
            sensor_id: 1,
            metric_id,
            reading_time: NaiveDate::from_ymd_opt(2023, 3, day)
                .and_then(|d| d.and_hms_opt(8, 0, 0))
                .expect("valid timestamp"),
            value_num: Some(value),
            value_text: None,
            unit: None,
            raw_values: None,
            source_file_id: 7,
            quality_flag: quality_flag::NORMAL.to_string(),
            remark: None,
            is_simulated: false,
        }
    }

    #[test]
    fn replayed_batch_inserts_nothing() {
        let mut store = MemoryStore::new();
        let batch = vec![reading(1, 1, 1.0), reading(1, 2, 2.0), reading(2, 1, 3.0)];

        assert_eq!(store.insert_readings(&batch).expect("first insert"), Some(3));
        assert_eq!(store.insert_readings(&batch).expect("replay"), Some(0));
        assert_eq!(store.state.readings.len(), 3);

        // conflicting rows keep the stored value; new keys still go in
        let mixed = vec![reading(1, 1, 99.0), reading(1, 3, 4.0)];
        assert_eq!(store.insert_readings(&mixed).expect("partial"), Some(1));
        assert_eq!(store.state.readings.len(), 4);
        assert_eq!(store.state.readings[0].value_num, Some(1.0));
    }

    #[test]
    fn hidden_counts_still_deduplicate() {
        let mut store = MemoryStore {
            hide_insert_counts: true,
            ..MemoryStore::default()
        };
        let batch = vec![reading(1, 1, 1.0)];
        assert_eq!(store.insert_readings(&batch).expect("first insert"), None);
        assert_eq!(store.insert_readings(&batch).expect("replay"), None);
        assert_eq!(store.state.readings.len(), 1);
    }
}
