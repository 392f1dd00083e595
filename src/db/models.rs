//! Diesel model structs for the monitoring hierarchy and its time-series readings.
//!
//! Uniqueness constraints declared by the migration are what keeps repeated
//! imports idempotent: `sensors.point_code`, `sensor_metrics (sensor_id, metric_key)`,
//! `ingest_files (sensor_id, checksum)` and `sensor_readings (metric_id, reading_time, source_file_id)`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema;

// Standardized values for `ingest_files.status`.
pub mod ingest_status {
    pub const PENDING: &str = "pending";
    pub const SUCCESS: &str = "success";
    /// Imported, but the header row had to be guessed.
    pub const NEEDS_REVIEW: &str = "needs_review";
}

pub mod sensor_status {
    pub const ACTIVE: &str = "active";
}

pub mod quality_flag {
    pub const NORMAL: &str = "normal";
}

pub mod data_type {
    pub const NUMBER: &str = "number";
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::sensor_types)]
pub struct SensorType {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub unit: Option<String>,
    pub is_simulated: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::sensor_types)]
pub struct NewSensorType {
    pub code: String,
    pub name: String,
    pub unit: Option<String>,
    pub is_simulated: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::monitoring_facilities)]
pub struct MonitoringFacility {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub facility_type: Option<String>,
    pub is_simulated: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::monitoring_facilities)]
pub struct NewMonitoringFacility {
    pub code: String,
    pub name: String,
    pub facility_type: Option<String>,
    pub is_simulated: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::monitoring_sections)]
#[diesel(belongs_to(MonitoringFacility, foreign_key = facility_id))]
pub struct MonitoringSection {
    pub id: i64,
    pub facility_id: i64,
    pub code: String,
    pub name: String,
    pub section_type: Option<String>,
    pub is_simulated: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::monitoring_sections)]
pub struct NewMonitoringSection {
    pub facility_id: i64,
    pub code: String,
    pub name: String,
    pub section_type: Option<String>,
    pub is_simulated: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::chainage_coordinates)]
#[diesel(belongs_to(MonitoringFacility, foreign_key = facility_id))]
pub struct ChainageCoordinate {
    pub id: i64,
    pub facility_id: i64,
    pub chainage_raw: String,
    pub chainage_normalized: String,
    pub chainage_value: Option<f64>,
    pub chainage_direction: Option<String>,
    pub elevation: Option<f64>,
    pub is_simulated: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::chainage_coordinates)]
pub struct NewChainageCoordinate {
    pub facility_id: i64,
    pub chainage_raw: String,
    pub chainage_normalized: String,
    pub chainage_value: Option<f64>,
    pub chainage_direction: Option<String>,
    pub elevation: Option<f64>,
    pub is_simulated: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::sensors)]
#[diesel(belongs_to(MonitoringSection, foreign_key = section_id))]
#[diesel(belongs_to(SensorType, foreign_key = sensor_type_id))]
pub struct Sensor {
    pub id: i64,
    pub section_id: i64,
    pub sensor_type_id: i64,
    pub chainage_id: Option<i64>,
    pub point_code: String,
    pub factory_code: Option<String>,
    pub install_chainage_raw: Option<String>,
    pub install_elevation: Option<f64>,
    pub install_date: Option<NaiveDate>,
    pub install_location_desc: Option<String>,
    pub instrument_model: Option<String>,
    pub instrument_manufacturer: Option<String>,
    pub reading_device: Option<String>,
    pub parameters: Option<serde_json::Value>,
    pub status: String,
    pub source_file: Option<String>,
    pub is_simulated: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::sensors)]
pub struct NewSensor {
    pub section_id: i64,
    pub sensor_type_id: i64,
    pub chainage_id: Option<i64>,
    pub point_code: String,
    pub factory_code: Option<String>,
    pub install_chainage_raw: Option<String>,
    pub install_elevation: Option<f64>,
    pub install_date: Option<NaiveDate>,
    pub install_location_desc: Option<String>,
    pub instrument_model: Option<String>,
    pub instrument_manufacturer: Option<String>,
    pub reading_device: Option<String>,
    pub parameters: Option<serde_json::Value>,
    pub status: String,
    pub source_file: Option<String>,
    pub is_simulated: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::sensor_metrics)]
#[diesel(belongs_to(Sensor))]
pub struct SensorMetric {
    pub id: i64,
    pub sensor_id: i64,
    pub metric_key: String,
    pub name: String,
    pub unit: Option<String>,
    pub data_type: String,
    pub warn_low: Option<f64>,
    pub warn_high: Option<f64>,
    pub is_simulated: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::sensor_metrics)]
pub struct NewSensorMetric {
    pub sensor_id: i64,
    pub metric_key: String,
    pub name: String,
    pub unit: Option<String>,
    pub data_type: String,
    pub warn_low: Option<f64>,
    pub warn_high: Option<f64>,
    pub is_simulated: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::ingest_files)]
#[diesel(belongs_to(Sensor))]
pub struct IngestFile {
    pub id: i64,
    pub sensor_id: i64,
    /// Relative to the configured data root when the file lives under it.
    pub path: String,
    pub checksum: String,
    pub file_mtime: Option<DateTime<Utc>>,
    pub status: String,
    pub rows_imported: i64,
    pub is_simulated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::ingest_files)]
pub struct NewIngestFile {
    pub sensor_id: i64,
    pub path: String,
    pub checksum: String,
    pub file_mtime: Option<DateTime<Utc>>,
    pub status: String,
    pub rows_imported: i64,
    pub is_simulated: bool,
}

// Exactly one of `value_num` / `value_text` is set; enforced by a CHECK constraint.
#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::sensor_readings)]
pub struct NewSensorReading {
    pub sensor_id: i64,
    pub metric_id: i64,
    pub reading_time: NaiveDateTime,
    pub value_num: Option<f64>,
    pub value_text: Option<String>,
    pub unit: Option<String>,
    pub raw_values: Option<serde_json::Value>,
    pub source_file_id: i64,
    pub quality_flag: String,
    pub remark: Option<String>,
    pub is_simulated: bool,
}
