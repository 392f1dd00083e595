//! Persistence seam for the importer.
//!
//! [`MonitoringStore`] has one method per write or lookup the import pipeline
//! needs. [`PgStore`] backs it with diesel over a single blocking connection;
//! tests use the in-memory store in `db::memory`.

use chrono::{DateTime, Utc};
use diesel::connection::TransactionManager;
use diesel::prelude::*;
use diesel::PgConnection;
use log::warn;

use crate::db::models::{
    ChainageCoordinate, IngestFile, MonitoringFacility, MonitoringSection, NewChainageCoordinate, NewIngestFile,
    NewMonitoringFacility, NewMonitoringSection, NewSensor, NewSensorMetric, NewSensorReading, NewSensorType, Sensor,
    SensorMetric, SensorType,
};
use crate::schema;
use crate::services::importer::ImportError;

pub trait MonitoringStore {
    /// Look up by `code`, inserting `new` when absent. Existing rows are returned untouched.
    fn get_or_create_sensor_type(&mut self, new: &NewSensorType) -> Result<SensorType, ImportError>;
    fn get_or_create_facility(&mut self, new: &NewMonitoringFacility) -> Result<MonitoringFacility, ImportError>;
    fn get_or_create_section(&mut self, new: &NewMonitoringSection) -> Result<MonitoringSection, ImportError>;
    fn get_or_create_chainage(&mut self, new: &NewChainageCoordinate) -> Result<ChainageCoordinate, ImportError>;
    /// Keyed by `point_code`; an existing sensor's metadata is never overwritten.
    fn get_or_create_sensor(&mut self, new: &NewSensor) -> Result<Sensor, ImportError>;
    fn get_or_create_metric(&mut self, new: &NewSensorMetric) -> Result<SensorMetric, ImportError>;

    fn find_ingest_file(&mut self, sensor_id: i64, checksum: &str) -> Result<Option<IngestFile>, ImportError>;
    fn create_ingest_file(&mut self, new: &NewIngestFile) -> Result<IngestFile, ImportError>;
    fn refresh_ingest_file(
        &mut self,
        id: i64,
        file_mtime: Option<DateTime<Utc>>,
        status: &str,
    ) -> Result<(), ImportError>;
    fn finish_ingest_file(&mut self, id: i64, rows_imported: i64, status: &str) -> Result<(), ImportError>;
    /// Paths of ingest records that imported nothing, for the retry pass.
    fn zero_row_ingest_paths(&mut self) -> Result<Vec<String>, ImportError>;

    /// Insert one batch, ignoring rows that collide on (metric, reading time, source file).
    /// `None` means the backend could not say how many rows landed.
    fn insert_readings(&mut self, rows: &[NewSensorReading]) -> Result<Option<usize>, ImportError>;

    /// Run `f` as one unit of work: everything it wrote is kept on `Ok` and discarded on `Err`.
    fn atomically<T, F>(&mut self, f: F) -> Result<T, ImportError>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T, ImportError>;
}

fn db_err(context: &'static str) -> impl FnOnce(diesel::result::Error) -> ImportError {
    move |source| ImportError::Database { context, source }
}

pub struct PgStore {
    conn: PgConnection,
}

impl PgStore {
    pub fn new(conn: PgConnection) -> Self {
        PgStore { conn }
    }
}

impl MonitoringStore for PgStore {
    fn get_or_create_sensor_type(&mut self, new: &NewSensorType) -> Result<SensorType, ImportError> {
        use schema::sensor_types::dsl as ST;

        diesel::insert_into(ST::sensor_types)
            .values(new)
            .on_conflict(ST::code)
            .do_nothing()
            .execute(&mut self.conn)
            .map_err(db_err("insert sensor type"))?;
        ST::sensor_types
            .filter(ST::code.eq(&new.code))
            .select(SensorType::as_select())
            .first(&mut self.conn)
            .map_err(db_err("fetch sensor type"))
    }

    fn get_or_create_facility(&mut self, new: &NewMonitoringFacility) -> Result<MonitoringFacility, ImportError> {
        use schema::monitoring_facilities::dsl as F;

        diesel::insert_into(F::monitoring_facilities)
            .values(new)
            .on_conflict(F::code)
            .do_nothing()
            .execute(&mut self.conn)
            .map_err(db_err("insert facility"))?;
        F::monitoring_facilities
            .filter(F::code.eq(&new.code))
            .select(MonitoringFacility::as_select())
            .first(&mut self.conn)
            .map_err(db_err("fetch facility"))
    }

    fn get_or_create_section(&mut self, new: &NewMonitoringSection) -> Result<MonitoringSection, ImportError> {
        use schema::monitoring_sections::dsl as S;

        diesel::insert_into(S::monitoring_sections)
            .values(new)
            .on_conflict((S::facility_id, S::code))
            .do_nothing()
            .execute(&mut self.conn)
            .map_err(db_err("insert section"))?;
        S::monitoring_sections
            .filter(S::facility_id.eq(new.facility_id).and(S::code.eq(&new.code)))
            .select(MonitoringSection::as_select())
            .first(&mut self.conn)
            .map_err(db_err("fetch section"))
    }

    fn get_or_create_chainage(&mut self, new: &NewChainageCoordinate) -> Result<ChainageCoordinate, ImportError> {
        use schema::chainage_coordinates::dsl as C;

        diesel::insert_into(C::chainage_coordinates)
            .values(new)
            .on_conflict((C::facility_id, C::chainage_normalized))
            .do_nothing()
            .execute(&mut self.conn)
            .map_err(db_err("insert chainage"))?;
        C::chainage_coordinates
            .filter(
                C::facility_id
                    .eq(new.facility_id)
                    .and(C::chainage_normalized.eq(&new.chainage_normalized)),
            )
            .select(ChainageCoordinate::as_select())
            .first(&mut self.conn)
            .map_err(db_err("fetch chainage"))
    }

    fn get_or_create_sensor(&mut self, new: &NewSensor) -> Result<Sensor, ImportError> {
        use schema::sensors::dsl as SN;

        diesel::insert_into(SN::sensors)
            .values(new)
            .on_conflict(SN::point_code)
            .do_nothing()
            .execute(&mut self.conn)
            .map_err(db_err("insert sensor"))?;
        SN::sensors
            .filter(SN::point_code.eq(&new.point_code))
            .select(Sensor::as_select())
            .first(&mut self.conn)
            .map_err(db_err("fetch sensor"))
    }

    fn get_or_create_metric(&mut self, new: &NewSensorMetric) -> Result<SensorMetric, ImportError> {
        use schema::sensor_metrics::dsl as M;

        diesel::insert_into(M::sensor_metrics)
            .values(new)
            .on_conflict((M::sensor_id, M::metric_key))
            .do_nothing()
            .execute(&mut self.conn)
            .map_err(db_err("insert metric"))?;
        M::sensor_metrics
            .filter(M::sensor_id.eq(new.sensor_id).and(M::metric_key.eq(&new.metric_key)))
            .select(SensorMetric::as_select())
            .first(&mut self.conn)
            .map_err(db_err("fetch metric"))
    }

    fn find_ingest_file(&mut self, sensor_id: i64, checksum: &str) -> Result<Option<IngestFile>, ImportError> {
        use schema::ingest_files::dsl as I;

        I::ingest_files
            .filter(I::sensor_id.eq(sensor_id).and(I::checksum.eq(checksum)))
            .select(IngestFile::as_select())
            .first(&mut self.conn)
            .optional()
            .map_err(db_err("fetch ingest file"))
    }

    fn create_ingest_file(&mut self, new: &NewIngestFile) -> Result<IngestFile, ImportError> {
        use schema::ingest_files::dsl as I;

        diesel::insert_into(I::ingest_files)
            .values(new)
            .returning(IngestFile::as_returning())
            .get_result(&mut self.conn)
            .map_err(db_err("insert ingest file"))
    }

    fn refresh_ingest_file(
        &mut self,
        id: i64,
        file_mtime: Option<DateTime<Utc>>,
        status: &str,
    ) -> Result<(), ImportError> {
        use schema::ingest_files::dsl as I;

        diesel::update(I::ingest_files.find(id))
            .set((
                I::file_mtime.eq(file_mtime),
                I::status.eq(status),
                I::updated_at.eq(Utc::now()),
            ))
            .execute(&mut self.conn)
            .map(|_| ())
            .map_err(db_err("refresh ingest file"))
    }

    fn finish_ingest_file(&mut self, id: i64, rows_imported: i64, status: &str) -> Result<(), ImportError> {
        use schema::ingest_files::dsl as I;

        diesel::update(I::ingest_files.find(id))
            .set((
                I::rows_imported.eq(rows_imported),
                I::status.eq(status),
                I::updated_at.eq(Utc::now()),
            ))
            .execute(&mut self.conn)
            .map(|_| ())
            .map_err(db_err("finish ingest file"))
    }

    fn zero_row_ingest_paths(&mut self) -> Result<Vec<String>, ImportError> {
        use schema::ingest_files::dsl as I;

        I::ingest_files
            .filter(I::rows_imported.eq(0))
            .select(I::path)
            .distinct()
            .order(I::path.asc())
            .load::<String>(&mut self.conn)
            .map_err(db_err("list zero-row ingest files"))
    }

    fn insert_readings(&mut self, rows: &[NewSensorReading]) -> Result<Option<usize>, ImportError> {
        if rows.is_empty() {
            return Ok(Some(0));
        }

        use schema::sensor_readings::dsl as R;

        diesel::insert_into(R::sensor_readings)
            .values(rows)
            .on_conflict((R::metric_id, R::reading_time, R::source_file_id))
            .do_nothing()
            .execute(&mut self.conn)
            .map(Some)
            .map_err(db_err("insert readings"))
    }

    fn atomically<T, F>(&mut self, f: F) -> Result<T, ImportError>
    where
        F: FnOnce(&mut Self) -> Result<T, ImportError>,
    {
        type Tm = <PgConnection as Connection>::TransactionManager;

        Tm::begin_transaction(&mut self.conn).map_err(db_err("begin transaction"))?;
        match f(self) {
            Ok(value) => {
                Tm::commit_transaction(&mut self.conn).map_err(db_err("commit transaction"))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = Tm::rollback_transaction(&mut self.conn) {
                    warn!("Import: rollback failed after error ({}): {}", e, rollback);
                }
                Err(e)
            }
        }
    }
}
