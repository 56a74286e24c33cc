//! SQLite-backed store.
//!
//! One connection behind a mutex. Timestamps are stored as fixed-width
//! RFC 3339 text (microseconds, `Z` suffix) so string comparison orders them
//! chronologically.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ErrorCode, StintError, StintResult};
use crate::traits::{
    AggregateFold, AggregateStore, PredictionStore, SampleStore, SettingsProvider, SettingsStore,
};
use crate::types::{
    Conservativity, DurationSample, PredictionRecord, SampleQuery, Settings, SettingsUpdate,
    TaskAggregate,
};

/// SQLite implementation of every store trait.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn new(path: impl AsRef<Path>) -> StintResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(|e| StintError::Database {
            message: format!("failed to open {}: {}", path.display(), e),
            code: ErrorCode::DbConnectionFailed,
            source: Some(Box::new(e)),
        })?;
        debug!(path = %path.display(), "Opened SQLite store");
        Self::from_connection(conn)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> StintResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StintResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StintResult<()> {
        let conn = self.conn.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS duration_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_identifier TEXT NOT NULL,
                category TEXT NOT NULL,
                duration_ms INTEGER NOT NULL,
                quality_score REAL NOT NULL,
                observed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_samples_task
                ON duration_samples(task_identifier, observed_at);
            CREATE INDEX IF NOT EXISTS idx_samples_category
                ON duration_samples(category, observed_at);
            CREATE INDEX IF NOT EXISTS idx_samples_observed
                ON duration_samples(observed_at);

            CREATE TABLE IF NOT EXISTS task_aggregates (
                identifier TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                total_duration_ms INTEGER NOT NULL,
                sample_count INTEGER NOT NULL,
                running_weighted_quality REAL NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS predictions (
                id TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                predicted_ms INTEGER NOT NULL,
                actual_ms INTEGER,
                conservativity REAL NOT NULL,
                created_at TEXT NOT NULL,
                reconciled_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_predictions_category
                ON predictions(category);

            -- Single row, id = 1
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                conservativity REAL NOT NULL,
                tracked_sites TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    /// Insert `settings` unless settings were stored before.
    ///
    /// Returns whether the seed was written.
    pub fn seed_settings(&self, settings: &Settings) -> StintResult<bool> {
        let conn = self.conn.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO settings (id, conservativity, tracked_sites) VALUES (1, ?1, ?2)",
            params![
                settings.conservativity.value(),
                serde_json::to_string(&settings.tracked_sites)?
            ],
        )?;
        Ok(inserted > 0)
    }

    fn read_settings(conn: &Connection) -> StintResult<Settings> {
        conn.query_row(
            "SELECT conservativity, tracked_sites FROM settings WHERE id = 1",
            [],
            |row| {
                let conservativity: f64 = row.get(0)?;
                let tracked_sites: String = row.get(1)?;
                Ok((conservativity, tracked_sites))
            },
        )
        .optional()?
        .map(|(conservativity, tracked_sites)| -> StintResult<Settings> {
            Ok(Settings {
                conservativity: Conservativity::new(conservativity)?,
                tracked_sites: serde_json::from_str(&tracked_sites)?,
            })
        })
        .unwrap_or_else(|| Ok(Settings::default()))
    }

    fn row_to_sample(row: &rusqlite::Row<'_>) -> StintResult<DurationSample> {
        let observed_at: String = row.get(4)?;
        Ok(DurationSample {
            task_identifier: row.get(0)?,
            category: row.get(1)?,
            duration_ms: row.get(2)?,
            quality_score: row.get(3)?,
            observed_at: parse_timestamp(&observed_at)?,
        })
    }

    fn row_to_aggregate(row: &rusqlite::Row<'_>) -> StintResult<TaskAggregate> {
        let created_at: String = row.get(5)?;
        let updated_at: String = row.get(6)?;
        Ok(TaskAggregate {
            identifier: row.get(0)?,
            category: row.get(1)?,
            total_duration_ms: row.get(2)?,
            sample_count: row.get(3)?,
            running_weighted_quality: row.get(4)?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }

    fn row_to_prediction(row: &rusqlite::Row<'_>) -> StintResult<PredictionRecord> {
        let id: String = row.get(0)?;
        let conservativity: f64 = row.get(4)?;
        let created_at: String = row.get(5)?;
        let reconciled_at: Option<String> = row.get(6)?;
        Ok(PredictionRecord {
            id: Uuid::parse_str(&id).map_err(|e| StintError::invalid_id(e.to_string()))?,
            category: row.get(1)?,
            predicted_ms: row.get(2)?,
            actual_ms: row.get(3)?,
            conservativity: Conservativity::new(conservativity)?,
            created_at: parse_timestamp(&created_at)?,
            reconciled_at: reconciled_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }

    fn collect_samples(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StintResult<Vec<DurationSample>> {
        let mut stmt = conn.prepare(sql)?;
        let results = stmt.query_map(params, |row| Ok(Self::row_to_sample(row)))?;

        results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect()
    }
}

const SAMPLE_COLUMNS: &str =
    "SELECT task_identifier, category, duration_ms, quality_score, observed_at FROM duration_samples";

const AGGREGATE_COLUMNS: &str = "SELECT identifier, category, total_duration_ms, sample_count, \
     running_weighted_quality, created_at, updated_at FROM task_aggregates";

const PREDICTION_COLUMNS: &str = "SELECT id, category, predicted_ms, actual_ms, conservativity, \
     created_at, reconciled_at FROM predictions";

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> StintResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StintError::invalid_timestamp(format!("{}: {}", value, e)))
}

impl SampleStore for SqliteStore {
    fn append(&self, sample: &DurationSample) -> StintResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            r#"INSERT INTO duration_samples
               (task_identifier, category, duration_ms, quality_score, observed_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                sample.task_identifier,
                sample.category,
                sample.duration_ms,
                sample.quality_score,
                format_timestamp(sample.observed_at),
            ],
        )?;
        Ok(())
    }

    fn remove(&self, sample: &DurationSample) -> StintResult<bool> {
        let conn = self.conn.lock()?;
        let removed = conn.execute(
            r#"DELETE FROM duration_samples WHERE id = (
                   SELECT id FROM duration_samples
                   WHERE task_identifier = ?1 AND category = ?2 AND duration_ms = ?3
                     AND quality_score = ?4 AND observed_at = ?5
                   ORDER BY id DESC LIMIT 1
               )"#,
            params![
                sample.task_identifier,
                sample.category,
                sample.duration_ms,
                sample.quality_score,
                format_timestamp(sample.observed_at),
            ],
        )?;
        Ok(removed > 0)
    }

    fn query_samples(&self, query: &SampleQuery) -> StintResult<Vec<DurationSample>> {
        let conn = self.conn.lock()?;
        let sql = format!(
            "{} WHERE (?1 IS NULL OR task_identifier = ?1) AND (?2 IS NULL OR category = ?2) \
             ORDER BY observed_at ASC, id ASC",
            SAMPLE_COLUMNS
        );
        Self::collect_samples(
            &conn,
            &sql,
            params![query.task_identifier, query.category],
        )
    }

    fn samples_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StintResult<Vec<DurationSample>> {
        let conn = self.conn.lock()?;
        let sql = format!(
            "{} WHERE observed_at >= ?1 AND observed_at < ?2 ORDER BY observed_at ASC, id ASC",
            SAMPLE_COLUMNS
        );
        Self::collect_samples(
            &conn,
            &sql,
            params![format_timestamp(start), format_timestamp(end)],
        )
    }
}

impl AggregateStore for SqliteStore {
    fn update(&self, identifier: &str, fold: AggregateFold<'_>) -> StintResult<TaskAggregate> {
        let mut conn = self.conn.lock()?;
        // IMMEDIATE takes the write lock up front, so other connections to the
        // same file cannot interleave between the read and the write.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = tx
            .query_row(
                &format!("{} WHERE identifier = ?1", AGGREGATE_COLUMNS),
                params![identifier],
                |row| Ok(Self::row_to_aggregate(row)),
            )
            .optional()?
            .transpose()?;

        // Dropping the transaction on error rolls it back.
        let updated = fold(current)?;
        tx.execute(
            r#"INSERT INTO task_aggregates
               (identifier, category, total_duration_ms, sample_count,
                running_weighted_quality, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
               ON CONFLICT(identifier) DO UPDATE SET
                   category = excluded.category,
                   total_duration_ms = excluded.total_duration_ms,
                   sample_count = excluded.sample_count,
                   running_weighted_quality = excluded.running_weighted_quality,
                   updated_at = excluded.updated_at"#,
            params![
                updated.identifier,
                updated.category,
                updated.total_duration_ms,
                updated.sample_count,
                updated.running_weighted_quality,
                format_timestamp(updated.created_at),
                format_timestamp(updated.updated_at),
            ],
        )?;
        tx.commit()?;
        Ok(updated)
    }

    fn get(&self, identifier: &str) -> StintResult<Option<TaskAggregate>> {
        let conn = self.conn.lock()?;
        conn.query_row(
            &format!("{} WHERE identifier = ?1", AGGREGATE_COLUMNS),
            params![identifier],
            |row| Ok(Self::row_to_aggregate(row)),
        )
        .optional()?
        .transpose()
    }

    fn list(&self, category: Option<&str>) -> StintResult<Vec<TaskAggregate>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE (?1 IS NULL OR category = ?1) ORDER BY identifier ASC",
            AGGREGATE_COLUMNS
        ))?;
        let results = stmt.query_map(params![category], |row| Ok(Self::row_to_aggregate(row)))?;

        results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect()
    }

    fn reset(&self, identifier: &str) -> StintResult<bool> {
        let conn = self.conn.lock()?;
        let deleted = conn.execute(
            "DELETE FROM task_aggregates WHERE identifier = ?1",
            params![identifier],
        )?;
        Ok(deleted > 0)
    }
}

impl PredictionStore for SqliteStore {
    fn save(&self, record: &PredictionRecord) -> StintResult<Uuid> {
        let conn = self.conn.lock()?;
        conn.execute(
            r#"INSERT INTO predictions
               (id, category, predicted_ms, actual_ms, conservativity, created_at, reconciled_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                record.id.to_string(),
                record.category,
                record.predicted_ms,
                record.actual_ms,
                record.conservativity.value(),
                format_timestamp(record.created_at),
                record.reconciled_at.map(format_timestamp),
            ],
        )?;
        Ok(record.id)
    }

    fn find(&self, id: Uuid) -> StintResult<Option<PredictionRecord>> {
        let conn = self.conn.lock()?;
        conn.query_row(
            &format!("{} WHERE id = ?1", PREDICTION_COLUMNS),
            params![id.to_string()],
            |row| Ok(Self::row_to_prediction(row)),
        )
        .optional()?
        .transpose()
    }

    fn update_actual(&self, id: Uuid, actual_ms: u64, at: DateTime<Utc>) -> StintResult<bool> {
        let conn = self.conn.lock()?;
        let updated = conn.execute(
            "UPDATE predictions SET actual_ms = ?2, reconciled_at = ?3 \
             WHERE id = ?1 AND actual_ms IS NULL",
            params![id.to_string(), actual_ms, format_timestamp(at)],
        )?;
        Ok(updated > 0)
    }

    fn reconciled(&self, category: Option<&str>) -> StintResult<Vec<PredictionRecord>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE actual_ms IS NOT NULL AND (?1 IS NULL OR category = ?1) \
             ORDER BY created_at ASC",
            PREDICTION_COLUMNS
        ))?;
        let results = stmt.query_map(params![category], |row| Ok(Self::row_to_prediction(row)))?;

        results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect()
    }
}

impl SettingsProvider for SqliteStore {
    fn conservativity(&self) -> StintResult<Conservativity> {
        let conn = self.conn.lock()?;
        Ok(Self::read_settings(&conn)?.conservativity)
    }
}

impl SettingsStore for SqliteStore {
    fn settings(&self) -> StintResult<Settings> {
        let conn = self.conn.lock()?;
        Self::read_settings(&conn)
    }

    fn update_settings(&self, update: SettingsUpdate) -> StintResult<Settings> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut settings = Self::read_settings(&tx)?;
        settings.apply(update);
        tx.execute(
            r#"INSERT INTO settings (id, conservativity, tracked_sites) VALUES (1, ?1, ?2)
               ON CONFLICT(id) DO UPDATE SET
                   conservativity = excluded.conservativity,
                   tracked_sites = excluded.tracked_sites"#,
            params![
                settings.conservativity.value(),
                serde_json::to_string(&settings.tracked_sites)?
            ],
        )?;
        tx.commit()?;
        Ok(settings)
    }
}
