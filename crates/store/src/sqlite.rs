use crate::{DetectionStore, StoreError};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use schema::{Detection, Examination};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Column list for `detections` queries.
const DETECTION_COLUMNS: &str = "examination_id, timestamp, x1, y1, x2, y2, label, confidence";

/// Column list for `examinations` queries.
const EXAMINATION_COLUMNS: &str = "id, patient_id, description, date, folder_path";

#[derive(sqlx::FromRow)]
struct DetectionRow {
    examination_id: String,
    timestamp: f64,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    label: String,
    confidence: f64,
}

impl From<DetectionRow> for Detection {
    fn from(row: DetectionRow) -> Self {
        Self {
            examination_id: row.examination_id,
            timestamp: row.timestamp,
            x1: row.x1,
            y1: row.y1,
            x2: row.x2,
            y2: row.y2,
            label: row.label,
            confidence: row.confidence as f32,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ExaminationRow {
    id: String,
    patient_id: Option<String>,
    description: Option<String>,
    date: Option<NaiveDateTime>,
    folder_path: String,
}

impl From<ExaminationRow> for Examination {
    fn from(row: ExaminationRow) -> Self {
        Self {
            id: row.id,
            patient_id: row.patient_id,
            description: row.description,
            date: row.date,
            folder_path: row.folder_path,
        }
    }
}

/// SQLite-backed store. Foreign keys are enforced so deleting an
/// examination removes its detections.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and apply migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database; one connection so every query sees the
    /// same data.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        MIGRATOR.run(&pool).await?;
        tracing::debug!("Database migrations applied");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert an examination row. Only seeding and tests use this; the
    /// examination CRUD surface lives elsewhere.
    pub async fn create_examination(&self, examination: &Examination) -> Result<(), StoreError> {
        let query = format!(
            "INSERT INTO examinations ({EXAMINATION_COLUMNS}) \
             VALUES (?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP), ?)"
        );
        sqlx::query(&query)
            .bind(&examination.id)
            .bind(examination.patient_id.as_deref())
            .bind(examination.description.as_deref())
            .bind(examination.date)
            .bind(&examination.folder_path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete an examination and, by cascade, its detections. Returns whether
    /// a row existed.
    pub async fn delete_examination(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM examinations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl DetectionStore for SqliteStore {
    async fn examination(&self, id: &str) -> Result<Option<Examination>, StoreError> {
        let query = format!("SELECT {EXAMINATION_COLUMNS} FROM examinations WHERE id = ?");
        let row = sqlx::query_as::<_, ExaminationRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Examination::from))
    }

    async fn insert_detections(
        &self,
        examination_id: &str,
        detections: &[Detection],
    ) -> Result<u64, StoreError> {
        if detections.is_empty() {
            return Ok(0);
        }

        let query = format!("INSERT INTO detections ({DETECTION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)");

        let mut tx = self.pool.begin().await?;
        for d in detections {
            sqlx::query(&query)
                .bind(examination_id)
                .bind(d.timestamp)
                .bind(d.x1)
                .bind(d.y1)
                .bind(d.x2)
                .bind(d.y2)
                .bind(&d.label)
                .bind(d.confidence as f64)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::debug!(
            examination_id,
            count = detections.len(),
            "Detections committed"
        );
        Ok(detections.len() as u64)
    }

    async fn detections_for(&self, examination_id: &str) -> Result<Vec<Detection>, StoreError> {
        let query = format!(
            "SELECT {DETECTION_COLUMNS} FROM detections \
             WHERE examination_id = ? \
             ORDER BY timestamp ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, DetectionRow>(&query)
            .bind(examination_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Detection::from).collect())
    }
}
