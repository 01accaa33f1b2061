//! Persistence for examinations and their detection timelines.

pub mod error;
pub mod sqlite;

use async_trait::async_trait;
use schema::{Detection, Examination};

pub use error::StoreError;
pub use sqlite::SqliteStore;

/// Storage seen by the annotation pipeline and the gateway.
#[async_trait]
pub trait DetectionStore: Send + Sync {
    async fn examination(&self, id: &str) -> Result<Option<Examination>, StoreError>;

    /// Store `detections` under `examination_id` in one transaction: either
    /// every row is committed or none is. Returns the number of rows written.
    async fn insert_detections(
        &self,
        examination_id: &str,
        detections: &[Detection],
    ) -> Result<u64, StoreError>;

    /// All detections of an examination, ascending by timestamp.
    async fn detections_for(&self, examination_id: &str) -> Result<Vec<Detection>, StoreError>;
}
