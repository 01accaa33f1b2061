use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A recorded clinical session. Annotated videos are written under
/// `folder_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Examination {
    pub id: String,
    pub patient_id: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub folder_path: String,
}

impl Examination {
    pub fn new(id: impl Into<String>, folder_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            patient_id: None,
            description: None,
            date: None,
            folder_path: folder_path.into(),
        }
    }
}
