use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseRequest {
    pub id: String,
    pub requested_by: String,
    pub name: String,
    pub details: String,
    pub status: RequestStatus,
    pub admin_note: String,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
}

impl Record for ExerciseRequest {
    const COLLECTION: &'static str = "exercise_requests";

    fn key(&self) -> String {
        self.id.clone()
    }

    fn index_values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("status", self.status.as_str().to_string()),
            ("requested_by", self.requested_by.clone()),
        ]
    }
}
