use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Finished,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub owner_id: String,
    pub template_id: String,
    /// Template name at start time, kept for history after the template is gone.
    pub template_name: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub notes: String,
}

impl Session {
    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    /// Time since start, or total duration once finished. Never negative.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let end = self.finished_at.unwrap_or(now);
        (end - self.started_at).max(Duration::zero())
    }
}

impl Record for Session {
    const COLLECTION: &'static str = "sessions";

    fn key(&self) -> String {
        self.id.clone()
    }

    fn index_values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("owner_id", self.owner_id.clone()),
            ("status", self.status.as_str().to_string()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSet {
    pub id: String,
    pub session_id: String,
    pub exercise_id: String,
    pub set_index: u32,
    pub reps: Option<u32>,
    pub weight_kg: f64,
    pub rir: Option<u32>,
    pub rpe: Option<f64>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl SessionSet {
    pub fn volume_kg(&self) -> f64 {
        self.weight_kg * f64::from(self.reps.unwrap_or(0))
    }
}

impl Record for SessionSet {
    const COLLECTION: &'static str = "session_sets";

    fn key(&self) -> String {
        self.id.clone()
    }

    fn index_values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("session_id", self.session_id.clone()),
            ("exercise_id", self.exercise_id.clone()),
        ]
    }
}

/// Raw set input as typed by the user, before unit conversion.
#[derive(Debug, Clone, Default)]
pub struct SetInput {
    pub weight: String,
    pub reps: Option<String>,
    pub rir: Option<u32>,
    pub rpe: Option<f64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session: Session,
    pub duration: String,
    pub set_count: usize,
    pub exercise_count: usize,
    pub volume_kg: f64,
}

/// Keyed singleton values: the live session pointer and rest state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeEntry {
    pub key: String,
    pub value: serde_json::Value,
}

impl RuntimeEntry {
    pub fn live_session_key(owner: &str) -> String {
        format!("live_session:{}", owner)
    }

    pub fn rest_key(owner: &str) -> String {
        format!("rest:{}", owner)
    }
}

impl Record for RuntimeEntry {
    const COLLECTION: &'static str = "runtime";

    fn key(&self) -> String {
        self.key.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestState {
    pub started_at: DateTime<Utc>,
    pub duration_sec: u32,
}

impl RestState {
    /// Whole seconds left, rounded up and floored at zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> u32 {
        let elapsed_ms = (now - self.started_at).num_milliseconds() as f64;
        let left = (f64::from(self.duration_sec) - elapsed_ms / 1000.0).ceil();
        if left <= 0.0 {
            0
        } else {
            left as u32
        }
    }

    /// Whole seconds past the end of the rest, zero while still running.
    pub fn overdue(&self, now: DateTime<Utc>) -> u32 {
        let over = (now - self.started_at).num_seconds() - i64::from(self.duration_sec);
        over.max(0) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestStatus {
    Idle,
    Running { remaining: u32 },
    Expired { overdue: u32 },
}
