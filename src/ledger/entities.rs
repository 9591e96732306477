use serde::{Deserialize, Serialize};

use crate::catalog::CUSTOM_ACTIVITY_ID;

/// Comment inserted when an activity is created without one.
pub const DEFAULT_COMMENT: &str = "Inicio de actividad";

#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct Comment {
    pub text: String,
    pub timestamp: String,
}

/// One timed activity. The serialized field names are the export file format.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct Activity {
    pub id: u32,
    pub name: String,
    /// Seconds spent running, accumulated over every start/stop cycle.
    #[serde(rename = "time")]
    pub elapsed_seconds: u64,
    #[serde(rename = "totalPauseTime")]
    pub total_pause_seconds: f64,
    /// Snapshot of `elapsed_seconds + total_pause_seconds` taken on the last stop.
    #[serde(rename = "totalTime")]
    pub total_seconds: f64,
    pub comments: Vec<Comment>,
    #[serde(rename = "startTimes", default)]
    pub start_timestamps: Vec<String>,
    #[serde(rename = "endTimes", default)]
    pub end_timestamps: Vec<String>,
}

impl Activity {
    /// Fresh activity with zeroed counters, the first start timestamp and one comment.
    pub fn new(id: u32, name: String, comment: Comment, started_at: String) -> Self {
        Self {
            id,
            name,
            elapsed_seconds: 0,
            total_pause_seconds: 0.,
            total_seconds: 0.,
            comments: vec![comment],
            start_timestamps: vec![started_at],
            end_timestamps: vec![],
        }
    }

    pub fn key(&self) -> ActivityKey {
        ActivityKey::for_activity(self.id, &self.name)
    }

    pub fn times_started(&self) -> usize {
        self.start_timestamps.len()
    }
}

/// Identity of an activity inside the ledger. Catalog activities are identified by their id.
/// Custom activities all carry the sentinel id, so their name tells them apart.
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub enum ActivityKey {
    Catalog(u32),
    Custom(String),
}

impl ActivityKey {
    pub fn for_activity(id: u32, name: &str) -> Self {
        if id == CUSTOM_ACTIVITY_ID {
            ActivityKey::Custom(name.to_string())
        } else {
            ActivityKey::Catalog(id)
        }
    }

    pub fn matches(&self, activity: &Activity) -> bool {
        match self {
            ActivityKey::Catalog(id) => activity.id == *id,
            ActivityKey::Custom(name) => activity.id == CUSTOM_ACTIVITY_ID && activity.name == *name,
        }
    }
}
