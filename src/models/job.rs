use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::models::track::Track;

/// Status of a set identification job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Downloading,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    /// `completed` and `error` are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Whether the pipeline may move a job from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Queued, Downloading) | (Downloading, Processing) | (Processing, Completed) => true,
            (from, Error) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Metadata about the acquired recording.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetInfo {
    pub title: String,
    /// Duration in seconds as reported by the source, 0 when unknown.
    pub duration: u64,
    pub uploader: String,
}

/// A set identification job as seen by pollers.
///
/// Records are replaced wholesale in the job store, never edited in place,
/// so a snapshot handed out to a reader stays self-consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub message: String,
    pub url: String,
    pub segment_duration: u64,
    pub tracks: Vec<Track>,
    pub set_info: Option<SetInfo>,
    pub total_duration: u64,
    pub current_position: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SetJob {
    pub fn new(url: String, segment_duration: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Queued,
            message: "Queued...".to_string(),
            url,
            segment_duration,
            tracks: Vec::new(),
            set_info: None,
            total_duration: 0,
            current_position: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
