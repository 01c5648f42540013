//! Job record and its forward-only lifecycle.
//!
//! `Created -> Processing -> Completed` or `Created -> Processing -> Failed`.
//! Every mutation goes through a method on [`Job`] that checks the
//! transition first, so a record can never move backwards or leave a
//! terminal state.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::progress::PERCENT_COMPLETE;
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Name used in the relational audit store and in event payloads.
    pub fn name(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One client-submitted super-resolution request (a "topic").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub id: JobId,
    /// Client-supplied name; the correlation key in every durable projection.
    pub name: String,
    pub source_url: String,
    pub source_path: PathBuf,
    pub status: JobStatus,
    /// Integer percent in `0..=100`. Reaches 100 only on completion.
    pub progress: u8,
    pub result_path: Option<PathBuf>,
    pub result_url: Option<String>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    pub fn new(
        id: JobId,
        name: impl Into<String>,
        source_url: impl Into<String>,
        source_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            source_url: source_url.into(),
            source_path: source_path.into(),
            status: JobStatus::Created,
            progress: 0,
            result_path: None,
            result_url: None,
            error: None,
            created_at: chrono::Utc::now(),
            completed_at: None,
        }
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// `Created -> Processing`.
    pub fn start(&mut self) -> Result<(), CoreError> {
        self.transition(JobStatus::Processing)
    }

    /// Record tile progress while processing.
    ///
    /// Never lowers the stored value and holds it below 100 until
    /// [`Job::complete`] runs, so `progress == 100` iff `Completed`.
    pub fn record_progress(&mut self, percent: u8) -> Result<(), CoreError> {
        if self.status != JobStatus::Processing {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: JobStatus::Processing,
            });
        }
        let capped = percent.min(PERCENT_COMPLETE - 1);
        self.progress = self.progress.max(capped);
        Ok(())
    }

    /// `Processing -> Completed`.
    pub fn complete(&mut self, result_path: PathBuf, result_url: String) -> Result<(), CoreError> {
        self.transition(JobStatus::Completed)?;
        self.progress = PERCENT_COMPLETE;
        self.result_path = Some(result_path);
        self.result_url = Some(result_url);
        self.completed_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// `Processing -> Failed`, recording the error message.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), CoreError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error.into());
        self.completed_at = Some(chrono::Utc::now());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
