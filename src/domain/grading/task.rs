//! Grading task state machine

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GradingError, GradingResult};
use crate::domain::DomainError;
use crate::domain::item::Item;

/// Lifecycle of a grading task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl GradingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for GradingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item moving through grading.
///
/// Transitions only move forward: `NotStarted -> InProgress` (repeated per
/// attempt) `-> Completed | Failed`, with `Cancelled` reachable from either
/// non-terminal state. Illegal transitions leave the task untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingTask {
    item: Item,
    status: GradingStatus,
    attempt_count: u32,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    result: Option<GradingResult>,
    last_error: Option<GradingError>,
}

impl GradingTask {
    pub fn new(item: Item) -> Self {
        Self {
            item,
            status: GradingStatus::NotStarted,
            attempt_count: 0,
            started_at: None,
            ended_at: None,
            result: None,
            last_error: None,
        }
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn status(&self) -> GradingStatus {
        self.status
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn result(&self) -> Option<&GradingResult> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&GradingError> {
        self.last_error.as_ref()
    }

    /// Wall-clock time between the first attempt and the terminal transition
    pub fn processing_time(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Enter `InProgress` for a new attempt
    pub fn begin_attempt(&mut self) -> Result<(), DomainError> {
        match self.status {
            GradingStatus::NotStarted | GradingStatus::InProgress => {
                if self.started_at.is_none() {
                    self.started_at = Some(Utc::now());
                }
                self.status = GradingStatus::InProgress;
                self.attempt_count += 1;
                Ok(())
            }
            other => Err(self.illegal("begin an attempt", other)),
        }
    }

    /// Remember the error of a failed attempt without leaving `InProgress`
    pub fn record_error(&mut self, error: GradingError) {
        self.last_error = Some(error);
    }

    pub fn complete(&mut self, result: GradingResult) -> Result<(), DomainError> {
        self.require_in_progress("complete")?;
        self.result = Some(result);
        self.finish(GradingStatus::Completed);
        Ok(())
    }

    pub fn fail(&mut self, error: GradingError) -> Result<(), DomainError> {
        self.require_in_progress("fail")?;
        self.last_error = Some(error);
        self.finish(GradingStatus::Failed);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(self.illegal("cancel", self.status));
        }
        self.finish(GradingStatus::Cancelled);
        Ok(())
    }

    fn finish(&mut self, status: GradingStatus) {
        self.status = status;
        self.ended_at = Some(Utc::now());
    }

    fn require_in_progress(&self, action: &str) -> Result<(), DomainError> {
        if self.status == GradingStatus::InProgress {
            Ok(())
        } else {
            Err(self.illegal(action, self.status))
        }
    }

    fn illegal(&self, action: &str, status: GradingStatus) -> DomainError {
        DomainError::validation(format!(
            "Cannot {} task for item '{}' in status {}",
            action,
            self.item.id(),
            status
        ))
    }
}
