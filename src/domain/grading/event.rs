//! Events streamed from a running batch to the host

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use super::{BatchProgress, GradingResult, GradingStatus};

/// Counters and estimates at the moment a progress event fires
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
    pub average_duration: Duration,
    pub eta: Option<DateTime<Utc>>,
}

impl From<&BatchProgress> for ProgressSnapshot {
    fn from(progress: &BatchProgress) -> Self {
        Self {
            completed: progress.completed(),
            failed: progress.failed(),
            total: progress.total(),
            average_duration: progress.average_duration(),
            eta: progress.eta(),
        }
    }
}

/// How an item ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemOutcome {
    Graded { result: Box<GradingResult> },
    Failed { error: String },
}

/// Notifications emitted by the orchestrator, in order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GradingEvent {
    Progress(ProgressSnapshot),
    ItemCompleted {
        item_id: String,
        status: GradingStatus,
        outcome: ItemOutcome,
    },
    BatchCompleted {
        count: usize,
    },
    Error {
        context: String,
        message: String,
    },
}

/// Sending half of the event stream. Events are dropped silently when no
/// receiver is attached or the receiver has gone away.
#[derive(Debug, Clone, Default)]
pub struct EventSender {
    inner: Option<mpsc::UnboundedSender<GradingEvent>>,
}

impl EventSender {
    /// A sender that discards every event
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn emit(&self, event: GradingEvent) {
        if let Some(tx) = &self.inner {
            if tx.send(event).is_err() {
                debug!("Event receiver dropped; discarding grading event");
            }
        }
    }
}

impl From<mpsc::UnboundedSender<GradingEvent>> for EventSender {
    fn from(sender: mpsc::UnboundedSender<GradingEvent>) -> Self {
        Self {
            inner: Some(sender),
        }
    }
}

/// Create a connected sender/receiver pair
pub fn event_channel() -> (EventSender, mpsc::UnboundedReceiver<GradingEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender::from(tx), rx)
}
