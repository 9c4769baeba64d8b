//! Grading domain - Per-item state machine, batch orchestration and reporting

mod cancel;
mod config;
mod error;
mod event;
mod orchestrator;
mod progress;
mod report;
mod result;
mod retry;
mod session;
mod task;

pub use cancel::CancellationHandle;
pub use config::GradingConfig;
pub use error::GradingError;
pub use event::{EventSender, GradingEvent, ItemOutcome, ProgressSnapshot, event_channel};
pub use orchestrator::{GradingOrchestrator, SetupValidation};
pub use progress::BatchProgress;
pub use report::{BatchReport, BatchSummary, FailedItem, ItemSummary};
pub use result::{ElementScore, GradingResult};
pub use retry::RetryPolicy;
pub use session::BatchSession;
pub use task::{GradingStatus, GradingTask};
