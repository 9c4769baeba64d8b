//! Batch report and summary

use serde::Serialize;

use super::{BatchProgress, GradingError, GradingResult, GradingStatus, GradingTask};
use crate::domain::cache::CacheStats;

/// An item that exhausted its attempts or hit a non-retryable error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedItem {
    /// Position of the item in the batch input
    pub index: usize,
    pub item_id: String,
    pub error: GradingError,
    /// Zero-score result standing in for the missing grade
    pub fallback: GradingResult,
}

/// Everything a finished (or cancelled) batch produced
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: String,
    /// One task per input item, in input order
    pub tasks: Vec<GradingTask>,
    /// Completed results, in input order
    pub results: Vec<GradingResult>,
    pub failed: Vec<FailedItem>,
    /// Ids of items that were never graded because the batch was cancelled
    pub cancelled: Vec<String>,
    pub progress: BatchProgress,
    pub was_cancelled: bool,
    pub cache: CacheStats,
}

impl BatchReport {
    /// Completed results and fallback results merged in input order
    pub fn all_results(&self) -> Vec<&GradingResult> {
        self.tasks
            .iter()
            .enumerate()
            .filter_map(|(index, task)| match task.result() {
                Some(result) => Some(result),
                None => self
                    .failed
                    .iter()
                    .find(|f| f.index == index)
                    .map(|f| &f.fallback),
            })
            .collect()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.item_id.as_str()).collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn summary(&self) -> BatchSummary {
        let total = self.tasks.len();
        let completed = self.results.len();
        let success_rate = if total == 0 {
            0.0
        } else {
            completed as f64 * 100.0 / total as f64
        };

        let items = self
            .tasks
            .iter()
            .map(|task| {
                let result = task.result();
                ItemSummary {
                    item_id: task.item().id().to_string(),
                    class_tag: task.item().class_tag().to_string(),
                    status: task.status(),
                    attempts: task.attempt_count(),
                    duration_seconds: result.map(|r| r.duration_seconds).or_else(|| {
                        task.processing_time()
                            .map(|d| d.num_milliseconds() as f64 / 1000.0)
                    }),
                    error: task
                        .last_error()
                        .filter(|_| task.status() == GradingStatus::Failed)
                        .map(ToString::to_string),
                    score: result.map(|r| r.total_score),
                    max_score: result.map(|r| r.total_max_score),
                    percentage: result.map(GradingResult::percentage),
                    letter_grade: result.map(GradingResult::letter_grade),
                }
            })
            .collect();

        BatchSummary {
            batch_id: self.batch_id.clone(),
            total,
            completed,
            failed: self.failed.len(),
            cancelled: self.cancelled.len(),
            success_rate,
            total_processing_seconds: self.progress.total_duration().as_secs_f64(),
            average_processing_seconds: self.progress.average_duration().as_secs_f64(),
            cache_hit_rate: self.cache.hit_rate(),
            items,
        }
    }
}

/// Per-item line of a batch summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    pub item_id: String,
    pub class_tag: String,
    pub status: GradingStatus,
    pub attempts: u32,
    pub duration_seconds: Option<f64>,
    pub error: Option<String>,
    pub score: Option<f64>,
    pub max_score: Option<u32>,
    pub percentage: Option<f64>,
    pub letter_grade: Option<char>,
}

/// Aggregate view of a batch report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Completed share of all items, in percent
    pub success_rate: f64,
    pub total_processing_seconds: f64,
    pub average_processing_seconds: f64,
    pub cache_hit_rate: f64,
    pub items: Vec<ItemSummary>,
}
