//! Batch progress and ETA tracking

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Counters and timing estimates for a running batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    total: usize,
    completed: usize,
    failed: usize,
    current_index: usize,
    started_at: DateTime<Utc>,
    total_duration_seconds: f64,
    average_duration_seconds: f64,
    eta: Option<DateTime<Utc>>,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
            current_index: 0,
            started_at: Utc::now(),
            total_duration_seconds: 0.0,
            average_duration_seconds: 0.0,
            eta: None,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn eta(&self) -> Option<DateTime<Utc>> {
        self.eta
    }

    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    pub fn remaining(&self) -> usize {
        self.total - self.processed()
    }

    pub fn is_finished(&self) -> bool {
        self.processed() == self.total
    }

    /// `(completed + failed) / total × 100`, 0 for an empty batch
    pub fn progress_percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.processed() as f64 * 100.0 / self.total as f64
    }

    /// Mean duration of every item processed so far
    pub fn average_duration(&self) -> Duration {
        Duration::from_secs_f64(self.average_duration_seconds)
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_duration_seconds)
    }

    /// Mark the item at `index` as the one being graded
    pub fn set_current(&mut self, index: usize) {
        self.current_index = index;
    }

    pub fn record_completion(&mut self, duration: Duration) -> Result<(), DomainError> {
        self.ensure_capacity()?;
        self.completed += 1;
        self.record_duration(duration);
        Ok(())
    }

    pub fn record_failure(&mut self, duration: Duration) -> Result<(), DomainError> {
        self.ensure_capacity()?;
        self.failed += 1;
        self.record_duration(duration);
        Ok(())
    }

    /// Move one previously failed item to completed after a successful
    /// retry. The recovered run's duration replaces the failed one, so the
    /// average stays per item.
    pub fn record_recovery(
        &mut self,
        failed_duration: Duration,
        recovered_duration: Duration,
    ) -> Result<(), DomainError> {
        if self.failed == 0 {
            return Err(DomainError::validation("No failed item to recover"));
        }
        self.failed -= 1;
        self.completed += 1;
        self.total_duration_seconds =
            (self.total_duration_seconds - failed_duration.as_secs_f64()).max(0.0);
        self.record_duration(recovered_duration);
        Ok(())
    }

    fn ensure_capacity(&self) -> Result<(), DomainError> {
        if self.is_finished() {
            return Err(DomainError::validation(format!(
                "All {} items are already accounted for",
                self.total
            )));
        }
        Ok(())
    }

    fn record_duration(&mut self, duration: Duration) {
        self.total_duration_seconds += duration.as_secs_f64();
        let samples = self.processed().max(1) as f64;
        self.average_duration_seconds = self.total_duration_seconds / samples;
        self.update_eta(Utc::now());
    }

    /// `now + remaining × average`
    fn update_eta(&mut self, now: DateTime<Utc>) {
        let seconds = self.average_duration_seconds * self.remaining() as f64;
        self.eta = chrono::Duration::from_std(Duration::from_secs_f64(seconds))
            .ok()
            .map(|left| now + left);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percentage() {
        let mut progress = BatchProgress::new(10);
        for _ in 0..6 {
            progress.record_completion(Duration::from_secs(1)).unwrap();
        }
        progress.record_failure(Duration::from_secs(1)).unwrap();

        assert_eq!(progress.progress_percentage(), 70.0);
        assert_eq!(progress.remaining(), 3);
        assert!(!progress.is_finished());
    }

    #[test]
    fn test_empty_batch() {
        let progress = BatchProgress::new(0);
        assert_eq!(progress.progress_percentage(), 0.0);
        assert!(progress.is_finished());
        assert!(progress.eta().is_none());
    }

    #[test]
    fn test_rolling_average_and_eta() {
        let mut progress = BatchProgress::new(4);
        progress.record_completion(Duration::from_secs(2)).unwrap();
        progress.record_completion(Duration::from_secs(4)).unwrap();

        assert_eq!(progress.average_duration(), Duration::from_secs(3));

        let eta = progress.eta().unwrap();
        let expected = Utc::now() + chrono::Duration::seconds(6);
        assert!((eta - expected).num_seconds().abs() <= 1);
    }

    #[test]
    fn test_cannot_exceed_total() {
        let mut progress = BatchProgress::new(1);
        progress.record_completion(Duration::ZERO).unwrap();
        assert!(progress.record_failure(Duration::ZERO).is_err());
        assert_eq!(progress.processed(), 1);
    }

    #[test]
    fn test_recovery_moves_failed_to_completed() {
        let mut progress = BatchProgress::new(2);
        progress.record_completion(Duration::ZERO).unwrap();
        progress.record_failure(Duration::ZERO).unwrap();

        progress.record_recovery(Duration::ZERO, Duration::ZERO).unwrap();

        assert_eq!(progress.completed(), 2);
        assert_eq!(progress.failed(), 0);
        assert!(
            progress
                .record_recovery(Duration::ZERO, Duration::ZERO)
                .is_err()
        );
    }

    #[test]
    fn test_recovery_replaces_failed_duration() {
        let mut progress = BatchProgress::new(2);
        progress.record_completion(Duration::from_secs(2)).unwrap();
        progress.record_failure(Duration::from_secs(10)).unwrap();
        assert_eq!(progress.average_duration(), Duration::from_secs(6));

        progress
            .record_recovery(Duration::from_secs(10), Duration::from_secs(4))
            .unwrap();

        assert_eq!(progress.total_duration(), Duration::from_secs(6));
        assert_eq!(progress.average_duration(), Duration::from_secs(3));
    }
}
