//! Grading orchestrator - Runs a batch item by item with retries, context and caching

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use metrics::{counter, histogram};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    BatchProgress, BatchReport, BatchSession, CancellationHandle, EventSender, FailedItem,
    GradingConfig, GradingError, GradingEvent, GradingResult, GradingStatus, GradingTask,
    ItemOutcome, ProgressSnapshot,
};
use crate::domain::DomainError;
use crate::domain::cache::ResponseCacheKey;
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::inference::{ImageInput, InferenceClient, InferenceRequest};
use crate::domain::ingestion::ChunkingStrategy;
use crate::domain::item::Item;
use crate::domain::prompt::{GradingMode, PromptBuilder};
use crate::domain::retrieval::ReferenceDocument;
use crate::domain::rubric::Rubric;
use crate::domain::validation::{GradingResponse, ResponseValidator, fallback_response};

/// Errors that block a batch and warnings worth surfacing before it starts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl SetupValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Retrieval {
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn ChunkingStrategy>,
    model: String,
}

/// Request and cache key for an item, built on its first attempt
#[derive(Debug, Clone)]
struct PreparedRequest {
    request: InferenceRequest,
    cache_key: String,
}

enum ItemRun {
    Completed(GradingResult),
    Failed(GradingError),
    Cancelled,
}

/// Grades items sequentially against a rubric.
///
/// Exactly one inference call is in flight at a time. Each item moves
/// through its [`GradingTask`] state machine, retrying retryable errors
/// with exponential backoff. Cancellation is cooperative: the handle is
/// checked before each item, before each attempt and around each backoff
/// sleep, and a call already in flight always runs to completion.
#[derive(Debug)]
pub struct GradingOrchestrator {
    client: Arc<dyn InferenceClient>,
    config: GradingConfig,
    validator: ResponseValidator,
    prompt_builder: PromptBuilder,
    retrieval: Option<Retrieval>,
    events: EventSender,
    cancellation: CancellationHandle,
}

impl GradingOrchestrator {
    pub fn new(client: Arc<dyn InferenceClient>, config: GradingConfig) -> Self {
        Self {
            client,
            config,
            validator: ResponseValidator::new(),
            prompt_builder: PromptBuilder::default(),
            retrieval: None,
            events: EventSender::disabled(),
            cancellation: CancellationHandle::new(),
        }
    }

    /// Enable reference context, embedding with `model`
    pub fn with_retrieval(
        mut self,
        embedder: Arc<dyn EmbeddingProvider>,
        chunker: Arc<dyn ChunkingStrategy>,
        model: impl Into<String>,
    ) -> Self {
        self.retrieval = Some(Retrieval {
            embedder,
            chunker,
            model: model.into(),
        });
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationHandle) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_prompt_builder(mut self, prompt_builder: PromptBuilder) -> Self {
        self.prompt_builder = prompt_builder;
        self
    }

    pub fn config(&self) -> &GradingConfig {
        &self.config
    }

    /// Handle the host uses to stop a running batch
    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.cancellation.clone()
    }

    /// Check a batch before grading it
    pub fn validate_setup(&self, rubric: &Rubric, items: &[Item]) -> SetupValidation {
        let mut validation = SetupValidation::default();

        if let Err(e) = self.config.validate() {
            validation.errors.push(e.to_string());
        }

        if items.is_empty() {
            validation.errors.push("No items to grade".to_string());
        }

        if rubric.is_empty() {
            validation
                .errors
                .push(format!("Rubric '{}' has no elements", rubric.name));
        } else if let Err(e) = rubric.validate() {
            validation.errors.push(e.to_string());
        }

        let image_items = items.iter().filter(|i| i.has_image()).count();
        if image_items > 0 && !self.client.supports_images() {
            validation.errors.push(format!(
                "{} item(s) carry images but client '{}' cannot take images",
                image_items,
                self.client.client_name()
            ));
        }

        let mut seen = HashSet::new();
        for item in items {
            if !seen.insert(item.id()) {
                validation
                    .warnings
                    .push(format!("Duplicate item id '{}'", item.id()));
            }

            if let Some(path) = item.image_path() {
                if !path.exists() {
                    validation.warnings.push(format!(
                        "Image for item '{}' not found at '{}'",
                        item.id(),
                        path.display()
                    ));
                }
            }
        }

        if items.len() > self.config.large_batch_threshold {
            validation.warnings.push(format!(
                "Large batch of {} items; grading runs one item at a time",
                items.len()
            ));
        }

        validation
    }

    /// Grade `items` in order, with context from `references` when retrieval
    /// is enabled
    pub async fn grade_batch(
        &self,
        rubric: &Rubric,
        items: Vec<Item>,
        references: Vec<ReferenceDocument>,
    ) -> Result<BatchReport, DomainError> {
        let setup = self.validate_setup(rubric, &items);
        if !setup.is_valid() {
            return Err(DomainError::invalid_setup(setup.errors));
        }
        for warning in &setup.warnings {
            warn!(warning = %warning, "Batch setup warning");
        }

        self.cancellation.reset();

        let mut session = BatchSession::new(&self.config);
        match &self.retrieval {
            Some(retrieval) => {
                session = session.with_references(
                    &self.config,
                    references,
                    retrieval.chunker.clone(),
                    retrieval.embedder.clone(),
                    &retrieval.model,
                );
            }
            None if !references.is_empty() => {
                warn!(
                    documents = references.len(),
                    "Retrieval is not configured; ignoring reference documents"
                );
            }
            None => {}
        }

        self.run_batch(rubric, items, &mut session).await
    }

    /// Re-grade only the failed items of `report` in a fresh session and
    /// merge recovered results back in input order
    pub async fn retry_failed(
        &self,
        report: &BatchReport,
        rubric: &Rubric,
        references: Vec<ReferenceDocument>,
    ) -> Result<BatchReport, DomainError> {
        if report.failed.is_empty() {
            return Ok(report.clone());
        }

        let indices: Vec<usize> = report.failed.iter().map(|f| f.index).collect();
        let items = indices
            .iter()
            .map(|&index| {
                report
                    .tasks
                    .get(index)
                    .map(|task| task.item().clone())
                    .ok_or_else(|| {
                        DomainError::report(format!("Failed item index {index} out of range"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            batch_id = %report.batch_id,
            items = items.len(),
            "Retrying failed items"
        );
        let retry = self.grade_batch(rubric, items, references).await?;

        let mut merged = report.clone();
        let mut failed: BTreeMap<usize, FailedItem> = report
            .failed
            .iter()
            .map(|f| (f.index, f.clone()))
            .collect();

        for (position, task) in retry.tasks.iter().enumerate() {
            let index = indices[position];
            match task.status() {
                GradingStatus::Completed => {
                    let recovered = task.result().map(|r| r.duration()).unwrap_or_default();
                    let previous = failed
                        .remove(&index)
                        .map(|f| f.fallback.duration())
                        .unwrap_or_default();
                    merged.progress.record_recovery(previous, recovered)?;
                    merged.tasks[index] = task.clone();
                }
                GradingStatus::Failed => {
                    merged.tasks[index] = task.clone();
                }
                _ => {}
            }
        }

        for item in retry.failed {
            let index = indices[item.index];
            failed.insert(index, FailedItem { index, ..item });
        }

        merged.results = merged
            .tasks
            .iter()
            .filter_map(|task| task.result().cloned())
            .collect();
        merged.failed = failed.into_values().collect();
        merged.was_cancelled = report.was_cancelled || retry.was_cancelled;
        merged.cache = report.cache.combined(&retry.cache);

        info!(
            batch_id = %merged.batch_id,
            recovered = report.failed.len() - merged.failed.len(),
            still_failed = merged.failed.len(),
            "Retry of failed items finished"
        );
        Ok(merged)
    }

    async fn run_batch(
        &self,
        rubric: &Rubric,
        items: Vec<Item>,
        session: &mut BatchSession,
    ) -> Result<BatchReport, DomainError> {
        let batch_id = Uuid::new_v4().to_string();
        let mut tasks: Vec<GradingTask> = items.into_iter().map(GradingTask::new).collect();
        let mut progress = BatchProgress::new(tasks.len());
        let mut results = Vec::new();
        let mut failed = Vec::new();
        let mut was_cancelled = false;

        info!(
            batch_id = %batch_id,
            items = tasks.len(),
            rubric = %rubric.name,
            client = self.client.client_name(),
            with_references = session.has_retriever(),
            "Starting grading batch"
        );
        self.events
            .emit(GradingEvent::Progress(ProgressSnapshot::from(&progress)));

        for (index, task) in tasks.iter_mut().enumerate() {
            if self.cancellation.is_cancelled() {
                was_cancelled = true;
                break;
            }

            progress.set_current(index);
            let started = Instant::now();
            let outcome = self.grade_item(task, rubric, session).await?;
            let elapsed = started.elapsed();
            histogram!("grading_item_duration_seconds").record(elapsed.as_secs_f64());

            match outcome {
                ItemRun::Completed(result) => {
                    progress.record_completion(elapsed)?;
                    counter!("grading_items_total", "status" => "completed").increment(1);
                    info!(
                        item_id = %result.item_id,
                        score = result.total_score,
                        max_score = result.total_max_score,
                        attempts = task.attempt_count(),
                        "Item graded"
                    );
                    self.events.emit(GradingEvent::ItemCompleted {
                        item_id: result.item_id.clone(),
                        status: GradingStatus::Completed,
                        outcome: ItemOutcome::Graded {
                            result: Box::new(result.clone()),
                        },
                    });
                    results.push(result);
                }
                ItemRun::Failed(grading_error) => {
                    progress.record_failure(elapsed)?;
                    counter!(
                        "grading_items_total",
                        "status" => "failed",
                        "error" => grading_error.kind()
                    )
                    .increment(1);

                    let item = task.item();
                    error!(
                        item_id = %item.id(),
                        attempts = task.attempt_count(),
                        error = %grading_error,
                        "Item failed"
                    );
                    self.events.emit(GradingEvent::Error {
                        context: item.id().to_string(),
                        message: grading_error.to_string(),
                    });
                    self.events.emit(GradingEvent::ItemCompleted {
                        item_id: item.id().to_string(),
                        status: GradingStatus::Failed,
                        outcome: ItemOutcome::Failed {
                            error: grading_error.to_string(),
                        },
                    });

                    let fallback = GradingResult::assemble(
                        item,
                        rubric,
                        &fallback_response(rubric, &grading_error.to_string()),
                        elapsed,
                        true,
                    );
                    failed.push(FailedItem {
                        index,
                        item_id: item.id().to_string(),
                        error: grading_error,
                        fallback,
                    });
                }
                ItemRun::Cancelled => {
                    was_cancelled = true;
                    break;
                }
            }

            self.events
                .emit(GradingEvent::Progress(ProgressSnapshot::from(&progress)));
        }

        let mut cancelled = Vec::new();
        for task in tasks.iter_mut() {
            if task.status() == GradingStatus::Cancelled {
                cancelled.push(task.item().id().to_string());
            } else if !task.status().is_terminal() {
                task.cancel()?;
                cancelled.push(task.item().id().to_string());
            }
        }

        let cache = session.cache_stats();
        if was_cancelled {
            warn!(
                batch_id = %batch_id,
                completed = progress.completed(),
                cancelled = cancelled.len(),
                "Grading batch cancelled"
            );
        }
        info!(
            batch_id = %batch_id,
            completed = progress.completed(),
            failed = progress.failed(),
            cache_hits = cache.hits,
            cache_misses = cache.misses,
            cache_hit_rate = cache.hit_rate(),
            "Grading batch finished"
        );
        self.events.emit(GradingEvent::BatchCompleted {
            count: progress.completed(),
        });

        Ok(BatchReport {
            batch_id,
            tasks,
            results,
            failed,
            cancelled,
            progress,
            was_cancelled,
            cache,
        })
    }

    async fn grade_item(
        &self,
        task: &mut GradingTask,
        rubric: &Rubric,
        session: &mut BatchSession,
    ) -> Result<ItemRun, DomainError> {
        let policy = self.config.retry_policy();
        let started = Instant::now();
        let mut prepared: Option<PreparedRequest> = None;

        loop {
            if self.cancellation.is_cancelled() {
                task.cancel()?;
                return Ok(ItemRun::Cancelled);
            }

            task.begin_attempt()?;
            let attempt = task.attempt_count();

            match self
                .attempt(task.item(), rubric, session, &mut prepared)
                .await
            {
                Ok(response) => {
                    let result = GradingResult::assemble(
                        task.item(),
                        rubric,
                        &response,
                        started.elapsed(),
                        false,
                    );
                    task.complete(result.clone())?;
                    return Ok(ItemRun::Completed(result));
                }
                Err(grading_error) => {
                    if !grading_error.is_retryable() || !policy.allows_another(attempt) {
                        task.fail(grading_error.clone())?;
                        return Ok(ItemRun::Failed(grading_error));
                    }

                    let delay = policy.delay_for_attempt(attempt - 1);
                    warn!(
                        item_id = %task.item().id(),
                        attempt,
                        max_attempts = policy.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %grading_error,
                        "Grading attempt failed; retrying"
                    );
                    counter!("grading_retries_total", "error" => grading_error.kind())
                        .increment(1);
                    task.record_error(grading_error);

                    if self.cancellation.is_cancelled() {
                        task.cancel()?;
                        return Ok(ItemRun::Cancelled);
                    }
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(
        &self,
        item: &Item,
        rubric: &Rubric,
        session: &mut BatchSession,
        prepared: &mut Option<PreparedRequest>,
    ) -> Result<GradingResponse, GradingError> {
        let PreparedRequest { request, cache_key } = match prepared.clone() {
            Some(existing) => existing,
            None => {
                let fresh = self.prepare(item, rubric, session).await?;
                *prepared = Some(fresh.clone());
                fresh
            }
        };

        let hits_before = session.cache.stats().hits;
        let client = &self.client;
        let validator = &self.validator;
        let response = session
            .cache
            .get_or_compute(&cache_key, || async move {
                let raw = client.infer(request).await?;
                let response = validator.validate(&raw, rubric)?;
                if response.is_failure_sentinel() {
                    return Err(GradingError::failed_response(response.feedback));
                }
                Ok(response)
            })
            .await?;

        if session.cache.stats().hits > hits_before {
            counter!("grading_cache_hits_total").increment(1);
            debug!(item_id = %item.id(), "Using cached grading response");
        }

        for flag in &response.flags {
            debug!(item_id = %item.id(), flag = ?flag, "Response validation flag");
        }

        Ok(response)
    }

    async fn prepare(
        &self,
        item: &Item,
        rubric: &Rubric,
        session: &mut BatchSession,
    ) -> Result<PreparedRequest, GradingError> {
        let mode = GradingMode::for_item(item);

        let references = match (&mut session.retriever, mode, item.text_answer()) {
            (Some(retriever), GradingMode::Descriptive, Some(text)) => {
                let hits = retriever.retrieve(text).await;
                debug!(item_id = %item.id(), hits = hits.len(), "Reference context for item");
                Some(retriever.format(&hits))
            }
            _ => None,
        };

        let prompt = self.prompt_builder.build(
            rubric,
            item.text_answer(),
            references.as_deref(),
            mode,
        );
        let mut request = InferenceRequest::new(prompt);

        if let Some(path) = item.image_path() {
            if !self.client.supports_images() {
                return Err(GradingError::input(format!(
                    "client '{}' cannot take images",
                    self.client.client_name()
                )));
            }
            request = request.with_image(ImageInput::load(path).await?);
        }

        let cache_key = ResponseCacheKey::new(
            request.prompt.as_str(),
            request.image.as_ref().map(ImageInput::content_hash),
        )
        .generate();

        Ok(PreparedRequest { request, cache_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::grading::event_channel;
    use crate::domain::inference::MockInferenceClient;
    use crate::domain::ingestion::MockChunkingStrategy;
    use crate::domain::rubric::RubricElement;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    const GOOD: &str = r#"{"scores": {"accuracy": 5}, "reasoning": {"accuracy": "Correct"}, "feedback": "Well done", "total_score": 5}"#;
    const SENTINEL: &str = r#"{"scores": {"accuracy": 0}, "reasoning": {"accuracy": "-"}, "feedback": "An error occurred during grading: overloaded", "total_score": 0}"#;

    fn rubric() -> Rubric {
        Rubric::new("climate").with_element(
            RubricElement::new("accuracy")
                .with_criterion(0, "wrong")
                .with_criterion(3, "partly correct")
                .with_criterion(5, "fully correct"),
        )
    }

    fn items(n: usize) -> Vec<Item> {
        (1..=n)
            .map(|i| Item::text(format!("s{i}"), "A", format!("answer number {i}")).unwrap())
            .collect()
    }

    fn config(max_retries: u32) -> GradingConfig {
        GradingConfig {
            max_retries,
            retry_base_delay: 2.0,
            ..Default::default()
        }
    }

    fn drain(rx: &mut UnboundedReceiver<GradingEvent>) -> Vec<GradingEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_item_completes_first_attempt() {
        let client = Arc::new(MockInferenceClient::new(GOOD));
        let (events, mut rx) = event_channel();
        let orchestrator = GradingOrchestrator::new(client.clone(), config(3)).with_events(events);

        let report = orchestrator
            .grade_batch(&rubric(), items(1), vec![])
            .await
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].total_score, 5.0);
        assert_eq!(report.tasks[0].status(), GradingStatus::Completed);
        assert_eq!(report.tasks[0].attempt_count(), 1);
        assert_eq!(client.call_count(), 1);

        let events = drain(&mut rx);
        assert!(matches!(events[0], GradingEvent::Progress(_)));
        assert!(matches!(
            events[1],
            GradingEvent::ItemCompleted {
                status: GradingStatus::Completed,
                ..
            }
        ));
        assert!(matches!(events[2], GradingEvent::Progress(ref p) if p.completed == 1));
        assert_eq!(events[3], GradingEvent::BatchCompleted { count: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let client = Arc::new(
            MockInferenceClient::new(GOOD)
                .then(Err(GradingError::transient("503")))
                .then(Ok("not json".to_string())),
        );
        let orchestrator = GradingOrchestrator::new(client.clone(), config(3));

        let start = Instant::now();
        let report = orchestrator
            .grade_batch(&rubric(), items(1), vec![])
            .await
            .unwrap();

        assert_eq!(report.tasks[0].status(), GradingStatus::Completed);
        assert_eq!(report.tasks[0].attempt_count(), 3);
        assert_eq!(client.call_count(), 3);
        // 2^0 + 2^1 seconds of backoff
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_fail_with_one_error_event() {
        let client = Arc::new(MockInferenceClient::failing(GradingError::transient("503")));
        let (events, mut rx) = event_channel();
        let orchestrator = GradingOrchestrator::new(client.clone(), config(2)).with_events(events);

        let report = orchestrator
            .grade_batch(&rubric(), items(2), vec![])
            .await
            .unwrap();

        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.tasks[0].status(), GradingStatus::Failed);
        assert_eq!(report.tasks[0].attempt_count(), 3);
        assert_eq!(client.call_count(), 6);
        assert!(report.failed[0].fallback.is_fallback);
        assert_eq!(report.progress.failed(), 2);

        let errors = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, GradingEvent::Error { .. }))
            .count();
        assert_eq!(errors, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_ends_item_only() {
        let client = Arc::new(
            MockInferenceClient::new(GOOD).then(Err(GradingError::capacity("quota exceeded"))),
        );
        let orchestrator = GradingOrchestrator::new(client.clone(), config(3));

        let report = orchestrator
            .grade_batch(&rubric(), items(2), vec![])
            .await
            .unwrap();

        assert_eq!(report.tasks[0].status(), GradingStatus::Failed);
        assert_eq!(report.tasks[0].attempt_count(), 1);
        assert_eq!(report.tasks[1].status(), GradingStatus::Completed);
        assert_eq!(client.call_count(), 2);
        assert_eq!(
            report.failed[0].error,
            GradingError::capacity("quota exceeded")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sentinel_response_is_retried_and_not_cached() {
        let client = Arc::new(MockInferenceClient::new(GOOD).then(Ok(SENTINEL.to_string())));
        let orchestrator = GradingOrchestrator::new(client.clone(), config(1));

        let report = orchestrator
            .grade_batch(&rubric(), items(1), vec![])
            .await
            .unwrap();

        assert_eq!(report.tasks[0].attempt_count(), 2);
        assert_eq!(report.results[0].total_score, 5.0);
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_items_hit_cache() {
        let client = Arc::new(MockInferenceClient::new(GOOD));
        let orchestrator = GradingOrchestrator::new(client.clone(), config(0));
        let items = vec![
            Item::text("s1", "A", "same answer").unwrap(),
            Item::text("s2", "A", "same answer").unwrap(),
        ];

        let report = orchestrator
            .grade_batch(&rubric(), items, vec![])
            .await
            .unwrap();

        assert_eq!(client.call_count(), 1);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[1].item_id, "s2");
        assert_eq!(report.cache.hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_between_items() {
        let handle = CancellationHandle::new();
        let client = Arc::new(MockInferenceClient::new(GOOD).cancel_on_call(2, handle.clone()));
        let (events, mut rx) = event_channel();
        let orchestrator = GradingOrchestrator::new(client.clone(), config(3))
            .with_events(events)
            .with_cancellation(handle);

        let report = orchestrator
            .grade_batch(&rubric(), items(5), vec![])
            .await
            .unwrap();

        assert_eq!(report.results.len(), 2);
        assert_eq!(client.call_count(), 2);
        assert!(report.was_cancelled);
        assert_eq!(report.cancelled, vec!["s3", "s4", "s5"]);
        assert!(
            report.tasks[2..]
                .iter()
                .all(|t| t.status() == GradingStatus::Cancelled && t.attempt_count() == 0)
        );
        assert_eq!(
            drain(&mut rx).last(),
            Some(&GradingEvent::BatchCompleted { count: 2 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let handle = CancellationHandle::new();
        let client = Arc::new(
            MockInferenceClient::failing(GradingError::transient("503"))
                .cancel_on_call(1, handle.clone()),
        );
        let orchestrator =
            GradingOrchestrator::new(client.clone(), config(3)).with_cancellation(handle);

        let report = orchestrator
            .grade_batch(&rubric(), items(2), vec![])
            .await
            .unwrap();

        assert_eq!(client.call_count(), 1);
        assert_eq!(report.tasks[0].status(), GradingStatus::Cancelled);
        assert_eq!(report.tasks[0].attempt_count(), 1);
        assert!(report.failed.is_empty());
        assert_eq!(report.cancelled, vec!["s1", "s2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_reset_at_batch_start() {
        let client = Arc::new(MockInferenceClient::new(GOOD));
        let orchestrator = GradingOrchestrator::new(client.clone(), config(0));
        orchestrator.cancellation_handle().cancel();

        let report = orchestrator
            .grade_batch(&rubric(), items(1), vec![])
            .await
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert!(!report.was_cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_references_reach_prompt() {
        let client = Arc::new(MockInferenceClient::new(GOOD));
        let orchestrator = GradingOrchestrator::new(client.clone(), config(0)).with_retrieval(
            Arc::new(MockEmbeddingProvider::new(64)),
            Arc::new(MockChunkingStrategy::new()),
            "mock",
        );
        let references = vec![
            ReferenceDocument::new("monsoon", "Monsoon winds bring heavy summer rain."),
            ReferenceDocument::new("desert", "Deserts receive little precipitation."),
        ];
        let items = vec![Item::text("s1", "A", "Summer monsoon winds bring rain").unwrap()];

        orchestrator
            .grade_batch(&rubric(), items, references)
            .await
            .unwrap();

        let prompt = &client.requests()[0].prompt;
        assert!(prompt.contains("Reference 1:\nMonsoon winds bring heavy summer rain."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_index_build_grades_without_context() {
        let embedder = Arc::new(MockEmbeddingProvider::new(8).with_error("down"));
        let client = Arc::new(MockInferenceClient::new(GOOD));
        let orchestrator = GradingOrchestrator::new(client.clone(), config(0)).with_retrieval(
            embedder.clone(),
            Arc::new(MockChunkingStrategy::new()),
            "mock",
        );

        let report = orchestrator
            .grade_batch(
                &rubric(),
                items(3),
                vec![ReferenceDocument::new("d", "Some reference text.")],
            )
            .await
            .unwrap();

        assert_eq!(report.results.len(), 3);
        assert_eq!(embedder.call_count(), 1);
        assert!(!client.requests()[0].prompt.contains("Reference 1:"));
    }

    #[tokio::test]
    async fn test_unreadable_image_is_input_failure() {
        let client = Arc::new(MockInferenceClient::new(GOOD));
        let orchestrator = GradingOrchestrator::new(client.clone(), config(3));
        let items = vec![Item::image("s1", "A", "/no/such/map.png").unwrap()];

        let report = orchestrator
            .grade_batch(&rubric(), items, vec![])
            .await
            .unwrap();

        assert_eq!(client.call_count(), 0);
        assert_eq!(report.tasks[0].attempt_count(), 1);
        assert!(matches!(report.failed[0].error, GradingError::Input { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_failed_merges_recovered_results() {
        let client = Arc::new(
            MockInferenceClient::new(GOOD).then(Err(GradingError::auth("expired key"))),
        );
        let orchestrator = GradingOrchestrator::new(client.clone(), config(3));

        let report = orchestrator
            .grade_batch(&rubric(), items(3), vec![])
            .await
            .unwrap();
        assert_eq!(report.failed_ids(), vec!["s1"]);

        let retried = orchestrator
            .retry_failed(&report, &rubric(), vec![])
            .await
            .unwrap();

        assert!(retried.failed.is_empty());
        let ids: Vec<&str> = retried.results.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);
        assert_eq!(retried.progress.completed(), 3);
        assert_eq!(retried.progress.failed(), 0);
        assert_eq!(retried.batch_id, report.batch_id);
        assert_eq!(retried.cache.misses, report.cache.misses + 1);
        assert_eq!(retried.cache.hits, report.cache.hits);
    }

    #[test]
    fn test_validate_setup() {
        let orchestrator = GradingOrchestrator::new(
            Arc::new(MockInferenceClient::new(GOOD).without_images()),
            GradingConfig {
                large_batch_threshold: 1,
                ..Default::default()
            },
        );

        let empty = orchestrator.validate_setup(&Rubric::new("r"), &[]);
        assert_eq!(empty.errors.len(), 2);

        let mut batch = items(2);
        batch.push(Item::image("s3", "A", "/no/such/map.png").unwrap());
        let validation = orchestrator.validate_setup(&rubric(), &batch);

        assert!(!validation.is_valid());
        assert!(validation.errors[0].contains("cannot take images"));
        assert!(validation.warnings.iter().any(|w| w.contains("not found")));
        assert!(validation.warnings.iter().any(|w| w.contains("Large batch")));
    }

    #[tokio::test]
    async fn test_invalid_setup_rejected() {
        let orchestrator =
            GradingOrchestrator::new(Arc::new(MockInferenceClient::new(GOOD)), config(0));
        let err = orchestrator
            .grade_batch(&rubric(), vec![], vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidSetup { .. }));
    }
}
