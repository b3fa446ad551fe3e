//! # Batch Generation Pipeline
//!
//! Resumable, sequential processing of a candidate list into a
//! [`DatasetStore`]. For every subject not yet recorded the pipeline asks the
//! generation service for source, checks it with the render validator,
//! appends one record, and flushes the whole store before moving on. An
//! interrupted run therefore loses at most the subject in flight, and
//! re-running with the same inputs continues where it stopped.
//!
//! Per-subject failures are recorded, never raised. A run aborts only when
//! the store cannot be written; everything flushed before that stays valid.

pub mod progress;
pub mod state;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::DatasetResult;
use crate::generation::{GenerationOutcome, GenerationService};
use crate::prompts::ScadPrompt;
use crate::store::{DatasetRecord, DatasetStore};
use crate::validator::{RenderValidator, ValidationMode, ValidationOutcome};

pub use progress::{estimate_remaining, format_duration, ProgressSnapshot, ProgressTracker};
pub use state::{SubjectEvent, SubjectLifecycle, SubjectState, StateTransitionError};

/// What happened to one processed subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectOutcome {
    pub subject: String,
    /// Terminal state before recording: generation failed, validated ok, or validated fail
    pub final_state: SubjectState,
    pub render_ok: bool,
    /// Failure reason, for logs and reports only
    pub reason: Option<String>,
    /// Whether an earlier record for this subject was replaced
    pub replaced: bool,
    /// The attempt failed and an earlier working record was left in place
    pub kept_previous: bool,
}

/// Summary of one pipeline run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Candidates left after the `max_items` bound
    pub considered: usize,
    /// Candidates already recorded (or repeated) and therefore not processed
    pub skipped: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
    /// Per-subject outcomes in processing order
    pub outcomes: Vec<SubjectOutcome>,
}

impl RunReport {
    fn new(run_id: Uuid, considered: usize, skipped: usize) -> Self {
        Self {
            run_id,
            considered,
            skipped,
            processed: 0,
            succeeded: 0,
            failed: 0,
            elapsed: Duration::ZERO,
            outcomes: Vec::new(),
        }
    }

    fn push(&mut self, outcome: SubjectOutcome) {
        self.processed += 1;
        if outcome.render_ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.outcomes.push(outcome);
    }
}

/// Subjects to process, in candidate order.
///
/// The `max_items` bound is applied to the raw candidate list first, then
/// subjects that already have a record are dropped (unless `retry_failed` is
/// set and the record is a failure), and repeated candidates are kept once.
pub fn plan(
    candidates: &[String],
    max_items: Option<usize>,
    store: &DatasetStore,
    retry_failed: bool,
) -> Vec<String> {
    let bound = max_items.unwrap_or(candidates.len()).min(candidates.len());
    let mut seen = HashSet::new();

    candidates[..bound]
        .iter()
        .filter(|subject| match store.get(subject) {
            Some(record) => retry_failed && record.is_failure(),
            None => true,
        })
        .filter(|subject| seen.insert(subject.as_str()))
        .cloned()
        .collect()
}

pub struct BatchGenerationPipeline {
    generator: Arc<dyn GenerationService>,
    validator: Arc<dyn RenderValidator>,
    prompt: ScadPrompt,
    retry_failed: bool,
}

impl std::fmt::Debug for BatchGenerationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchGenerationPipeline")
            .field("generator", &self.generator.name())
            .field("prompt", &self.prompt)
            .field("retry_failed", &self.retry_failed)
            .finish()
    }
}

impl BatchGenerationPipeline {
    pub fn new(
        generator: Arc<dyn GenerationService>,
        validator: Arc<dyn RenderValidator>,
        prompt: ScadPrompt,
    ) -> Self {
        Self {
            generator,
            validator,
            prompt,
            retry_failed: false,
        }
    }

    /// Treat recorded failures as not done
    pub fn with_retry_failed(mut self, retry_failed: bool) -> Self {
        self.retry_failed = retry_failed;
        self
    }

    pub fn retry_failed(&self) -> bool {
        self.retry_failed
    }

    /// Process every candidate that the store does not hold yet.
    ///
    /// The store is flushed after each subject. Returns a report of the run;
    /// fails only when a flush fails.
    pub async fn run(
        &self,
        candidates: &[String],
        max_items: Option<usize>,
        store: &mut DatasetStore,
    ) -> DatasetResult<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", run_id = %run_id, store = %store.path().display());
        self.run_planned(run_id, candidates, max_items, store)
            .instrument(span)
            .await
    }

    async fn run_planned(
        &self,
        run_id: Uuid,
        candidates: &[String],
        max_items: Option<usize>,
        store: &mut DatasetStore,
    ) -> DatasetResult<RunReport> {
        let considered = max_items.unwrap_or(candidates.len()).min(candidates.len());
        let to_process = plan(candidates, max_items, store, self.retry_failed);
        let mut report = RunReport::new(run_id, considered, considered - to_process.len());

        if to_process.is_empty() {
            info!(
                considered,
                existing = store.len(),
                "Nothing to process, store is up to date"
            );
            return Ok(report);
        }

        info!(
            considered,
            skipped = report.skipped,
            to_process = to_process.len(),
            existing = store.len(),
            generator = self.generator.name(),
            style = %self.prompt.style(),
            complexity = %self.prompt.complexity(),
            "Starting batch generation"
        );

        let started = Instant::now();
        let mut tracker = ProgressTracker::new(to_process.len());

        for subject in &to_process {
            let outcome = self.process_and_record(subject, store).await?;
            let snapshot = tracker.record();
            info!(
                subject = %outcome.subject,
                render_ok = outcome.render_ok,
                progress = %snapshot,
                "Processed subject"
            );
            report.push(outcome);
        }

        report.elapsed = started.elapsed();
        let stats = store.stats();
        info!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            elapsed = %format_duration(report.elapsed),
            store_total = stats.total,
            store_rendered = stats.rendered,
            "Batch generation complete"
        );
        Ok(report)
    }

    /// Process one subject regardless of whether it is already recorded.
    /// An existing record for the subject is replaced, unless the new attempt
    /// failed and the existing record is a working one; then the store is
    /// left untouched.
    pub async fn run_single(
        &self,
        subject: &str,
        store: &mut DatasetStore,
    ) -> DatasetResult<SubjectOutcome> {
        let span = info_span!("pipeline_single", run_id = %Uuid::new_v4(), subject = %subject);
        self.process_and_record(subject, store)
            .instrument(span)
            .await
    }

    async fn process_and_record(
        &self,
        subject: &str,
        store: &mut DatasetStore,
    ) -> DatasetResult<SubjectOutcome> {
        let mut lifecycle = SubjectLifecycle::new(subject);
        let (record, reason) = self.process(&mut lifecycle).await?;

        let render_ok = record.render_ok;
        let final_state = lifecycle.state();

        let kept_previous = store
            .get(subject)
            .is_some_and(|existing| !record.supersedes(existing));
        let replaced = if kept_previous {
            warn!(subject, "Attempt failed, keeping the existing working record");
            false
        } else {
            let displaced = store.insert(record);
            if displaced.is_some() {
                debug!(subject, "Replaced existing record");
            }
            store.flush()?;
            displaced.is_some()
        };
        lifecycle.advance(SubjectEvent::Record)?;

        Ok(SubjectOutcome {
            subject: subject.to_string(),
            final_state,
            render_ok,
            reason,
            replaced,
            kept_previous,
        })
    }

    /// Generate and validate one subject, leaving the lifecycle in a
    /// recordable state
    async fn process(
        &self,
        lifecycle: &mut SubjectLifecycle,
    ) -> DatasetResult<(DatasetRecord, Option<String>)> {
        let subject = lifecycle.subject().to_string();

        lifecycle.advance(SubjectEvent::StartGeneration)?;
        let prompt = self.prompt.for_subject(&subject);
        let code = match self.generator.generate(&prompt).await {
            GenerationOutcome::Generated(code) => code,
            GenerationOutcome::Failed(failure) => {
                warn!(subject = %subject, reason = %failure, "Generation failed");
                lifecycle.advance(SubjectEvent::GenerationFailed)?;
                return Ok((
                    DatasetRecord::generation_failed(&subject),
                    Some(failure.to_string()),
                ));
            }
        };
        if code.trim().is_empty() {
            warn!(subject = %subject, "Generation returned empty text");
            lifecycle.advance(SubjectEvent::GenerationFailed)?;
            return Ok((
                DatasetRecord::generation_failed(&subject),
                Some("empty response".to_string()),
            ));
        }
        lifecycle.advance(SubjectEvent::GenerationSucceeded)?;

        lifecycle.advance(SubjectEvent::StartValidation)?;
        let validation = self.validator.validate(&code, ValidationMode::Full).await;
        let reason = match validation {
            ValidationOutcome::Passed => None,
            ValidationOutcome::ToolAbsent => Some("renderer not available".to_string()),
            ValidationOutcome::Failed(ref failure) => {
                debug!(subject = %subject, reason = %failure, "Render check failed");
                Some(failure.to_string())
            }
        };
        let render_ok = validation.render_ok();
        lifecycle.advance(if render_ok {
            SubjectEvent::ValidationPassed
        } else {
            SubjectEvent::ValidationFailed
        })?;

        Ok((DatasetRecord::generated(&subject, code, render_ok), reason))
    }
}
