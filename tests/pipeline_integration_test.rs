//! Pipeline integration tests: resume, ordering, failure isolation, and
//! per-subject durability against a real store file.

mod mocks;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use mocks::{MockGenerationService, MockRenderValidator};
use scad_dataset::generation::GenerationOutcome;
use scad_dataset::pipeline::{BatchGenerationPipeline, SubjectState};
use scad_dataset::prompts::{Complexity, ScadPrompt, Style};
use scad_dataset::store::{read_record_values, DatasetRecord, DatasetStore};
use scad_dataset::validator::{
    RenderValidator, ValidationFailure, ValidationMode, ValidationOutcome,
};
use scad_dataset::DatasetError;

const SUBJECT_KEY: &str = "animal";

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join("animal_openscad_dataset.json")
}

fn pipeline(
    generator: &MockGenerationService,
    validator: Arc<dyn RenderValidator>,
) -> BatchGenerationPipeline {
    BatchGenerationPipeline::new(
        Arc::new(generator.clone()),
        validator,
        ScadPrompt::new("animal", Style::Realistic, Complexity::Medium),
    )
}

fn subjects(store: &DatasetStore) -> Vec<String> {
    store.records().iter().map(|r| r.subject.clone()).collect()
}

#[tokio::test]
async fn test_second_run_processes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let generator = MockGenerationService::new();
    let pipeline = pipeline(&generator, Arc::new(MockRenderValidator::passing()));
    let candidates = names(&["a", "b", "c"]);

    let mut store = DatasetStore::load(&path, SUBJECT_KEY).unwrap();
    let first = pipeline.run(&candidates, None, &mut store).await.unwrap();
    assert_eq!(first.processed, 3);
    let after_first = std::fs::read(&path).unwrap();

    let mut reloaded = DatasetStore::load(&path, SUBJECT_KEY).unwrap();
    let second = pipeline.run(&candidates, None, &mut reloaded).await.unwrap();

    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(generator.call_count(), 3);
    assert_eq!(std::fs::read(&path).unwrap(), after_first);
    assert_eq!(subjects(&reloaded), names(&["a", "b", "c"]));
}

#[tokio::test]
async fn test_records_follow_candidate_order() {
    let dir = TempDir::new().unwrap();
    let generator = MockGenerationService::new();
    let pipeline = pipeline(&generator, Arc::new(MockRenderValidator::passing()));

    let mut store = DatasetStore::new(store_path(&dir), SUBJECT_KEY);
    let report = pipeline
        .run(&names(&["zebra", "ant", "moose"]), None, &mut store)
        .await
        .unwrap();

    assert_eq!(subjects(&store), names(&["zebra", "ant", "moose"]));
    let processed: Vec<_> = report.outcomes.iter().map(|o| o.subject.as_str()).collect();
    assert_eq!(processed, vec!["zebra", "ant", "moose"]);

    let prompts = generator.prompts();
    assert!(prompts[0].contains("zebra"));
    assert!(prompts[1].contains("ant"));
    assert!(prompts[2].contains("moose"));
}

#[tokio::test]
async fn test_resume_skips_recorded_subjects() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let mut prior = DatasetStore::new(&path, SUBJECT_KEY);
    prior.insert(DatasetRecord::generated("b", "sphere(3);", true));
    prior.flush().unwrap();

    let generator = MockGenerationService::new();
    let pipeline = pipeline(&generator, Arc::new(MockRenderValidator::passing()));

    let mut store = DatasetStore::load(&path, SUBJECT_KEY).unwrap();
    let report = pipeline
        .run(&names(&["a", "b", "c"]), None, &mut store)
        .await
        .unwrap();

    assert_eq!(report.processed, 2);
    assert!(!generator.was_asked_for("b"));
    assert_eq!(subjects(&store), names(&["b", "a", "c"]));
    assert_eq!(store.get("b").unwrap().generated_code, "sphere(3);");
}

#[tokio::test]
async fn test_max_items_applies_before_dedup() {
    let dir = TempDir::new().unwrap();
    let mut store = DatasetStore::new(store_path(&dir), SUBJECT_KEY);
    store.insert(DatasetRecord::generated("a", "cube(1);", true));

    let generator = MockGenerationService::new();
    let pipeline = pipeline(&generator, Arc::new(MockRenderValidator::passing()));

    let report = pipeline
        .run(&names(&["a", "b", "c"]), Some(2), &mut store)
        .await
        .unwrap();

    assert_eq!(report.considered, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.processed, 1);
    assert!(generator.was_asked_for("b"));
    assert!(!generator.was_asked_for("c"));
    assert_eq!(subjects(&store), names(&["a", "b"]));
}

#[tokio::test]
async fn test_generation_failure_is_isolated() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let generator = MockGenerationService::new().failing_for("b");
    let validator = MockRenderValidator::passing();
    let pipeline = pipeline(&generator, Arc::new(validator.clone()));

    let mut store = DatasetStore::new(&path, SUBJECT_KEY);
    let report = pipeline
        .run(&names(&["a", "b", "c"]), None, &mut store)
        .await
        .unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.outcomes[1].final_state, SubjectState::GenerationFailed);

    let failed = store.get("b").unwrap();
    assert!(!failed.render_ok);
    assert_eq!(failed.generated_code, "");
    assert_eq!(failed.error.as_deref(), Some("generation failed"));
    assert!(store.get("a").unwrap().render_ok);
    assert!(store.get("c").unwrap().render_ok);

    // the failed subject never reaches the validator
    assert_eq!(validator.call_count(), 2);

    let on_disk = DatasetStore::load(&path, SUBJECT_KEY).unwrap();
    assert_eq!(on_disk.records(), store.records());
}

#[tokio::test]
async fn test_empty_generation_is_a_generation_failure() {
    let dir = TempDir::new().unwrap();
    let generator = MockGenerationService::new().with_rule(
        mocks::subject_needle("owl"),
        GenerationOutcome::Generated("  \n ".to_string()),
    );
    let validator = MockRenderValidator::passing();
    let pipeline = pipeline(&generator, Arc::new(validator.clone()));

    let mut store = DatasetStore::new(store_path(&dir), SUBJECT_KEY);
    pipeline
        .run(&names(&["owl"]), None, &mut store)
        .await
        .unwrap();

    assert_eq!(store.get("owl"), Some(&DatasetRecord::generation_failed("owl")));
    assert_eq!(validator.call_count(), 0);
}

#[tokio::test]
async fn test_render_failure_keeps_code() {
    let dir = TempDir::new().unwrap();
    let generator = MockGenerationService::new().with_code_for("yak", "broken(;");
    let validator = MockRenderValidator::passing().with_rule(
        "broken",
        ValidationOutcome::Failed(ValidationFailure::NonZeroExit {
            code: Some(1),
            stderr: "syntax error".to_string(),
        }),
    );
    let pipeline = pipeline(&generator, Arc::new(validator.clone()));

    let mut store = DatasetStore::new(store_path(&dir), SUBJECT_KEY);
    let report = pipeline
        .run(&names(&["yak", "gnu"]), None, &mut store)
        .await
        .unwrap();

    let record = store.get("yak").unwrap();
    assert!(!record.render_ok);
    assert_eq!(record.generated_code, "broken(;");
    assert_eq!(record.error, None);
    assert_eq!(report.outcomes[0].final_state, SubjectState::ValidatedFail);
    assert!(report.outcomes[0]
        .reason
        .as_deref()
        .unwrap()
        .contains("syntax error"));

    assert!(validator
        .calls()
        .iter()
        .all(|(_, mode)| *mode == ValidationMode::Full));
}

#[tokio::test]
async fn test_missing_renderer_degrades_to_pass() {
    let dir = TempDir::new().unwrap();
    let generator = MockGenerationService::new();
    let pipeline = pipeline(
        &generator,
        Arc::new(MockRenderValidator::with_default(ValidationOutcome::ToolAbsent)),
    );

    let mut store = DatasetStore::new(store_path(&dir), SUBJECT_KEY);
    let report = pipeline
        .run(&names(&["a", "b"]), None, &mut store)
        .await
        .unwrap();

    assert_eq!(report.succeeded, 2);
    assert!(store.records().iter().all(|r| r.render_ok));
}

#[tokio::test]
async fn test_retry_failed_reprocesses_only_failures() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let mut prior = DatasetStore::new(&path, SUBJECT_KEY);
    prior.insert(DatasetRecord::generated("a", "cube(1);", true));
    prior.insert(DatasetRecord::generation_failed("b"));
    prior.insert(DatasetRecord::generated("c", "bad();", false));
    prior.flush().unwrap();

    let generator = MockGenerationService::new();
    let retrying = pipeline(&generator, Arc::new(MockRenderValidator::passing()))
        .with_retry_failed(true);

    let mut store = DatasetStore::load(&path, SUBJECT_KEY).unwrap();
    let report = retrying
        .run(&names(&["a", "b", "c", "d"]), None, &mut store)
        .await
        .unwrap();

    assert_eq!(report.processed, 3);
    assert!(!generator.was_asked_for("a"));
    assert_eq!(store.len(), 4);
    assert_eq!(subjects(&store), names(&["a", "b", "c", "d"]));
    assert!(store.records().iter().all(|r| r.render_ok));
    assert!(report.outcomes.iter().filter(|o| o.replaced).count() == 2);
}

#[tokio::test]
async fn test_failures_are_final_without_retry() {
    let dir = TempDir::new().unwrap();
    let mut store = DatasetStore::new(store_path(&dir), SUBJECT_KEY);
    store.insert(DatasetRecord::generation_failed("b"));

    let generator = MockGenerationService::new();
    let pipeline = pipeline(&generator, Arc::new(MockRenderValidator::passing()));
    let report = pipeline
        .run(&names(&["b"]), None, &mut store)
        .await
        .unwrap();

    assert_eq!(report.processed, 0);
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_run_single_replaces_existing_record() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let mut store = DatasetStore::new(&path, SUBJECT_KEY);
    store.insert(DatasetRecord::generated("cat", "old();", false));

    let generator = MockGenerationService::new().with_code_for("cat", "new();");
    let pipeline = pipeline(&generator, Arc::new(MockRenderValidator::passing()));

    let outcome = pipeline.run_single("cat", &mut store).await.unwrap();

    assert!(outcome.replaced);
    assert_eq!(store.len(), 1);
    let on_disk = DatasetStore::load(&path, SUBJECT_KEY).unwrap();
    assert_eq!(
        on_disk.get("cat"),
        Some(&DatasetRecord::generated("cat", "new();", true))
    );
}

#[tokio::test]
async fn test_run_single_failure_keeps_working_record() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let mut prior = DatasetStore::new(&path, SUBJECT_KEY);
    prior.insert(DatasetRecord::generated("cat", "good_model();", true));
    prior.insert(DatasetRecord::generated("dog", "cube(1);", true));
    prior.flush().unwrap();
    let before = std::fs::read(&path).unwrap();

    let generator = MockGenerationService::new().failing_for("cat");
    let pipeline = pipeline(&generator, Arc::new(MockRenderValidator::passing()));

    let mut store = DatasetStore::load(&path, SUBJECT_KEY).unwrap();
    let outcome = pipeline.run_single("cat", &mut store).await.unwrap();

    assert!(!outcome.render_ok);
    assert!(outcome.kept_previous);
    assert!(!outcome.replaced);
    assert_eq!(outcome.final_state, SubjectState::GenerationFailed);
    assert_eq!(std::fs::read(&path).unwrap(), before);

    let on_disk = DatasetStore::load(&path, SUBJECT_KEY).unwrap();
    assert_eq!(
        on_disk.get("cat"),
        Some(&DatasetRecord::generated("cat", "good_model();", true))
    );
    assert_eq!(subjects(&on_disk), names(&["cat", "dog"]));
}

#[tokio::test]
async fn test_run_single_render_failure_keeps_working_record() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let mut store = DatasetStore::new(&path, SUBJECT_KEY);
    store.insert(DatasetRecord::generated("cat", "good_model();", true));

    let generator = MockGenerationService::new().with_code_for("cat", "broken(;");
    let validator = MockRenderValidator::passing().with_rule(
        "broken",
        ValidationOutcome::Failed(ValidationFailure::MissingArtifact),
    );
    let pipeline = pipeline(&generator, Arc::new(validator));

    let outcome = pipeline.run_single("cat", &mut store).await.unwrap();

    assert!(outcome.kept_previous);
    assert_eq!(store.get("cat").unwrap().generated_code, "good_model();");
}

#[tokio::test]
async fn test_run_single_failure_replaces_earlier_failure() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let mut store = DatasetStore::new(&path, SUBJECT_KEY);
    store.insert(DatasetRecord::generated("cat", "bad();", false));

    let generator = MockGenerationService::new().failing_for("cat");
    let pipeline = pipeline(&generator, Arc::new(MockRenderValidator::passing()));

    let outcome = pipeline.run_single("cat", &mut store).await.unwrap();

    assert!(outcome.replaced);
    assert!(!outcome.kept_previous);
    let on_disk = DatasetStore::load(&path, SUBJECT_KEY).unwrap();
    assert_eq!(on_disk.get("cat"), Some(&DatasetRecord::generation_failed("cat")));
}

/// Counts the records on disk each time it is asked to validate
struct DiskObservingValidator {
    path: PathBuf,
    observed: Mutex<Vec<usize>>,
}

fn records_on_disk(path: &Path) -> usize {
    read_record_values(path)
        .unwrap()
        .map(|(values, _)| values.len())
        .unwrap_or(0)
}

#[async_trait]
impl RenderValidator for DiskObservingValidator {
    async fn validate(&self, _source: &str, _mode: ValidationMode) -> ValidationOutcome {
        self.observed
            .lock()
            .unwrap()
            .push(records_on_disk(&self.path));
        ValidationOutcome::Passed
    }
}

#[tokio::test]
async fn test_store_is_flushed_after_every_subject() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let validator = Arc::new(DiskObservingValidator {
        path: path.clone(),
        observed: Mutex::new(Vec::new()),
    });
    let generator = MockGenerationService::new();
    let pipeline = pipeline(&generator, validator.clone());

    let mut store = DatasetStore::new(&path, SUBJECT_KEY);
    pipeline
        .run(&names(&["a", "b", "c", "d"]), None, &mut store)
        .await
        .unwrap();

    assert_eq!(*validator.observed.lock().unwrap(), vec![0, 1, 2, 3]);
    assert_eq!(records_on_disk(&path), 4);
}

#[tokio::test]
async fn test_unwritable_store_aborts_the_run() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let generator = MockGenerationService::new();
    let pipeline = pipeline(&generator, Arc::new(MockRenderValidator::passing()));

    let mut store = DatasetStore::new(blocker.join("store.json"), SUBJECT_KEY);
    let result = pipeline.run(&names(&["a", "b"]), None, &mut store).await;

    assert!(matches!(result, Err(DatasetError::Persistence { .. })));
    assert_eq!(generator.call_count(), 1);
}
