//! Mock Services for Testing
//!
//! In-process stand-ins for the generation service and the render validator.
//! Both record every call so tests can assert on order and count.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use scad_dataset::generation::{GenerationFailure, GenerationOutcome, GenerationService};
use scad_dataset::validator::{RenderValidator, ValidationMode, ValidationOutcome};

/// Text that appears in the code-generation prompt for `subject` and in no
/// other subject's prompt
pub fn subject_needle(subject: &str) -> String {
    format!("for a {subject} (")
}

/// Mock generation state for tracking calls and scripting responses
#[derive(Debug, Clone)]
pub struct MockGenerationState {
    /// Every prompt received, in call order
    pub prompts: Vec<String>,
    /// First rule whose needle occurs in the prompt decides the outcome
    rules: Vec<(String, GenerationOutcome)>,
    /// Consumed front to back before rules are consulted
    queue: VecDeque<GenerationOutcome>,
    default: GenerationOutcome,
}

#[derive(Clone)]
pub struct MockGenerationService {
    state: Arc<Mutex<MockGenerationState>>,
}

impl MockGenerationService {
    /// Every prompt is answered with a small valid model
    pub fn new() -> Self {
        Self::with_default(GenerationOutcome::Generated("cube(10);".to_string()))
    }

    pub fn with_default(default: GenerationOutcome) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockGenerationState {
                prompts: Vec::new(),
                rules: Vec::new(),
                queue: VecDeque::new(),
                default,
            })),
        }
    }

    /// Answer prompts containing `needle` with `outcome`
    pub fn with_rule(self, needle: impl Into<String>, outcome: GenerationOutcome) -> Self {
        self.state
            .lock()
            .unwrap()
            .rules
            .push((needle.into(), outcome));
        self
    }

    /// Generation for `subject` returns `code`
    pub fn with_code_for(self, subject: &str, code: &str) -> Self {
        self.with_rule(
            subject_needle(subject),
            GenerationOutcome::Generated(code.to_string()),
        )
    }

    /// Generation for `subject` fails
    pub fn failing_for(self, subject: &str) -> Self {
        self.with_rule(
            subject_needle(subject),
            GenerationOutcome::Failed(GenerationFailure::Transport(
                "connection reset".to_string(),
            )),
        )
    }

    /// Answer the next calls with these outcomes, in order
    pub fn with_queue(self, outcomes: Vec<GenerationOutcome>) -> Self {
        self.state.lock().unwrap().queue.extend(outcomes);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.state.lock().unwrap().prompts.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().prompts.len()
    }

    /// Whether a code-generation prompt for `subject` was sent
    pub fn was_asked_for(&self, subject: &str) -> bool {
        let needle = subject_needle(subject);
        self.prompts().iter().any(|p| p.contains(&needle))
    }
}

#[async_trait]
impl GenerationService for MockGenerationService {
    async fn generate(&self, prompt: &str) -> GenerationOutcome {
        let mut state = self.state.lock().unwrap();
        state.prompts.push(prompt.to_string());

        if let Some(outcome) = state.queue.pop_front() {
            return outcome;
        }
        state
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| state.default.clone())
    }

    fn name(&self) -> &str {
        "mock-generation"
    }
}

/// Mock validator state for tracking calls and scripting outcomes
#[derive(Debug, Clone)]
pub struct MockValidatorState {
    /// Every (source, mode) validated, in call order
    pub calls: Vec<(String, ValidationMode)>,
    rules: Vec<(String, ValidationOutcome)>,
    default: ValidationOutcome,
}

#[derive(Clone)]
pub struct MockRenderValidator {
    state: Arc<Mutex<MockValidatorState>>,
}

impl MockRenderValidator {
    pub fn passing() -> Self {
        Self::with_default(ValidationOutcome::Passed)
    }

    pub fn with_default(default: ValidationOutcome) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockValidatorState {
                calls: Vec::new(),
                rules: Vec::new(),
                default,
            })),
        }
    }

    /// Sources containing `needle` get `outcome`
    pub fn with_rule(self, needle: impl Into<String>, outcome: ValidationOutcome) -> Self {
        self.state
            .lock()
            .unwrap()
            .rules
            .push((needle.into(), outcome));
        self
    }

    pub fn calls(&self) -> Vec<(String, ValidationMode)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }
}

#[async_trait]
impl RenderValidator for MockRenderValidator {
    async fn validate(&self, source: &str, mode: ValidationMode) -> ValidationOutcome {
        let mut state = self.state.lock().unwrap();
        state.calls.push((source.to_string(), mode));
        state
            .rules
            .iter()
            .find(|(needle, _)| source.contains(needle.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| state.default.clone())
    }
}
