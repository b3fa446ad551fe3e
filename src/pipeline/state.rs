//! # Subject State Machine
//!
//! States and events a subject passes through in one pipeline run, from
//! pending to recorded. [`transition`] is the whole transition table.

use std::fmt;
use thiserror::Error;

/// Lifecycle of one subject inside a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectState {
    /// Selected for processing, nothing attempted yet
    Pending,
    /// Waiting on the generation service
    Generating,
    /// Generation failed or returned empty text
    GenerationFailed,
    /// Source text received
    Generated,
    /// Renderer check running
    Validating,
    ValidatedOk,
    ValidatedFail,
    /// Record appended and flushed
    Recorded,
}

impl SubjectState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Recorded)
    }

    /// States that may be recorded
    pub fn is_recordable(&self) -> bool {
        matches!(
            self,
            Self::GenerationFailed | Self::ValidatedOk | Self::ValidatedFail
        )
    }
}

impl fmt::Display for SubjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Generating => write!(f, "generating"),
            Self::GenerationFailed => write!(f, "generation_failed"),
            Self::Generated => write!(f, "generated"),
            Self::Validating => write!(f, "validating"),
            Self::ValidatedOk => write!(f, "validated_ok"),
            Self::ValidatedFail => write!(f, "validated_fail"),
            Self::Recorded => write!(f, "recorded"),
        }
    }
}

impl std::str::FromStr for SubjectState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "generating" => Ok(Self::Generating),
            "generation_failed" => Ok(Self::GenerationFailed),
            "generated" => Ok(Self::Generated),
            "validating" => Ok(Self::Validating),
            "validated_ok" => Ok(Self::ValidatedOk),
            "validated_fail" => Ok(Self::ValidatedFail),
            "recorded" => Ok(Self::Recorded),
            _ => Err(format!("Invalid subject state: {s}")),
        }
    }
}

/// Events that drive [`SubjectState`] transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectEvent {
    StartGeneration,
    GenerationSucceeded,
    GenerationFailed,
    StartValidation,
    ValidationPassed,
    ValidationFailed,
    Record,
}

impl SubjectEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StartGeneration => "start_generation",
            Self::GenerationSucceeded => "generation_succeeded",
            Self::GenerationFailed => "generation_failed",
            Self::StartValidation => "start_validation",
            Self::ValidationPassed => "validation_passed",
            Self::ValidationFailed => "validation_failed",
            Self::Record => "record",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid transition for '{subject}': {event} from {from}")]
pub struct StateTransitionError {
    pub subject: String,
    pub from: SubjectState,
    pub event: &'static str,
}

/// Target state of `event` applied in `from`, if the transition is legal
pub fn transition(from: SubjectState, event: SubjectEvent) -> Option<SubjectState> {
    use SubjectEvent as E;
    use SubjectState as S;

    match (from, event) {
        (S::Pending, E::StartGeneration) => Some(S::Generating),
        (S::Generating, E::GenerationSucceeded) => Some(S::Generated),
        (S::Generating, E::GenerationFailed) => Some(S::GenerationFailed),
        (S::Generated, E::StartValidation) => Some(S::Validating),
        (S::Validating, E::ValidationPassed) => Some(S::ValidatedOk),
        (S::Validating, E::ValidationFailed) => Some(S::ValidatedFail),
        (state, E::Record) if state.is_recordable() => Some(S::Recorded),
        _ => None,
    }
}

/// Tracks the state of one subject and rejects illegal transitions
#[derive(Debug, Clone)]
pub struct SubjectLifecycle {
    subject: String,
    state: SubjectState,
}

impl SubjectLifecycle {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            state: SubjectState::Pending,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn state(&self) -> SubjectState {
        self.state
    }

    pub fn advance(&mut self, event: SubjectEvent) -> Result<SubjectState, StateTransitionError> {
        let next = transition(self.state, event).ok_or_else(|| StateTransitionError {
            subject: self.subject.clone(),
            from: self.state,
            event: event.event_type(),
        })?;
        self.state = next;
        Ok(next)
    }
}
