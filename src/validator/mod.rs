//! # Render Validation
//!
//! A [`RenderValidator`] decides whether generated source compiles to
//! geometry. Validation never raises: the outcome is one of passed, failed
//! (with a reason), or tool-absent. A missing renderer must not block
//! generation, so [`ValidationOutcome::render_ok`] treats tool-absent as a
//! pass.

pub mod process;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub use process::ProcessValidator;

/// Which check profile to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationMode {
    /// Generation-time check with the long timeout
    Full,
    /// Merge-time check with the short timeout that also demands an artifact
    Quick,
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Quick => write!(f, "quick"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("renderer exited with status {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("renderer timed out after {0:?}")]
    TimedOut(Duration),

    #[error("renderer produced no output artifact")]
    MissingArtifact,

    #[error("validation I/O error: {0}")]
    Io(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Passed,
    Failed(ValidationFailure),
    /// The renderer executable could not be found
    ToolAbsent,
}

impl ValidationOutcome {
    /// Value recorded as `renders`; tool-absent is optimistically true
    pub fn render_ok(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

#[async_trait]
pub trait RenderValidator: Send + Sync {
    async fn validate(&self, source: &str, mode: ValidationMode) -> ValidationOutcome;
}
