//! # Generation Service
//!
//! The remote model is reached through the [`GenerationService`] trait. A call
//! never raises: it returns a [`GenerationOutcome`] whose failure variant
//! names why nothing usable came back. The pipeline collapses every failure
//! into one "generation failed" record, but the reason is logged.

pub mod chat_client;

use async_trait::async_trait;
use thiserror::Error;

pub use chat_client::ChatCompletionClient;

/// Why a generation call produced no text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationFailure {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("service returned an empty response")]
    EmptyResponse,
}

impl GenerationFailure {
    /// Authentication and authorization rejections
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::HttpStatus { status, .. } if *status == 401 || *status == 403)
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 429, .. })
    }
}

/// Result of one generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Generated(String),
    Failed(GenerationFailure),
}

impl GenerationOutcome {
    /// Wrap raw response text, treating whitespace-only text as a failure
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self::Failed(GenerationFailure::EmptyResponse)
        } else {
            Self::Generated(trimmed.to_string())
        }
    }
}

/// A remote text generator taking one free-text prompt per call
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, prompt: &str) -> GenerationOutcome;

    /// Short name used in logs
    fn name(&self) -> &str {
        "generation"
    }
}
