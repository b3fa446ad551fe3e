//! External-process render validator.
//!
//! The source is written to a temporary file, the configured renderer runs
//! against it under a wall-clock limit, and the check passes iff the process
//! exits with status 0 (and, when the profile requires it, leaves a non-empty
//! artifact). Temporary files are owned by guards, so they are removed on
//! every exit path; a timed-out renderer is killed when its handle drops.

use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{RenderValidator, ValidationFailure, ValidationMode, ValidationOutcome};
use crate::config::{CheckConfig, ValidatorConfig};

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Longest stderr excerpt kept in a failure reason
const MAX_STDERR: usize = 400;

#[derive(Debug, Clone)]
pub struct ProcessValidator {
    config: ValidatorConfig,
}

impl ProcessValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    fn check(&self, mode: ValidationMode) -> &CheckConfig {
        match mode {
            ValidationMode::Full => &self.config.full,
            ValidationMode::Quick => &self.config.quick,
        }
    }

    fn temp_file(&self, suffix: &str) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("scad-dataset-").suffix(suffix);
        match self.config.temp_dir {
            Some(ref dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }

    async fn run_check(&self, source: &str, check: &CheckConfig) -> ValidationOutcome {
        let mut input = match self.temp_file(&self.config.source_suffix) {
            Ok(file) => file,
            Err(e) => return io_failure("create source file", e),
        };
        if let Err(e) = input.write_all(source.as_bytes()).and_then(|()| input.flush()) {
            return io_failure("write source file", e);
        }

        let needs_artifact =
            check.require_artifact || check.args.iter().any(|a| a.contains(OUTPUT_PLACEHOLDER));
        let artifact = if needs_artifact {
            match self.temp_file(&check.artifact_suffix) {
                Ok(file) => Some(file),
                Err(e) => return io_failure("create artifact file", e),
            }
        } else {
            None
        };

        let args = substitute_args(&check.args, input.path(), artifact.as_ref().map(|a| a.path()));

        let child = Command::new(&self.config.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    binary = %self.config.binary,
                    "Renderer not found, assuming generated code is valid"
                );
                return ValidationOutcome::ToolAbsent;
            }
            Err(e) => return io_failure("spawn renderer", e),
        };

        let timeout = check.timeout();
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return io_failure("wait for renderer", e),
            Err(_) => {
                debug!(timeout_ms = check.timeout_ms, "Renderer timed out");
                return ValidationOutcome::Failed(ValidationFailure::TimedOut(timeout));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return ValidationOutcome::Failed(ValidationFailure::NonZeroExit {
                code: output.status.code(),
                stderr: excerpt(&stderr, MAX_STDERR),
            });
        }

        if check.require_artifact {
            let produced = artifact
                .as_ref()
                .and_then(|a| std::fs::metadata(a.path()).ok())
                .map(|m| m.len())
                .unwrap_or(0);
            if produced == 0 {
                return ValidationOutcome::Failed(ValidationFailure::MissingArtifact);
            }
        }

        ValidationOutcome::Passed
    }
}

#[async_trait]
impl RenderValidator for ProcessValidator {
    async fn validate(&self, source: &str, mode: ValidationMode) -> ValidationOutcome {
        let outcome = self.run_check(source, self.check(mode)).await;
        debug!(mode = %mode, outcome = ?outcome, "Render validation finished");
        outcome
    }
}

/// Replace `{input}` and `{output}` in every argument
fn substitute_args(args: &[String], input: &Path, output: Option<&Path>) -> Vec<String> {
    let input = input.display().to_string();
    let output = output.map(|p| p.display().to_string()).unwrap_or_default();
    args.iter()
        .map(|arg| {
            arg.replace(INPUT_PLACEHOLDER, &input)
                .replace(OUTPUT_PLACEHOLDER, &output)
        })
        .collect()
}

fn io_failure(action: &str, error: std::io::Error) -> ValidationOutcome {
    ValidationOutcome::Failed(ValidationFailure::Io(format!("{action}: {error}")))
}

/// Last `max_chars` characters of the trimmed text; renderer errors tend to
/// be at the end
fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        trimmed.to_string()
    } else {
        trimmed.chars().skip(count - max_chars).collect()
    }
}
