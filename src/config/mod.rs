//! # Configuration
//!
//! Typed configuration for generation, validation, the batch pipeline, and the
//! merger. Values are layered: built-in defaults, then an optional TOML file,
//! then `SCAD_DATASET_*` environment variables (see [`loader`]).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scad_dataset::config::DatasetConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DatasetConfig::load(None)?;
//! println!("Generating with model {}", config.generation.model);
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::category::{default_categories, Category};
use crate::error::{DatasetError, DatasetResult};
use crate::prompts::{Complexity, Style};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Chat-completion endpoint settings
    pub generation: GenerationConfig,

    /// External renderer settings
    pub validator: ValidatorConfig,

    /// Batch pipeline defaults
    pub pipeline: PipelineConfig,

    /// Combined dataset settings
    pub merge: MergeConfig,

    /// Ordered category registry; merge output follows this order
    pub categories: Vec<Category>,
}

/// Chat-completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API (e.g. "<https://api.example.com/v1>")
    pub base_url: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Bearer token; usually supplied through `SCAD_DATASET_GENERATION__API_KEY`
    pub api_key: Option<String>,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Request a server-sent-event stream instead of a single JSON body
    pub stream: bool,
    /// Optional sampling temperature
    pub temperature: Option<f32>,
}

/// One renderer invocation profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Arguments passed to the renderer; `{input}` and `{output}` are substituted
    pub args: Vec<String>,
    /// Wall-clock limit for the renderer process in milliseconds
    pub timeout_ms: u64,
    /// Suffix of the output artifact file handed to the renderer as `{output}`
    pub artifact_suffix: String,
    /// Fail the check when the renderer leaves an empty artifact behind
    pub require_artifact: bool,
}

impl CheckConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// External renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Renderer executable, resolved through `PATH`
    pub binary: String,
    /// Suffix of the temporary source file
    pub source_suffix: String,
    /// Directory for temporary files (system temp dir when unset)
    pub temp_dir: Option<PathBuf>,
    /// Profile used while generating
    pub full: CheckConfig,
    /// Stricter, faster profile used when re-validating during a merge
    pub quick: CheckConfig,
}

/// Batch pipeline defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory that category list and dataset paths are relative to
    pub data_dir: PathBuf,
    pub style: Style,
    pub complexity: Complexity,
    /// Treat recorded failures as eligible for another attempt
    pub retry_failed: bool,
}

/// Combined dataset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Combined output file, relative to `pipeline.data_dir` unless absolute
    pub output: PathBuf,
    /// Re-run the quick renderer check on every record before emitting it
    pub revalidate: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://inference.cloudrift.ai/v1".to_string(),
            model: "moonshotai/Kimi-K2-Instruct".to_string(),
            api_key: None,
            timeout_ms: 300_000,
            stream: false,
            temperature: None,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            binary: "openscad".to_string(),
            source_suffix: ".scad".to_string(),
            temp_dir: None,
            full: CheckConfig {
                args: vec!["--info".to_string(), "{input}".to_string()],
                timeout_ms: 30_000,
                artifact_suffix: ".stl".to_string(),
                require_artifact: false,
            },
            quick: CheckConfig {
                args: vec![
                    "-o".to_string(),
                    "{output}".to_string(),
                    "{input}".to_string(),
                ],
                timeout_ms: 5_000,
                artifact_suffix: ".csg".to_string(),
                require_artifact: true,
            },
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            style: Style::Realistic,
            complexity: Complexity::Medium,
            retry_failed: false,
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("Synthetic-Objects.json"),
            revalidate: false,
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            validator: ValidatorConfig::default(),
            pipeline: PipelineConfig::default(),
            merge: MergeConfig::default(),
            categories: default_categories(),
        }
    }
}

impl DatasetConfig {
    /// Reject configurations that would fail on first use
    pub fn validate(&self) -> DatasetResult<()> {
        let base = &self.generation.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(DatasetError::configuration(format!(
                "generation.base_url must be an http(s) URL, got '{base}'"
            )));
        }

        if self.generation.model.trim().is_empty() {
            return Err(DatasetError::configuration("generation.model is empty"));
        }

        if self.generation.timeout_ms == 0 {
            return Err(DatasetError::configuration(
                "generation.timeout_ms must be greater than 0",
            ));
        }

        if self.validator.binary.trim().is_empty() {
            return Err(DatasetError::configuration("validator.binary is empty"));
        }

        for (name, check) in [("full", &self.validator.full), ("quick", &self.validator.quick)] {
            if check.timeout_ms == 0 {
                return Err(DatasetError::configuration(format!(
                    "validator.{name}.timeout_ms must be greater than 0"
                )));
            }
            if check.require_artifact && !check.args.iter().any(|a| a.contains("{output}")) {
                return Err(DatasetError::configuration(format!(
                    "validator.{name} requires an artifact but its args never reference {{output}}"
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for category in &self.categories {
            if category.subject_key.trim().is_empty() {
                return Err(DatasetError::configuration(format!(
                    "category '{}' has an empty subject_key",
                    category.name
                )));
            }
            if !seen.insert(category.name.as_str()) {
                return Err(DatasetError::configuration(format!(
                    "category '{}' is defined more than once",
                    category.name
                )));
            }
        }

        Ok(())
    }

    /// Look up a configured category by name
    pub fn category(&self, name: &str) -> DatasetResult<&Category> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DatasetError::UnknownCategory(name.to_string()))
    }

    /// Combined output path resolved against the data directory
    pub fn merge_output_path(&self) -> PathBuf {
        self.pipeline.data_dir.join(&self.merge.output)
    }
}
