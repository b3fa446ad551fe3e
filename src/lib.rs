#![allow(clippy::doc_markdown)] // Allow technical terms like OpenSCAD in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # SCAD Dataset
//!
//! Builds a synthetic dataset of OpenSCAD models by asking a chat-completion
//! model for one script per subject word, smoke-testing every script with an
//! external renderer, and recording each attempt in a per-category JSON store.
//!
//! ## Overview
//!
//! Runs are long, remote calls are slow and flaky, and the process may be
//! stopped at any point. The core is therefore an **incremental, resumable
//! batch pipeline**: the store is flushed after every subject and subjects
//! already recorded are skipped on the next run.
//!
//! ## Module Organization
//!
//! - [`pipeline`] - Resumable generation loop, subject lifecycle, ETA reporting
//! - [`store`] - Per-category JSON stores with atomic flushes and schema migration
//! - [`generation`] - Generation service trait and chat-completion HTTP client
//! - [`validator`] - Render validator trait and external-process implementation
//! - [`merge`] - Combined dataset rebuild across all categories
//! - [`curation`] - Candidate name brainstorming and yes/no filtering
//! - [`names`] - Candidate name sanitization and list files
//! - [`category`] - Ordered category registry
//! - [`prompts`] - Prompt builders, style and complexity options
//! - [`config`] - Layered configuration
//! - [`logging`] - Tracing subscriber setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scad_dataset::config::DatasetConfig;
//! use scad_dataset::generation::ChatCompletionClient;
//! use scad_dataset::pipeline::BatchGenerationPipeline;
//! use scad_dataset::prompts::ScadPrompt;
//! use scad_dataset::store::DatasetStore;
//! use scad_dataset::validator::ProcessValidator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DatasetConfig::load(None)?;
//! let category = config.category("animals")?;
//! let data_dir = &config.pipeline.data_dir;
//!
//! let pipeline = BatchGenerationPipeline::new(
//!     Arc::new(ChatCompletionClient::new(config.generation.clone())?),
//!     Arc::new(ProcessValidator::new(config.validator.clone())),
//!     ScadPrompt::new(&category.noun, config.pipeline.style, config.pipeline.complexity),
//! );
//!
//! let candidates = scad_dataset::names::load_name_list(&category.list_path(data_dir))?;
//! let mut store = DatasetStore::load(category.dataset_path(data_dir), &category.subject_key)?;
//! let report = pipeline.run(&candidates, Some(10), &mut store).await?;
//! println!("{} processed, {} rendered", report.processed, report.succeeded);
//! # Ok(())
//! # }
//! ```

pub mod category;
pub mod config;
pub mod curation;
pub mod error;
pub mod generation;
pub mod logging;
pub mod merge;
pub mod names;
pub mod pipeline;
pub mod prompts;
pub mod store;
pub mod validator;

pub use category::Category;
pub use config::DatasetConfig;
pub use error::{DatasetError, DatasetResult};
pub use generation::{GenerationFailure, GenerationOutcome, GenerationService};
pub use merge::{CombinedRecord, DatasetMerger, MergeReport, MergeSource};
pub use names::CandidateName;
pub use pipeline::{BatchGenerationPipeline, RunReport, SubjectOutcome};
pub use store::{DatasetRecord, DatasetStore};
pub use validator::{RenderValidator, ValidationMode, ValidationOutcome};
