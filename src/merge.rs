//! # Dataset Merger
//!
//! Rebuilds the combined dataset from the per-category stores. Sources are
//! visited in the given order and records keep their store order, so the
//! same inputs always produce a byte-identical output file.
//!
//! A missing or unreadable store is logged and skipped; it never fails the
//! merge. Only writing the combined file can fail.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::category::Category;
use crate::error::DatasetResult;
use crate::store::{read_record_values, write_json_atomic, CODE_FIELD};
use crate::validator::{RenderValidator, ValidationMode};

/// One store to merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSource {
    pub category: String,
    pub path: PathBuf,
    pub subject_key: String,
}

/// Merge sources for every category, in registry order
pub fn sources_from_categories(categories: &[Category], data_dir: &Path) -> Vec<MergeSource> {
    categories
        .iter()
        .map(|category| MergeSource {
            category: category.name.clone(),
            path: category.dataset_path(data_dir),
            subject_key: category.subject_key.clone(),
        })
        .collect()
}

/// Entry of the combined dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedRecord {
    pub name: String,
    pub category: String,
    pub code: String,
}

/// What happened to one source during a merge
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CategoryMergeStats {
    pub category: String,
    /// Store file did not exist
    pub missing: bool,
    /// Store file existed but could not be read or parsed
    pub load_error: Option<String>,
    /// Records found in the store
    pub loaded: usize,
    /// Records lacking the subject or code field
    pub incomplete: usize,
    /// Records dropped by re-validation
    pub excluded: usize,
    pub emitted: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub records: Vec<CombinedRecord>,
    pub categories: Vec<CategoryMergeStats>,
}

impl MergeReport {
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn skipped_sources(&self) -> usize {
        self.categories
            .iter()
            .filter(|c| c.missing || c.load_error.is_some())
            .count()
    }
}

#[derive(Default)]
pub struct DatasetMerger {
    validator: Option<Arc<dyn RenderValidator>>,
}

impl std::fmt::Debug for DatasetMerger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetMerger")
            .field("revalidate", &self.validator.is_some())
            .finish()
    }
}

impl DatasetMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-check every record with the quick renderer profile and drop failures
    pub fn with_revalidation(mut self, validator: Arc<dyn RenderValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn revalidates(&self) -> bool {
        self.validator.is_some()
    }

    pub async fn merge(&self, sources: &[MergeSource]) -> MergeReport {
        let mut report = MergeReport::default();

        for source in sources {
            let stats = self.merge_source(source, &mut report.records).await;
            report.categories.push(stats);
        }

        info!(
            sources = sources.len(),
            skipped_sources = report.skipped_sources(),
            records = report.total(),
            revalidated = self.revalidates(),
            "Merge complete"
        );
        report
    }

    async fn merge_source(
        &self,
        source: &MergeSource,
        records: &mut Vec<CombinedRecord>,
    ) -> CategoryMergeStats {
        let mut stats = CategoryMergeStats {
            category: source.category.clone(),
            ..CategoryMergeStats::default()
        };

        let values = match read_record_values(&source.path) {
            Ok(Some((values, _schema))) => values,
            Ok(None) => {
                warn!(
                    category = %source.category,
                    path = %source.path.display(),
                    "Store not found, skipping"
                );
                stats.missing = true;
                return stats;
            }
            Err(e) => {
                warn!(
                    category = %source.category,
                    error = %e,
                    "Failed to load store, skipping"
                );
                stats.load_error = Some(e.to_string());
                return stats;
            }
        };

        stats.loaded = values.len();
        for value in &values {
            let Some((name, code)) = extract(value, &source.subject_key) else {
                stats.incomplete += 1;
                continue;
            };

            if let Some(ref validator) = self.validator {
                let outcome = validator.validate(code, ValidationMode::Quick).await;
                if !outcome.render_ok() {
                    debug!(
                        category = %source.category,
                        name,
                        outcome = ?outcome,
                        "Excluded by re-validation"
                    );
                    stats.excluded += 1;
                    continue;
                }
            }

            records.push(CombinedRecord {
                name: name.to_string(),
                category: source.category.clone(),
                code: code.to_string(),
            });
            stats.emitted += 1;
        }

        info!(
            category = %source.category,
            loaded = stats.loaded,
            emitted = stats.emitted,
            excluded = stats.excluded,
            incomplete = stats.incomplete,
            "Merged category"
        );
        stats
    }
}

/// Subject and code of a stored record, when both are strings
fn extract<'a>(value: &'a Value, subject_key: &str) -> Option<(&'a str, &'a str)> {
    let object = value.as_object()?;
    let name = object.get(subject_key)?.as_str()?;
    let code = object.get(CODE_FIELD)?.as_str()?;
    Some((name, code))
}

/// Overwrite `path` with the combined dataset
pub fn write_combined(path: &Path, records: &[CombinedRecord]) -> DatasetResult<()> {
    write_json_atomic(path, records)?;
    info!(path = %path.display(), records = records.len(), "Wrote combined dataset");
    Ok(())
}
