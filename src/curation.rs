//! # Name-List Curation
//!
//! Building candidate lists for a category: brainstorming names in one or
//! more focus batches, and filtering a list through yes/no classification
//! questions. Both steps go through the same [`GenerationService`] as code
//! generation; a failed call loses that batch or rejects that name and the
//! step carries on.

use tracing::{debug, info, warn};

use crate::category::Category;
use crate::generation::{GenerationOutcome, GenerationService};
use crate::names::{dedup_preserving_order, parse_candidate_names, CandidateName};
use crate::prompts::{brainstorm_prompt, classification_prompt};

/// Smallest number of names requested per focus batch
pub const MIN_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrainstormReport {
    /// Sanitized, deduplicated names, truncated to the target
    pub names: Vec<CandidateName>,
    /// Names accepted by sanitization before dedup
    pub parsed: usize,
    pub batches: usize,
    pub failed_batches: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterReport {
    pub kept: Vec<String>,
    pub rejected: Vec<String>,
}

/// Names requested per batch when `target` is split over `batches`
pub fn batch_size(target: usize, batches: usize) -> usize {
    if batches <= 1 {
        target
    } else {
        (target / batches).max(MIN_BATCH_SIZE)
    }
}

/// Ask for `target` names of the category, one batch per focus
pub async fn brainstorm(
    service: &dyn GenerationService,
    category: &Category,
    target: usize,
) -> BrainstormReport {
    let focuses: Vec<Option<&str>> = if category.focuses.is_empty() {
        vec![None]
    } else {
        category.focuses.iter().map(|f| Some(f.as_str())).collect()
    };
    let size = batch_size(target, focuses.len());

    info!(
        category = %category.name,
        target,
        batches = focuses.len(),
        batch_size = size,
        "Brainstorming candidate names"
    );

    let mut collected = Vec::new();
    let mut failed_batches = 0;
    for (index, focus) in focuses.iter().enumerate() {
        let prompt = brainstorm_prompt(&category.noun, size, *focus);
        match service.generate(&prompt).await {
            GenerationOutcome::Generated(text) => {
                let names = parse_candidate_names(&text);
                debug!(
                    batch = index + 1,
                    focus = focus.unwrap_or("general"),
                    names = names.len(),
                    "Brainstorm batch parsed"
                );
                collected.extend(names);
            }
            GenerationOutcome::Failed(failure) => {
                warn!(
                    batch = index + 1,
                    focus = focus.unwrap_or("general"),
                    reason = %failure,
                    "Brainstorm batch failed"
                );
                failed_batches += 1;
            }
        }
    }

    let parsed = collected.len();
    let mut names = dedup_preserving_order(collected);
    names.truncate(target);

    info!(
        category = %category.name,
        parsed,
        unique = names.len(),
        "Brainstorm complete"
    );

    BrainstormReport {
        names,
        parsed,
        batches: focuses.len(),
        failed_batches,
    }
}

/// A classification answer counts as yes when it contains "yes" anywhere
pub fn is_affirmative(answer: &str) -> bool {
    answer.to_lowercase().contains("yes")
}

/// Keep the names the service classifies as members of the category.
/// A failed call rejects the name.
pub async fn filter_names(
    service: &dyn GenerationService,
    category: &Category,
    names: &[String],
) -> FilterReport {
    let mut report = FilterReport::default();

    for (index, name) in names.iter().enumerate() {
        let prompt = classification_prompt(&category.noun, name);
        let keep = match service.generate(&prompt).await {
            GenerationOutcome::Generated(answer) => is_affirmative(&answer),
            GenerationOutcome::Failed(failure) => {
                warn!(name = %name, reason = %failure, "Classification failed, rejecting");
                false
            }
        };

        debug!(
            name = %name,
            keep,
            progress = %format!("{}/{}", index + 1, names.len()),
            "Classified name"
        );
        if keep {
            report.kept.push(name.clone());
        } else {
            report.rejected.push(name.clone());
        }
    }

    info!(
        category = %category.name,
        kept = report.kept.len(),
        rejected = report.rejected.len(),
        "Filtering complete"
    );
    report
}
