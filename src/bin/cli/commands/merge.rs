//! Merge command handler

use std::sync::Arc;

use scad_dataset::merge::{sources_from_categories, write_combined, DatasetMerger};
use scad_dataset::validator::ProcessValidator;
use scad_dataset::DatasetConfig;

use crate::MergeArgs;

pub async fn handle_merge_command(args: MergeArgs, config: &DatasetConfig) -> anyhow::Result<()> {
    let sources = sources_from_categories(&config.categories, &config.pipeline.data_dir);
    let output = args.output.unwrap_or_else(|| config.merge_output_path());

    let mut merger = DatasetMerger::new();
    if args.revalidate || config.merge.revalidate {
        println!("Re-validating every record with the quick renderer check");
        merger = merger.with_revalidation(Arc::new(ProcessValidator::new(config.validator.clone())));
    }

    let report = merger.merge(&sources).await;

    for stats in &report.categories {
        if stats.missing {
            println!("  - {}: store not found, skipped", stats.category);
        } else if let Some(ref error) = stats.load_error {
            println!("  ✗ {}: {error}", stats.category);
        } else {
            let mut line = format!("  ✓ {}: added {} items", stats.category, stats.emitted);
            if stats.excluded > 0 {
                line.push_str(&format!(", {} failed re-validation", stats.excluded));
            }
            if stats.incomplete > 0 {
                line.push_str(&format!(", {} incomplete", stats.incomplete));
            }
            println!("{line}");
        }
    }

    write_combined(&output, &report.records)?;
    println!(
        "✓ Combined dataset with {} items saved to {}",
        report.total(),
        output.display()
    );
    Ok(())
}
