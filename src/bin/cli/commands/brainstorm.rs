//! Brainstorm command handler

use anyhow::Context;

use scad_dataset::curation::brainstorm;
use scad_dataset::generation::ChatCompletionClient;
use scad_dataset::names::save_name_list;
use scad_dataset::DatasetConfig;

use crate::BrainstormArgs;

/// Number of names echoed after saving
const PREVIEW: usize = 20;

pub async fn handle_brainstorm_command(
    args: BrainstormArgs,
    config: &DatasetConfig,
) -> anyhow::Result<()> {
    let category = config.category(&args.category)?;
    let target = args.count.unwrap_or(category.target_count);
    let output = args
        .output
        .unwrap_or_else(|| category.list_path(&config.pipeline.data_dir));

    let client = ChatCompletionClient::new(config.generation.clone())
        .context("Failed to create generation client")?;

    println!(
        "Brainstorming {target} {} names ({} batches)...",
        category.noun,
        category.focuses.len().max(1)
    );
    let report = brainstorm(&client, category, target).await;

    if report.failed_batches > 0 {
        println!(
            "  ✗ {} of {} batches failed",
            report.failed_batches, report.batches
        );
    }
    if report.names.is_empty() {
        println!("✗ No names collected, {} left untouched", output.display());
        return Ok(());
    }

    save_name_list(&output, &report.names)?;
    println!(
        "✓ Saved {} unique names ({} parsed) to {}",
        report.names.len(),
        report.parsed,
        output.display()
    );

    for (index, name) in report.names.iter().take(PREVIEW).enumerate() {
        println!("  {:2}. {name}", index + 1);
    }
    if report.names.len() > PREVIEW {
        println!("  ... and {} more", report.names.len() - PREVIEW);
    }
    Ok(())
}
