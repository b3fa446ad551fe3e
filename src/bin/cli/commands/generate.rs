//! Generate command handler

use anyhow::Context;
use std::sync::Arc;

use scad_dataset::generation::ChatCompletionClient;
use scad_dataset::names::load_name_list;
use scad_dataset::pipeline::{format_duration, BatchGenerationPipeline};
use scad_dataset::prompts::ScadPrompt;
use scad_dataset::store::DatasetStore;
use scad_dataset::validator::ProcessValidator;
use scad_dataset::DatasetConfig;

use crate::GenerateArgs;

pub async fn handle_generate_command(
    args: GenerateArgs,
    config: &DatasetConfig,
) -> anyhow::Result<()> {
    let category = config.category(&args.category)?;
    let data_dir = &config.pipeline.data_dir;

    if !args.list && args.subject.is_none() {
        println!("✗ Nothing to do: pass a SUBJECT or --list (see --help)");
        return Ok(());
    }

    let style = args.style.unwrap_or(config.pipeline.style);
    let complexity = args.complexity.unwrap_or(config.pipeline.complexity);
    let retry_failed = args.retry_failed || config.pipeline.retry_failed;
    let dataset_path = args
        .dataset
        .unwrap_or_else(|| category.dataset_path(data_dir));

    let generator = ChatCompletionClient::new(config.generation.clone())
        .context("Failed to create generation client")?;
    let validator = ProcessValidator::new(config.validator.clone());
    let pipeline = BatchGenerationPipeline::new(
        Arc::new(generator),
        Arc::new(validator),
        ScadPrompt::new(&category.noun, style, complexity),
    )
    .with_retry_failed(retry_failed);

    let mut store = DatasetStore::load(&dataset_path, &category.subject_key)?;
    println!(
        "Store {} holds {} records",
        dataset_path.display(),
        store.len()
    );
    println!("Style: {style}, Complexity: {complexity}");
    if pipeline.retry_failed() {
        println!("Recorded failures will be attempted again");
    }

    if args.list {
        let list_path = args
            .list_file
            .unwrap_or_else(|| category.list_path(data_dir));
        let candidates = load_name_list(&list_path)?;
        println!(
            "Loaded {} {} names from {}",
            candidates.len(),
            category.noun,
            list_path.display()
        );

        let report = pipeline.run(&candidates, args.max, &mut store).await?;

        if report.processed == 0 {
            println!("✓ Nothing new to process ({} already recorded)", report.skipped);
        } else {
            for outcome in &report.outcomes {
                let icon = if outcome.render_ok { "✓" } else { "✗" };
                match outcome.reason {
                    Some(ref reason) => println!("  {icon} {}: {reason}", outcome.subject),
                    None => println!("  {icon} {}", outcome.subject),
                }
            }
            println!(
                "✓ Processed {} subjects in {} ({} rendered, {} failed, {} skipped)",
                report.processed,
                format_duration(report.elapsed),
                report.succeeded,
                report.failed,
                report.skipped
            );
        }
    } else if let Some(subject) = args.subject {
        let subject = subject.trim().to_string();
        println!("Generating OpenSCAD model for: {subject}");

        let outcome = pipeline.run_single(&subject, &mut store).await?;
        if outcome.render_ok {
            println!("  ✓ Rendering test passed");
        } else {
            println!(
                "  ✗ {}: {}",
                outcome.final_state,
                outcome.reason.as_deref().unwrap_or("failed")
            );
        }
        if outcome.replaced {
            println!("  Replaced the previous record for {subject}");
        } else if outcome.kept_previous {
            println!("  Kept the existing working record for {subject}");
        }
    }

    let stats = store.stats();
    println!(
        "✓ Dataset saved to {} ({} records, {} rendered)",
        dataset_path.display(),
        stats.total,
        stats.rendered
    );
    Ok(())
}
