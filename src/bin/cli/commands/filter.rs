//! Filter command handler

use anyhow::Context;

use scad_dataset::curation::filter_names;
use scad_dataset::generation::ChatCompletionClient;
use scad_dataset::names::{load_name_list, save_name_list};
use scad_dataset::DatasetConfig;

use crate::FilterArgs;

pub async fn handle_filter_command(args: FilterArgs, config: &DatasetConfig) -> anyhow::Result<()> {
    let category = config.category(&args.category)?;
    let data_dir = &config.pipeline.data_dir;
    let input = args.input.unwrap_or_else(|| category.list_path(data_dir));
    let output = args
        .output
        .unwrap_or_else(|| category.filtered_list_path(data_dir));

    let names = load_name_list(&input)?;
    let client = ChatCompletionClient::new(config.generation.clone())
        .context("Failed to create generation client")?;

    println!("Filtering {} entries from {}...", names.len(), input.display());
    let report = filter_names(&client, category, &names).await;

    save_name_list(&output, &report.kept)?;
    println!(
        "✓ Kept {} of {} entries as {} names, saved to {}",
        report.kept.len(),
        names.len(),
        category.noun,
        output.display()
    );
    if !report.rejected.is_empty() {
        println!("  ✗ Rejected: {}", report.rejected.join(", "));
    }
    Ok(())
}
