//! Categories command handler

use scad_dataset::store::DatasetStore;
use scad_dataset::DatasetConfig;

pub fn handle_categories_command(config: &DatasetConfig) -> anyhow::Result<()> {
    let data_dir = &config.pipeline.data_dir;
    println!("{} configured categories:", config.categories.len());

    for category in &config.categories {
        let path = category.dataset_path(data_dir);
        let status = if !path.exists() {
            "no store yet".to_string()
        } else {
            match DatasetStore::load(&path, &category.subject_key) {
                Ok(store) => {
                    let stats = store.stats();
                    format!("{} records, {} rendered", stats.total, stats.rendered)
                }
                Err(e) => format!("✗ {e}"),
            }
        };
        println!(
            "  {:<24} key={:<22} {} ({status})",
            category.name,
            category.subject_key,
            category.dataset_file.display()
        );
    }
    Ok(())
}
