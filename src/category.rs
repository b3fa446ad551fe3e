//! # Category Registry
//!
//! A category groups subjects of one kind (animals, tools, ...) and fixes the
//! JSON key its store uses for the subject field, the store file, and the
//! candidate list file. The registry is ordered; merge output follows it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One object category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Registry name, also the `category` field of combined records
    pub name: String,
    /// JSON field holding the subject in this category's store (e.g. "animal")
    pub subject_key: String,
    /// Human-readable singular noun used in prompts (e.g. "musical instrument")
    pub noun: String,
    /// Store file, relative to the data directory
    pub dataset_file: PathBuf,
    /// Candidate list file, relative to the data directory
    pub list_file: PathBuf,
    /// Number of names to ask for when brainstorming
    #[serde(default = "default_target_count")]
    pub target_count: usize,
    /// Sub-topics brainstormed as separate batches; empty means one batch
    #[serde(default)]
    pub focuses: Vec<String>,
}

fn default_target_count() -> usize {
    200
}

impl Category {
    pub fn new(name: &str, subject_key: &str, noun: &str, dataset_stem: &str) -> Self {
        Self {
            name: name.to_string(),
            subject_key: subject_key.to_string(),
            noun: noun.to_string(),
            dataset_file: PathBuf::from(format!("{dataset_stem}_openscad_dataset.json")),
            list_file: PathBuf::from(name).join("list.json"),
            target_count: default_target_count(),
            focuses: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_target_count(mut self, count: usize) -> Self {
        self.target_count = count;
        self
    }

    /// Keep the list file under `dir` instead of the directory named after
    /// the category
    #[must_use]
    pub fn with_list_dir(mut self, dir: &str) -> Self {
        self.list_file = PathBuf::from(dir).join("list.json");
        self
    }

    #[must_use]
    pub fn with_focuses(mut self, focuses: &[&str]) -> Self {
        self.focuses = focuses.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn dataset_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.dataset_file)
    }

    pub fn list_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.list_file)
    }

    /// Where `filter` writes the names it kept, next to the list file
    pub fn filtered_list_path(&self, data_dir: &Path) -> PathBuf {
        self.list_path(data_dir).with_file_name("filtered_list.json")
    }
}

/// Built-in registry. The first sixteen entries are the categories that make
/// up the combined dataset, in their published order.
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("animals", "animal", "animal", "animal").with_target_count(1000),
        Category::new("fruits", "fruit", "fruit", "fruit").with_target_count(1000),
        Category::new("buildings", "building", "building", "building")
            .with_list_dir("buildings_architecture"),
        Category::new(
            "household_items",
            "household_item",
            "household item",
            "household_item",
        )
        .with_list_dir("household_item"),
        Category::new(
            "musical_instruments",
            "musical_instrument",
            "musical instrument",
            "musical_instrument",
        ),
        Category::new("vehicles", "vehicle", "vehicle", "vehicle"),
        Category::new("food", "food_item", "food item", "food"),
        Category::new(
            "historical_artifacts",
            "historical_artifact",
            "historical artifact",
            "historical_artifact",
        ),
        Category::new(
            "mythical_creatures",
            "mythical_creature",
            "mythical creature",
            "mythical_creature",
        ),
        Category::new(
            "tech_electronics",
            "electronic_device",
            "electronic device",
            "electronic_device",
        ),
        Category::new("tools", "tool", "tool", "tool")
            .with_target_count(1000)
            .with_focuses(&[
                "hand tools",
                "power tools",
                "garden and outdoor tools",
                "kitchen utensils",
                "measuring and marking tools",
                "craft and specialty tools",
            ]),
        Category::new("pokemon", "pokemon", "pokemon", "pokemon").with_target_count(1000),
        Category::new("furniture", "furniture", "piece of furniture", "furniture")
            .with_target_count(100),
        Category::new("plants", "plant", "plant", "plant").with_target_count(100),
        Category::new(
            "mechanical_components",
            "mechanical_component",
            "mechanical component",
            "mechanical_component",
        )
        .with_target_count(100),
        Category::new("toys", "toy", "toy", "toy").with_target_count(100),
        Category::new("basic_shapes", "basic_shape", "basic shape", "basic_shape")
            .with_target_count(100),
        Category::new(
            "office_supplies",
            "office_supply",
            "office supply",
            "office_supply",
        )
        .with_target_count(100),
        Category::new(
            "kitchen_appliances",
            "kitchen_appliance",
            "kitchen appliance",
            "kitchen_appliance",
        )
        .with_target_count(100),
        Category::new(
            "sports_equipment",
            "sports_equipment",
            "piece of sports equipment",
            "sports_equipment",
        )
        .with_target_count(100),
        Category::new(
            "natural_objects",
            "natural_object",
            "natural object",
            "natural_object",
        )
        .with_target_count(100),
        Category::new(
            "decorative_art",
            "decorative_art",
            "decorative art piece",
            "decorative_art",
        )
        .with_target_count(100),
    ]
}
