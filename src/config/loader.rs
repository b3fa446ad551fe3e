//! Configuration Loader
//!
//! Layers built-in defaults, an optional TOML file, and environment variables
//! into a validated [`DatasetConfig`].
//!
//! Environment variables use the `SCAD_DATASET_` prefix and `__` between
//! nested keys, e.g. `SCAD_DATASET_GENERATION__API_KEY` or
//! `SCAD_DATASET_VALIDATOR__FULL__TIMEOUT_MS`.

use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::DatasetConfig;
use crate::error::{DatasetError, DatasetResult};

const ENV_PREFIX: &str = "SCAD_DATASET";

/// Files probed, in order, when no explicit config path is given
const DEFAULT_CONFIG_FILES: [&str; 2] = ["./scad-dataset.toml", "./config/scad-dataset.toml"];

impl DatasetConfig {
    /// Load configuration from an explicit file, or the first default file found
    pub fn load(path: Option<&Path>) -> DatasetResult<Self> {
        let file = match path {
            Some(p) => {
                if !p.is_file() {
                    return Err(DatasetError::configuration(format!(
                        "config file {} does not exist",
                        p.display()
                    )));
                }
                Some(p.to_path_buf())
            }
            None => Self::find_config_file(),
        };

        let config = Self::load_layers(file.as_deref(), Some(ENV_PREFIX))?;

        debug!(
            config_file = ?file,
            config = %serde_json::to_string(&config.redacted())
                .unwrap_or_else(|_| "[serialization error]".to_string()),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Build the layered configuration. `env_prefix = None` skips the
    /// environment layer, which keeps tests independent of the process env.
    pub fn load_layers(file: Option<&Path>, env_prefix: Option<&str>) -> DatasetResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&DatasetConfig::default())?);

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        if let Some(prefix) = env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: DatasetConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn find_config_file() -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
    }

    /// JSON view of the configuration with credentials masked
    pub fn redacted(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        redact_recursive(&mut value);
        value
    }
}

fn redact_recursive(value: &mut serde_json::Value) {
    const SENSITIVE: [&str; 4] = ["key", "secret", "token", "password"];

    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                // subject_key names a JSON field, it is not a credential
                let sensitive = key_lower != "subject_key"
                    && SENSITIVE.iter().any(|p| key_lower.contains(p));
                match val {
                    serde_json::Value::String(s) if sensitive && !s.is_empty() => {
                        *val = serde_json::Value::String("***REDACTED***".to_string());
                    }
                    _ => redact_recursive(val),
                }
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(redact_recursive),
        _ => {}
    }
}
