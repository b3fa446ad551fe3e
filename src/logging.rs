//! # Logging
//!
//! Environment-aware console logging on top of `tracing-subscriber`.
//!
//! The level is resolved in this order: `RUST_LOG`, then the CLI verbosity,
//! then the environment named by `SCAD_DATASET_ENV` (`production` logs at
//! info, everything else at debug). Initialization is idempotent.
//!
//! Set `SCAD_DATASET_LOG_FORMAT=json` for one JSON object per event instead
//! of the human-readable format.

use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install the global console subscriber. `verbosity` is the count of `-v`
/// flags; 0 defers to the environment default.
pub fn init_tracing(verbosity: u8) {
    TRACING_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = std::env::var("RUST_LOG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| {
                // dependency crates (hyper, reqwest) stay at warn
                format!("warn,scad_dataset={}", get_log_level(&environment, verbosity))
            });

        let use_ansi = std::io::stderr().is_terminal();
        let json = use_json_format();

        let console_layer = if json {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(EnvFilter::new(&filter))
                .boxed()
        } else {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .with_ansi(use_ansi)
                .with_filter(EnvFilter::new(&filter))
                .boxed()
        };

        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::debug!(
                environment = %environment,
                filter = %filter,
                ansi_colors = use_ansi && !json,
                json,
                "Console logging initialized"
            );
        }
    });
}

fn get_environment() -> String {
    std::env::var("SCAD_DATASET_ENV")
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase()
}

fn use_json_format() -> bool {
    std::env::var("SCAD_DATASET_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn get_log_level(environment: &str, verbosity: u8) -> String {
    match verbosity {
        0 => match environment {
            "production" => "info".to_string(),
            "test" => "warn".to_string(),
            _ => "debug".to_string(),
        },
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}
