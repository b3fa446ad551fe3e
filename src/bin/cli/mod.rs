//! CLI module for the scad-dataset tool
//!
//! Command handlers live in [`commands`], one file per subcommand.

pub mod commands;

pub use commands::{
    handle_brainstorm_command, handle_categories_command, handle_filter_command,
    handle_generate_command, handle_merge_command,
};
