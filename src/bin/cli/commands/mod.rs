//! Command handlers for the scad-dataset CLI

pub mod brainstorm;
pub mod categories;
pub mod filter;
pub mod generate;
pub mod merge;

pub use brainstorm::handle_brainstorm_command;
pub use categories::handle_categories_command;
pub use filter::handle_filter_command;
pub use generate::handle_generate_command;
pub use merge::handle_merge_command;
