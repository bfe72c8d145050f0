//! CLI module
//!
//! Command-line interface over the catalog client.
//!
//! # Commands
//!
//! - `shows` - Page through the show index
//! - `search` - Search shows by name
//! - `episodes` - List the episodes of a show

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
