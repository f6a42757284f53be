//! Output module for the CLI
//!
//! This module handles:
//! - Printing operation results as pretty JSON
//! - Rendering health and activity tables
//! - Writing markdown reports for parsed medical pages

mod markdown;
pub mod stats;

pub use markdown::{format_medical_report, write_medical_report};
pub use stats::{format_health, print_activity, print_health};

use serde::Serialize;

/// Prints any result as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
