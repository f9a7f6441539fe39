//! CLI commands.

pub mod generate;
pub mod local;
pub mod metrics;
pub mod providers;

use std::path::Path;

use crate::response::ErrorResponse;

/// Read a code or template file given on the command line.
fn read_input(path: &Path) -> Result<String, ErrorResponse> {
    std::fs::read_to_string(path).map_err(|e| {
        ErrorResponse::bad_input(format!("Failed to read {}", path.display()))
            .with_details(e.to_string())
    })
}
