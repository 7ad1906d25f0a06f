//! CLI dispatch for the `mapbrush runs` command.

use std::process::ExitCode;

use crate::shapes::Shape;

use super::{EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the runs command.
pub fn run_runs(shape: &str) -> ExitCode {
    let shape: Shape = match json5::from_str(shape) {
        Ok(shape) => shape,
        Err(e) => {
            eprintln!("Error: Invalid shape: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    shape.rasterize(|area| {
        println!("({},{})-({},{})", area.min.x, area.min.y, area.max.x, area.max.y);
    });
    ExitCode::from(EXIT_SUCCESS)
}
