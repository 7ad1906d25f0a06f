//! CLI dispatch for the `mapbrush snakes` command.

use std::path::Path;
use std::process::ExitCode;

use crate::snakes::{describe_code, SnakeError, Snakes, CODE_COUNT};

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the snakes command.
pub fn run_snakes(file: &Path, json: bool, max_tiles: u16) -> ExitCode {
    let snakes = match Snakes::load_file(file, max_tiles) {
        Ok(snakes) => snakes,
        Err(e @ SnakeError::IoError(..)) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
        Err(e) => {
            eprintln!("Error: {}: {}", file.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if json {
        match serde_json::to_string_pretty(&snakes) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
        return ExitCode::from(EXIT_SUCCESS);
    }

    for snake in snakes.iter() {
        println!("{} (exit quota {})", snake.name(), snake.exit_quota());
        for code in 0..CODE_COUNT as u8 {
            let defined = if snake.read_part(code).is_some() { "" } else { " *" };
            match snake.write_part(code) {
                Some(tile) => {
                    println!("  {:2} {} -> {}{}", code, describe_code(code), tile, defined)
                }
                None => println!("  {:2} {} -> none", code, describe_code(code)),
            }
        }
    }
    if snakes.is_empty() {
        eprintln!("Warning: no snakes defined in '{}'", file.display());
    }

    ExitCode::from(EXIT_SUCCESS)
}
