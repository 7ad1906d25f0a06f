//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod draw;
mod runs;
mod snakes;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Mapbrush - paint shapes, fills and auto-connected tiles onto a tile map
#[derive(Parser)]
#[command(name = "mapbrush")]
#[command(about = "Mapbrush - paint shapes, fills and auto-connected tiles onto a tile map")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply a brush script to an empty map and print or save the result
    Draw {
        /// Script file: one JSON5 op object after another
        script: PathBuf,

        /// Write a PNG here instead of printing the map.
        /// A directory (ends with /) gives dir/{script}.png
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Config file (default: mapbrush.toml found from the working directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Snake definition file, overriding the config
        #[arg(long)]
        snakes: Option<PathBuf>,

        /// Scale PNG output by integer factor (1-16)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=16))]
        scale: Option<u8>,

        /// Number of tile ids snake definitions may use (1-255)
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..=255))]
        max_tiles: Option<u16>,

        /// Strict mode: treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Load a snake definition file and print the derived part tables
    Snakes {
        /// Definition file
        file: PathBuf,

        /// Print the tables as JSON
        #[arg(long)]
        json: bool,

        /// Number of tile ids definitions may use (1-255)
        #[arg(long, default_value = "255", value_parser = clap::value_parser!(u16).range(1..=255))]
        max_tiles: u16,
    },

    /// Print the runs a single shape rasterizes to, one per line
    Runs {
        /// Shape as JSON5, e.g. '{kind: "circle", centre: [0, 0], radius: 3}'
        shape: String,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Draw { script, output, config, snakes, scale, max_tiles, strict } => {
            draw::run_draw(
                &script,
                output.as_deref(),
                config.as_deref(),
                snakes.as_deref(),
                scale,
                max_tiles,
                strict,
            )
        }
        Commands::Snakes { file, json, max_tiles } => snakes::run_snakes(&file, json, max_tiles),
        Commands::Runs { shape } => runs::run_runs(&shape),
    }
}
