//! Mapbrush - Command-line tool for painting tile maps from brush scripts

use std::process::ExitCode;

use mapbrush::cli;

fn main() -> ExitCode {
    env_logger::Builder::from_default_env().target(env_logger::Target::Stderr).init();
    cli::run()
}
