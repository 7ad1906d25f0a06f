//! CLI dispatch for the `mapbrush draw` command.
//!
//! Loads config and snakes, applies the script, then prints or saves the map.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::ExitCode;

use log::debug;

use crate::brush::Brush;
use crate::config::{
    default_config, load_config_file, locate_config, merge_cli_overrides, project_root,
    resolve_path, CliOverrides, MapbrushConfig,
};
use crate::output::{generate_output_path, render_ascii, render_image, save_png, scale_image};
use crate::parser::parse_stream;
use crate::snakes::Snakes;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Load the config, resolving its snake file against the config's directory.
fn resolve_config(config_arg: Option<&Path>) -> Result<MapbrushConfig, String> {
    let Some(config_path) = locate_config(config_arg) else {
        debug!("no mapbrush.toml found, using defaults");
        return Ok(default_config());
    };

    let mut config = load_config_file(&config_path)
        .map_err(|e| format!("{}: {}", config_path.display(), e))?;
    if let (Some(root), Some(file)) = (project_root(&config_path), config.snakes.file.as_ref()) {
        config.snakes.file = Some(resolve_path(root, file));
    }
    Ok(config)
}

/// Print `warnings`, or in strict mode report them as errors.
/// Returns false if the command should stop.
fn report_warnings(warnings: &[String], strict: bool) -> bool {
    let label = if strict { "Error" } else { "Warning" };
    for warning in warnings {
        eprintln!("{}: {}", label, warning);
    }
    !(strict && !warnings.is_empty())
}

/// Execute the draw command.
pub fn run_draw(
    script: &Path,
    output: Option<&Path>,
    config_arg: Option<&Path>,
    snakes_arg: Option<&Path>,
    scale: Option<u8>,
    max_tiles: Option<u16>,
    strict: bool,
) -> ExitCode {
    let mut config = match resolve_config(config_arg) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let overrides = CliOverrides { snakes: snakes_arg.map(Path::to_path_buf), scale, max_tiles };
    merge_cli_overrides(&mut config, &overrides);

    let Some(size) = config.grid_size() else {
        eprintln!(
            "Error: grid {}x{} is not a power-of-two size",
            config.grid.width, config.grid.height
        );
        return ExitCode::from(EXIT_ERROR);
    };

    let snakes = match &config.snakes.file {
        Some(path) => match Snakes::load_file(path, config.snakes.max_tiles) {
            Ok(snakes) => snakes,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        },
        None => Snakes::default(),
    };

    let file = match File::open(script) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: Cannot open script '{}': {}", script.display(), e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    let parsed = parse_stream(BufReader::new(file));
    let parse_warnings: Vec<String> =
        parsed.warnings.iter().map(|w| format!("line {}: {}", w.line, w.message)).collect();
    if !report_warnings(&parse_warnings, strict) {
        return ExitCode::from(EXIT_ERROR);
    }

    let mut brush = match Brush::new(size, config.grid.background, snakes) {
        Ok(brush) => brush,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let op_warnings = match brush.apply_ops(&parsed.ops) {
        Ok(warnings) => warnings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let op_warnings: Vec<String> =
        op_warnings.iter().map(|w| format!("line {}: {}", w.line, w.message)).collect();
    if !report_warnings(&op_warnings, strict) {
        return ExitCode::from(EXIT_ERROR);
    }

    match output {
        Some(output) => {
            let image = render_image(brush.map(), &config.palette_colors());
            let image = scale_image(image, config.render.scale);
            let output_path = generate_output_path(script, output);
            if let Err(e) = save_png(&image, &output_path) {
                eprintln!("Error: Failed to save '{}': {}", output_path.display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
            println!("Saved: {}", output_path.display());
        }
        None => print!("{}", render_ascii(brush.map())),
    }

    let count = brush.selection().count();
    match brush.selection_mut().get_bounds() {
        Some(bounds) => println!(
            "Selection: {} cells in ({},{})-({},{})",
            count, bounds.min.x, bounds.min.y, bounds.max.x, bounds.max.y
        ),
        None => println!("Selection: empty"),
    }

    ExitCode::from(EXIT_SUCCESS)
}
