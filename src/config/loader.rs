//! Configuration loading and discovery for `mapbrush.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::MapbrushConfig;
use log::debug;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for during discovery.
pub const CONFIG_FILE: &str = "mapbrush.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse mapbrush.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error(
        "Config validation failed:\n{}",
        .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n")
    )]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override the snake definition file
    pub snakes: Option<PathBuf>,
    /// Override scale factor
    pub scale: Option<u8>,
    /// Override the snake tile limit
    pub max_tiles: Option<u16>,
}

/// Find mapbrush.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for mapbrush.toml
/// 2. Check XDG_CONFIG_HOME/mapbrush/mapbrush.toml (or ~/.config/mapbrush/mapbrush.toml)
pub fn find_config() -> Option<PathBuf> {
    // First try walking up from current directory
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    // Fall back to XDG config
    find_xdg_config()
}

/// Find mapbrush.toml in XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("mapbrush").join(CONFIG_FILE);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find mapbrush.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        // Move to parent directory
        if !current.pop() {
            return None;
        }
    }
}

/// The config file to use: `path` if given, otherwise the discovered one.
pub fn locate_config(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    }
}

/// Load configuration from a mapbrush.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration.
pub fn load_config(path: Option<&Path>) -> Result<MapbrushConfig, ConfigError> {
    match locate_config(path) {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

/// Load and validate configuration from a specific file path.
pub fn load_config_file(path: &Path) -> Result<MapbrushConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: MapbrushConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    debug!("loaded config from {}", path.display());
    Ok(config)
}

/// Configuration used when no mapbrush.toml is found.
pub fn default_config() -> MapbrushConfig {
    MapbrushConfig::default()
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut MapbrushConfig, overrides: &CliOverrides) {
    if let Some(ref snakes) = overrides.snakes {
        config.snakes.file = Some(snakes.clone());
    }
    if let Some(scale) = overrides.scale {
        config.render.scale = scale;
    }
    if let Some(max_tiles) = overrides.max_tiles {
        config.snakes.max_tiles = max_tiles;
    }
}

/// Get the project root directory from a config file path.
///
/// Returns the parent directory of the mapbrush.toml file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &Path, contents: &[u8]) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(contents)
            .expect("should write config content");
        config_path
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), b"[grid]\nwidth = 32");

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), b"[grid]\nwidth = 32");

        let subdir = temp.path().join("maps").join("overworld");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, None);
    }

    #[test]
    #[serial]
    fn test_find_xdg_config() {
        let temp = TempDir::new().expect("should create temp dir");
        let dir = temp.path().join("mapbrush");
        fs::create_dir_all(&dir).expect("should create config dir");
        let config_path = write_config(&dir, b"");

        let saved = env::var_os("XDG_CONFIG_HOME");
        env::set_var("XDG_CONFIG_HOME", temp.path());
        let found = find_xdg_config();
        match saved {
            Some(value) => env::set_var("XDG_CONFIG_HOME", value),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }
        assert_eq!(found, Some(config_path));
    }

    #[test]
    #[serial]
    fn test_find_xdg_config_missing() {
        let temp = TempDir::new().expect("should create temp dir");
        let saved = env::var_os("XDG_CONFIG_HOME");
        env::set_var("XDG_CONFIG_HOME", temp.path());
        let found = find_xdg_config();
        match saved {
            Some(value) => env::set_var("XDG_CONFIG_HOME", value),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }
        assert_eq!(found, None);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(
            temp.path(),
            br##"
[grid]
width = 16
height = 16
background = 0

[snakes]
file = "snakes.txt"

[render]
scale = 3
palette = { "0" = "#000000" }
"##,
        );

        let config = load_config(Some(&config_path)).expect("should load valid config");
        assert_eq!(config.grid.width, 16);
        assert_eq!(config.grid.background, 0);
        assert_eq!(config.snakes.file, Some(PathBuf::from("snakes.txt")));
        assert_eq!(config.render.scale, 3);
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join("nonexistent.toml");

        // An explicit path must exist
        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), b"this is not valid toml {{{");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_wrong_type() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), b"[grid]\nwidth = \"wide\"");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(
            temp.path(),
            br#"
[grid]
width = 48

[render]
scale = 0
"#,
        );

        match load_config(Some(&config_path)) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(errors[0].contains("grid.width"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_locate_config_prefers_explicit_path() {
        let path = Path::new("/somewhere/custom.toml");
        assert_eq!(locate_config(Some(path)), Some(path.to_path_buf()));
    }

    #[test]
    fn test_merge_cli_overrides() {
        let mut config = default_config();
        let overrides = CliOverrides {
            snakes: Some(PathBuf::from("other.txt")),
            scale: Some(8),
            max_tiles: Some(32),
        };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.snakes.file, Some(PathBuf::from("other.txt")));
        assert_eq!(config.render.scale, 8);
        assert_eq!(config.snakes.max_tiles, 32);
    }

    #[test]
    fn test_merge_cli_overrides_empty_keeps_config() {
        let mut config = default_config();
        merge_cli_overrides(&mut config, &CliOverrides::default());
        assert_eq!(config, default_config());
    }

    #[test]
    fn test_resolve_path_absolute() {
        let root = Path::new("/project");
        let absolute = Path::new("/other/snakes.txt");
        assert_eq!(resolve_path(root, absolute), PathBuf::from("/other/snakes.txt"));
    }

    #[test]
    fn test_resolve_path_relative() {
        let root = Path::new("/project");
        let relative = Path::new("tiles/snakes.txt");
        assert_eq!(resolve_path(root, relative), PathBuf::from("/project/tiles/snakes.txt"));
    }

    #[test]
    fn test_project_root() {
        let config_path = Path::new("/project/mapbrush.toml");
        assert_eq!(project_root(config_path), Some(Path::new("/project")));
    }
}
