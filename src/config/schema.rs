//! Configuration schema types for `mapbrush.toml`
//!
//! Defines the structure and validation rules for mapbrush configuration.

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::color::parse_color;
use crate::geom::GridSize;
use crate::grid::NO_TILE;
use crate::snakes::MAX_TILES;

/// Grid dimensions and initial contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Width in cells (power of two)
    #[serde(default = "default_side")]
    pub width: u32,
    /// Height in cells (power of two)
    #[serde(default = "default_side")]
    pub height: u32,
    /// Tile every cell starts with; 255 means no tile
    #[serde(default = "default_background")]
    pub background: u8,
}

fn default_side() -> u32 {
    64
}

fn default_background() -> u8 {
    NO_TILE
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { width: default_side(), height: default_side(), background: default_background() }
    }
}

/// Snake definition source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnakesConfig {
    /// Definition file, relative to the config file
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Number of tile ids a definition may use
    #[serde(default = "default_max_tiles")]
    pub max_tiles: u16,
}

fn default_max_tiles() -> u16 {
    MAX_TILES
}

impl Default for SnakesConfig {
    fn default() -> Self {
        Self { file: None, max_tiles: default_max_tiles() }
    }
}

/// Image output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Integer upscale factor (1-16)
    #[serde(default = "default_scale")]
    pub scale: u8,
    /// Tile id to hex colour
    #[serde(default)]
    pub palette: HashMap<String, String>,
}

fn default_scale() -> u8 {
    1
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { scale: default_scale(), palette: HashMap::new() }
    }
}

/// Complete mapbrush.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapbrushConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub snakes: SnakesConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "render.palette.7")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mapbrush.toml: '{}' {}", self.field, self.message)
    }
}

impl MapbrushConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push =
            |field: String, message: String| errors.push(ConfigValidationError { field, message });

        for (field, side) in [("grid.width", self.grid.width), ("grid.height", self.grid.height)] {
            if !side.is_power_of_two() || side > GridSize::MAX_SIDE {
                push(
                    field.to_string(),
                    format!("must be a power of two no larger than {}", GridSize::MAX_SIDE),
                );
            }
        }

        if self.snakes.max_tiles == 0 || self.snakes.max_tiles > MAX_TILES {
            push("snakes.max_tiles".to_string(), format!("must be between 1 and {}", MAX_TILES));
        }

        if self.render.scale == 0 || self.render.scale > 16 {
            push("render.scale".to_string(), "must be between 1 and 16".to_string());
        }

        // Sorted so the error list is stable
        let mut keys: Vec<&String> = self.render.palette.keys().collect();
        keys.sort();
        for key in keys {
            let field = format!("render.palette.{}", key);
            if key.parse::<u8>().is_err() {
                push(field.clone(), "key must be a tile id from 0 to 255".to_string());
            }
            if let Err(e) = parse_color(&self.render.palette[key]) {
                push(field, e.to_string());
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Grid dimensions, if valid.
    pub fn grid_size(&self) -> Option<GridSize> {
        GridSize::new(self.grid.width, self.grid.height)
    }

    /// Parsed palette. Entries that fail validation are skipped.
    pub fn palette_colors(&self) -> HashMap<u8, Rgba<u8>> {
        self.render
            .palette
            .iter()
            .filter_map(|(key, value)| Some((key.parse().ok()?, parse_color(value).ok()?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_parse() {
        let config: MapbrushConfig = toml::from_str("").unwrap();
        assert_eq!(config, MapbrushConfig::default());
        assert_eq!(config.grid.width, 64);
        assert_eq!(config.grid.background, NO_TILE);
        assert_eq!(config.snakes.max_tiles, 255);
        assert_eq!(config.render.scale, 1);
        assert!(config.is_valid());
    }

    #[test]
    fn test_full_config_parse() {
        let toml_str = r##"
[grid]
width = 128
height = 32
background = 0

[snakes]
file = "tiles/snakes.txt"
max_tiles = 64

[render]
scale = 4
palette = { "0" = "#2E7D32", "1" = "#795548" }
"##;
        let config: MapbrushConfig = toml::from_str(toml_str).unwrap();
        assert!(config.is_valid(), "{:?}", config.validate());
        assert_eq!(config.grid_size(), GridSize::new(128, 32));
        assert_eq!(config.grid.background, 0);
        assert_eq!(config.snakes.file, Some(PathBuf::from("tiles/snakes.txt")));
        assert_eq!(config.snakes.max_tiles, 64);
        assert_eq!(config.render.scale, 4);
        let palette = config.palette_colors();
        assert_eq!(palette.get(&0), Some(&Rgba([0x2E, 0x7D, 0x32, 255])));
        assert_eq!(palette.len(), 2);
    }

    #[test]
    fn test_validation_grid_not_power_of_two() {
        let mut config = MapbrushConfig::default();
        config.grid.width = 100;
        config.grid.height = 0;
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "grid.width");
        assert_eq!(errors[1].field, "grid.height");
        assert!(config.grid_size().is_none());
    }

    #[test]
    fn test_validation_scale_and_max_tiles() {
        let mut config = MapbrushConfig::default();
        config.render.scale = 0;
        config.snakes.max_tiles = 300;
        let fields: Vec<String> = config.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["snakes.max_tiles", "render.scale"]);
    }

    #[test]
    fn test_validation_palette() {
        let mut config = MapbrushConfig::default();
        config.render.palette.insert("grass".to_string(), "#00FF00".to_string());
        config.render.palette.insert("3".to_string(), "green".to_string());
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "render.palette.3");
        assert_eq!(errors[1].field, "render.palette.grass");
        assert!(config.palette_colors().is_empty());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ConfigValidationError {
            field: "grid.width".to_string(),
            message: "must be a power of two".to_string(),
        };
        assert_eq!(err.to_string(), "mapbrush.toml: 'grid.width' must be a power of two");
    }
}
