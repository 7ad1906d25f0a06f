//! ASCII and PNG output for tile maps
//!
//! Both renderings put north (the highest row) at the top.

use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::color::tile_color;
use crate::geom::MapPoint;
use crate::grid::{TileMap, NO_TILE};

/// Error type for output operations
#[derive(Debug)]
pub enum OutputError {
    /// IO error during file operations
    Io(io::Error),
    /// Image encoding error
    Image(image::ImageError),
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::Io(e) => write!(f, "IO error: {}", e),
            OutputError::Image(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Io(e) => Some(e),
            OutputError::Image(e) => Some(e),
        }
    }
}

impl From<io::Error> for OutputError {
    fn from(e: io::Error) -> Self {
        OutputError::Io(e)
    }
}

impl From<image::ImageError> for OutputError {
    fn from(e: image::ImageError) -> Self {
        OutputError::Image(e)
    }
}

const TILE_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// One character per tile: `0-9a-zA-Z` for ids below 62, `#` above,
/// `.` for [`NO_TILE`].
pub fn tile_char(tile: u8) -> char {
    if tile == NO_TILE {
        return '.';
    }
    TILE_CHARS.get(usize::from(tile)).map_or('#', |&c| char::from(c))
}

/// Render the map as text, one line per row, north at the top.
pub fn render_ascii(map: &TileMap) -> String {
    let size = map.size();
    let mut out = String::with_capacity((size.width() as usize + 1) * size.height() as usize);
    for y in (0..size.height() as i32).rev() {
        out.extend(map.row(y).iter().map(|&t| tile_char(t)));
        out.push('\n');
    }
    out
}

/// Render the map one pixel per cell, north at the top.
///
/// Tiles in `palette` use that colour; others get [`tile_color`].
pub fn render_image(map: &TileMap, palette: &HashMap<u8, Rgba<u8>>) -> RgbaImage {
    let size = map.size();
    let height = size.height();
    RgbaImage::from_fn(size.width(), height, |x, y| {
        let tile = map.get(MapPoint::new(x as i32, (height - 1 - y) as i32));
        palette.get(&tile).copied().unwrap_or_else(|| tile_color(tile))
    })
}

/// Save an RGBA image to a PNG file, creating parent directories.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    image.save(path)?;
    Ok(())
}

/// Scale image by integer factor using nearest-neighbor interpolation.
///
/// Factors of 0 and 1 return the image unchanged.
pub fn scale_image(image: RgbaImage, factor: u8) -> RgbaImage {
    if factor <= 1 {
        return image;
    }
    let (w, h) = image.dimensions();
    let new_w = w * factor as u32;
    let new_h = h * factor as u32;
    image::imageops::resize(&image, new_w, new_h, FilterType::Nearest)
}

/// Where to write the image for `script`.
///
/// `-o dir/` (or an existing directory) gives `dir/{script}.png`; anything
/// else is used as the file name.
pub fn generate_output_path(script: &Path, output: &Path) -> PathBuf {
    let is_dir = output.as_os_str().to_string_lossy().ends_with('/') || output.is_dir();
    if is_dir {
        let stem = script.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
        output.join(format!("{}.png", stem))
    } else {
        output.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{GridSize, MapArea};

    fn small_map() -> TileMap {
        let mut map = TileMap::new(GridSize::new(4, 2).unwrap(), NO_TILE);
        map.set(MapPoint::new(0, 0), 1);
        map.set(MapPoint::new(3, 1), 40);
        map
    }

    #[test]
    fn test_tile_char() {
        assert_eq!(tile_char(0), '0');
        assert_eq!(tile_char(10), 'a');
        assert_eq!(tile_char(36), 'A');
        assert_eq!(tile_char(61), 'Z');
        assert_eq!(tile_char(62), '#');
        assert_eq!(tile_char(NO_TILE), '.');
    }

    #[test]
    fn test_render_ascii_north_up() {
        assert_eq!(render_ascii(&small_map()), "...E\n1...\n");
    }

    #[test]
    fn test_render_ascii_filled() {
        let mut map = TileMap::new(GridSize::new(2, 2).unwrap(), NO_TILE);
        map.fill_area(&MapArea::from_points(MapPoint::new(0, 0), MapPoint::new(1, 1)), 7);
        assert_eq!(render_ascii(&map), "77\n77\n");
    }

    #[test]
    fn test_render_image_palette_and_fallback() {
        let palette = HashMap::from([(1, Rgba([255, 0, 0, 255]))]);
        let image = render_image(&small_map(), &palette);
        assert_eq!(image.dimensions(), (4, 2));
        // Row 0 is the bottom of the image
        assert_eq!(*image.get_pixel(0, 1), Rgba([255, 0, 0, 255]));
        assert_eq!(*image.get_pixel(3, 0), tile_color(40));
        assert_eq!(*image.get_pixel(1, 1), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_generate_output_path_explicit_file() {
        let path = generate_output_path(Path::new("island.brush"), Path::new("out/map.png"));
        assert_eq!(path, PathBuf::from("out/map.png"));
    }

    #[test]
    fn test_generate_output_path_directory() {
        let path = generate_output_path(Path::new("maps/island.brush"), Path::new("build/"));
        assert_eq!(path, PathBuf::from("build/island.png"));
    }

    #[test]
    fn test_save_png_roundtrip() {
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dirs/map.png");
        let image = render_image(&small_map(), &HashMap::new());

        save_png(&image, &path).unwrap();
        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded, image);
    }

    #[test]
    fn test_scale_image_factor_one_returns_original() {
        let image = render_image(&small_map(), &HashMap::new());
        let scaled = scale_image(image.clone(), 1);
        assert_eq!(scaled, image);
        assert_eq!(scale_image(image.clone(), 0), image);
    }

    #[test]
    fn test_scale_image_factor_two() {
        let mut image = RgbaImage::new(2, 2);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(1, 1, Rgba([255, 255, 0, 255]));

        let scaled = scale_image(image, 2);
        assert_eq!(scaled.dimensions(), (4, 4));

        // Each original pixel becomes a 2x2 block
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert_eq!(*scaled.get_pixel(x, y), Rgba([255, 0, 0, 255]));
        }
        assert_eq!(*scaled.get_pixel(3, 3), Rgba([255, 255, 0, 255]));
        assert_eq!(*scaled.get_pixel(2, 0), Rgba([0, 0, 0, 0]));
    }
}
