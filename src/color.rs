//! Tile colours for image output
//!
//! Palette entries are hex strings: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
//! Tiles without a palette entry get a stable colour derived from their id.

use image::Rgba;
use thiserror::Error;

use crate::grid::NO_TILE;

/// Error type for color parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Input string doesn't start with '#'
    #[error("color must start with '#'")]
    MissingHash,
    /// Invalid length (must be 3, 4, 6, or 8 hex chars after #)
    #[error("invalid color length {0}, expected 3, 4, 6, or 8")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
}

/// Colour drawn for [`NO_TILE`] cells.
pub const EMPTY_COLOR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Parse a hex color string into an RGBA color.
///
/// # Examples
///
/// ```
/// use mapbrush::color::parse_color;
///
/// assert_eq!(parse_color("#F00").unwrap(), image::Rgba([255, 0, 0, 255]));
/// assert_eq!(parse_color("#00FF0080").unwrap(), image::Rgba([0, 255, 0, 128]));
/// ```
pub fn parse_color(s: &str) -> Result<Rgba<u8>, ColorError> {
    if s.is_empty() {
        return Err(ColorError::Empty);
    }
    let hex = s.strip_prefix('#').ok_or(ColorError::MissingHash)?;
    let digits = hex.chars().map(parse_hex_digit).collect::<Result<Vec<u8>, _>>()?;

    match digits.as_slice() {
        // Short forms double each digit
        &[r, g, b] => Ok(Rgba([r * 17, g * 17, b * 17, 255])),
        &[r, g, b, a] => Ok(Rgba([r * 17, g * 17, b * 17, a * 17])),
        &[r1, r0, g1, g0, b1, b0] => Ok(Rgba([r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0, 255])),
        &[r1, r0, g1, g0, b1, b0, a1, a0] => {
            Ok(Rgba([r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0, a1 * 16 + a0]))
        }
        _ => Err(ColorError::InvalidLength(digits.len())),
    }
}

/// Parse a single hex digit (0-9, A-F, a-f) to u8 (0-15)
fn parse_hex_digit(c: char) -> Result<u8, ColorError> {
    match c {
        '0'..='9' => Ok(c as u8 - b'0'),
        'a'..='f' => Ok(c as u8 - b'a' + 10),
        'A'..='F' => Ok(c as u8 - b'A' + 10),
        _ => Err(ColorError::InvalidHex(c)),
    }
}

/// Stable colour for a tile id with no palette entry.
///
/// Hues step by roughly the golden angle so neighbouring ids look distinct.
pub fn tile_color(tile: u8) -> Rgba<u8> {
    if tile == NO_TILE {
        return EMPTY_COLOR;
    }
    // Hue in 1/1536ths of a turn, six sectors of 256
    let hue = (u32::from(tile) * 587) % 1536;
    let sector = hue / 256;
    let f = (hue % 256) as u8;
    let (hi, lo) = (230u8, 60u8);
    let rise = lo + ((u16::from(hi - lo) * u16::from(f)) / 255) as u8;
    let fall = hi - (rise - lo);
    let [r, g, b] = match sector {
        0 => [hi, rise, lo],
        1 => [fall, hi, lo],
        2 => [lo, hi, rise],
        3 => [lo, fall, hi],
        4 => [rise, lo, hi],
        _ => [hi, lo, fall],
    };
    Rgba([r, g, b, 255])
}
