//! Mapbrush - shape rasterization and auto-tiling for tile-map editors
//!
//! This library provides functionality to:
//! - Rasterize points, rectangles, triangles, circles and thick lines into
//!   horizontal runs
//! - Flood fill regions of like tiles with a scan-line seed fill
//! - Draw auto-connecting "snake" strokes from tile definition files
//! - Track a selection bitset over a wrapping grid
//! - Apply JSON5 brush scripts and render the map as text or PNG

pub mod brush;
pub mod cli;
pub mod color;
pub mod config;
pub mod geom;
pub mod grid;
pub mod models;
pub mod output;
pub mod parser;
pub mod selection;
pub mod shapes;
pub mod snakes;
