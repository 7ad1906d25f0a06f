//! Data models for brush scripts

use serde::{Deserialize, Serialize};

use crate::geom::MapPoint;
use crate::selection::SelectMode;
use crate::shapes::Shape;

/// One step of a brush script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BrushOp {
    /// Paint a shape with one tile.
    Shape { shape: Shape, tile: u8 },
    /// Flood fill the region of like tiles around `seed`.
    Fill { seed: MapPoint, tile: u8 },
    /// Draw a connected snake stroke through `points`.
    Snake {
        snake: String,
        points: Vec<MapPoint>,
        #[serde(default)]
        inside: bool,
    },
    /// Change the selection with a shape.
    Select {
        #[serde(default)]
        mode: SelectMode,
        shape: Shape,
    },
    /// Change the selection with the region of like tiles around `seed`.
    SelectFill {
        seed: MapPoint,
        #[serde(default)]
        mode: SelectMode,
    },
    /// Set every selected cell to `tile`.
    Paint { tile: u8 },
}

impl BrushOp {
    /// Script name of the op.
    pub fn name(&self) -> &'static str {
        match self {
            BrushOp::Shape { .. } => "shape",
            BrushOp::Fill { .. } => "fill",
            BrushOp::Snake { .. } => "snake",
            BrushOp::Select { .. } => "select",
            BrushOp::SelectFill { .. } => "select_fill",
            BrushOp::Paint { .. } => "paint",
        }
    }
}

/// A warning message from parsing or applying a script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Warning {
    pub message: String,
    pub line: usize,
}

impl Warning {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self { message: message.into(), line }
    }
}
