//! Brush pipeline: applies script ops to a tile map and selection.
//!
//! A [`Brush`] owns everything an op can touch. Ops that do nothing come
//! back as warnings rather than errors.

use log::debug;
use thiserror::Error;

use crate::geom::{GridSize, MapArea, MapPoint};
use crate::grid::{TileMap, TilePainter};
use crate::models::{BrushOp, Warning};
use crate::parser::ParsedOp;
use crate::selection::{SelectMode, Selection, SelectionError};
use crate::shapes::{Canvas, FloodFill, FloodFillError};
use crate::snakes::{SnakeContext, Snakes};

/// Error type for brush operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BrushError {
    #[error(transparent)]
    Fill(#[from] FloodFillError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// An op failed; `line` is where it starts in the script.
    #[error("line {line}: {source}")]
    AtLine { line: usize, source: Box<BrushError> },
}

/// Tile map, selection and snake set that script ops work on.
#[derive(Debug, Clone)]
pub struct Brush {
    map: TileMap,
    selection: Selection,
    snakes: Snakes,
}

/// Fill canvas over the tile map that records its runs instead of painting.
/// Visited cells read as something other than the target.
struct RegionProbe<'a> {
    map: &'a TileMap,
    visited: Selection,
    target: u8,
    runs: Vec<MapArea>,
}

impl Canvas for RegionProbe<'_> {
    fn read(&self, pos: MapPoint) -> u8 {
        if self.visited.is_selected(pos) {
            self.target.wrapping_add(1)
        } else {
            self.map.get(pos)
        }
    }

    fn write(&mut self, area: &MapArea) {
        self.visited.select_area(area);
        self.runs.push(*area);
    }
}

impl Brush {
    /// A map of `size` filled with `background`, with nothing selected.
    pub fn new(size: GridSize, background: u8, snakes: Snakes) -> Result<Self, BrushError> {
        Ok(Self {
            map: TileMap::new(size, background),
            selection: Selection::new(size)?,
            snakes,
        })
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn snakes(&self) -> &Snakes {
        &self.snakes
    }

    /// Flood fill the region of like tiles around `seed` with `tile`.
    ///
    /// The region may join up across the wrapping edges.
    pub fn fill(&mut self, seed: MapPoint, tile: u8) -> Result<Vec<String>, BrushError> {
        let size = self.map.size();
        let seed = size.wrap_point(seed);
        let original = self.map.get(seed);
        if original == tile {
            return Ok(vec![format!(
                "fill at ({},{}) with tile {} is a no-op (already that tile)",
                seed.x, seed.y, tile
            )]);
        }

        let mut painter = TilePainter::new(&mut self.map, tile);
        let written = FloodFill::wrapping(original, size).run(&mut painter, seed)?;
        debug!("fill at {:?}: {} cells set to {}", seed, written, tile);
        Ok(Vec::new())
    }

    /// Apply `mode` to the region of like tiles around `seed`, bounded the
    /// same way as [`Brush::fill`].
    pub fn select_fill(
        &mut self,
        seed: MapPoint,
        mode: SelectMode,
    ) -> Result<Vec<String>, BrushError> {
        let size = self.map.size();
        let seed = size.wrap_point(seed);
        let mut probe = RegionProbe {
            map: &self.map,
            visited: Selection::new(size)?,
            target: self.map.get(seed),
            runs: Vec::new(),
        };
        FloodFill::wrapping(probe.target, size).run(&mut probe, seed)?;

        for run in &probe.runs {
            self.selection.apply_area(mode, run);
        }
        debug!(
            "select fill at {:?}: {} runs, {} cells",
            seed,
            probe.runs.len(),
            probe.visited.count()
        );
        Ok(Vec::new())
    }

    /// Draw a snake stroke through `points`.
    pub fn snake(&mut self, name: &str, points: &[MapPoint], inside: bool) -> Vec<String> {
        let Some(snake) = self.snakes.find(name) else {
            return vec![format!("unknown snake '{}', stroke skipped", name)];
        };
        let Some((&start, rest)) = points.split_first() else {
            return vec![format!("snake '{}' has no points, stroke skipped", name)];
        };

        let mut ctx = SnakeContext::begin_line(snake, start, inside, &mut self.map);
        for &point in rest {
            ctx.plot_line(point, &mut self.map);
        }
        Vec::new()
    }

    /// Set every selected cell to `tile`.
    pub fn paint(&mut self, tile: u8) -> Vec<String> {
        if self.selection.is_empty() {
            return vec![format!("paint with tile {} is a no-op (nothing selected)", tile)];
        }
        for p in self.selection.iter_selected() {
            self.map.set(p, tile);
        }
        Vec::new()
    }

    /// Apply one op. Returns warnings (if any).
    pub fn apply(&mut self, op: &BrushOp) -> Result<Vec<String>, BrushError> {
        match op {
            BrushOp::Shape { shape, tile } => {
                let map = &mut self.map;
                shape.rasterize(|area| map.fill_area(area, *tile));
                Ok(Vec::new())
            }
            BrushOp::Fill { seed, tile } => self.fill(*seed, *tile),
            BrushOp::Snake { snake, points, inside } => Ok(self.snake(snake, points, *inside)),
            BrushOp::Select { mode, shape } => {
                self.selection.apply_shape(*mode, shape);
                Ok(Vec::new())
            }
            BrushOp::SelectFill { seed, mode } => self.select_fill(*seed, *mode),
            BrushOp::Paint { tile } => Ok(self.paint(*tile)),
        }
    }

    /// Apply ops in order, stopping at the first error.
    pub fn apply_ops(&mut self, ops: &[ParsedOp]) -> Result<Vec<Warning>, BrushError> {
        let mut warnings = Vec::new();
        for parsed in ops {
            let messages = self
                .apply(&parsed.op)
                .map_err(|e| BrushError::AtLine { line: parsed.line, source: Box::new(e) })?;
            warnings.extend(messages.into_iter().map(|m| Warning::new(m, parsed.line)));
        }
        Ok(warnings)
    }

    /// Take the finished map.
    pub fn into_map(self) -> TileMap {
        self.map
    }
}
