//! Wrapping tile grid.
//!
//! [`TileMap`] is the reference consumer of rasterizer output: a dense,
//! row-major grid of tile ids that wraps at its power-of-two edges. It
//! implements [`TileAccess`] for the snake engine and, through
//! [`TilePainter`], the flood fill's [`Canvas`].

use crate::geom::{GridSize, MapArea, MapPoint};
use crate::shapes::Canvas;

/// Tile id meaning "no tile here".
pub const NO_TILE: u8 = u8::MAX;

/// Per-cell tile access used by the snake engine.
pub trait TileAccess {
    /// Tile at `pos`, or [`NO_TILE`].
    fn read_tile(&self, pos: MapPoint) -> u8;
    /// Replace the tile at `pos`.
    fn write_tile(&mut self, pos: MapPoint, tile: u8);
}

/// A wrapping grid of tile ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMap {
    size: GridSize,
    tiles: Vec<u8>,
}

impl TileMap {
    /// Create a grid with every cell set to `fill`.
    pub fn new(size: GridSize, fill: u8) -> Self {
        Self { size, tiles: vec![fill; size.cell_count()] }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn get(&self, p: MapPoint) -> u8 {
        self.tiles[self.size.index(p)]
    }

    pub fn set(&mut self, p: MapPoint, tile: u8) {
        let i = self.size.index(p);
        self.tiles[i] = tile;
    }

    /// Set every cell of `area` to `tile`, wrapping at the edges.
    pub fn fill_area(&mut self, area: &MapArea, tile: u8) {
        let size = self.size;
        let width = size.width() as usize;
        size.split_area(area, |part| {
            for y in part.min.y..=part.max.y {
                let row = y as usize * width;
                self.tiles[row + part.min.x as usize..=row + part.max.x as usize].fill(tile);
            }
        });
    }

    /// Change cells of `area` holding `from` to `to`. Returns how many changed.
    pub fn replace_area(&mut self, area: &MapArea, from: u8, to: u8) -> usize {
        let size = self.size;
        let width = size.width() as usize;
        let mut changed = 0;
        size.split_area(area, |part| {
            for y in part.min.y..=part.max.y {
                let row = y as usize * width;
                for tile in &mut self.tiles[row + part.min.x as usize..=row + part.max.x as usize] {
                    if *tile == from {
                        *tile = to;
                        changed += 1;
                    }
                }
            }
        });
        changed
    }

    /// One row of tiles (wrapped `y`).
    pub fn row(&self, y: i32) -> &[u8] {
        let width = self.size.width() as usize;
        let start = self.size.index(MapPoint::new(0, y));
        &self.tiles[start..start + width]
    }

    /// All tiles, row-major from row 0.
    pub fn tiles(&self) -> &[u8] {
        &self.tiles
    }

    /// Number of cells holding `tile`.
    pub fn count(&self, tile: u8) -> usize {
        self.tiles.iter().filter(|&&t| t == tile).count()
    }
}

impl TileAccess for TileMap {
    fn read_tile(&self, pos: MapPoint) -> u8 {
        self.get(pos)
    }

    fn write_tile(&mut self, pos: MapPoint, tile: u8) {
        self.set(pos, tile);
    }
}

/// Flood-fill canvas that paints a [`TileMap`] with one tile.
pub struct TilePainter<'a> {
    map: &'a mut TileMap,
    tile: u8,
}

impl<'a> TilePainter<'a> {
    pub fn new(map: &'a mut TileMap, tile: u8) -> Self {
        Self { map, tile }
    }
}

impl Canvas for TilePainter<'_> {
    fn read(&self, pos: MapPoint) -> u8 {
        self.map.get(pos)
    }

    fn write(&mut self, area: &MapArea) {
        self.map.fill_area(area, self.tile);
    }
}
