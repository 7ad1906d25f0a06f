//! Selection bitset over a wrapping grid.
//!
//! One bit per cell, plus a running count and a bounding box that may be
//! loose after deselection. [`Selection::get_bounds`] tightens the box on
//! demand with a full rescan.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geom::{GridSize, MapArea, MapPoint};
use crate::shapes::Shape;

/// Errors creating a selection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The bitset could not be allocated
    #[error("cannot allocate a {bytes}-byte selection for a {width}x{height} grid")]
    AllocationFailed { bytes: usize, width: u32, height: u32 },
}

/// How an area changes the selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectMode {
    #[default]
    Select,
    Deselect,
    Invert,
}

/// Set of selected cells on a grid of fixed size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    size: GridSize,
    bits: Vec<u8>,
    count: usize,
    /// Contains every selected cell; invalid when nothing is selected.
    max_bounds: MapArea,
    /// `max_bounds` is known to be the minimal box.
    bounds_tight: bool,
}

impl Selection {
    /// An empty selection covering `size`.
    pub fn new(size: GridSize) -> Result<Self, SelectionError> {
        let bytes = size.cell_count().div_ceil(8);
        let mut bits = Vec::new();
        bits.try_reserve_exact(bytes).map_err(|_| SelectionError::AllocationFailed {
            bytes,
            width: size.width(),
            height: size.height(),
        })?;
        bits.resize(bytes, 0);
        Ok(Self { size, bits, count: 0, max_bounds: MapArea::INVALID, bounds_tight: true })
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Number of selected cells.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// True if every cell is selected.
    pub fn is_all(&self) -> bool {
        self.count == self.size.cell_count()
    }

    pub fn is_selected(&self, p: MapPoint) -> bool {
        let i = self.size.index(p);
        self.bits[i >> 3] & (1 << (i & 7)) != 0
    }

    pub fn select_point(&mut self, p: MapPoint) {
        self.apply_point(SelectMode::Select, p);
    }

    pub fn deselect_point(&mut self, p: MapPoint) {
        self.apply_point(SelectMode::Deselect, p);
    }

    pub fn invert_point(&mut self, p: MapPoint) {
        self.apply_point(SelectMode::Invert, p);
    }

    pub fn select_area(&mut self, area: &MapArea) {
        self.apply_area(SelectMode::Select, area);
    }

    pub fn deselect_area(&mut self, area: &MapArea) {
        self.apply_area(SelectMode::Deselect, area);
    }

    pub fn invert_area(&mut self, area: &MapArea) {
        self.apply_area(SelectMode::Invert, area);
    }

    pub fn apply_point(&mut self, mode: SelectMode, p: MapPoint) {
        self.apply_area(mode, &MapArea::from_point(p));
    }

    /// Apply `mode` to every cell of `area`, wrapping at the grid edges.
    pub fn apply_area(&mut self, mode: SelectMode, area: &MapArea) {
        let size = self.size;
        size.split_area(area, |part| self.apply_part(mode, part));
        if self.count == 0 {
            self.max_bounds = MapArea::INVALID;
            self.bounds_tight = true;
        }
        self.debug_validate();
    }

    /// Rasterize `shape` straight into the selection.
    pub fn apply_shape(&mut self, mode: SelectMode, shape: &Shape) {
        shape.rasterize(|area| self.apply_area(mode, area));
    }

    /// `part` must lie inside the grid.
    fn apply_part(&mut self, mode: SelectMode, part: &MapArea) {
        let width = self.size.width() as usize;
        let mut changed = false;
        for y in part.min.y..=part.max.y {
            let row = y as usize * width;
            for x in part.min.x..=part.max.x {
                let i = row + x as usize;
                let mask = 1u8 << (i & 7);
                let byte = &mut self.bits[i >> 3];
                let was_set = *byte & mask != 0;
                match mode {
                    SelectMode::Select if !was_set => {
                        *byte |= mask;
                        self.count += 1;
                    }
                    SelectMode::Deselect if was_set => {
                        *byte &= !mask;
                        self.count -= 1;
                        changed = true;
                    }
                    SelectMode::Invert => {
                        *byte ^= mask;
                        if was_set {
                            self.count -= 1;
                        } else {
                            self.count += 1;
                        }
                        changed = true;
                    }
                    _ => {}
                }
            }
        }

        match mode {
            // A fully selected box joined to a tight box stays tight
            SelectMode::Select => self.max_bounds.expand_area(part),
            SelectMode::Deselect => self.bounds_tight &= !changed,
            SelectMode::Invert => {
                self.max_bounds.expand_area(part);
                self.bounds_tight &= !changed;
            }
        }
    }

    /// Select every cell.
    pub fn select_all(&mut self) {
        self.bits.fill(u8::MAX);
        let tail = self.size.cell_count() % 8;
        if tail != 0 {
            if let Some(last) = self.bits.last_mut() {
                *last = (1u8 << tail) - 1;
            }
        }
        self.count = self.size.cell_count();
        self.max_bounds = self.size.area();
        self.bounds_tight = true;
        self.debug_validate();
    }

    /// Deselect every cell.
    pub fn clear(&mut self) {
        self.bits.fill(0);
        self.count = 0;
        self.max_bounds = MapArea::INVALID;
        self.bounds_tight = true;
    }

    /// Minimal box around the selected cells, or `None` if nothing is
    /// selected. A loose cached box is tightened by rescanning.
    pub fn get_bounds(&mut self) -> Option<MapArea> {
        if self.count == 0 {
            return None;
        }
        if self.is_all() {
            self.max_bounds = self.size.area();
            self.bounds_tight = true;
        }
        if !self.bounds_tight {
            self.max_bounds = self.iter_selected().fold(MapArea::INVALID, |mut area, p| {
                area.expand_point(p);
                area
            });
            self.bounds_tight = true;
        }
        Some(self.max_bounds)
    }

    /// Selected cells in row-major order.
    pub fn iter_selected(&self) -> impl Iterator<Item = MapPoint> + '_ {
        let size = self.size;
        self.bits.iter().enumerate().filter(|(_, &byte)| byte != 0).flat_map(move |(i, &byte)| {
            (0..8)
                .filter(move |bit| byte & (1 << bit) != 0)
                .map(move |bit| size.point_at(i * 8 + bit))
        })
    }

    /// Recount the bits and check that the cached box holds every selected
    /// cell.
    pub fn check_invariants(&self) -> bool {
        let counted: usize = self.bits.iter().map(|b| b.count_ones() as usize).sum();
        if counted != self.count {
            return false;
        }
        if self.count == 0 {
            return !self.max_bounds.is_valid();
        }
        self.iter_selected().all(|p| self.max_bounds.contains(p))
    }

    fn debug_validate(&self) {
        debug_assert!(
            self.check_invariants(),
            "selection invariants broken: count {}, bounds {:?}",
            self.count,
            self.max_bounds
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn p(x: i32, y: i32) -> MapPoint {
        MapPoint::new(x, y)
    }

    fn area(x0: i32, y0: i32, x1: i32, y1: i32) -> MapArea {
        MapArea::from_points(p(x0, y0), p(x1, y1))
    }

    fn selection(w: u32, h: u32) -> Selection {
        Selection::new(GridSize::new(w, h).unwrap()).unwrap()
    }

    #[test]
    fn test_new_is_empty() {
        let mut sel = selection(16, 8);
        assert!(sel.is_empty());
        assert!(!sel.is_all());
        assert_eq!(sel.get_bounds(), None);
        assert!(sel.check_invariants());
    }

    #[test]
    fn test_point_ops() {
        let mut sel = selection(8, 8);
        sel.select_point(p(2, 3));
        sel.select_point(p(2, 3));
        assert_eq!(sel.count(), 1);
        assert!(sel.is_selected(p(2, 3)));
        assert!(sel.is_selected(p(10, 11)));
        sel.invert_point(p(2, 3));
        assert!(sel.is_empty());
        sel.invert_point(p(-1, 0));
        assert!(sel.is_selected(p(7, 0)));
        sel.deselect_point(p(7, 0));
        assert!(sel.is_empty());
        assert_eq!(sel.get_bounds(), None);
    }

    #[test]
    fn test_select_area_bounds_are_tight() {
        let mut sel = selection(16, 16);
        sel.select_area(&area(2, 2, 5, 5));
        sel.select_area(&area(8, 1, 9, 3));
        assert_eq!(sel.count(), 16 + 6);
        assert_eq!(sel.get_bounds(), Some(area(2, 1, 9, 5)));
    }

    #[test]
    fn test_deselect_tightens_on_demand() {
        let mut sel = selection(16, 16);
        sel.select_area(&area(0, 0, 9, 9));
        sel.deselect_area(&area(5, 0, 9, 9));
        assert_eq!(sel.count(), 50);
        assert_eq!(sel.get_bounds(), Some(area(0, 0, 4, 9)));
    }

    #[test]
    fn test_invert_area() {
        let mut sel = selection(8, 8);
        sel.select_area(&area(0, 0, 3, 3));
        sel.invert_area(&area(2, 2, 5, 5));
        // 16 + 16 - 2 * 4 overlapping cells
        assert_eq!(sel.count(), 24);
        assert!(!sel.is_selected(p(2, 2)));
        assert!(sel.is_selected(p(5, 5)));
        assert_eq!(sel.get_bounds(), Some(area(0, 0, 5, 5)));
    }

    #[test]
    fn test_area_wraps() {
        let mut sel = selection(8, 8);
        sel.select_area(&area(6, 6, 9, 9));
        assert_eq!(sel.count(), 16);
        assert!(sel.is_selected(p(0, 0)));
        assert!(sel.is_selected(p(7, 7)));
        assert_eq!(sel.get_bounds(), Some(area(0, 0, 7, 7)));
    }

    #[test]
    fn test_oversized_area_selects_each_cell_once() {
        let mut sel = selection(4, 4);
        sel.invert_area(&area(-10, -10, 10, 10));
        assert!(sel.is_all());
    }

    #[test]
    fn test_select_all_and_clear() {
        let mut sel = selection(2, 2);
        sel.select_all();
        assert!(sel.is_all());
        assert_eq!(sel.count(), 4);
        assert_eq!(sel.iter_selected().count(), 4);
        assert_eq!(sel.get_bounds(), Some(area(0, 0, 1, 1)));
        sel.clear();
        assert!(sel.is_empty());
        assert!(sel.check_invariants());
    }

    #[test]
    fn test_all_after_deselect_and_reselect() {
        let mut sel = selection(8, 8);
        sel.select_all();
        sel.deselect_point(p(3, 3));
        assert!(!sel.is_all());
        sel.select_point(p(3, 3));
        assert!(sel.is_all());
        assert_eq!(sel.get_bounds(), Some(area(0, 0, 7, 7)));
    }

    #[test]
    fn test_apply_shape() {
        let mut sel = selection(16, 16);
        sel.apply_shape(SelectMode::Select, &Shape::Circle { centre: p(8, 8), radius: 1 });
        assert_eq!(sel.count(), 5);
        sel.apply_shape(SelectMode::Deselect, &Shape::Point { at: p(8, 8) });
        assert_eq!(sel.count(), 4);
        assert_eq!(sel.get_bounds(), Some(area(7, 7, 9, 9)));
    }

    #[test]
    fn test_iter_selected_row_major() {
        let mut sel = selection(4, 4);
        sel.select_point(p(3, 2));
        sel.select_point(p(1, 0));
        sel.select_point(p(0, 2));
        let cells: Vec<MapPoint> = sel.iter_selected().collect();
        assert_eq!(cells, vec![p(1, 0), p(0, 2), p(3, 2)]);
    }

    #[test]
    fn test_select_mode_serde() {
        let mode: SelectMode = serde_json::from_str("\"invert\"").unwrap();
        assert_eq!(mode, SelectMode::Invert);
        assert_eq!(SelectMode::default(), SelectMode::Select);
    }

    /// Random operation sequences against a plain boolean model.
    #[test]
    fn test_random_ops_match_model() {
        let size = GridSize::new(32, 16).unwrap();
        let mut rng = StdRng::seed_from_u64(0x5e1ec7);
        for _ in 0..20 {
            let mut sel = Selection::new(size).unwrap();
            let mut model = vec![false; size.cell_count()];
            for _ in 0..40 {
                let a = p(rng.gen_range(-40..40), rng.gen_range(-20..20));
                let b = a + p(rng.gen_range(0..12), rng.gen_range(0..12));
                let region = MapArea::from_points(a, b);
                let mode = match rng.gen_range(0..3) {
                    0 => SelectMode::Select,
                    1 => SelectMode::Deselect,
                    _ => SelectMode::Invert,
                };
                sel.apply_area(mode, &region);
                for cell in region.cells() {
                    let slot = &mut model[size.index(cell)];
                    *slot = match mode {
                        SelectMode::Select => true,
                        SelectMode::Deselect => false,
                        SelectMode::Invert => !*slot,
                    };
                }

                assert!(sel.check_invariants());
                assert_eq!(sel.count(), model.iter().filter(|&&s| s).count());
                let expected = model
                    .iter()
                    .enumerate()
                    .filter(|(_, &s)| s)
                    .fold(MapArea::INVALID, |mut bounds, (i, _)| {
                        bounds.expand_point(size.point_at(i));
                        bounds
                    });
                let bounds = sel.get_bounds();
                assert_eq!(bounds.is_some(), expected.is_valid());
                if let Some(bounds) = bounds {
                    assert_eq!(bounds, expected);
                }
            }
        }
    }

    #[test]
    fn test_random_shapes_stay_consistent() {
        let size = GridSize::new(16, 16).unwrap();
        let mut sel = Selection::new(size).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let a = p(rng.gen_range(-8..24), rng.gen_range(-8..24));
            let b = p(rng.gen_range(-8..24), rng.gen_range(-8..24));
            let shape = match rng.gen_range(0..3) {
                0 => Shape::Line { from: a, to: b, thickness: rng.gen_range(0..3) },
                1 => Shape::Circle { centre: a, radius: rng.gen_range(0..6) },
                _ => Shape::Rect { a, b },
            };
            sel.apply_shape(SelectMode::Invert, &shape);
            assert!(sel.check_invariants());
        }
    }
}
