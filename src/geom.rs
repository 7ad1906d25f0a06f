//! Integer map geometry.
//!
//! Points and inclusive areas on the tile grid, plus the power-of-two
//! [`GridSize`] that wraps coordinates. Everything here is plain value
//! arithmetic: no allocation and no failure modes.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub};

/// A cell coordinate on the map grid.
///
/// Coordinates are unwrapped; a [`GridSize`] maps them onto the grid.
/// Serializes as a two-element array `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct MapPoint {
    pub x: i32,
    pub y: i32,
}

impl MapPoint {
    pub const ORIGIN: MapPoint = MapPoint { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Component-wise absolute difference.
    pub fn abs_diff(self, other: MapPoint) -> MapPoint {
        MapPoint::new((self.x - other.x).abs(), (self.y - other.y).abs())
    }

    /// Mirror about the x axis (negates `y`).
    pub fn reflect_y(self) -> MapPoint {
        MapPoint::new(self.x, -self.y)
    }

    /// Swap the axes.
    pub fn transpose(self) -> MapPoint {
        MapPoint::new(self.y, self.x)
    }
}

impl From<[i32; 2]> for MapPoint {
    fn from([x, y]: [i32; 2]) -> Self {
        MapPoint::new(x, y)
    }
}

impl From<MapPoint> for [i32; 2] {
    fn from(p: MapPoint) -> Self {
        [p.x, p.y]
    }
}

impl Add for MapPoint {
    type Output = MapPoint;

    fn add(self, rhs: MapPoint) -> MapPoint {
        MapPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for MapPoint {
    fn add_assign(&mut self, rhs: MapPoint) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for MapPoint {
    type Output = MapPoint;

    fn sub(self, rhs: MapPoint) -> MapPoint {
        MapPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for MapPoint {
    type Output = MapPoint;

    fn neg(self) -> MapPoint {
        MapPoint::new(-self.x, -self.y)
    }
}

/// Z component of the cross product of `b - a` and `c - a`.
pub fn cross(a: MapPoint, b: MapPoint, c: MapPoint) -> i64 {
    let ab = (i64::from(b.x - a.x), i64::from(b.y - a.y));
    let ac = (i64::from(c.x - a.x), i64::from(c.y - a.y));
    ab.0 * ac.1 - ab.1 * ac.0
}

/// True if `a`, `b`, `c` turn clockwise (with `y` pointing north).
pub fn clockwise(a: MapPoint, b: MapPoint, c: MapPoint) -> bool {
    cross(a, b, c) < 0
}

/// Integer square root: the largest `r` with `r * r <= n`.
pub fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x >> 1) + (x & 1);
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Length of the adjacent side of a right triangle with the given opposite
/// side and squared hypotenuse, rounded down.
///
/// Returns the largest `adj >= 0` with `adj² + opp² <= hyp²`, or `-1` if
/// `opp` is already longer than the hypotenuse. Circles and round line caps
/// use this for their half-widths so that they stay pixel-exact and
/// symmetric.
pub fn opp_to_adj(opposite: i32, hypotenuse_squared: i64) -> i32 {
    let opp = i64::from(opposite);
    let remainder = hypotenuse_squared - opp * opp;
    if remainder < 0 {
        return -1;
    }
    isqrt(remainder as u64) as i32
}

/// An axis-aligned rectangle of cells, inclusive at both ends.
///
/// An area with `min > max` on either axis is empty; [`MapArea::INVALID`]
/// is the canonical empty value and the identity for [`expand_point`].
///
/// [`expand_point`]: MapArea::expand_point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapArea {
    pub min: MapPoint,
    pub max: MapPoint,
}

impl Default for MapArea {
    fn default() -> Self {
        MapArea::INVALID
    }
}

impl MapArea {
    pub const INVALID: MapArea = MapArea {
        min: MapPoint::new(i32::MAX, i32::MAX),
        max: MapPoint::new(i32::MIN, i32::MIN),
    };

    /// Area spanned by two corners in any order.
    pub fn from_points(a: MapPoint, b: MapPoint) -> Self {
        MapArea {
            min: MapPoint::new(a.x.min(b.x), a.y.min(b.y)),
            max: MapPoint::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Single-cell area.
    pub fn from_point(p: MapPoint) -> Self {
        MapArea { min: p, max: p }
    }

    /// One row of cells from `min_x` to `max_x`.
    pub fn row(y: i32, min_x: i32, max_x: i32) -> Self {
        MapArea { min: MapPoint::new(min_x, y), max: MapPoint::new(max_x, y) }
    }

    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    pub fn contains(&self, p: MapPoint) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn contains_area(&self, other: &MapArea) -> bool {
        !other.is_valid() || (self.contains(other.min) && self.contains(other.max))
    }

    pub fn overlaps(&self, other: &MapArea) -> bool {
        self.intersect(other).is_valid()
    }

    /// Grow to include `p`.
    pub fn expand_point(&mut self, p: MapPoint) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// Grow to include `other`. Empty areas are ignored.
    pub fn expand_area(&mut self, other: &MapArea) {
        if other.is_valid() {
            self.expand_point(other.min);
            self.expand_point(other.max);
        }
    }

    /// Overlap of two areas, or [`MapArea::INVALID`] if they are disjoint.
    pub fn intersect(&self, other: &MapArea) -> MapArea {
        let area = MapArea {
            min: MapPoint::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y)),
            max: MapPoint::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y)),
        };
        if area.is_valid() {
            area
        } else {
            MapArea::INVALID
        }
    }

    pub fn translate(&self, offset: MapPoint) -> MapArea {
        MapArea { min: self.min + offset, max: self.max + offset }
    }

    /// Mirror about the x axis, keeping `min <= max`.
    pub fn reflect_y(&self) -> MapArea {
        MapArea::from_points(self.min.reflect_y(), self.max.reflect_y())
    }

    /// Swap the axes.
    pub fn transpose(&self) -> MapArea {
        MapArea { min: self.min.transpose(), max: self.max.transpose() }
    }

    /// Number of columns (0 if empty).
    pub fn width(&self) -> i32 {
        if self.is_valid() {
            self.max.x - self.min.x + 1
        } else {
            0
        }
    }

    /// Number of rows (0 if empty).
    pub fn height(&self) -> i32 {
        if self.is_valid() {
            self.max.y - self.min.y + 1
        } else {
            0
        }
    }

    pub fn cell_count(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Iterate over every cell, row by row.
    pub fn cells(&self) -> impl Iterator<Item = MapPoint> {
        let area = *self;
        let rows = if area.is_valid() { area.min.y..=area.max.y } else { 1..=0 };
        rows.flat_map(move |y| (area.min.x..=area.max.x).map(move |x| MapPoint::new(x, y)))
    }
}

/// Dimensions of a wrapping grid. Both sides are powers of two so that
/// wrapping is a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSize {
    width: u32,
    height: u32,
}

impl GridSize {
    /// Largest supported side length.
    pub const MAX_SIDE: u32 = 1 << 14;

    /// Returns `None` unless both sides are powers of two no larger than
    /// [`GridSize::MAX_SIDE`].
    pub fn new(width: u32, height: u32) -> Option<Self> {
        let valid = |side: u32| side.is_power_of_two() && side <= Self::MAX_SIDE;
        (valid(width) && valid(height)).then_some(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The whole grid as an area anchored at the origin.
    pub fn area(&self) -> MapArea {
        MapArea::from_points(
            MapPoint::ORIGIN,
            MapPoint::new(self.width as i32 - 1, self.height as i32 - 1),
        )
    }

    pub fn wrap_point(&self, p: MapPoint) -> MapPoint {
        MapPoint::new(p.x & (self.width as i32 - 1), p.y & (self.height as i32 - 1))
    }

    /// Row-major index of the wrapped cell.
    pub fn index(&self, p: MapPoint) -> usize {
        let p = self.wrap_point(p);
        p.y as usize * self.width as usize + p.x as usize
    }

    /// Inverse of [`GridSize::index`].
    pub fn point_at(&self, index: usize) -> MapPoint {
        let w = self.width as usize;
        MapPoint::new((index % w) as i32, (index / w) as i32)
    }

    /// True if `p` lies inside the grid without wrapping.
    pub fn contains(&self, p: MapPoint) -> bool {
        self.area().contains(p)
    }

    /// Split an unwrapped area into at most four areas that lie inside the
    /// grid, calling `f` for each. An area wider or taller than the grid is
    /// clamped to one grid's worth so no cell is visited twice.
    pub fn split_area<F: FnMut(&MapArea)>(&self, area: &MapArea, mut f: F) {
        if !area.is_valid() {
            return;
        }
        let xs = wrap_span(area.min.x, area.width(), self.width as i32);
        let ys = wrap_span(area.min.y, area.height(), self.height as i32);
        for &(min_y, max_y) in ys.iter().flatten() {
            for &(min_x, max_x) in xs.iter().flatten() {
                f(&MapArea {
                    min: MapPoint::new(min_x, min_y),
                    max: MapPoint::new(max_x, max_y),
                });
            }
        }
    }
}

/// Wrap a run of `len` cells starting at `start` onto `0..side`, as up to
/// two inclusive ranges.
fn wrap_span(start: i32, len: i32, side: i32) -> [Option<(i32, i32)>; 2] {
    if len >= side {
        return [Some((0, side - 1)), None];
    }
    let first = start & (side - 1);
    let last = first + len - 1;
    if last < side {
        [Some((first, last)), None]
    } else {
        [Some((first, side - 1)), Some((0, last - side))]
    }
}
