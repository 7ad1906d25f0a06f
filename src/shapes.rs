//! Shape rasterization primitives for pixel-perfect tile painting.
//!
//! Each rasterizer converts a geometric shape into maximal rectangular runs
//! of grid cells and hands every run to a caller-supplied `write` closure.
//! Runs are produced on the fly and never collected, so painting a large
//! shape costs no intermediate allocation. Consecutive rows with the same
//! horizontal extent are merged into one rectangle.
//!
//! All arithmetic is integer (Bresenham decision parameters and
//! [`opp_to_adj`]) except the corner offsets of thick lines, which come from
//! the line's angle and are rounded half away from zero.
//!
//! # Examples
//!
//! ```
//! use mapbrush::geom::{MapArea, MapPoint};
//! use mapbrush::shapes::rasterize_rectangle;
//!
//! let mut runs = Vec::new();
//! rasterize_rectangle(MapPoint::new(5, 5), MapPoint::new(2, 2), |area| runs.push(*area));
//! assert_eq!(runs, vec![MapArea::from_points(MapPoint::new(2, 2), MapPoint::new(5, 5))]);
//! ```

use crate::geom::{clockwise, opp_to_adj, GridSize, MapArea, MapPoint};
use log::trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A brush shape, one variant per rasterizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    /// A single cell.
    Point { at: MapPoint },
    /// A filled rectangle between two opposite corners.
    Rect { a: MapPoint, b: MapPoint },
    /// A filled triangle.
    Triangle { a: MapPoint, b: MapPoint, c: MapPoint },
    /// A filled circle.
    Circle { centre: MapPoint, radius: i32 },
    /// A line; `thickness` 0 is one cell wide, otherwise the radius of the
    /// round-capped stroke.
    Line {
        from: MapPoint,
        to: MapPoint,
        #[serde(default)]
        thickness: i32,
    },
}

impl Shape {
    /// Emit the shape's runs to `write`.
    pub fn rasterize<F: FnMut(&MapArea)>(&self, write: F) {
        match *self {
            Shape::Point { at } => rasterize_point(at, write),
            Shape::Rect { a, b } => rasterize_rectangle(a, b, write),
            Shape::Triangle { a, b, c } => rasterize_triangle(a, b, c, write),
            Shape::Circle { centre, radius } => rasterize_circle(centre, radius, write),
            Shape::Line { from, to, thickness } => rasterize_line(from, to, thickness, write),
        }
    }

    /// Bounding box of every cell the shape can emit.
    pub fn bounds(&self) -> MapArea {
        let mut area = MapArea::INVALID;
        self.rasterize(|run| area.expand_area(run));
        area
    }
}

/// Merges runs that continue the previous one on the next or previous row
/// with the same horizontal extent.
struct RunMerger<'w, F: FnMut(&MapArea)> {
    pending: MapArea,
    write: &'w mut F,
}

impl<'w, F: FnMut(&MapArea)> RunMerger<'w, F> {
    fn new(write: &'w mut F) -> Self {
        Self { pending: MapArea::INVALID, write }
    }

    fn push_row(&mut self, y: i32, min_x: i32, max_x: i32) {
        let p = &mut self.pending;
        if p.is_valid() && p.min.x == min_x && p.max.x == max_x {
            if y == p.max.y + 1 {
                p.max.y = y;
                return;
            }
            if y == p.min.y - 1 {
                p.min.y = y;
                return;
            }
        }
        self.flush();
        self.pending = MapArea::row(y, min_x, max_x);
    }

    fn flush(&mut self) {
        if self.pending.is_valid() {
            (self.write)(&self.pending);
            self.pending = MapArea::INVALID;
        }
    }

    fn finish(mut self) {
        self.flush();
    }
}

/// Bresenham stepping from `start` to `end`, one cell per step of the
/// major axis.
///
/// Half-cell ties resolve toward whichever endpoint is nearer, so a line
/// and its reverse cover the same cells except at an exact midpoint tie.
#[derive(Debug, Clone)]
pub struct LineSteps {
    pos: MapPoint,
    major_step: MapPoint,
    minor_step: MapPoint,
    d_major: i64,
    d_minor: i64,
    error: i64,
    index: i64,
}

impl LineSteps {
    pub fn new(start: MapPoint, end: MapPoint) -> Self {
        let d = end - start;
        let step_x = MapPoint::new(d.x.signum(), 0);
        let step_y = MapPoint::new(0, d.y.signum());
        let (adx, ady) = (i64::from(d.x.abs()), i64::from(d.y.abs()));
        let (major_step, minor_step, d_major, d_minor) = if is_steep(start, end) {
            (step_y, step_x, ady, adx)
        } else {
            (step_x, step_y, adx, ady)
        };
        Self { pos: start, major_step, minor_step, d_major, d_minor, error: -d_major, index: 0 }
    }

    /// Unit step along the major axis (zero for a single-cell line).
    pub fn major_step(&self) -> MapPoint {
        self.major_step
    }

    /// Unit step along the minor axis.
    pub fn minor_step(&self) -> MapPoint {
        self.minor_step
    }
}

impl Iterator for LineSteps {
    type Item = MapPoint;

    fn next(&mut self) -> Option<MapPoint> {
        if self.index > self.d_major {
            return None;
        }
        let current = self.pos;
        self.index += 1;
        if self.index <= self.d_major {
            self.error += 2 * self.d_minor;
            let past_middle = 2 * self.index > self.d_major;
            if self.error > 0 || (self.error == 0 && past_middle) {
                self.pos += self.minor_step;
                self.error -= 2 * self.d_major;
            }
            self.pos += self.major_step;
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.d_major + 1 - self.index).max(0) as usize;
        (left, Some(left))
    }
}

/// True if the line from `start` to `end` moves further in y than in x.
pub fn is_steep(start: MapPoint, end: MapPoint) -> bool {
    let d = start.abs_diff(end);
    d.y > d.x
}

/// Tracks the horizontal extent of one triangle/quad edge row by row.
/// Rows must be requested in increasing order.
struct EdgeWalker {
    steps: std::iter::Peekable<LineSteps>,
}

impl EdgeWalker {
    fn new(a: MapPoint, b: MapPoint) -> Self {
        let (low, high) = if (a.y, a.x) <= (b.y, b.x) { (a, b) } else { (b, a) };
        Self { steps: LineSteps::new(low, high).peekable() }
    }

    fn row(&mut self, y: i32) -> Option<(i32, i32)> {
        while self.steps.next_if(|p| p.y < y).is_some() {}
        let mut extent: Option<(i32, i32)> = None;
        while let Some(p) = self.steps.next_if(|p| p.y == y) {
            extent = Some(match extent {
                Some((lo, hi)) => (lo.min(p.x), hi.max(p.x)),
                None => (p.x, p.x),
            });
        }
        extent
    }
}

fn hull(a: Option<(i32, i32)>, b: Option<(i32, i32)>) -> Option<(i32, i32)> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a.0.min(b.0), a.1.max(b.1))),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Emit a single cell.
pub fn rasterize_point<F: FnMut(&MapArea)>(at: MapPoint, mut write: F) {
    write(&MapArea::from_point(at));
}

/// Emit the rectangle spanned by two corners as a single run.
pub fn rasterize_rectangle<F: FnMut(&MapArea)>(a: MapPoint, b: MapPoint, mut write: F) {
    write(&MapArea::from_points(a, b));
}

/// Rasterize a filled triangle.
///
/// The vertices are sorted by row; the long edge runs from the lowest to the
/// highest vertex and the two short edges meet at the middle vertex. The
/// bottom part is scanned up to and including the middle vertex's row, the
/// top part above it (skipped for flat-topped triangles). Which side the long
/// edge lies on is decided by the turn direction of the vertices, not by
/// their x coordinates.
///
/// # Examples
///
/// ```
/// use mapbrush::geom::MapPoint;
/// use mapbrush::shapes::rasterize_triangle;
///
/// let mut cells = 0;
/// rasterize_triangle(
///     MapPoint::new(0, 0),
///     MapPoint::new(4, 0),
///     MapPoint::new(0, 4),
///     |area| cells += area.cell_count(),
/// );
/// assert_eq!(cells, 15);
/// ```
pub fn rasterize_triangle<F: FnMut(&MapArea)>(a: MapPoint, b: MapPoint, c: MapPoint, mut write: F) {
    let mut v = [a, b, c];
    v.sort_by_key(|p| (p.y, p.x));
    let [bottom, middle, top] = v;

    let long_on_left = clockwise(bottom, top, middle);
    let mut long = EdgeWalker::new(bottom, top);
    let mut lower = EdgeWalker::new(bottom, middle);
    let mut upper = EdgeWalker::new(middle, top);
    let mut runs = RunMerger::new(&mut write);

    let mut emit = |y: i32, long: Option<(i32, i32)>, short: Option<(i32, i32)>| {
        let (left, right) = if long_on_left { (long, short) } else { (short, long) };
        // Rounding may cross the edges by a cell on slivers
        let span = match (left, right) {
            (Some(l), Some(r)) => Some((l.0.min(r.0), r.1.max(l.1))),
            _ => hull(left, right),
        };
        if let Some((min_x, max_x)) = span {
            runs.push_row(y, min_x, max_x);
        }
    };

    for y in bottom.y..=middle.y {
        let mut short = lower.row(y);
        if y == middle.y {
            short = hull(short, upper.row(y));
        }
        emit(y, long.row(y), short);
    }
    if top.y > middle.y {
        for y in middle.y + 1..=top.y {
            emit(y, long.row(y), upper.row(y));
        }
    }
    runs.finish();
}

/// Rasterize a filled circle.
///
/// Half-widths come from [`opp_to_adj`] for each row offset. Bands of rows
/// with equal half-width are emitted once for the upper half and mirrored
/// for the lower half; the band containing the equator is emitted as a
/// single run, so the equator row is never written twice. The result is
/// exactly symmetric left/right and top/bottom.
///
/// # Examples
///
/// ```
/// use mapbrush::geom::{MapArea, MapPoint};
/// use mapbrush::shapes::rasterize_circle;
///
/// let mut runs = Vec::new();
/// rasterize_circle(MapPoint::new(10, 10), 0, |area| runs.push(*area));
/// assert_eq!(runs, vec![MapArea::from_point(MapPoint::new(10, 10))]);
/// ```
pub fn rasterize_circle<F: FnMut(&MapArea)>(centre: MapPoint, radius: i32, mut write: F) {
    debug_assert!(radius >= 0, "negative circle radius {}", radius);
    let radius = radius.max(0);
    let hyp_sq = i64::from(radius) * i64::from(radius);

    let mut emit_band = |first: i32, last: i32, half: i32| {
        if first == 0 {
            write(&MapArea::from_points(
                centre + MapPoint::new(-half, -last),
                centre + MapPoint::new(half, last),
            ));
        } else {
            let upper =
                MapArea::from_points(MapPoint::new(-half, first), MapPoint::new(half, last));
            write(&upper.translate(centre));
            write(&upper.reflect_y().translate(centre));
        }
    };

    let mut band_start = 0;
    let mut band_half = radius;
    for dy in 1..=radius + 1 {
        let half = if dy <= radius { opp_to_adj(dy, hyp_sq) } else { -1 };
        if half != band_half {
            emit_band(band_start, dy - 1, band_half);
            band_start = dy;
            band_half = half;
        }
    }
}

/// Rasterize a line.
///
/// With `thickness == 0` this is a Bresenham line, one cell per step,
/// emitted as runs of collinear cells: horizontal runs for shallow lines,
/// vertical runs for steep ones. With `thickness > 0` the line becomes a
/// stroke of that radius with round caps.
///
/// # Examples
///
/// ```
/// use mapbrush::geom::{MapArea, MapPoint};
/// use mapbrush::shapes::rasterize_line;
///
/// let mut runs = Vec::new();
/// rasterize_line(MapPoint::new(0, 0), MapPoint::new(4, 0), 0, |area| runs.push(*area));
/// assert_eq!(runs, vec![MapArea::row(0, 0, 4)]);
/// ```
pub fn rasterize_line<F: FnMut(&MapArea)>(
    start: MapPoint,
    end: MapPoint,
    thickness: i32,
    mut write: F,
) {
    debug_assert!(thickness >= 0, "negative line thickness {}", thickness);
    let steep = is_steep(start, end);
    if thickness <= 0 {
        if steep {
            thin_steep(start, end, &mut write);
        } else {
            thin_shallow(start, end, &mut write);
        }
    } else if steep {
        thick_steep(start, end, thickness, &mut write);
    } else {
        // Scan the transposed line so the scan lines cross the major axis
        let mut transposed = |area: &MapArea| write(&area.transpose());
        thick_steep(start.transpose(), end.transpose(), thickness, &mut transposed);
    }
}

fn thin_steep<F: FnMut(&MapArea)>(start: MapPoint, end: MapPoint, write: &mut F) {
    let (start, end) = if start.y <= end.y { (start, end) } else { (end, start) };
    let mut runs = RunMerger::new(write);
    for p in LineSteps::new(start, end) {
        runs.push_row(p.y, p.x, p.x);
    }
    runs.finish();
}

fn thin_shallow<F: FnMut(&MapArea)>(start: MapPoint, end: MapPoint, write: &mut F) {
    let (start, end) = if start.x <= end.x { (start, end) } else { (end, start) };
    let mut run = MapArea::INVALID;
    for p in LineSteps::new(start, end) {
        if run.is_valid() && run.min.y == p.y {
            run.max.x = p.x;
        } else {
            if run.is_valid() {
                write(&run);
            }
            run = MapArea::from_point(p);
        }
    }
    if run.is_valid() {
        write(&run);
    }
}

/// Round half away from zero. `f64::round` has exactly these semantics;
/// the named helper keeps the tie-breaking rule visible at call sites.
fn round_half_away(value: f64) -> i32 {
    value.round() as i32
}

/// Offset from a line endpoint to the corner of the stroke's straight edge:
/// perpendicular to `delta` (turned anticlockwise), `radius` long.
pub fn corner_offset(delta: MapPoint, radius: i32) -> MapPoint {
    if delta == MapPoint::ORIGIN {
        return MapPoint::ORIGIN;
    }
    let angle = f64::from(delta.y).atan2(f64::from(delta.x));
    let r = f64::from(radius);
    MapPoint::new(round_half_away(-r * angle.sin()), round_half_away(r * angle.cos()))
}

/// Round-capped thick line whose major axis is y. Each row's run is the hull
/// of the two cap discs and the band between the straight edges.
fn thick_steep<F: FnMut(&MapArea)>(start: MapPoint, end: MapPoint, radius: i32, write: &mut F) {
    let (start, end) = if start.y <= end.y { (start, end) } else { (end, start) };
    let hyp_sq = i64::from(radius) * i64::from(radius);
    let corner = corner_offset(end - start, radius);

    let mut edges: Vec<EdgeWalker> = if start == end {
        Vec::new()
    } else {
        vec![
            EdgeWalker::new(start + corner, end + corner),
            EdgeWalker::new(start - corner, end - corner),
            EdgeWalker::new(start + corner, start - corner),
            EdgeWalker::new(end + corner, end - corner),
        ]
    };

    let cap = |centre: MapPoint, y: i32| {
        let half = opp_to_adj(y - centre.y, hyp_sq);
        (half >= 0).then_some((centre.x - half, centre.x + half))
    };

    let mut runs = RunMerger::new(write);
    for y in start.y - radius..=end.y + radius {
        let mut span = hull(cap(start, y), cap(end, y));
        for edge in edges.iter_mut() {
            span = hull(span, edge.row(y));
        }
        if let Some((min_x, max_x)) = span {
            runs.push_row(y, min_x, max_x);
        }
    }
    runs.finish();
}

/// Read/write access for [`flood_fill`].
///
/// `write` must leave every written cell reading as something other than
/// the fill target, otherwise the fill never terminates.
pub trait Canvas {
    /// Current value of a cell.
    fn read(&self, pos: MapPoint) -> u8;
    /// Fill a run of cells.
    fn write(&mut self, area: &MapArea);
}

/// Error type for flood fill operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FloodFillError {
    /// The segment stack could not grow. Runs already written stay written.
    #[error("flood fill stack exhausted at {0} pending segments")]
    StackExhausted(usize),
}

/// A horizontal segment waiting to be scanned: the row `y + dy` is scanned
/// between `x1` and `x2` (inclusive) with `y` as its parent row.
#[derive(Debug, Clone, Copy)]
struct Segment {
    y: i32,
    x1: i32,
    x2: i32,
    dy: i32,
}

/// Scan-line seed fill with an explicit stack of segments.
///
/// A fill made with [`FloodFill::new`] is bounded by `bound`: no cell
/// outside it is read or written. Use [`GridSize::area`] to confine a fill
/// to the map. [`FloodFill::wrapping`] follows the region across the edges
/// of a wrapping canvas instead.
#[derive(Debug, Clone)]
pub struct FloodFill {
    target: u8,
    bound: MapArea,
    /// Longest run written on one row.
    max_run: Option<i32>,
    stack_limit: Option<usize>,
}

/// Far enough that no scan reaches it on a wrapping canvas.
const UNBOUNDED: MapArea = MapArea {
    min: MapPoint::new(i32::MIN / 2, i32::MIN / 2),
    max: MapPoint::new(i32::MAX / 2, i32::MAX / 2),
};

impl FloodFill {
    pub fn new(target: u8, bound: MapArea) -> Self {
        Self { target, bound, max_run: None, stack_limit: None }
    }

    /// Fill over a canvas whose reads and writes wrap at `size`.
    ///
    /// The region is followed across the edges with no bound. Runs are at
    /// most one grid wide, so a row that is all `target` is written once.
    /// The fill ends because written cells stop reading as `target`.
    pub fn wrapping(target: u8, size: GridSize) -> Self {
        Self {
            target,
            bound: UNBOUNDED,
            max_run: Some(size.width() as i32),
            stack_limit: None,
        }
    }

    /// Treat the stack as exhausted once it holds `limit` segments.
    pub fn with_stack_limit(mut self, limit: usize) -> Self {
        self.stack_limit = Some(limit);
        self
    }

    fn push(&self, stack: &mut Vec<Segment>, seg: Segment) -> Result<(), FloodFillError> {
        let next = seg.y + seg.dy;
        if next < self.bound.min.y || next > self.bound.max.y {
            return Ok(());
        }
        if self.stack_limit.is_some_and(|limit| stack.len() >= limit) {
            return Err(FloodFillError::StackExhausted(stack.len()));
        }
        stack.try_reserve(1).map_err(|_| FloodFillError::StackExhausted(stack.len()))?;
        stack.push(seg);
        Ok(())
    }

    /// Fill the 4-connected region of `target` cells containing `seed`.
    /// Returns the number of cells written.
    pub fn run<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        seed: MapPoint,
    ) -> Result<u64, FloodFillError> {
        if !self.bound.contains(seed) || canvas.read(seed) != self.target {
            return Ok(0);
        }
        let matches = |canvas: &C, x: i32, y: i32| canvas.read(MapPoint::new(x, y)) == self.target;

        let max_run = self.max_run.unwrap_or(i32::MAX);
        let mut stack = Vec::new();
        let mut written = 0u64;
        let mut peak = 0usize;
        self.push(&mut stack, Segment { y: seed.y, x1: seed.x, x2: seed.x, dy: 1 })?;
        self.push(&mut stack, Segment { y: seed.y + 1, x1: seed.x, x2: seed.x, dy: -1 })?;

        while let Some(seg) = stack.pop() {
            let y = seg.y + seg.dy;
            let mut x = seg.x1;
            let left_stop = seg.x1.saturating_sub(max_run);
            while x >= self.bound.min.x && x > left_stop && matches(&*canvas, x, y) {
                x -= 1;
            }

            let mut l;
            if x < seg.x1 {
                l = x + 1;
                if l < seg.x1 {
                    // Leak on the left: the run overhangs the parent segment
                    self.push(&mut stack, Segment { y, x1: l, x2: seg.x1 - 1, dy: -seg.dy })?;
                }
                x = seg.x1 + 1;
            } else {
                x = seg.x1 + 1;
                while x <= seg.x2 && !matches(&*canvas, x, y) {
                    x += 1;
                }
                if x > seg.x2 {
                    continue;
                }
                l = x;
            }

            loop {
                let right_stop = l.saturating_add(max_run);
                while x <= self.bound.max.x && x < right_stop && matches(&*canvas, x, y) {
                    x += 1;
                }
                let run = MapArea::row(y, l, x - 1);
                canvas.write(&run);
                written += run.cell_count();

                self.push(&mut stack, Segment { y, x1: l, x2: x - 1, dy: seg.dy })?;
                if x > seg.x2 + 1 {
                    // Leak on the right
                    self.push(&mut stack, Segment { y, x1: seg.x2 + 1, x2: x - 1, dy: -seg.dy })?;
                }

                x += 1;
                while x <= seg.x2 && !matches(&*canvas, x, y) {
                    x += 1;
                }
                if x > seg.x2 {
                    break;
                }
                l = x;
            }
            peak = peak.max(stack.len());
        }

        trace!("flood fill from {:?}: {} cells, peak stack {}", seed, written, peak);
        Ok(written)
    }
}

/// Flood fill the region of `target` cells around `seed` within `bound`.
///
/// Convenience wrapper for [`FloodFill::run`].
pub fn flood_fill<C: Canvas + ?Sized>(
    canvas: &mut C,
    target: u8,
    seed: MapPoint,
    bound: &MapArea,
) -> Result<u64, FloodFillError> {
    FloodFill::new(target, *bound).run(canvas, seed)
}
