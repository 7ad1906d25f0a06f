//! Snake tile sets and connectivity-aware line plotting.
//!
//! A snake is a family of tile variants keyed by a 5-bit code: one bit per
//! exit direction plus an inside/outside bit. Definitions are loaded from a
//! small text format:
//!
//! ```text
//! # comment
//! StartSnake 'river'
//! 12:1,0,1,0,0
//! 13:0,1,0,1,0
//! EndSnake
//! ```
//!
//! Each part line is `tile:N,E,S,W,Inside`. Codes a definition leaves
//! undefined are filled once at load time by [`fill_missing_snake_parts`],
//! so plotting never meets a hole.
//!
//! Plotting goes through [`SnakeContext`]: [`SnakeContext::begin_line`]
//! places the first cell, then each [`SnakeContext::plot_line`] walks a
//! 4-connected line to the next point, choosing the variant for every cell
//! from the stroke direction and the matching neighbours already on the grid.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, trace, warn};
use serde::Serialize;
use thiserror::Error;

use crate::geom::MapPoint;
use crate::grid::{TileAccess, NO_TILE};
use crate::shapes::LineSteps;

pub const NORTH: u8 = 1;
pub const EAST: u8 = 2;
pub const SOUTH: u8 = 4;
pub const WEST: u8 = 8;
pub const INSIDE: u8 = 16;

/// All four exit bits.
pub const EXITS: u8 = NORTH | EAST | SOUTH | WEST;

/// Number of distinct part codes.
pub const CODE_COUNT: usize = 32;

/// Largest usable tile id; [`NO_TILE`] is reserved.
pub const MAX_TILES: u16 = NO_TILE as u16;

/// Exit shapes whose inside bit is reversed relative to the stroke.
const FLIPPED_SHAPES: [u8; 2] = [SOUTH | WEST, NORTH | EAST];

/// Substitution order used when a code has no better candidate.
const LAST_RESORT: [u8; 3] = [NORTH | SOUTH, EAST | WEST, EXITS];

/// Grid direction. North is +y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Probe order for neighbours.
    pub const ALL: [Direction; 4] =
        [Direction::North, Direction::East, Direction::South, Direction::West];

    pub fn bit(self) -> u8 {
        match self {
            Direction::North => NORTH,
            Direction::East => EAST,
            Direction::South => SOUTH,
            Direction::West => WEST,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    pub fn offset(self) -> MapPoint {
        match self {
            Direction::North => MapPoint::new(0, 1),
            Direction::East => MapPoint::new(1, 0),
            Direction::South => MapPoint::new(0, -1),
            Direction::West => MapPoint::new(-1, 0),
        }
    }

    /// Direction of a unit axis step, if `step` is one.
    pub fn from_step(step: MapPoint) -> Option<Direction> {
        match (step.x, step.y) {
            (0, 1) => Some(Direction::North),
            (1, 0) => Some(Direction::East),
            (0, -1) => Some(Direction::South),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }
}

/// Number of exit bits set in `code`.
pub fn exit_count(code: u8) -> u32 {
    (code & EXITS).count_ones()
}

/// Render a code as its flag list, e.g. `N,E,-,-,I`.
pub fn describe_code(code: u8) -> String {
    let flag = |bit: u8, c: char| if code & bit != 0 { c } else { '-' };
    format!(
        "{},{},{},{},{}",
        flag(NORTH, 'N'),
        flag(EAST, 'E'),
        flag(SOUTH, 'S'),
        flag(WEST, 'W'),
        flag(INSIDE, 'I')
    )
}

/// Errors from loading snake definitions. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SnakeError {
    /// Malformed line
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    /// Connectivity flag other than 0 or 1
    #[error("line {line}: flag '{value}' must be 0 or 1")]
    BadFlag { line: usize, value: String },
    /// Tile id beyond the tile set
    #[error("line {line}: tile {tile} out of range (must be below {max_tiles})")]
    TileOutOfRange { line: usize, tile: u32, max_tiles: u16 },
    /// StartSnake while another block is open
    #[error("line {line}: StartSnake inside snake '{open}'")]
    NestedStart { line: usize, open: String },
    /// EndSnake with no open block
    #[error("line {line}: EndSnake without StartSnake")]
    UnmatchedEnd { line: usize },
    /// Input ended inside a block
    #[error("line {line}: snake '{name}' is never closed")]
    Unterminated { line: usize, name: String },
    /// Same code defined twice in one block
    #[error("line {line}: part {} defined twice in snake '{name}'", describe_code(*.code))]
    DuplicateCode { line: usize, code: u8, name: String },
    /// Block without parts
    #[error("line {line}: snake '{name}' defines no parts")]
    EmptySnake { line: usize, name: String },
    /// Two blocks with the same name
    #[error("line {line}: duplicate snake name '{name}'")]
    DuplicateName { line: usize, name: String },
    /// IO error reading a definition file
    #[error("Error reading snake file '{}': {1}", .0.display())]
    IoError(PathBuf, String),
}

/// One named snake tile set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnakeDefinition {
    name: String,
    read_parts: [Option<u8>; CODE_COUNT],
    write_parts: [Option<u8>; CODE_COUNT],
}

impl SnakeDefinition {
    /// Build a definition from its explicitly defined parts.
    ///
    /// Returns `None` if no part is defined.
    pub fn new(name: impl Into<String>, read_parts: [Option<u8>; CODE_COUNT]) -> Option<Self> {
        if read_parts.iter().all(Option::is_none) {
            return None;
        }
        let write_parts = fill_missing_snake_parts(&read_parts);
        Some(Self { name: name.into(), read_parts, write_parts })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tile explicitly defined for `code`.
    pub fn read_part(&self, code: u8) -> Option<u8> {
        self.read_parts[usize::from(code) % CODE_COUNT]
    }

    /// Tile to place for `code`, after substitution.
    pub fn write_part(&self, code: u8) -> Option<u8> {
        self.write_parts[usize::from(code) % CODE_COUNT]
    }

    pub fn read_parts(&self) -> &[Option<u8>; CODE_COUNT] {
        &self.read_parts
    }

    pub fn write_parts(&self) -> &[Option<u8>; CODE_COUNT] {
        &self.write_parts
    }

    /// True if either side of the four-way junction is defined.
    pub fn has_junctions(&self) -> bool {
        self.read_parts[usize::from(EXITS)].is_some()
            || self.read_parts[usize::from(EXITS | INSIDE)].is_some()
    }

    /// Most exits a plotted cell may have.
    pub fn exit_quota(&self) -> u32 {
        if self.has_junctions() {
            4
        } else {
            2
        }
    }

    /// Code of `tile` within this set (lowest code if the tile is used
    /// more than once), or `None` if the tile is not part of the set.
    pub fn code_of_tile(&self, tile: u8) -> Option<u8> {
        if tile == NO_TILE {
            return None;
        }
        (0..CODE_COUNT as u8).find(|&code| self.read_parts[usize::from(code)] == Some(tile))
    }
}

/// Exit sets to try for a missing part, best first. Inside bits are
/// handled by the caller.
fn substitutes(exits: u8) -> Vec<u8> {
    match exit_count(exits) {
        4 | 3 => vec![EXITS],
        2 => {
            let mut out: Vec<u8> = Direction::ALL
                .iter()
                .map(|d| d.bit())
                .filter(|&bit| exits & bit == 0)
                .map(|bit| exits | bit)
                .collect();
            out.push(EXITS);
            out
        }
        1 => {
            if exits & (NORTH | SOUTH) != 0 {
                vec![NORTH | SOUTH]
            } else {
                vec![EAST | WEST]
            }
        }
        _ => vec![NORTH | SOUTH, EAST | WEST],
    }
}

/// Derive the write table from the defined parts.
///
/// For each code: the defined part, then its inside/outside counterpart,
/// then the substitutes for its exit shape (same inside bit first). Codes
/// still unresolved take the first defined part of N/S, E/W, four-way, then
/// any code in ascending order. Reads only `read_parts`, so the result does
/// not depend on the order parts were defined.
pub fn fill_missing_snake_parts(read_parts: &[Option<u8>; CODE_COUNT]) -> [Option<u8>; CODE_COUNT] {
    let read = |code: u8| read_parts[usize::from(code)];
    let last_resort = LAST_RESORT
        .iter()
        .flat_map(|&exits| [exits, exits | INSIDE])
        .chain(0..CODE_COUNT as u8)
        .find_map(read);

    let mut write_parts = [None; CODE_COUNT];
    for code in 0..CODE_COUNT as u8 {
        let inside = code & INSIDE;
        let resolved = read(code).or_else(|| read(code ^ INSIDE)).or_else(|| {
            substitutes(code & EXITS)
                .into_iter()
                .flat_map(|exits| [exits | inside, exits | (inside ^ INSIDE)])
                .find_map(read)
        });
        if resolved.is_none() {
            trace!("part {} falls back to last resort", describe_code(code));
        }
        write_parts[usize::from(code)] = resolved.or(last_resort);
    }
    write_parts
}

/// A loaded collection of snake tile sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Snakes {
    definitions: Vec<SnakeDefinition>,
}

struct OpenBlock {
    name: String,
    line: usize,
    parts: [Option<u8>; CODE_COUNT],
}

impl Snakes {
    /// Parse definition text. Loading is all-or-nothing: the first error
    /// discards everything parsed so far.
    pub fn load(text: &str, max_tiles: u16) -> Result<Self, SnakeError> {
        let max_tiles = max_tiles.min(MAX_TILES);
        let mut definitions: Vec<SnakeDefinition> = Vec::new();
        let mut open: Option<OpenBlock> = None;
        let mut last_line = 0;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            last_line = line;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("StartSnake") {
                if let Some(block) = &open {
                    return Err(SnakeError::NestedStart { line, open: block.name.clone() });
                }
                let name = parse_name(rest, line)?;
                if definitions.iter().any(|d| d.name == name) {
                    return Err(SnakeError::DuplicateName { line, name });
                }
                open = Some(OpenBlock { name, line, parts: [None; CODE_COUNT] });
            } else if trimmed == "EndSnake" {
                let block = open.take().ok_or(SnakeError::UnmatchedEnd { line })?;
                let definition = SnakeDefinition::new(block.name.clone(), block.parts)
                    .ok_or(SnakeError::EmptySnake { line: block.line, name: block.name })?;
                debug!(
                    "snake '{}': {} parts defined, exit quota {}",
                    definition.name,
                    definition.read_parts.iter().flatten().count(),
                    definition.exit_quota()
                );
                definitions.push(definition);
            } else {
                let Some(block) = open.as_mut() else {
                    return Err(SnakeError::Syntax {
                        line,
                        message: format!("part outside a StartSnake block: '{}'", trimmed),
                    });
                };
                let (tile, code) = parse_part(trimmed, line, max_tiles)?;
                let slot = &mut block.parts[usize::from(code)];
                if slot.is_some() {
                    return Err(SnakeError::DuplicateCode { line, code, name: block.name.clone() });
                }
                *slot = Some(tile);
            }
        }

        if let Some(block) = open {
            return Err(SnakeError::Unterminated {
                line: last_line.max(block.line),
                name: block.name,
            });
        }
        debug!("loaded {} snake definitions", definitions.len());
        Ok(Self { definitions })
    }

    /// Read and parse a definition file.
    pub fn load_file(path: &Path, max_tiles: u16) -> Result<Self, SnakeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SnakeError::IoError(path.to_path_buf(), e.to_string()))?;
        Self::load(&text, max_tiles)
    }

    pub fn find(&self, name: &str) -> Option<&SnakeDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    pub fn get(&self, index: usize) -> Option<&SnakeDefinition> {
        self.definitions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SnakeDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn parse_name(rest: &str, line: usize) -> Result<String, SnakeError> {
    let rest = rest.trim();
    let name = rest
        .strip_prefix('\'')
        .and_then(|r| r.strip_suffix('\''))
        .filter(|n| !n.is_empty() && !n.contains('\''));
    name.map(str::to_string).ok_or_else(|| SnakeError::Syntax {
        line,
        message: format!("expected StartSnake 'name', found '{}'", rest),
    })
}

fn parse_part(text: &str, line: usize, max_tiles: u16) -> Result<(u8, u8), SnakeError> {
    let syntax = |message: String| SnakeError::Syntax { line, message };
    let (tile_text, flags_text) = text
        .split_once(':')
        .ok_or_else(|| syntax(format!("expected tile:N,E,S,W,Inside, found '{}'", text)))?;
    let tile: u32 = tile_text
        .trim()
        .parse()
        .map_err(|_| syntax(format!("invalid tile index '{}'", tile_text.trim())))?;
    if tile >= u32::from(max_tiles) {
        return Err(SnakeError::TileOutOfRange { line, tile, max_tiles });
    }

    let flags: Vec<&str> = flags_text.split(',').map(str::trim).collect();
    if flags.len() != 5 {
        return Err(syntax(format!("expected 5 flags (N,E,S,W,Inside), found {}", flags.len())));
    }
    let mut code = 0u8;
    for (flag, bit) in flags.iter().zip([NORTH, EAST, SOUTH, WEST, INSIDE]) {
        match *flag {
            "0" => {}
            "1" => code |= bit,
            other => return Err(SnakeError::BadFlag { line, value: other.to_string() }),
        }
    }
    // max_tiles is capped below NO_TILE, so the tile fits a u8
    Ok((tile as u8, code))
}

/// Where a stroke is relative to the segment being plotted.
///
/// Reported to callers and in trace output only. Sidedness at segment
/// joints follows from the corner shapes, so no placement reads this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeState {
    /// Only the start cell has been placed.
    Start,
    /// Last step went along the segment's dominant axis.
    Major(Direction),
    /// Last step was a corner onto the minor axis.
    Minor(Direction),
}

impl fmt::Display for StrokeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrokeState::Start => write!(f, "start"),
            StrokeState::Major(d) => write!(f, "major {:?}", d),
            StrokeState::Minor(d) => write!(f, "minor {:?}", d),
        }
    }
}

/// Splits a Bresenham line into unit axis steps. A diagonal move becomes
/// the major step followed by the minor step.
struct AxisSteps {
    points: LineSteps,
    previous: Option<MapPoint>,
    major: Option<Direction>,
    minor: Option<Direction>,
    pending_minor: bool,
}

impl AxisSteps {
    fn new(start: MapPoint, end: MapPoint) -> Self {
        let points = LineSteps::new(start, end);
        let major = Direction::from_step(points.major_step());
        let minor = Direction::from_step(points.minor_step());
        Self { points, previous: None, major, minor, pending_minor: false }
    }
}

impl Iterator for AxisSteps {
    /// Step direction and whether it was along the major axis.
    type Item = (Direction, bool);

    fn next(&mut self) -> Option<(Direction, bool)> {
        if self.pending_minor {
            self.pending_minor = false;
            return self.minor.map(|d| (d, false));
        }
        loop {
            let point = self.points.next()?;
            let Some(previous) = self.previous.replace(point) else {
                continue;
            };
            let major = self.major?;
            self.pending_minor = point - previous != major.offset();
            return Some((major, true));
        }
    }
}

/// State of one stroke being drawn with a snake.
#[derive(Debug, Clone)]
pub struct SnakeContext<'s> {
    snake: &'s SnakeDefinition,
    pos: MapPoint,
    /// Exit bits of the current cell from the stroke alone.
    exits: u8,
    /// Inside bit carried into the current cell.
    carried_inside: bool,
    state: StrokeState,
}

impl<'s> SnakeContext<'s> {
    /// Start a stroke at `start`, placing a single cell that connects to any
    /// matching neighbours.
    pub fn begin_line<G: TileAccess + ?Sized>(
        snake: &'s SnakeDefinition,
        start: MapPoint,
        inside: bool,
        grid: &mut G,
    ) -> Self {
        let ctx = Self {
            snake,
            pos: start,
            exits: 0,
            carried_inside: inside,
            state: StrokeState::Start,
        };
        ctx.place(grid);
        ctx
    }

    pub fn position(&self) -> MapPoint {
        self.pos
    }

    pub fn state(&self) -> StrokeState {
        self.state
    }

    pub fn snake(&self) -> &'s SnakeDefinition {
        self.snake
    }

    /// Extend the stroke to `end`, placing every cell on the way.
    ///
    /// A cell is written once its exits are known: when the stroke leaves
    /// it, or at `end`. The cell the stroke starts from is rewritten with
    /// its new exit.
    pub fn plot_line<G: TileAccess + ?Sized>(&mut self, end: MapPoint, grid: &mut G) {
        let mut moved = false;
        for (dir, along_major) in AxisSteps::new(self.pos, end) {
            self.exits |= dir.bit();
            let resolved = self.place(grid);

            self.carried_inside = resolved & INSIDE != 0;
            self.pos += dir.offset();
            self.exits = dir.opposite().bit();
            self.state = if along_major {
                StrokeState::Major(dir)
            } else {
                StrokeState::Minor(dir)
            };
            moved = true;
        }
        if moved {
            self.place(grid);
        }
        trace!("snake '{}' stroke at {:?}, {}", self.snake.name, self.pos, self.state);
    }

    fn stroke_inside(&self, exits: u8) -> bool {
        self.carried_inside ^ FLIPPED_SHAPES.contains(&exits)
    }

    fn code_for(&self, exits: u8) -> u8 {
        if self.stroke_inside(exits) {
            exits | INSIDE
        } else {
            exits
        }
    }

    /// Connect the current cell to neighbours that belong to the snake and
    /// already point back at it, up to the exit quota.
    fn amend_part<G: TileAccess + ?Sized>(&self, grid: &G) -> u8 {
        let quota = self.snake.exit_quota();
        let mut exits = self.exits;
        for dir in Direction::ALL {
            if exit_count(exits) >= quota {
                break;
            }
            if exits & dir.bit() != 0 {
                continue;
            }
            let neighbour = grid.read_tile(self.pos + dir.offset());
            let points_back = self
                .snake
                .code_of_tile(neighbour)
                .is_some_and(|code| code & dir.opposite().bit() != 0);
            if points_back {
                exits |= dir.bit();
            }
        }
        self.code_for(exits)
    }

    /// Write the current cell. Returns the amended code, which is what the
    /// next cell's inside bit carries over from.
    fn place<G: TileAccess + ?Sized>(&self, grid: &mut G) -> u8 {
        let unamended = self.code_for(self.exits);
        let amended = self.amend_part(&*grid);
        let tile = match self.snake.write_part(amended) {
            Some(tile) => Some(tile),
            None => {
                debug!(
                    "snake '{}' has no part {}, using {}",
                    self.snake.name,
                    describe_code(amended),
                    describe_code(unamended)
                );
                self.snake.write_part(unamended)
            }
        };
        match tile {
            Some(tile) => grid.write_tile(self.pos, tile),
            None => warn!(
                "snake '{}' has no part for {}, cell {:?} left unchanged",
                self.snake.name,
                describe_code(unamended),
                self.pos
            ),
        }
        amended
    }
}
