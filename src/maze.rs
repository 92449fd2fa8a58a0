use crate::constants::MIN_DIVISIBLE_SPAN;
use crate::error::EngineError;
use crate::rng::Rng;
use crate::types::{CellKind, Position};

/// How many pivot candidates a region tries before it gives up and stays
/// open. A candidate is rejected when its wall line would seal an earlier
/// passage gap.
const PIVOT_ATTEMPTS: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Maze {
    height: i32,
    width: i32,
    cells: Vec<CellKind>,
}

impl Maze {
    /// Bordered all-open room. The starting point of generation and the
    /// degenerate result for spans too small to divide.
    pub fn open_room(height: i32, width: i32) -> Result<Self, EngineError> {
        if height <= 0 || width <= 0 {
            return Err(EngineError::InvalidMazeDimensions { height, width });
        }
        let mut maze = Self {
            height,
            width,
            cells: vec![CellKind::Empty; (height * width) as usize],
        };
        for row in 0..height {
            for col in 0..width {
                if row == 0 || col == 0 || row == height - 1 || col == width - 1 {
                    maze.set_cell(Position::new(row, col), CellKind::Wall);
                }
            }
        }
        Ok(maze)
    }

    /// Recursive spatial division: each placed wall carries exactly one
    /// single-cell gap, so the result is always fully connected, though
    /// sibling subdivisions may still form loops.
    pub fn build_random(height: i32, width: i32, rng: &mut Rng) -> Result<Self, EngineError> {
        let mut maze = Self::open_room(height, width)?;
        let mut gaps = Vec::new();
        divide(&mut maze, 0, 0, height - 1, width - 1, rng, &mut gaps);
        Ok(maze)
    }

    pub fn from_tiles(tiles: &[String]) -> Result<Self, EngineError> {
        let height = tiles.len() as i32;
        let width = tiles.first().map(|row| row.chars().count()).unwrap_or(0) as i32;
        if height <= 0 || width <= 0 {
            return Err(EngineError::InvalidMazeDimensions { height, width });
        }
        let mut cells = Vec::with_capacity((height * width) as usize);
        for row in tiles {
            if row.chars().count() as i32 != width {
                return Err(EngineError::MalformedRecord(format!(
                    "ragged tile row: expected width {width}, got {}",
                    row.chars().count()
                )));
            }
            for ch in row.chars() {
                match ch {
                    '.' => cells.push(CellKind::Empty),
                    '#' => cells.push(CellKind::Wall),
                    other => {
                        return Err(EngineError::MalformedRecord(format!(
                            "unknown tile char {other:?}"
                        )))
                    }
                }
            }
        }
        Ok(Self {
            height,
            width,
            cells,
        })
    }

    pub fn to_tiles(&self) -> Vec<String> {
        (0..self.height)
            .map(|row| {
                (0..self.width)
                    .map(|col| match self.cell(Position::new(row, col)) {
                        Some(CellKind::Wall) => '#',
                        _ => '.',
                    })
                    .collect()
            })
            .collect()
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row >= 0 && pos.col >= 0 && pos.row < self.height && pos.col < self.width
    }

    /// Strictly inside the border-wall ring.
    pub fn is_interior(&self, pos: Position) -> bool {
        pos.row >= 1 && pos.col >= 1 && pos.row <= self.height - 2 && pos.col <= self.width - 2
    }

    pub fn cell(&self, pos: Position) -> Option<CellKind> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(self.cells[(pos.row * self.width + pos.col) as usize])
    }

    pub fn set_cell(&mut self, pos: Position, kind: CellKind) {
        if self.in_bounds(pos) {
            self.cells[(pos.row * self.width + pos.col) as usize] = kind;
        }
    }

    /// In bounds and not a wall. Out-of-bounds counts as blocked.
    pub fn is_open(&self, pos: Position) -> bool {
        self.cell(pos) == Some(CellKind::Empty)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Split {
    Horizontal,
    Vertical,
}

fn divide(
    maze: &mut Maze,
    r1: i32,
    c1: i32,
    r2: i32,
    c2: i32,
    rng: &mut Rng,
    gaps: &mut Vec<Position>,
) {
    let span_rows = r2 - r1 + 1;
    let span_cols = c2 - c1 + 1;
    if span_rows < MIN_DIVISIBLE_SPAN || span_cols < MIN_DIVISIBLE_SPAN {
        return;
    }

    let split = if span_cols < span_rows {
        Split::Horizontal
    } else if span_rows < span_cols {
        Split::Vertical
    } else if rng.bool(0.5) {
        Split::Horizontal
    } else {
        Split::Vertical
    };

    // Pivot strictly inside the region, at least two cells from every edge.
    // Resample while the implied wall line would seal an earlier gap.
    let mut pivot = None;
    for _ in 0..PIVOT_ATTEMPTS {
        let pr = rng.int(r1 + 2, r2 - 2);
        let pc = rng.int(c1 + 2, c2 - 2);
        if wall_line_is_clear(split, pr, pc, r1, c1, r2, c2, gaps) {
            pivot = Some((pr, pc));
            break;
        }
    }
    let Some((pr, pc)) = pivot else {
        return;
    };

    match split {
        Split::Horizontal => {
            for col in c1..=c2 {
                maze.set_cell(Position::new(pr, col), CellKind::Wall);
            }
        }
        Split::Vertical => {
            for row in r1..=r2 {
                maze.set_cell(Position::new(row, pc), CellKind::Wall);
            }
        }
    }
    let gap = Position::new(pr, pc);
    maze.set_cell(gap, CellKind::Empty);
    gaps.push(gap);

    match split {
        Split::Horizontal => {
            divide(maze, r1, c1, pr, c2, rng, gaps);
            divide(maze, pr, c1, r2, c2, rng, gaps);
        }
        Split::Vertical => {
            divide(maze, r1, c1, r2, pc, rng, gaps);
            divide(maze, r1, pc, r2, c2, rng, gaps);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn wall_line_is_clear(
    split: Split,
    pr: i32,
    pc: i32,
    r1: i32,
    c1: i32,
    r2: i32,
    c2: i32,
    gaps: &[Position],
) -> bool {
    let on_line = |pos: Position| match split {
        Split::Horizontal => pos.row == pr && (c1..=c2).contains(&pos.col),
        Split::Vertical => pos.col == pc && (r1..=r2).contains(&pos.row),
    };
    gaps.iter().all(|gap| {
        let near = [
            *gap,
            Position::new(gap.row - 1, gap.col),
            Position::new(gap.row + 1, gap.col),
            Position::new(gap.row, gap.col - 1),
            Position::new(gap.row, gap.col + 1),
        ];
        !near.into_iter().any(on_line)
    })
}
