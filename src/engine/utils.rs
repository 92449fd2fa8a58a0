use crate::maze::Maze;
use crate::types::{Direction, Position, COMPASS};

/// Adjacent open cells in compass order.
pub(super) fn open_neighbors(maze: &Maze, pos: Position) -> Vec<(Direction, Position)> {
    COMPASS
        .iter()
        .filter_map(|dir| {
            let cell = pos.step(*dir);
            maze.is_open(cell).then_some((*dir, cell))
        })
        .collect()
}
