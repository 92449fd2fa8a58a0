use super::*;

/// Uniform resampling attempts before falling back to a linear scan of the
/// interior.
const SPAWN_ATTEMPTS: usize = 64;

impl TurnProcessor {
    /// Tops the active ghost population up to the required floor. The floor
    /// ramps with the move counter when a spawn-rate divisor is configured.
    pub(super) fn maintain_ghost_population(&mut self, game: &mut Game) {
        let required =
            required_ghosts(game.min_ghosts, game.ghost_rate, game.move_count) as usize;
        while game.ghosts.len() < required {
            let Some(spawn) = self.pick_spawn_cell(&game.maze) else {
                break;
            };
            game.ghosts.push(Ghost::spawn(GhostKind::Random, spawn));
        }
    }

    /// Uniformly sampled open interior cell; wall hits are resampled, and a
    /// fully walled interior yields nothing.
    pub(super) fn pick_spawn_cell(&mut self, maze: &Maze) -> Option<Position> {
        if maze.height() < 3 || maze.width() < 3 {
            return None;
        }
        for _ in 0..SPAWN_ATTEMPTS {
            let pos = Position::new(
                self.rng.int(1, maze.height() - 2),
                self.rng.int(1, maze.width() - 2),
            );
            if maze.is_open(pos) {
                return Some(pos);
            }
        }
        for row in 1..maze.height() - 1 {
            for col in 1..maze.width() - 1 {
                let pos = Position::new(row, col);
                if maze.is_open(pos) {
                    return Some(pos);
                }
            }
        }
        None
    }
}
