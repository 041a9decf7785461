//! Random self-play and feature encoding for models trained outside the crate.

use crate::board::Board;
use crate::config::BoardConfig;
use crate::error::{Error, Result};
use rand::Rng;

/// Planes per cell: visible, flagged, then one-hot clue values 0 through 8.
pub const FEATURE_PLANES: usize = 11;

/// Builds a partially played board by revealing 5 to 24 random safe cells.
///
/// The first sweep may land anywhere since mines are only placed after it.
/// Play stops early once no safe cell is left.
pub fn random_field<R: Rng + ?Sized>(config: BoardConfig, rng: &mut R) -> Result<Board> {
    let mut board = Board::new(config, rng.random())?;
    let sweeps = rng.random_range(5..25);
    for _ in 0..sweeps {
        if !board.is_active() {
            break;
        }
        match board.random_safe_cell(rng) {
            Ok(at) => {
                board.reveal(at);
            }
            Err(Error::NoSafeCell) => break,
            Err(e) => return Err(e),
        }
    }
    Ok(board)
}

/// Encodes the player-visible state as `[y][x][plane]`.
///
/// Clue planes are only set for visible cells, so hidden mines never leak.
pub fn feature_planes(board: &Board) -> Vec<Vec<[f32; FEATURE_PLANES]>> {
    let mut planes = vec![vec![[0.0; FEATURE_PLANES]; board.width()]; board.height()];
    for (at, cell) in board.cells() {
        let encoded = &mut planes[at.y][at.x];
        if cell.visible {
            encoded[0] = 1.0;
            if !cell.is_mine() {
                encoded[2 + cell.value as usize] = 1.0;
            }
        }
        if cell.flagged {
            encoded[1] = 1.0;
        }
    }
    planes
}

/// Training target: `1.0` where a mine sits, `0.0` elsewhere.
pub fn mine_targets(board: &Board) -> Vec<Vec<f32>> {
    let mut targets = vec![vec![0.0; board.width()]; board.height()];
    for at in board.mine_positions() {
        targets[at.y][at.x] = 1.0;
    }
    targets
}
