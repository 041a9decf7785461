//! Iterative constraint propagation over revealed clues.
//!
//! Each call recomputes the whole probability field from the current board:
//! exact deductions first (a clue whose unflagged neighbors must all be mines,
//! or must all be safe), then a local density estimate for every cell the exact
//! pass could not settle. Cells proven to be mines are flagged on the board.

use crate::Point;
use crate::board::SolverBoard;
use tracing::{debug, trace};

/// Upper bound on deduction passes per call.
pub const MAX_PASSES: usize = 100;

/// Estimated mine likelihood for every cell, indexed `[y][x]`.
///
/// Only hidden, unflagged cells carry meaningful values. Everything else is
/// `0.0`, except cells flagged during the call that produced the field, which
/// carry `1.0`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProbabilityField {
    width: usize,
    height: usize,
    values: Vec<Vec<f64>>,
}

impl ProbabilityField {
    pub fn new(width: usize, height: usize) -> Self {
        ProbabilityField {
            width,
            height,
            values: vec![vec![0.0; width]; height],
        }
    }

    /// Builds a field from rows of values. All rows must have the same length.
    pub fn from_rows(values: Vec<Vec<f64>>) -> Self {
        let height = values.len();
        let width = values.first().map_or(0, Vec::len);
        assert!(
            values.iter().all(|row| row.len() == width),
            "probability rows must have equal length"
        );
        ProbabilityField {
            width,
            height,
            values,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, at: Point) -> f64 {
        self.values[at.y][at.x]
    }

    pub fn set(&mut self, at: Point, probability: f64) {
        self.values[at.y][at.x] = probability;
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }
}

/// Runs the deduction to a fixed point (or [`MAX_PASSES`]) and returns a fresh
/// probability field. Proven mines are flagged through `board`.
///
/// Cells proven safe end with exactly `0.0`, proven mines with exactly `1.0`.
/// Hitting the pass cap is not an error: the latest estimate is returned.
pub fn propagate(board: &mut SolverBoard<'_>) -> ProbabilityField {
    let mut field = ProbabilityField::new(board.width(), board.height());

    let hidden = board.hidden_cells();
    let remaining_mines = board.remaining_mines();
    if hidden.len() as isize == remaining_mines {
        for &p in &hidden {
            field.set(p, 1.0);
        }
        return field;
    }
    if remaining_mines == 0 {
        return field;
    }

    let mut proven_safe = vec![vec![false; board.width()]; board.height()];
    for pass in 1..=MAX_PASSES {
        let changed = deduce_exact(board, &mut field, &mut proven_safe);

        let hidden = board.hidden_cells();
        if hidden.is_empty() {
            debug!(pass, "no hidden cells left");
            return field;
        }

        let density = board.remaining_mines() as f64 / hidden.len() as f64;
        for p in hidden {
            if !proven_safe[p.y][p.x] {
                field.set(p, bounded(local_estimate(board, p).unwrap_or(density)));
            }
        }

        if !changed {
            debug!(pass, "propagation converged");
            return field;
        }
    }

    debug!(passes = MAX_PASSES, "propagation stopped at pass cap");
    field
}

/// One sweep of exact deductions over every revealed positive clue.
/// Returns whether any probability changed.
fn deduce_exact(
    board: &mut SolverBoard<'_>,
    field: &mut ProbabilityField,
    proven_safe: &mut [Vec<bool>],
) -> bool {
    let mut changed = false;

    for at in board.points() {
        let clue = match board.clue(at) {
            Some(clue) if clue > 0 => clue as isize,
            _ => continue,
        };

        let mut flagged = 0;
        let mut hidden_adj = Vec::new();
        for n in board.neighbors(at) {
            if board.is_flagged(n) {
                flagged += 1;
            } else if board.is_hidden(n) {
                hidden_adj.push(n);
            }
        }
        if hidden_adj.is_empty() {
            continue;
        }

        let remaining = clue - flagged;
        if remaining == hidden_adj.len() as isize {
            for n in hidden_adj {
                board.flag(n);
                if field.get(n) != 1.0 {
                    field.set(n, 1.0);
                    changed = true;
                    trace!(clue_at = %at, mine = %n, "forced mine");
                }
            }
        } else if remaining == 0 {
            for n in hidden_adj {
                proven_safe[n.y][n.x] = true;
                if field.get(n) != 0.0 {
                    field.set(n, 0.0);
                    changed = true;
                    trace!(clue_at = %at, safe = %n, "forced safe");
                }
            }
        }
    }

    changed
}

/// Caps an estimate at `1.0`. Negative estimates only come from a board with
/// more flags than its clues allow; they map to the smallest positive value so
/// a guess never reads as a proven-safe `0.0`.
fn bounded(estimate: f64) -> f64 {
    if estimate < 0.0 {
        f64::MIN_POSITIVE
    } else {
        estimate.min(1.0)
    }
}

/// Mean of `(clue - flagged) / hidden` over the revealed positive clues next to `at`.
/// `None` when `at` borders no such clue.
fn local_estimate(board: &SolverBoard<'_>, at: Point) -> Option<f64> {
    let estimates: Vec<f64> = board
        .neighbors(at)
        .into_iter()
        .filter_map(|n| {
            let clue = board.clue(n).filter(|&c| c > 0)?;
            let (flagged, hidden) =
                board
                    .neighbors(n)
                    .into_iter()
                    .fold((0usize, 0usize), |(flagged, hidden), c| {
                        if board.is_flagged(c) {
                            (flagged + 1, hidden)
                        } else if board.is_hidden(c) {
                            (flagged, hidden + 1)
                        } else {
                            (flagged, hidden)
                        }
                    });
            (hidden > 0).then(|| (clue as f64 - flagged as f64) / hidden as f64)
        })
        .collect();

    if estimates.is_empty() {
        None
    } else {
        Some(estimates.iter().sum::<f64>() / estimates.len() as f64)
    }
}
