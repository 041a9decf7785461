//! Minesweeper simulation and solver evaluation.
//!
//! The crate is organised leaves first:
//! - [`board`]: grid state, lazy mine placement, reveal/flood fill and win detection.
//! - [`propagation`]: the iterative constraint propagation engine producing a
//!   probability field for every hidden cell.
//! - [`solver`]: the [`Solver`] interface, the move selector built on the
//!   propagation engine and the adapter for externally supplied models.
//! - [`simulate`] and [`metrics`]: the game driver, batch runs and scoring.

pub mod board;
pub mod config;
pub mod error;
pub mod explore;
pub mod metrics;
pub mod propagation;
pub mod simulate;
pub mod solver;

pub use board::{Board, Cell, SolverBoard};
pub use config::{BoardConfig, Difficulty, SolverKind};
pub use error::{Error, Result};
pub use propagation::{ProbabilityField, propagate};
pub use solver::{
    Action, ConstraintPropagationSolver, Decision, DensityModel, ExternalModelSolver, MineModel,
    Solver,
};

/// Represents a 2D coordinate on the minesweeper board.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub fn new(x: usize, y: usize) -> Self {
        Point { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
