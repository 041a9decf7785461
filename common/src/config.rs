use crate::error::{Error, Result};
use crate::solver::{ConstraintPropagationSolver, DensityModel, ExternalModelSolver, Solver};

/// Board dimensions and mine count, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BoardConfig {
    pub width: usize,
    pub height: usize,
    pub num_mines: usize,
}

impl BoardConfig {
    pub fn new(width: usize, height: usize, num_mines: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        if num_mines == 0 {
            return Err(Error::NoMines);
        }
        let cells = width * height;
        if num_mines >= cells {
            return Err(Error::TooManyMines {
                mines: num_mines,
                cells,
            });
        }
        Ok(BoardConfig {
            width,
            height,
            num_mines,
        })
    }

    pub fn cells(&self) -> usize {
        self.width * self.height
    }
}

/// The classic board presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Expert,
    ];

    pub fn config(self) -> BoardConfig {
        let (width, height, num_mines) = match self {
            Difficulty::Beginner => (9, 9, 10),
            Difficulty::Intermediate => (16, 16, 40),
            Difficulty::Expert => (30, 16, 99),
        };
        BoardConfig {
            width,
            height,
            num_mines,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Expert => "expert",
        }
    }
}

impl From<Difficulty> for BoardConfig {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.config()
    }
}

/// Which move-selection strategy drives a game. Resolved once into a boxed [`Solver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SolverKind {
    /// Constraint propagation with probabilistic fallback.
    Propagation,
    /// Baseline model that assumes a uniform mine density.
    Density,
}

impl SolverKind {
    pub fn build(self, seed: u64) -> Box<dyn Solver + Send> {
        match self {
            SolverKind::Propagation => Box::new(ConstraintPropagationSolver::new(seed)),
            SolverKind::Density => Box::new(ExternalModelSolver::new(DensityModel)),
        }
    }
}
