use crate::Point;
use crate::board::SolverBoard;
use crate::propagation::{ProbabilityField, propagate};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::{trace, warn};

/// What a decision asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Action {
    /// The caller should reveal the cell.
    Reveal,
    /// The solver has already flagged the cell through its [`SolverBoard`].
    Flag,
}

/// A single move together with the mine probability the solver assigned to it.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Decision {
    pub point: Point,
    pub action: Action,
    pub probability: f64,
}

impl Decision {
    pub fn reveal(point: Point, probability: f64) -> Self {
        Decision {
            point,
            action: Action::Reveal,
            probability,
        }
    }

    pub fn flag(point: Point) -> Self {
        Decision {
            point,
            action: Action::Flag,
            probability: 1.0,
        }
    }

    /// Likelihood that the chosen cell is safe.
    pub fn confidence(&self) -> f64 {
        1.0 - self.probability
    }
}

/// A move-selection strategy.
///
/// Implementations see the board only through [`SolverBoard`], so the only state
/// they can change is flags.
pub trait Solver {
    fn name(&self) -> &'static str;

    /// Chooses the next move, or `None` when no hidden, unflagged cell is left.
    fn next_move(&mut self, board: &mut SolverBoard<'_>) -> Option<Decision>;
}

/// Move selector driven by [`propagate`].
pub struct ConstraintPropagationSolver {
    rng: StdRng,
}

impl ConstraintPropagationSolver {
    pub fn new(seed: u64) -> Self {
        ConstraintPropagationSolver {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Solver for ConstraintPropagationSolver {
    fn name(&self) -> &'static str {
        "propagation"
    }

    fn next_move(&mut self, board: &mut SolverBoard<'_>) -> Option<Decision> {
        let field = propagate(board);
        select_move(board, &field, &mut self.rng)
    }
}

/// Picks a move from a probability field. First matching rule wins:
///
/// 1. the first hidden cell (row-major) with probability exactly `0.0` is revealed;
/// 2. the first hidden cell with probability exactly `1.0` is flagged;
/// 3. among hidden cells touching a revealed cell, one of those tied at the
///    lowest probability is revealed, chosen uniformly with `rng`;
/// 4. otherwise the first hidden cell is revealed.
///
/// Returns `None` when the board has no hidden, unflagged cell left, instead of
/// falling back to an arbitrary coordinate the caller might keep revisiting.
pub fn select_move<R: Rng + ?Sized>(
    board: &mut SolverBoard<'_>,
    field: &ProbabilityField,
    rng: &mut R,
) -> Option<Decision> {
    let hidden = board.hidden_cells();

    if let Some(&safe) = hidden.iter().find(|&&p| field.get(p) == 0.0) {
        trace!(%safe, "certain safe move");
        return Some(Decision::reveal(safe, 0.0));
    }

    if let Some(&mine) = hidden.iter().find(|&&p| field.get(p) == 1.0) {
        board.flag(mine);
        trace!(%mine, "certain mine flagged");
        return Some(Decision::flag(mine));
    }

    let frontier: Vec<Point> = hidden
        .iter()
        .copied()
        .filter(|&p| board.neighbors(p).into_iter().any(|n| board.is_visible(n)))
        .collect();
    let candidates = frontier
        .into_iter()
        .min_set_by(|&a, &b| field.get(a).total_cmp(&field.get(b)));
    if let Some(&guess) = candidates.choose(rng) {
        let probability = field.get(guess);
        trace!(%guess, probability, tied = candidates.len(), "frontier guess");
        return Some(Decision::reveal(guess, probability));
    }

    if let Some(&isolated) = hidden.first() {
        return Some(Decision::reveal(isolated, field.get(isolated)));
    }

    warn!("no hidden cell left to play");
    None
}

/// A mine predictor supplied from outside the crate, e.g. a trained model.
pub trait MineModel {
    fn predict(&self, board: &SolverBoard<'_>) -> ProbabilityField;
}

/// Baseline model: every hidden cell gets the global mine density.
#[derive(Debug, Clone, Copy, Default)]
pub struct DensityModel;

impl MineModel for DensityModel {
    fn predict(&self, board: &SolverBoard<'_>) -> ProbabilityField {
        let mut field = ProbabilityField::new(board.width(), board.height());
        let hidden = board.hidden_cells();
        if hidden.is_empty() {
            return field;
        }
        let density = (board.remaining_mines().max(0) as f64 / hidden.len() as f64).min(1.0);
        for p in hidden {
            field.set(p, density);
        }
        field
    }
}

/// Adapts a [`MineModel`] to the [`Solver`] interface: reveal the hidden,
/// unflagged cell with the lowest predicted probability.
pub struct ExternalModelSolver<M> {
    model: M,
}

impl<M: MineModel> ExternalModelSolver<M> {
    pub fn new(model: M) -> Self {
        ExternalModelSolver { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: MineModel> Solver for ExternalModelSolver<M> {
    fn name(&self) -> &'static str {
        "external-model"
    }

    fn next_move(&mut self, board: &mut SolverBoard<'_>) -> Option<Decision> {
        if board.is_untouched() {
            let centre = Point {
                x: board.width() / 2,
                y: board.height() / 2,
            };
            return Some(Decision::reveal(centre, 0.0));
        }

        let prediction = self.model.predict(board);
        let best = board
            .hidden_cells()
            .into_iter()
            .min_by(|&a, &b| prediction.get(a).total_cmp(&prediction.get(b)));
        match best {
            Some(point) => Some(Decision::reveal(
                point,
                prediction.get(point).clamp(0.0, 1.0),
            )),
            None => {
                warn!("no hidden cell left to play");
                None
            }
        }
    }
}
