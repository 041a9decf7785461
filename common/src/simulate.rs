//! The game driver: one solver plays one board to completion, and batches of
//! independent games are spread across worker threads.

use crate::Point;
use crate::board::{Board, SolverBoard};
use crate::config::{BoardConfig, SolverKind};
use crate::error::Result;
use crate::solver::{Action, Decision, Solver};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
    /// The solver ran out of moves before the game ended.
    Stalled,
}

/// The probability a solver assigned to the cell it picked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub point: Point,
    pub probability: f64,
}

/// Everything evaluation needs to know about one finished game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub outcome: Outcome,
    pub moves: usize,
    pub decision_times: Vec<Duration>,
    pub predictions: Vec<Prediction>,
    /// The real layout, read after the game so evaluation can score predictions.
    pub mines: Vec<Point>,
}

/// Plays `board` with `solver` until the game is won, lost or the solver stalls.
pub fn play_game<S: Solver + ?Sized>(board: &mut Board, solver: &mut S) -> GameRecord {
    play_game_with(board, solver, |_, _| {})
}

/// Like [`play_game`], calling `observe` after every applied move.
pub fn play_game_with<S, F>(board: &mut Board, solver: &mut S, mut observe: F) -> GameRecord
where
    S: Solver + ?Sized,
    F: FnMut(&Board, &Decision),
{
    let mut decision_times = Vec::new();
    let mut predictions = Vec::new();

    let outcome = loop {
        if board.is_won() {
            break Outcome::Won;
        }
        if !board.is_active() {
            break Outcome::Lost;
        }

        let started = Instant::now();
        let decision = solver.next_move(&mut SolverBoard::new(board));
        let elapsed = started.elapsed();

        let Some(decision) = decision else {
            warn!(solver = solver.name(), "solver stalled on an unfinished board");
            break Outcome::Stalled;
        };
        decision_times.push(elapsed);
        predictions.push(Prediction {
            point: decision.point,
            probability: decision.probability,
        });

        if decision.action == Action::Reveal {
            board.reveal(decision.point);
        }
        observe(board, &decision);
    };

    let moves = predictions.len();
    debug!(solver = solver.name(), ?outcome, moves, "game finished");
    GameRecord {
        outcome,
        moves,
        decision_times,
        predictions,
        mines: board.mine_positions(),
    }
}

/// A set of independent games sharing a board configuration and solver kind.
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub board: BoardConfig,
    pub solver: SolverKind,
    pub games: usize,
    pub seed: u64,
    pub threads: usize,
}

/// Board and solver seeds for game number `game` of a batch.
pub fn game_seeds(base: u64, game: usize) -> (u64, u64) {
    let board_seed = base.wrapping_add(game as u64);
    (board_seed, board_seed ^ 0x9e37_79b9_7f4a_7c15)
}

/// Plays a single game of a batch.
pub fn run_game(config: &BatchConfig, game: usize) -> Result<GameRecord> {
    let (board_seed, solver_seed) = game_seeds(config.seed, game);
    let mut board = Board::new(config.board, board_seed)?;
    let mut solver = config.solver.build(solver_seed);
    Ok(play_game(&mut board, &mut *solver))
}

/// Runs every game of the batch. Each worker thread owns its boards and
/// solvers; the records come back in game order whatever the scheduling.
pub fn run_batch(config: &BatchConfig) -> Result<Vec<GameRecord>> {
    let board = BoardConfig::new(config.board.width, config.board.height, config.board.num_mines)?;
    let config = BatchConfig { board, ..*config };
    let threads = config.threads.clamp(1, config.games.max(1));
    info!(
        games = config.games,
        threads,
        solver = ?config.solver,
        width = board.width,
        height = board.height,
        mines = board.num_mines,
        "starting batch"
    );

    let per_worker = std::thread::scope(|scope| {
        let config = &config;
        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                scope.spawn(move || {
                    (worker..config.games)
                        .step_by(threads)
                        .map(|game| run_game(config, game).map(|record| (game, record)))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let mut records: Vec<(usize, GameRecord)> = per_worker.into_iter().flatten().collect();
    records.sort_by_key(|(game, _)| *game);
    Ok(records.into_iter().map(|(_, record)| record).collect())
}
