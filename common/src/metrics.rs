use crate::Point;
use crate::simulate::{GameRecord, Outcome};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

/// Aggregate scores over a set of finished games.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_games: usize,
    pub wins: usize,
    pub win_rate: f64,
    /// Share of predicted coordinates whose mean prediction (mine if above 0.5)
    /// matched the real layout.
    pub mine_accuracy: f64,
    pub avg_decision_time: Duration,
    pub moves_per_game: f64,
}

impl Summary {
    pub fn from_records(records: &[GameRecord]) -> Self {
        let total_games = records.len();
        let wins = records
            .iter()
            .filter(|r| r.outcome == Outcome::Won)
            .count();

        let (correct, scored) = records
            .iter()
            .map(score_predictions)
            .fold((0, 0), |(c, t), (rc, rt)| (c + rc, t + rt));

        let decision_times: Vec<Duration> = records
            .iter()
            .flat_map(|r| r.decision_times.iter().copied())
            .collect();
        let avg_decision_time = if decision_times.is_empty() {
            Duration::ZERO
        } else {
            decision_times.iter().sum::<Duration>() / decision_times.len() as u32
        };

        let total_moves: usize = records.iter().map(|r| r.moves).sum();

        Summary {
            total_games,
            wins,
            win_rate: ratio(wins, total_games),
            mine_accuracy: ratio(correct, scored),
            avg_decision_time,
            moves_per_game: ratio(total_moves, total_games),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Win Rate: {:.1}%", self.win_rate * 100.0)?;
        writeln!(f, "  Mine Accuracy: {:.1}%", self.mine_accuracy * 100.0)?;
        writeln!(
            f,
            "  Avg Decision Time: {:.4}s",
            self.avg_decision_time.as_secs_f64()
        )?;
        write!(f, "  Moves/Game: {:.1}", self.moves_per_game)
    }
}

/// `(correct, scored)` for one game: predictions are averaged per coordinate
/// and counted as a mine call above 0.5.
fn score_predictions(record: &GameRecord) -> (usize, usize) {
    let mines: HashSet<Point> = record.mines.iter().copied().collect();
    let mut by_point: HashMap<Point, Vec<f64>> = HashMap::new();
    for prediction in &record.predictions {
        by_point
            .entry(prediction.point)
            .or_default()
            .push(prediction.probability);
    }

    let correct = by_point
        .iter()
        .filter(|(point, preds)| {
            let mean = preds.iter().sum::<f64>() / preds.len() as f64;
            (mean > 0.5) == mines.contains(*point)
        })
        .count();
    (correct, by_point.len())
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
