use anyhow::Context;
use clap::{Parser, Subcommand};
use minesim::metrics::Summary;
use minesim::simulate::{self, BatchConfig, Outcome};
use minesim::*;
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "minesim", about = "Minesweeper simulator and solver benchmark")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch one solver play a single game.
    Play {
        #[arg(long, value_enum, default_value = "beginner")]
        difficulty: Difficulty,
        #[arg(long, value_enum, default_value = "propagation")]
        solver: SolverKind,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Pause between moves so the game is watchable.
        #[arg(long, default_value_t = 500)]
        delay_ms: u64,
    },
    /// Compare solvers across the standard presets.
    Bench {
        #[arg(long, default_value_t = 9)]
        games: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 4)]
        threads: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Play {
            difficulty,
            solver,
            seed,
            delay_ms,
        } => play(difficulty, solver, seed, Duration::from_millis(delay_ms)),
        Command::Bench {
            games,
            seed,
            threads,
        } => bench(games, seed, threads),
    }
}

fn play(difficulty: Difficulty, kind: SolverKind, seed: u64, delay: Duration) -> anyhow::Result<()> {
    let mut board = Board::new(difficulty.config(), seed).context("building board")?;
    let mut solver = kind.build(seed);

    info!(
        difficulty = difficulty.name(),
        solver = solver.name(),
        seed,
        "autonomous minesweeper bot"
    );
    print!("{board}");

    let mut move_count = 0;
    let record = simulate::play_game_with(&mut board, &mut *solver, |board, decision| {
        move_count += 1;
        let verb = match decision.action {
            Action::Reveal => "reveals",
            Action::Flag => "flags",
        };
        println!(
            "\n--- Move #{move_count}: bot {verb} {} with confidence {:.2} ---",
            decision.point,
            decision.confidence()
        );
        print!("{board}");
        thread::sleep(delay);
    });

    println!("\n--- Game Over ---");
    match record.outcome {
        Outcome::Won => println!("Result: The bot won in {} moves!", record.moves),
        Outcome::Lost => println!("Result: The bot hit a mine and lost."),
        Outcome::Stalled => println!("Result: The bot ran out of moves."),
    }
    Ok(())
}

fn bench(games: usize, seed: u64, threads: usize) -> anyhow::Result<()> {
    for difficulty in Difficulty::ALL {
        let board = difficulty.config();
        println!(
            "\n=== Testing {} ({}x{}, {} mines) ===",
            difficulty.name(),
            board.width,
            board.height,
            board.num_mines
        );

        for solver in [SolverKind::Propagation, SolverKind::Density] {
            let config = BatchConfig {
                board,
                solver,
                games,
                seed,
                threads,
            };
            let records = simulate::run_batch(&config)
                .with_context(|| format!("running {solver:?} on {}", difficulty.name()))?;
            println!("\n{solver:?} solver:");
            println!("{}", Summary::from_records(&records));
        }
        println!("\n{}", "=".repeat(50));
    }
    Ok(())
}
