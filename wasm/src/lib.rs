use minesim as ms;
use wasm_bindgen::prelude::*;

/// Snapshot code for a hidden cell in [`get_cells`].
const HIDDEN: i8 = 9;
/// Snapshot code for a flagged cell in [`get_cells`].
const FLAGGED: i8 = 10;

fn load(bts: &[u8]) -> Result<ms::Board, String> {
    ms::Board::deserialize(bts).map_err(|e| e.to_string())
}

fn store(board: &ms::Board) -> Result<Vec<u8>, String> {
    board.serialize().map_err(|e| e.to_string())
}

fn point(board: &ms::Board, x: usize, y: usize) -> Result<ms::Point, String> {
    if x < board.width() && y < board.height() {
        Ok(ms::Point { x, y })
    } else {
        Err("out_of_bounds".to_string())
    }
}

#[wasm_bindgen]
pub fn create_game(width: usize, height: usize, mines: usize, seed: u64) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let config = ms::BoardConfig::new(width, height, mines).map_err(|e| e.to_string())?;
    let board = ms::Board::new(config, seed).map_err(|e| e.to_string())?;
    store(&board)
}

#[wasm_bindgen]
pub fn is_won(bts: Vec<u8>) -> Result<bool, String> {
    console_error_panic_hook::set_once();

    Ok(load(&bts)?.is_won())
}

/// Returns the new board state followed by one byte: 1 if a mine was hit.
#[wasm_bindgen]
pub fn reveal_cell(bts: Vec<u8>, x: usize, y: usize) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut board = load(&bts)?;
    let hit = board.reveal(point(&board, x, y)?);
    let mut xs = store(&board)?;
    xs.push(u8::from(hit));
    Ok(xs)
}

#[wasm_bindgen]
pub fn toggle_flag(bts: Vec<u8>, x: usize, y: usize) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut board = load(&bts)?;
    board.toggle_flag(point(&board, x, y)?);
    store(&board)
}

/// Asks the propagation solver for a move without changing the caller's board.
///
/// Returns `[x, y, action, probability_permille]`, where action is 0 for a
/// reveal and 1 for a flag, or an empty vector when no move is left.
#[wasm_bindgen]
pub fn solver_move(bts: Vec<u8>, seed: u64) -> Result<Vec<u32>, String> {
    console_error_panic_hook::set_once();

    let mut board = load(&bts)?;
    let mut solver = ms::ConstraintPropagationSolver::new(seed);
    let decision = ms::Solver::next_move(&mut solver, &mut ms::SolverBoard::new(&mut board));
    Ok(match decision {
        Some(d) => vec![
            d.point.x as u32,
            d.point.y as u32,
            match d.action {
                ms::Action::Reveal => 0,
                ms::Action::Flag => 1,
            },
            (d.probability * 1000.0).round() as u32,
        ],
        None => Vec::new(),
    })
}

/// Row-major cell snapshot: clue 0..8 or -1 for a revealed mine, 9 for hidden,
/// 10 for flagged.
#[wasm_bindgen]
pub fn get_cells(bts: Vec<u8>) -> Result<Vec<i8>, String> {
    console_error_panic_hook::set_once();

    let board = load(&bts)?;
    Ok(board
        .cells()
        .map(|(_, cell)| {
            if cell.flagged {
                FLAGGED
            } else if cell.visible {
                cell.value
            } else {
                HIDDEN
            }
        })
        .collect())
}

/// Row-major mine probabilities for the current state, for heat-map rendering.
#[wasm_bindgen]
pub fn get_probabilities(bts: Vec<u8>) -> Result<Vec<f64>, String> {
    console_error_panic_hook::set_once();

    let mut board = load(&bts)?;
    let field = ms::propagate(&mut ms::SolverBoard::new(&mut board));
    Ok(field.rows().iter().flatten().copied().collect())
}
