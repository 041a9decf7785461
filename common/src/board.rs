use crate::Point;
use crate::config::BoardConfig;
use crate::error::{Error, Result};
use itertools::iproduct;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Cell value marking a mine.
pub const MINE: i8 = -1;

/// The full state of a single cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Cell {
    /// `-1` for a mine, otherwise the number of adjacent mines.
    pub value: i8,
    pub visible: bool,
    pub flagged: bool,
}

impl Cell {
    pub fn is_mine(&self) -> bool {
        self.value == MINE
    }

    /// Neither revealed nor flagged.
    pub fn is_hidden(&self) -> bool {
        !self.visible && !self.flagged
    }
}

/// A single game: the grid, its mines and what the player has uncovered so far.
///
/// Mines are placed lazily on the first reveal so the first click is never a mine.
/// Placement is driven by `seed`, so two boards built with the same seed and
/// receiving the same first click end up with the same layout.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Board {
    width: usize,
    height: usize,
    num_mines: usize,
    /// Indexed as `cells[y][x]`.
    cells: Vec<Vec<Cell>>,
    active: bool,
    first_move_done: bool,
    seed: u64,
}

impl Board {
    pub fn new(config: BoardConfig, seed: u64) -> Result<Self> {
        let config = BoardConfig::new(config.width, config.height, config.num_mines)?;
        Ok(Board {
            width: config.width,
            height: config.height,
            num_mines: config.num_mines,
            cells: vec![vec![Cell::default(); config.width]; config.height],
            active: true,
            first_move_done: false,
            seed,
        })
    }

    /// Builds a board with a fixed mine layout. The first move counts as already
    /// made, so no further placement happens.
    pub fn with_mines(width: usize, height: usize, mines: &[Point]) -> Result<Self> {
        let unique: BTreeSet<Point> = mines.iter().copied().collect();
        if let Some(&outside) = unique.iter().find(|p| p.x >= width || p.y >= height) {
            return Err(Error::MineOutOfBounds(outside));
        }
        let config = BoardConfig::new(width, height, unique.len())?;
        let mut board = Board::new(config, 0)?;
        board.lay_mines(unique.iter().copied());
        board.first_move_done = true;
        Ok(board)
    }

    /// Deserializes a board from bytes, rejecting states whose grid does not
    /// match the recorded configuration.
    pub fn deserialize(bts: &[u8]) -> Result<Self> {
        let board: Board = bcs::from_bytes(bts)?;
        BoardConfig::new(board.width, board.height, board.num_mines)?;
        if board.cells.len() != board.height
            || board.cells.iter().any(|row| row.len() != board.width)
        {
            return Err(Error::MalformedState {
                width: board.width,
                height: board.height,
                rows: board.cells.len(),
            });
        }
        Ok(board)
    }

    /// Serializes the board to bytes.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn num_mines(&self) -> usize {
        self.num_mines
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// False once a mine has been revealed.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_first_move(&self) -> bool {
        !self.first_move_done
    }

    pub fn cell(&self, at: Point) -> Cell {
        self.assert_in_bounds(at);
        self.cells[at.y][at.x]
    }

    pub fn cells(&self) -> impl Iterator<Item = (Point, Cell)> + '_ {
        points(self.width, self.height).map(|p| (p, self.cells[p.y][p.x]))
    }

    pub fn visible_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.visible).count()
    }

    pub fn flagged_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.flagged).count()
    }

    /// Mine coordinates in row-major order. Empty until the first reveal.
    ///
    /// Only meant for evaluation code; solvers go through [`SolverBoard`].
    pub fn mine_positions(&self) -> Vec<Point> {
        self.cells()
            .filter(|(_, cell)| cell.is_mine())
            .map(|(p, _)| p)
            .collect()
    }

    /// Reveals the cell at `at`, returning true if it was a mine.
    ///
    /// Flagged cells and finished games are left untouched. Revealing a zero
    /// cascades through connected zero cells, stopping at numbered cells.
    pub fn reveal(&mut self, at: Point) -> bool {
        self.assert_in_bounds(at);
        if !self.active || self.cells[at.y][at.x].flagged {
            return false;
        }

        if !self.first_move_done {
            self.place_mines(at);
            self.first_move_done = true;
        }

        if self.cells[at.y][at.x].is_mine() {
            self.active = false;
            self.cells[at.y][at.x].visible = true;
            debug!(%at, "mine revealed");
            return true;
        }

        self.flood_fill_reveal(at);
        false
    }

    /// Flips the flag on a hidden cell of an active game.
    pub fn toggle_flag(&mut self, at: Point) {
        self.assert_in_bounds(at);
        let cell = &mut self.cells[at.y][at.x];
        if self.active && !cell.visible {
            cell.flagged = !cell.flagged;
        }
    }

    /// Sets the flag on a hidden cell of an active game; flagged cells stay flagged.
    pub(crate) fn flag(&mut self, at: Point) {
        self.assert_in_bounds(at);
        let cell = &mut self.cells[at.y][at.x];
        if self.active && !cell.visible {
            cell.flagged = true;
        }
    }

    /// Picks uniformly among hidden, unflagged cells that are not mines.
    pub fn random_safe_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Point> {
        let safe: Vec<Point> = self
            .cells()
            .filter(|(_, cell)| cell.is_hidden() && !cell.is_mine())
            .map(|(p, _)| p)
            .collect();
        safe.choose(rng).copied().ok_or(Error::NoSafeCell)
    }

    /// True once every non-mine cell is visible.
    pub fn is_won(&self) -> bool {
        let revealed_safe = self
            .cells
            .iter()
            .flatten()
            .filter(|c| c.visible && !c.is_mine())
            .count();
        revealed_safe == self.width * self.height - self.num_mines
    }

    fn assert_in_bounds(&self, at: Point) {
        assert!(
            at.x < self.width && at.y < self.height,
            "{at} is outside the {}x{} board",
            self.width,
            self.height
        );
    }

    /// Samples `num_mines` distinct cells, never `safe`, and fills in the clues.
    fn place_mines(&mut self, safe: Point) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let candidates: Vec<Point> = points(self.width, self.height)
            .filter(|&p| p != safe)
            .collect();
        let mines: Vec<Point> = candidates
            .choose_multiple(&mut rng, self.num_mines)
            .copied()
            .collect();
        self.lay_mines(mines);
        debug!(seed = self.seed, %safe, mines = self.num_mines, "mines placed");
    }

    fn lay_mines(&mut self, mines: impl IntoIterator<Item = Point>) {
        for mine in mines {
            self.cells[mine.y][mine.x].value = MINE;
        }
        for p in points(self.width, self.height) {
            if self.cells[p.y][p.x].is_mine() {
                continue;
            }
            let count = neighbors(p, self.width, self.height)
                .filter(|n| self.cells[n.y][n.x].is_mine())
                .count();
            self.cells[p.y][p.x].value = count as i8;
        }
    }

    /// Reveals `start` and cascades through zero cells with an explicit stack.
    fn flood_fill_reveal(&mut self, start: Point) {
        let mut stack = vec![start];

        while let Some(point) = stack.pop() {
            let cell = self.cells[point.y][point.x];
            if cell.visible || cell.flagged {
                continue;
            }
            self.cells[point.y][point.x].visible = true;

            if cell.value == 0 {
                for neighbor in neighbors(point, self.width, self.height) {
                    let next = self.cells[neighbor.y][neighbor.x];
                    if next.is_hidden() && !next.is_mine() {
                        stack.push(neighbor);
                    }
                }
            }
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            let line: Vec<String> = row
                .iter()
                .map(|cell| {
                    if cell.flagged {
                        "F".to_string()
                    } else if !cell.visible {
                        ".".to_string()
                    } else if cell.is_mine() {
                        "*".to_string()
                    } else {
                        cell.value.to_string()
                    }
                })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// Every coordinate of a `width` x `height` grid in row-major order.
pub fn points(width: usize, height: usize) -> impl Iterator<Item = Point> {
    iproduct!(0..height, 0..width).map(|(y, x)| Point { x, y })
}

/// In-bounds 8-neighborhood of `point`, in row-major order.
pub fn neighbors(point: Point, width: usize, height: usize) -> impl Iterator<Item = Point> {
    iproduct!(-1isize..=1, -1isize..=1)
        .filter(|&offset| offset != (0, 0))
        .filter_map(move |(dy, dx)| {
            let x = point.x.checked_add_signed(dx)?;
            let y = point.y.checked_add_signed(dy)?;
            (x < width && y < height).then_some(Point { x, y })
        })
}

/// What a solver is allowed to see and do.
///
/// Hidden cells never expose their value, and the only mutation on offer is
/// placing a flag.
pub struct SolverBoard<'a> {
    board: &'a mut Board,
}

impl<'a> SolverBoard<'a> {
    pub fn new(board: &'a mut Board) -> Self {
        SolverBoard { board }
    }

    pub fn width(&self) -> usize {
        self.board.width
    }

    pub fn height(&self) -> usize {
        self.board.height
    }

    pub fn num_mines(&self) -> usize {
        self.board.num_mines
    }

    pub fn is_visible(&self, at: Point) -> bool {
        self.board.cell(at).visible
    }

    pub fn is_flagged(&self, at: Point) -> bool {
        self.board.cell(at).flagged
    }

    /// Neither revealed nor flagged.
    pub fn is_hidden(&self, at: Point) -> bool {
        self.board.cell(at).is_hidden()
    }

    /// The clue of a revealed, non-mine cell.
    pub fn clue(&self, at: Point) -> Option<u8> {
        let cell = self.board.cell(at);
        (cell.visible && !cell.is_mine()).then_some(cell.value as u8)
    }

    /// True while nothing has been revealed yet.
    pub fn is_untouched(&self) -> bool {
        self.board.visible_count() == 0
    }

    pub fn flagged_count(&self) -> usize {
        self.board.flagged_count()
    }

    /// Mines not yet accounted for by flags. Negative if the board is over-flagged.
    pub fn remaining_mines(&self) -> isize {
        self.board.num_mines as isize - self.board.flagged_count() as isize
    }

    pub fn neighbors(&self, at: Point) -> Vec<Point> {
        neighbors(at, self.board.width, self.board.height).collect()
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + use<> {
        points(self.board.width, self.board.height)
    }

    /// Hidden, unflagged cells in row-major order.
    pub fn hidden_cells(&self) -> Vec<Point> {
        self.points().filter(|&p| self.is_hidden(p)).collect()
    }

    pub fn flag(&mut self, at: Point) {
        self.board.flag(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pt(x: usize, y: usize) -> Point {
        Point { x, y }
    }

    #[test]
    fn test_board_initialization() {
        let board = Board::new(BoardConfig::new(5, 5, 3).unwrap(), 1).unwrap();
        assert_eq!(board.width(), 5);
        assert_eq!(board.height(), 5);
        assert_eq!(board.num_mines(), 3);
        assert!(board.is_active());
        assert!(board.is_first_move());
        assert!(board.mine_positions().is_empty());
        assert!(board.cells().all(|(_, c)| c.is_hidden()));
    }

    #[test]
    fn test_rejects_bad_configuration() {
        let too_many = BoardConfig {
            width: 3,
            height: 3,
            num_mines: 9,
        };
        assert!(matches!(
            Board::new(too_many, 0),
            Err(Error::TooManyMines { .. })
        ));
        assert!(matches!(
            Board::with_mines(3, 3, &[pt(3, 0)]),
            Err(Error::MineOutOfBounds(_))
        ));
    }

    #[test]
    fn test_first_reveal_places_mines() {
        let mut board = Board::new(BoardConfig::new(5, 5, 3).unwrap(), 99).unwrap();
        assert!(!board.reveal(pt(2, 2)));
        assert_eq!(board.mine_positions().len(), 3);
        assert!(!board.cell(pt(2, 2)).is_mine());
        assert!(board.cell(pt(2, 2)).visible);
    }

    #[test]
    fn test_same_seed_same_layout() {
        let config = BoardConfig::new(9, 9, 10).unwrap();
        let mut a = Board::new(config, 42).unwrap();
        let mut b = Board::new(config, 42).unwrap();
        a.reveal(pt(4, 4));
        b.reveal(pt(4, 4));
        assert_eq!(a.mine_positions(), b.mine_positions());
        assert_eq!(a, b);
    }

    #[test]
    fn test_clues_count_neighbors() {
        let board = Board::with_mines(3, 3, &[pt(0, 0), pt(2, 2)]).unwrap();
        assert_eq!(board.cell(pt(1, 1)).value, 2);
        assert_eq!(board.cell(pt(1, 0)).value, 1);
        assert_eq!(board.cell(pt(2, 0)).value, 0);
        assert_eq!(board.cell(pt(0, 0)).value, MINE);
    }

    #[test]
    fn test_flood_fill_reveal() {
        let mut board = Board::with_mines(5, 5, &[pt(1, 1)]).unwrap();
        assert!(!board.reveal(pt(4, 4)));

        // Clue cells bordering the zero region are revealed, the pocket behind them is not.
        assert!(board.cell(pt(2, 2)).visible);
        assert!(board.cell(pt(0, 2)).visible);
        assert!(!board.cell(pt(0, 0)).visible);
        assert!(!board.cell(pt(1, 0)).visible);
        assert!(!board.cell(pt(0, 1)).visible);
        assert!(!board.cell(pt(1, 1)).visible);
        assert_eq!(board.visible_count(), 21);
        assert!(!board.is_won());

        for p in [pt(0, 0), pt(1, 0), pt(0, 1)] {
            assert!(!board.reveal(p));
        }
        assert!(board.is_won());
    }

    #[test]
    fn test_flood_fill_skips_flags() {
        let mut board = Board::with_mines(4, 4, &[pt(3, 3)]).unwrap();
        board.toggle_flag(pt(0, 3));
        board.reveal(pt(0, 0));
        let flagged = board.cell(pt(0, 3));
        assert!(flagged.flagged && !flagged.visible);
        assert_eq!(board.visible_count(), 14);
    }

    #[test]
    fn test_reveal_is_idempotent() {
        let mut board = Board::with_mines(5, 5, &[pt(1, 1)]).unwrap();
        board.reveal(pt(4, 4));
        let before = board.clone();
        assert!(!board.reveal(pt(4, 4)));
        assert!(!board.reveal(pt(2, 2)));
        assert_eq!(board, before);
    }

    #[test]
    fn test_hitting_mine() {
        let mut board = Board::with_mines(3, 3, &[pt(1, 1)]).unwrap();
        assert!(board.reveal(pt(1, 1)));
        assert!(!board.is_active());
        assert_eq!(board.visible_count(), 1);
        assert!(!board.is_won());

        // Nothing changes after the game has ended.
        assert!(!board.reveal(pt(0, 0)));
        board.toggle_flag(pt(0, 0));
        assert_eq!(board.visible_count(), 1);
        assert_eq!(board.flagged_count(), 0);
    }

    #[test]
    fn test_flags() {
        let mut board = Board::with_mines(3, 3, &[pt(0, 0)]).unwrap();
        board.toggle_flag(pt(0, 0));
        assert!(board.cell(pt(0, 0)).flagged);

        // Flagged cells cannot be revealed.
        assert!(!board.reveal(pt(0, 0)));
        assert!(board.is_active());

        board.toggle_flag(pt(0, 0));
        assert!(!board.cell(pt(0, 0)).flagged);

        // Visible cells cannot be flagged.
        board.reveal(pt(1, 1));
        board.toggle_flag(pt(1, 1));
        assert!(!board.cell(pt(1, 1)).flagged);
    }

    #[test]
    #[should_panic(expected = "outside the 3x3 board")]
    fn test_out_of_bounds_panics() {
        let mut board = Board::with_mines(3, 3, &[pt(0, 0)]).unwrap();
        board.reveal(pt(3, 1));
    }

    #[test]
    fn test_random_safe_cell() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut board = Board::with_mines(2, 2, &[pt(0, 0)]).unwrap();
        for _ in 0..20 {
            let p = board.random_safe_cell(&mut rng).unwrap();
            assert_ne!(p, pt(0, 0));
        }
        board.reveal(pt(1, 0));
        board.reveal(pt(0, 1));
        board.toggle_flag(pt(1, 1));
        assert!(matches!(
            board.random_safe_cell(&mut rng),
            Err(Error::NoSafeCell)
        ));
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut board = Board::new(BoardConfig::new(8, 6, 7).unwrap(), 3).unwrap();
        board.reveal(pt(0, 0));
        let flag_target = board
            .cells()
            .find(|(_, c)| c.is_hidden())
            .map(|(p, _)| p)
            .unwrap();
        board.toggle_flag(flag_target);

        let mut restored = Board::deserialize(&board.serialize().unwrap()).unwrap();
        assert_eq!(restored, board);
        assert_eq!(restored.is_won(), board.is_won());

        for p in points(8, 6) {
            assert_eq!(restored.reveal(p), board.reveal(p));
            assert_eq!(restored, board);
        }
    }

    #[test]
    fn test_deserialize_rejects_mismatched_grid() {
        let board = Board::with_mines(3, 3, &[pt(0, 0)]).unwrap();

        let wider = Board { width: 5, ..board.clone() };
        assert!(matches!(
            Board::deserialize(&bcs::to_bytes(&wider).unwrap()),
            Err(Error::MalformedState { .. })
        ));

        let mut ragged = board.clone();
        ragged.cells[2].pop();
        assert!(matches!(
            Board::deserialize(&bcs::to_bytes(&ragged).unwrap()),
            Err(Error::MalformedState { .. })
        ));

        let no_mines = Board { num_mines: 0, ..board };
        assert!(matches!(
            Board::deserialize(&bcs::to_bytes(&no_mines).unwrap()),
            Err(Error::NoMines)
        ));
    }

    #[test]
    fn test_neighbors_at_edges() {
        let corner: Vec<Point> = neighbors(pt(0, 0), 3, 3).collect();
        assert_eq!(corner, vec![pt(1, 0), pt(0, 1), pt(1, 1)]);
        assert_eq!(neighbors(pt(1, 1), 3, 3).count(), 8);
        assert_eq!(neighbors(pt(2, 1), 3, 3).count(), 5);
        assert_eq!(neighbors(pt(0, 0), 1, 1).count(), 0);
    }

    #[test]
    fn test_display() {
        let mut board = Board::with_mines(3, 2, &[pt(0, 0)]).unwrap();
        board.reveal(pt(2, 1));
        board.toggle_flag(pt(0, 0));
        assert_eq!(board.to_string(), "F 1 0\n. 1 0\n");
    }

    #[test]
    fn test_solver_board_hides_mines() {
        let mut board = Board::with_mines(3, 3, &[pt(0, 0)]).unwrap();
        board.reveal(pt(2, 2));
        let view = SolverBoard::new(&mut board);
        assert_eq!(view.clue(pt(0, 0)), None);
        assert_eq!(view.clue(pt(1, 1)), Some(1));
        assert_eq!(view.clue(pt(2, 2)), Some(0));
        assert_eq!(view.hidden_cells(), vec![pt(0, 0)]);
        assert_eq!(view.remaining_mines(), 1);
    }

    proptest! {
        #[test]
        fn prop_first_reveal_is_safe(
            width in 2usize..12,
            height in 2usize..12,
            density in 0.05f64..0.9,
            seed in any::<u64>(),
            fx in 0usize..12,
            fy in 0usize..12,
        ) {
            let cells = width * height;
            let mines = ((cells as f64 * density) as usize).clamp(1, cells - 1);
            let mut board = Board::new(BoardConfig::new(width, height, mines).unwrap(), seed).unwrap();
            let first = pt(fx % width, fy % height);

            prop_assert!(!board.reveal(first));
            prop_assert_eq!(board.mine_positions().len(), mines);
            prop_assert!(!board.cell(first).is_mine());
            prop_assert!(board.cells().all(|(_, c)| !(c.visible && c.flagged)));
        }

        #[test]
        fn prop_won_iff_all_safe_cells_visible(seed in any::<u64>(), steps in 0usize..40) {
            let mut board = Board::new(BoardConfig::new(6, 6, 5).unwrap(), seed).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..steps {
                let Ok(p) = board.random_safe_cell(&mut rng) else {
                    break;
                };
                prop_assert!(!board.reveal(p));
                prop_assert_eq!(board.is_won(), board.visible_count() == 36 - 5);
            }
            if board.random_safe_cell(&mut rng).is_err() {
                prop_assert!(board.is_won());
            }
        }
    }
}
