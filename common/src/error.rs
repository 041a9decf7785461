use crate::Point;

/// Failures surfaced by board construction, sampling and state encoding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("board dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("a board needs at least one mine")]
    NoMines,

    #[error("total mines ({mines}) must be less than the number of cells ({cells})")]
    TooManyMines { mines: usize, cells: usize },

    #[error("mine at {0} lies outside the board")]
    MineOutOfBounds(Point),

    /// Raised by the safe-cell sampler once every non-mine cell is revealed or flagged.
    #[error("no safe cells remaining")]
    NoSafeCell,

    /// Decoded bytes whose grid does not match the recorded dimensions.
    #[error("board state has {rows} rows where {height} rows of {width} cells were expected")]
    MalformedState {
        width: usize,
        height: usize,
        rows: usize,
    },

    #[error("board encoding failed: {0}")]
    Codec(#[from] bcs::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
