use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors surfaced by the codec registry and per-account codec model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// `move_up`/`move_down` given an out-of-range index.
    #[error("codec index {0} out of bounds")]
    IndexOutOfBounds(usize),
}
