use thiserror::Error;

/// Result alias for account operations.
pub type Result<T> = std::result::Result<T, AccountError>;

/// Errors surfaced by the account model and account list.
#[derive(Debug, Error)]
pub enum AccountError {
    /// A `details` write was attempted while the account's edit state
    /// doesn't permit it (EDITING, OUTDATED or REMOVED).
    #[error("account {account_id} rejected a configuration write while in state {state}")]
    ConfigurationRejected {
        /// The account's id, or `"<new>"` if it has none yet.
        account_id: String,
        /// The edit state that caused the rejection.
        state: &'static str,
    },

    /// `save()` was called on an account flagged for removal.
    #[error("account {0} is flagged for removal and cannot be saved")]
    Removed(String),

    /// The backend round-trip (save/reload/registration poll) failed.
    #[error("backend operation failed: {0}")]
    Backend(String),

    /// `move_up`/`move_down`/`by_id` given an index or id the list doesn't
    /// have.
    #[error("no such account: {0}")]
    NotFound(String),

    /// `move_up`/`move_down` given an out-of-range index.
    #[error("account index {0} out of bounds")]
    IndexOutOfBounds(usize),
}

impl AccountError {
    /// Whether retrying the same operation might succeed without user
    /// intervention (a transient backend hiccup) as opposed to a logic
    /// error that will keep failing until something changes.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AccountError::Backend(_))
    }
}
