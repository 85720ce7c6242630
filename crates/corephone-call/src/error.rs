use thiserror::Error;

use crate::state::{CallAction, CallState};

/// Errors raised by call state transitions, the call registry and
/// conference operations (§7).
#[derive(Debug, Error)]
pub enum CallError {
    /// An action has no defined cell for the current state (an ERROR
    /// cell in the action table).
    #[error("action {action:?} is not valid in state {state:?}")]
    InvalidAction { state: CallState, action: CallAction },

    /// No call exists with the given id.
    #[error("no call with id {0}")]
    NotFound(uuid::Uuid),

    /// No account exists with the given id.
    #[error("no account with id {0}")]
    AccountNotFound(String),

    /// The call is not a conference, but a conference-only operation
    /// was requested on it.
    #[error("call {0} is not a conference")]
    NotAConference(uuid::Uuid),

    /// `detach`/`merge` were asked to operate on a call that isn't a
    /// member of the conference they named.
    #[error("call {0} is not a child of conference {1}")]
    NotAConferenceMember(uuid::Uuid, uuid::Uuid),

    /// A conference must be created from at least two calls.
    #[error("a conference needs at least two participants, got {0}")]
    NotEnoughParticipants(usize),

    /// Attempted to add a call that's already part of some conference.
    #[error("call {0} already belongs to a conference")]
    AlreadyInConference(uuid::Uuid),

    /// A history entry record could not be parsed back from its
    /// persisted line form.
    #[error("malformed history record: {0}")]
    MalformedHistoryRecord(String),
}

impl CallError {
    /// Whether a caller can reasonably retry after this error, or
    /// should just surface it (mirrors the sibling crates' categorised
    /// helper).
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            CallError::NotFound(_) | CallError::AccountNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CallError>;
