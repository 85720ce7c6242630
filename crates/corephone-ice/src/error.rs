use thiserror::Error;

/// Result alias for ICE operations.
pub type Result<T> = std::result::Result<T, IceError>;

/// Errors surfaced by the ICE transport factory and transport. Named
/// after the error taxonomy in §7: `IceInitError` and
/// `IceNegotiationError` drive the owning call into `Failure`;
/// `InvalidCandidate` is a per-line skip-and-continue, never fatal to
/// the whole blob.
#[derive(Debug, Error)]
pub enum IceError {
    /// The native ICE session (here: the component UDP sockets) could
    /// not be created.
    #[error("ICE session initialisation failed: {0}")]
    InitFailed(String),

    /// `start()` was called with an empty remote candidate list, or
    /// negotiation otherwise produced no validated pair for some
    /// component.
    #[error("ICE negotiation failed: {0}")]
    NegotiationFailed(String),

    /// A line in a remote candidate blob didn't parse: wrong field
    /// count or unrecognised `typ` token. The caller skips the line and
    /// continues with the rest of the blob.
    #[error("malformed candidate line: {0}")]
    InvalidCandidate(String),

    /// `component` is out of range for this transport's component count.
    #[error("component {0} out of range")]
    InvalidComponent(usize),

    /// `send()` was called before negotiation produced a validated
    /// remote pair for this component. This is the typed replacement
    /// for the source's `-1` sentinel return.
    #[error("no validated remote pair for component {0} yet")]
    NoValidatedPair(usize),

    /// The factory was shut down while a waiter was parked.
    #[error("ICE transport factory is shutting down")]
    FactoryShutdown,
}
