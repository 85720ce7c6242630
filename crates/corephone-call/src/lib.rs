//! Call state machine, conference operations and the call registry/
//! history (§3, §4.H, §4.I).
//!
//! [`Call`] carries the action table and event table that drive its
//! [`state::CallState`]; [`CallRegistry`] owns the set of live calls and
//! the [`HistoryEntry`] log they're filed into once they reach `Over`.

mod call;
mod error;
mod history;
mod registry;
mod state;

pub use call::Call;
pub use error::{CallError, Result};
pub use history::HistoryEntry;
pub use registry::CallRegistry;
pub use state::{
    apply_action, apply_event, CallAction, CallDirection, CallEffect, CallState, ConnectionState,
    HistoryState, RemoteEvent,
};
