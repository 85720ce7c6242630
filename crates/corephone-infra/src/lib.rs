//! Ambient engineering substrate shared by every corephone crate: logging
//! setup and a small error-context helper. None of the crates in this
//! workspace are expected to reach for `println!` or bare `String` errors
//! when this crate's facilities apply.

pub mod context;
pub mod logging;

pub use context::{ErrorContext, ErrorExt};
pub use logging::{setup_logging, LoggingConfig};
