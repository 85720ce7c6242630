//! Softphone session core: ties the account registry
//! ([`corephone_account`]), the call state machine
//! ([`corephone_call`]), the codec catalog ([`corephone_codec`]), and
//! ICE/UPnP-backed media negotiation ([`corephone_ice`],
//! [`corephone_upnp`]) behind one [`CoreConfig`] and one IPC boundary
//! ([`ipc::SignallingSink`]/[`ipc::SignallingSource`]).
//!
//! This crate does not implement a wire protocol, a CLI, or a UI
//! adapter — see §6/§9A of the design notes for what lives outside it.

mod config;
mod error;
pub mod ipc;

pub use config::CoreConfig;
pub use error::{CoreError, ErrorCategory, Result};

pub use corephone_account::{Account, AccountList};
pub use corephone_call::{Call, CallRegistry};
pub use corephone_codec::CodecRegistry;
pub use corephone_ice::IceTransportFactory;
pub use corephone_infra::{setup_logging, LoggingConfig};
pub use corephone_upnp::UpnpController;
