//! ICE-based NAT traversal for the corephone media path (§4.J–§4.M).
//!
//! [`IceTransportFactory`] owns the long-lived event pump and mints
//! per-call [`IceTransport`]s, each multiplexing a handful of media
//! components over locally gathered UDP candidates. [`IceSocket`]
//! narrows a transport down to a single component for callers that only
//! care about one media stream. [`corephone_upnp::UpnpController`] is
//! threaded in optionally to augment host candidates with a
//! router-assigned server-reflexive one.

mod candidate;
mod config;
mod error;
mod factory;
mod packet;
mod socket;
mod timer;
mod transport;
mod wait;

pub use candidate::{Candidate, CandidateType};
pub use config::{IceConfig, Nomination};
pub use error::{IceError, Result};
pub use factory::IceTransportFactory;
pub use packet::Packet;
pub use socket::IceSocket;
pub use transport::{IceRole, IceTransport};
pub use wait::{WaitGate, WaitResult};
