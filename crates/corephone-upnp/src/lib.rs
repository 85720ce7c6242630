//! UPnP IGD port-mapping controller, used to augment ICE candidates with
//! a router-side server-reflexive transport address (§4.M).
//!
//! [`UpnpController`] is the per-caller facade; [`mapping::MappingTable`]
//! is the process-wide, protocol-partitioned refcount table that makes
//! repeated mapping requests for the same external port safe to share
//! across multiple controllers (e.g. one per ICE transport).

mod client;
mod controller;
mod error;
pub mod mapping;

pub use client::{GatewayIgdClient, IgdClient, MockIgdClient};
pub use controller::UpnpController;
pub use error::{Result, UpnpError};
pub use mapping::{MappingTable, Protocol};
