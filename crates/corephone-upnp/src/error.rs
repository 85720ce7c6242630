use thiserror::Error;

/// Result alias for UPnP operations.
pub type Result<T> = std::result::Result<T, UpnpError>;

/// Errors surfaced by the UPnP controller. Per §7, every variant here is
/// a "log and proceed without the server-reflexive candidate" condition
/// for the ICE transport that asked for the mapping, never a fatal one.
#[derive(Debug, Error)]
pub enum UpnpError {
    /// No Internet Gateway Device answered the discovery search.
    #[error("no UPnP internet gateway device found")]
    GatewayNotFound,

    /// The gateway rejected the external-IP query.
    #[error("gateway rejected external IP query: {0}")]
    ExternalIpQueryFailed(String),

    /// The gateway rejected the mapping request (e.g. port already
    /// claimed by another device, `same_external_port` requested but
    /// unavailable).
    #[error("gateway rejected port mapping: {0}")]
    MappingRejected(String),

    /// The gateway rejected a removal request.
    #[error("gateway rejected mapping removal: {0}")]
    RemovalRejected(String),
}
