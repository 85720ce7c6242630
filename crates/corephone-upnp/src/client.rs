//! The IGD (Internet Gateway Device) client abstraction. A real build
//! wires this to [`igd_next`]'s async gateway client; tests and examples
//! use [`MockIgdClient`], an in-memory router stand-in.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;

use crate::mapping::Protocol;
use crate::{Result, UpnpError};

/// Everything [`crate::UpnpController`] needs from a discovered gateway.
#[async_trait]
pub trait IgdClient: Send + Sync {
    /// The gateway's external (WAN-facing) IPv4 address.
    async fn external_ip(&self) -> Result<Ipv4Addr>;

    /// Request a mapping from `internal_port` to `external_port` (or let
    /// the gateway pick one, when `external_port` is `0`). Returns the
    /// external port actually assigned.
    async fn add_port_mapping(
        &self,
        protocol: Protocol,
        external_port: u16,
        internal_port: u16,
        description: &str,
    ) -> Result<u16>;

    /// Remove a previously added mapping.
    async fn remove_port_mapping(&self, protocol: Protocol, external_port: u16) -> Result<()>;
}

/// [`IgdClient`] backed by a real [`igd_next`] gateway search, performed
/// once at construction and cached for the lifetime of the client.
pub struct GatewayIgdClient {
    gateway: igd_next::aio::tokio::Gateway,
}

impl GatewayIgdClient {
    /// Search the local network for a gateway. Fails with
    /// [`UpnpError::GatewayNotFound`] if the search times out or no IGD
    /// responds.
    pub async fn discover() -> Result<Self> {
        let gateway = igd_next::aio::tokio::search_gateway(Default::default())
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "UPnP gateway search failed");
                UpnpError::GatewayNotFound
            })?;
        Ok(Self { gateway })
    }
}

#[async_trait]
impl IgdClient for GatewayIgdClient {
    async fn external_ip(&self) -> Result<Ipv4Addr> {
        self.gateway
            .get_external_ip()
            .await
            .map_err(|e| UpnpError::ExternalIpQueryFailed(e.to_string()))
    }

    async fn add_port_mapping(
        &self,
        protocol: Protocol,
        external_port: u16,
        internal_port: u16,
        description: &str,
    ) -> Result<u16> {
        let proto = match protocol {
            Protocol::Udp => igd_next::PortMappingProtocol::UDP,
            Protocol::Tcp => igd_next::PortMappingProtocol::TCP,
        };
        self.gateway
            .add_port(
                proto,
                external_port,
                std::net::SocketAddrV4::new(Ipv4Addr::LOCALHOST, internal_port),
                0,
                description,
            )
            .await
            .map_err(|e| UpnpError::MappingRejected(e.to_string()))?;
        Ok(if external_port == 0 {
            internal_port
        } else {
            external_port
        })
    }

    async fn remove_port_mapping(&self, protocol: Protocol, external_port: u16) -> Result<()> {
        let proto = match protocol {
            Protocol::Udp => igd_next::PortMappingProtocol::UDP,
            Protocol::Tcp => igd_next::PortMappingProtocol::TCP,
        };
        self.gateway
            .remove_port(proto, external_port)
            .await
            .map_err(|e| UpnpError::RemovalRejected(e.to_string()))
    }
}

/// In-memory [`IgdClient`] for tests and examples. Assigns external ports
/// sequentially starting at `first_external_port` and reports a fixed
/// external IP, behaving like a very small, perfectly reliable router.
pub struct MockIgdClient {
    external_ip: Ipv4Addr,
    state: Mutex<MockState>,
}

struct MockState {
    next_port: u16,
    mappings: HashMap<(Protocol, u16), u16>,
}

impl MockIgdClient {
    /// A mock gateway reporting `external_ip`, handing out mapped ports
    /// starting at `first_external_port`.
    pub fn new(external_ip: Ipv4Addr, first_external_port: u16) -> Self {
        Self {
            external_ip,
            state: Mutex::new(MockState {
                next_port: first_external_port,
                mappings: HashMap::new(),
            }),
        }
    }
}

#[async_trait]
impl IgdClient for MockIgdClient {
    async fn external_ip(&self) -> Result<Ipv4Addr> {
        Ok(self.external_ip)
    }

    async fn add_port_mapping(
        &self,
        protocol: Protocol,
        external_port: u16,
        internal_port: u16,
        _description: &str,
    ) -> Result<u16> {
        let mut state = self.state.lock().unwrap();
        let assigned = if external_port == 0 {
            let port = state.next_port;
            state.next_port += 1;
            port
        } else {
            external_port
        };
        state.mappings.insert((protocol, assigned), internal_port);
        Ok(assigned)
    }

    async fn remove_port_mapping(&self, protocol: Protocol, external_port: u16) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.mappings.remove(&(protocol, external_port));
        Ok(())
    }
}
