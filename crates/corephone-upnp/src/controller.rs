//! Thin wrapper over an [`IgdClient`], coordinated through the shared
//! [`MappingTable`] refcount.

use std::net::Ipv4Addr;
use std::sync::Arc;

use corephone_ipaddr::IpAddress;
use tracing::{debug, warn};

use crate::client::IgdClient;
use crate::mapping::{MappingTable, Protocol};
use crate::{Result, UpnpError};

/// A description stamped on every mapping this controller creates, used
/// by [`UpnpController::remove_all`] to find them again.
const DEFAULT_DESCRIPTION: &str = "corephone";

/// External IP query and port-mapping add/remove, backed by an
/// [`IgdClient`] and coordinated with every other [`UpnpController`] in
/// the process through a shared [`MappingTable`].
pub struct UpnpController {
    client: Arc<dyn IgdClient>,
    table: Arc<MappingTable>,
    description: String,
}

impl UpnpController {
    /// Build a controller over `client`, sharing `table` with any other
    /// controller that should refcount against the same router mappings.
    pub fn new(client: Arc<dyn IgdClient>, table: Arc<MappingTable>) -> Self {
        Self {
            client,
            table,
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }

    /// The gateway's external IPv4 address, wrapped as an [`IpAddress`]
    /// with no port set. `None` if the query failed; callers proceed
    /// without the server-reflexive candidate per §7's `UpnpError`
    /// policy.
    pub async fn external_ip(&self) -> Option<IpAddress> {
        match self.client.external_ip().await {
            Ok(ip) => Some(IpAddress::from_ip(std::net::IpAddr::V4(ip), 0)),
            Err(e) => {
                warn!(error = %e, "UPnP external IP query failed");
                None
            }
        }
    }

    /// Request a mapping from `internal_port` to an external port (the
    /// same port iff `same_external_port`, otherwise router-assigned).
    /// Returns `true` and writes the mapped port into `mapped_port_out`
    /// on success.
    ///
    /// The router is always asked to add the mapping — the external
    /// port isn't known until it answers, so there's nothing to refcount
    /// against beforehand. [`MappingTable::acquire`] is called
    /// afterwards with the port the router assigned; if another
    /// `UpnpController` already holds that same external port, this
    /// just bumps its refcount rather than creating a second entry.
    pub async fn add_any_mapping(
        &self,
        internal_port: u16,
        proto: Protocol,
        same_external_port: bool,
        mapped_port_out: &mut u16,
    ) -> bool {
        let requested = if same_external_port { internal_port } else { 0 };

        match self
            .client
            .add_port_mapping(proto, requested, internal_port, &self.description)
            .await
        {
            Ok(assigned) => {
                let first_holder = self.table.acquire(proto, assigned, &self.description);
                debug!(
                    internal_port,
                    assigned, first_holder, "UPnP mapping acquired"
                );
                *mapped_port_out = assigned;
                true
            }
            Err(e) => {
                warn!(error = %e, internal_port, "UPnP mapping request failed");
                false
            }
        }
    }

    /// Release this controller's hold on `port`. The router-side mapping
    /// is only actually removed once the shared refcount drains to zero.
    pub async fn remove_mapping(&self, port: u16, proto: Protocol) -> Result<()> {
        if self.table.release(proto, port) {
            self.client.remove_port_mapping(proto, port).await?;
        }
        Ok(())
    }

    /// Remove every mapping this process holds under `description`
    /// (defaulting to this controller's own description), regardless of
    /// refcount — used on full shutdown.
    pub async fn remove_all(&self, description: Option<&str>) -> Result<()> {
        let description = description.unwrap_or(&self.description);
        let mut first_err = None;
        for (proto, port) in self.table.ports_with_description(description) {
            self.table.release(proto, port);
            if let Err(e) = self.client.remove_port_mapping(proto, port).await {
                warn!(error = %e, port, "failed to remove UPnP mapping during remove_all");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockIgdClient;

    fn controller(table: Arc<MappingTable>) -> UpnpController {
        let client = Arc::new(MockIgdClient::new(Ipv4Addr::new(203, 0, 113, 7), 52000));
        UpnpController::new(client, table)
    }

    #[tokio::test]
    async fn external_ip_reports_gateway_address() {
        let ctl = controller(MappingTable::shared());
        let ip = ctl.external_ip().await.unwrap();
        assert_eq!(ip.to_display_string(false, false), "203.0.113.7");
    }

    #[tokio::test]
    async fn add_and_remove_mapping_round_trip() {
        let table = MappingTable::shared();
        let ctl = controller(table.clone());
        let mut mapped = 0u16;
        assert!(
            ctl.add_any_mapping(40000, Protocol::Udp, false, &mut mapped)
                .await
        );
        assert_eq!(mapped, 52000);
        assert_eq!(table.refcount(Protocol::Udp, 52000), 1);

        ctl.remove_mapping(mapped, Protocol::Udp).await.unwrap();
        assert_eq!(table.refcount(Protocol::Udp, 52000), 0);
    }

    #[tokio::test]
    async fn two_controllers_share_refcount() {
        let table = MappingTable::shared();
        let a = controller(table.clone());
        let client_b = Arc::new(MockIgdClient::new(Ipv4Addr::new(203, 0, 113, 7), 9999));
        let b = UpnpController::new(client_b, table.clone());

        let mut mapped_a = 0u16;
        let mut mapped_b = 0u16;
        a.add_any_mapping(40000, Protocol::Udp, true, &mut mapped_a)
            .await;
        b.add_any_mapping(40000, Protocol::Udp, true, &mut mapped_b)
            .await;
        assert_eq!(mapped_a, 40000);
        assert_eq!(mapped_b, 40000);
        assert_eq!(table.refcount(Protocol::Udp, 40000), 2);

        a.remove_mapping(40000, Protocol::Udp).await.unwrap();
        assert_eq!(table.refcount(Protocol::Udp, 40000), 1);
        b.remove_mapping(40000, Protocol::Udp).await.unwrap();
        assert_eq!(table.refcount(Protocol::Udp, 40000), 0);
    }
}
