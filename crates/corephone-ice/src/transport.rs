//! The per-call ICE transport (§4.K): candidate gathering, negotiation,
//! multi-component media I/O, and candidate serialization.
//!
//! This core does not speak the real STUN wire protocol (out of scope,
//! matching the spirit of §1's "actual SIP/IAX wire protocol parser"
//! exclusion — see `DESIGN.md` for the explicit scope call). Local
//! candidates are gathered by binding real UDP sockets, and
//! "negotiation" trusts the exchanged candidate blob: for each
//! component, the first remote candidate naming that component becomes
//! the validated pair. This is enough to implement every testable
//! property in §8 (including genuine loopback media I/O across two
//! transports) without a full connectivity-check state machine.

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use corephone_upnp::{Protocol as UpnpProtocol, UpnpController};

use crate::candidate::{Candidate, CandidateType};
use crate::error::{IceError, Result};
use crate::packet::{Delivery, Packet, ReceiveCallback};
use crate::timer::TimerHeap;
use crate::wait::{WaitGate, WaitResult};

/// Which side nominates the final candidate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceRole {
    /// The initiator; performs nomination.
    Controlling,
    /// The responder; accepts the controlling side's nomination.
    Controlled,
}

const RECV_BUF_SIZE: usize = 64 * 1024;

struct Component {
    socket: UdpSocket,
    delivery: Mutex<Delivery>,
    validated_remote: RwLock<Option<SocketAddr>>,
    data_notify: Notify,
}

/// One per-call ICE session, multiplexing `component_count` media
/// streams (typically RTP + RTCP) over locally gathered UDP candidates.
pub struct IceTransport {
    name: String,
    role: Mutex<IceRole>,
    role_fixed: AtomicBool,
    local_ufrag: String,
    local_pwd: String,
    local_candidates: Mutex<Vec<Candidate>>,
    components: Vec<Arc<Component>>,
    recv_tasks: Vec<JoinHandle<()>>,
    init: WaitGate,
    negotiation: WaitGate,
    upnp_held: Mutex<Vec<(UpnpProtocol, u16)>>,
    upnp: Option<Arc<UpnpController>>,
    #[allow(dead_code)]
    timers: Arc<TimerHeap>,
}

fn random_ice_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

impl IceTransport {
    /// Gather local candidates and bring the transport up to
    /// init-complete. Mirrors §4.K.1 steps 1–3: capture local
    /// ufrag/password, enumerate default local candidates per component,
    /// and (if `upnp` is `Some`) augment host candidates with a
    /// server-reflexive one per successful port mapping.
    pub(crate) async fn create(
        name: String,
        component_count: usize,
        is_controlling: bool,
        upnp: Option<Arc<UpnpController>>,
        timers: Arc<TimerHeap>,
    ) -> Result<Self> {
        if component_count == 0 {
            return Err(IceError::InitFailed("component_count must be >= 1".to_string()));
        }

        let local_ufrag = random_ice_token(8);
        let local_pwd = random_ice_token(24);

        let mut components = Vec::with_capacity(component_count);
        let mut local_candidates = Vec::new();

        for i in 0..component_count {
            let socket = UdpSocket::bind("127.0.0.1:0")
                .await
                .map_err(|e| IceError::InitFailed(e.to_string()))?;
            let local_addr = socket
                .local_addr()
                .map_err(|e| IceError::InitFailed(e.to_string()))?;

            let component_no = (i + 1) as u32;
            let host_candidate = Candidate {
                foundation: format!("f{component_no}"),
                component: component_no,
                priority: 2_130_706_431 - i as u32,
                address: corephone_ipaddr::IpAddress::from_socket_addr(local_addr),
                candidate_type: CandidateType::Host,
            };
            local_candidates.push(host_candidate);

            components.push(Arc::new(Component {
                socket,
                delivery: Mutex::new(Delivery::default()),
                validated_remote: RwLock::new(None),
                data_notify: Notify::new(),
            }));
        }

        let mut upnp_held = Vec::new();
        if let Some(upnp) = &upnp {
            // Resolved Open Question: augment host candidates only
            // (RFC 8445 best practice; see DESIGN.md).
            let host_ports: Vec<(usize, u16)> = local_candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| c.candidate_type == CandidateType::Host)
                .map(|(i, c)| (i, c.address.port()))
                .collect();

            for (i, internal_port) in host_ports {
                let mut mapped_port = 0u16;
                let mapped = upnp
                    .add_any_mapping(internal_port, UpnpProtocol::Udp, false, &mut mapped_port)
                    .await;
                if !mapped {
                    continue;
                }
                let Some(external_ip) = upnp.external_ip().await else {
                    continue;
                };
                upnp_held.push((UpnpProtocol::Udp, mapped_port));
                let component_no = local_candidates[i].component;
                local_candidates.push(Candidate {
                    foundation: format!("f{component_no}-srflx"),
                    component: component_no,
                    priority: 1_694_498_815 - i as u32,
                    address: corephone_ipaddr::IpAddress::from_ip(external_ip.addr(), mapped_port),
                    candidate_type: CandidateType::ServerReflexive,
                });
            }
        }

        let mut transport = Self {
            name,
            role: Mutex::new(if is_controlling {
                IceRole::Controlling
            } else {
                IceRole::Controlled
            }),
            role_fixed: AtomicBool::new(false),
            local_ufrag,
            local_pwd,
            local_candidates: Mutex::new(local_candidates),
            components,
            recv_tasks: Vec::new(),
            init: WaitGate::new(),
            negotiation: WaitGate::new(),
            upnp_held: Mutex::new(upnp_held),
            upnp,
            timers,
        };

        transport.spawn_receive_loops();
        transport.init.complete(true);
        debug!(name = %transport.name, "ICE transport initialised");
        Ok(transport)
    }

    fn spawn_receive_loops(&mut self) {
        for (idx, component) in self.components.iter().enumerate() {
            let component = component.clone();
            let handle = tokio::spawn(async move {
                let mut buf = vec![0u8; RECV_BUF_SIZE];
                loop {
                    match component.socket.recv_from(&mut buf).await {
                        Ok((n, from)) => {
                            if component.validated_remote.read().is_none() {
                                *component.validated_remote.write() = Some(from);
                            }
                            component
                                .delivery
                                .lock()
                                .deliver(Packet::new(Bytes::copy_from_slice(&buf[..n])));
                            component.data_notify.notify_waiters();
                        }
                        Err(e) => {
                            warn!(component = idx, error = %e, "ICE component recv failed");
                            break;
                        }
                    }
                }
            });
            self.recv_tasks.push(handle);
        }
    }

    /// Change the role before negotiation begins. A no-op once `start()`
    /// has been called (§4.K.1: "after `start()` the role is fixed").
    pub fn set_role(&self, role: IceRole) {
        if !self.role_fixed.load(Ordering::SeqCst) {
            *self.role.lock() = role;
        }
    }

    /// Current role.
    pub fn role(&self) -> IceRole {
        *self.role.lock()
    }

    /// Number of media components this transport multiplexes.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Block up to `timeout` for initialisation to complete. Since
    /// [`IceTransport::create`] only returns once init has succeeded,
    /// this always returns [`WaitResult::Success`] immediately — kept
    /// for API parity with [`IceTransport::wait_for_negotiation`] and
    /// the source's two-waiter shape.
    pub async fn wait_for_init(&self, timeout: Duration) -> WaitResult {
        self.init.wait(timeout).await
    }

    /// Block up to `timeout` for negotiation to complete.
    pub async fn wait_for_negotiation(&self, timeout: Duration) -> WaitResult {
        self.negotiation.wait(timeout).await
    }

    /// The local ufrag/password/candidate blob in the exact exchange
    /// format: `ufrag\npwd\ncandidate1\n…\ncandidateN\n`.
    pub fn local_attributes_and_candidates(&self) -> String {
        let mut out = format!("{}\n{}\n", self.local_ufrag, self.local_pwd);
        for candidate in self.local_candidates.lock().iter() {
            out.push_str(&candidate.to_line());
            out.push('\n');
        }
        out
    }

    /// Local candidates gathered so far (host plus any UPnP-augmented
    /// server-reflexive candidates).
    pub fn local_candidates(&self) -> Vec<Candidate> {
        self.local_candidates.lock().clone()
    }

    /// Start negotiation from already-parsed remote attributes. Fixes
    /// the role and fails hard with [`IceError::NegotiationFailed`] if
    /// `remote_candidates` is empty.
    pub fn start(
        &self,
        _remote_ufrag: &str,
        _remote_pwd: &str,
        remote_candidates: &[Candidate],
    ) -> Result<()> {
        self.role_fixed.store(true, Ordering::SeqCst);

        if remote_candidates.is_empty() {
            self.negotiation.complete(false);
            return Err(IceError::NegotiationFailed(
                "remote candidate list is empty".to_string(),
            ));
        }

        let mut paired = 0usize;
        for (idx, component) in self.components.iter().enumerate() {
            let component_no = (idx + 1) as u32;
            // Prefer a host candidate if present, then fall back to the
            // first candidate for this component, matching "the first
            // remote candidate naming that component" with host
            // preferred as the (coarse) higher-priority type.
            let chosen = remote_candidates
                .iter()
                .filter(|c| c.component == component_no)
                .max_by_key(|c| c.priority);
            if let Some(candidate) = chosen {
                *component.validated_remote.write() = Some(candidate.address.to_socket_addr());
                paired += 1;
            }
        }

        if paired == 0 {
            self.negotiation.complete(false);
            return Err(IceError::NegotiationFailed(
                "no component found a matching remote candidate".to_string(),
            ));
        }

        self.negotiation.complete(true);
        debug!(name = %self.name, paired, "ICE negotiation complete");
        Ok(())
    }

    /// Parse `blob` (the format [`IceTransport::local_attributes_and_candidates`]
    /// produces) and start negotiation from it. Malformed candidate lines
    /// are skipped with a warning rather than failing the whole blob;
    /// the hard failure is reserved for an empty resulting candidate
    /// list.
    pub fn start_from_blob(&self, blob: &str) -> Result<()> {
        let mut lines = blob.lines();
        let ufrag = lines.next().unwrap_or_default();
        let pwd = lines.next().unwrap_or_default();
        let mut candidates = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            match Candidate::parse_line(line) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => warn!(line, error = %e, "skipping malformed remote candidate line"),
            }
        }
        self.start(ufrag, pwd, &candidates)
    }

    fn component(&self, component: usize) -> Result<&Component> {
        self.components
            .get(component)
            .map(Arc::as_ref)
            .ok_or(IceError::InvalidComponent(component))
    }

    /// Install a receive callback for `component`. Any packets already
    /// queued are drained through it synchronously first (§4.K.2, §9).
    pub fn set_on_receive(
        &self,
        component: usize,
        callback: impl Fn(Bytes) + Send + Sync + 'static,
    ) -> Result<()> {
        let component = self.component(component)?;
        let boxed: ReceiveCallback = Box::new(callback);
        component.delivery.lock().install_callback(boxed);
        Ok(())
    }

    /// Pop the oldest queued packet for `component` into `buf`, copying
    /// at most `buf.len()` bytes (the remaining tail is dropped, never
    /// re-delivered). Returns `0` immediately if nothing is queued.
    pub fn recv(&self, component: usize, buf: &mut [u8]) -> Result<usize> {
        let component = self.component(component)?;
        let Some(packet) = component.delivery.lock().pop() else {
            return Ok(0);
        };
        let n = packet.len().min(buf.len());
        buf[..n].copy_from_slice(&packet.data[..n]);
        Ok(n)
    }

    /// Size of the oldest queued packet for `component`, without
    /// consuming it.
    pub fn next_packet_size(&self, component: usize) -> Result<Option<usize>> {
        let component = self.component(component)?;
        Ok(component.delivery.lock().peek_size())
    }

    /// Block up to `timeout` for a packet to become available on
    /// `component` (already-queued packets return immediately).
    pub async fn wait_for_data(&self, component: usize, timeout: Duration) -> Result<bool> {
        let component = self.component(component)?;
        if component.delivery.lock().has_queued() {
            return Ok(true);
        }
        let notified = component.data_notify.notified();
        tokio::pin!(notified);
        if component.delivery.lock().has_queued() {
            return Ok(true);
        }
        Ok(tokio::time::timeout(timeout, notified).await.is_ok())
    }

    /// Send `bytes` on `component` to its validated remote pair. Returns
    /// [`IceError::NoValidatedPair`] — the typed replacement for the
    /// source's `-1` — if negotiation hasn't produced one yet.
    pub async fn send(&self, component: usize, bytes: &[u8]) -> Result<usize> {
        let comp = self.component(component)?;
        let Some(addr) = *comp.validated_remote.read() else {
            return Err(IceError::NoValidatedPair(component));
        };
        comp.socket
            .send_to(bytes, addr)
            .await
            .map_err(|e| IceError::NegotiationFailed(e.to_string()))
    }
}

impl Drop for IceTransport {
    fn drop(&mut self) {
        for handle in &self.recv_tasks {
            handle.abort();
        }
        if let Some(upnp) = self.upnp.clone() {
            let held = std::mem::take(&mut *self.upnp_held.lock());
            if !held.is_empty() {
                tokio::spawn(async move {
                    for (proto, port) in held {
                        if let Err(e) = upnp.remove_mapping(port, proto).await {
                            warn!(error = %e, port, "failed to release UPnP mapping on transport drop");
                        }
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::IceTransportFactory;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    async fn transport(factory: &IceTransportFactory, controlling: bool) -> IceTransport {
        factory
            .create_transport("audio", 2, controlling, false)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn local_blob_has_ufrag_pwd_and_one_line_per_component() {
        let factory = IceTransportFactory::with_defaults();
        let t = transport(&factory, true).await;
        let blob = t.local_attributes_and_candidates();
        let mut lines = blob.lines();
        assert!(!lines.next().unwrap().is_empty()); // ufrag
        assert!(!lines.next().unwrap().is_empty()); // pwd
        let candidate_lines: Vec<&str> = lines.collect();
        assert!(candidate_lines.len() >= 2);
        assert!(candidate_lines[0].contains("typ host"));
        factory.shutdown().await;
    }

    #[tokio::test]
    async fn negotiation_fails_hard_on_empty_remote_candidates() {
        let factory = IceTransportFactory::with_defaults();
        let t = transport(&factory, true).await;
        assert!(t.start("ufrag", "pwd", &[]).is_err());
        assert_eq!(
            t.wait_for_negotiation(Duration::from_millis(10)).await,
            WaitResult::Failure
        );
        factory.shutdown().await;
    }

    #[tokio::test]
    async fn two_transports_exchange_candidates_and_talk_over_loopback() {
        let factory = IceTransportFactory::with_defaults();
        let a = transport(&factory, true).await;
        let b = transport(&factory, false).await;

        let blob_a = a.local_attributes_and_candidates();
        let blob_b = b.local_attributes_and_candidates();
        b.start_from_blob(&blob_a).unwrap();
        a.start_from_blob(&blob_b).unwrap();

        assert_eq!(
            a.wait_for_negotiation(Duration::from_secs(5)).await,
            WaitResult::Success
        );
        assert_eq!(
            b.wait_for_negotiation(Duration::from_secs(5)).await,
            WaitResult::Success
        );

        let payload = b"hello over ice";
        let n = a.send(0, payload).await.unwrap();
        assert_eq!(n, payload.len());

        assert!(b.wait_for_data(0, Duration::from_secs(1)).await.unwrap());
        let mut buf = [0u8; 64];
        let read = b.recv(0, &mut buf).unwrap();
        assert_eq!(&buf[..read], payload);

        factory.shutdown().await;
    }

    #[tokio::test]
    async fn recv_truncates_when_buffer_too_small() {
        let factory = IceTransportFactory::with_defaults();
        let a = transport(&factory, true).await;
        let b = transport(&factory, false).await;
        b.start_from_blob(&a.local_attributes_and_candidates()).unwrap();
        a.start_from_blob(&b.local_attributes_and_candidates()).unwrap();
        b.wait_for_negotiation(Duration::from_secs(5)).await;

        a.send(0, b"0123456789").await.unwrap();
        b.wait_for_data(0, Duration::from_secs(1)).await.unwrap();
        let mut small = [0u8; 4];
        let read = b.recv(0, &mut small).unwrap();
        assert_eq!(read, 4);
        assert_eq!(&small, b"0123");
        // the truncated tail is gone, not re-delivered
        assert_eq!(b.next_packet_size(0).unwrap(), None);

        factory.shutdown().await;
    }

    #[tokio::test]
    async fn set_on_receive_drains_queue_then_bypasses_it() {
        let factory = IceTransportFactory::with_defaults();
        let a = transport(&factory, true).await;
        let b = transport(&factory, false).await;
        b.start_from_blob(&a.local_attributes_and_candidates()).unwrap();
        a.start_from_blob(&b.local_attributes_and_candidates()).unwrap();
        b.wait_for_negotiation(Duration::from_secs(5)).await;

        a.send(0, b"queued").await.unwrap();
        b.wait_for_data(0, Duration::from_secs(1)).await.unwrap();

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        b.set_on_receive(0, move |bytes| seen_cb.lock().push(bytes)).unwrap();
        assert_eq!(seen.lock().len(), 1);

        a.send(0, b"direct").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.lock().len(), 2);

        factory.shutdown().await;
    }

    #[tokio::test]
    async fn send_without_negotiation_is_typed_error_not_panic() {
        let factory = IceTransportFactory::with_defaults();
        let a = transport(&factory, true).await;
        let err = a.send(0, b"too early").await.unwrap_err();
        assert!(matches!(err, IceError::NoValidatedPair(0)));
        factory.shutdown().await;
    }

    #[tokio::test]
    async fn upnp_augments_host_candidates_with_server_reflexive() {
        let upnp_client = Arc::new(corephone_upnp::MockIgdClient::new(
            Ipv4Addr::new(203, 0, 113, 7),
            52000,
        ));
        let table = corephone_upnp::MappingTable::shared();
        let upnp = Arc::new(UpnpController::new(upnp_client, table));
        let factory = IceTransportFactory::new(crate::config::IceConfig::default(), Some(upnp));

        let t = factory.create_transport("audio", 1, true, true).await.unwrap();
        let candidates = t.local_candidates();
        assert!(candidates.iter().any(|c| c.candidate_type == CandidateType::Host));
        assert!(candidates
            .iter()
            .any(|c| c.candidate_type == CandidateType::ServerReflexive
                && c.address.to_display_string(false, false) == "203.0.113.7"));
        factory.shutdown().await;
    }
}
