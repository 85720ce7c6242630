//! A thin per-component view over an [`IceTransport`] (§4.L).
//!
//! `IceSocket` exists so a `Call` can hand out a narrower handle than
//! the whole transport to whatever owns a single media stream, without
//! that owner needing to track a component index alongside a transport
//! reference.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::transport::IceTransport;

/// `{transport, component}`, forwarding every operation to the
/// transport scoped to that component. Dropping (or calling
/// [`IceSocket::close`]) just drops this `Arc` handle — construction
/// never extends the transport's lifetime beyond what other holders
/// already keep it alive for.
pub struct IceSocket {
    transport: Arc<IceTransport>,
    component: usize,
}

impl IceSocket {
    /// A socket scoped to `component` on `transport`.
    pub fn new(transport: Arc<IceTransport>, component: usize) -> Self {
        Self { transport, component }
    }

    /// Send `bytes` to this component's validated remote pair.
    pub async fn send(&self, bytes: &[u8]) -> Result<usize> {
        self.transport.send(self.component, bytes).await
    }

    /// Pop the oldest queued packet into `buf`.
    pub fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        self.transport.recv(self.component, buf)
    }

    /// Size of the oldest queued packet, without consuming it.
    pub fn next_packet_size(&self) -> Result<Option<usize>> {
        self.transport.next_packet_size(self.component)
    }

    /// Block up to `timeout` for a packet to arrive.
    pub async fn wait_for_data(&self, timeout: Duration) -> Result<bool> {
        self.transport.wait_for_data(self.component, timeout).await
    }

    /// Install a receive callback on this component.
    pub fn set_on_receive(&self, callback: impl Fn(Bytes) + Send + Sync + 'static) -> Result<()> {
        self.transport.set_on_receive(self.component, callback)
    }

    /// Drop this socket's hold on the transport. Equivalent to letting
    /// the socket go out of scope; kept as an explicit method for
    /// symmetry with the source's `close()`.
    pub fn close(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::IceTransportFactory;

    #[tokio::test]
    async fn socket_forwards_send_recv_to_its_component() {
        let factory = IceTransportFactory::with_defaults();
        let a = Arc::new(
            factory
                .create_transport("audio", 2, true, false)
                .await
                .unwrap(),
        );
        let b = Arc::new(
            factory
                .create_transport("audio", 2, false, false)
                .await
                .unwrap(),
        );
        b.start_from_blob(&a.local_attributes_and_candidates()).unwrap();
        a.start_from_blob(&b.local_attributes_and_candidates()).unwrap();

        let socket_a = IceSocket::new(a.clone(), 0);
        let socket_b = IceSocket::new(b.clone(), 0);

        socket_a.send(b"via socket").await.unwrap();
        assert!(socket_b
            .wait_for_data(Duration::from_secs(1))
            .await
            .unwrap());
        let mut buf = [0u8; 32];
        let n = socket_b.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"via socket");

        factory.shutdown().await;
    }

    #[tokio::test]
    async fn close_drops_without_touching_other_holders() {
        let factory = IceTransportFactory::with_defaults();
        let transport = Arc::new(
            factory
                .create_transport("audio", 1, true, false)
                .await
                .unwrap(),
        );
        let socket = IceSocket::new(transport.clone(), 0);
        socket.close();
        assert_eq!(transport.component_count(), 1);
        factory.shutdown().await;
    }
}
