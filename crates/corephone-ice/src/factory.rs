//! The long-lived ICE event pump and the transports it creates (§4.J).
//!
//! In the original design the pump owns a native timer heap and an I/O
//! multiplexer (epoll/kqueue) that every transport's sockets register
//! with. This reimplementation keeps the timer heap (see
//! [`crate::timer::TimerHeap`]) as an explicit owned resource, but
//! delegates the I/O multiplexer role to tokio's own reactor: each
//! [`crate::IceTransport`]'s component sockets are ordinary
//! `tokio::net::UdpSocket`s, and "running the multiplexer with the
//! remaining timeout" is exactly what the pump's bounded `sleep` models
//! while the transports' own recv tasks drive their sockets
//! independently on the runtime. The pump still exists as a real
//! long-lived worker — shutdown must still drain it before the process
//! exits — it just does not duplicate tokio's epoll loop.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use corephone_threadloop::{LoopBody, LoopSignal, ThreadLoop, ThreadLoopError};
use corephone_upnp::UpnpController;

use crate::config::IceConfig;
use crate::error::Result;
use crate::timer::TimerHeap;
use crate::transport::IceTransport;

struct EventPump {
    timers: Arc<TimerHeap>,
    config: IceConfig,
    shutdown: Arc<AtomicBool>,
}

#[async_trait]
impl LoopBody for EventPump {
    async fn process(&mut self) -> LoopSignal {
        if self.shutdown.load(Ordering::SeqCst) {
            return LoopSignal::Exit;
        }

        let now = Instant::now();
        let wait = self.timers.time_until_next(now, self.config.max_iteration_timeout);
        tokio::time::sleep(wait).await;

        let fired = self.timers.drain_expired(Instant::now());
        if !fired.is_empty() {
            debug!(count = fired.len(), "ICE event pump drained expired timers");
        }

        LoopSignal::Continue
    }

    async fn cleanup(&mut self) {
        debug!("ICE event pump stopped");
    }
}

/// Creates [`IceTransport`]s and runs the shared event pump they
/// register their timers with.
pub struct IceTransportFactory {
    pump: tokio::sync::Mutex<ThreadLoop<EventPump>>,
    timers: Arc<TimerHeap>,
    config: IceConfig,
    upnp: Option<Arc<UpnpController>>,
    shutdown: Arc<AtomicBool>,
}

impl IceTransportFactory {
    /// Build the factory and start its event pump. `upnp` is shared by
    /// every transport this factory creates with `upnp_enabled = true`.
    pub fn new(config: IceConfig, upnp: Option<Arc<UpnpController>>) -> Self {
        let timers = Arc::new(TimerHeap::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut pump = ThreadLoop::new(EventPump {
            timers: timers.clone(),
            config: config.clone(),
            shutdown: shutdown.clone(),
        });
        if let Err(ThreadLoopError::AlreadyRunning) = pump.start() {
            unreachable!("factory owns a brand-new ThreadLoop");
        }
        Self {
            pump: tokio::sync::Mutex::new(pump),
            timers,
            config,
            upnp,
            shutdown,
        }
    }

    /// A factory with the built-in default [`IceConfig`] and no UPnP
    /// controller.
    pub fn with_defaults() -> Self {
        Self::new(IceConfig::default(), None)
    }

    /// Create a new per-call ICE transport with `component_count`
    /// components (typically 2: RTP and RTCP).
    pub async fn create_transport(
        &self,
        name: impl Into<String>,
        component_count: usize,
        is_controlling: bool,
        upnp_enabled: bool,
    ) -> Result<IceTransport> {
        let upnp = if upnp_enabled { self.upnp.clone() } else { None };
        IceTransport::create(
            name.into(),
            component_count,
            is_controlling,
            upnp,
            self.timers.clone(),
        )
        .await
    }

    /// The configuration this factory's transports were built against.
    pub fn config(&self) -> &IceConfig {
        &self.config
    }

    /// Set the quit flag, wait for the pump to drain, and tear down. Safe
    /// to call more than once.
    pub async fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return; // already shut down
        }
        let mut pump = self.pump.lock().await;
        pump.join().await;
        debug!("ICE transport factory shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn factory_creates_a_transport_with_requested_components() {
        let factory = IceTransportFactory::with_defaults();
        let transport = factory
            .create_transport("audio", 2, true, false)
            .await
            .unwrap();
        assert_eq!(transport.component_count(), 2);
        factory.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let factory = IceTransportFactory::with_defaults();
        factory.shutdown().await;
        factory.shutdown().await;
    }
}
