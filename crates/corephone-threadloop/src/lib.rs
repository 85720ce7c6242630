//! Scoped worker loop with setup/process/cleanup hooks and cooperative stop.
//!
//! This is the one worker abstraction every long-lived background task in
//! the core is built on — most notably the ICE transport factory's event
//! pump (`corephone-ice`). The original design threw a sentinel exception
//! to unwind the process loop on `exit()`; here that unwind is a plain
//! control-flow value (see [`LoopSignal`]), never a panic.
//!
//! # Examples
//!
//! ```rust
//! use corephone_threadloop::{LoopBody, LoopSignal, ThreadLoop};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use async_trait::async_trait;
//!
//! struct Counter {
//!     count: Arc<AtomicUsize>,
//! }
//!
//! #[async_trait]
//! impl LoopBody for Counter {
//!     async fn setup(&mut self) -> bool {
//!         true
//!     }
//!
//!     async fn process(&mut self) -> LoopSignal {
//!         let n = self.count.fetch_add(1, Ordering::SeqCst);
//!         if n >= 2 {
//!             LoopSignal::Exit
//!         } else {
//!             LoopSignal::Continue
//!         }
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let count = Arc::new(AtomicUsize::new(0));
//! let mut looop = ThreadLoop::new(Counter { count: count.clone() });
//! looop.start().unwrap();
//! looop.join().await;
//! assert!(count.load(Ordering::SeqCst) >= 3);
//! # }
//! ```

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Errors a [`ThreadLoop`] can report.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThreadLoopError {
    /// `start()` was called while the worker was already running.
    #[error("thread loop is already running")]
    AlreadyRunning,
}

/// What [`LoopBody::process`] wants the driving loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopSignal {
    /// Keep calling `process()`.
    Continue,
    /// Stop the loop and run `cleanup()`. This is the control-flow
    /// replacement for the source implementation's "exit" exception.
    Exit,
}

/// The work a [`ThreadLoop`] drives.
///
/// `setup` runs exactly once before the first `process`; if it returns
/// `false` the worker exits immediately and `cleanup` is *not* called,
/// mirroring "setup failed, there is nothing to clean up".
#[async_trait]
pub trait LoopBody: Send + 'static {
    /// One-time setup. Returning `false` aborts the run before any
    /// `process()` call.
    async fn setup(&mut self) -> bool {
        true
    }

    /// Called repeatedly while the loop is running.
    async fn process(&mut self) -> LoopSignal;

    /// Called once after the loop stops, provided `setup` succeeded.
    async fn cleanup(&mut self) {}
}

/// Owns exactly one background worker built from a [`LoopBody`].
pub struct ThreadLoop<B: LoopBody> {
    body: Option<B>,
    running: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
    stop_notify: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl<B: LoopBody> ThreadLoop<B> {
    /// Wrap a [`LoopBody`]; the worker is not started yet.
    pub fn new(body: B) -> Self {
        Self {
            body: Some(body),
            running: Arc::new(AtomicBool::new(false)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            stop_notify: Arc::new(Notify::new()),
            handle: None,
        }
    }

    /// `true` while the worker task is alive (between `start()` and the
    /// point its loop actually exits).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the worker. Idempotent-refused if already running: this
    /// never spawns a second worker for the same `ThreadLoop`.
    pub fn start(&mut self) -> Result<(), ThreadLoopError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ThreadLoopError::AlreadyRunning);
        }

        let mut body = match self.body.take() {
            Some(b) => b,
            None => {
                self.running.store(false, Ordering::SeqCst);
                return Err(ThreadLoopError::AlreadyRunning);
            }
        };

        self.stop_requested.store(false, Ordering::SeqCst);
        let running = self.running.clone();
        let stop_requested = self.stop_requested.clone();
        let stop_notify = self.stop_notify.clone();

        let handle = tokio::spawn(async move {
            if !body.setup().await {
                debug!("thread loop setup() returned false, exiting without cleanup");
                running.store(false, Ordering::SeqCst);
                stop_notify.notify_waiters();
                return;
            }

            loop {
                if stop_requested.load(Ordering::SeqCst) {
                    trace!("thread loop observed stop request");
                    break;
                }
                match body.process().await {
                    LoopSignal::Continue => continue,
                    LoopSignal::Exit => {
                        trace!("thread loop body requested exit");
                        break;
                    }
                }
            }

            body.cleanup().await;
            running.store(false, Ordering::SeqCst);
            stop_notify.notify_waiters();
        });

        self.handle = Some(handle);
        Ok(())
    }

    /// Flip the cooperative stop flag. The worker observes this between
    /// `process()` iterations; it does not interrupt an in-flight call.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// `stop()` followed by waiting for the worker to actually finish.
    pub async fn join(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("thread loop worker task panicked: {e}");
            }
        }
    }
}

impl<B: LoopBody> Drop for ThreadLoop<B> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            debug_assert!(
                !self.running.load(Ordering::SeqCst),
                "ThreadLoop dropped without join(): worker may still be running"
            );
            self.stop();
        }
    }
}
