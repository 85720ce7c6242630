//! A one-shot, idempotent-after-completion wait gate, shared by
//! [`crate::IceTransport::wait_for_init`] and
//! [`crate::IceTransport::wait_for_negotiation`] (§4.K.3).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Outcome of a bounded wait. The typed replacement for the source's
/// `1`/`0`/`-1` return convention (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// The awaited condition completed successfully.
    Success,
    /// The awaited condition completed, but unsuccessfully.
    Failure,
    /// Neither happened before the timeout elapsed.
    Timeout,
}

/// A condition variable that remembers its outcome: once completed,
/// every subsequent [`WaitGate::wait`] returns immediately, matching
/// "after initialisation has succeeded once, `wait_for_init` returns
/// immediately".
#[derive(Default)]
pub struct WaitGate {
    done: AtomicBool,
    success: AtomicBool,
    notify: Notify,
}

impl WaitGate {
    /// A pending gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the condition as decided and wake every parked waiter.
    /// Idempotent: a second call does not change the recorded outcome.
    pub fn complete(&self, success: bool) {
        if !self.done.swap(true, Ordering::SeqCst) {
            self.success.store(success, Ordering::SeqCst);
        }
        self.notify.notify_waiters();
    }

    /// `true` once [`WaitGate::complete`] has been called.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    fn outcome(&self) -> WaitResult {
        if self.success.load(Ordering::SeqCst) {
            WaitResult::Success
        } else {
            WaitResult::Failure
        }
    }

    /// Block up to `timeout` for [`WaitGate::complete`] to be called.
    pub async fn wait(&self, timeout: Duration) -> WaitResult {
        if self.done.load(Ordering::SeqCst) {
            return self.outcome();
        }
        let notified = self.notify.notified();
        tokio::pin!(notified);
        if self.done.load(Ordering::SeqCst) {
            return self.outcome();
        }
        match tokio::time::timeout(timeout, notified).await {
            Ok(()) => self.outcome(),
            Err(_) => WaitResult::Timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_returns_immediately_once_completed() {
        let gate = WaitGate::new();
        gate.complete(true);
        assert_eq!(gate.wait(Duration::from_millis(10)).await, WaitResult::Success);
        assert_eq!(gate.wait(Duration::from_millis(10)).await, WaitResult::Success);
    }

    #[tokio::test]
    async fn wait_times_out_when_never_completed() {
        let gate = WaitGate::new();
        assert_eq!(gate.wait(Duration::from_millis(20)).await, WaitResult::Timeout);
    }

    #[tokio::test]
    async fn wait_wakes_up_on_completion_from_another_task() {
        let gate = Arc::new(WaitGate::new());
        let gate2 = gate.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            gate2.complete(false);
        });
        assert_eq!(
            gate.wait(Duration::from_secs(1)).await,
            WaitResult::Failure
        );
    }
}
