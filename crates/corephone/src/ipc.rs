//! The IPC boundary to the surrounding daemon (§6): `SignallingSink` for
//! outbound requests this core issues, `SignallingSource` for inbound
//! events the daemon reports back. A real SIP/IAX adapter implements
//! both over the actual message bus; this crate ships only
//! [`MockSignalling`], an in-memory stand-in for tests and examples.

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::Result;

/// One inbound notification from the daemon side of the IPC boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignallingEvent {
    RegistrationStateChanged { account_id: String, new_state: String, code: Option<i32> },
    IncomingCall { account_id: String, call_id: Uuid },
    CallStateChanged { call_id: Uuid, state_name: String },
    ConferenceCreated { conf_id: Uuid },
    ConferenceStateChanged { conf_id: Uuid, state_name: String },
    ConferenceRemoved { conf_id: Uuid },
    IncomingMessage { call_id: Uuid, from: String, body: String },
    VoicemailNotify { account_id: String, count: u32 },
}

/// A stream of [`SignallingEvent`]s the daemon reports, consumed by
/// whatever drives the registry/account-list event loop.
#[async_trait]
pub trait SignallingSource: Send + Sync {
    /// Receive the next event, or `None` once the daemon side has
    /// closed its end permanently.
    async fn recv(&mut self) -> Option<SignallingEvent>;
}

/// Outbound requests this core issues to the daemon (§6's outbound
/// request list, narrowed to what the call/account/conference model
/// here actually drives).
#[async_trait]
pub trait SignallingSink: Send + Sync {
    async fn place_call(&self, account_id: &str, call_id: Uuid, target: &str) -> Result<()>;
    async fn accept(&self, call_id: Uuid) -> Result<()>;
    async fn refuse(&self, call_id: Uuid) -> Result<()>;
    async fn hangup(&self, call_id: Uuid) -> Result<()>;
    async fn hold(&self, call_id: Uuid) -> Result<()>;
    async fn unhold(&self, call_id: Uuid) -> Result<()>;
    async fn transfer(&self, call_id: Uuid, target: &str) -> Result<()>;
    async fn attended_transfer(&self, call_id: Uuid, target_call_id: Uuid) -> Result<()>;
    async fn set_recording(&self, call_id: Uuid, enabled: bool) -> Result<()>;
    async fn send_text(&self, call_id: Uuid, body: &str) -> Result<()>;
    async fn hangup_conference(&self, conf_id: Uuid) -> Result<()>;
    async fn hold_conference(&self, conf_id: Uuid) -> Result<()>;
    async fn unhold_conference(&self, conf_id: Uuid) -> Result<()>;
    async fn join_participant(&self, a: Uuid, b: Uuid) -> Result<()>;
    async fn add_participant(&self, call_id: Uuid, conf_id: Uuid) -> Result<()>;
    async fn detach_participant(&self, call_id: Uuid) -> Result<()>;
    async fn join_conference(&self, conf_a: Uuid, conf_b: Uuid) -> Result<()>;
}

/// One outbound request, as recorded by [`MockSignalling`] for tests to
/// assert against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedRequest {
    PlaceCall { account_id: String, call_id: Uuid, target: String },
    Accept(Uuid),
    Refuse(Uuid),
    Hangup(Uuid),
    Hold(Uuid),
    Unhold(Uuid),
    Transfer { call_id: Uuid, target: String },
    AttendedTransfer { call_id: Uuid, target_call_id: Uuid },
    SetRecording { call_id: Uuid, enabled: bool },
    SendText { call_id: Uuid, body: String },
    HangupConference(Uuid),
    HoldConference(Uuid),
    UnholdConference(Uuid),
    JoinParticipant { a: Uuid, b: Uuid },
    AddParticipant { call_id: Uuid, conf_id: Uuid },
    DetachParticipant(Uuid),
    JoinConference { conf_a: Uuid, conf_b: Uuid },
}

/// An in-memory, perfectly reliable implementation of both IPC traits.
/// [`SignallingSink`] calls are recorded rather than sent anywhere;
/// [`SignallingSource::recv`] drains a channel a test feeds through
/// [`MockSignalling::push_event`].
pub struct MockSignalling {
    requests: tokio::sync::Mutex<Vec<RecordedRequest>>,
    events_tx: mpsc::UnboundedSender<SignallingEvent>,
    events_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<SignallingEvent>>,
}

impl MockSignalling {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            requests: tokio::sync::Mutex::new(Vec::new()),
            events_tx,
            events_rx: tokio::sync::Mutex::new(events_rx),
        }
    }

    /// Queue an event for a subsequent [`SignallingSource::recv`] call
    /// to return.
    pub fn push_event(&self, event: SignallingEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Every request recorded so far, in issue order.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    async fn record(&self, req: RecordedRequest) {
        self.requests.lock().await.push(req);
    }
}

impl Default for MockSignalling {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignallingSource for MockSignalling {
    async fn recv(&mut self) -> Option<SignallingEvent> {
        self.events_rx.lock().await.recv().await
    }
}

#[async_trait]
impl SignallingSink for MockSignalling {
    async fn place_call(&self, account_id: &str, call_id: Uuid, target: &str) -> Result<()> {
        self.record(RecordedRequest::PlaceCall {
            account_id: account_id.to_string(),
            call_id,
            target: target.to_string(),
        })
        .await;
        Ok(())
    }

    async fn accept(&self, call_id: Uuid) -> Result<()> {
        self.record(RecordedRequest::Accept(call_id)).await;
        Ok(())
    }

    async fn refuse(&self, call_id: Uuid) -> Result<()> {
        self.record(RecordedRequest::Refuse(call_id)).await;
        Ok(())
    }

    async fn hangup(&self, call_id: Uuid) -> Result<()> {
        self.record(RecordedRequest::Hangup(call_id)).await;
        Ok(())
    }

    async fn hold(&self, call_id: Uuid) -> Result<()> {
        self.record(RecordedRequest::Hold(call_id)).await;
        Ok(())
    }

    async fn unhold(&self, call_id: Uuid) -> Result<()> {
        self.record(RecordedRequest::Unhold(call_id)).await;
        Ok(())
    }

    async fn transfer(&self, call_id: Uuid, target: &str) -> Result<()> {
        self.record(RecordedRequest::Transfer { call_id, target: target.to_string() }).await;
        Ok(())
    }

    async fn attended_transfer(&self, call_id: Uuid, target_call_id: Uuid) -> Result<()> {
        self.record(RecordedRequest::AttendedTransfer { call_id, target_call_id }).await;
        Ok(())
    }

    async fn set_recording(&self, call_id: Uuid, enabled: bool) -> Result<()> {
        self.record(RecordedRequest::SetRecording { call_id, enabled }).await;
        Ok(())
    }

    async fn send_text(&self, call_id: Uuid, body: &str) -> Result<()> {
        self.record(RecordedRequest::SendText { call_id, body: body.to_string() }).await;
        Ok(())
    }

    async fn hangup_conference(&self, conf_id: Uuid) -> Result<()> {
        self.record(RecordedRequest::HangupConference(conf_id)).await;
        Ok(())
    }

    async fn hold_conference(&self, conf_id: Uuid) -> Result<()> {
        self.record(RecordedRequest::HoldConference(conf_id)).await;
        Ok(())
    }

    async fn unhold_conference(&self, conf_id: Uuid) -> Result<()> {
        self.record(RecordedRequest::UnholdConference(conf_id)).await;
        Ok(())
    }

    async fn join_participant(&self, a: Uuid, b: Uuid) -> Result<()> {
        self.record(RecordedRequest::JoinParticipant { a, b }).await;
        Ok(())
    }

    async fn add_participant(&self, call_id: Uuid, conf_id: Uuid) -> Result<()> {
        self.record(RecordedRequest::AddParticipant { call_id, conf_id }).await;
        Ok(())
    }

    async fn detach_participant(&self, call_id: Uuid) -> Result<()> {
        self.record(RecordedRequest::DetachParticipant(call_id)).await;
        Ok(())
    }

    async fn join_conference(&self, conf_a: Uuid, conf_b: Uuid) -> Result<()> {
        self.record(RecordedRequest::JoinConference { conf_a, conf_b }).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_outbound_requests_in_order() {
        let mock = MockSignalling::new();
        let call_id = Uuid::new_v4();
        mock.place_call("acc1", call_id, "sip:bob@example.com").await.unwrap();
        mock.hold(call_id).await.unwrap();
        mock.hangup(call_id).await.unwrap();

        let requests = mock.requests().await;
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1], RecordedRequest::Hold(call_id));
    }

    #[tokio::test]
    async fn source_drains_pushed_events_in_order() {
        let mut mock = MockSignalling::new();
        mock.push_event(SignallingEvent::VoicemailNotify { account_id: "acc1".to_string(), count: 3 });
        mock.push_event(SignallingEvent::ConferenceRemoved { conf_id: Uuid::new_v4() });

        let first = mock.recv().await.unwrap();
        assert!(matches!(first, SignallingEvent::VoicemailNotify { count: 3, .. }));
        let second = mock.recv().await.unwrap();
        assert!(matches!(second, SignallingEvent::ConferenceRemoved { .. }));
    }
}
