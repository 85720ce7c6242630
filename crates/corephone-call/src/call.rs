//! The `Call` object: attributes, the action/event entry points, and the
//! conference membership bookkeeping that rides alongside them (§3,
//! §4.H).

use chrono::{DateTime, Utc};
use corephone_account::Account;
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::state::{
    apply_action, apply_event, CallAction, CallDirection, CallEffect, CallState, ConnectionState,
    HistoryState, RemoteEvent,
};
use crate::Result;

/// A single call (or, when `is_conference` is set, a conference leg
/// grouping other calls together). `Call` holds a weak back-reference to
/// its account: it stores the account's id, not the [`Account`] itself,
/// so callers pass the `Account` in wherever a detail lookup is needed
/// (see [`Call::is_secure`]).
#[derive(Debug, Clone)]
pub struct Call {
    id: Uuid,
    account_id: String,
    direction: CallDirection,
    state: CallState,
    connection_state: ConnectionState,
    history_state: HistoryState,
    peer_number: String,
    peer_name: String,
    recording: bool,
    recording_path: Option<String>,
    start_ts: Option<DateTime<Utc>>,
    stop_ts: Option<DateTime<Utc>>,
    added_ts: DateTime<Utc>,

    /// Set once the call has ever reached `Current`, used to resolve
    /// `history_state` at the `Over` transition.
    ever_current: bool,
    /// Set once the call has ever reached `Busy`.
    ever_busy: bool,

    is_conference: bool,
    /// Present only when `is_conference` is set: the ids of the calls
    /// folded into this conference.
    children: HashSet<Uuid>,
    /// Present only on a non-conference call that has been folded into
    /// one: the conference's id.
    parent_conference: Option<Uuid>,
}

impl Call {
    fn new(
        account_id: impl Into<String>,
        direction: CallDirection,
        state: CallState,
        peer_number: impl Into<String>,
        peer_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id: account_id.into(),
            direction,
            state,
            connection_state: ConnectionState::Disconnected,
            history_state: HistoryState::None,
            peer_number: peer_number.into(),
            peer_name: peer_name.into(),
            recording: false,
            recording_path: None,
            start_ts: None,
            stop_ts: None,
            added_ts: Utc::now(),
            ever_current: false,
            ever_busy: false,
            is_conference: false,
            children: HashSet::new(),
            parent_conference: None,
        }
    }

    /// An outgoing call, born in `Dialing` with a tentative
    /// `HistoryState::None` (resolved properly when it reaches `Over`).
    pub fn new_dialing(
        account_id: impl Into<String>,
        peer_number: impl Into<String>,
        peer_name: impl Into<String>,
    ) -> Self {
        Self::new(account_id, CallDirection::Outgoing, CallState::Dialing, peer_number, peer_name)
    }

    /// An incoming call, born in `Incoming`. `history_state` starts as
    /// `Missed` — it is only ever upgraded to `Incoming` if the call is
    /// later answered, matching the unanswered-call scenario's
    /// requirement that history reflects a missed call the moment it
    /// arrives, not only once it terminates.
    pub fn new_incoming(
        account_id: impl Into<String>,
        peer_number: impl Into<String>,
        peer_name: impl Into<String>,
    ) -> Self {
        let mut call =
            Self::new(account_id, CallDirection::Incoming, CallState::Incoming, peer_number, peer_name);
        call.history_state = HistoryState::Missed;
        call
    }

    /// A call already ringing at the remote end, born directly in
    /// `Ringing` (used when signalling reports the 180-equivalent before
    /// the registry has seen any earlier state for this call).
    pub fn new_ringing(
        account_id: impl Into<String>,
        peer_number: impl Into<String>,
        peer_name: impl Into<String>,
    ) -> Self {
        Self::new(account_id, CallDirection::Outgoing, CallState::Ringing, peer_number, peer_name)
    }

    /// A conference `Call` materialised from a daemon-supplied
    /// `conf_id` (§4.I `add_conference`, observer of the daemon's
    /// `conference_created` event). Born with no children and no
    /// account — participants are folded in afterwards through
    /// `CallRegistry::add_participant`, each carrying their own account.
    pub(crate) fn new_conference(conf_id: Uuid) -> Self {
        let mut call = Self::new("", CallDirection::Outgoing, CallState::Conference, "", "conference");
        call.id = conf_id;
        call.is_conference = true;
        call.connection_state = ConnectionState::Connected;
        call
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn direction(&self) -> CallDirection {
        self.direction
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn history_state(&self) -> HistoryState {
        self.history_state
    }

    pub fn peer_number(&self) -> &str {
        &self.peer_number
    }

    pub fn peer_name(&self) -> &str {
        &self.peer_name
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn recording_path(&self) -> Option<&str> {
        self.recording_path.as_deref()
    }

    pub fn start_ts(&self) -> Option<DateTime<Utc>> {
        self.start_ts
    }

    pub fn stop_ts(&self) -> Option<DateTime<Utc>> {
        self.stop_ts
    }

    pub fn added_ts(&self) -> DateTime<Utc> {
        self.added_ts
    }

    pub fn is_conference(&self) -> bool {
        self.is_conference
    }

    pub fn conference_children(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.children.iter().copied()
    }

    pub fn parent_conference(&self) -> Option<Uuid> {
        self.parent_conference
    }

    /// Whether this call's media path is considered secure, derived
    /// from the owning account's TLS/SRTP detail flags (§4.H.3). `Call`
    /// does not own an `Account`, so the caller supplies it — typically
    /// the registry, looked up by `account_id()`. This is an OR of three
    /// independent terms, not an AND: a TLS-only account and an
    /// SRTP-only account are each secure on their own.
    pub fn is_secure(&self, account: &Account) -> bool {
        let tls_enabled = account.get("TLS.enable") == "true";
        let tls_method = account.get("TLS.method") != "0";
        let srtp = account.get("SRTP.enable") == "true" && account.get("SRTP.rtpFallback") != "true";
        tls_enabled || tls_method || srtp
    }

    /// Apply a local user action, mutating state and any side-states it
    /// carries (recording flag, timestamps), and return the effect the
    /// caller must execute.
    pub fn perform_action(&mut self, action: CallAction) -> Result<CallEffect> {
        let (next, effect) = apply_action(self.state, action)?;
        debug!(call_id = %self.id, ?self.state, ?action, ?next, ?effect, "call action");
        if effect == CallEffect::ToggleRecord {
            self.recording = !self.recording;
        }
        if matches!(effect, CallEffect::AnswerCall | CallEffect::AnswerAndHold) {
            self.start_ts = Some(Utc::now());
            self.connection_state = ConnectionState::Connected;
        }
        self.transition_to(next);
        Ok(effect)
    }

    /// Apply a remote signalling event.
    pub fn handle_event(&mut self, event: RemoteEvent) {
        let (next, starts_timer) = apply_event(self.state, event);
        debug!(call_id = %self.id, ?self.state, ?event, ?next, starts_timer, "call event");
        if starts_timer {
            self.start_ts = Some(Utc::now());
        }
        if matches!(event, RemoteEvent::Current) {
            self.connection_state = ConnectionState::Connected;
        }
        self.transition_to(next);
    }

    fn transition_to(&mut self, next: CallState) {
        if next == self.state {
            return;
        }
        match next {
            CallState::Current => self.ever_current = true,
            CallState::Busy => self.ever_busy = true,
            _ => {}
        }
        if next == CallState::Over && self.state != CallState::Over {
            self.stop_ts = Some(Utc::now());
            self.history_state = self.resolve_history_state();
            info!(call_id = %self.id, history_state = ?self.history_state, "call reached Over");
        }
        self.state = next;
    }

    /// History-state assignment, run exactly once at the `Over`
    /// transition. `ever_busy && !ever_current` resolves to `Outgoing`
    /// regardless of direction — a deliberately literal carry-over from
    /// the source behaviour rather than a principled rule.
    fn resolve_history_state(&self) -> HistoryState {
        if self.ever_busy && !self.ever_current {
            return HistoryState::Outgoing;
        }
        match (self.direction, self.ever_current) {
            (CallDirection::Incoming, true) => HistoryState::Incoming,
            (CallDirection::Incoming, false) => HistoryState::Missed,
            (CallDirection::Outgoing, true) => HistoryState::Outgoing,
            (CallDirection::Outgoing, false) => HistoryState::None,
        }
    }

    pub(crate) fn mark_as_conference(&mut self, children: HashSet<Uuid>) {
        self.is_conference = true;
        self.children = children;
        self.state = CallState::Conference;
        self.connection_state = ConnectionState::Connected;
    }

    pub(crate) fn set_parent_conference(&mut self, conf_id: Uuid) {
        self.parent_conference = Some(conf_id);
    }

    pub(crate) fn clear_parent_conference(&mut self) {
        self.parent_conference = None;
    }

    pub(crate) fn add_child(&mut self, child: Uuid) {
        self.children.insert(child);
    }

    pub(crate) fn remove_child(&mut self, child: Uuid) {
        self.children.remove(&child);
    }

    pub(crate) fn set_state_raw(&mut self, state: CallState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CallAction;

    #[test]
    fn dialing_call_places_then_connects_then_hangs_up() {
        let mut call = Call::new_dialing("acc1", "+15551234", "Alice");
        assert_eq!(call.state(), CallState::Dialing);

        let effect = call.perform_action(CallAction::Accept).unwrap();
        assert_eq!(effect, CallEffect::PlaceCall);
        assert_eq!(call.state(), CallState::Dialing);

        call.handle_event(RemoteEvent::Ringing);
        assert_eq!(call.state(), CallState::Ringing);

        call.handle_event(RemoteEvent::Current);
        assert_eq!(call.state(), CallState::Current);
        assert!(call.start_ts().is_none(), "Ringing->Current doesn't start the timer");

        call.handle_event(RemoteEvent::HungUp);
        assert_eq!(call.state(), CallState::Over);
        assert!(call.stop_ts().is_some());
        assert_eq!(call.history_state(), HistoryState::Outgoing);
    }

    #[test]
    fn answered_incoming_call_stamps_start_ts_before_hangup() {
        let mut call = Call::new_incoming("acc1", "+15558888", "Dana");
        call.perform_action(CallAction::Accept).unwrap();
        assert_eq!(call.state(), CallState::Current);
        assert!(call.start_ts().is_some(), "answering must stamp start_ts immediately");
        assert_eq!(call.connection_state(), ConnectionState::Connected);

        call.handle_event(RemoteEvent::HungUp);
        assert_eq!(call.state(), CallState::Over);
        assert!(call.start_ts().is_some());
        assert!(call.stop_ts().is_some());
        assert!(call.start_ts().unwrap() <= call.stop_ts().unwrap());
        assert_eq!(call.history_state(), HistoryState::Incoming);
    }

    #[test]
    fn incoming_call_ignored_stays_missed() {
        let mut call = Call::new_incoming("acc1", "+15559999", "Bob");
        assert_eq!(call.history_state(), HistoryState::Missed);
        call.perform_action(CallAction::Refuse).unwrap();
        assert_eq!(call.state(), CallState::Over);
        assert_eq!(call.history_state(), HistoryState::Missed);
    }

    #[test]
    fn busy_without_ever_connecting_files_as_outgoing() {
        let mut call = Call::new_dialing("acc1", "+15550000", "Carl");
        call.perform_action(CallAction::Accept).unwrap();
        call.handle_event(RemoteEvent::Busy);
        assert_eq!(call.state(), CallState::Busy);
        call.perform_action(CallAction::Refuse).unwrap();
        assert_eq!(call.history_state(), HistoryState::Outgoing);
    }
}
