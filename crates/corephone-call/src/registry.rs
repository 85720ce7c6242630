//! The in-memory call table: creation, lookup, removal, and the
//! conference create/add/merge/detach operations (§4.H.2, §4.I).
//!
//! Mirrors [`corephone_account::AccountList`]'s concurrency style: plain
//! `&mut self` methods, no internal locking. The registry is mutated
//! only in response to daemon events and user actions, which are
//! already serialised by whatever drives this crate.

use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::call::Call;
use crate::error::CallError;
use crate::history::HistoryEntry;
use crate::Result;

/// Owns every live [`Call`] plus the history log of calls that have
/// reached `Over`.
#[derive(Debug, Default)]
pub struct CallRegistry {
    calls: HashMap<Uuid, Call>,
    history: Vec<HistoryEntry>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly-dialled outgoing call and return its id.
    pub fn add_dialing(
        &mut self,
        account_id: impl Into<String>,
        peer_number: impl Into<String>,
        peer_name: impl Into<String>,
    ) -> Uuid {
        let call = Call::new_dialing(account_id, peer_number, peer_name);
        let id = call.id();
        self.calls.insert(id, call);
        id
    }

    /// Register a new incoming call.
    pub fn add_incoming(
        &mut self,
        account_id: impl Into<String>,
        peer_number: impl Into<String>,
        peer_name: impl Into<String>,
    ) -> Uuid {
        let call = Call::new_incoming(account_id, peer_number, peer_name);
        let id = call.id();
        self.calls.insert(id, call);
        id
    }

    /// Register an outgoing call the signalling layer reports as
    /// already ringing.
    pub fn add_ringing(
        &mut self,
        account_id: impl Into<String>,
        peer_number: impl Into<String>,
        peer_name: impl Into<String>,
    ) -> Uuid {
        let call = Call::new_ringing(account_id, peer_number, peer_name);
        let id = call.id();
        self.calls.insert(id, call);
        id
    }

    /// Materialise a conference `Call` the daemon reports as already
    /// created (the `conference_created(conf_id)` event), with no
    /// children yet — they arrive through subsequent
    /// `add_participant`/`conference_state_changed` events. A no-op
    /// returning the existing conference if `conf_id` is already known,
    /// since a redelivered event must not clobber live membership.
    pub fn add_conference(&mut self, conf_id: Uuid) -> Uuid {
        if self.calls.contains_key(&conf_id) {
            return conf_id;
        }
        let conference = Call::new_conference(conf_id);
        self.calls.insert(conf_id, conference);
        info!(conference = %conf_id, "conference created (daemon-originated)");
        conf_id
    }

    pub fn get(&self, id: Uuid) -> Result<&Call> {
        self.calls.get(&id).ok_or(CallError::NotFound(id))
    }

    pub fn get_mut(&mut self, id: Uuid) -> Result<&mut Call> {
        self.calls.get_mut(&id).ok_or(CallError::NotFound(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Call> {
        self.calls.values()
    }

    /// Non-conference, top-level calls ordered by recency — "by
    /// popularity" here means most-recently-added first, matching how a
    /// UI call list is typically sorted.
    pub fn by_popularity(&self) -> Vec<&Call> {
        let mut calls: Vec<&Call> = self
            .calls
            .values()
            .filter(|c| c.parent_conference().is_none())
            .collect();
        calls.sort_by(|a, b| b.added_ts().cmp(&a.added_ts()));
        calls
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Remove a call that has reached `Over`, filing its history entry.
    /// Calls not yet `Over` are removed without a history entry (e.g.
    /// registry cleanup during shutdown).
    pub fn remove(&mut self, id: Uuid) -> Result<Call> {
        let call = self.calls.remove(&id).ok_or(CallError::NotFound(id))?;
        if call.state() == crate::state::CallState::Over {
            self.history.push(HistoryEntry::from_call(&call));
        }
        Ok(call)
    }

    /// Fold `children` (at least two) into a brand-new conference call,
    /// returning its id. Every child must currently be top-level (no
    /// parent conference already).
    pub fn create_conference(&mut self, children: &[Uuid]) -> Result<Uuid> {
        if children.len() < 2 {
            return Err(CallError::NotEnoughParticipants(children.len()));
        }
        for &child in children {
            let call = self.get(child)?;
            if call.parent_conference().is_some() {
                return Err(CallError::AlreadyInConference(child));
            }
        }

        let account_id = self.get(children[0])?.account_id().to_string();
        let mut conference = Call::new_dialing(account_id, "", "conference");
        let conf_id = conference.id();
        conference.mark_as_conference(children.iter().copied().collect());

        for &child in children {
            let child_call = self.get_mut(child)?;
            child_call.set_parent_conference(conf_id);
            // joining a conference un-holds every participant
            child_call.set_state_raw(crate::state::CallState::Current);
        }
        self.calls.insert(conf_id, conference);
        info!(conference = %conf_id, participants = children.len(), "conference created");
        Ok(conf_id)
    }

    /// Add one more call into an existing conference.
    pub fn add_participant(&mut self, conf_id: Uuid, call_id: Uuid) -> Result<()> {
        if !self.get(conf_id)?.is_conference() {
            return Err(CallError::NotAConference(conf_id));
        }
        if self.get(call_id)?.parent_conference().is_some() {
            return Err(CallError::AlreadyInConference(call_id));
        }
        self.get_mut(call_id)?.set_parent_conference(conf_id);
        self.get_mut(conf_id)?.add_child(call_id);
        Ok(())
    }

    /// Remove `call_id` from its parent conference and make it
    /// top-level again. If the conference is left with exactly one
    /// child, the conference itself is destroyed and the sole survivor
    /// is restored to top-level too, per the conference parent
    /// invariant.
    pub fn detach(&mut self, call_id: Uuid) -> Result<()> {
        let conf_id = self
            .get(call_id)?
            .parent_conference()
            .ok_or(CallError::NotAConference(call_id))?;

        if !self.get(conf_id)?.is_conference() {
            return Err(CallError::NotAConference(conf_id));
        }

        self.get_mut(conf_id)?.remove_child(call_id);
        self.get_mut(call_id)?.clear_parent_conference();

        let remaining: Vec<Uuid> = self.get(conf_id)?.conference_children().collect();
        if remaining.len() <= 1 {
            if let Some(&survivor) = remaining.first() {
                self.get_mut(survivor)?.clear_parent_conference();
            }
            self.calls.remove(&conf_id);
            info!(conference = %conf_id, "conference destroyed, single child restored to top-level");
        }
        Ok(())
    }

    /// Merge two existing top-level calls into a new conference, a
    /// convenience wrapper over [`CallRegistry::create_conference`] for
    /// the two-call case.
    pub fn merge(&mut self, a: Uuid, b: Uuid) -> Result<Uuid> {
        self.create_conference(&[a, b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CallAction, CallState, RemoteEvent};

    #[test]
    fn create_conference_folds_two_calls_and_detach_restores_the_survivor() {
        let mut registry = CallRegistry::new();
        let a = registry.add_dialing("acc1", "111", "A");
        let b = registry.add_dialing("acc1", "222", "B");
        registry.get_mut(a).unwrap().perform_action(CallAction::Accept).unwrap();
        registry.get_mut(a).unwrap().handle_event(RemoteEvent::Current);
        registry.get_mut(b).unwrap().perform_action(CallAction::Accept).unwrap();
        registry.get_mut(b).unwrap().handle_event(RemoteEvent::Current);
        registry.get_mut(b).unwrap().perform_action(CallAction::Hold).unwrap();

        let conf_id = registry.create_conference(&[a, b]).unwrap();
        assert!(registry.get(conf_id).unwrap().is_conference());
        assert_eq!(registry.get(a).unwrap().parent_conference(), Some(conf_id));

        registry.detach(a).unwrap();
        assert_eq!(registry.get(a).unwrap().parent_conference(), None);
        assert_eq!(registry.get(a).unwrap().state(), CallState::Current);
        // only b left in the conference -> conference destroyed, b promoted
        assert!(registry.get(conf_id).is_err());
        assert_eq!(registry.get(b).unwrap().parent_conference(), None);
    }

    #[test]
    fn create_conference_rejects_fewer_than_two_participants() {
        let mut registry = CallRegistry::new();
        let a = registry.add_dialing("acc1", "111", "A");
        assert!(registry.create_conference(&[a]).is_err());
    }

    #[test]
    fn add_conference_materialises_daemon_originated_conference_empty() {
        let mut registry = CallRegistry::new();
        let conf_id = Uuid::new_v4();
        let got = registry.add_conference(conf_id);
        assert_eq!(got, conf_id);
        let conference = registry.get(conf_id).unwrap();
        assert!(conference.is_conference());
        assert_eq!(conference.conference_children().count(), 0);

        let a = registry.add_dialing("acc1", "111", "A");
        registry.add_participant(conf_id, a).unwrap();
        assert_eq!(registry.get(a).unwrap().parent_conference(), Some(conf_id));

        // redelivery of the same event is a no-op, not a reset
        registry.add_conference(conf_id);
        assert_eq!(registry.get(conf_id).unwrap().conference_children().count(), 1);
    }

    #[test]
    fn remove_over_call_files_it_to_history() {
        let mut registry = CallRegistry::new();
        let id = registry.add_incoming("acc1", "999", "Caller");
        registry.get_mut(id).unwrap().perform_action(CallAction::Refuse).unwrap();
        registry.remove(id).unwrap();
        assert_eq!(registry.history().len(), 1);
        assert_eq!(registry.history()[0].state, crate::state::HistoryState::Missed);
    }
}
