//! End-to-end call-registry scenarios: outgoing basic call, an
//! unanswered incoming call, an attended transfer, and a conference
//! creation/detach.

use corephone_call::{CallAction, CallRegistry, CallState, HistoryState, RemoteEvent};

#[test]
fn outgoing_basic_call() {
    let mut registry = CallRegistry::new();
    let id = registry.add_dialing("acc1", "+15551234", "Alice");
    assert_eq!(registry.get(id).unwrap().state(), CallState::Dialing);

    registry.get_mut(id).unwrap().perform_action(CallAction::Accept).unwrap();
    registry.get_mut(id).unwrap().handle_event(RemoteEvent::Ringing);
    assert_eq!(registry.get(id).unwrap().state(), CallState::Ringing);

    registry.get_mut(id).unwrap().handle_event(RemoteEvent::Current);
    assert_eq!(registry.get(id).unwrap().state(), CallState::Current);
    assert!(registry.get(id).unwrap().start_ts().is_some());

    registry.get_mut(id).unwrap().handle_event(RemoteEvent::HungUp);
    assert_eq!(registry.get(id).unwrap().state(), CallState::Over);
    assert!(registry.get(id).unwrap().stop_ts().is_some());
    assert_eq!(registry.get(id).unwrap().history_state(), HistoryState::Outgoing);
}

#[test]
fn incoming_call_ignored_and_refused() {
    let mut registry = CallRegistry::new();
    let id = registry.add_incoming("acc1", "+15559999", "call42");
    assert_eq!(registry.get(id).unwrap().state(), CallState::Incoming);
    assert_eq!(registry.get(id).unwrap().history_state(), HistoryState::Missed);

    registry.get_mut(id).unwrap().perform_action(CallAction::Refuse).unwrap();
    assert_eq!(registry.get(id).unwrap().state(), CallState::Over);
    assert_eq!(registry.get(id).unwrap().history_state(), HistoryState::Missed);
}

#[test]
fn attended_transfer_leaves_target_call_untouched() {
    let mut registry = CallRegistry::new();
    let a = registry.add_dialing("acc1", "+1110000", "A");
    let b = registry.add_dialing("acc1", "+1220000", "B");

    for id in [a, b] {
        registry.get_mut(id).unwrap().perform_action(CallAction::Accept).unwrap();
        registry.get_mut(id).unwrap().handle_event(RemoteEvent::Current);
    }
    assert_eq!(registry.get(a).unwrap().state(), CallState::Current);
    assert_eq!(registry.get(b).unwrap().state(), CallState::Current);

    // An attended transfer: A enters Transfer, then executes it (hands
    // off to B), ending A's own leg while B's call is untouched.
    registry.get_mut(a).unwrap().perform_action(CallAction::Transfer).unwrap();
    assert_eq!(registry.get(a).unwrap().state(), CallState::Transfer);
    registry.get_mut(a).unwrap().perform_action(CallAction::Refuse).unwrap();

    assert_eq!(registry.get(a).unwrap().state(), CallState::Over);
    assert_eq!(registry.get(b).unwrap().state(), CallState::Current);
    assert_ne!(registry.get(a).unwrap().history_state(), HistoryState::Missed);
    assert_ne!(registry.get(b).unwrap().history_state(), HistoryState::Missed);
}

#[test]
fn conference_creation_then_detach_restores_single_survivor() {
    let mut registry = CallRegistry::new();
    let a = registry.add_dialing("acc1", "+1110000", "A");
    let b = registry.add_dialing("acc1", "+1220000", "B");

    for id in [a, b] {
        registry.get_mut(id).unwrap().perform_action(CallAction::Accept).unwrap();
        registry.get_mut(id).unwrap().handle_event(RemoteEvent::Current);
    }
    registry.get_mut(b).unwrap().perform_action(CallAction::Hold).unwrap();
    assert_eq!(registry.get(b).unwrap().state(), CallState::Hold);

    let conf_id = registry.create_conference(&[a, b]).unwrap();
    assert_eq!(registry.get(conf_id).unwrap().state(), CallState::Conference);
    assert_eq!(registry.get(a).unwrap().state(), CallState::Current);
    assert_eq!(registry.get(b).unwrap().state(), CallState::Current);

    registry.detach(a).unwrap();
    assert_eq!(registry.get(a).unwrap().parent_conference(), None);
    assert_eq!(registry.get(a).unwrap().state(), CallState::Current);
    // the conference had only one child left -> destroyed, b promoted
    assert!(registry.get(conf_id).is_err());
    assert_eq!(registry.get(b).unwrap().parent_conference(), None);
}
