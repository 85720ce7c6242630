//! The call state machine: two independent input alphabets (local user
//! actions, remote signalling events) driving one `CallState`, plus the
//! connection/history side-states they carry along (§4.H.1).

use serde::{Deserialize, Serialize};

use crate::error::CallError;
use crate::Result;

/// Where a [`crate::Call`] sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    /// Pre-construction placeholder. Never produced by any table
    /// transition; a `Call` is always born directly into `Dialing`,
    /// `Incoming` or `Ringing`.
    Inactive,
    /// Legacy state carried for wire/enum parity; no table cell ever
    /// targets it.
    Active,
    /// An unanswered call arrived from the remote side.
    Incoming,
    /// An outgoing call's remote party is alerting.
    Ringing,
    /// Connected; media is flowing.
    Current,
    /// An outgoing call is being placed, pre-ringing.
    Dialing,
    /// Locally held.
    Hold,
    /// Remote party reported busy.
    Busy,
    /// A non-busy failure occurred.
    Failure,
    /// A blind/attended transfer is being negotiated from `Current`.
    Transfer,
    /// A transfer negotiated from `Hold`.
    TransferHold,
    /// This call is a conference (or has been folded into one) and is
    /// active.
    Conference,
    /// A held conference.
    ConferenceHold,
    /// Protocol-level error state.
    Error,
    /// Terminal. No action or event mutates the call further except the
    /// one-time history entry.
    Over,
}

impl CallState {
    /// `true` for the two terminal states, where the action and event
    /// tables both go to no-op/ignored for every input.
    pub fn is_terminal(self) -> bool {
        matches!(self, CallState::Over | CallState::Error)
    }
}

/// Connection progress as reported by the signalling layer, independent
/// of `CallState` (e.g. a call can be `Current` while `connection_state`
/// stays `Connected` for the whole session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No signalling dialogue established.
    Disconnected,
    /// Outbound request sent, no provisional response yet.
    Trying,
    /// A provisional (non-ringing) response was received.
    Progressing,
    /// 180-equivalent: remote is alerting.
    Ringing,
    /// A final success response was received; media can flow.
    Connected,
}

/// What this terminated call is filed as in history (§3, §9 Open
/// Question resolutions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryState {
    /// Never terminated, or terminated before ever connecting on an
    /// outgoing call that never reached Busy either.
    None,
    /// Answered incoming call.
    Incoming,
    /// Answered (or at-least-once-connected) outgoing call.
    Outgoing,
    /// Incoming call that was never answered.
    Missed,
}

/// Which side originated the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallDirection {
    /// This daemon placed the call.
    Outgoing,
    /// The call arrived from the remote side.
    Incoming,
}

/// A local user action applied through [`crate::Call::perform_action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallAction {
    /// Answer an incoming call, or execute a pending transfer.
    Accept,
    /// Decline/hang up.
    Refuse,
    /// Enter, execute or cancel a transfer depending on current state.
    Transfer,
    /// Hold or unhold depending on current state.
    Hold,
    /// Toggle the recording flag without changing state.
    Record,
}

/// A remote signalling notification applied through
/// [`crate::Call::handle_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteEvent {
    /// 180-equivalent.
    Ringing,
    /// Final success response.
    Current,
    /// Remote reported busy.
    Busy,
    /// Remote put the call on hold.
    Hold,
    /// Remote hung up (BYE-equivalent).
    HungUp,
    /// Non-busy failure response.
    Failure,
}

/// A side effect the caller (the surrounding daemon/IPC adapter) must
/// carry out in response to a state transition. The state machine only
/// decides *what* should happen; it never calls out to signalling
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallEffect {
    /// No side effect; state (usually) didn't change either.
    None,
    /// Send the accept/answer request.
    AnswerCall,
    /// Answer, then immediately hold.
    AnswerAndHold,
    /// Send a hangup/decline request.
    Hangup,
    /// Send the outbound INVITE-equivalent.
    PlaceCall,
    /// Cancel an in-flight outbound call.
    CancelCall,
    /// Begin a transfer negotiation.
    EnterTransfer,
    /// Execute a pending transfer.
    ExecuteTransfer,
    /// Abandon a pending transfer.
    CancelTransfer,
    /// Flip the recording flag.
    ToggleRecord,
    /// Put the call on hold.
    HoldCall,
    /// Take the call off hold.
    UnholdCall,
    /// Hang up every participant of a conference.
    HangupConference,
    /// Hold a conference.
    HoldConference,
    /// Unhold a conference.
    UnholdConference,
}

/// Apply `action` to `state`, returning the target state and the effect
/// to carry out, or [`CallError::InvalidAction`] for an ERROR cell. Over
/// and Error rows always return `(state, CallEffect::None)` — inputs to
/// a terminated call are silently ignored, never rejected (§8 property
/// 2: transition monotonicity).
pub fn apply_action(state: CallState, action: CallAction) -> Result<(CallState, CallEffect)> {
    use CallAction::*;
    use CallEffect::*;
    use CallState::*;

    if state.is_terminal() {
        return Ok((state, None));
    }

    let result = match (state, action) {
        (Incoming, Accept) => (Current, AnswerCall),
        (Incoming, Refuse) => (Over, Hangup),
        (Incoming, Transfer) => return Err(CallError::InvalidAction { state, action }),
        (Incoming, Hold) => (Hold, AnswerAndHold),
        (Incoming, Record) => (Incoming, ToggleRecord),

        (Ringing, Accept) => (Ringing, None),
        (Ringing, Refuse) => (Over, Hangup),
        (Ringing, Transfer) => return Err(CallError::InvalidAction { state, action }),
        (Ringing, Hold) => return Err(CallError::InvalidAction { state, action }),
        (Ringing, Record) => (Ringing, ToggleRecord),

        (Current, Accept) => (Current, None),
        (Current, Refuse) => (Over, Hangup),
        (Current, Transfer) => (Transfer, EnterTransfer),
        (Current, Hold) => (Hold, HoldCall),
        (Current, Record) => (Current, ToggleRecord),

        (Dialing, Accept) => (Dialing, PlaceCall),
        (Dialing, Refuse) => (Over, CancelCall),
        (Dialing, Transfer) => return Err(CallError::InvalidAction { state, action }),
        (Dialing, Hold) => return Err(CallError::InvalidAction { state, action }),
        (Dialing, Record) => return Err(CallError::InvalidAction { state, action }),

        (Hold, Accept) => (Hold, None),
        (Hold, Refuse) => (Over, Hangup),
        (Hold, Transfer) => (TransferHold, EnterTransfer),
        (Hold, Hold) => (Current, UnholdCall),
        (Hold, Record) => (Hold, ToggleRecord),

        (Transfer, Accept) => (Current, ExecuteTransfer),
        (Transfer, Refuse) => (Over, Hangup),
        (Transfer, Transfer) => (Current, CancelTransfer),
        (Transfer, Hold) => (TransferHold, HoldCall),
        (Transfer, Record) => (Transfer, ToggleRecord),

        (TransferHold, Accept) => (Current, ExecuteTransfer),
        (TransferHold, Refuse) => (Over, Hangup),
        (TransferHold, Transfer) => (Hold, CancelTransfer),
        (TransferHold, Hold) => (Transfer, UnholdCall),
        (TransferHold, Record) => (TransferHold, ToggleRecord),

        (Failure, Accept) | (Busy, Accept) => (state, None),
        (Failure, Refuse) | (Busy, Refuse) => (Over, Hangup),
        (Failure, Transfer) | (Busy, Transfer) => {
            return Err(CallError::InvalidAction { state, action })
        }
        (Failure, Hold) | (Busy, Hold) => return Err(CallError::InvalidAction { state, action }),
        (Failure, Record) | (Busy, Record) => {
            return Err(CallError::InvalidAction { state, action })
        }

        (Conference, Accept) => (Conference, None),
        (Conference, Refuse) => (Over, HangupConference),
        (Conference, Transfer) => (Transfer, EnterTransfer),
        (Conference, Hold) => (ConferenceHold, HoldConference),
        (Conference, Record) => (Conference, ToggleRecord),

        (ConferenceHold, Accept) => (ConferenceHold, None),
        (ConferenceHold, Refuse) => (Over, HangupConference),
        (ConferenceHold, Transfer) => (TransferHold, EnterTransfer),
        (ConferenceHold, Hold) => (Conference, UnholdConference),
        (ConferenceHold, Record) => (ConferenceHold, ToggleRecord),

        // Inactive/Active/Over/Error are either pre-construction-only or
        // handled by the is_terminal() guard above.
        (Inactive, _) | (Active, _) | (Over, _) | (Error, _) => (state, None),
    };
    Ok(result)
}

/// Apply a remote `event` to `state`. Returns the target state (the
/// homonymous state, or unchanged for a terminal call) and whether the
/// call timer should start (the `Incoming`/`Dialing` receiving `Current`
/// exceptions in §4.H.1).
pub fn apply_event(state: CallState, event: RemoteEvent) -> (CallState, bool) {
    if state.is_terminal() {
        return (state, false);
    }
    if matches!(event, RemoteEvent::HungUp) {
        return (CallState::Over, false);
    }

    let starts_timer = matches!(
        (state, event),
        (CallState::Incoming, RemoteEvent::Current) | (CallState::Dialing, RemoteEvent::Current)
    );

    let target = match event {
        RemoteEvent::Ringing => CallState::Ringing,
        RemoteEvent::Current => CallState::Current,
        RemoteEvent::Busy => CallState::Busy,
        RemoteEvent::Hold => CallState::Hold,
        RemoteEvent::Failure => CallState::Failure,
        RemoteEvent::HungUp => unreachable!("handled above"),
    };
    (target, starts_timer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_accept_answers_into_current() {
        assert_eq!(
            apply_action(CallState::Incoming, CallAction::Accept).unwrap(),
            (CallState::Current, CallEffect::AnswerCall)
        );
    }

    #[test]
    fn dialing_transfer_is_rejected() {
        assert!(apply_action(CallState::Dialing, CallAction::Transfer).is_err());
    }

    #[test]
    fn over_swallows_every_action_without_error() {
        for action in [
            CallAction::Accept,
            CallAction::Refuse,
            CallAction::Transfer,
            CallAction::Hold,
            CallAction::Record,
        ] {
            assert_eq!(
                apply_action(CallState::Over, action).unwrap(),
                (CallState::Over, CallEffect::None)
            );
        }
    }

    #[test]
    fn hungup_always_drives_to_over() {
        for state in [CallState::Current, CallState::Ringing, CallState::Hold] {
            assert_eq!(apply_event(state, RemoteEvent::HungUp), (CallState::Over, false));
        }
    }

    #[test]
    fn current_on_incoming_or_dialing_starts_timer() {
        assert_eq!(
            apply_event(CallState::Incoming, RemoteEvent::Current),
            (CallState::Current, true)
        );
        assert_eq!(
            apply_event(CallState::Dialing, RemoteEvent::Current),
            (CallState::Current, true)
        );
        assert_eq!(
            apply_event(CallState::Ringing, RemoteEvent::Current),
            (CallState::Current, false)
        );
    }

    #[test]
    fn transfer_hold_round_trips_through_transfer() {
        assert_eq!(
            apply_action(CallState::Hold, CallAction::Transfer).unwrap(),
            (CallState::TransferHold, CallEffect::EnterTransfer)
        );
        assert_eq!(
            apply_action(CallState::TransferHold, CallAction::Hold).unwrap(),
            (CallState::Transfer, CallEffect::UnholdCall)
        );
    }
}
