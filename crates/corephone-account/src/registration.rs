//! Registration status wire values and the error taxonomy that drives them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Registration status as seen by the UI, mapped 1:1 from the daemon's
/// wire values (see `Account.registrationStatus` in the details key
/// space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationState {
    /// Actively registered with the server.
    Registered,
    /// Ready to register (e.g. peer-to-peer account, no registrar needed).
    Ready,
    /// Not registered, not trying.
    Unregistered,
    /// A REGISTER is in flight.
    Trying,
    /// Generic registration error.
    Error,
    /// 401/407-class authentication failure. See [`crate::AccountError`]'s
    /// `AuthError` trigger.
    ErrorAuth,
    /// Transient network failure (DNS resolved but connect/timeout
    /// failed).
    ErrorNetwork,
    /// DNS resolution of the registrar host failed.
    ErrorHost,
    /// The configured STUN server rejected or could not be reached.
    ErrorConfStun,
    /// A STUN-related error distinct from configuration (existing
    /// session conflict).
    ErrorExistStun,
    /// Registrar is temporarily unavailable (5xx).
    ErrorServiceUnavailable,
    /// Registrar rejected the request as not acceptable (4xx other than
    /// auth).
    ErrorNotAcceptable,
}

impl RegistrationState {
    /// `true` for any of the `Error*` variants.
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            RegistrationState::Registered | RegistrationState::Ready | RegistrationState::Unregistered | RegistrationState::Trying
        )
    }

    /// The wire token the daemon uses for this state, matching the
    /// `Account.registrationStatus` value space in §6.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            RegistrationState::Registered => "REGISTERED",
            RegistrationState::Ready => "READY",
            RegistrationState::Unregistered => "UNREGISTERED",
            RegistrationState::Trying => "TRYING",
            RegistrationState::Error => "ERROR",
            RegistrationState::ErrorAuth => "ERRORAUTH",
            RegistrationState::ErrorNetwork => "ERRORNETWORK",
            RegistrationState::ErrorHost => "ERRORHOST",
            RegistrationState::ErrorConfStun => "ERROR_CONF_STUN",
            RegistrationState::ErrorExistStun => "ERROREXISTSTUN",
            RegistrationState::ErrorServiceUnavailable => "ERRORSERVICEUNAVAILABLE",
            RegistrationState::ErrorNotAcceptable => "ERRORNOTACCEPTABLE",
        }
    }

    /// Parse a wire token, defaulting to `Unregistered` for anything
    /// unrecognised (the daemon may introduce new tokens without a
    /// client upgrade — see the `details` key-space note in §6).
    pub fn from_wire_str(s: &str) -> Self {
        match s {
            "REGISTERED" => RegistrationState::Registered,
            "READY" => RegistrationState::Ready,
            "TRYING" => RegistrationState::Trying,
            "ERROR" => RegistrationState::Error,
            "ERRORAUTH" => RegistrationState::ErrorAuth,
            "ERRORNETWORK" => RegistrationState::ErrorNetwork,
            "ERRORHOST" => RegistrationState::ErrorHost,
            "ERROR_CONF_STUN" => RegistrationState::ErrorConfStun,
            "ERROREXISTSTUN" => RegistrationState::ErrorExistStun,
            "ERRORSERVICEUNAVAILABLE" => RegistrationState::ErrorServiceUnavailable,
            "ERRORNOTACCEPTABLE" => RegistrationState::ErrorNotAcceptable,
            _ => RegistrationState::Unregistered,
        }
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        for state in [
            RegistrationState::Registered,
            RegistrationState::ErrorAuth,
            RegistrationState::ErrorConfStun,
        ] {
            let wire = state.as_wire_str();
            assert_eq!(RegistrationState::from_wire_str(wire), state);
        }
    }

    #[test]
    fn unknown_wire_token_defaults_to_unregistered() {
        assert_eq!(
            RegistrationState::from_wire_str("SOMETHING_NEW"),
            RegistrationState::Unregistered
        );
    }

    #[test]
    fn is_error_classification() {
        assert!(!RegistrationState::Registered.is_error());
        assert!(!RegistrationState::Trying.is_error());
        assert!(RegistrationState::ErrorAuth.is_error());
        assert!(RegistrationState::ErrorHost.is_error());
    }
}
