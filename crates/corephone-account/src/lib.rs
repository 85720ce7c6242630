//! Signalling account identity, credential and codec sub-models, and the
//! account list.
//!
//! [`Account`] is the persistent identity with its detail map and edit
//! lifecycle (§4.F of the core design); [`AccountList`] is the singleton
//! collection that adds default-account selection and bulk save/reorder
//! (§4.G). [`crate::credential::CredentialList`] and
//! [`corephone_codec::AccountCodecList`] are the per-account sub-models
//! it owns.

pub mod account;
pub mod backend;
pub mod credential;
mod error;
pub mod list;
pub mod registration;

pub use account::{Account, AccountEditState};
pub use backend::{AccountBackend, MockAccountBackend};
pub use credential::{Credential, CredentialList};
pub use error::{AccountError, Result};
pub use list::{AccountList, IP2IP_ACCOUNT_ID};
pub use registration::RegistrationState;
