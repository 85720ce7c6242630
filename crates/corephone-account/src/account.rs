//! The persistent account identity and its edit-lifecycle state machine.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use corephone_codec::{AccountCodecList, CodecRegistry, MediaMask};
use tracing::{debug, warn};

use crate::backend::AccountBackend;
use crate::credential::CredentialList;
use crate::error::AccountError;
use crate::registration::RegistrationState;
use crate::Result;

/// Detail-map key for the account's opaque backend id, once assigned.
pub const KEY_ID: &str = "Account.id";
/// Detail-map key for the display alias.
pub const KEY_ALIAS: &str = "Account.alias";
/// Detail-map key for participation in registration.
pub const KEY_ENABLE: &str = "Account.enable";
/// Detail-map key for the primary authentication username.
pub const KEY_USERNAME: &str = "Account.username";
/// Detail-map key the daemon uses to report registration status.
pub const KEY_REGISTRATION_STATUS: &str = "Account.registrationStatus";

/// Where an [`Account`] sits in its edit lifecycle.
///
/// ```text
/// READY --edit--> EDITING --modify--> MODIFIED --save--> READY
/// EDITING/MODIFIED --outdate--> OUTDATED --reload--> READY
/// NEW --save--> READY
/// any --remove--> REMOVED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountEditState {
    /// Persisted, no local edits, safe to reload at any time.
    Ready,
    /// A UI form is open on this account; detail writes are rejected.
    Editing,
    /// A `set()` landed; `save()` will push it to the backend.
    Modified,
    /// A reload arrived while Editing/Modified; deferred rather than
    /// clobbering in-flight user edits.
    Outdated,
    /// Freshly constructed, never saved, no `account_id` yet.
    New,
    /// Flagged for deletion; the owning [`crate::AccountList`]
    /// reconciles it away.
    Removed,
}

impl AccountEditState {
    fn label(self) -> &'static str {
        match self {
            AccountEditState::Ready => "READY",
            AccountEditState::Editing => "EDITING",
            AccountEditState::Modified => "MODIFIED",
            AccountEditState::Outdated => "OUTDATED",
            AccountEditState::New => "NEW",
            AccountEditState::Removed => "REMOVED",
        }
    }
}

/// A SIP/IAX signalling account: identity, credentials, per-account
/// codec priorities and the volatile registration state reported by the
/// daemon.
pub struct Account {
    account_id: Option<String>,
    details: HashMap<String, String>,
    registration_state: RegistrationState,
    call_ids: HashSet<String>,
    codec_list: AccountCodecList,
    credential_list: CredentialList,
    edit_state: AccountEditState,
    backend: Arc<dyn AccountBackend>,
}

impl Account {
    /// Construct a brand-new, unsaved account seeded with `alias`. Enters
    /// [`AccountEditState::New`]; has no `account_id` until
    /// [`Account::save`] assigns one.
    pub fn new(alias: impl Into<String>, backend: Arc<dyn AccountBackend>) -> Self {
        let mut details = HashMap::new();
        details.insert(KEY_ALIAS.to_string(), alias.into());
        details.insert(KEY_ENABLE.to_string(), "true".to_string());

        let mut codec_list = AccountCodecList::new();
        codec_list.load_defaults_from(CodecRegistry::global());

        Self {
            account_id: None,
            details,
            registration_state: RegistrationState::Unregistered,
            call_ids: HashSet::new(),
            codec_list,
            credential_list: CredentialList::new(),
            edit_state: AccountEditState::New,
            backend,
        }
    }

    /// Fetch an existing account's details from the backend and enter
    /// [`AccountEditState::Ready`].
    pub async fn load_existing(account_id: impl Into<String>, backend: Arc<dyn AccountBackend>) -> Result<Self> {
        let account_id = account_id.into();
        let details = backend
            .fetch_details(&account_id)
            .await
            .map_err(|e| AccountError::Backend(e.to_string()))?;

        let mut codec_list = AccountCodecList::new();
        codec_list.load_defaults_from(CodecRegistry::global());

        let registration_state = details
            .get(KEY_REGISTRATION_STATUS)
            .map(|s| RegistrationState::from_wire_str(s))
            .unwrap_or(RegistrationState::Unregistered);

        Ok(Self {
            account_id: Some(account_id),
            details,
            registration_state,
            call_ids: HashSet::new(),
            codec_list,
            credential_list: CredentialList::new(),
            edit_state: AccountEditState::Ready,
            backend,
        })
    }

    /// The daemon-assigned id, or `None` for a never-saved account.
    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    /// Current edit-lifecycle state.
    pub fn edit_state(&self) -> AccountEditState {
        self.edit_state
    }

    /// Most recently known registration state.
    pub fn registration_state(&self) -> RegistrationState {
        self.registration_state
    }

    /// Whether the account participates in registration
    /// (`Account.enable == "true"`).
    pub fn is_enabled(&self) -> bool {
        self.get(KEY_ENABLE) == "true"
    }

    /// Enabled and currently registered.
    pub fn is_registered(&self) -> bool {
        self.is_enabled() && self.registration_state == RegistrationState::Registered
    }

    /// This account's active codec list.
    pub fn codec_list(&self) -> &AccountCodecList {
        &self.codec_list
    }

    /// Mutable access to this account's codec list.
    pub fn codec_list_mut(&mut self) -> &mut AccountCodecList {
        &mut self.codec_list
    }

    /// This account's credentials.
    pub fn credential_list(&self) -> &CredentialList {
        &self.credential_list
    }

    /// Mutable access to this account's credentials.
    pub fn credential_list_mut(&mut self) -> &mut CredentialList {
        &mut self.credential_list
    }

    /// Ids of calls currently attached to this account. A weak
    /// membership record only: the call registry, not this set, owns the
    /// calls.
    pub fn call_ids(&self) -> &HashSet<String> {
        &self.call_ids
    }

    /// Record that `call_id` belongs to this account.
    pub fn attach_call(&mut self, call_id: impl Into<String>) {
        self.call_ids.insert(call_id.into());
    }

    /// Forget a call id, e.g. once the call reaches Over.
    pub fn detach_call(&mut self, call_id: &str) {
        self.call_ids.remove(call_id);
    }

    /// Read one detail. Absent keys return an empty string and are
    /// logged, never an error.
    pub fn get(&self, key: &str) -> &str {
        match self.details.get(key) {
            Some(v) => v.as_str(),
            None => {
                debug!(account_id = ?self.account_id, key, "detail key absent, returning empty");
                ""
            }
        }
    }

    /// Transition a user-initiated edit session: READY -> EDITING.
    /// Writes are rejected while in Editing, so callers that only ever
    /// read do not need to call this; it exists for UIs that model an
    /// explicit "open this account for editing" step.
    pub fn begin_edit(&mut self) {
        if self.edit_state == AccountEditState::Ready {
            self.edit_state = AccountEditState::Editing;
        }
    }

    /// Write one detail. Accepted from {New, Modified}; a write from
    /// Ready implicitly transitions to Modified first. Rejected outright
    /// (no-op) from {Editing, Outdated, Removed}.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        match self.edit_state {
            AccountEditState::New | AccountEditState::Modified => {
                self.details.insert(key.into(), value.into());
                Ok(())
            }
            AccountEditState::Ready => {
                self.edit_state = AccountEditState::Modified;
                self.details.insert(key.into(), value.into());
                Ok(())
            }
            AccountEditState::Editing | AccountEditState::Outdated | AccountEditState::Removed => {
                warn!(
                    account_id = ?self.account_id,
                    state = self.edit_state.label(),
                    "rejected configuration write"
                );
                Err(AccountError::ConfigurationRejected {
                    account_id: self.account_id.clone().unwrap_or_else(|| "<new>".to_string()),
                    state: self.edit_state.label(),
                })
            }
        }
    }

    /// For NEW accounts, submit the full detail map as "add account" and
    /// adopt the returned id. For existing accounts, submit as "update".
    /// On success, persists credentials and the active codec list, then
    /// reloads. A registration-status change observed during the reload
    /// does not itself dirty the account.
    pub async fn save(&mut self) -> Result<()> {
        if self.edit_state == AccountEditState::Removed {
            return Err(AccountError::Removed(
                self.account_id.clone().unwrap_or_else(|| "<new>".to_string()),
            ));
        }

        let primary_username = self.get(KEY_USERNAME).to_string();
        self.credential_list.apply_defaults(&primary_username);

        match self.account_id.clone() {
            None => {
                let id = self
                    .backend
                    .add_account(&self.details)
                    .await
                    .map_err(|e| AccountError::Backend(e.to_string()))?;
                self.account_id = Some(id.clone());
                self.details.insert(KEY_ID.to_string(), id);
            }
            Some(id) => {
                self.backend
                    .update_account(&id, &self.details)
                    .await
                    .map_err(|e| AccountError::Backend(e.to_string()))?;
            }
        }

        let id = self.account_id.clone().expect("account_id set above");

        self.backend
            .save_credentials(&id, self.credential_list.rows())
            .await
            .map_err(|e| AccountError::Backend(e.to_string()))?;

        let serialized = self.codec_list.serialize_active(MediaMask::BOTH);
        self.backend
            .save_codec_list(&id, &serialized)
            .await
            .map_err(|e| AccountError::Backend(e.to_string()))?;

        self.reload().await?;
        Ok(())
    }

    /// Refetch the detail map wholesale, replacing the previous one, and
    /// return to READY.
    pub async fn reload(&mut self) -> Result<()> {
        if self.edit_state == AccountEditState::Removed {
            return Err(AccountError::Removed(
                self.account_id.clone().unwrap_or_else(|| "<new>".to_string()),
            ));
        }
        let Some(id) = self.account_id.clone() else {
            // A NEW account with nothing saved yet has nothing to reload.
            self.edit_state = AccountEditState::Ready;
            return Ok(());
        };
        let details = self
            .backend
            .fetch_details(&id)
            .await
            .map_err(|e| AccountError::Backend(e.to_string()))?;
        self.details = details;
        if let Some(status) = self.details.get(KEY_REGISTRATION_STATUS) {
            self.registration_state = RegistrationState::from_wire_str(status);
        }
        self.edit_state = AccountEditState::Ready;
        Ok(())
    }

    /// Called when a reload would otherwise arrive while Editing/
    /// Modified: defers the reload by moving to Outdated instead of
    /// discarding the in-flight user edit.
    pub fn mark_outdated_if_editing(&mut self) {
        if matches!(self.edit_state, AccountEditState::Editing | AccountEditState::Modified) {
            self.edit_state = AccountEditState::Outdated;
        }
    }

    /// Poll the backend's current registration status and update local
    /// state. Returns whether the state changed. Never dirties the
    /// account's edit state.
    pub async fn update_registration_state(&mut self) -> Result<bool> {
        let Some(id) = self.account_id.clone() else {
            return Ok(false);
        };
        let new_state = self
            .backend
            .poll_registration_state(&id)
            .await
            .map_err(|e| AccountError::Backend(e.to_string()))?;
        let changed = new_state != self.registration_state;
        self.registration_state = new_state;
        self.details
            .insert(KEY_REGISTRATION_STATUS.to_string(), new_state.as_wire_str().to_string());
        Ok(changed)
    }

    /// Flag this account for deletion. The owning [`crate::AccountList`]
    /// reconciles the removal with the backend.
    pub fn remove(&mut self) {
        self.edit_state = AccountEditState::Removed;
    }

    /// Fix `account_id` and enter Ready without a backend round trip.
    /// Used solely to seed the IP2IP pseudo-account, which has no
    /// backend-side registration to fetch.
    pub(crate) fn set_account_id_and_ready(&mut self, id: &str) {
        self.account_id = Some(id.to_string());
        self.details.insert(KEY_ID.to_string(), id.to_string());
        self.edit_state = AccountEditState::Ready;
        self.registration_state = RegistrationState::Ready;
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("account_id", &self.account_id)
            .field("edit_state", &self.edit_state.label())
            .field("registration_state", &self.registration_state)
            .field("call_ids", &self.call_ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockAccountBackend;

    fn backend() -> Arc<dyn AccountBackend> {
        Arc::new(MockAccountBackend::new())
    }

    #[tokio::test]
    async fn new_account_is_new_and_unsaved() {
        let account = Account::new("home", backend());
        assert_eq!(account.edit_state(), AccountEditState::New);
        assert!(account.account_id().is_none());
        assert_eq!(account.get(KEY_ALIAS), "home");
    }

    #[tokio::test]
    async fn save_on_new_account_assigns_id_and_returns_to_ready() {
        let mut account = Account::new("home", backend());
        account.save().await.unwrap();
        assert!(account.account_id().is_some());
        assert_eq!(account.edit_state(), AccountEditState::Ready);
    }

    #[tokio::test]
    async fn set_from_ready_transitions_to_modified() {
        let mut account = Account::new("home", backend());
        account.save().await.unwrap();
        assert_eq!(account.edit_state(), AccountEditState::Ready);
        account.set(KEY_ALIAS, "work").unwrap();
        assert_eq!(account.edit_state(), AccountEditState::Modified);
        assert_eq!(account.get(KEY_ALIAS), "work");
    }

    #[tokio::test]
    async fn write_rejected_while_editing() {
        let mut account = Account::new("home", backend());
        account.save().await.unwrap();
        account.begin_edit();
        assert_eq!(account.edit_state(), AccountEditState::Editing);
        let result = account.set(KEY_ALIAS, "nope");
        assert!(result.is_err());
        assert_eq!(account.get(KEY_ALIAS), "home");
    }

    #[tokio::test]
    async fn write_rejected_while_removed() {
        let mut account = Account::new("home", backend());
        account.remove();
        let result = account.set(KEY_ALIAS, "nope");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn mark_outdated_defers_rather_than_discards() {
        let mut account = Account::new("home", backend());
        account.save().await.unwrap();
        account.set(KEY_ALIAS, "work").unwrap();
        assert_eq!(account.edit_state(), AccountEditState::Modified);
        account.mark_outdated_if_editing();
        assert_eq!(account.edit_state(), AccountEditState::Outdated);
        // the in-flight edit is still there, just not yet reloaded over
        assert_eq!(account.get(KEY_ALIAS), "work");
    }

    #[tokio::test]
    async fn update_registration_state_reports_change() {
        let backend = Arc::new(MockAccountBackend::new());
        let mut account = Account::new("home", backend.clone());
        account.save().await.unwrap();
        let id = account.account_id().unwrap().to_string();

        backend.set_registration_state(&id, RegistrationState::Registered).await;
        let changed = account.update_registration_state().await.unwrap();
        assert!(changed);
        assert_eq!(account.registration_state(), RegistrationState::Registered);

        let changed_again = account.update_registration_state().await.unwrap();
        assert!(!changed_again);
    }

    #[tokio::test]
    async fn save_on_removed_account_fails() {
        let mut account = Account::new("home", backend());
        account.save().await.unwrap();
        account.remove();
        assert!(account.save().await.is_err());
    }
}
