//! The daemon round-trip that backs [`crate::Account::save`],
//! [`crate::Account::reload`] and [`crate::AccountList::save`].
//!
//! A real build wires this to the signalling daemon over IPC; tests and
//! examples use [`MockAccountBackend`], an in-memory stand-in.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::registration::RegistrationState;
use crate::Result;

/// Everything an [`crate::Account`]/[`crate::AccountList`] needs from the
/// daemon side of the IPC boundary. Mirrors the account CRUD family
/// described for the signalling sink, narrowed to what this crate owns.
#[async_trait]
pub trait AccountBackend: Send + Sync {
    /// Submit a brand-new account's full detail map; returns the
    /// daemon-assigned id.
    async fn add_account(&self, details: &HashMap<String, String>) -> Result<String>;

    /// Submit an existing account's full detail map as an update.
    async fn update_account(&self, account_id: &str, details: &HashMap<String, String>) -> Result<()>;

    /// Remove an account from the daemon's own registry.
    async fn remove_account(&self, account_id: &str) -> Result<()>;

    /// Fetch the current detail map wholesale.
    async fn fetch_details(&self, account_id: &str) -> Result<HashMap<String, String>>;

    /// Poll the daemon's current registration status for this account.
    async fn poll_registration_state(&self, account_id: &str) -> Result<RegistrationState>;

    /// Persist the serialised active codec id list (slash-separated).
    async fn save_codec_list(&self, account_id: &str, serialized: &str) -> Result<()>;

    /// Persist the credential rows.
    async fn save_credentials(
        &self,
        account_id: &str,
        rows: &[crate::credential::Credential],
    ) -> Result<()>;

    /// The full set of account ids the daemon currently knows about, used
    /// by [`crate::AccountList::save`] to detect accounts that were
    /// removed locally and need a remote delete.
    async fn known_account_ids(&self) -> Result<Vec<String>>;

    /// Submit the full ordered id list (account priority), replacing the
    /// daemon's own ordering.
    async fn reorder_accounts(&self, ordered_ids: &[String]) -> Result<()>;
}

/// In-memory [`AccountBackend`] for tests and examples. Assigns ids
/// sequentially (`acc-1`, `acc-2`, …) and otherwise behaves like a very
/// small, perfectly reliable daemon.
#[derive(Debug, Default)]
pub struct MockAccountBackend {
    inner: tokio::sync::Mutex<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    accounts: HashMap<String, HashMap<String, String>>,
    registration: HashMap<String, RegistrationState>,
    order: Vec<String>,
}

impl MockAccountBackend {
    /// A fresh, empty mock backend.
    pub fn new() -> Self {
        Self {
            inner: tokio::sync::Mutex::new(MockState {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Set the registration state the mock reports for `account_id` on
    /// the next [`AccountBackend::poll_registration_state`] call. Used by
    /// tests to simulate daemon-side registration progress.
    pub async fn set_registration_state(&self, account_id: &str, state: RegistrationState) {
        let mut inner = self.inner.lock().await;
        inner.registration.insert(account_id.to_string(), state);
    }
}

#[async_trait]
impl AccountBackend for MockAccountBackend {
    async fn add_account(&self, details: &HashMap<String, String>) -> Result<String> {
        let mut inner = self.inner.lock().await;
        let id = format!("acc-{}", inner.next_id);
        inner.next_id += 1;
        inner.accounts.insert(id.clone(), details.clone());
        inner.order.push(id.clone());
        inner
            .registration
            .entry(id.clone())
            .or_insert(RegistrationState::Unregistered);
        Ok(id)
    }

    async fn update_account(&self, account_id: &str, details: &HashMap<String, String>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.accounts.insert(account_id.to_string(), details.clone());
        Ok(())
    }

    async fn remove_account(&self, account_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.accounts.remove(account_id);
        inner.registration.remove(account_id);
        inner.order.retain(|id| id != account_id);
        Ok(())
    }

    async fn fetch_details(&self, account_id: &str) -> Result<HashMap<String, String>> {
        let inner = self.inner.lock().await;
        Ok(inner.accounts.get(account_id).cloned().unwrap_or_default())
    }

    async fn poll_registration_state(&self, account_id: &str) -> Result<RegistrationState> {
        let inner = self.inner.lock().await;
        Ok(inner
            .registration
            .get(account_id)
            .copied()
            .unwrap_or(RegistrationState::Unregistered))
    }

    async fn save_codec_list(&self, _account_id: &str, _serialized: &str) -> Result<()> {
        Ok(())
    }

    async fn save_credentials(
        &self,
        _account_id: &str,
        _rows: &[crate::credential::Credential],
    ) -> Result<()> {
        Ok(())
    }

    async fn known_account_ids(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock().await;
        Ok(inner.order.clone())
    }

    async fn reorder_accounts(&self, ordered_ids: &[String]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.order = ordered_ids.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_account_assigns_sequential_ids() {
        let backend = MockAccountBackend::new();
        let first = backend.add_account(&HashMap::new()).await.unwrap();
        let second = backend.add_account(&HashMap::new()).await.unwrap();
        assert_eq!(first, "acc-1");
        assert_eq!(second, "acc-2");
    }

    #[tokio::test]
    async fn remove_account_drops_from_known_ids() {
        let backend = MockAccountBackend::new();
        let id = backend.add_account(&HashMap::new()).await.unwrap();
        backend.remove_account(&id).await.unwrap();
        assert!(backend.known_account_ids().await.unwrap().is_empty());
    }
}
