//! The account list: a singleton collection of [`Account`]s plus the
//! always-available peer-to-peer loopback account.

use std::sync::Arc;

use tracing::info;

use crate::account::{Account, AccountEditState, KEY_ALIAS};
use crate::backend::AccountBackend;
use crate::error::AccountError;
use crate::registration::RegistrationState;
use crate::Result;

/// Account id of the always-available loopback pseudo-account used for
/// direct IP-to-IP calls when no SIP/IAX account is registered.
pub const IP2IP_ACCOUNT_ID: &str = "IP2IP";

/// Ordered collection of [`Account`]s, indexed by `account_id`.
pub struct AccountList {
    accounts: Vec<Account>,
    backend: Arc<dyn AccountBackend>,
    /// Id of the account the user last explicitly selected, if any.
    pinned_current: Option<String>,
}

impl AccountList {
    /// A fresh list seeded with the IP2IP loopback pseudo-account, which
    /// is always present and never removed.
    pub fn new(backend: Arc<dyn AccountBackend>) -> Self {
        let mut ip2ip = Account::new("IP2IP", backend.clone());
        // The loopback account needs no registration round trip; give it
        // a stable, non-backend-assigned id and mark it Ready directly.
        ip2ip.force_id_for_pseudo_account(IP2IP_ACCOUNT_ID);

        Self {
            accounts: vec![ip2ip],
            backend,
            pinned_current: None,
        }
    }

    /// Create a new, unsaved account with the given display alias and add
    /// it to the list. Returns its index; call `save()` on the list (or
    /// on the account itself) to persist it.
    pub fn add(&mut self, alias: impl Into<String>) -> usize {
        let account = Account::new(alias, self.backend.clone());
        self.accounts.push(account);
        self.accounts.len() - 1
    }

    /// Flag `account_id` for removal. The account is not dropped from
    /// the in-memory list until [`AccountList::save`] reconciles it with
    /// the backend, matching [`Account::remove`]'s deferred semantics.
    /// The IP2IP pseudo-account cannot be removed.
    pub fn remove(&mut self, account_id: &str) -> Result<()> {
        if account_id == IP2IP_ACCOUNT_ID {
            return Err(AccountError::NotFound(account_id.to_string()));
        }
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.account_id() == Some(account_id))
            .ok_or_else(|| AccountError::NotFound(account_id.to_string()))?;
        account.remove();
        if self.pinned_current.as_deref() == Some(account_id) {
            self.pinned_current = None;
        }
        Ok(())
    }

    /// Swap the account at `idx` with the one before it.
    pub fn move_up(&mut self, idx: usize) -> Result<()> {
        if idx == 0 || idx >= self.accounts.len() {
            return Err(AccountError::IndexOutOfBounds(idx));
        }
        self.accounts.swap(idx - 1, idx);
        Ok(())
    }

    /// Swap the account at `idx` with the one after it.
    pub fn move_down(&mut self, idx: usize) -> Result<()> {
        if idx + 1 >= self.accounts.len() {
            return Err(AccountError::IndexOutOfBounds(idx));
        }
        self.accounts.swap(idx, idx + 1);
        Ok(())
    }

    /// All accounts, in current priority order.
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Mutable access to all accounts.
    pub fn accounts_mut(&mut self) -> &mut [Account] {
        &mut self.accounts
    }

    /// Look up by id.
    pub fn by_id(&self, account_id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.account_id() == Some(account_id))
    }

    /// Mutable lookup by id.
    pub fn by_id_mut(&mut self, account_id: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.account_id() == Some(account_id))
    }

    /// All accounts currently in the given edit state.
    pub fn by_state(&self, state: AccountEditState) -> Vec<&Account> {
        self.accounts.iter().filter(|a| a.edit_state() == state).collect()
    }

    /// Enabled and registered accounts.
    pub fn registered(&self) -> Vec<&Account> {
        self.accounts.iter().filter(|a| a.is_registered()).collect()
    }

    /// Pin `account_id` as the user's preferred current account.
    pub fn set_current(&mut self, account_id: impl Into<String>) {
        self.pinned_current = Some(account_id.into());
    }

    /// The pinned account if it is enabled and registered; else the first
    /// registered, enabled account; else the IP2IP loopback account.
    pub fn current(&self) -> &Account {
        if let Some(pinned_id) = &self.pinned_current {
            if let Some(account) = self.by_id(pinned_id) {
                if account.is_registered() {
                    return account;
                }
            }
        }
        if let Some(account) = self.accounts.iter().find(|a| a.is_registered()) {
            return account;
        }
        self.by_id(IP2IP_ACCOUNT_ID)
            .expect("IP2IP pseudo-account is always present")
    }

    /// Diff the in-memory list against the backend's known ids, remove
    /// remote accounts with no local counterpart, save every remaining
    /// account, then submit the full ordered id list.
    pub async fn save(&mut self) -> Result<()> {
        let known_ids = self
            .backend
            .known_account_ids()
            .await
            .map_err(|e| AccountError::Backend(e.to_string()))?;
        let local_ids: Vec<&str> = self
            .accounts
            .iter()
            .filter_map(|a| a.account_id())
            .collect();

        for remote_id in &known_ids {
            if !local_ids.contains(&remote_id.as_str()) {
                info!(account_id = %remote_id, "removing account absent from local list");
                self.backend
                    .remove_account(remote_id)
                    .await
                    .map_err(|e| AccountError::Backend(e.to_string()))?;
            }
        }

        self.accounts.retain(|a| a.edit_state() != AccountEditState::Removed);

        for account in self.accounts.iter_mut() {
            if account.account_id() == Some(IP2IP_ACCOUNT_ID) {
                continue;
            }
            account.save().await?;
        }

        let ordered_ids: Vec<String> = self
            .accounts
            .iter()
            .filter_map(|a| a.account_id())
            .filter(|id| *id != IP2IP_ACCOUNT_ID)
            .map(|id| id.to_string())
            .collect();
        self.backend
            .reorder_accounts(&ordered_ids)
            .await
            .map_err(|e| AccountError::Backend(e.to_string()))?;

        Ok(())
    }
}

impl std::fmt::Debug for AccountList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountList")
            .field("accounts", &self.accounts)
            .field("pinned_current", &self.pinned_current)
            .finish()
    }
}

impl Account {
    /// Give a never-saved account a fixed id and mark it Ready without a
    /// backend round trip. Used solely to seed the IP2IP pseudo-account.
    pub(crate) fn force_id_for_pseudo_account(&mut self, id: &str) {
        self.set_account_id_and_ready(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockAccountBackend;

    fn list() -> AccountList {
        AccountList::new(Arc::new(MockAccountBackend::new()))
    }

    #[test]
    fn new_list_contains_only_ip2ip() {
        let list = list();
        assert_eq!(list.accounts().len(), 1);
        assert_eq!(list.accounts()[0].account_id(), Some(IP2IP_ACCOUNT_ID));
    }

    #[test]
    fn current_falls_back_to_ip2ip_when_nothing_registered() {
        let list = list();
        assert_eq!(list.current().account_id(), Some(IP2IP_ACCOUNT_ID));
    }

    #[tokio::test]
    async fn save_persists_new_accounts_and_reorders() {
        let mut list = list();
        list.add("home");
        list.add("work");
        list.save().await.unwrap();
        assert_eq!(list.registered().len(), 0);
        assert!(list.accounts().iter().all(|a| a.account_id().is_some()));
    }

    #[test]
    fn ip2ip_cannot_be_removed() {
        let mut list = list();
        assert!(list.remove(IP2IP_ACCOUNT_ID).is_err());
    }

    #[tokio::test]
    async fn move_up_and_down_reorder_accounts() {
        let mut list = list();
        list.add("home");
        list.add("work");
        list.save().await.unwrap();
        let home_id = list.accounts()[1].account_id().unwrap().to_string();
        list.move_up(2).unwrap();
        assert_eq!(list.accounts()[1].account_id(), Some(home_id.as_str()));
    }
}
