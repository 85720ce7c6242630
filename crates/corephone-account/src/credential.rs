//! Per-account SIP/IAX authentication credentials.

/// One `{name, password, realm}` authentication row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    /// Authentication username. May be left empty until save time, at
    /// which point [`CredentialList::save_defaults`] fills it from the
    /// account's primary username.
    pub name: String,
    /// Authentication password, stored in the clear at this layer (the
    /// backend is responsible for at-rest protection).
    pub password: String,
    /// Authentication realm. Empty is treated as the wildcard `"*"`.
    pub realm: String,
}

impl Credential {
    /// A new blank row for a given realm default.
    pub fn new() -> Self {
        Self::default()
    }

    /// The realm to use on the wire: `"*"` if unset.
    pub fn effective_realm(&self) -> &str {
        if self.realm.is_empty() {
            "*"
        } else {
            &self.realm
        }
    }
}

/// Ordered list of [`Credential`] rows belonging to one account.
#[derive(Debug, Clone, Default)]
pub struct CredentialList {
    rows: Vec<Credential>,
}

impl CredentialList {
    /// An empty list. Every account is expected to end up with at least
    /// one row before `save()`; an empty list is valid transient state
    /// for a brand-new account.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a blank row, returning its index.
    pub fn add(&mut self) -> usize {
        self.rows.push(Credential::new());
        self.rows.len() - 1
    }

    /// Remove row `idx`.
    pub fn remove(&mut self, idx: usize) -> Option<Credential> {
        if idx >= self.rows.len() {
            return None;
        }
        Some(self.rows.remove(idx))
    }

    /// All rows, in order.
    pub fn rows(&self) -> &[Credential] {
        &self.rows
    }

    /// Mutable access to one row, for in-place field edits.
    pub fn row_mut(&mut self, idx: usize) -> Option<&mut Credential> {
        self.rows.get_mut(idx)
    }

    /// Fill in any blank name on the first row from `primary_username`,
    /// and default every row's realm. Called by [`crate::Account::save`]
    /// before submitting credentials to the backend.
    pub fn apply_defaults(&mut self, primary_username: &str) {
        if let Some(first) = self.rows.first_mut() {
            if first.name.is_empty() {
                first.name = primary_username.to_string();
            }
        }
        for row in self.rows.iter_mut() {
            if row.realm.is_empty() {
                row.realm = "*".to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_realm_defaults_to_wildcard() {
        let cred = Credential::new();
        assert_eq!(cred.effective_realm(), "*");
    }

    #[test]
    fn apply_defaults_fills_first_row_name_only() {
        let mut list = CredentialList::new();
        list.add();
        list.add();
        list.apply_defaults("alice");
        assert_eq!(list.rows()[0].name, "alice");
        assert_eq!(list.rows()[1].name, "");
        assert_eq!(list.rows()[0].realm, "*");
    }

    #[test]
    fn apply_defaults_does_not_override_explicit_name() {
        let mut list = CredentialList::new();
        let idx = list.add();
        list.row_mut(idx).unwrap().name = "bob".to_string();
        list.apply_defaults("alice");
        assert_eq!(list.rows()[0].name, "bob");
    }

    #[test]
    fn remove_out_of_bounds_is_none() {
        let mut list = CredentialList::new();
        assert!(list.remove(0).is_none());
    }
}
