// src/integrations/account_directory.rs
//
// Owner → account email resolution. The real auth/session layer is an
// external collaborator; this seam is all the dispatch engine sees. The
// shipped implementation reads a static map from configuration.

use std::collections::HashMap;

/// Resolves an opaque owner reference to an account email address, used
/// only as the delivery fallback for `EmailTarget::Account` reminders.
#[cfg_attr(test, mockall::automock)]
pub trait AccountDirectory: Send + Sync {
    fn email_for(&self, owner: &str) -> Option<String>;
}

/// Config-backed directory: a fixed owner → address map.
pub struct StaticAccountDirectory {
    accounts: HashMap<String, String>,
}

impl StaticAccountDirectory {
    pub fn new(accounts: HashMap<String, String>) -> Self {
        Self { accounts }
    }
}

impl AccountDirectory for StaticAccountDirectory {
    fn email_for(&self, owner: &str) -> Option<String> {
        self.accounts.get(owner).cloned()
    }
}
