//! Credential storage for the Eclipse CLI.
//!
//! Credentials are opaque strings addressed by a `(service, account)` pair and
//! kept in the OS-native keychain:
//! - Windows: Credential Manager
//! - macOS: Keychain
//! - Linux: Secret Service (GNOME Keyring, KWallet)
//!
//! Every call goes to the OS store; nothing is cached in-process.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, warn};

/// Service name every Eclipse credential lives under.
pub const ECLIPSE_SERVICE: &str = "eclipse";

/// Account holding the serialized session.
pub const AUTH_ACCOUNT: &str = "auth";

/// Account holding the serialized app configuration.
pub const CORE_ACCOUNT: &str = "core";

/// Errors that can occur during keyring operations.
#[derive(Error, Debug)]
pub enum KeyringError {
    /// Failed to access the keyring.
    #[error("Failed to access keyring: {0}")]
    AccessDenied(String),

    /// Failed to store the credential.
    #[error("Failed to store credential: {0}")]
    StoreFailed(String),

    /// Failed to delete the credential.
    #[error("Failed to delete credential: {0}")]
    DeleteFailed(String),

    /// Internal keyring error.
    #[error("Keyring error: {0}")]
    Internal(String),
}

impl From<keyring::Error> for KeyringError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoStorageAccess(_) => {
                KeyringError::AccessDenied("Cannot access keyring storage".to_string())
            }
            keyring::Error::PlatformFailure(_) => {
                KeyringError::Internal("Platform-specific keyring failure".to_string())
            }
            _ => KeyringError::Internal(err.to_string()),
        }
    }
}

/// Result type for keyring operations.
pub type Result<T> = std::result::Result<T, KeyringError>;

/// Opaque `(service, account)` keyed string storage.
///
/// `get` returns `Ok(None)` for a missing entry and `delete` reports whether
/// anything was removed.
pub trait CredentialStore: Send + Sync {
    fn get(&self, service: &str, account: &str) -> Result<Option<String>>;

    fn set(&self, service: &str, account: &str, value: &str) -> Result<()>;

    fn delete(&self, service: &str, account: &str) -> Result<bool>;
}

/// Keychain-backed store.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringStore;

impl KeyringStore {
    pub fn new() -> Self {
        Self
    }

    fn entry(service: &str, account: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(service, account).map_err(KeyringError::from)
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, service: &str, account: &str) -> Result<Option<String>> {
        let entry = Self::entry(service, account)?;
        match entry.get_password() {
            Ok(value) => {
                debug!(service, account, "Retrieved credential");
                Ok(Some(value))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(KeyringError::from(e)),
        }
    }

    fn set(&self, service: &str, account: &str, value: &str) -> Result<()> {
        let entry = Self::entry(service, account)?;
        entry.set_password(value).map_err(|e| {
            warn!(service, account, error = %e, "Failed to store credential");
            KeyringError::StoreFailed(e.to_string())
        })?;
        debug!(service, account, "Stored credential");
        Ok(())
    }

    fn delete(&self, service: &str, account: &str) -> Result<bool> {
        let entry = Self::entry(service, account)?;
        match entry.delete_credential() {
            Ok(()) => {
                debug!(service, account, "Deleted credential");
                Ok(true)
            }
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(KeyringError::DeleteFailed(e.to_string())),
        }
    }
}

/// In-process store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(String, String), String>>> {
        self.entries
            .lock()
            .map_err(|_| KeyringError::Internal("memory store poisoned".to_string()))
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, service: &str, account: &str) -> Result<Option<String>> {
        Ok(self
            .lock()?
            .get(&(service.to_string(), account.to_string()))
            .cloned())
    }

    fn set(&self, service: &str, account: &str, value: &str) -> Result<()> {
        self.lock()?
            .insert((service.to_string(), account.to_string()), value.to_string());
        Ok(())
    }

    fn delete(&self, service: &str, account: &str) -> Result<bool> {
        Ok(self
            .lock()?
            .remove(&(service.to_string(), account.to_string()))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get(ECLIPSE_SERVICE, AUTH_ACCOUNT).unwrap(), None);

        store.set(ECLIPSE_SERVICE, AUTH_ACCOUNT, "a=1\n").unwrap();
        assert_eq!(
            store.get(ECLIPSE_SERVICE, AUTH_ACCOUNT).unwrap().as_deref(),
            Some("a=1\n")
        );

        // Accounts are independent
        assert_eq!(store.get(ECLIPSE_SERVICE, CORE_ACCOUNT).unwrap(), None);

        assert!(store.delete(ECLIPSE_SERVICE, AUTH_ACCOUNT).unwrap());
        assert!(!store.delete(ECLIPSE_SERVICE, AUTH_ACCOUNT).unwrap());
        assert_eq!(store.get(ECLIPSE_SERVICE, AUTH_ACCOUNT).unwrap(), None);
    }

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryStore::new();
        store.set("svc", "acct", "first").unwrap();
        store.set("svc", "acct", "second").unwrap();
        assert_eq!(store.get("svc", "acct").unwrap().as_deref(), Some("second"));
    }

    // Note: These tests require a working keyring on the system.
    // They are marked as ignored by default to avoid CI failures.

    #[test]
    #[ignore]
    fn test_keyring_store_and_retrieve() {
        let store = KeyringStore::new();
        let service = "eclipse-test";

        store.set(service, "test-key", "test-value-12345").expect("Failed to store");
        let retrieved = store.get(service, "test-key").expect("Failed to get");
        assert_eq!(retrieved, Some("test-value-12345".to_string()));

        assert!(store.delete(service, "test-key").expect("Failed to delete"));
        assert!(store.get(service, "test-key").expect("Failed to get").is_none());
    }

    #[test]
    #[ignore]
    fn test_keyring_not_found() {
        let store = KeyringStore::new();
        let result = store.get("eclipse-test", "nonexistent-key-12345");
        assert!(matches!(result, Ok(None)));
    }
}
