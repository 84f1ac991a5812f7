//! Session and app config persistence.
//!
//! Both records live in the credential store under the `eclipse` service,
//! serialized as flat notation and written with a single `set`, so a record is
//! either absent or complete.

use std::sync::Arc;

use eclipse_common::{from_notation, to_notation};
use eclipse_keyring_store::CredentialStore;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::constants::{AUTH_ACCOUNT, CORE_ACCOUNT, KEYRING_SERVICE};
use crate::error::LoginError;
use crate::types::{AppConfig, Session};

/// One notation-encoded record in the credential store.
#[derive(Clone)]
struct StoredRecord {
    store: Arc<dyn CredentialStore>,
    account: &'static str,
}

impl StoredRecord {
    fn load_raw(&self) -> Result<Option<String>, LoginError> {
        Ok(self.store.get(KEYRING_SERVICE, self.account)?)
    }

    fn load<T: DeserializeOwned>(&self) -> Result<Option<T>, LoginError> {
        match self.load_raw()? {
            Some(text) => Ok(Some(from_notation(&text)?)),
            None => Ok(None),
        }
    }

    fn save<T: Serialize>(&self, value: &T) -> Result<(), LoginError> {
        let text = to_notation(value)?;
        self.store.set(KEYRING_SERVICE, self.account, &text)?;
        tracing::debug!(account = self.account, "Saved record");
        Ok(())
    }

    fn delete(&self) -> Result<bool, LoginError> {
        Ok(self.store.delete(KEYRING_SERVICE, self.account)?)
    }
}

/// The cached session under `(eclipse, auth)`.
#[derive(Clone)]
pub struct SessionStore {
    record: StoredRecord,
}

impl SessionStore {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            record: StoredRecord {
                store,
                account: AUTH_ACCOUNT,
            },
        }
    }

    pub fn load(&self) -> Result<Option<Session>, LoginError> {
        self.record.load()
    }

    pub fn save(&self, session: &Session) -> Result<(), LoginError> {
        self.record.save(session)
    }

    /// Returns whether a session was removed.
    pub fn delete(&self) -> Result<bool, LoginError> {
        self.record.delete()
    }
}

/// The app configuration under `(eclipse, core)`.
#[derive(Clone)]
pub struct AppConfigStore {
    record: StoredRecord,
}

impl AppConfigStore {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            record: StoredRecord {
                store,
                account: CORE_ACCOUNT,
            },
        }
    }

    pub fn load(&self) -> Result<Option<AppConfig>, LoginError> {
        self.record.load()
    }

    /// Load the config, failing with [`LoginError::ConfigMissing`] when absent.
    pub fn require(&self) -> Result<AppConfig, LoginError> {
        self.load()?.ok_or(LoginError::ConfigMissing)
    }

    pub fn save(&self, config: &AppConfig) -> Result<(), LoginError> {
        self.record.save(config)
    }

    pub fn delete(&self) -> Result<bool, LoginError> {
        self.record.delete()
    }

    /// Persist `first_run = false`. Returns the previous value.
    pub fn clear_first_run(&self) -> Result<bool, LoginError> {
        let mut config = self.require()?;
        let was_first_run = config.first_run;
        if was_first_run {
            config.first_run = false;
            self.save(&config)?;
        }
        Ok(was_first_run)
    }
}
