//! Identity service: the account registry and the current session.
//!
//! `authenticate` and `register` model a network round trip with an
//! artificial delay. The registry lock is never held across that delay, so
//! other calls proceed while one of them is pending.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::error::{AuthError, RegistrationError, RemovalError};
use crate::model::{Account, Role};
use crate::traits::{SessionStore, SESSION_KEY};

/// Delay applied to `authenticate` and `register` unless configured.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(500);

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the account registry and the single active session.
pub struct IdentityService {
    /// Accounts in registration order.
    registry: RwLock<Vec<Account>>,
    session: RwLock<Option<Account>>,
    store: Arc<dyn SessionStore>,
    latency: Duration,
}

impl IdentityService {
    /// Create a service seeded with `accounts`.
    ///
    /// Seed entries with a blank or repeated unique ID are dropped.
    pub fn new(accounts: Vec<Account>, store: Arc<dyn SessionStore>) -> Self {
        let mut registry: Vec<Account> = Vec::with_capacity(accounts.len());
        for account in accounts {
            if account.unique_id.trim().is_empty() {
                tracing::warn!("skipping seed account with empty unique ID");
                continue;
            }
            if registry.iter().any(|a| a.unique_id == account.unique_id) {
                tracing::warn!(unique_id = %account.unique_id, "skipping duplicate seed account");
                continue;
            }
            registry.push(account);
        }

        Self {
            registry: RwLock::new(registry),
            session: RwLock::new(None),
            store,
            latency: DEFAULT_LATENCY,
        }
    }

    /// Set the simulated round-trip delay.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Restore the session cached by a previous run.
    ///
    /// A missing, unreadable, or malformed entry means no session. So does an
    /// entry naming an account that is not in the registry; that entry is
    /// cleared from the store. The restored account carries the registry's
    /// role, not the cached one.
    pub async fn restore_session(&self) -> Option<Account> {
        let stored = match self.store.load(SESSION_KEY).await {
            Ok(stored) => stored?,
            Err(e) => {
                tracing::warn!(store = self.store.name(), "failed to read stored session: {e:#}");
                return None;
            }
        };

        let cached = match serde_json::from_str::<Account>(&stored) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!("ignoring malformed stored session: {e}");
                return None;
            }
        };

        let Some(account) = self.find(&cached.unique_id) else {
            tracing::warn!(unique_id = %cached.unique_id, "stored session names an unknown account");
            if let Err(e) = self.store.remove(SESSION_KEY).await {
                tracing::warn!(store = self.store.name(), "failed to clear stored session: {e:#}");
            }
            return None;
        };

        tracing::debug!(unique_id = %account.unique_id, role = %account.role, "restored session");
        *write(&self.session) = Some(account.clone());
        Some(account)
    }

    /// Log in as `unique_id`.
    ///
    /// Resolves after the simulated delay. On success the account becomes the
    /// session and is cached in the session store.
    pub async fn authenticate(&self, unique_id: &str) -> Result<Account, AuthError> {
        tokio::time::sleep(self.latency).await;

        let Some(account) = self.find(unique_id) else {
            tracing::info!(unique_id, "login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        *write(&self.session) = Some(account.clone());
        self.persist(&account).await;

        tracing::info!(unique_id, role = %account.role, "logged in");
        Ok(account)
    }

    /// Clear the session and its cached copy. Safe to call repeatedly.
    pub async fn end_session(&self) {
        let previous = write(&self.session).take();

        if let Err(e) = self.store.remove(SESSION_KEY).await {
            tracing::warn!(store = self.store.name(), "failed to clear stored session: {e:#}");
        }

        if let Some(account) = previous {
            tracing::info!(unique_id = %account.unique_id, "logged out");
        }
    }

    /// Register a new student account. Does not log in.
    ///
    /// The ID is trimmed before it is checked and stored.
    pub async fn register(&self, unique_id: &str) -> Result<(), RegistrationError> {
        tokio::time::sleep(self.latency).await;

        let unique_id = unique_id.trim();
        if unique_id.is_empty() {
            return Err(RegistrationError::EmptyId);
        }

        {
            let mut registry = write(&self.registry);
            if registry.iter().any(|a| a.unique_id == unique_id) {
                return Err(RegistrationError::DuplicateId(unique_id.to_string()));
            }
            registry.push(Account::student(unique_id));
        }

        tracing::info!(unique_id, "registered student");
        Ok(())
    }

    /// All accounts in registration order.
    pub fn list_accounts(&self) -> Vec<Account> {
        read(&self.registry).clone()
    }

    /// Delete a student account. Master accounts can never be removed.
    pub fn remove_account(&self, unique_id: &str) -> Result<(), RemovalError> {
        let mut registry = write(&self.registry);

        let Some(index) = registry.iter().position(|a| a.unique_id == unique_id) else {
            return Err(RemovalError::NotFound(unique_id.to_string()));
        };

        match registry[index].role {
            Role::Admin => Err(RemovalError::ProtectedRole(unique_id.to_string())),
            Role::Student => {
                registry.remove(index);
                tracing::info!(unique_id, "removed account");
                Ok(())
            }
        }
    }

    /// The logged-in account, if any.
    pub fn current_session(&self) -> Option<Account> {
        read(&self.session).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        read(&self.session).is_some()
    }

    fn find(&self, unique_id: &str) -> Option<Account> {
        read(&self.registry)
            .iter()
            .find(|a| a.unique_id == unique_id)
            .cloned()
    }

    async fn persist(&self, account: &Account) {
        let json = match serde_json::to_string(account) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("failed to serialize session: {e}");
                return;
            }
        };
        if let Err(e) = self.store.save(SESSION_KEY, &json).await {
            tracing::warn!(store = self.store.name(), "failed to store session: {e:#}");
        }
    }
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("accounts", &read(&self.registry).len())
            .field("session", &*read(&self.session))
            .field("store", &self.store.name())
            .field("latency", &self.latency)
            .finish()
    }
}
