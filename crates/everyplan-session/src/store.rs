//! In-memory credential store.
//!
//! The store is the single source of truth for the current credential pair.
//! It lives only as long as the process: nothing is written to disk, so a
//! long-lived refresh token is never left where another program can read it.

use std::sync::{Arc, PoisonError, RwLock};

use everyplan_core::CredentialPair;
use tracing::debug;

/// Shared handle to the current credential pair.
///
/// Clones share the same underlying slot.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    pair: Arc<RwLock<Option<CredentialPair>>>,
}

impl CredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with a pair.
    pub fn with_pair(pair: CredentialPair) -> Self {
        let store = Self::new();
        store.set(pair);
        store
    }

    /// Replaces the stored pair.
    pub fn set(&self, pair: CredentialPair) {
        *self.pair.write().unwrap_or_else(PoisonError::into_inner) = Some(pair);
        debug!("credential pair replaced");
    }

    /// Returns a clone of the current pair.
    pub fn get(&self) -> Option<CredentialPair> {
        self.pair
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the current access token.
    pub fn access_token(&self) -> Option<String> {
        self.get().map(|pair| pair.access_token().to_string())
    }

    /// Returns the current refresh token.
    pub fn refresh_token(&self) -> Option<String> {
        self.get().map(|pair| pair.refresh_token().to_string())
    }

    /// Replaces only the access token, keeping the current refresh token.
    ///
    /// Returns false (and changes nothing) when no pair is stored, since a
    /// lone access token would be a partial pair.
    pub fn rotate_access_token(&self, access_token: &str) -> bool {
        let mut slot = self.pair.write().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref().and_then(|pair| pair.with_access_token(access_token)) {
            Some(next) => {
                *slot = Some(next);
                debug!("access token rotated");
                true
            }
            None => false,
        }
    }

    /// Removes the stored pair.
    pub fn clear(&self) {
        let previous = self
            .pair
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            debug!("credential pair cleared");
        }
    }

    /// Returns true when a full pair is stored.
    pub fn is_authenticated(&self) -> bool {
        self.pair
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access: &str, refresh: &str) -> CredentialPair {
        CredentialPair::new(access, refresh).unwrap()
    }

    #[test]
    fn set_get_clear() {
        let store = CredentialStore::new();
        assert!(store.get().is_none());
        assert!(!store.is_authenticated());

        store.set(pair("a1", "r1"));
        assert!(store.is_authenticated());
        assert_eq!(store.access_token().as_deref(), Some("a1"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));

        store.set(pair("a2", "r2"));
        assert_eq!(store.get(), Some(pair("a2", "r2")));

        store.clear();
        assert!(store.get().is_none());
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
    }

    #[test]
    fn clones_share_state() {
        let store = CredentialStore::new();
        let other = store.clone();
        store.set(pair("a", "r"));
        assert!(other.is_authenticated());
        other.clear();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn rotate_requires_existing_pair() {
        let store = CredentialStore::new();
        assert!(!store.rotate_access_token("a"));
        assert!(store.get().is_none());

        store.set(pair("a1", "r1"));
        assert!(store.rotate_access_token("a2"));
        assert_eq!(store.get(), Some(pair("a2", "r1")));

        assert!(!store.rotate_access_token(""));
        assert_eq!(store.access_token().as_deref(), Some("a2"));
    }
}
