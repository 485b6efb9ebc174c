//! Token Store
//!
//! Holds the access token and the signed-in user's profile. Every change is
//! written through to a [`CredentialStorage`]; storage failures are logged
//! and otherwise ignored, the in-memory copy stays authoritative for the
//! running process.

use crate::storage::{CredentialStorage, MemoryStorage};
use mt_common::{Role, UserProfile};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key of the access token
pub const TOKEN_KEY: &str = "token";
/// Storage key of the serialized user profile
pub const USER_KEY: &str = "user";

#[derive(Default)]
struct Credentials {
    token: Option<String>,
    user: Option<UserProfile>,
}

struct Inner {
    storage: Arc<dyn CredentialStorage>,
    credentials: RwLock<Credentials>,
}

/// Shared handle to the current credentials. Cloning is cheap.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Inner>,
}

impl TokenStore {
    /// Create a store on top of `storage`, loading whatever it already holds.
    pub fn new<S: CredentialStorage + 'static>(storage: S) -> Self {
        Self::from_shared(Arc::new(storage))
    }

    pub fn from_shared(storage: Arc<dyn CredentialStorage>) -> Self {
        let credentials = load(storage.as_ref());
        Self {
            inner: Arc::new(Inner {
                storage,
                credentials: RwLock::new(credentials),
            }),
        }
    }

    /// A store that forgets everything when the process exits.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        let token = token.into();
        self.persist(TOKEN_KEY, Some(&token));
        self.inner.credentials.write().token = Some(token);
    }

    pub fn get_access_token(&self) -> Option<String> {
        self.inner.credentials.read().token.clone()
    }

    pub fn has_access_token(&self) -> bool {
        self.inner.credentials.read().token.is_some()
    }

    pub fn remove_access_token(&self) {
        self.persist(TOKEN_KEY, None);
        self.inner.credentials.write().token = None;
    }

    /// Store the profile, or remove it when `None`.
    pub fn set_user(&self, user: Option<UserProfile>) {
        match &user {
            Some(profile) => match serde_json::to_string(profile) {
                Ok(json) => self.persist(USER_KEY, Some(&json)),
                Err(e) => warn!(error = %e, "Failed to serialize user profile"),
            },
            None => self.persist(USER_KEY, None),
        }
        self.inner.credentials.write().user = user;
    }

    pub fn get_user(&self) -> Option<UserProfile> {
        self.inner.credentials.read().user.clone()
    }

    pub fn get_user_role(&self) -> Option<Role> {
        self.inner
            .credentials
            .read()
            .user
            .as_ref()
            .and_then(|u| u.role.clone())
    }

    /// Forget token and user together.
    pub fn clear(&self) {
        self.remove_access_token();
        self.set_user(None);
        debug!("Credentials cleared");
    }

    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.inner.storage.set(key, value),
            None => self.inner.storage.remove(key),
        };
        if let Err(e) = result {
            warn!(key, error = %e, "Failed to persist credentials");
        }
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credentials = self.inner.credentials.read();
        f.debug_struct("TokenStore")
            .field("has_token", &credentials.token.is_some())
            .field("user", &credentials.user.as_ref().map(|u| u.email.as_str()))
            .field("storage", &self.inner.storage)
            .finish()
    }
}

fn load(storage: &dyn CredentialStorage) -> Credentials {
    let token = storage.get(TOKEN_KEY).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read stored access token");
        None
    });

    let user = match storage.get(USER_KEY) {
        Ok(Some(json)) => match serde_json::from_str::<UserProfile>(&json) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable stored user profile");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "Failed to read stored user profile");
            None
        }
    };

    Credentials { token, user }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileStorage;

    #[test]
    fn test_token_round_trip() {
        let store = TokenStore::in_memory();
        assert_eq!(store.get_access_token(), None);

        store.set_access_token("t");
        assert_eq!(store.get_access_token().as_deref(), Some("t"));

        store.set_access_token("t2");
        assert_eq!(store.get_access_token().as_deref(), Some("t2"));

        store.remove_access_token();
        assert_eq!(store.get_access_token(), None);
    }

    #[test]
    fn test_role_comes_from_user() {
        let store = TokenStore::in_memory();
        assert_eq!(store.get_user_role(), None);

        store.set_user(Some(UserProfile::placeholder("a@b.com", Some(Role::Admin))));
        assert_eq!(store.get_user_role(), Some(Role::Admin));

        store.set_user(None);
        assert_eq!(store.get_user(), None);
        assert_eq!(store.get_user_role(), None);
    }

    #[test]
    fn test_clones_share_state() {
        let store = TokenStore::in_memory();
        let other = store.clone();
        store.set_access_token("abc");
        assert_eq!(other.get_access_token().as_deref(), Some("abc"));

        other.clear();
        assert!(!store.has_access_token());
    }

    #[test]
    fn test_file_backed_store_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = TokenStore::new(FileStorage::new(&path));
        store.set_access_token("abc");
        store.set_user(Some(UserProfile::placeholder("a@b.com", Some(Role::Paciente))));

        let reloaded = TokenStore::new(FileStorage::new(&path));
        assert_eq!(reloaded.get_access_token().as_deref(), Some("abc"));
        assert_eq!(reloaded.get_user_role(), Some(Role::Paciente));

        reloaded.clear();
        let after_clear = TokenStore::new(FileStorage::new(&path));
        assert_eq!(after_clear.get_access_token(), None);
        assert_eq!(after_clear.get_user(), None);
    }

    #[test]
    fn test_unreadable_user_is_ignored() {
        let storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "abc").unwrap();
        storage.set(USER_KEY, "{broken").unwrap();

        let store = TokenStore::new(storage);
        assert_eq!(store.get_access_token().as_deref(), Some("abc"));
        assert_eq!(store.get_user(), None);
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let store = TokenStore::in_memory();
        store.set_access_token("super-secret");
        assert!(!format!("{:?}", store).contains("super-secret"));
    }
}
