//! Session Store
//!
//! Holds the auth token and the cached user profile under two fixed keys.
//! The token alone decides whether the client counts as authenticated;
//! expiry is never tracked locally, the API reports it with a 401.
//!
//! - **types**: `Session`, `User`, `Role`
//! - **store**: `KeyValueStore` backends (`FileStore`, `MemoryStore`)

mod store;
mod types;

pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use types::{Role, Session, User};

use std::sync::Arc;
use thiserror::Error;

/// Key holding the bearer token
pub const TOKEN_KEY: &str = "iot_token";
/// Key holding the user profile JSON
pub const USER_KEY: &str = "iot_user";

/// Errors from the session backends
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Process-wide session store
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Session persisted to a JSON file
    pub fn file(path: impl Into<std::path::PathBuf>) -> Self {
        Self::new(Arc::new(FileStore::new(path)))
    }

    /// Session kept in memory only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn set_token(&self, token: &str) -> SessionResult<()> {
        self.backend.set(TOKEN_KEY, token)
    }

    /// Stored token, if any. Backend failures read as "no token".
    pub fn token(&self) -> Option<String> {
        match self.backend.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session token");
                None
            }
        }
    }

    pub fn set_user(&self, user: &User) -> SessionResult<()> {
        let json = serde_json::to_string(user)?;
        self.backend.set(USER_KEY, &json)
    }

    /// Cached user profile. A corrupt entry reads as no user.
    pub fn user(&self) -> Option<User> {
        let raw = match self.backend.get(USER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached user");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Cached user profile is corrupt");
                None
            }
        }
    }

    /// Token and user together, when both are present
    pub fn session(&self) -> Option<Session> {
        Some(Session {
            token: self.token()?,
            user: self.user()?,
        })
    }

    /// Store a fresh session. Token and profile are written together; on
    /// failure neither is left behind.
    pub fn store(&self, session: &Session) -> SessionResult<()> {
        let user = serde_json::to_string(&session.user)?;
        let written = self
            .backend
            .set_many(&[(TOKEN_KEY, session.token.as_str()), (USER_KEY, user.as_str())]);

        if let Err(e) = written {
            if let Err(clear_err) = self.clear() {
                tracing::warn!(error = %clear_err, "Failed to roll back partial session");
            }
            return Err(e);
        }
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Remove token and user together
    pub fn clear(&self) -> SessionResult<()> {
        self.backend.remove(&[TOKEN_KEY, USER_KEY])
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn admin() -> User {
        User::new("Carla Mendez", Role::OperativoAdmin)
    }

    #[test]
    fn test_empty_store() {
        let store = SessionStore::in_memory();
        assert!(!store.is_authenticated());
        assert!(store.user().is_none());
        assert!(store.session().is_none());
    }

    #[test]
    fn test_store_and_clear() {
        let store = SessionStore::in_memory();
        store
            .store(&Session {
                token: "tok-1".to_string(),
                user: admin(),
            })
            .unwrap();

        assert!(store.is_authenticated());
        assert_eq!(store.token().as_deref(), Some("tok-1"));
        assert_eq!(store.user().unwrap().full_name, "Carla Mendez");

        store.clear().unwrap();
        assert!(!store.is_authenticated());
        assert!(store.user().is_none());
    }

    #[test]
    fn test_token_alone_authenticates() {
        let store = SessionStore::in_memory();
        store.set_token("tok").unwrap();
        assert!(store.is_authenticated());
        assert!(store.session().is_none());
    }

    #[test]
    fn test_corrupt_user_reads_as_none() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(USER_KEY, "{broken").unwrap();
        let store = SessionStore::new(backend);
        assert!(store.user().is_none());
    }

    #[test]
    fn test_file_session_survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        SessionStore::file(&path)
            .store(&Session {
                token: "persisted".to_string(),
                user: admin(),
            })
            .unwrap();

        let reloaded = SessionStore::file(&path);
        let session = reloaded.session().unwrap();
        assert_eq!(session.token, "persisted");
        assert_eq!(session.user.role, Role::OperativoAdmin);

        reloaded.clear().unwrap();
        assert!(!SessionStore::file(&path).is_authenticated());
    }

    /// Accepts the token but refuses the profile entry
    #[derive(Default)]
    struct RejectingUserStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for RejectingUserStore {
        fn get(&self, key: &str) -> SessionResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> SessionResult<()> {
            if key == USER_KEY {
                return Err(SessionError::Io(std::io::Error::other("disk full")));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, keys: &[&str]) -> SessionResult<()> {
            self.inner.remove(keys)
        }
    }

    #[test]
    fn test_failed_store_leaves_no_token() {
        let store = SessionStore::new(Arc::new(RejectingUserStore::default()));
        let result = store.store(&Session {
            token: "half".to_string(),
            user: admin(),
        });

        assert!(matches!(result, Err(SessionError::Io(_))));
        assert!(!store.is_authenticated());
        assert!(store.session().is_none());
    }

    #[test]
    fn test_corrupt_session_file_can_be_cleared_and_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{truncated").unwrap();
        let store = SessionStore::file(&path);

        store.clear().unwrap();
        assert!(!store.is_authenticated());

        std::fs::write(&path, "{truncated").unwrap();
        store
            .store(&Session {
                token: "tok-2".to_string(),
                user: admin(),
            })
            .unwrap();
        assert_eq!(store.token().as_deref(), Some("tok-2"));
        assert_eq!(store.user().unwrap().role, Role::OperativoAdmin);
    }
}
