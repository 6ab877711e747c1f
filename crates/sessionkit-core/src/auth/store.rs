use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, error, warn};

use crate::error::StorageError;
use crate::models::{StoredAuthData, User};
use crate::storage::SessionStorage;

/// Storage key for the bearer token
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Storage key for the expiry, epoch milliseconds as text
pub const TOKEN_EXPIRY_KEY: &str = "tokenExpiry";

/// Storage key for the JSON-encoded user record
pub const USER_KEY: &str = "user";

const ALL_KEYS: [&str; 3] = [AUTH_TOKEN_KEY, TOKEN_EXPIRY_KEY, USER_KEY];

/// Persists the three session fields through a `SessionStorage` backend.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn backend_name(&self) -> &'static str {
        self.storage.name()
    }

    /// Write all three keys. On failure, keys already written are removed
    /// again so that no partial session is left behind.
    pub fn save(
        &self,
        user: &User,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(user)?;
        let expiry = expires_at.timestamp_millis().to_string();
        let writes = [
            (AUTH_TOKEN_KEY, token),
            (TOKEN_EXPIRY_KEY, expiry.as_str()),
            (USER_KEY, user_json.as_str()),
        ];

        for (written, (key, value)) in writes.iter().enumerate() {
            if let Err(e) = self.storage.set(key, value) {
                error!(backend = self.backend_name(), key, error = %e, "Failed to save session data");
                for (rollback_key, _) in &writes[..written] {
                    if let Err(e) = self.storage.remove(rollback_key) {
                        warn!(key = rollback_key, error = %e, "Failed to roll back partial session write");
                    }
                }
                return Err(e);
            }
        }

        debug!(backend = self.backend_name(), user_id = %user.id, "Saved session");
        Ok(())
    }

    /// Read the three keys. Any failure yields an all-empty result, and each
    /// field that fails to parse is reported as absent.
    pub fn load(&self) -> StoredAuthData {
        match self.try_load() {
            Ok(data) => data,
            Err(e) => {
                error!(backend = self.backend_name(), error = %e, "Failed to load session data");
                StoredAuthData::default()
            }
        }
    }

    fn try_load(&self) -> Result<StoredAuthData, StorageError> {
        let token = self.storage.get(AUTH_TOKEN_KEY)?;
        let expiry = self.storage.get(TOKEN_EXPIRY_KEY)?;
        let user_json = self.storage.get(USER_KEY)?;

        let expires_at = expiry.as_deref().and_then(parse_expiry);
        let user = user_json.as_deref().and_then(|json| {
            serde_json::from_str::<User>(json)
                .map_err(|e| warn!(error = %e, "Stored user record is not valid JSON"))
                .ok()
        });

        Ok(StoredAuthData {
            token,
            expires_at,
            user,
        })
    }

    /// Remove all three keys. Failures are logged, never returned.
    pub fn clear(&self) {
        for key in ALL_KEYS {
            if let Err(e) = self.storage.remove(key) {
                error!(backend = self.backend_name(), key, error = %e, "Failed to clear session data");
            }
        }
    }

    /// True iff a token and an unexpired expiry are both stored.
    pub fn is_valid(&self) -> bool {
        let data = self.load();
        match (data.token, data.expires_at) {
            (Some(_), Some(expires_at)) => Utc::now() < expires_at,
            _ => false,
        }
    }
}

fn parse_expiry(text: &str) -> Option<DateTime<Utc>> {
    let millis = match text.trim().parse::<i64>() {
        Ok(millis) => millis,
        Err(_) => {
            warn!(value = text, "Stored token expiry is not a number");
            return None;
        }
    };
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::storage::MemoryStorage;

    /// Memory storage that refuses writes to one key
    struct FailingStorage {
        inner: MemoryStorage,
        fail_key: &'static str,
    }

    impl SessionStorage for FailingStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == self.fail_key {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn user() -> User {
        User {
            id: "user_1".to_string(),
            email: "a@b.com".to_string(),
            name: Some("a".to_string()),
        }
    }

    fn store() -> (SessionStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (SessionStore::new(storage.clone()), storage)
    }

    #[test]
    fn test_save_writes_three_keys() {
        let (store, storage) = store();
        let expires_at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        store.save(&user(), "tok", expires_at).unwrap();

        assert_eq!(storage.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("tok"));
        assert_eq!(
            storage.get(TOKEN_EXPIRY_KEY).unwrap().as_deref(),
            Some("1700000000123")
        );
        assert_eq!(
            storage.get(USER_KEY).unwrap().as_deref(),
            Some(r#"{"id":"user_1","email":"a@b.com","name":"a"}"#)
        );
    }

    #[test]
    fn test_load_roundtrip() {
        let (store, _) = store();
        let expires_at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        store.save(&user(), "tok", expires_at).unwrap();

        let session = store.load().into_session().unwrap();
        assert_eq!(session.user, user());
        assert_eq!(session.token, "tok");
        assert_eq!(session.expires_at, expires_at);
    }

    #[test]
    fn test_clear_removes_everything() {
        let (store, storage) = store();
        store.save(&user(), "tok", Utc::now()).unwrap();
        store.clear();
        assert!(storage.is_empty());
        assert!(store.load().is_empty());
        store.clear();
    }

    #[test]
    fn test_is_valid() {
        let (store, _) = store();
        assert!(!store.is_valid());

        store.save(&user(), "tok", Utc::now() + Duration::minutes(5)).unwrap();
        assert!(store.is_valid());

        store.save(&user(), "tok", Utc::now() - Duration::seconds(1)).unwrap();
        assert!(!store.is_valid());
    }

    #[test]
    fn test_corrupt_fields_load_as_absent() {
        let (store, storage) = store();
        storage.set(AUTH_TOKEN_KEY, "tok").unwrap();
        storage.set(TOKEN_EXPIRY_KEY, "soon").unwrap();
        storage.set(USER_KEY, "{not json").unwrap();

        let data = store.load();
        assert_eq!(data.token.as_deref(), Some("tok"));
        assert!(data.expires_at.is_none());
        assert!(data.user.is_none());
        assert!(!store.is_valid());
        assert!(data.into_session().is_none());
    }

    #[test]
    fn test_failed_save_leaves_no_partial_session() {
        let storage = Arc::new(FailingStorage {
            inner: MemoryStorage::new(),
            fail_key: USER_KEY,
        });
        let store = SessionStore::new(storage.clone());

        let result = store.save(&user(), "tok", Utc::now() + Duration::minutes(5));
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(storage.inner.is_empty());
    }
}
