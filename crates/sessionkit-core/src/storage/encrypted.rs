//! Passphrase-encrypted file backend.
//!
//! File layout: `salt (16 bytes) || nonce (12 bytes) || ciphertext`, where the
//! plaintext is the same JSON object `FileStorage` writes. The key is derived
//! from the passphrase and salt with Argon2id. The salt is kept for the life
//! of the instance and the derived key is cached against it, so one session
//! operation costs at most one derivation. A fresh nonce is drawn on every
//! write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use tracing::debug;

use super::SessionStorage;
use crate::error::StorageError;

/// Encrypted store file name in the cache directory
pub const ENCRYPTED_STORE_FILE: &str = "session-store.enc";

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

type CachedKey = ([u8; SALT_LEN], [u8; KEY_LEN]);

pub struct EncryptedFileStorage {
    path: PathBuf,
    passphrase: String,
    params: Params,
    key_cache: Mutex<Option<CachedKey>>,
    #[cfg(test)]
    derivations: std::sync::atomic::AtomicUsize,
}

impl EncryptedFileStorage {
    /// Uses Argon2's default cost parameters.
    pub fn new(path: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self::with_params(path, passphrase, Params::default())
    }

    pub fn with_params(
        path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
        params: Params,
    ) -> Self {
        Self {
            path: path.into(),
            passphrase: passphrase.into(),
            params,
            key_cache: Mutex::new(None),
            #[cfg(test)]
            derivations: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Storage at `<dir>/session-store.enc`.
    pub fn in_dir(dir: &Path, passphrase: impl Into<String>) -> Self {
        Self::new(dir.join(ENCRYPTED_STORE_FILE), passphrase)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_cache(&self) -> MutexGuard<'_, Option<CachedKey>> {
        self.key_cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Key for `salt`, derived only when it differs from the cached salt.
    fn key_for(&self, salt: [u8; SALT_LEN]) -> Result<[u8; KEY_LEN], StorageError> {
        let mut cache = self.lock_cache();
        if let Some((cached_salt, key)) = cache.as_ref() {
            if *cached_salt == salt {
                return Ok(*key);
            }
        }
        let key = self.derive_key(&salt)?;
        *cache = Some((salt, key));
        Ok(key)
    }

    /// Salt to seal the next write with: the cached one, or a new one.
    fn write_salt(&self) -> [u8; SALT_LEN] {
        if let Some((salt, _)) = self.lock_cache().as_ref() {
            return *salt;
        }
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        salt
    }

    fn derive_key(&self, salt: &[u8]) -> Result<[u8; KEY_LEN], StorageError> {
        #[cfg(test)]
        self.derivations
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let mut key = [0u8; KEY_LEN];
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
            .hash_password_into(self.passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| StorageError::Crypto(format!("key derivation failed: {}", e)))?;
        Ok(key)
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let bytes = std::fs::read(&self.path)?;
        if bytes.len() < SALT_LEN + NONCE_LEN {
            return Err(StorageError::Crypto("store file is truncated".to_string()));
        }
        let (salt, rest) = bytes.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let mut salt_bytes = [0u8; SALT_LEN];
        salt_bytes.copy_from_slice(salt);

        let key = self.key_for(salt_bytes)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| StorageError::Crypto("wrong passphrase or corrupted store".to_string()))?;

        Ok(serde_json::from_slice(&plaintext)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
                debug!(path = %self.path.display(), "Removed empty encrypted store");
            }
            return Ok(());
        }

        let salt = self.write_salt();
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let key = self.key_for(salt)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let plaintext = serde_json::to_vec(entries)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| StorageError::Crypto("encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, out)?;
        Ok(())
    }
}

impl SessionStorage for EncryptedFileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "encrypted-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_params() -> Params {
        Params::new(8, 1, 1, Some(KEY_LEN)).unwrap()
    }

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sessionkit-enc-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join(ENCRYPTED_STORE_FILE)
    }

    #[test]
    fn test_roundtrip_with_same_passphrase() {
        let path = temp_path("roundtrip");
        let storage = EncryptedFileStorage::with_params(&path, "hunter2", cheap_params());
        storage.set("authToken", "mock_token_1").unwrap();

        let reopened = EncryptedFileStorage::with_params(&path, "hunter2", cheap_params());
        assert_eq!(reopened.get("authToken").unwrap().as_deref(), Some("mock_token_1"));

        let raw = std::fs::read(&path).unwrap();
        let needle = b"mock_token_1";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_key_derived_once_per_instance() {
        let path = temp_path("derive-once");
        let storage = EncryptedFileStorage::with_params(&path, "pw", cheap_params());
        for (key, value) in [("authToken", "t"), ("tokenExpiry", "1"), ("user", "{}")] {
            storage.set(key, value).unwrap();
        }
        assert_eq!(storage.get("user").unwrap().as_deref(), Some("{}"));
        storage.remove("authToken").unwrap();
        assert_eq!(storage.derivations.load(std::sync::atomic::Ordering::Relaxed), 1);

        // A fresh instance derives once for the salt on disk, then reuses it
        let reopened = EncryptedFileStorage::with_params(&path, "pw", cheap_params());
        assert_eq!(reopened.get("tokenExpiry").unwrap().as_deref(), Some("1"));
        reopened.set("authToken", "t2").unwrap();
        assert_eq!(reopened.get("authToken").unwrap().as_deref(), Some("t2"));
        assert_eq!(reopened.derivations.load(std::sync::atomic::Ordering::Relaxed), 1);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_wrong_passphrase_fails() {
        let path = temp_path("wrong");
        EncryptedFileStorage::with_params(&path, "right", cheap_params())
            .set("user", "{}")
            .unwrap();

        let other = EncryptedFileStorage::with_params(&path, "wrong", cheap_params());
        assert!(matches!(other.get("user"), Err(StorageError::Crypto(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_truncated_file_fails() {
        let path = temp_path("truncated");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, [0u8; 10]).unwrap();

        let storage = EncryptedFileStorage::with_params(&path, "x", cheap_params());
        assert!(matches!(storage.get("user"), Err(StorageError::Crypto(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
