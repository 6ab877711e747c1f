//! Key-value storage backends for session data.
//!
//! Every backend implements `SessionStorage`. The backend is picked once at
//! startup from `Config` and handed to the `SessionStore` as a trait object:
//!
//! - `KeyringStorage`: OS keychain (encrypted, preferred)
//! - `FileStorage`: plain JSON file, the unencrypted fallback
//! - `EncryptedFileStorage`: JSON file sealed with ChaCha20-Poly1305
//! - `MemoryStorage`: in-process, for tests and ephemeral runs

pub mod encrypted;
pub mod file;
pub mod keyring;
pub mod memory;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

pub use self::encrypted::EncryptedFileStorage;
pub use self::file::FileStorage;
pub use self::keyring::KeyringStorage;
pub use self::memory::MemoryStorage;

/// Minimal string key-value capability a session backend must provide.
///
/// `get` returns `Ok(None)` for a missing key and `remove` on a missing key
/// is not an error.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    #[default]
    Keyring,
    File,
    EncryptedFile,
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageBackend::Keyring => "keyring",
            StorageBackend::File => "file",
            StorageBackend::EncryptedFile => "encrypted-file",
            StorageBackend::Memory => "memory",
        };
        f.write_str(name)
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyring" | "keychain" => Ok(StorageBackend::Keyring),
            "file" => Ok(StorageBackend::File),
            "encrypted-file" | "encrypted" => Ok(StorageBackend::EncryptedFile),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("keychain".parse::<StorageBackend>(), Ok(StorageBackend::Keyring));
        assert_eq!(" File ".parse::<StorageBackend>(), Ok(StorageBackend::File));
        assert_eq!("encrypted".parse::<StorageBackend>(), Ok(StorageBackend::EncryptedFile));
        assert!("s3".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_backend_display_matches_serde() {
        for backend in [
            StorageBackend::Keyring,
            StorageBackend::File,
            StorageBackend::EncryptedFile,
            StorageBackend::Memory,
        ] {
            let json = serde_json::to_string(&backend).unwrap();
            assert_eq!(json, format!("\"{}\"", backend));
        }
    }
}
