use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rand::Rng;

use crate::models::User;

/// Length of the random suffix on mock tokens
const TOKEN_SUFFIX_LEN: usize = 9;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A freshly issued user and token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: User,
    pub token: String,
}

/// Source of user ids and tokens for new sessions.
///
/// The mock provider stands in for a real issuer; no credentials are checked.
pub trait IdentityProvider: Send + Sync {
    fn issue(&self, email: &str, name: Option<&str>) -> Identity;
}

/// Name to record for a user: the given name, or the local part of the email.
pub fn default_name(email: &str, name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(n) => n.to_string(),
        None => email.split('@').next().unwrap_or(email).to_string(),
    }
}

/// Issues `user_<ms>` ids and `mock_token_<ms>_<random>` tokens.
#[derive(Debug, Default)]
pub struct MockIdentityProvider;

impl MockIdentityProvider {
    fn random_suffix() -> String {
        let mut rng = rand::thread_rng();
        (0..TOKEN_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect()
    }
}

impl IdentityProvider for MockIdentityProvider {
    fn issue(&self, email: &str, name: Option<&str>) -> Identity {
        let now = Utc::now().timestamp_millis();
        Identity {
            user: User {
                id: format!("user_{}", now),
                email: email.to_string(),
                name: Some(default_name(email, name)),
            },
            token: format!("mock_token_{}_{}", now, Self::random_suffix()),
        }
    }
}

/// Predictable ids for tests: `user_1`/`token_1`, `user_2`/`token_2`, ...
#[derive(Debug, Default)]
pub struct SequentialIdentityProvider {
    counter: AtomicU64,
}

impl SequentialIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityProvider for SequentialIdentityProvider {
    fn issue(&self, email: &str, name: Option<&str>) -> Identity {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Identity {
            user: User {
                id: format!("user_{}", n),
                email: email.to_string(),
                name: Some(default_name(email, name)),
            },
            token: format!("token_{}", n),
        }
    }
}
