use chrono::{DateTime, Duration, Utc};

use super::User;

/// A complete session. There is no partially populated variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left until expiry, clamped at zero.
    pub fn time_until_expiry(&self) -> Duration {
        (self.expires_at - Utc::now()).max(Duration::zero())
    }
}

/// Raw result of reading the three session keys. Each part is loaded
/// independently, so any of them may be missing or unparseable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredAuthData {
    pub token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: Option<User>,
}

impl StoredAuthData {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.expires_at.is_none() && self.user.is_none()
    }

    /// Returns a session only when all three parts are present.
    pub fn into_session(self) -> Option<Session> {
        match (self.user, self.token, self.expires_at) {
            (Some(user), Some(token), Some(expires_at)) => Some(Session {
                user,
                token,
                expires_at,
            }),
            _ => None,
        }
    }
}
