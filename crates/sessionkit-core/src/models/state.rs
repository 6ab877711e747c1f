use chrono::{DateTime, Utc};

use super::{Session, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Initializing,
    Unauthenticated,
    Authenticated,
}

/// Authentication state shared with the UI.
///
/// Fields are private so the only way to build one is through the
/// constructors below, which keep `is_authenticated` in step with the
/// presence of a user and token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    is_authenticated: bool,
    user: Option<User>,
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    is_loading: bool,
}

impl AuthState {
    /// State before `initialize()` has finished.
    pub fn initializing() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            token: None,
            expires_at: None,
            is_loading: true,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            is_loading: false,
            ..Self::initializing()
        }
    }

    pub fn authenticated(session: &Session) -> Self {
        Self {
            is_authenticated: true,
            user: Some(session.user.clone()),
            token: Some(session.token.clone()),
            expires_at: Some(session.expires_at),
            is_loading: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// The active session, rebuilt from the state's parts.
    pub fn session(&self) -> Option<Session> {
        match (&self.user, &self.token, self.expires_at) {
            (Some(user), Some(token), Some(expires_at)) if self.is_authenticated => Some(Session {
                user: user.clone(),
                token: token.clone(),
                expires_at,
            }),
            _ => None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_loading {
            SessionPhase::Initializing
        } else if self.is_authenticated {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unauthenticated
        }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::initializing()
    }
}
