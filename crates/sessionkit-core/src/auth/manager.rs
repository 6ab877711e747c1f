//! Session lifecycle: restore, login, signup, logout and auto-expiry.
//!
//! `SessionManager` is the single writer of `AuthState`. Dependents read it
//! through `state()` or follow changes through `subscribe()`. Each active
//! session owns at most one expiry timer; arming a new one aborts the old.
//!
//! Every operation that touches storage runs under one operation lock, so a
//! timer firing on another worker thread cannot interleave with a login.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::identity::IdentityProvider;
use super::store::SessionStore;
use super::validation::{validate_login, validate_reset, validate_signup};
use crate::error::AuthError;
use crate::models::{AuthState, Session};

/// Default session lifetime in minutes
pub const TOKEN_EXPIRY_MINUTES: i64 = 5;

/// Timer deadline used when the lifetime does not fit the monotonic clock
const FAR_FUTURE_SECS: u64 = 60 * 60 * 24 * 365;

struct ExpiryTimer {
    /// Token of the session this timer belongs to
    token: String,
    handle: JoinHandle<()>,
}

struct Inner {
    store: SessionStore,
    identity: Box<dyn IdentityProvider>,
    lifetime: Duration,
    state: watch::Sender<AuthState>,
    timer: Mutex<Option<ExpiryTimer>>,
    /// Held for the whole of each storage-touching operation. Never held
    /// across an `.await`.
    ops: Mutex<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let timer = self
            .timer
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(timer) = timer {
            timer.handle.abort();
        }
    }
}

/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(store: SessionStore, identity: Box<dyn IdentityProvider>) -> Self {
        Self::with_lifetime(store, identity, Duration::minutes(TOKEN_EXPIRY_MINUTES))
    }

    pub fn with_lifetime(
        store: SessionStore,
        identity: Box<dyn IdentityProvider>,
        lifetime: Duration,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::initializing());
        Self {
            inner: Arc::new(Inner {
                store,
                identity,
                lifetime,
                state,
                timer: Mutex::new(None),
                ops: Mutex::new(()),
            }),
        }
    }

    /// Current state snapshot. A session whose wall-clock expiry has passed
    /// is logged out here even if its timer has not fired yet.
    pub fn state(&self) -> AuthState {
        self.inner.enforce_expiry();
        self.inner.state.borrow().clone()
    }

    /// Receiver that sees every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Time left on the active session, if any.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.inner.enforce_expiry();
        self.inner
            .state
            .borrow()
            .expires_at()
            .map(|at| (at - Utc::now()).max(Duration::zero()))
    }

    /// Restore a stored session if it has not expired, otherwise clear the
    /// store. Always leaves the manager out of the loading state.
    pub async fn initialize(&self) {
        let inner = &self.inner;
        let _ops = inner.lock_ops();
        let restored = if inner.store.is_valid() {
            inner.store.load().into_session()
        } else {
            None
        };

        match restored {
            Some(session) if !session.is_expired() => {
                info!(user_id = %session.user.id, backend = inner.store.backend_name(), "Restored session");
                let remaining = session.time_until_expiry();
                self.adopt(session, remaining);
            }
            _ => {
                debug!("No valid stored session");
                inner.clear_session();
            }
        }
    }

    /// Mock login. Any non-empty password is accepted.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        match self.try_login(email, password).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Login failed");
                false
            }
        }
    }

    pub async fn try_login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        validate_login(email, password)?;
        self.start_session(email, None)
    }

    pub async fn signup(&self, email: &str, password: &str, name: Option<&str>) -> bool {
        match self.try_signup(email, password, name).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Signup failed");
                false
            }
        }
    }

    pub async fn try_signup(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<(), AuthError> {
        validate_signup(email, password)?;
        self.start_session(email, name)
    }

    /// Clear storage and memory. Safe to call when already logged out.
    pub async fn logout(&self) {
        let _ops = self.inner.lock_ops();
        self.inner.clear_session();
    }

    /// Mock reset: only the email shape is checked, nothing is sent.
    pub async fn reset_password(&self, email: &str) -> bool {
        match self.try_reset_password(email).await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Password reset rejected");
                false
            }
        }
    }

    pub async fn try_reset_password(&self, email: &str) -> Result<(), AuthError> {
        validate_reset(email)?;
        info!("Password reset requested");
        Ok(())
    }

    fn start_session(&self, email: &str, name: Option<&str>) -> Result<(), AuthError> {
        let inner = &self.inner;
        let _ops = inner.lock_ops();
        let identity = inner.identity.issue(email, name);
        let session = Session {
            user: identity.user,
            token: identity.token,
            expires_at: Utc::now()
                .checked_add_signed(inner.lifetime)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        if let Err(e) = inner
            .store
            .save(&session.user, &session.token, session.expires_at)
        {
            inner.recover_failed_save();
            return Err(e.into());
        }

        info!(user_id = %session.user.id, backend = inner.store.backend_name(), "Session started");
        self.adopt(session, inner.lifetime);
        Ok(())
    }

    /// Caller holds the operation lock.
    fn adopt(&self, session: Session, remaining: Duration) {
        self.arm_timer(&session.token, remaining);
        self.inner.state.send_replace(AuthState::authenticated(&session));
    }

    fn arm_timer(&self, token: &str, after: Duration) {
        // Deadline is fixed now, not when the task is first polled.
        let now = tokio::time::Instant::now();
        let deadline = now
            .checked_add(after.to_std().unwrap_or_default())
            .unwrap_or_else(|| now + std::time::Duration::from_secs(FAR_FUTURE_SECS));
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let owner = token.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = weak.upgrade() {
                inner.expire(&owner);
            }
        });

        let previous = self.inner.lock_timer().replace(ExpiryTimer {
            token: token.to_string(),
            handle,
        });
        if let Some(previous) = previous {
            debug!(token_changed = previous.token != token, "Replacing outstanding expiry timer");
            previous.handle.abort();
        }
    }
}

impl Inner {
    fn lock_timer(&self) -> MutexGuard<'_, Option<ExpiryTimer>> {
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_ops(&self) -> MutexGuard<'_, ()> {
        self.ops.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cancel_timer(&self) {
        if let Some(timer) = self.lock_timer().take() {
            timer.handle.abort();
        }
    }

    /// Caller holds the operation lock.
    fn clear_session(&self) {
        self.store.clear();
        self.cancel_timer();
        self.state.send_if_modified(|state| {
            if *state == AuthState::unauthenticated() {
                return false;
            }
            *state = AuthState::unauthenticated();
            true
        });
        debug!("Logged out");
    }

    /// A new session failed to save and the store rolled back its own
    /// writes, which may have removed the previous session's keys. Put the
    /// active session back, or log out if that fails too. Caller holds the
    /// operation lock.
    fn recover_failed_save(&self) {
        let previous = self.state.borrow().session();
        let Some(previous) = previous else {
            return;
        };
        match self
            .store
            .save(&previous.user, &previous.token, previous.expires_at)
        {
            Ok(()) => debug!(user_id = %previous.user.id, "Kept previous session after failed save"),
            Err(e) => {
                warn!(error = %e, "Could not restore previous session, logging out");
                self.clear_session();
            }
        }
    }

    fn enforce_expiry(&self) {
        let expired = {
            let state = self.state.borrow();
            match (state.token(), state.expires_at()) {
                (Some(token), Some(at)) if Utc::now() >= at => Some(token.to_string()),
                _ => None,
            }
        };
        if let Some(token) = expired {
            self.expire(&token);
        }
    }

    /// Logs out only if `token` is still the active session. The check and
    /// the logout happen under the operation lock.
    fn expire(&self, token: &str) {
        let _ops = self.lock_ops();
        let current = self.state.borrow().token() == Some(token);
        if !current {
            debug!("Ignoring expiry for a session that is no longer active");
            return;
        }
        info!("Session expired");
        self.clear_session();
    }
}
