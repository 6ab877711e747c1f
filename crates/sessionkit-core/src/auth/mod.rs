//! Authentication module for the mock session lifecycle.
//!
//! This module provides:
//! - `SessionManager`: in-memory auth state, login/signup/logout, auto-expiry
//! - `SessionStore`: persistence of token, expiry and user through a backend
//! - `IdentityProvider`: issues user ids and tokens (mock by default)
//! - Validation rules for the login, signup and reset forms
//!
//! Sessions expire 5 minutes after they are issued unless configured otherwise.

pub mod identity;
pub mod manager;
pub mod store;
pub mod validation;

pub use identity::{Identity, IdentityProvider, MockIdentityProvider, SequentialIdentityProvider};
pub use manager::{SessionManager, TOKEN_EXPIRY_MINUTES};
pub use store::SessionStore;
pub use validation::{Field, PasswordIssue, ValidationError};
