//! Core library for sessionkit.
//!
//! A mock client-side authentication flow: sessions are synthesized locally,
//! persisted through a pluggable storage backend and expire on a timer.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod utils;

pub use auth::{SessionManager, SessionStore};
pub use config::Config;
pub use error::{AuthError, StorageError};
pub use models::{AuthState, Session, SessionPhase, User};
