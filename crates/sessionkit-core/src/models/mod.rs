//! Data models for sessions and authentication state.
//!
//! - `User`: the identity record persisted under the `user` key
//! - `Session`, `StoredAuthData`: a complete session and its raw stored parts
//! - `AuthState`, `SessionPhase`: the in-memory state observed by the UI

pub mod session;
pub mod state;
pub mod user;

pub use session::{Session, StoredAuthData};
pub use state::{AuthState, SessionPhase};
pub use user::User;
