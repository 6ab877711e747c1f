//! Text rendering for state, the profile view and help.

use chrono::Duration;
use sessionkit_core::utils::{format_remaining, mask_token};
use sessionkit_core::{AuthState, SessionPhase};

pub const HELP: &str = "\
Commands:
  login <email>            sign in (password is prompted)
  signup <email> <name>    create an account
  reset <email>            request a password reset
  profile                  show the signed-in user
  status                   show session state
  logout                   sign out
  help                     show this help
  quit                     exit";

pub fn status_line(state: &AuthState, remaining: Option<Duration>) -> String {
    match state.phase() {
        SessionPhase::Initializing => "Restoring session...".to_string(),
        SessionPhase::Unauthenticated => "Not signed in".to_string(),
        SessionPhase::Authenticated => {
            let email = state.user().map(|u| u.email.as_str()).unwrap_or_default();
            let left = remaining.map(format_remaining).unwrap_or_else(|| "?".to_string());
            format!("Signed in as {} (expires in {})", email, left)
        }
    }
}

/// Protected view. Renders a sign-in prompt instead when there is no user.
pub fn profile(state: &AuthState, remaining: Option<Duration>) -> Vec<String> {
    if state.is_loading() {
        return vec!["Restoring session...".to_string()];
    }
    let (Some(user), true) = (state.user(), state.is_authenticated()) else {
        return vec![
            "Authentication required".to_string(),
            "  use `login <email>` to sign in".to_string(),
        ];
    };

    let mut lines = vec![
        "Profile".to_string(),
        format!("  User ID: {}", user.id),
        format!("  Name:    {}", user.name.as_deref().unwrap_or("none")),
        format!("  Email:   {}", user.email),
    ];
    if let Some(token) = state.token() {
        lines.push(format!("  Token:   {}", mask_token(token)));
    }
    if let Some(remaining) = remaining {
        lines.push(format!("  Expires: in {}", format_remaining(remaining)));
    }
    lines
}

/// Notice for a state change published by the manager, if worth showing.
pub fn transition(prev: &AuthState, next: &AuthState) -> Option<String> {
    match (prev.phase(), next.phase()) {
        (SessionPhase::Authenticated, SessionPhase::Unauthenticated) => {
            Some("[session] signed out".to_string())
        }
        (_, SessionPhase::Authenticated) if prev.token() != next.token() => {
            let email = next.user().map(|u| u.email.as_str()).unwrap_or_default();
            Some(format!("[session] signed in as {}", email))
        }
        _ => None,
    }
}
