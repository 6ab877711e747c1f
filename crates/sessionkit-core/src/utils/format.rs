use chrono::Duration;

/// Format a remaining lifetime as `m:ss`, or `expired` at zero.
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds();
    if secs <= 0 {
        return "expired".to_string();
    }
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Show only the start of a token, e.g. `mock_tok…`
pub fn mask_token(token: &str) -> String {
    const VISIBLE: usize = 8;
    if token.chars().count() <= VISIBLE {
        return "*".repeat(token.chars().count());
    }
    let prefix: String = token.chars().take(VISIBLE).collect();
    format!("{}…", prefix)
}
