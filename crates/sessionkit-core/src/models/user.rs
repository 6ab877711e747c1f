use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl User {
    /// Name to show in the profile view, falling back to the email.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_json_omits_missing_name() {
        let user = User {
            id: "user_1".to_string(),
            email: "a@b.com".to_string(),
            name: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(json, r#"{"id":"user_1","email":"a@b.com"}"#);
    }

    #[test]
    fn test_user_json_accepts_missing_name() {
        let user: User = serde_json::from_str(r#"{"id":"u","email":"x@y.z"}"#).unwrap();
        assert_eq!(user.name, None);
        assert_eq!(user.display_name(), "x@y.z");
    }
}
