//! Form validation rules for the auth operations.
//!
//! The `validate_*` functions are the gates the Session Manager applies.
//! `is_well_formed_email` and `password_strength` are advisory helpers for
//! the UI and never block an operation.

use thiserror::Error;

/// Minimum password length accepted by signup
pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Email is required")]
    EmailRequired,

    #[error("Please enter a valid email address")]
    EmailInvalid,

    #[error("Password is required")]
    PasswordRequired,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
}

/// Form field a validation failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Email,
    Password,
    ConfirmPassword,
    Name,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::Email => "email",
            Field::Password => "password",
            Field::ConfirmPassword => "confirm password",
            Field::Name => "name",
        }
    }
}

impl ValidationError {
    pub fn field(&self) -> Field {
        match self {
            ValidationError::EmailRequired | ValidationError::EmailInvalid => Field::Email,
            ValidationError::PasswordRequired | ValidationError::PasswordTooShort => {
                Field::Password
            }
        }
    }
}

fn check_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if !email.contains('@') {
        return Err(ValidationError::EmailInvalid);
    }
    Ok(())
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    check_email(email)?;
    if password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    Ok(())
}

/// Login rules plus the minimum length. Login itself has no length check.
pub fn validate_signup(email: &str, password: &str) -> Result<(), ValidationError> {
    validate_login(email, password)?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

pub fn validate_reset(email: &str) -> Result<(), ValidationError> {
    check_email(email)
}

/// Strict `local@domain.tld` shape with no whitespace anywhere.
pub fn is_well_formed_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // Needs a dot with something on both sides, e.g. "b.com" or "mail.b.co"
    match domain.rfind('.') {
        Some(dot) => {
            let (host, tld) = domain.split_at(dot);
            !host.is_empty() && tld.len() > 1
        }
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordIssue {
    TooShort,
    NoLetter,
    NoDigit,
}

impl PasswordIssue {
    pub fn message(&self) -> String {
        match self {
            PasswordIssue::TooShort => {
                format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH)
            }
            PasswordIssue::NoLetter => "Password should contain a letter".to_string(),
            PasswordIssue::NoDigit => "Password should contain a digit".to_string(),
        }
    }
}

pub fn password_strength(password: &str) -> Vec<PasswordIssue> {
    let mut issues = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        issues.push(PasswordIssue::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        issues.push(PasswordIssue::NoLetter);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        issues.push(PasswordIssue::NoDigit);
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_requires_at_sign() {
        for email in ["plain", "user.example.com", "a b"] {
            assert_eq!(validate_login(email, "secret"), Err(ValidationError::EmailInvalid));
        }
        assert_eq!(validate_login("", "x"), Err(ValidationError::EmailRequired));
        assert_eq!(validate_login("abc", "x"), Err(ValidationError::EmailInvalid));
        assert_eq!(validate_login("a@b", ""), Err(ValidationError::PasswordRequired));
    }

    #[test]
    fn test_login_has_no_length_check() {
        assert_eq!(validate_login("a@b.com", "x"), Ok(()));
        assert_eq!(validate_signup("a@b.com", "x"), Err(ValidationError::PasswordTooShort));
    }

    #[test]
    fn test_signup_length_counts_chars() {
        assert_eq!(validate_signup("a@b.com", "12345"), Err(ValidationError::PasswordTooShort));
        assert_eq!(validate_signup("a@b.com", "123456"), Ok(()));
        // 6 chars, 12 bytes
        assert_eq!(validate_signup("a@b.com", "ääääää"), Ok(()));
    }

    #[test]
    fn test_reset_checks_shape_only() {
        assert_eq!(validate_reset("a@b"), Ok(()));
        assert_eq!(validate_reset("ab"), Err(ValidationError::EmailInvalid));
    }

    #[test]
    fn test_error_fields() {
        assert_eq!(ValidationError::EmailInvalid.field(), Field::Email);
        assert_eq!(ValidationError::PasswordTooShort.field(), Field::Password);
    }

    #[test]
    fn test_well_formed_email() {
        assert!(is_well_formed_email("a@b.com"));
        assert!(is_well_formed_email("first.last@mail.example.org"));
        assert!(!is_well_formed_email("a@b"));
        assert!(!is_well_formed_email("a b@c.com"));
        assert!(!is_well_formed_email("@b.com"));
        assert!(!is_well_formed_email("a@.com"));
        assert!(!is_well_formed_email("a@b@c.com"));
    }

    #[test]
    fn test_password_strength() {
        assert!(password_strength("abc123").is_empty());
        assert_eq!(
            password_strength("abc"),
            vec![PasswordIssue::TooShort, PasswordIssue::NoDigit]
        );
        assert_eq!(password_strength("123456"), vec![PasswordIssue::NoLetter]);
    }
}
