//! Field-level validation for the login, signup and reset prompts.
//!
//! These mirror the Session Manager's own rules so the user gets a message
//! per field before an operation is attempted. Signup adds checks that only
//! make sense with a form in front of the user: confirmation and name.

use sessionkit_core::auth::validation::{
    is_well_formed_email, password_strength, validate_login, validate_reset, validate_signup,
};
use sessionkit_core::auth::{Field, ValidationError};

/// Ordered list of (field, message) pairs; empty means the form is valid.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(Field, String)>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, msg)| msg.as_str())
    }

    fn push(&mut self, field: Field, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.0.push((field, message.into()));
        }
    }

    fn push_error(&mut self, error: ValidationError) {
        self.push(error.field(), error.to_string());
    }

    pub fn lines(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|(field, msg)| format!("  {}: {}", field.label(), msg))
            .collect()
    }
}

/// Collect every field error from a validator that stops at the first.
fn collect(mut check: impl FnMut() -> Result<(), ValidationError>, errors: &mut FieldErrors) {
    if let Err(e) = check() {
        errors.push_error(e);
    }
}

pub struct LoginForm<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl LoginForm<'_> {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        collect(|| validate_reset(self.email.trim()), &mut errors);
        if self.password.trim().is_empty() {
            errors.push_error(ValidationError::PasswordRequired);
        }
        collect(|| validate_login(self.email, self.password), &mut errors);
        errors
    }
}

pub struct SignupForm<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

impl SignupForm<'_> {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();

        if self.name.trim().is_empty() {
            errors.push(Field::Name, "Name is required");
        }
        collect(|| validate_reset(self.email.trim()), &mut errors);
        if self.password.trim().is_empty() {
            errors.push_error(ValidationError::PasswordRequired);
        }
        collect(|| validate_signup(self.email, self.password), &mut errors);

        if self.confirm_password.trim().is_empty() {
            errors.push(Field::ConfirmPassword, "Please confirm your password");
        } else if self.password != self.confirm_password {
            errors.push(Field::ConfirmPassword, "Passwords do not match");
        }
        errors
    }

    /// Advisory notes shown after a successful signup.
    pub fn hints(&self) -> Vec<String> {
        password_strength(self.password)
            .iter()
            .map(|issue| format!("  tip: {}", issue.message().to_lowercase()))
            .collect()
    }
}

pub struct ResetForm<'a> {
    pub email: &'a str,
}

impl ResetForm<'_> {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        collect(|| validate_reset(self.email.trim()), &mut errors);
        errors
    }
}

/// Gentle warning for addresses that pass the `@` check but look off.
pub fn email_hint(email: &str) -> Option<String> {
    if email.contains('@') && !is_well_formed_email(email) {
        Some(format!("  note: \"{}\" does not look like a full address", email))
    } else {
        None
    }
}
