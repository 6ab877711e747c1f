//! Command handling for the interactive prompt.
//!
//! `App` turns parsed commands into Session Manager calls and returns the
//! lines to print. Passwords come from a `Prompter` so tests can script them.

use anyhow::{Context, Result};
use sessionkit_core::auth::SessionManager;
use tracing::debug;

use crate::forms::{email_hint, LoginForm, ResetForm, SignupForm};
use crate::render;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: String },
    Signup { email: String, name: String },
    Reset { email: String },
    Profile,
    Status,
    Logout,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };
        let arg = parts.next().unwrap_or_default().to_string();
        let rest: Vec<&str> = parts.collect();

        let command = match verb.to_lowercase().as_str() {
            "login" => Command::Login { email: arg },
            "signup" => {
                let name = rest.join(" ");
                Command::Signup { email: arg, name }
            }
            "reset" | "reset-password" => Command::Reset { email: arg },
            "profile" => Command::Profile,
            "status" => Command::Status,
            "logout" => Command::Logout,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("Unknown command: {} (try `help`)", other)),
        };
        Ok(Some(command))
    }
}

/// Source of secret input.
pub trait Prompter {
    fn secret(&mut self, label: &str) -> Result<String>;
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn secret(&mut self, label: &str) -> Result<String> {
        rpassword::prompt_password(label).context("Failed to read password")
    }
}

#[derive(Debug, Default)]
pub struct Outcome {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl Outcome {
    fn lines(lines: Vec<String>) -> Self {
        Self { lines, quit: false }
    }

    fn line(line: impl Into<String>) -> Self {
        Self::lines(vec![line.into()])
    }
}

pub struct App<P> {
    manager: SessionManager,
    prompter: P,
}

impl<P: Prompter> App<P> {
    pub fn new(manager: SessionManager, prompter: P) -> Self {
        Self { manager, prompter }
    }

    pub async fn handle(&mut self, command: Command) -> Result<Outcome> {
        debug!(?command, "Handling command");
        let outcome = match command {
            Command::Login { email } => self.login(&email).await?,
            Command::Signup { email, name } => self.signup(&email, &name).await?,
            Command::Reset { email } => self.reset(&email).await,
            Command::Profile => Outcome::lines(render::profile(
                &self.manager.state(),
                self.manager.time_remaining(),
            )),
            Command::Status => Outcome::line(render::status_line(
                &self.manager.state(),
                self.manager.time_remaining(),
            )),
            Command::Logout => {
                let was_signed_in = self.manager.state().is_authenticated();
                self.manager.logout().await;
                Outcome::line(if was_signed_in { "Logged out" } else { "Not signed in" })
            }
            Command::Help => Outcome::line(render::HELP),
            Command::Quit => Outcome {
                lines: Vec::new(),
                quit: true,
            },
        };
        Ok(outcome)
    }

    async fn login(&mut self, email: &str) -> Result<Outcome> {
        let password = self.prompter.secret("Password: ")?;
        let errors = LoginForm {
            email,
            password: &password,
        }
        .validate();
        if !errors.is_empty() {
            return Ok(Outcome::lines(errors.lines()));
        }

        let mut lines = Vec::new();
        match self.manager.try_login(email, &password).await {
            Ok(()) => {
                let state = self.manager.state();
                let name = state.user().map(|u| u.display_name()).unwrap_or(email);
                lines.push(format!("Welcome back, {}", name));
                lines.extend(email_hint(email));
            }
            Err(e) => lines.push(format!("Login failed: {}", e.alert_message())),
        }
        Ok(Outcome::lines(lines))
    }

    async fn signup(&mut self, email: &str, name: &str) -> Result<Outcome> {
        let password = self.prompter.secret("Password: ")?;
        let confirm_password = self.prompter.secret("Confirm password: ")?;
        let form = SignupForm {
            name,
            email,
            password: &password,
            confirm_password: &confirm_password,
        };
        let errors = form.validate();
        if !errors.is_empty() {
            return Ok(Outcome::lines(errors.lines()));
        }

        let mut lines = Vec::new();
        match self.manager.try_signup(email, &password, Some(name)).await {
            Ok(()) => {
                lines.push("Account created".to_string());
                lines.extend(form.hints());
                lines.extend(email_hint(email));
            }
            Err(e) => lines.push(format!("Could not create account: {}", e.alert_message())),
        }
        Ok(Outcome::lines(lines))
    }

    async fn reset(&mut self, email: &str) -> Outcome {
        let errors = ResetForm { email }.validate();
        if !errors.is_empty() {
            return Outcome::lines(errors.lines());
        }
        if self.manager.reset_password(email.trim()).await {
            Outcome::line(format!("A password reset link has been sent to {}", email.trim()))
        } else {
            Outcome::line("Could not send a password reset link")
        }
    }
}
