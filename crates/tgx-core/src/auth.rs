//! Interactive login state machine.

use std::io::{self, BufRead, Write};

use tracing::{debug, info};

use crate::{
    errors::Error,
    ports::{AuthFlow, Prompter, SignInOutcome},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    AwaitingCode,
    AwaitingPassword,
    Authenticated,
}

/// Drive `flow` until the session is authorized.
///
/// Prompts only when the persisted session is missing or invalid. Every
/// failure is fatal: credentials are never re-prompted.
pub async fn authenticate(
    flow: &dyn AuthFlow,
    phone: &str,
    prompter: &dyn Prompter,
) -> Result<AuthState> {
    let mut state = AuthState::Unauthenticated;
    let mut password_hint: Option<String> = None;

    loop {
        debug!(?state, "auth step");
        state = match state {
            AuthState::Unauthenticated => {
                if flow.is_authorized().await? {
                    info!("reusing persisted session");
                    AuthState::Authenticated
                } else {
                    info!(phone = %mask_phone(phone), "requesting login code");
                    flow.request_login_code(phone).await?;
                    AuthState::AwaitingCode
                }
            }
            AuthState::AwaitingCode => {
                let code = required(
                    prompter.prompt("Enter the login code Telegram sent you: ")?,
                    "login code",
                )?;
                match flow.sign_in(&code).await? {
                    SignInOutcome::SignedIn => AuthState::Authenticated,
                    SignInOutcome::PasswordRequired { hint } => {
                        info!("account has two-step verification enabled");
                        password_hint = hint;
                        AuthState::AwaitingPassword
                    }
                }
            }
            AuthState::AwaitingPassword => {
                let hint = password_hint.take().unwrap_or_else(|| "none".to_string());
                let password = required(
                    prompter.prompt(&format!("Enter your 2FA password (hint: {hint}): "))?,
                    "password",
                )?;
                flow.check_password(&password).await?;
                AuthState::Authenticated
            }
            AuthState::Authenticated => return Ok(state),
        };
    }
}

fn required(input: String, what: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::Auth(format!("no {what} entered")));
    }
    Ok(trimmed.to_string())
}

/// `+15551234567` → `+155******67`; keeps logs free of the full number.
fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() <= 6 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 6))
}

/// Reads prompts from standard input.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn prompt(&self, message: &str) -> Result<String> {
        let mut stdout = io::stdout();
        stdout.write_all(message.as_bytes())?;
        stdout.flush()?;

        let mut line = String::new();
        let n = io::stdin().lock().read_line(&mut line)?;
        if n == 0 {
            return Err(Error::Auth("stdin closed while waiting for input".to_string()));
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeFlow {
        authorized: bool,
        needs_password: bool,
        good_code: &'static str,
        good_password: &'static str,
        calls: Mutex<Vec<String>>,
    }

    impl FakeFlow {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AuthFlow for FakeFlow {
        async fn is_authorized(&self) -> Result<bool> {
            self.calls.lock().unwrap().push("is_authorized".into());
            Ok(self.authorized)
        }

        async fn request_login_code(&self, phone: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("request:{phone}"));
            Ok(())
        }

        async fn sign_in(&self, code: &str) -> Result<SignInOutcome> {
            self.calls.lock().unwrap().push(format!("sign_in:{code}"));
            if code != self.good_code {
                return Err(Error::Auth("invalid code".into()));
            }
            if self.needs_password {
                Ok(SignInOutcome::PasswordRequired {
                    hint: Some("pet".into()),
                })
            } else {
                Ok(SignInOutcome::SignedIn)
            }
        }

        async fn check_password(&self, password: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("password:{password}"));
            if password == self.good_password {
                Ok(())
            } else {
                Err(Error::Auth("invalid password".into()))
            }
        }
    }

    struct ScriptedPrompter {
        answers: Mutex<VecDeque<String>>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedPrompter {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|s| s.to_string()).collect()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Prompter for ScriptedPrompter {
        fn prompt(&self, message: &str) -> Result<String> {
            self.seen.lock().unwrap().push(message.to_string());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::Auth("no scripted answer".into()))
        }
    }

    #[tokio::test]
    async fn persisted_session_skips_prompts() {
        let flow = FakeFlow {
            authorized: true,
            ..Default::default()
        };
        let prompter = ScriptedPrompter::new(&[]);
        let state = authenticate(&flow, "+15550000000", &prompter).await.unwrap();
        assert_eq!(state, AuthState::Authenticated);
        assert_eq!(flow.calls(), vec!["is_authorized"]);
        assert!(prompter.seen().is_empty());
    }

    #[tokio::test]
    async fn code_only_login() {
        let flow = FakeFlow {
            good_code: "12345",
            ..Default::default()
        };
        let prompter = ScriptedPrompter::new(&["12345\n"]);
        authenticate(&flow, "+1555", &prompter).await.unwrap();
        assert_eq!(
            flow.calls(),
            vec!["is_authorized", "request:+1555", "sign_in:12345"]
        );
    }

    #[tokio::test]
    async fn two_factor_login_shows_hint() {
        let flow = FakeFlow {
            needs_password: true,
            good_code: "1",
            good_password: "hunter2",
            ..Default::default()
        };
        let prompter = ScriptedPrompter::new(&["1", " hunter2 \n"]);
        authenticate(&flow, "+1", &prompter).await.unwrap();
        assert_eq!(flow.calls().last().unwrap(), "password:hunter2");
        assert!(prompter.seen()[1].contains("hint: pet"));
    }

    #[tokio::test]
    async fn bad_code_is_fatal_without_retry() {
        let flow = FakeFlow {
            good_code: "1",
            ..Default::default()
        };
        let prompter = ScriptedPrompter::new(&["2", "1"]);
        let err = authenticate(&flow, "+1", &prompter).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(prompter.seen().len(), 1);
    }

    #[tokio::test]
    async fn empty_input_is_an_auth_error() {
        let flow = FakeFlow::default();
        let prompter = ScriptedPrompter::new(&["   \n"]);
        let err = authenticate(&flow, "+1", &prompter).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn masks_phone_numbers() {
        assert_eq!(mask_phone("+15551234567"), "+155******67");
        assert_eq!(mask_phone("12345"), "*****");
    }
}
