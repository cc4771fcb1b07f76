//! Connection, session file persistence and the login steps behind
//! [`AuthFlow`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use grammers_client::{
    types::{LoginToken, PasswordToken},
    Client, Config as ClientConfig, InitParams, SignInError,
};
use grammers_session::Session;
use tokio::sync::Mutex;
use tracing::info;

use tgx_core::{
    config::Config,
    errors::Error,
    ports::{AuthFlow, SignInOutcome},
    Result,
};

/// Open (or create) the session file and connect with the configured app
/// credentials.
pub async fn connect(config: &Config) -> Result<Client> {
    let session = Session::load_file_or_create(&config.session_file).map_err(|e| {
        Error::Auth(format!(
            "cannot open session file {}: {e}",
            config.session_file.display()
        ))
    })?;

    info!(session = %config.session_file.display(), "connecting to Telegram");
    Client::connect(ClientConfig {
        session,
        api_id: config.api_id,
        api_hash: config.api_hash.clone(),
        params: InitParams {
            catch_up: false,
            flood_sleep_threshold: config.flood_sleep_threshold,
            ..Default::default()
        },
    })
    .await
    .map_err(|e| Error::Auth(format!("cannot connect to Telegram: {e}")))
}

/// [`AuthFlow`] over a grammers client. Holds the login and password tokens
/// between prompts and writes the session file once signed in.
pub struct GrammersAuth {
    client: Client,
    session_file: PathBuf,
    login_token: Mutex<Option<LoginToken>>,
    password_token: Mutex<Option<PasswordToken>>,
}

impl GrammersAuth {
    pub fn new(client: Client, session_file: impl Into<PathBuf>) -> Self {
        Self {
            client,
            session_file: session_file.into(),
            login_token: Mutex::new(None),
            password_token: Mutex::new(None),
        }
    }

    /// Persist the current session so the next run skips the login prompts.
    pub fn save_session(&self) -> Result<()> {
        save_session(&self.client, &self.session_file)
    }

    /// Log which account the session belongs to.
    pub async fn log_account(&self) -> Result<()> {
        let me = self
            .client
            .get_me()
            .await
            .map_err(|e| Error::Auth(format!("cannot load account: {e}")))?;
        info!(
            id = me.id(),
            username = me.username().unwrap_or("-"),
            "logged in"
        );
        Ok(())
    }
}

pub fn save_session(client: &Client, path: &Path) -> Result<()> {
    client
        .session()
        .save_to_file(path)
        .map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
}

#[async_trait]
impl AuthFlow for GrammersAuth {
    async fn is_authorized(&self) -> Result<bool> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| Error::Auth(format!("cannot check authorization: {e}")))
    }

    async fn request_login_code(&self, phone: &str) -> Result<()> {
        let token = self
            .client
            .request_login_code(phone)
            .await
            .map_err(|e| Error::Auth(format!("cannot request login code: {e}")))?;
        *self.login_token.lock().await = Some(token);
        Ok(())
    }

    async fn sign_in(&self, code: &str) -> Result<SignInOutcome> {
        let token = self
            .login_token
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::Auth("no login code was requested".into()))?;

        match self.client.sign_in(&token, code).await {
            Ok(_) => {
                self.save_session()?;
                Ok(SignInOutcome::SignedIn)
            }
            Err(SignInError::PasswordRequired(password_token)) => {
                let hint = password_token.hint().map(str::to_string);
                *self.password_token.lock().await = Some(password_token);
                Ok(SignInOutcome::PasswordRequired { hint })
            }
            Err(SignInError::InvalidCode) => Err(Error::Auth("invalid login code".into())),
            Err(SignInError::SignUpRequired { .. }) => Err(Error::Auth(
                "phone number is not registered with Telegram".into(),
            )),
            Err(e) => Err(Error::Auth(format!("sign in failed: {e}"))),
        }
    }

    async fn check_password(&self, password: &str) -> Result<()> {
        let token = self
            .password_token
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::Auth("no password was requested".into()))?;

        match self.client.check_password(token, password).await {
            Ok(_) => self.save_session(),
            Err(SignInError::InvalidPassword) => Err(Error::Auth("invalid 2FA password".into())),
            Err(e) => Err(Error::Auth(format!("password check failed: {e}"))),
        }
    }
}
