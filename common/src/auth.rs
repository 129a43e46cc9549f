// SPDX-License-Identifier: MIT

//! The in-memory login session and the password reset flow.

use crate::api::{ApiError, Credentials, LoginResponse, PasswordReset, SensorApi};

/// Token, user and role of the logged in user. Never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<String>,
    pub role: Option<String>,
}

impl Session {
    /// Protected pages are only reachable while a token is held.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Stores whatever a successful login returned.
    pub fn establish(&mut self, response: LoginResponse) {
        log::info!("Logged in as {:?} ({:?})", response.user, response.role);

        self.token = response.token;
        self.user = response.user;
        self.role = response.role;
    }

    /// Logs in and stores the session. On failure the session stays as it was.
    pub fn login(&mut self, api: &dyn SensorApi, username: &str, password: &str) -> Result<(), LoginError> {
        let response = login_request(api, username, password)?;
        self.establish(response);
        Ok(())
    }

    /// Forgets the session. The server is not told.
    pub fn logout(&mut self) {
        log::info!("Logged out {:?}", self.user);
        *self = Self::default();
    }
}

/// Why a login did not go through. The messages are shown to the user as is.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("User does not exist.")]
    UnknownUser,
    #[error("Incorrect password.")]
    IncorrectPassword,
    #[error("Unexpected error. Try again.")]
    Unexpected { status: u16 },
    #[error("Network or unknown error.")]
    Network(#[source] ApiError),
    #[error("Registration failed: {0}")]
    Registration(#[source] ApiError),
}

impl From<ApiError> for LoginError {
    fn from(error: ApiError) -> Self {
        match error.status() {
            Some(401) => LoginError::UnknownUser,
            Some(403) => LoginError::IncorrectPassword,
            Some(status) => LoginError::Unexpected { status },
            None => LoginError::Network(error),
        }
    }
}

/// Posts the credentials and classifies a failure. Blocks.
pub fn login_request(api: &dyn SensorApi, username: &str, password: &str) -> Result<LoginResponse, LoginError> {
    api.login(&Credentials::new(username, password)).map_err(|error| {
        let error = LoginError::from(error);
        log::warn!("Login of {username:?} failed: {error}");
        error
    })
}

/// Registers a new account, then logs it in. Blocks.
pub fn register_request(api: &dyn SensorApi, username: &str, password: &str) -> Result<LoginResponse, LoginError> {
    api.register(&Credentials::new(username, password)).map_err(|error| {
        log::warn!("Registration of {username:?} failed: {error}");
        LoginError::Registration(error)
    })?;

    login_request(api, username, password)
}

/// Why a password reset step failed.
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("User does not exist")]
    UnknownUser,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Verify the username first")]
    NotVerified,
    #[error("Something went wrong: {0}")]
    Failed(#[source] ApiError),
}

/// Two step password reset: check the username exists, then set a new
/// password for it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PasswordResetFlow {
    username: String,
    verified: bool,
}

impl PasswordResetFlow {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Probes the username with empty passwords. Only a 404 counts as
    /// "unknown"; any other outcome lets the user continue. Blocks.
    pub fn verify_request(api: &dyn SensorApi, username: &str) -> Result<(), ResetError> {
        let probe = PasswordReset {
            username: username.to_string(),
            old_password: String::new(),
            new_password: String::new(),
        };

        match api.forgot_password(&probe) {
            Err(error) if error.status() == Some(404) => Err(ResetError::UnknownUser),
            Err(error) => {
                log::debug!("Ignoring username probe failure: {error}");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    pub fn complete_verification(&mut self, username: &str, result: Result<(), ResetError>) -> Result<(), ResetError> {
        self.verified = result.is_ok();
        if self.verified {
            self.username = username.to_string();
        }
        result
    }

    pub fn check_passwords(new_password: &str, confirm_password: &str) -> Result<(), ResetError> {
        if new_password == confirm_password {
            Ok(())
        } else {
            Err(ResetError::PasswordMismatch)
        }
    }

    /// Sends the new password. Blocks.
    pub fn reset_request(api: &dyn SensorApi, username: &str, new_password: &str) -> Result<(), ResetError> {
        let reset = PasswordReset {
            username: username.to_string(),
            old_password: String::new(),
            new_password: new_password.to_string(),
        };

        api.forgot_password(&reset).map_err(ResetError::Failed)
    }

    /// A successful reset starts the flow over.
    pub fn complete_reset(&mut self, result: Result<(), ResetError>) -> Result<(), ResetError> {
        if result.is_ok() {
            *self = Self::default();
        }
        result
    }

    pub fn verify(&mut self, api: &dyn SensorApi, username: &str) -> Result<(), ResetError> {
        let result = Self::verify_request(api, username);
        self.complete_verification(username, result)
    }

    pub fn reset(&mut self, api: &dyn SensorApi, new_password: &str, confirm_password: &str) -> Result<(), ResetError> {
        if !self.verified {
            return Err(ResetError::NotVerified);
        }
        Self::check_passwords(new_password, confirm_password)?;

        let result = Self::reset_request(api, &self.username, new_password);
        self.complete_reset(result)
    }
}
