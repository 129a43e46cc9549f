// SPDX-License-Identifier: MIT

//! Access to the remote monitoring API.
//!
//! [`SensorApi`] is the seam between the dashboard and the outside world. The
//! HTTP implementation talks to the real server, the dummy one serves
//! generated data for offline runs and tests.

mod dummy;
mod sequence;

#[cfg(feature = "remote")]
mod http;

pub use dummy::DummySensorApi;
pub use sequence::{FetchOutcome, RequestSequence, Ticket};

#[cfg(feature = "remote")]
pub use http::HttpSensorApi;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::sensor::{RawReading, SensorList};

/// Username and password, as posted to `/login` and `/register`.
#[derive(Serialize, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of a successful `/login`.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Body of `/forgot-password`. An empty `new_password` only checks that the
/// user exists.
#[derive(Serialize, Clone, PartialEq, Eq)]
pub struct PasswordReset {
    pub username: String,
    pub old_password: String,
    pub new_password: String,
}

impl std::fmt::Debug for PasswordReset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordReset")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize, Default)]
pub(crate) struct SensorsResponse {
    #[serde(default)]
    pub sensors: Option<SensorList>,
}

#[derive(Deserialize, Default)]
pub(crate) struct SensorDataResponse {
    #[serde(default)]
    pub data: Option<SensorDataBody>,
}

#[derive(Deserialize, Default)]
pub(crate) struct SensorDataBody {
    #[serde(rename = "Numerical", default)]
    pub numerical: Option<Vec<RawReading>>,
}

impl SensorDataResponse {
    pub(crate) fn into_readings(self) -> Vec<RawReading> {
        self.data.and_then(|data| data.numerical).unwrap_or_default()
    }
}

/// A failed API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{path} answered with HTTP status {status}")]
    Status { status: u16, path: String },
    #[cfg(feature = "remote")]
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("could not start the HTTP runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl ApiError {
    /// The HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The remote API consumed by the dashboard.
///
/// All calls block; callers on the UI thread move them to a worker thread.
pub trait SensorApi {
    /// `POST /login`.
    fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError>;

    /// `POST /register`.
    fn register(&self, credentials: &Credentials) -> Result<(), ApiError>;

    /// `POST /forgot-password`.
    fn forgot_password(&self, reset: &PasswordReset) -> Result<(), ApiError>;

    /// `GET /sensors`, the latest readings of every sensor.
    fn sensors(&self, token: Option<&str>) -> Result<SensorList, ApiError>;

    /// `GET /sensorData`, every numerical reading of one sensor.
    fn sensor_data(&self, sensor_name: &str) -> Result<Vec<RawReading>, ApiError>;
}

pub type SensorApiSharedPointer = Arc<dyn SensorApi + Send + Sync>;
