// SPDX-License-Identifier: MIT

use std::f64::consts::TAU;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, DurationRound, SecondsFormat, TimeDelta, Utc};
use serde::Deserialize;

use super::{ApiError, Credentials, LoginResponse, PasswordReset, SensorApi};
use crate::sensor::{LatestReadings, Metric, RawReading, Reading, SensorList};

/// Hours of generated history per sensor.
const HISTORY_HOURS: i64 = 72;

/// A channel the dashboard does not know about. The dummy data sprinkles it in
/// the same way the real logger reports diagnostics.
const DIAGNOSTIC_CHANNEL: u32 = 100;

#[derive(Deserialize, Clone)]
struct DummyUser {
    username: String,
    password: String,
    role: String,
}

#[derive(Deserialize, Clone)]
struct DummySensor {
    name: String,
    temperature: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

impl DummySensor {
    fn base(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::Pressure => self.pressure,
        }
    }
}

#[derive(Deserialize)]
struct Fixture {
    users: Vec<DummyUser>,
    sensors: Vec<DummySensor>,
}

/// Offline [`SensorApi`] serving sine shaped readings around fixed base values.
pub struct DummySensorApi {
    users: Mutex<Vec<DummyUser>>,
    sensors: Vec<DummySensor>,
}

impl DummySensorApi {
    pub fn new() -> Result<Self, serde_json::Error> {
        let json_data = std::include_str!("./dummy_hub.json");
        let fixture = serde_json::from_str::<Fixture>(json_data)?;

        Ok(Self {
            users: Mutex::new(fixture.users),
            sensors: fixture.sensors,
        })
    }

    fn sensor(&self, name: &str) -> Option<&DummySensor> {
        self.sensors.iter().find(|sensor| sensor.name == name)
    }

    /// Hourly readings ending at the last full hour before `now`.
    fn readings(sensor: &DummySensor, now: DateTime<Utc>) -> Vec<RawReading> {
        let end = now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now);
        let mut readings = Vec::new();

        for hour in 0..HISTORY_HOURS {
            let time = end - TimeDelta::hours(HISTORY_HOURS - 1 - hour);
            let time = time.to_rfc3339_opts(SecondsFormat::Secs, true);
            let phase = (hour as f64 / 24.0 * TAU).sin();

            for metric in Metric::ALL {
                let Some(base) = sensor.base(metric) else {
                    continue;
                };
                let amplitude = match metric {
                    Metric::Temperature => 3.0,
                    Metric::Humidity => 8.0,
                    Metric::Pressure => 2.5,
                };
                readings.push(RawReading {
                    channel_id: metric.channel_id(),
                    value: ((base + amplitude * phase) * 10.0).round() / 10.0,
                    time: time.clone(),
                });
            }

            if hour % 12 == 0 {
                readings.push(RawReading {
                    channel_id: DIAGNOSTIC_CHANNEL,
                    value: 1.0,
                    time,
                });
            }
        }

        readings
    }
}

fn status_error(status: u16, path: &str) -> ApiError {
    ApiError::Status {
        status,
        path: path.to_string(),
    }
}

impl SensorApi for DummySensorApi {
    fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let user = users
            .iter()
            .find(|user| user.username == credentials.username)
            .ok_or_else(|| status_error(401, "/login"))?;

        if user.password != credentials.password {
            return Err(status_error(403, "/login"));
        }

        Ok(LoginResponse {
            token: Some(format!("dummy-token-{}", user.username)),
            user: Some(user.username.clone()),
            role: Some(user.role.clone()),
        })
    }

    fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        if credentials.username.is_empty() || users.iter().any(|user| user.username == credentials.username) {
            return Err(status_error(400, "/register"));
        }

        users.push(DummyUser {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            role: "viewer".to_string(),
        });
        Ok(())
    }

    fn forgot_password(&self, reset: &PasswordReset) -> Result<(), ApiError> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let user = users
            .iter_mut()
            .find(|user| user.username == reset.username)
            .ok_or_else(|| status_error(404, "/forgot-password"))?;

        if !reset.new_password.is_empty() {
            user.password = reset.new_password.clone();
        }
        Ok(())
    }

    fn sensors(&self, _token: Option<&str>) -> Result<SensorList, ApiError> {
        let now = Utc::now();

        Ok(self
            .sensors
            .iter()
            .map(|sensor| {
                let readings = Self::readings(sensor, now);
                let last = |metric: Metric| {
                    readings
                        .iter()
                        .rev()
                        .find(|reading| reading.channel_id == metric.channel_id())
                        .map(|reading| Reading {
                            value: reading.value,
                            time: reading.time.clone(),
                        })
                };

                let latest = LatestReadings {
                    temperature: last(Metric::Temperature),
                    humidity: last(Metric::Humidity),
                    pressure: last(Metric::Pressure),
                };
                (sensor.name.clone(), latest)
            })
            .collect())
    }

    fn sensor_data(&self, sensor_name: &str) -> Result<Vec<RawReading>, ApiError> {
        Ok(self
            .sensor(sensor_name)
            .map(|sensor| Self::readings(sensor, Utc::now()))
            .unwrap_or_default())
    }
}

#[test]
fn test_dummy_login_classifies_failures() {
    let api = DummySensorApi::new().unwrap();

    let response = api.login(&Credentials::new("admin", "admin")).unwrap();
    assert_eq!(response.user.as_deref(), Some("admin"));
    assert_eq!(response.role.as_deref(), Some("admin"));
    assert!(response.token.is_some());

    assert_eq!(api.login(&Credentials::new("nobody", "x")).unwrap_err().status(), Some(401));
    assert_eq!(api.login(&Credentials::new("admin", "x")).unwrap_err().status(), Some(403));
}

#[test]
fn test_dummy_register_and_reset() {
    let api = DummySensorApi::new().unwrap();

    api.register(&Credentials::new("carol", "one")).unwrap();
    assert_eq!(api.register(&Credentials::new("carol", "two")).unwrap_err().status(), Some(400));
    assert!(api.login(&Credentials::new("carol", "one")).is_ok());

    let reset = PasswordReset {
        username: "carol".into(),
        old_password: String::new(),
        new_password: "two".into(),
    };
    api.forgot_password(&reset).unwrap();
    assert!(api.login(&Credentials::new("carol", "two")).is_ok());

    let unknown = PasswordReset {
        username: "dave".into(),
        ..reset
    };
    assert_eq!(api.forgot_password(&unknown).unwrap_err().status(), Some(404));
}

#[test]
fn test_dummy_sensor_data() {
    let api = DummySensorApi::new().unwrap();

    let readings = api.sensor_data("sensor2").unwrap();
    assert!(readings.iter().any(|reading| reading.channel_id == DIAGNOSTIC_CHANNEL));
    assert!(readings.iter().all(|reading| reading.channel_id != Metric::Pressure.channel_id()));

    let series = crate::sensor::bucket(&readings);
    assert_eq!(series.temperature.len(), HISTORY_HOURS as usize);
    assert_eq!(series.humidity.len(), HISTORY_HOURS as usize);
    assert!(series.pressure.is_empty());

    assert!(api.sensor_data("missing").unwrap().is_empty());

    let sensors = api.sensors(None).unwrap();
    assert_eq!(sensors.len(), 4);
    assert!(sensors["sensor2"].pressure.is_none());
    assert!(sensors["Sensor B"].temperature.is_none());
}
