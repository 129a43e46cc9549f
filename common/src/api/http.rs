// SPDX-License-Identifier: MIT

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{
    ApiError, Credentials, LoginResponse, PasswordReset, SensorApi, SensorDataResponse, SensorsResponse,
};
use crate::sensor::{RawReading, SensorList};

/// [`SensorApi`] over HTTP.
///
/// Owns its own tokio runtime, so the blocking trait methods can be called
/// from any plain thread.
pub struct HttpSensorApi {
    base_url: String,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpSensorApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("hub-api")
            .enable_all()
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        log::info!("Using sensor API at {base_url}");

        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
            runtime,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, request: reqwest::RequestBuilder, path: &str) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        log::debug!("<- {status} {path}");

        if status.is_success() {
            Ok(response)
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ApiError> {
        log::info!("-> GET {path}");
        let request = self.client.get(self.url(path)).query(query);
        let body = self.execute(request, path).await?.bytes().await?;

        Ok(serde_json::from_slice(&body)?)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response, ApiError> {
        log::info!("-> POST {path}");
        let request = self.client.post(self.url(path)).json(body);

        self.execute(request, path).await
    }
}

impl SensorApi for HttpSensorApi {
    fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        self.runtime.block_on(async {
            let body = self.post("/login", credentials).await?.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        })
    }

    fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        self.runtime.block_on(self.post("/register", credentials))?;
        Ok(())
    }

    fn forgot_password(&self, reset: &PasswordReset) -> Result<(), ApiError> {
        self.runtime.block_on(self.post("/forgot-password", reset))?;
        Ok(())
    }

    fn sensors(&self, token: Option<&str>) -> Result<SensorList, ApiError> {
        let query: Vec<(&str, &str)> = token.into_iter().map(|token| ("token", token)).collect();
        let response: SensorsResponse = self.runtime.block_on(self.get_json("/sensors", &query))?;

        Ok(response.sensors.unwrap_or_default())
    }

    fn sensor_data(&self, sensor_name: &str) -> Result<Vec<RawReading>, ApiError> {
        let response: SensorDataResponse = self
            .runtime
            .block_on(self.get_json("/sensorData", &[("sensor_name", sensor_name)]))?;

        Ok(response.into_readings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serves one canned response per connection and returns what it received.
    fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());

        let handle = std::thread::spawn(move || {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                requests.push(read_request(&mut stream));

                let response = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
            requests
        });

        (address, handle)
    }

    fn read_request(stream: &mut std::net::TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            let read = stream.read(&mut chunk).unwrap();
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);

            let text = String::from_utf8_lossy(&buffer);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buffer.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buffer).into_owned()
    }

    #[test]
    fn test_login_posts_credentials() {
        let (address, server) = serve(vec![(200, r#"{"token":"abc","user":"alice","role":"admin"}"#)]);
        let api = HttpSensorApi::new(format!("{address}/")).unwrap();

        let response = api.login(&Credentials::new("alice", "secret")).unwrap();

        assert_eq!(response.token.as_deref(), Some("abc"));
        assert_eq!(response.user.as_deref(), Some("alice"));
        assert_eq!(response.role.as_deref(), Some("admin"));

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("POST /login HTTP/1.1"));
        assert!(requests[0].contains(r#""username":"alice""#));
        assert!(requests[0].contains(r#""password":"secret""#));
    }

    #[test]
    fn test_error_status_is_reported() {
        let (address, server) = serve(vec![
            (401, r#"{"detail":"no such user"}"#),
            (403, r#"{"detail":"wrong password"}"#),
            (404, r#"{"detail":"no such user"}"#),
        ]);
        let api = HttpSensorApi::new(address).unwrap();

        let unknown = api.login(&Credentials::new("bob", "x")).unwrap_err();
        assert_eq!(unknown.status(), Some(401));

        let wrong = api.login(&Credentials::new("alice", "x")).unwrap_err();
        assert_eq!(wrong.status(), Some(403));

        let reset = PasswordReset {
            username: "bob".into(),
            old_password: String::new(),
            new_password: String::new(),
        };
        assert_eq!(api.forgot_password(&reset).unwrap_err().status(), Some(404));

        let requests = server.join().unwrap();
        assert!(requests[2].starts_with("POST /forgot-password"));
        assert!(requests[2].contains(r#""old_password":"""#));
    }

    #[test]
    fn test_sensor_data_query_and_body() {
        let (address, server) = serve(vec![
            (
                200,
                r#"{"data":{"Numerical":[{"channel_id":101,"value":20.5,"time":"2024-01-01T00:00:00Z"}]}}"#,
            ),
            (200, r#"{"data":{}}"#),
            (200, r#"{}"#),
        ]);
        let api = HttpSensorApi::new(address).unwrap();

        let readings = api.sensor_data("sensor1").unwrap();
        assert_eq!(
            readings,
            vec![RawReading {
                channel_id: 101,
                value: 20.5,
                time: "2024-01-01T00:00:00Z".into(),
            }]
        );
        assert!(api.sensor_data("sensor2").unwrap().is_empty());
        assert!(api.sensor_data("sensor3").unwrap().is_empty());

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("GET /sensorData?sensor_name=sensor1 HTTP/1.1"));
    }

    #[test]
    fn test_sensors_passes_token() {
        let (address, server) = serve(vec![
            (
                200,
                r#"{"sensors":{"sensor1":{"temperature":{"value":21.0,"time":"2024-01-01T00:00:00Z"}}}}"#,
            ),
            (200, r#"{"sensors":null}"#),
        ]);
        let api = HttpSensorApi::new(address).unwrap();

        let sensors = api.sensors(Some("abc")).unwrap();
        assert_eq!(sensors["sensor1"].temperature.as_ref().map(|reading| reading.value), Some(21.0));
        assert!(api.sensors(None).unwrap().is_empty());

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("GET /sensors?token=abc HTTP/1.1"));
        assert!(requests[1].starts_with("GET /sensors HTTP/1.1"));
    }

    #[test]
    fn test_unreachable_server_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let api = HttpSensorApi::new(address).unwrap();
        let error = api.sensor_data("sensor1").unwrap_err();

        assert!(matches!(error, ApiError::Transport(_)));
        assert_eq!(error.status(), None);
    }

    #[test]
    fn test_malformed_body_is_a_decode_error() {
        let (address, server) = serve(vec![(200, "not json")]);
        let api = HttpSensorApi::new(address).unwrap();

        assert!(matches!(api.sensors(None), Err(ApiError::Decode(_))));
        server.join().unwrap();
    }
}
