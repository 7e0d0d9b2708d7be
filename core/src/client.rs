//! Authenticated request plumbing for the Gophish REST API.
//!
//! # Design
//! `Client` owns an immutable [`Config`] and a [`Transport`]. Every request is
//! first described as an `HttpRequest` (`build_request`), which is where the
//! `/api` prefix, the `Authorization` header and the JSON content type are
//! attached, and then handed to the transport (`execute`). Resources never
//! touch headers or URLs themselves.

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};

const API_PREFIX: &str = "/api";

/// Synchronous client for one Gophish server.
pub struct Client {
    config: Config,
    transport: Box<dyn Transport>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.config.url)
            .field("verify_ssl", &self.config.verify_ssl)
            .field("debug", &self.config.debug)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Client talking HTTP(S) through `ureq`.
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let transport = UreqTransport::new(config.verify_ssl);
        Self::with_transport(config, transport)
    }

    pub fn with_transport(
        mut config: Config,
        transport: impl Transport + 'static,
    ) -> Result<Self, ApiError> {
        if config.url.trim().is_empty() {
            return Err(ApiError::Config("server url must not be blank".to_string()));
        }
        config.url = config.url.trim_end_matches('/').to_string();
        Ok(Self {
            config,
            transport: Box::new(transport),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Describe a request against `path` (relative to the `/api` root).
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<HttpRequest, ApiError> {
        let mut headers = vec![("Authorization".to_string(), self.config.api_key.clone())];
        let body = match body {
            Some(body) => {
                headers.push(("content-type".to_string(), "application/json".to_string()));
                let encoded = serde_json::to_string(body)
                    .map_err(|e| ApiError::SerializationError(e.to_string()))?;
                Some(encoded)
            }
            None => None,
        };
        Ok(HttpRequest {
            method,
            url: format!("{}{API_PREFIX}{path}", self.config.url),
            headers,
            body,
        })
    }

    pub fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        if self.config.debug {
            debug!(
                "-> {} {} {}",
                request.method,
                request.url,
                request.body.as_deref().unwrap_or("")
            );
        }
        let response = self.transport.execute(request)?;
        if self.config.debug {
            debug!("<- {} {}", response.status, response.body);
        }
        Ok(response)
    }

    pub fn get(&self, path: &str) -> Result<HttpResponse, ApiError> {
        let request = self.build_request(HttpMethod::Get, path, None)?;
        self.execute(&request)
    }

    pub fn post(&self, path: &str, body: &Value) -> Result<HttpResponse, ApiError> {
        let request = self.build_request(HttpMethod::Post, path, Some(body))?;
        self.execute(&request)
    }

    pub fn put(&self, path: &str, body: &Value) -> Result<HttpResponse, ApiError> {
        let request = self.build_request(HttpMethod::Put, path, Some(body))?;
        self.execute(&request)
    }

    pub fn delete(&self, path: &str) -> Result<HttpResponse, ApiError> {
        let request = self.build_request(HttpMethod::Delete, path, None)?;
        self.execute(&request)
    }
}

/// Deserialize a response body.
pub fn parse_json<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Require a 200; anything else is reported as a generic HTTP failure.
pub fn check_ok(response: &HttpResponse) -> Result<(), ApiError> {
    if response.status == 200 {
        return Ok(());
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}

/// Require a 200; anything else means `path` does not resolve.
pub fn check_found(response: &HttpResponse, path: &str) -> Result<(), ApiError> {
    if response.status == 200 {
        return Ok(());
    }
    Err(ApiError::NotFound(path.to_string()))
}

/// Human-readable failure text from an error response.
///
/// Gophish wraps failures as `{"success": false, "message": "..."}`; bodies
/// without a message are returned as-is.
pub fn server_message(response: &HttpResponse) -> String {
    let message = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_string));
    match message {
        Some(message) if !message.is_empty() => message,
        _ if response.body.trim().is_empty() => format!("HTTP {}", response.status),
        _ => response.body.clone(),
    }
}
