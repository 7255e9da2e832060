//! Thin JSON client for the catalog/auth service.
//!
//! Every call goes to `base_url + path`. Non-2xx answers become
//! [`ApiError::Status`] carrying the parsed body; a 2xx body that is not JSON
//! comes back as `{"message": <raw text>}`.

pub mod auth;
pub mod catalog;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://spotify.f8team.dev/api/";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{status} {status_text}: {message}")]
    Status {
        status: u16,
        status_text: String,
        message: String,
        data: Value,
    },
    #[error("unexpected response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Response body of a non-2xx answer, `Null` otherwise.
    pub fn data(&self) -> &Value {
        match self {
            Self::Status { data, .. } => data,
            _ => &Value::Null,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.send(Method::GET, path, None, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.send(Method::POST, path, Some(body), None).await
    }

    pub async fn post_authorized(
        &self,
        path: &str,
        body: &Value,
        token: &str,
    ) -> Result<Value, ApiError> {
        self.send(Method::POST, path, Some(body), Some(token)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.send(Method::PUT, path, Some(body), None).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.send(Method::PATCH, path, Some(body), None).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.send(Method::DELETE, path, None, None).await
    }

    /// GET and decode into a typed response.
    pub async fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let value = self.get(path).await?;
        serde_json::from_value(value).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "api request");

        let mut request = self.client.request(method.clone(), &url);
        // Only methods that carry a payload get one.
        if matches!(method, Method::POST | Method::PUT | Method::PATCH) {
            request = request.json(body.unwrap_or(&Value::Null));
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let transport = |source| ApiError::Transport {
            path: path.to_string(),
            source,
        };
        let resp = request.send().await.map_err(transport)?;
        let status = resp.status();
        let text = resp.text().await.map_err(transport)?;

        interpret(status, &text).inspect_err(|e| warn!(%url, error = %e, "api request failed"))
    }
}

/// Turn a status plus raw body into the client's result shape.
fn interpret(status: StatusCode, text: &str) -> Result<Value, ApiError> {
    let parsed = serde_json::from_str::<Value>(text).ok();

    if status.is_success() {
        return Ok(parsed.unwrap_or_else(|| json!({ "message": text })));
    }

    let status_text = status.canonical_reason().unwrap_or("").to_string();
    let data = parsed.unwrap_or(Value::Null);
    let message = data
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| data.pointer("/error/message").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| status_text.clone());

    Err(ApiError::Status {
        status: status.as_u16(),
        status_text,
        message,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_json() {
        let v = interpret(StatusCode::OK, r#"{"albums":[]}"#).unwrap();
        assert_eq!(v, json!({ "albums": [] }));
    }

    #[test]
    fn test_success_non_json_is_wrapped() {
        let v = interpret(StatusCode::OK, "logged out").unwrap();
        assert_eq!(v, json!({ "message": "logged out" }));
        let v = interpret(StatusCode::NO_CONTENT, "").unwrap();
        assert_eq!(v, json!({ "message": "" }));
    }

    #[test]
    fn test_error_carries_payload() {
        let body = r#"{"success":false,"error":{"code":"EMAIL_EXISTS","message":"Email already exists"}}"#;
        let err = interpret(StatusCode::CONFLICT, body).unwrap_err();
        match &err {
            ApiError::Status {
                status,
                status_text,
                message,
                data,
            } => {
                assert_eq!(*status, 409);
                assert_eq!(status_text, "Conflict");
                assert_eq!(message, "Email already exists");
                assert_eq!(data["error"]["code"], "EMAIL_EXISTS");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(err.data()["success"], false);
    }

    #[test]
    fn test_error_without_body_uses_status_text() {
        let err = interpret(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>").unwrap_err();
        match err {
            ApiError::Status { message, data, .. } => {
                assert_eq!(message, "Internal Server Error");
                assert_eq!(data, Value::Null);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let api = ApiClient::new(Client::new(), "http://localhost:3000/api");
        assert_eq!(api.base_url(), "http://localhost:3000/api/");
    }
}
