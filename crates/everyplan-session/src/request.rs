//! Request and response descriptors for the gateway.

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{SessionError, SessionResult};
use crate::renewal::parse_enveloped;

/// One logical API call: method, path (relative or absolute), body, headers.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    /// Creates a request with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Creates a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Creates a PUT request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Creates a DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Builder: set a JSON body.
    pub fn json<T: Serialize>(mut self, body: &T) -> SessionResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| SessionError::config(format!("failed to serialize body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Builder: set a raw JSON value as body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Builder: add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A fully-read response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Returns the body as UTF-8 text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserializes the body as `T`.
    pub fn json<T: DeserializeOwned>(&self) -> SessionResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| SessionError::invalid_response(format!("unexpected body: {}", e)))
    }

    /// Deserializes the `data` field of a `{ success, message, data }`
    /// envelope, or the whole body when it is not enveloped.
    pub fn data<T: DeserializeOwned>(&self) -> SessionResult<T> {
        parse_enveloped(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Schedule {
        id: String,
    }

    fn response(body: Value) -> ApiResponse {
        ApiResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: body.to_string().into_bytes(),
        }
    }

    #[test]
    fn builders() {
        let request = ApiRequest::post("/api/schedule")
            .json(&json!({"title": "standup"}))
            .unwrap()
            .header("x-trace", "1");
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body, Some(json!({"title": "standup"})));
        assert_eq!(request.headers, vec![("x-trace".into(), "1".into())]);
        assert_eq!(ApiRequest::delete("/x").method, Method::DELETE);
    }

    #[test]
    fn data_unwraps_envelope() {
        let wrapped = response(json!({"success": true, "message": "", "data": {"id": "s1"}}));
        assert_eq!(wrapped.data::<Schedule>().unwrap(), Schedule { id: "s1".into() });

        let bare = response(json!({"id": "s2"}));
        assert_eq!(bare.data::<Schedule>().unwrap(), Schedule { id: "s2".into() });
        assert!(bare.json::<Vec<Schedule>>().is_err());
    }
}
