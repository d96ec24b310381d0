//! Outbound request description
//!
//! An envelope is rebuilt into a fresh `reqwest` request on every send, so a
//! replay after renewal picks up the current access token.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;

use super::errors::ApiError;

/// A request as the caller described it, before credentials are attached
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    headers: HeaderMap,
    retried: bool,
}

impl RequestEnvelope {
    /// `path` is joined onto the configured base URL unless it is already an
    /// absolute `http(s)://` URL.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), body: None, headers: HeaderMap::new(), retried: false }
    }

    /// `GET` request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST` request; add a body with [`Self::json`]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT` request
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `DELETE` request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    /// Returns `ApiError::Client` if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Client(format!("Failed to serialize body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Add a header sent on every attempt of this request.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// HTTP method
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the configured base URL
    pub fn path(&self) -> &str {
        &self.path
    }

    /// JSON body, if any
    pub const fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// Extra headers for this request
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Whether this request has already been replayed after an authorization
    /// failure.
    pub const fn is_retried(&self) -> bool {
        self.retried
    }

    /// Flag the request as replayed. Returns `false` if it already was, in
    /// which case no further replay is allowed.
    pub fn mark_retried(&mut self) -> bool {
        !std::mem::replace(&mut self.retried, true)
    }
}
