//! Response sink handed to every handler of a chain
//!
//! Mirrors a recording response writer: the first status written wins, and
//! writing body data before any status commits `200 OK`.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::errors::{ChainError, ChainResult};

/// Accumulates status, headers and body written by chain handlers
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseWriter {
    /// Create a writer with nothing written yet
    pub fn new() -> Self {
        Self {
            status: None,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Commit the response status
    ///
    /// Only the first call has an effect; later calls are logged and ignored.
    pub fn write_header(&mut self, status: StatusCode) {
        match self.status {
            Some(committed) => {
                tracing::warn!(
                    "superfluous write_header({}) ignored, status already {}",
                    status.as_u16(),
                    committed.as_u16()
                );
            }
            None => self.status = Some(status),
        }
    }

    /// Commit the response status from a raw code
    pub fn write_status_code(&mut self, code: u16) -> ChainResult<()> {
        let status = StatusCode::from_u16(code).map_err(|_| ChainError::InvalidStatus { code })?;
        self.write_header(status);
        Ok(())
    }

    /// Append bytes to the body, committing `200 OK` if no status was written
    pub fn write(&mut self, data: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(data);
    }

    /// Append text to the body
    pub fn write_str(&mut self, text: &str) {
        self.write(text.as_bytes());
    }

    /// Serialize `data` as JSON and append it to the body
    ///
    /// Sets `content-type: application/json` unless a content type is already present.
    pub fn write_json<T: Serialize>(&mut self, data: &T) -> ChainResult<()> {
        let encoded = serde_json::to_vec(data)?;
        if !self.headers.contains_key(header::CONTENT_TYPE) {
            self.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        self.write(&encoded);
        Ok(())
    }

    /// Insert a header, replacing any previous value
    pub fn try_insert_header<K, V>(&mut self, key: K, value: V) -> ChainResult<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let name = HeaderName::from_bytes(key.as_ref().as_bytes())
            .map_err(|e| ChainError::invalid_header(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::from_str(value.as_ref())
            .map_err(|e| ChainError::invalid_header(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Get response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get mutable reference to response headers
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Status that will be sent, `200 OK` if none was written
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Whether a status has been committed
    pub fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    /// Body bytes written so far
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, if it is valid UTF-8
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

impl IntoResponse for ResponseWriter {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}
