//! Response types.
//!
//! A view-set handler produces a [`Response`]: a status code, headers and a
//! JSON payload that has not been rendered yet. A renderer turns it into an
//! [`HttpResponse`] holding the encoded body, which converts into an Axum
//! response via [`IntoResponse`].

use axum::response::IntoResponse;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::Value as Json;

use commonkit_core::CommonkitError;

/// An unrendered response carrying JSON data.
///
/// # Examples
///
/// ```
/// use commonkit_http::Response;
///
/// let response = Response::created(serde_json::json!({"id": 1}));
/// assert_eq!(response.status, http::StatusCode::CREATED);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// The HTTP status code.
    pub status: StatusCode,
    /// Extra headers to send.
    pub headers: HeaderMap,
    /// The payload to render.
    pub data: Json,
}

impl Response {
    /// Creates a response with the given status and data.
    pub fn new(status: StatusCode, data: Json) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            data,
        }
    }

    /// Creates a 200 OK response.
    pub fn ok(data: Json) -> Self {
        Self::new(StatusCode::OK, data)
    }

    /// Creates a 201 Created response.
    pub fn created(data: Json) -> Self {
        Self::new(StatusCode::CREATED, data)
    }

    /// Creates a 204 No Content response.
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, Json::Null)
    }

    /// Creates an error response from a [`CommonkitError`].
    ///
    /// The status comes from [`CommonkitError::status_code`] and the payload
    /// from [`CommonkitError::detail`].
    pub fn from_error(error: &CommonkitError) -> Self {
        let status =
            StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, error.detail())
    }

    /// Adds a header. Invalid values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: http::header::HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Returns `true` for 4xx and 5xx statuses.
    pub fn is_error(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }
}

/// A rendered HTTP response.
///
/// ```
/// use commonkit_http::HttpResponse;
///
/// let response = HttpResponse::new(http::StatusCode::OK, b"{}".to_vec(), "application/json");
/// assert_eq!(response.text(), "{}");
/// ```
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    content: Vec<u8>,
    content_type: String,
    charset: String,
}

impl HttpResponse {
    /// Creates a response with an encoded body and media type.
    pub fn new(status: StatusCode, content: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content,
            content_type: content_type.into(),
            charset: "utf-8".to_string(),
        }
    }

    /// Returns the status code.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns a reference to the headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable reference to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the media type (without charset).
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Returns the encoded body.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Parses the body as JSON.
    pub fn json(&self) -> Result<Json, serde_json::Error> {
        serde_json::from_slice(&self.content)
    }

    fn full_content_type(&self) -> String {
        if self.content_type.starts_with("text/") || self.content_type.contains("json") {
            format!("{}; charset={}", self.content_type, self.charset)
        } else {
            self.content_type.clone()
        }
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> axum::response::Response {
        let content_type = self.full_content_type();
        let mut response = axum::response::Response::new(axum::body::Body::from(self.content));
        *response.status_mut() = self.status;
        if let Ok(ct) = HeaderValue::from_str(&content_type) {
            response.headers_mut().insert(http::header::CONTENT_TYPE, ct);
        }
        for (key, value) in &self.headers {
            response.headers_mut().insert(key, value.clone());
        }
        response
    }
}
