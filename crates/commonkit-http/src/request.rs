//! HTTP request type.
//!
//! [`HttpRequest`] carries what the serializer and view-set layers read from
//! a request: the method and path, headers, the already-parsed JSON payload,
//! uploaded files and the authenticated user, if any.

use std::collections::HashMap;

use http::{HeaderMap, Method};
use serde_json::Value as Json;

use crate::upload::UploadedFile;

/// The user a request was authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// The user's login name.
    pub username: String,
    /// Whether the user may access staff-only resources.
    pub is_staff: bool,
}

impl AuthUser {
    /// Creates a regular (non-staff) user.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_staff: false,
        }
    }
}

/// An HTTP request with its parsed payload.
///
/// # Examples
///
/// ```
/// use commonkit_http::HttpRequest;
///
/// let request = HttpRequest::builder()
///     .method(http::Method::POST)
///     .path("/articles/")
///     .json(serde_json::json!({"title": "Hello"}))
///     .build();
///
/// assert_eq!(request.method(), &http::Method::POST);
/// assert_eq!(request.data()["title"], "Hello");
/// ```
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query_string: String,
    headers: HeaderMap,
    data: Json,
    files: HashMap<String, UploadedFile>,
    user: Option<AuthUser>,
    scheme: String,
}

impl HttpRequest {
    /// Creates a new [`HttpRequestBuilder`].
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Returns the HTTP method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string (without the leading `?`).
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Returns the request headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the parsed request payload (`null` when there is none).
    pub const fn data(&self) -> &Json {
        &self.data
    }

    /// Returns the uploaded files, keyed by form field name.
    pub const fn files(&self) -> &HashMap<String, UploadedFile> {
        &self.files
    }

    /// Returns the uploaded file for a form field.
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.get(field)
    }

    /// Returns the authenticated user.
    pub const fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    /// Returns `true` when a user is attached to the request.
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Returns `true` for methods that do not modify state
    /// (`GET`, `HEAD`, `OPTIONS`).
    pub fn is_safe_method(&self) -> bool {
        matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }

    /// Returns `true` for methods that carry a payload to validate
    /// (`POST`, `PUT`, `PATCH`).
    pub fn is_write_method(&self) -> bool {
        matches!(self.method, Method::POST | Method::PUT | Method::PATCH)
    }

    /// Returns the host from the `Host` header, or `localhost`.
    pub fn get_host(&self) -> &str {
        self.headers
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost")
    }

    /// Builds an absolute URI for `location`, or for the request path when `None`.
    ///
    /// ```
    /// use commonkit_http::HttpRequest;
    ///
    /// let request = HttpRequest::builder().header("host", "api.example.com").build();
    /// assert_eq!(
    ///     request.build_absolute_uri(Some("/items/1/")),
    ///     "http://api.example.com/items/1/"
    /// );
    /// ```
    pub fn build_absolute_uri(&self, location: Option<&str>) -> String {
        match location {
            Some(loc) if loc.starts_with("http://") || loc.starts_with("https://") => {
                loc.to_string()
            }
            Some(loc) => {
                let sep = if loc.starts_with('/') { "" } else { "/" };
                format!("{}://{}{sep}{loc}", self.scheme, self.get_host())
            }
            None if self.query_string.is_empty() => {
                format!("{}://{}{}", self.scheme, self.get_host(), self.path)
            }
            None => format!(
                "{}://{}{}?{}",
                self.scheme,
                self.get_host(),
                self.path,
                self.query_string
            ),
        }
    }
}

/// Builder for constructing [`HttpRequest`] instances.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: Method,
    path: String,
    query_string: String,
    headers: HeaderMap,
    data: Json,
    files: HashMap<String, UploadedFile>,
    user: Option<AuthUser>,
    scheme: String,
}

impl Default for HttpRequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query_string: String::new(),
            headers: HeaderMap::new(),
            data: Json::Null,
            files: HashMap::new(),
            user: None,
            scheme: "http".to_string(),
        }
    }
}

impl HttpRequestBuilder {
    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Sets the query string (without leading `?`).
    #[must_use]
    pub fn query_string(mut self, qs: &str) -> Self {
        self.query_string = qs.to_string();
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::from_bytes(name.as_bytes()),
            http::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Sets the parsed JSON payload.
    #[must_use]
    pub fn json(mut self, data: Json) -> Self {
        self.data = data;
        self
    }

    /// Attaches an uploaded file under a form field name.
    #[must_use]
    pub fn file(mut self, field: &str, file: UploadedFile) -> Self {
        self.files.insert(field.to_string(), file);
        self
    }

    /// Attaches an authenticated user.
    #[must_use]
    pub fn user(mut self, user: AuthUser) -> Self {
        self.user = Some(user);
        self
    }

    /// Sets the scheme (http or https).
    #[must_use]
    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    /// Builds the [`HttpRequest`].
    pub fn build(self) -> HttpRequest {
        HttpRequest {
            method: self.method,
            path: self.path,
            query_string: self.query_string,
            headers: self.headers,
            data: self.data,
            files: self.files,
            user: self.user,
            scheme: self.scheme,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let req = HttpRequest::builder().build();
        assert_eq!(req.method(), &Method::GET);
        assert_eq!(req.path(), "/");
        assert!(req.data().is_null());
        assert!(req.files().is_empty());
        assert!(!req.is_authenticated());
    }

    #[test]
    fn test_safe_and_write_methods() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            let req = HttpRequest::builder().method(method).build();
            assert!(req.is_safe_method());
            assert!(!req.is_write_method());
        }
        for method in [Method::POST, Method::PUT, Method::PATCH] {
            let req = HttpRequest::builder().method(method).build();
            assert!(req.is_write_method());
            assert!(!req.is_safe_method());
        }
        let delete = HttpRequest::builder().method(Method::DELETE).build();
        assert!(!delete.is_safe_method());
        assert!(!delete.is_write_method());
    }

    #[test]
    fn test_user() {
        let req = HttpRequest::builder().user(AuthUser::new("alice")).build();
        assert!(req.is_authenticated());
        assert_eq!(req.user().unwrap().username, "alice");
    }

    #[test]
    fn test_file_lookup() {
        let req = HttpRequest::builder()
            .file("upload", UploadedFile::new("rows.csv", b"a,b\n1,2\n".to_vec()))
            .build();
        assert_eq!(req.file("upload").unwrap().name, "rows.csv");
        assert!(req.file("other").is_none());
    }

    #[test]
    fn test_build_absolute_uri() {
        let req = HttpRequest::builder()
            .path("/articles/")
            .query_string("page=1")
            .header("host", "example.com")
            .build();
        assert_eq!(req.build_absolute_uri(None), "http://example.com/articles/?page=1");
        assert_eq!(req.build_absolute_uri(Some("other/")), "http://example.com/other/");
        assert_eq!(
            req.build_absolute_uri(Some("https://cdn.example.com/x")),
            "https://cdn.example.com/x"
        );
    }
}
