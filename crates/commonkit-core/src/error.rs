//! Core error types for commonkit.
//!
//! [`ValidationError`] mirrors a REST framework validation error: a simple
//! message, a map of per-field errors, or either of those tagged with the
//! index of the table row that produced it. [`CommonkitError`] is the
//! crate-wide error enum; each variant maps to an HTTP status code.

use std::collections::HashMap;
use std::fmt;

use serde_json::{json, Map, Value as Json};
use thiserror::Error;

/// Represents a validation error with optional field-level errors.
///
/// # Examples
///
/// ```
/// use commonkit_core::error::ValidationError;
///
/// // Simple validation error
/// let err = ValidationError::new("This field is required.", "required");
/// assert_eq!(err.detail(), serde_json::json!(["This field is required."]));
///
/// // Field-level validation errors
/// let invalid = ValidationError::new("Invalid email.", "invalid");
/// let err = ValidationError::for_field("email", invalid);
/// assert_eq!(err.detail(), serde_json::json!({"email": ["Invalid email."]}));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    /// The primary error message.
    pub message: String,
    /// A short code identifying the type of validation failure (e.g. "required", "invalid").
    pub code: String,
    /// Additional parameters providing context for the error message.
    pub params: HashMap<String, String>,
    /// Per-field validation errors, keyed by field name.
    pub field_errors: HashMap<String, Vec<Self>>,
    /// Index of the table row this error was raised for.
    pub row: Option<usize>,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a message and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            ..Self::default()
        }
    }

    /// Creates a `ValidationError` containing per-field errors.
    pub fn with_field_errors(field_errors: HashMap<String, Vec<Self>>) -> Self {
        Self {
            field_errors,
            ..Self::default()
        }
    }

    /// Creates a `ValidationError` holding a single error for one field.
    pub fn for_field(field: impl Into<String>, error: Self) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.into(), vec![error]);
        Self::with_field_errors(field_errors)
    }

    /// Adds a parameter to this validation error.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Tags this error with the index of the table row that produced it.
    #[must_use]
    pub const fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    /// Returns `true` if this error carries structure beyond a single message.
    pub fn is_compound(&self) -> bool {
        self.row.is_some() || !self.field_errors.is_empty()
    }

    /// Renders the error as a JSON detail payload.
    ///
    /// - a simple error becomes `["message"]`
    /// - field errors become `{"field": ["message", ...]}`
    /// - a row-tagged error becomes `{"row": i, "field_errors": <detail>}`
    pub fn detail(&self) -> Json {
        if let Some(row) = self.row {
            let inner = Self {
                row: None,
                ..self.clone()
            };
            return json!({
                "row": row,
                "field_errors": inner.detail(),
            });
        }

        if self.field_errors.is_empty() {
            return json!([self.message]);
        }

        let mut map = Map::new();
        for (field, errors) in &self.field_errors {
            map.insert(field.clone(), field_detail(errors));
        }
        Json::Object(map)
    }
}

fn field_detail(errors: &[ValidationError]) -> Json {
    if let [only] = errors {
        if only.is_compound() {
            return only.detail();
        }
    }
    Json::Array(
        errors
            .iter()
            .map(|e| {
                if e.is_compound() {
                    e.detail()
                } else {
                    Json::String(e.message.clone())
                }
            })
            .collect(),
    )
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(row) = self.row {
            write!(f, "row {row}: ")?;
        }
        if !self.message.is_empty() {
            write!(f, "{}", self.message)?;
        } else if !self.field_errors.is_empty() {
            let mut fields: Vec<_> = self.field_errors.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));
            let mut first = true;
            for (field, errors) in fields {
                for error in errors {
                    if !first {
                        write!(f, "; ")?;
                    }
                    write!(f, "{field}: {error}")?;
                    first = false;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// The primary error type for commonkit.
///
/// Each variant maps to an appropriate HTTP status code via
/// [`CommonkitError::status_code`].
#[derive(Error, Debug)]
pub enum CommonkitError {
    // ── HTTP errors ──────────────────────────────────────────────────

    /// HTTP 400 Bad Request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP 401 Unauthorized.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// HTTP 403 Forbidden / Permission Denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP 404 Not Found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 405 Method Not Allowed.
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// HTTP 500 Internal Server Error.
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    // ── Validation ───────────────────────────────────────────────────

    /// One or more fields failed validation.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A field, serializer or view-set was wired up incorrectly.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CommonkitError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `BadRequest`, `ValidationError` -> 400
    /// - `Unauthorized` -> 401
    /// - `PermissionDenied` -> 403
    /// - `NotFound` -> 404
    /// - `MethodNotAllowed` -> 405
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::ValidationError(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) => 404,
            Self::MethodNotAllowed(_) => 405,
            Self::InternalServerError(_)
            | Self::ConfigurationError(_)
            | Self::ImproperlyConfigured(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Renders the error as the JSON payload of an error response.
    ///
    /// Validation errors use their structured detail; every other error
    /// becomes `{"detail": "<message>"}`.
    pub fn detail(&self) -> Json {
        match self {
            Self::ValidationError(e) => e.detail(),
            other => json!({ "detail": other.to_string() }),
        }
    }

    /// Returns the inner validation error, if this is one.
    pub const fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::ValidationError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for CommonkitError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationError(err)
    }
}

impl From<serde_json::Error> for CommonkitError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// A convenience type alias for `Result<T, CommonkitError>`.
pub type CommonkitResult<T> = Result<T, CommonkitError>;
