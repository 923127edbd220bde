//! The [`Field`] trait and primitive fields.
//!
//! A field converts wire data into a [`Validated`] value
//! (`to_internal_value`) and stored data back into JSON
//! (`to_representation`). Serializers are fields too, which is how nesting
//! works: a serializer hands each child a [`Scope`] pointing back at itself.

use std::collections::HashMap;

use commonkit_core::{CommonkitError, CommonkitResult, ValidationError};
use commonkit_http::UploadedFile;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as Json;

use crate::context::{Scope, SerializerContext};
use crate::serializer::RowValidator;
use crate::table::Table;

// ── Input and output values ─────────────────────────────────────────

/// Raw data handed to [`Field::to_internal_value`].
#[derive(Debug, Clone, Copy)]
pub enum Input<'a> {
    /// A value from the JSON payload.
    Json(&'a Json),
    /// An uploaded file.
    File(&'a UploadedFile),
}

impl<'a> Input<'a> {
    /// Returns the JSON value, or `None` for a file.
    pub const fn as_json(&self) -> Option<&'a Json> {
        match self {
            Self::Json(json) => Some(json),
            Self::File(_) => None,
        }
    }

    /// Returns the uploaded file, or `None` for JSON.
    pub const fn as_file(&self) -> Option<&'a UploadedFile> {
        match self {
            Self::Json(_) => None,
            Self::File(file) => Some(file),
        }
    }
}

/// A value produced by validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Validated {
    /// A plain JSON value.
    Json(Json),
    /// A decoded table from an upload.
    Table(Table),
    /// The validated data of a nested serializer.
    Object(ValidatedData),
    /// The validated items of a list serializer.
    List(Vec<Validated>),
}

impl Validated {
    /// Converts the value to JSON; tables become arrays of row objects.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Json(json) => json.clone(),
            Self::Table(table) => table.to_json(),
            Self::Object(data) => data.to_json(),
            Self::List(items) => Json::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// Returns the JSON value, if this is one.
    pub const fn as_json(&self) -> Option<&Json> {
        match self {
            Self::Json(json) => Some(json),
            _ => None,
        }
    }

    /// Returns the table, if this is one.
    pub const fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Returns the nested validated data, if this is one.
    pub const fn as_object(&self) -> Option<&ValidatedData> {
        match self {
            Self::Object(data) => Some(data),
            _ => None,
        }
    }
}

impl From<Json> for Validated {
    fn from(json: Json) -> Self {
        Self::Json(json)
    }
}

/// Validated values keyed by field name, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedData {
    values: Vec<(String, Validated)>,
}

impl ValidatedData {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, name: impl Into<String>, value: Validated) {
        let name = name.into();
        if let Some(slot) = self.values.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.values.push((name, value));
        }
    }

    /// Returns a value by field name.
    pub fn get(&self, name: &str) -> Option<&Validated> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns a JSON value by field name.
    pub fn get_json(&self, name: &str) -> Option<&Json> {
        self.get(name).and_then(Validated::as_json)
    }

    /// Returns a table by field name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.get(name).and_then(Validated::as_table)
    }

    /// Returns `true` if a value is present for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Validated)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Converts the data to a JSON object.
    pub fn to_json(&self) -> Json {
        Json::Object(
            self.values
                .iter()
                .map(|(n, v)| (n.clone(), v.to_json()))
                .collect(),
        )
    }
}

// ── Field options and binding ───────────────────────────────────────

/// Options common to every field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOptions {
    /// The name the field is bound under; empty until bound.
    pub field_name: String,
    /// The key read from instances, when different from `field_name`.
    pub source: Option<String>,
    /// Whether input must contain the field.
    pub required: bool,
    /// Whether the field only appears in output.
    pub read_only: bool,
    /// Whether the field only appears in input.
    pub write_only: bool,
    /// Whether `null` is accepted as input.
    pub allow_null: bool,
    /// Value used when input omits the field.
    pub default: Option<Json>,
    /// Human-readable label.
    pub label: Option<String>,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            field_name: String::new(),
            source: None,
            required: true,
            read_only: false,
            write_only: false,
            allow_null: false,
            default: None,
            label: None,
        }
    }
}

/// What a field learns about its parent when it is bound.
pub struct Binding<'a> {
    /// Class name of the enclosing serializer.
    pub parent: &'a str,
    /// Row-validator methods declared on the enclosing serializer.
    pub methods: &'a HashMap<String, RowValidator>,
    /// Context of the enclosing serializer.
    pub context: &'a SerializerContext,
}

// ── The Field trait ─────────────────────────────────────────────────

/// A serializer field.
pub trait Field: Send + Sync {
    /// Returns the type name used in messages (e.g. `"CharField"`).
    fn class_name(&self) -> &str;

    /// Returns the common options.
    fn options(&self) -> &FieldOptions;

    /// Returns the common options mutably.
    fn options_mut(&mut self) -> &mut FieldOptions;

    /// Returns the name the field is bound under.
    fn field_name(&self) -> &str {
        &self.options().field_name
    }

    /// Returns the key read from instances.
    fn source(&self) -> &str {
        let options = self.options();
        options.source.as_deref().unwrap_or(&options.field_name)
    }

    /// Attaches the field to its parent under `field_name`.
    fn bind(&mut self, field_name: &str, _binding: &Binding<'_>) -> CommonkitResult<()> {
        field_name.clone_into(&mut self.options_mut().field_name);
        Ok(())
    }

    /// Validates input and converts it to its internal form.
    fn to_internal_value(&self, data: Input<'_>, scope: &Scope<'_>) -> CommonkitResult<Validated>;

    /// Converts a stored value to its output form.
    fn to_representation(&self, value: &Json, scope: &Scope<'_>) -> CommonkitResult<Json>;

    /// Returns the child fields of a compound field, `None` for a leaf.
    fn get_fields(&self, _context: &SerializerContext) -> Option<Vec<&dyn Field>> {
        None
    }

    /// Returns `true` for list serializers.
    fn is_list(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for dyn Field + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(self.class_name())
            .field("field_name", &self.field_name())
            .finish_non_exhaustive()
    }
}

/// Chainable setters for [`FieldOptions`], available on every sized field.
///
/// ```
/// use commonkit_rest::{CharField, Field, FieldExt};
///
/// let field = CharField::new().required(false).allow_null();
/// assert!(!field.options().required);
/// assert!(field.options().allow_null);
/// ```
pub trait FieldExt: Field + Sized {
    /// Sets whether the field is required.
    #[must_use]
    fn required(mut self, required: bool) -> Self {
        self.options_mut().required = required;
        self
    }

    /// Marks the field output-only.
    #[must_use]
    fn read_only(mut self) -> Self {
        let options = self.options_mut();
        options.read_only = true;
        options.required = false;
        self
    }

    /// Marks the field input-only.
    #[must_use]
    fn write_only(mut self) -> Self {
        self.options_mut().write_only = true;
        self
    }

    /// Accepts `null` as input.
    #[must_use]
    fn allow_null(mut self) -> Self {
        self.options_mut().allow_null = true;
        self
    }

    /// Sets the value used when input omits the field.
    #[must_use]
    fn default_value(mut self, value: Json) -> Self {
        let options = self.options_mut();
        options.default = Some(value);
        options.required = false;
        self
    }

    /// Reads the field from a different instance key.
    #[must_use]
    fn with_source(mut self, source: impl Into<String>) -> Self {
        self.options_mut().source = Some(source.into());
        self
    }

    /// Sets the human-readable label.
    #[must_use]
    fn label(mut self, label: impl Into<String>) -> Self {
        self.options_mut().label = Some(label.into());
        self
    }
}

impl<F: Field + Sized> FieldExt for F {}

// ── Primitive fields ────────────────────────────────────────────────

/// A string field.
#[derive(Debug, Clone)]
pub struct CharField {
    options: FieldOptions,
    max_length: Option<usize>,
    min_length: Option<usize>,
    allow_blank: bool,
    trim_whitespace: bool,
}

impl Default for CharField {
    fn default() -> Self {
        Self::new()
    }
}

impl CharField {
    /// Creates a required, trimmed, non-blank string field.
    pub fn new() -> Self {
        Self {
            options: FieldOptions::default(),
            max_length: None,
            min_length: None,
            allow_blank: false,
            trim_whitespace: true,
        }
    }

    /// Sets the maximum length in characters.
    #[must_use]
    pub const fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Sets the minimum length in characters.
    #[must_use]
    pub const fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    /// Accepts the empty string.
    #[must_use]
    pub const fn allow_blank(mut self) -> Self {
        self.allow_blank = true;
        self
    }

    /// Keeps surrounding whitespace.
    #[must_use]
    pub const fn keep_whitespace(mut self) -> Self {
        self.trim_whitespace = false;
        self
    }

    /// Validates input and returns the cleaned string.
    pub fn clean(&self, data: Input<'_>) -> Result<String, ValidationError> {
        let value = match data {
            Input::Json(Json::String(s)) => s.clone(),
            Input::Json(n @ Json::Number(_)) => n.to_string(),
            _ => return Err(ValidationError::new("Not a valid string.", "invalid")),
        };
        let value = if self.trim_whitespace {
            value.trim().to_string()
        } else {
            value
        };

        if value.is_empty() && !self.allow_blank {
            return Err(ValidationError::new("This field may not be blank.", "blank"));
        }
        let len = value.chars().count();
        if let Some(max) = self.max_length.filter(|max| len > *max) {
            return Err(ValidationError::new(
                format!("Ensure this field has no more than {max} characters."),
                "max_length",
            )
            .with_param("max_length", max.to_string()));
        }
        if let Some(min) = self.min_length.filter(|min| len < *min) {
            return Err(ValidationError::new(
                format!("Ensure this field has at least {min} characters."),
                "min_length",
            )
            .with_param("min_length", min.to_string()));
        }
        Ok(value)
    }
}

/// Renders a scalar as the string a char field would output.
pub(crate) fn represent_string(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Field for CharField {
    fn class_name(&self) -> &str {
        "CharField"
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn to_internal_value(&self, data: Input<'_>, _scope: &Scope<'_>) -> CommonkitResult<Validated> {
        Ok(Validated::Json(Json::String(self.clean(data)?)))
    }

    fn to_representation(&self, value: &Json, _scope: &Scope<'_>) -> CommonkitResult<Json> {
        Ok(Json::String(represent_string(value)))
    }
}

/// An integer field.
#[derive(Debug, Clone, Default)]
pub struct IntegerField {
    options: FieldOptions,
    min_value: Option<i64>,
    max_value: Option<i64>,
}

impl IntegerField {
    /// Creates a required integer field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the smallest accepted value.
    #[must_use]
    pub const fn min_value(mut self, min: i64) -> Self {
        self.min_value = Some(min);
        self
    }

    /// Sets the largest accepted value.
    #[must_use]
    pub const fn max_value(mut self, max: i64) -> Self {
        self.max_value = Some(max);
        self
    }

    fn parse(value: &Json) -> Option<i64> {
        match value {
            Json::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                    .map(|f| f as i64)
            }),
            Json::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl Field for IntegerField {
    fn class_name(&self) -> &str {
        "IntegerField"
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn to_internal_value(&self, data: Input<'_>, _scope: &Scope<'_>) -> CommonkitResult<Validated> {
        let value = data
            .as_json()
            .and_then(Self::parse)
            .ok_or_else(|| ValidationError::new("A valid integer is required.", "invalid"))?;

        if let Some(max) = self.max_value.filter(|max| value > *max) {
            return Err(ValidationError::new(
                format!("Ensure this value is less than or equal to {max}."),
                "max_value",
            )
            .into());
        }
        if let Some(min) = self.min_value.filter(|min| value < *min) {
            return Err(ValidationError::new(
                format!("Ensure this value is greater than or equal to {min}."),
                "min_value",
            )
            .into());
        }
        Ok(Validated::Json(Json::from(value)))
    }

    fn to_representation(&self, value: &Json, _scope: &Scope<'_>) -> CommonkitResult<Json> {
        Self::parse(value).map(Json::from).ok_or_else(|| {
            CommonkitError::SerializationError(format!("{value} is not an integer"))
        })
    }
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Returns `true` if `value` looks like an email address.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// A string field that only accepts email addresses.
#[derive(Debug, Clone, Default)]
pub struct EmailField {
    inner: CharField,
}

impl EmailField {
    /// Creates a required email field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates input and returns the cleaned address.
    pub fn clean(&self, data: Input<'_>) -> Result<String, ValidationError> {
        let value = self.inner.clean(data)?;
        if is_valid_email(&value) {
            Ok(value)
        } else {
            Err(ValidationError::new("Enter a valid email address.", "invalid"))
        }
    }
}

impl Field for EmailField {
    fn class_name(&self) -> &str {
        "EmailField"
    }

    fn options(&self) -> &FieldOptions {
        self.inner.options()
    }

    fn options_mut(&mut self) -> &mut FieldOptions {
        self.inner.options_mut()
    }

    fn to_internal_value(&self, data: Input<'_>, _scope: &Scope<'_>) -> CommonkitResult<Validated> {
        Ok(Validated::Json(Json::String(self.clean(data)?)))
    }

    fn to_representation(&self, value: &Json, _scope: &Scope<'_>) -> CommonkitResult<Json> {
        Ok(Json::String(represent_string(value)))
    }
}
