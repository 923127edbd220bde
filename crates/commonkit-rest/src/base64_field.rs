//! A char field that converts to and from base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use commonkit_core::{CommonkitResult, ValidationError};
use serde_json::Value as Json;

use crate::context::Scope;
use crate::fields::{represent_string, CharField, Field, FieldOptions, Input, Validated};

/// Accepts base64 on input and produces it on output.
///
/// By default input is decoded and stored as plain text, and stored text is
/// encoded on output. [`plain_input`](Self::plain_input) swaps the
/// directions: input is encoded for storage and output decoded.
///
/// ```
/// use commonkit_rest::{Base64Field, Field, Input, Scope, SerializerContext};
/// use serde_json::json;
///
/// let field = Base64Field::new();
/// let context = SerializerContext::new();
/// let scope = Scope::root(&context);
///
/// let stored = field.to_internal_value(Input::Json(&json!("aGVsbG8=")), &scope).unwrap();
/// assert_eq!(stored.to_json(), json!("hello"));
/// assert_eq!(field.to_representation(&json!("hello"), &scope).unwrap(), json!("aGVsbG8="));
/// ```
#[derive(Debug, Clone)]
pub struct Base64Field {
    inner: CharField,
    reverse: bool,
}

impl Default for Base64Field {
    fn default() -> Self {
        Self::new()
    }
}

impl Base64Field {
    /// Creates a field decoding input and encoding output.
    pub fn new() -> Self {
        Self {
            inner: CharField::new(),
            reverse: true,
        }
    }

    /// Wraps a configured char field.
    pub const fn from_char_field(inner: CharField) -> Self {
        Self {
            inner,
            reverse: true,
        }
    }

    /// Encodes input and decodes output instead.
    #[must_use]
    pub const fn plain_input(mut self) -> Self {
        self.reverse = false;
        self
    }

    /// Encodes `value` as standard base64.
    pub fn to_base(value: &str) -> String {
        STANDARD.encode(value.as_bytes())
    }

    /// Decodes standard base64 into UTF-8 text.
    pub fn from_base(value: &str) -> Result<String, ValidationError> {
        STANDARD
            .decode(value)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| {
                ValidationError::new("string provided is not valid base64", "invalid_b64_string")
            })
    }
}

impl Field for Base64Field {
    fn class_name(&self) -> &str {
        "Base64Field"
    }

    fn options(&self) -> &FieldOptions {
        self.inner.options()
    }

    fn options_mut(&mut self) -> &mut FieldOptions {
        self.inner.options_mut()
    }

    fn to_internal_value(&self, data: Input<'_>, _scope: &Scope<'_>) -> CommonkitResult<Validated> {
        let value = self.inner.clean(data)?;
        let stored = if self.reverse {
            Self::from_base(&value)?
        } else {
            Self::to_base(&value)
        };
        Ok(Validated::Json(Json::String(stored)))
    }

    fn to_representation(&self, value: &Json, _scope: &Scope<'_>) -> CommonkitResult<Json> {
        let value = represent_string(value);
        if self.reverse {
            return Ok(Json::String(Self::to_base(&value)));
        }
        Ok(Self::from_base(&value).map_or(Json::Null, Json::String))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SerializerContext;
    use serde_json::json;

    fn run(field: &Base64Field, input: Json) -> CommonkitResult<Json> {
        let context = SerializerContext::new();
        field
            .to_internal_value(Input::Json(&input), &Scope::root(&context))
            .map(|v| v.to_json())
    }

    #[test]
    fn test_invalid_input() {
        let err = run(&Base64Field::new(), json!("not base64!")).unwrap_err();
        let err = err.as_validation().unwrap();
        assert_eq!(err.message, "string provided is not valid base64");
        assert_eq!(err.code, "invalid_b64_string");
    }

    #[test]
    fn test_non_utf8_payload_is_invalid() {
        let encoded = STANDARD.encode([0xff, 0xfe]);
        assert!(run(&Base64Field::new(), json!(encoded)).is_err());
    }

    #[test]
    fn test_plain_input_swaps_directions() {
        let field = Base64Field::new().plain_input();
        assert_eq!(run(&field, json!("hello")).unwrap(), json!("aGVsbG8="));

        let context = SerializerContext::new();
        let scope = Scope::root(&context);
        assert_eq!(field.to_representation(&json!("aGVsbG8="), &scope).unwrap(), json!("hello"));
        assert_eq!(field.to_representation(&json!("%%%"), &scope).unwrap(), Json::Null);
    }

    #[test]
    fn test_char_field_rules_apply_first() {
        let field = Base64Field::from_char_field(CharField::new().max_length(4));
        let err = run(&field, json!("aGVsbG8=")).unwrap_err();
        assert_eq!(err.as_validation().unwrap().code, "max_length");
    }
}
