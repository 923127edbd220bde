//! Char and email fields that mask their output.

use commonkit_core::utils::Obfuscator;
use commonkit_core::CommonkitResult;
use serde_json::Value as Json;

use crate::context::Scope;
use crate::fields::{represent_string, CharField, EmailField, Field, FieldOptions, Input, Validated};

macro_rules! obfuscation_setters {
    () => {
        /// Sets how many characters are masked.
        #[must_use]
        pub const fn cutoff(mut self, cutoff: i64) -> Self {
            self.obfuscator.cutoff = cutoff;
            self
        }

        /// Masks the head (`false`) instead of the tail (`true`).
        #[must_use]
        pub const fn from_end(mut self, from_end: bool) -> Self {
            self.obfuscator.from_end = from_end;
            self
        }

        /// Sets the replacement character.
        #[must_use]
        pub const fn mask_char(mut self, ch: char) -> Self {
            self.obfuscator.ch = ch;
            self
        }

        /// Returns the masking configuration.
        pub const fn obfuscator(&self) -> &Obfuscator {
            &self.obfuscator
        }
    };
}

/// A char field whose output is masked.
///
/// Masking defaults come from the `obfuscation` settings.
///
/// ```
/// use commonkit_rest::{Field, ObfuscatedCharField, Scope, SerializerContext};
/// use serde_json::json;
///
/// let card = ObfuscatedCharField::new().cutoff(12).from_end(false);
/// let context = SerializerContext::new();
/// let out = card.to_representation(&json!("4111111111111111"), &Scope::root(&context)).unwrap();
/// assert_eq!(out, json!("************1111"));
/// ```
#[derive(Debug, Clone)]
pub struct ObfuscatedCharField {
    inner: CharField,
    obfuscator: Obfuscator,
}

impl Default for ObfuscatedCharField {
    fn default() -> Self {
        Self::new()
    }
}

impl ObfuscatedCharField {
    /// Creates a field using the configured masking defaults.
    pub fn new() -> Self {
        Self::from_char_field(CharField::new())
    }

    /// Wraps a configured char field.
    pub fn from_char_field(inner: CharField) -> Self {
        Self {
            inner,
            obfuscator: Obfuscator::default(),
        }
    }

    obfuscation_setters!();
}

impl Field for ObfuscatedCharField {
    fn class_name(&self) -> &str {
        "ObfuscatedCharField"
    }

    fn options(&self) -> &FieldOptions {
        self.inner.options()
    }

    fn options_mut(&mut self) -> &mut FieldOptions {
        self.inner.options_mut()
    }

    fn to_internal_value(&self, data: Input<'_>, scope: &Scope<'_>) -> CommonkitResult<Validated> {
        self.inner.to_internal_value(data, scope)
    }

    fn to_representation(&self, value: &Json, _scope: &Scope<'_>) -> CommonkitResult<Json> {
        let masked = self.obfuscator.obfuscate(&represent_string(value))?;
        Ok(Json::String(masked))
    }
}

/// An email field whose output masks the local part.
///
/// ```
/// use commonkit_rest::{Field, ObfuscatedEmailField, Scope, SerializerContext};
/// use serde_json::json;
///
/// let email = ObfuscatedEmailField::new().cutoff(3).mask_char('#');
/// let context = SerializerContext::new();
/// let out = email
///     .to_representation(&json!("johnsmith@example.com"), &Scope::root(&context))
///     .unwrap();
/// assert_eq!(out, json!("johnsm###@example.com"));
/// ```
#[derive(Debug, Clone)]
pub struct ObfuscatedEmailField {
    inner: EmailField,
    obfuscator: Obfuscator,
}

impl Default for ObfuscatedEmailField {
    fn default() -> Self {
        Self::new()
    }
}

impl ObfuscatedEmailField {
    /// Creates a field using the configured masking defaults.
    pub fn new() -> Self {
        Self {
            inner: EmailField::new(),
            obfuscator: Obfuscator::default(),
        }
    }

    obfuscation_setters!();
}

impl Field for ObfuscatedEmailField {
    fn class_name(&self) -> &str {
        "ObfuscatedEmailField"
    }

    fn options(&self) -> &FieldOptions {
        self.inner.options()
    }

    fn options_mut(&mut self) -> &mut FieldOptions {
        self.inner.options_mut()
    }

    fn to_internal_value(&self, data: Input<'_>, scope: &Scope<'_>) -> CommonkitResult<Validated> {
        self.inner.to_internal_value(data, scope)
    }

    fn to_representation(&self, value: &Json, _scope: &Scope<'_>) -> CommonkitResult<Json> {
        let masked = self.obfuscator.email(&represent_string(value))?;
        Ok(Json::String(masked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SerializerContext;
    use serde_json::json;

    fn output(field: &dyn Field, value: Json) -> CommonkitResult<Json> {
        let context = SerializerContext::new();
        field.to_representation(&value, &Scope::root(&context))
    }

    #[test]
    fn test_defaults_mask_the_last_four() {
        assert_eq!(
            output(&ObfuscatedCharField::new(), json!("secret-token")).unwrap(),
            json!("secret-t****")
        );
    }

    #[test]
    fn test_short_values_are_fully_masked() {
        assert_eq!(output(&ObfuscatedCharField::new(), json!("abc")).unwrap(), json!("***"));
    }

    #[test]
    fn test_negative_cutoff_fails() {
        let field = ObfuscatedCharField::new().cutoff(-2);
        assert!(output(&field, json!("abcdef")).is_err());
    }

    #[test]
    fn test_email_input_is_still_validated() {
        let field = ObfuscatedEmailField::new();
        let context = SerializerContext::new();
        let scope = Scope::root(&context);
        assert!(field.to_internal_value(Input::Json(&json!("nope")), &scope).is_err());
        assert_eq!(
            output(&field, json!("johnsmith@example.com")).unwrap(),
            json!("johns****@example.com")
        );
        assert!(output(&field, json!("a@b@c")).is_err());
    }
}
