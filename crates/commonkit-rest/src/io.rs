//! A field with separate input and output shapes.

use commonkit_core::CommonkitResult;
use serde_json::Value as Json;

use crate::context::{Scope, SerializerContext};
use crate::fields::{Binding, Field, FieldOptions, Input, Validated};

/// Validates with one field and represents with another.
///
/// The usual case is accepting a primary key on input and returning the full
/// related object on output. The field is never required.
///
/// ```
/// use commonkit_rest::{CharField, IntegerField, IoSerializer, Serializer, SerializerContext};
/// use serde_json::json;
///
/// let user = Serializer::builder("UserSerializer")
///     .field("id", IntegerField::new())
///     .field("username", CharField::new())
///     .build(SerializerContext::new())
///     .unwrap();
///
/// let post = Serializer::builder("PostSerializer")
///     .field("author", IoSerializer::new(IntegerField::new(), user))
///     .build(SerializerContext::new())
///     .unwrap();
///
/// let out = post.represent(&json!({"author": {"id": 1, "username": "ann"}})).unwrap();
/// assert_eq!(out, json!({"author": {"id": 1, "username": "ann"}}));
///
/// let mut post = post.with_data(json!({"author": 1}));
/// assert!(post.is_valid().unwrap());
/// ```
pub struct IoSerializer {
    options: FieldOptions,
    input: Box<dyn Field>,
    output: Box<dyn Field>,
}

impl IoSerializer {
    /// Creates a field validating with `input` and representing with `output`.
    pub fn new(input: impl Field + 'static, output: impl Field + 'static) -> Self {
        tracing::warn!("IoSerializer is subject to interface change, use with caution");
        Self {
            options: FieldOptions {
                required: false,
                ..FieldOptions::default()
            },
            input: Box::new(input),
            output: Box::new(output),
        }
    }

    /// Returns the field used for input.
    pub fn input(&self) -> &dyn Field {
        self.input.as_ref()
    }

    /// Returns the field used for output.
    pub fn output(&self) -> &dyn Field {
        self.output.as_ref()
    }
}

impl std::fmt::Debug for IoSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoSerializer")
            .field("field_name", &self.options.field_name)
            .field("input", &self.input.class_name())
            .field("output", &self.output.class_name())
            .finish()
    }
}

impl Field for IoSerializer {
    fn class_name(&self) -> &str {
        "IoSerializer"
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn bind(&mut self, field_name: &str, binding: &Binding<'_>) -> CommonkitResult<()> {
        field_name.clone_into(&mut self.options.field_name);
        self.input.bind(field_name, binding)?;
        self.output.bind(field_name, binding)
    }

    fn to_internal_value(&self, data: Input<'_>, scope: &Scope<'_>) -> CommonkitResult<Validated> {
        self.input.to_internal_value(data, scope)
    }

    fn to_representation(&self, value: &Json, scope: &Scope<'_>) -> CommonkitResult<Json> {
        self.output.to_representation(value, scope)
    }

    /// Write requests see the input side's fields, everything else (and no
    /// request at all) the output side's. A leaf side is its own field set.
    fn get_fields(&self, context: &SerializerContext) -> Option<Vec<&dyn Field>> {
        let side = match context.request() {
            Some(request) if request.is_write_method() => &self.input,
            _ => &self.output,
        };
        Some(
            side.get_fields(context)
                .unwrap_or_else(|| vec![side.as_ref()]),
        )
    }
}
