//! A serializer for lists of items.

use std::collections::HashMap;

use commonkit_core::{CommonkitError, CommonkitResult, ValidationError};
use serde_json::Value as Json;

use crate::context::{Scope, SerializerContext};
use crate::fields::{Binding, Field, FieldOptions, Input, Validated};

/// Validates and represents a JSON array item by item with one child field.
///
/// Children see the list as their parent in the [`Scope`], which is how a
/// recursive child nested under a list finds the serializer above it.
///
/// ```
/// use commonkit_rest::{IntegerField, ListSerializer, Scope, SerializerContext, Field};
/// use serde_json::json;
///
/// let numbers = ListSerializer::new(IntegerField::new());
/// let context = SerializerContext::new();
/// let out = numbers.to_representation(&json!(["1", 2]), &Scope::root(&context)).unwrap();
/// assert_eq!(out, json!([1, 2]));
/// ```
pub struct ListSerializer {
    options: FieldOptions,
    child: Box<dyn Field>,
    allow_empty: bool,
}

impl ListSerializer {
    /// Wraps `child`, which handles each item.
    pub fn new(child: impl Field + 'static) -> Self {
        Self::boxed(Box::new(child))
    }

    /// Wraps an already boxed child.
    pub fn boxed(child: Box<dyn Field>) -> Self {
        Self {
            options: FieldOptions::default(),
            child,
            allow_empty: true,
        }
    }

    /// Rejects empty lists.
    #[must_use]
    pub const fn disallow_empty(mut self) -> Self {
        self.allow_empty = false;
        self
    }

    /// Returns the child field.
    pub fn child(&self) -> &dyn Field {
        self.child.as_ref()
    }
}

impl Field for ListSerializer {
    fn class_name(&self) -> &str {
        "ListSerializer"
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn bind(&mut self, field_name: &str, binding: &Binding<'_>) -> CommonkitResult<()> {
        field_name.clone_into(&mut self.options.field_name);
        self.child.bind(field_name, binding)
    }

    fn to_internal_value(&self, data: Input<'_>, scope: &Scope<'_>) -> CommonkitResult<Validated> {
        let items = match data {
            Input::Json(Json::Array(items)) => items,
            Input::Json(other) => {
                return Err(ValidationError::new(
                    format!("Expected a list of items but got type \"{}\".", type_name(other)),
                    "not_a_list",
                )
                .into())
            }
            Input::File(_) => {
                return Err(ValidationError::new(
                    "Expected a list of items but got a file.",
                    "not_a_list",
                )
                .into())
            }
        };
        if items.is_empty() && !self.allow_empty {
            return Err(ValidationError::new("This list may not be empty.", "empty").into());
        }

        let child_scope = Scope::child(self, scope);
        let mut validated = Vec::with_capacity(items.len());
        let mut errors = HashMap::new();
        for (index, item) in items.iter().enumerate() {
            match self.child.to_internal_value(Input::Json(item), &child_scope) {
                Ok(value) => validated.push(value),
                Err(CommonkitError::ValidationError(error)) => {
                    errors.insert(index.to_string(), vec![error]);
                }
                Err(other) => return Err(other),
            }
        }

        if errors.is_empty() {
            Ok(Validated::List(validated))
        } else {
            Err(ValidationError::with_field_errors(errors).into())
        }
    }

    fn to_representation(&self, value: &Json, scope: &Scope<'_>) -> CommonkitResult<Json> {
        let Json::Array(items) = value else {
            return Err(CommonkitError::SerializationError(format!(
                "{} expected a list, got {value}",
                self.child.class_name()
            )));
        };
        let child_scope = Scope::child(self, scope);
        items
            .iter()
            .map(|item| match item {
                Json::Null => Ok(Json::Null),
                item => self.child.to_representation(item, &child_scope),
            })
            .collect::<CommonkitResult<Vec<_>>>()
            .map(Json::Array)
    }

    fn get_fields(&self, context: &SerializerContext) -> Option<Vec<&dyn Field>> {
        self.child.get_fields(context)
    }

    fn is_list(&self) -> bool {
        true
    }
}

fn type_name(value: &Json) -> &'static str {
    match value {
        Json::Null => "NoneType",
        Json::Bool(_) => "bool",
        Json::Number(n) if n.is_f64() => "float",
        Json::Number(_) => "int",
        Json::String(_) => "str",
        Json::Array(_) => "list",
        Json::Object(_) => "dict",
    }
}
