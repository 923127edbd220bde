//! Self-referential serializers.

use commonkit_core::{CommonkitResult, ValidationError};
use serde_json::Value as Json;

use crate::context::Scope;
use crate::fields::{Field, FieldOptions, Input, Validated};
use crate::list::ListSerializer;

/// Re-serializes a value through the serializer it is nested in.
///
/// Nested directly, it delegates to its parent; nested in a
/// [`ListSerializer`], it delegates to the list's parent. That makes trees
/// such as category → parent or person → children expressible without
/// naming the serializer inside itself.
///
/// ```
/// use commonkit_rest::{CharField, FieldExt, RecursiveSerializer, Serializer, SerializerContext};
/// use serde_json::json;
///
/// let category = Serializer::builder("CategorySerializer")
///     .field("name", CharField::new())
///     .field("parent", RecursiveSerializer::new().allow_null())
///     .build(SerializerContext::new())
///     .unwrap();
///
/// let tree = json!({"name": "laptops", "parent": {"name": "computers", "parent": null}});
/// assert_eq!(category.represent(&tree).unwrap(), tree);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecursiveSerializer {
    options: FieldOptions,
}

impl RecursiveSerializer {
    /// Creates a recursive field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a list of recursive items, for child collections.
    pub fn many() -> ListSerializer {
        ListSerializer::new(Self::new())
    }

    fn target<'s>(&self, scope: &Scope<'s>) -> CommonkitResult<(&'s dyn Field, &'s Scope<'s>)> {
        let orphan = || {
            ValidationError::new(
                format!("{} can't be used as a dependant serializer", self.class_name()),
                "no_parent",
            )
        };
        let (parent, parent_scope) = scope.parent.ok_or_else(orphan)?;
        let target = if parent.is_list() {
            parent_scope.parent.ok_or_else(orphan)?
        } else {
            (parent, parent_scope)
        };
        Ok(target)
    }
}

impl Field for RecursiveSerializer {
    fn class_name(&self) -> &str {
        "RecursiveSerializer"
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn to_internal_value(&self, data: Input<'_>, scope: &Scope<'_>) -> CommonkitResult<Validated> {
        let (target, target_scope) = self.target(scope)?;
        target.to_internal_value(data, target_scope)
    }

    fn to_representation(&self, value: &Json, scope: &Scope<'_>) -> CommonkitResult<Json> {
        let (target, target_scope) = self.target(scope)?;
        target.to_representation(value, target_scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SerializerContext;
    use crate::fields::{CharField, FieldExt};
    use crate::serializer::Serializer;
    use serde_json::json;

    fn person() -> Serializer {
        Serializer::builder("PersonSerializer")
            .field("name", CharField::new())
            .field("children", RecursiveSerializer::many().required(false))
            .build(SerializerContext::new())
            .unwrap()
    }

    #[test]
    fn test_standalone_use_fails() {
        let context = SerializerContext::new();
        let err = RecursiveSerializer::new()
            .to_representation(&json!({}), &Scope::root(&context))
            .unwrap_err();
        assert_eq!(
            err.as_validation().unwrap().message,
            "RecursiveSerializer can't be used as a dependant serializer"
        );
    }

    #[test]
    fn test_children_through_a_list() {
        let family = json!({
            "name": "Ann",
            "age": 70,
            "children": [
                {"name": "Bob", "children": []},
                {"name": "Cid", "children": [{"name": "Dee", "children": []}]},
            ],
        });
        let represented = person().represent(&family).unwrap();
        assert_eq!(
            represented["children"][1]["children"][0],
            json!({"name": "Dee", "children": []})
        );
        assert!(represented.get("age").is_none());
    }

    #[test]
    fn test_nested_input_is_validated_by_the_parent() {
        let mut serializer = person().with_data(json!({
            "name": "Ann",
            "children": [{"name": ""}],
        }));
        assert!(!serializer.is_valid().unwrap());
        assert_eq!(
            serializer.errors().unwrap().detail(),
            json!({"children": {"0": {"name": ["This field may not be blank."]}}})
        );
    }
}
