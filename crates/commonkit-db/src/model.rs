//! Model metadata and the [`Model`] trait.
//!
//! [`ModelMeta`] is the minimal counterpart of a model's `Meta`: the app
//! label, the model name, concrete fields and private (non-database) fields.

use crate::fields::{FieldDef, NonDatabaseField};
use crate::value::Value;

/// Metadata about a model.
#[derive(Debug, Clone)]
pub struct ModelMeta {
    /// The application label (e.g., "shop").
    pub app_label: String,
    /// The model name in lowercase (e.g., "product").
    pub model_name: String,
    /// Concrete, column-backed fields.
    pub fields: Vec<FieldDef>,
    /// Fields that live on the model but have no column.
    pub private_fields: Vec<NonDatabaseField>,
}

impl ModelMeta {
    /// Creates empty metadata for `app_label.model_name`.
    pub fn new(app_label: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            app_label: app_label.into(),
            model_name: model_name.into(),
            fields: Vec::new(),
            private_fields: Vec::new(),
        }
    }

    /// Returns `app_label.model_name`.
    pub fn label(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }

    /// Adds a concrete field.
    pub fn add_field(&mut self, field: FieldDef) {
        self.fields.push(field);
    }

    /// Adds a concrete field, builder style.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.add_field(field);
        self
    }

    /// Adds a private field, keeping declaration order.
    pub fn add_private_field(&mut self, field: NonDatabaseField) {
        let pos = self.private_fields.partition_point(|f| f < &field);
        self.private_fields.insert(pos, field);
    }

    /// Looks up a concrete field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a private field by name.
    pub fn get_private_field(&self, name: &str) -> Option<&NonDatabaseField> {
        self.private_fields.iter().find(|f| f.name == name)
    }

    /// Returns the concrete fields.
    pub fn concrete_fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Returns the database columns, in declaration order.
    pub fn columns(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.column.as_str()).collect()
    }

    /// Returns every field name, concrete and private, in declaration order.
    pub fn all_field_names(&self) -> Vec<&str> {
        let mut named: Vec<(u64, &str)> = self
            .fields
            .iter()
            .map(|f| (f.creation_counter, f.name.as_str()))
            .chain(
                self.private_fields
                    .iter()
                    .map(|f| (f.creation_counter, f.name.as_str())),
            )
            .collect();
        named.sort_by_key(|(counter, _)| *counter);
        named.into_iter().map(|(_, name)| name).collect()
    }
}

/// A model instance whose concrete field values can be read and written by name.
pub trait Model: Send + Sync + 'static {
    /// Returns the static metadata for this model type.
    fn meta() -> &'static ModelMeta;

    /// Returns the current value of a concrete field.
    fn get_value(&self, field: &str) -> Option<Value>;

    /// Stores a value into a concrete field.
    fn set_value(&mut self, field: &str, value: Value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldType;

    #[test]
    fn test_label() {
        assert_eq!(ModelMeta::new("shop", "product").label(), "shop.product");
    }

    #[test]
    fn test_all_field_names_in_declaration_order() {
        let mut meta = ModelMeta::new("shop", "product");
        meta.add_field(FieldDef::new("id", FieldType::IntegerField).primary_key());
        let price = NonDatabaseField::new();
        meta.add_field(FieldDef::new("name", FieldType::CharField));
        price.contribute_to_class(&mut meta, "price");

        assert_eq!(meta.all_field_names(), vec!["id", "price", "name"]);
        assert_eq!(meta.columns(), vec!["id", "name"]);
    }

    #[test]
    fn test_get_field() {
        let meta = ModelMeta::new("shop", "product")
            .field(FieldDef::new("sku", FieldType::CharField).column("sku_code"));
        assert_eq!(meta.get_field("sku").unwrap().column, "sku_code");
        assert!(meta.get_field("missing").is_none());
    }
}
