//! The [`Serializer`] type and its builder.
//!
//! A serializer is a named, ordered collection of fields plus optional
//! `create`/`update` hooks and row-validator methods. It validates a JSON
//! object into [`ValidatedData`], saves through its hooks, and represents
//! instances (JSON objects) field by field.
//!
//! # Examples
//!
//! ```
//! use commonkit_rest::{CharField, IntegerField, Serializer, SerializerContext};
//! use serde_json::json;
//!
//! let mut serializer = Serializer::builder("HumanSerializer")
//!     .field("name", CharField::new().max_length(128))
//!     .field("age", IntegerField::new().min_value(0))
//!     .create(|data, _ctx| {
//!         let mut saved = data.to_json();
//!         saved["id"] = json!(1);
//!         Ok(saved)
//!     })
//!     .build(SerializerContext::new())
//!     .unwrap()
//!     .with_data(json!({"name": "Ann", "age": "41"}));
//!
//! assert!(serializer.is_valid().unwrap());
//! let saved = serializer.save().unwrap();
//! assert_eq!(saved, json!({"id": 1, "name": "Ann", "age": 41}));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use commonkit_core::{CommonkitError, CommonkitResult, ValidationError};
use commonkit_http::UploadedFile;
use serde_json::{Map, Value as Json};

use crate::context::{Scope, SerializerContext};
use crate::fields::{Binding, Field, FieldOptions, Input, Validated, ValidatedData};
use crate::table::{Row, Table};

/// A per-row callback: receives the row, its index and the whole table, and
/// may return a replacement row.
///
/// The table is shared so that row serializers can keep it in their context.
pub type RowValidator =
    Arc<dyn Fn(&Row, usize, &Arc<Table>) -> CommonkitResult<Option<Row>> + Send + Sync>;

/// Persists validated data and returns the saved instance.
pub type CreateHook =
    Arc<dyn Fn(&ValidatedData, &SerializerContext) -> CommonkitResult<Json> + Send + Sync>;

/// Applies validated data to an existing instance and returns it.
pub type UpdateHook = Arc<
    dyn Fn(&Json, &ValidatedData, &SerializerContext) -> CommonkitResult<Json> + Send + Sync,
>;

/// Something that can build fresh [`Serializer`] instances.
///
/// View-sets and row-level validation need a new serializer per use; they
/// hold a `SerializerClass` and call [`build`](Self::build).
///
/// ```
/// use commonkit_core::CommonkitResult;
/// use commonkit_rest::{CharField, Serializer, SerializerClass, SerializerContext};
///
/// struct TagSerializer;
///
/// impl SerializerClass for TagSerializer {
///     fn name(&self) -> &str {
///         "TagSerializer"
///     }
///
///     fn build(&self, context: SerializerContext) -> CommonkitResult<Serializer> {
///         Serializer::builder(self.name()).field("label", CharField::new()).build(context)
///     }
/// }
///
/// let serializer = TagSerializer.build(SerializerContext::new()).unwrap();
/// assert_eq!(serializer.field_names(), vec!["label"]);
/// ```
pub trait SerializerClass: Send + Sync {
    /// Returns the class name used in messages.
    fn name(&self) -> &str;

    /// Builds a serializer bound to `context`.
    fn build(&self, context: SerializerContext) -> CommonkitResult<Serializer>;
}

/// Builder for [`Serializer`].
pub struct SerializerBuilder {
    name: String,
    options: FieldOptions,
    fields: Vec<(String, Box<dyn Field>)>,
    methods: HashMap<String, RowValidator>,
    create: Option<CreateHook>,
    update: Option<UpdateHook>,
}

impl SerializerBuilder {
    /// Adds a field under `name`.
    #[must_use]
    pub fn field(self, name: impl Into<String>, field: impl Field + 'static) -> Self {
        self.boxed_field(name, Box::new(field))
    }

    /// Adds an already boxed field under `name`.
    #[must_use]
    pub fn boxed_field(mut self, name: impl Into<String>, field: Box<dyn Field>) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    /// Declares a row-validator method that upload fields can refer to by name.
    #[must_use]
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Row, usize, &Arc<Table>) -> CommonkitResult<Option<Row>> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    /// Sets the hook that persists new instances.
    #[must_use]
    pub fn create<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ValidatedData, &SerializerContext) -> CommonkitResult<Json> + Send + Sync + 'static,
    {
        self.create = Some(Arc::new(hook));
        self
    }

    /// Sets the hook that updates existing instances.
    #[must_use]
    pub fn update<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Json, &ValidatedData, &SerializerContext) -> CommonkitResult<Json>
            + Send
            + Sync
            + 'static,
    {
        self.update = Some(Arc::new(hook));
        self
    }

    /// Sets options used when the serializer is nested as a field.
    #[must_use]
    pub fn options(mut self, options: FieldOptions) -> Self {
        self.options = options;
        self
    }

    /// Binds every field and returns the serializer.
    ///
    /// Fails when a field rejects its binding (for instance an upload field
    /// naming a row-validator method that was never declared).
    pub fn build(self, context: SerializerContext) -> CommonkitResult<Serializer> {
        let binding = Binding {
            parent: &self.name,
            methods: &self.methods,
            context: &context,
        };
        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, mut field) in self.fields {
            field.bind(&name, &binding)?;
            fields.push(field);
        }

        Ok(Serializer {
            name: self.name,
            options: self.options,
            fields,
            methods: self.methods,
            create: self.create,
            update: self.update,
            context,
            instance: None,
            initial_data: None,
            files: HashMap::new(),
            partial: false,
            validated_data: None,
            errors: None,
        })
    }
}

/// A named collection of fields that validates, saves and represents objects.
pub struct Serializer {
    name: String,
    options: FieldOptions,
    fields: Vec<Box<dyn Field>>,
    methods: HashMap<String, RowValidator>,
    create: Option<CreateHook>,
    update: Option<UpdateHook>,
    context: SerializerContext,
    instance: Option<Json>,
    initial_data: Option<Json>,
    files: HashMap<String, UploadedFile>,
    partial: bool,
    validated_data: Option<ValidatedData>,
    errors: Option<ValidationError>,
}

impl std::fmt::Debug for Serializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Serializer")
            .field("name", &self.name)
            .field("fields", &self.field_names())
            .field("instance", &self.instance)
            .field("partial", &self.partial)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl Serializer {
    /// Starts building a serializer named `name`.
    pub fn builder(name: impl Into<String>) -> SerializerBuilder {
        SerializerBuilder {
            name: name.into(),
            options: FieldOptions::default(),
            fields: Vec::new(),
            methods: HashMap::new(),
            create: None,
            update: None,
        }
    }

    /// Sets the instance to update or represent.
    #[must_use]
    pub fn with_instance(mut self, instance: Json) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Sets the input data to validate.
    #[must_use]
    pub fn with_data(mut self, data: Json) -> Self {
        self.initial_data = Some(data);
        self
    }

    /// Sets the uploaded files, keyed by field name.
    #[must_use]
    pub fn with_files(mut self, files: HashMap<String, UploadedFile>) -> Self {
        self.files = files;
        self
    }

    /// Allows input to omit required fields.
    #[must_use]
    pub const fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    /// Returns the class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the context this serializer was built with.
    pub const fn context(&self) -> &SerializerContext {
        &self.context
    }

    /// Returns the bound fields in declaration order.
    pub fn fields(&self) -> &[Box<dyn Field>] {
        &self.fields
    }

    /// Returns a bound field by name.
    pub fn field(&self, name: &str) -> Option<&dyn Field> {
        self.fields
            .iter()
            .find(|f| f.field_name() == name)
            .map(AsRef::as_ref)
    }

    /// Returns the field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.field_name()).collect()
    }

    /// Returns a declared row-validator method.
    pub fn method(&self, name: &str) -> Option<&RowValidator> {
        self.methods.get(name)
    }

    /// Returns the instance, if any.
    pub const fn instance(&self) -> Option<&Json> {
        self.instance.as_ref()
    }

    /// Returns the input data, if any.
    pub const fn initial_data(&self) -> Option<&Json> {
        self.initial_data.as_ref()
    }

    /// Returns the validated data after a successful [`is_valid`](Self::is_valid).
    pub const fn validated_data(&self) -> Option<&ValidatedData> {
        self.validated_data.as_ref()
    }

    /// Returns the errors after a failed [`is_valid`](Self::is_valid).
    pub const fn errors(&self) -> Option<&ValidationError> {
        self.errors.as_ref()
    }

    /// Validates the input data.
    ///
    /// Returns `Ok(false)` and records the errors when validation fails.
    /// Errors other than validation errors are returned as-is.
    pub fn is_valid(&mut self) -> CommonkitResult<bool> {
        let Some(data) = self.initial_data.as_ref() else {
            return Err(CommonkitError::ImproperlyConfigured(format!(
                "cannot validate {} without input data",
                self.name
            )));
        };

        let result = self.run_validation(data, &self.files, &Scope::root(&self.context));
        match result {
            Ok(validated) => {
                self.validated_data = Some(validated);
                self.errors = None;
                Ok(true)
            }
            Err(CommonkitError::ValidationError(errors)) => {
                tracing::debug!(serializer = %self.name, %errors, "validation failed");
                self.validated_data = None;
                self.errors = Some(errors);
                Ok(false)
            }
            Err(other) => Err(other),
        }
    }

    /// Validates the input data and returns the errors as an `Err`.
    pub fn validate_or_raise(&mut self) -> CommonkitResult<()> {
        if self.is_valid()? {
            Ok(())
        } else {
            Err(self.errors.clone().unwrap_or_default().into())
        }
    }

    /// Saves the validated data through the `create` or `update` hook.
    ///
    /// With an instance the `update` hook runs, otherwise `create`. The saved
    /// instance replaces the current one and is returned.
    pub fn save(&mut self) -> CommonkitResult<Json> {
        if self.errors.is_some() {
            return Err(CommonkitError::ImproperlyConfigured(format!(
                "cannot save {} with invalid data",
                self.name
            )));
        }
        let Some(validated) = self.validated_data.as_ref() else {
            return Err(CommonkitError::ImproperlyConfigured(format!(
                "{} must be validated before it is saved",
                self.name
            )));
        };

        let saved = match &self.instance {
            Some(instance) => {
                let hook = self.update.as_ref().ok_or_else(|| {
                    CommonkitError::ImproperlyConfigured(format!(
                        "{} does not define an update hook",
                        self.name
                    ))
                })?;
                hook(instance, validated, &self.context)?
            }
            None => {
                let hook = self.create.as_ref().ok_or_else(|| {
                    CommonkitError::ImproperlyConfigured(format!(
                        "{} does not define a create hook",
                        self.name
                    ))
                })?;
                hook(validated, &self.context)?
            }
        };
        self.instance = Some(saved.clone());
        Ok(saved)
    }

    /// Returns the output representation.
    ///
    /// The instance is represented when there is one, otherwise the validated
    /// data, otherwise an empty object.
    pub fn data(&self) -> CommonkitResult<Json> {
        let scope = Scope::root(&self.context);
        match (&self.instance, &self.validated_data) {
            (Some(instance), _) => self.to_representation(instance, &scope),
            (None, Some(validated)) => self.to_representation(&validated.to_json(), &scope),
            (None, None) => Ok(Json::Object(Map::new())),
        }
    }

    /// Represents `instance` as if this serializer were the outermost one.
    pub fn represent(&self, instance: &Json) -> CommonkitResult<Json> {
        self.to_representation(instance, &Scope::root(&self.context))
    }

    fn run_validation(
        &self,
        data: &Json,
        files: &HashMap<String, UploadedFile>,
        scope: &Scope<'_>,
    ) -> CommonkitResult<ValidatedData> {
        let Json::Object(map) = data else {
            return Err(ValidationError::new(
                format!("Invalid data. Expected a dictionary, but got {}.", json_type(data)),
                "invalid",
            )
            .into());
        };

        let child_scope = Scope::child(self, scope);
        let mut validated = ValidatedData::new();
        let mut errors: HashMap<String, Vec<ValidationError>> = HashMap::new();

        for field in &self.fields {
            let options = field.options();
            if options.read_only {
                continue;
            }
            let name = field.field_name();

            let input = match (files.get(name), map.get(name)) {
                (Some(file), _) => Input::File(file),
                (None, Some(Json::Null)) => {
                    if options.allow_null {
                        validated.insert(field.source(), Validated::Json(Json::Null));
                    } else {
                        errors.insert(
                            name.to_string(),
                            vec![ValidationError::new("This field may not be null.", "null")],
                        );
                    }
                    continue;
                }
                (None, Some(value)) => Input::Json(value),
                (None, None) => {
                    if self.partial {
                        continue;
                    }
                    if let Some(default) = &options.default {
                        validated.insert(field.source(), Validated::Json(default.clone()));
                    } else if options.required {
                        errors.insert(
                            name.to_string(),
                            vec![ValidationError::new("This field is required.", "required")],
                        );
                    }
                    continue;
                }
            };

            match field.to_internal_value(input, &child_scope) {
                Ok(value) => validated.insert(field.source(), value),
                Err(CommonkitError::ValidationError(error)) => {
                    errors.insert(name.to_string(), vec![error]);
                }
                Err(other) => return Err(other),
            }
        }

        if errors.is_empty() {
            Ok(validated)
        } else {
            Err(ValidationError::with_field_errors(errors).into())
        }
    }
}

fn json_type(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "str",
        Json::Array(_) => "list",
        Json::Object(_) => "dict",
    }
}

impl Field for Serializer {
    fn class_name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn bind(&mut self, field_name: &str, binding: &Binding<'_>) -> CommonkitResult<()> {
        field_name.clone_into(&mut self.options.field_name);
        self.context = binding.context.clone();

        let child_binding = Binding {
            parent: &self.name,
            methods: &self.methods,
            context: &self.context,
        };
        for field in &mut self.fields {
            let name = field.field_name().to_string();
            field.bind(&name, &child_binding)?;
        }
        Ok(())
    }

    fn to_internal_value(&self, data: Input<'_>, scope: &Scope<'_>) -> CommonkitResult<Validated> {
        let Input::Json(data) = data else {
            return Err(ValidationError::new(
                "Invalid data. Expected a dictionary, but got a file.",
                "invalid",
            )
            .into());
        };
        self.run_validation(data, &HashMap::new(), scope)
            .map(Validated::Object)
    }

    fn to_representation(&self, value: &Json, scope: &Scope<'_>) -> CommonkitResult<Json> {
        let Json::Object(instance) = value else {
            return Err(CommonkitError::SerializationError(format!(
                "{} expected an object, got {value}",
                self.name
            )));
        };

        let child_scope = Scope::child(self, scope);
        let mut out = Map::new();
        for field in &self.fields {
            if field.options().write_only {
                continue;
            }
            let represented = match instance.get(field.source()) {
                None => continue,
                Some(Json::Null) => Json::Null,
                Some(stored) => field.to_representation(stored, &child_scope)?,
            };
            out.insert(field.field_name().to_string(), represented);
        }
        Ok(Json::Object(out))
    }

    fn get_fields(&self, _context: &SerializerContext) -> Option<Vec<&dyn Field>> {
        Some(self.fields.iter().map(AsRef::as_ref).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{CharField, FieldExt, IntegerField};
    use serde_json::json;

    fn person(context: SerializerContext) -> Serializer {
        Serializer::builder("PersonSerializer")
            .field("id", IntegerField::new().read_only())
            .field("name", CharField::new())
            .field("nickname", CharField::new().required(false))
            .field("age", IntegerField::new().allow_null())
            .create(|data, _| {
                let mut saved = data.to_json();
                saved["id"] = json!(7);
                Ok(saved)
            })
            .update(|instance, data, _| {
                let mut saved = instance.clone();
                for (name, value) in data.iter() {
                    saved[name] = value.to_json();
                }
                Ok(saved)
            })
            .build(context)
            .unwrap()
    }

    #[test]
    fn test_missing_required_field_is_reported() {
        let mut s = person(SerializerContext::new()).with_data(json!({"age": 3}));
        assert!(!s.is_valid().unwrap());
        assert_eq!(s.errors().unwrap().detail(), json!({"name": ["This field is required."]}));
    }

    #[test]
    fn test_null_handling() {
        let mut s = person(SerializerContext::new()).with_data(json!({"name": null, "age": null}));
        assert!(!s.is_valid().unwrap());
        assert_eq!(s.errors().unwrap().detail(), json!({"name": ["This field may not be null."]}));
    }

    #[test]
    fn test_read_only_input_is_ignored() {
        let mut s = person(SerializerContext::new())
            .with_data(json!({"id": 99, "name": "Ann", "age": 1}));
        assert!(s.is_valid().unwrap());
        assert!(!s.validated_data().unwrap().contains("id"));
    }

    #[test]
    fn test_non_object_input() {
        let mut s = person(SerializerContext::new()).with_data(json!([1, 2]));
        assert!(!s.is_valid().unwrap());
        assert_eq!(
            s.errors().unwrap().detail(),
            json!(["Invalid data. Expected a dictionary, but got list."])
        );
    }

    #[test]
    fn test_create_then_data() {
        let mut s = person(SerializerContext::new()).with_data(json!({"name": "Ann", "age": "30"}));
        s.validate_or_raise().unwrap();
        s.save().unwrap();
        assert_eq!(s.data().unwrap(), json!({"id": 7, "name": "Ann", "age": 30}));
    }

    #[test]
    fn test_partial_update() {
        let mut s = person(SerializerContext::new())
            .with_instance(json!({"id": 1, "name": "Ann", "age": 30}))
            .with_data(json!({"age": 31}))
            .partial(true);
        assert!(s.is_valid().unwrap());
        assert_eq!(s.save().unwrap(), json!({"id": 1, "name": "Ann", "age": 31}));
    }

    #[test]
    fn test_save_before_validation_is_a_configuration_error() {
        let mut s = person(SerializerContext::new());
        assert!(matches!(s.save(), Err(CommonkitError::ImproperlyConfigured(_))));
        assert!(matches!(s.is_valid(), Err(CommonkitError::ImproperlyConfigured(_))));
    }

    #[test]
    fn test_nested_serializer() {
        let address = Serializer::builder("AddressSerializer")
            .field("city", CharField::new())
            .build(SerializerContext::new())
            .unwrap();
        let mut s = Serializer::builder("CustomerSerializer")
            .field("name", CharField::new())
            .field("address", address)
            .build(SerializerContext::new())
            .unwrap()
            .with_data(json!({"name": "Ann", "address": {}}));
        assert!(!s.is_valid().unwrap());
        assert_eq!(
            s.errors().unwrap().detail(),
            json!({"address": {"city": ["This field is required."]}})
        );

        let represented = s
            .represent(&json!({"name": "Ann", "address": {"city": "Oslo", "zip": "0150"}}))
            .unwrap();
        assert_eq!(represented, json!({"name": "Ann", "address": {"city": "Oslo"}}));
    }
}
