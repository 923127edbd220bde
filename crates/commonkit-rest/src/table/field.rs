//! The tabular upload field.

use std::collections::HashMap;
use std::sync::Arc;

use commonkit_core::{CommonkitError, CommonkitResult, Settings, ValidationError};
use commonkit_http::UploadedFile;
use serde_json::{Map, Value as Json};

use super::data::{Row, Table};
use super::handlers::{FormatHandler, HandlerRegistry};
use crate::context::{Scope, SerializerContext};
use crate::fields::{Binding, Field, FieldOptions, Input, Validated};
use crate::serializer::{RowValidator, SerializerClass};

/// Where a [`TableUploadField`] gets its row validator from.
#[derive(Clone, Default)]
pub enum RowValidatorSpec {
    /// The `validate_<field>_row` method of the enclosing serializer, if it
    /// declares one.
    #[default]
    Default,
    /// A named method of the enclosing serializer; it must exist.
    Method(String),
    /// A serializer that validates and saves each row.
    Serializer(Arc<dyn SerializerClass>),
    /// A callback.
    Callable(RowValidator),
}

impl std::fmt::Debug for RowValidatorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Method(name) => f.debug_tuple("Method").field(name).finish(),
            Self::Serializer(class) => f.debug_tuple("Serializer").field(&class.name()).finish(),
            Self::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

/// Wraps a serializer class as a row validator.
///
/// Each row is validated by a fresh serializer whose context carries the row,
/// its index and the table; the row is then saved, and an object returned by
/// the save replaces the row.
pub fn validate_row_with_serializer(
    class: Arc<dyn SerializerClass>,
    context: SerializerContext,
) -> RowValidator {
    Arc::new(move |row: &Row, index: usize, table: &Arc<Table>| {
        let row_context = context
            .clone()
            .with_row(index, row.clone(), Arc::clone(table));
        let mut serializer = class
            .build(row_context)?
            .with_data(Json::Object(row.clone()));
        serializer.validate_or_raise()?;
        match serializer.save()? {
            Json::Object(saved) => Ok(Some(saved)),
            _ => Ok(None),
        }
    })
}

/// A write-only file field that decodes an uploaded table.
///
/// The file extension selects a handler from the registry; the decoded
/// [`Table`] is then run row by row through the row validator, stopping at
/// the first failing row.
///
/// ```
/// use commonkit_rest::table::{default_formats, TableUploadField};
/// use commonkit_rest::{Serializer, SerializerContext};
/// use commonkit_http::UploadedFile;
/// use std::collections::HashMap;
/// use serde_json::json;
///
/// let mut serializer = Serializer::builder("ImportSerializer")
///     .field("people", TableUploadField::new(default_formats()).unwrap())
///     .build(SerializerContext::new())
///     .unwrap()
///     .with_data(json!({}))
///     .with_files(HashMap::from([(
///         "people".to_string(),
///         UploadedFile::new("people.csv", b"name,age\nann,41\n".to_vec()),
///     )]));
///
/// assert!(serializer.is_valid().unwrap());
/// let table = serializer.validated_data().unwrap().get_table("people").unwrap();
/// assert_eq!(table.to_json(), json!([{"name": "ann", "age": 41}]));
/// ```
pub struct TableUploadField {
    options: FieldOptions,
    registry: Arc<HandlerRegistry>,
    handler_kwargs: HashMap<String, Map<String, Json>>,
    spec: RowValidatorSpec,
    row_validator: Option<RowValidator>,
    max_upload_size: Option<usize>,
}

impl TableUploadField {
    /// Creates a field decoding the formats in `registry`.
    ///
    /// Fails when the registry is empty.
    pub fn new(registry: HandlerRegistry) -> CommonkitResult<Self> {
        Self::with_options(registry, FieldOptions::default())
    }

    /// Creates a field with explicit options.
    ///
    /// The field is always write-only, so options asking for `write_only` or
    /// `read_only` are rejected.
    pub fn with_options(
        registry: HandlerRegistry,
        mut options: FieldOptions,
    ) -> CommonkitResult<Self> {
        if options.write_only {
            return Err(CommonkitError::ImproperlyConfigured(
                "serializer TableUploadField is already write_only by default".to_string(),
            ));
        }
        if options.read_only {
            return Err(CommonkitError::ImproperlyConfigured(
                "can't pass read_only to a write_only serializer TableUploadField".to_string(),
            ));
        }
        if registry.is_empty() {
            return Err(CommonkitError::ImproperlyConfigured(
                "must add some format_handlers, either the built-in ones or your own handler \
                 for the formats you expect"
                    .to_string(),
            ));
        }

        options.write_only = true;
        Ok(Self {
            options,
            registry: Arc::new(registry),
            handler_kwargs: HashMap::new(),
            spec: RowValidatorSpec::Default,
            row_validator: None,
            max_upload_size: None,
        })
    }

    /// Sets the keyword arguments passed to the handler for `extension`.
    ///
    /// `kwargs` must be a JSON object.
    pub fn handler_kwargs(mut self, extension: &str, kwargs: Json) -> CommonkitResult<Self> {
        let Json::Object(kwargs) = kwargs else {
            return Err(CommonkitError::ImproperlyConfigured(format!(
                "TableUploadField.handler_kwargs must be an object, got `{kwargs}`"
            )));
        };
        self.handler_kwargs.insert(extension.to_lowercase(), kwargs);
        Ok(self)
    }

    /// Sets where the row validator comes from.
    #[must_use]
    pub fn row_validator(mut self, spec: RowValidatorSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Overrides the configured maximum upload size, in bytes.
    #[must_use]
    pub const fn max_upload_size(mut self, bytes: usize) -> Self {
        self.max_upload_size = Some(bytes);
        self
    }

    /// Returns the registered extensions.
    pub fn allowed_upload_formats(&self) -> Vec<&str> {
        self.registry.formats()
    }

    /// Returns `true` if `extension` has a handler of its own.
    pub fn is_allowed_format(&self, extension: &str) -> bool {
        self.allowed_upload_formats()
            .contains(&extension.to_lowercase().as_str())
    }

    /// Returns `true` once a row validator has been resolved by binding.
    pub fn has_row_validator(&self) -> bool {
        self.row_validator.is_some()
    }

    fn check_file(&self, file: &UploadedFile) -> Result<(), ValidationError> {
        if file.name.is_empty() {
            return Err(ValidationError::new("No filename could be determined.", "no_name"));
        }
        if file.size == 0 {
            return Err(ValidationError::new("The submitted file is empty.", "empty"));
        }
        let max = self
            .max_upload_size
            .unwrap_or_else(|| Settings::current().upload.max_upload_size);
        if file.size > max {
            return Err(ValidationError::new(
                format!(
                    "Ensure this file is no larger than {max} bytes (it is {} bytes).",
                    file.size
                ),
                "max_size",
            )
            .with_param("max_size", max.to_string()));
        }
        Ok(())
    }

    fn decode(&self, file: &UploadedFile) -> CommonkitResult<Table> {
        let extension = file.extension().unwrap_or_default();
        let (registered_as, handler) = self.registry.resolve(&extension).ok_or_else(|| {
            ValidationError::new(
                format!("a handler for format={extension} was not defined"),
                "invalid_format",
            )
        })?;
        let FormatHandler::Parse(parse) = handler else {
            return Err(ValidationError::new(
                format!("handler defined for {extension} is not callable"),
                "handler_not_callable",
            )
            .into());
        };

        tracing::debug!(
            field = %self.options.field_name,
            format = %extension,
            size = file.size,
            "dispatching upload to format handler"
        );
        let no_kwargs = Map::new();
        let kwargs = self
            .handler_kwargs
            .get(&extension)
            .or_else(|| self.handler_kwargs.get(registered_as))
            .unwrap_or(&no_kwargs);
        parse(&file.content, kwargs).map_err(|e| {
            ValidationError::new(
                format!("the format handler raised an error: {e}"),
                "format_handler",
            )
            .with_param("original_exception", e.to_string())
            .into()
        })
    }

    fn process_table(&self, table: Table) -> CommonkitResult<Table> {
        let Some(validator) = &self.row_validator else {
            return Ok(table);
        };
        let mut table = Arc::new(table);
        for index in 0..table.len() {
            let outcome = validator(&table.rows()[index], index, &table);
            match outcome {
                Ok(Some(row)) => Arc::make_mut(&mut table).set_row(index, row),
                Ok(None) => {}
                Err(CommonkitError::ValidationError(error)) => {
                    tracing::debug!(
                        field = %self.options.field_name,
                        row = index,
                        %error,
                        "row validation failed"
                    );
                    return Err(error.with_row(index).into());
                }
                Err(other) => return Err(other),
            }
        }
        Ok(Arc::try_unwrap(table).unwrap_or_else(|shared| Table::clone(&shared)))
    }
}

impl std::fmt::Debug for TableUploadField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableUploadField")
            .field("field_name", &self.options.field_name)
            .field("formats", &self.registry.formats())
            .field("row_validator", &self.spec)
            .finish_non_exhaustive()
    }
}

impl Field for TableUploadField {
    fn class_name(&self) -> &str {
        "TableUploadField"
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn bind(&mut self, field_name: &str, binding: &Binding<'_>) -> CommonkitResult<()> {
        field_name.clone_into(&mut self.options.field_name);
        self.row_validator = match &self.spec {
            RowValidatorSpec::Default => binding
                .methods
                .get(&format!("validate_{field_name}_row"))
                .cloned(),
            RowValidatorSpec::Method(name) => {
                let method = binding.methods.get(name).ok_or_else(|| {
                    CommonkitError::ImproperlyConfigured(format!(
                        "method {name} doesn't exist on serializer {}",
                        binding.parent
                    ))
                })?;
                Some(Arc::clone(method))
            }
            RowValidatorSpec::Serializer(class) => Some(validate_row_with_serializer(
                Arc::clone(class),
                binding.context.clone(),
            )),
            RowValidatorSpec::Callable(callback) => Some(Arc::clone(callback)),
        };
        Ok(())
    }

    fn to_internal_value(&self, data: Input<'_>, _scope: &Scope<'_>) -> CommonkitResult<Validated> {
        let file = data.as_file().ok_or_else(|| {
            ValidationError::new(
                "The submitted data was not a file. Check the encoding type on the form.",
                "invalid",
            )
        })?;
        self.check_file(file)?;
        let table = self.decode(file)?;
        self.process_table(table).map(Validated::Table)
    }

    fn to_representation(&self, _value: &Json, _scope: &Scope<'_>) -> CommonkitResult<Json> {
        Err(ValidationError::new(
            format!("{} is a write_only field", self.class_name()),
            "write_only",
        )
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldExt;
    use crate::serializer::Serializer;
    use crate::table::handlers::{default_formats, read_csv};
    use serde_json::json;

    fn upload(name: &str, content: &[u8]) -> UploadedFile {
        UploadedFile::new(name, content.to_vec())
    }

    fn validate(field: &TableUploadField, file: &UploadedFile) -> CommonkitResult<Validated> {
        let context = SerializerContext::new();
        field.to_internal_value(Input::File(file), &Scope::root(&context))
    }

    fn message(result: CommonkitResult<Validated>) -> String {
        result.unwrap_err().as_validation().unwrap().message.clone()
    }

    #[test]
    fn test_construction_checks() {
        let err = TableUploadField::new(HandlerRegistry::new()).unwrap_err();
        assert!(err.to_string().contains("must add some format_handlers"));

        let options = FieldOptions {
            write_only: true,
            ..FieldOptions::default()
        };
        let err = TableUploadField::with_options(default_formats(), options).unwrap_err();
        assert!(err.to_string().contains("already write_only by default"));

        let err = TableUploadField::new(default_formats())
            .unwrap()
            .handler_kwargs("csv", json!([1]))
            .unwrap_err();
        assert!(err.to_string().contains("must be an object"));
    }

    #[test]
    fn test_is_write_only() {
        let field = TableUploadField::new(default_formats()).unwrap();
        assert!(field.options().write_only);
        let context = SerializerContext::new();
        let err = field.to_representation(&json!([]), &Scope::root(&context)).unwrap_err();
        assert_eq!(err.detail(), json!(["TableUploadField is a write_only field"]));
    }

    #[test]
    fn test_file_checks() {
        let field = TableUploadField::new(default_formats()).unwrap().max_upload_size(8);
        let context = SerializerContext::new();
        let not_a_file =
            field.to_internal_value(Input::Json(&json!("a,b")), &Scope::root(&context));
        assert_eq!(
            message(not_a_file),
            "The submitted data was not a file. Check the encoding type on the form."
        );
        assert_eq!(
            message(validate(&field, &upload("", b"a"))),
            "No filename could be determined."
        );
        assert_eq!(
            message(validate(&field, &upload("a.csv", b""))),
            "The submitted file is empty."
        );
        let err = validate(&field, &upload("a.csv", b"a,b\n1,2\n3,4\n")).unwrap_err();
        assert_eq!(err.as_validation().unwrap().code, "max_size");
    }

    #[test]
    fn test_handler_lookup() {
        let field = TableUploadField::new(default_formats()).unwrap();
        assert_eq!(
            message(validate(&field, &upload("report.txt", b"x"))),
            "a handler for format=txt was not defined"
        );
        assert_eq!(
            message(validate(&field, &upload("report.xlsx", b"x"))),
            "handler defined for xlsx is not callable"
        );
        assert!(field.is_allowed_format("CSV"));
        assert!(!field.is_allowed_format("txt"));
    }

    #[test]
    fn test_handler_errors_are_wrapped() {
        let field = TableUploadField::new(default_formats()).unwrap();
        let err = validate(&field, &upload("broken.json", b"{not json")).unwrap_err();
        let err = err.as_validation().unwrap();
        assert_eq!(err.code, "format_handler");
        assert!(err.message.starts_with("the format handler raised an error: "));
        assert!(err.params.contains_key("original_exception"));
    }

    #[test]
    fn test_handler_kwargs_reach_the_handler() {
        let field = TableUploadField::new(default_formats())
            .unwrap()
            .handler_kwargs("csv", json!({"delimiter": ";"}))
            .unwrap();
        let table = validate(&field, &upload("a.csv", b"x;y\n1;2\n")).unwrap();
        assert_eq!(table.to_json(), json!([{"x": 1, "y": 2}]));
    }

    #[test]
    fn test_named_method_must_exist() {
        let field = TableUploadField::new(default_formats())
            .unwrap()
            .row_validator(RowValidatorSpec::Method("check_row".into()));
        let err = Serializer::builder("ImportSerializer")
            .field("table", field)
            .build(SerializerContext::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Improperly configured: method check_row doesn't exist on serializer ImportSerializer"
        );
    }

    #[test]
    fn test_convention_named_method_transforms_rows() {
        let serializer = Serializer::builder("ImportSerializer")
            .field("table", TableUploadField::new(default_formats()).unwrap().required(true))
            .method("validate_table_row", |row, index, _table| {
                let mut row = row.clone();
                row.insert("index".into(), json!(index));
                Ok(Some(row))
            })
            .build(SerializerContext::new())
            .unwrap();
        let field = serializer.field("table").unwrap();
        let context = SerializerContext::new();
        let table = field
            .to_internal_value(Input::File(&upload("a.csv", b"n\nx\ny\n")), &Scope::root(&context))
            .unwrap();
        assert_eq!(table.to_json(), json!([{"n": "x", "index": 0}, {"n": "y", "index": 1}]));
    }

    #[test]
    fn test_wildcard_handler() {
        let registry = HandlerRegistry::new().register("*", FormatHandler::parse(read_csv));
        let field = TableUploadField::new(registry).unwrap();
        assert!(validate(&field, &upload("data.txt", b"a\n1\n")).is_ok());
    }

    #[test]
    fn test_wildcard_handler_receives_its_kwargs() {
        let registry = HandlerRegistry::new().register("*", FormatHandler::parse(read_csv));
        let field = TableUploadField::new(registry)
            .unwrap()
            .handler_kwargs("*", json!({"delimiter": ";"}))
            .unwrap();
        let value = validate(&field, &upload("a.txt", b"x;y\n1;2\n")).unwrap();
        assert_eq!(value.as_table().unwrap().to_json(), json!([{"x": 1, "y": 2}]));

        let field = field.handler_kwargs("dat", json!({"delimiter": "|"})).unwrap();
        let value = validate(&field, &upload("b.dat", b"x|y\n3|4\n")).unwrap();
        assert_eq!(value.as_table().unwrap().to_json(), json!([{"x": 3, "y": 4}]));
    }
}
