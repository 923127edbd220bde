//! Field definitions for model metadata.
//!
//! [`FieldDef`] describes a concrete, column-backed field. [`NonDatabaseField`]
//! describes a field that lives on the model class but never gets a column:
//! it is registered as a *private* field and skipped by anything that builds
//! SQL. Both draw from one global creation counter, so fields of either kind
//! sort in declaration order.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use commonkit_core::{CommonkitResult, ValidationError};

use crate::value::Value;

static CREATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Returns the next value of the global field creation counter.
pub fn next_creation_counter() -> u64 {
    CREATION_COUNTER.fetch_add(1, AtomicOrdering::Relaxed)
}

/// The type of a concrete model field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum FieldType {
    /// 64-bit signed integer.
    IntegerField,
    /// Variable-length string.
    CharField,
    /// Unlimited-length text.
    TextField,
    /// Boolean (true/false).
    BooleanField,
    /// Fixed-precision decimal number.
    DecimalField {
        /// Maximum total digits.
        max_digits: u32,
        /// Digits after the decimal point.
        decimal_places: u32,
    },
    /// Date and time.
    DateTimeField,
    /// JSON data.
    JsonField,
}

/// Definition of a concrete, column-backed model field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// The attribute name of this field.
    pub name: String,
    /// The database column name (may differ from `name`).
    pub column: String,
    /// The type of this field.
    pub field_type: FieldType,
    /// Whether this field is the primary key.
    pub primary_key: bool,
    /// Whether NULL is allowed in the database.
    pub null: bool,
    /// Whether the field may be left blank in forms.
    pub blank: bool,
    /// Default value for new instances.
    pub default: Option<Value>,
    /// Whether a UNIQUE constraint is applied.
    pub unique: bool,
    /// Maximum character length (for `CharField`).
    pub max_length: Option<usize>,
    /// Human-readable name for the field.
    pub verbose_name: String,
    /// Whether the field is editable in forms.
    pub editable: bool,
    /// Position in declaration order across all fields.
    pub creation_counter: u64,
}

impl FieldDef {
    /// Creates a new `FieldDef` with sensible defaults.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            verbose_name: name.replace('_', " "),
            name,
            field_type,
            primary_key: false,
            null: false,
            blank: false,
            default: None,
            unique: false,
            max_length: None,
            editable: true,
            creation_counter: next_creation_counter(),
        }
    }

    /// Sets the database column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Marks this field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Allows NULL values in the database.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    /// Sets the maximum character length.
    #[must_use]
    pub const fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Sets the default value for this field.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Returns the default value, if one is declared and not NULL.
    pub fn get_default(&self) -> Option<&Value> {
        self.default.as_ref().filter(|v| !v.is_null())
    }
}

/// Options accepted by [`NonDatabaseField::with_options`].
///
/// Only `verbose_name` is meaningful; the remaining flags exist so that a
/// caller passing them gets a clear error instead of a silently ignored flag.
#[derive(Debug, Clone, Default)]
pub struct NonDatabaseFieldOptions {
    /// Human-readable name for the field.
    pub verbose_name: Option<String>,
    /// Rejected: a non-database field cannot be a primary key.
    pub primary_key: bool,
    /// Rejected: non-database fields are always blank.
    pub blank: bool,
    /// Rejected: non-database fields are never editable.
    pub editable: bool,
    /// Rejected: there is no column to constrain.
    pub unique: bool,
}

/// A field that is attached to a model but never stored in the database.
///
/// # Examples
///
/// ```
/// use commonkit_db::fields::{FieldDef, FieldType, NonDatabaseField};
/// use commonkit_db::model::ModelMeta;
///
/// let mut meta = ModelMeta::new("shop", "product");
/// meta.add_field(FieldDef::new("name", FieldType::CharField));
/// NonDatabaseField::new().contribute_to_class(&mut meta, "display_name");
///
/// assert!(meta.get_private_field("display_name").is_some());
/// assert_eq!(meta.columns(), vec!["name"]);
/// ```
#[derive(Debug, Clone)]
pub struct NonDatabaseField {
    /// The attribute name, set by [`contribute_to_class`](Self::contribute_to_class).
    pub name: String,
    /// Same as `name`; kept for parity with concrete fields.
    pub attname: String,
    /// Label of the model this field was contributed to (`app_label.model_name`).
    pub model: Option<String>,
    /// Human-readable name for the field.
    pub verbose_name: Option<String>,
    /// Short description of what the field represents.
    pub description: String,
    /// Position in declaration order across all fields.
    pub creation_counter: u64,
}

impl Default for NonDatabaseField {
    fn default() -> Self {
        Self::new()
    }
}

impl NonDatabaseField {
    /// Non-database fields are never backed by a column.
    pub const CONCRETE: bool = false;
    /// Non-database fields are never edited through forms.
    pub const EDITABLE: bool = false;
    /// Non-database fields may always be blank.
    pub const BLANK: bool = true;
    /// Non-database fields carry no UNIQUE constraint.
    pub const UNIQUE: bool = false;
    /// Non-database fields are never relations.
    pub const IS_RELATION: bool = false;

    /// Creates an unbound non-database field.
    pub fn new() -> Self {
        Self {
            name: String::new(),
            attname: String::new(),
            model: None,
            verbose_name: None,
            description: "A field that's not stored in databases".to_string(),
            creation_counter: next_creation_counter(),
        }
    }

    /// Creates a field from options, rejecting every flag that only makes
    /// sense for a column-backed field.
    pub fn with_options(options: NonDatabaseFieldOptions) -> CommonkitResult<Self> {
        let passed: Vec<&str> = [
            ("primary_key", options.primary_key),
            ("blank", options.blank),
            ("editable", options.editable),
            ("unique", options.unique),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect();

        if !passed.is_empty() {
            return Err(ValidationError::new(
                format!("parameters [{}] not allowed in NonDatabaseField", passed.join(", ")),
                "invalid_parameters",
            )
            .into());
        }

        let mut field = Self::new();
        field.verbose_name = options.verbose_name;
        Ok(field)
    }

    /// Sets the description reported for this field.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Registers this field on `meta` as a private field named `name`.
    ///
    /// No column is added to the model.
    pub fn contribute_to_class(mut self, meta: &mut crate::model::ModelMeta, name: &str) {
        self.bind(meta, name);
        meta.add_private_field(self);
    }

    pub(crate) fn bind(&mut self, meta: &crate::model::ModelMeta, name: &str) {
        self.name = name.to_string();
        self.attname = name.to_string();
        self.model = Some(meta.label());
        tracing::debug!(model = %meta.label(), field = name, "contributing non-database field");
    }

    /// Returns the value unchanged; there is nothing to clean.
    pub fn clean(&self, value: Value) -> Value {
        value
    }
}

impl PartialEq for NonDatabaseField {
    fn eq(&self, other: &Self) -> bool {
        self.creation_counter == other.creation_counter
    }
}

impl Eq for NonDatabaseField {}

impl Hash for NonDatabaseField {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.creation_counter.hash(state);
    }
}

impl PartialOrd for NonDatabaseField {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NonDatabaseField {
    fn cmp(&self, other: &Self) -> Ordering {
        self.creation_counter.cmp(&other.creation_counter)
    }
}

impl PartialEq<FieldDef> for NonDatabaseField {
    fn eq(&self, other: &FieldDef) -> bool {
        self.creation_counter == other.creation_counter
    }
}

impl PartialOrd<FieldDef> for NonDatabaseField {
    fn partial_cmp(&self, other: &FieldDef) -> Option<Ordering> {
        Some(self.creation_counter.cmp(&other.creation_counter))
    }
}
