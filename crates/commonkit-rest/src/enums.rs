//! Enumerations and the serializer that maps member names to stored codes.
//!
//! An enumeration is either a Rust enum declared with [`choices!`] or an
//! [`EnumDef`] assembled at runtime. [`EnumSerializer`] accepts a member
//! label on input and stores the member's code; on output it turns the code
//! back into a label.
//!
//! ```
//! use commonkit_rest::{choices, EnumSerializer, Field, Input, Scope, SerializerContext};
//! use serde_json::json;
//!
//! choices! {
//!     pub enum Level: i64 {
//!         BEGINNER = 0,
//!         INTERMEDIATE = 1,
//!         ADVANCED = 2,
//!     }
//! }
//!
//! let level = EnumSerializer::of::<Level>().unwrap();
//! let context = SerializerContext::new();
//! let scope = Scope::root(&context);
//!
//! let stored = level.to_internal_value(Input::Json(&json!("ADVANCED")), &scope).unwrap();
//! assert_eq!(stored.to_json(), json!(2));
//! assert_eq!(level.to_representation(&json!(0), &scope).unwrap(), json!("BEGINNER"));
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use commonkit_core::{CommonkitError, CommonkitResult, ValidationError};
use serde_json::Value as Json;

use crate::context::Scope;
use crate::fields::{Field, FieldOptions, Input, Validated};

/// The stored code of an enumeration member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChoiceValue {
    /// An integer code.
    Int(i64),
    /// A text code.
    Text(String),
}

impl ChoiceValue {
    /// Converts the code to JSON.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Int(n) => Json::from(*n),
            Self::Text(s) => Json::String(s.clone()),
        }
    }

    /// Reads a code from JSON. Integral floats count as integers.
    pub fn from_json(value: &Json) -> Option<Self> {
        match value {
            Json::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Self::Int),
            Json::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ChoiceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ChoiceValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for ChoiceValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ChoiceValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A Rust enum whose members carry stored codes.
///
/// Usually implemented through [`choices!`].
pub trait Choices: Copy + 'static {
    /// The enumeration name used in messages.
    const NAME: &'static str;

    /// Every member in declaration order.
    fn members() -> &'static [Self];

    /// The member's name.
    fn name(self) -> &'static str;

    /// The member's stored code.
    fn value(self) -> ChoiceValue;
}

/// Declares a Rust enum implementing [`Choices`].
///
/// Use `i64` for integer codes and `&str` for text codes:
///
/// ```
/// use commonkit_rest::{choices, Choices, ChoiceValue};
///
/// choices! {
///     pub enum MilitaryStatus: &str {
///         EXEMPTED = "exempted",
///         SERVED = "served",
///         POSTPONED = "postponed",
///     }
/// }
///
/// assert_eq!(MilitaryStatus::SERVED.name(), "SERVED");
/// assert_eq!(MilitaryStatus::SERVED.value(), ChoiceValue::Text("served".into()));
/// assert_eq!(MilitaryStatus::members().len(), 3);
/// ```
#[macro_export]
macro_rules! choices {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: i64 { $($member:ident = $value:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(non_camel_case_types, clippy::upper_case_acronyms)]
        $vis enum $name {
            $($member),+
        }

        impl $crate::enums::Choices for $name {
            const NAME: &'static str = stringify!($name);

            fn members() -> &'static [Self] {
                &[$(Self::$member),+]
            }

            fn name(self) -> &'static str {
                match self {
                    $(Self::$member => stringify!($member)),+
                }
            }

            fn value(self) -> $crate::enums::ChoiceValue {
                match self {
                    $(Self::$member => $crate::enums::ChoiceValue::Int($value)),+
                }
            }
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: &str { $($member:ident = $value:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(non_camel_case_types, clippy::upper_case_acronyms)]
        $vis enum $name {
            $($member),+
        }

        impl $crate::enums::Choices for $name {
            const NAME: &'static str = stringify!($name);

            fn members() -> &'static [Self] {
                &[$(Self::$member),+]
            }

            fn name(self) -> &'static str {
                match self {
                    $(Self::$member => stringify!($member)),+
                }
            }

            fn value(self) -> $crate::enums::ChoiceValue {
                match self {
                    $(Self::$member => $crate::enums::ChoiceValue::Text(
                        ::std::string::String::from($value)
                    )),+
                }
            }
        }
    };
}

/// One member of an [`EnumDef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    /// The member name, e.g. `BEGINNER`.
    pub name: String,
    /// The stored code.
    pub value: ChoiceValue,
}

impl EnumMember {
    /// Returns the label used on output: the code for text codes, the name
    /// for integer codes.
    pub fn display(&self) -> &str {
        match &self.value {
            ChoiceValue::Text(code) => code,
            ChoiceValue::Int(_) => &self.name,
        }
    }
}

/// An enumeration definition: a name and its ordered members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    name: String,
    members: Vec<EnumMember>,
}

impl EnumDef {
    /// Builds a definition from `(name, code)` pairs.
    ///
    /// Fails with [`CommonkitError::ImproperlyConfigured`] when there are no
    /// members or when a name or code repeats.
    pub fn new<N, V>(
        name: impl Into<String>,
        members: impl IntoIterator<Item = (N, V)>,
    ) -> CommonkitResult<Self>
    where
        N: Into<String>,
        V: Into<ChoiceValue>,
    {
        let name = name.into();
        let members: Vec<EnumMember> = members
            .into_iter()
            .map(|(n, v)| EnumMember {
                name: n.into(),
                value: v.into(),
            })
            .collect();

        if members.is_empty() {
            return Err(CommonkitError::ImproperlyConfigured(format!(
                "enum {name} has no members"
            )));
        }
        let mut names = HashSet::new();
        let mut codes = HashSet::new();
        for member in &members {
            if !names.insert(member.name.as_str()) {
                return Err(CommonkitError::ImproperlyConfigured(format!(
                    "enum {name} declares member {} twice",
                    member.name
                )));
            }
            if !codes.insert(&member.value) {
                return Err(CommonkitError::ImproperlyConfigured(format!(
                    "enum {name} uses code {} for more than one member",
                    member.value
                )));
            }
        }

        Ok(Self { name, members })
    }

    /// Builds a definition from a [`Choices`] enum.
    pub fn of<C: Choices>() -> CommonkitResult<Self> {
        Self::new(
            C::NAME,
            C::members().iter().map(|m| (m.name(), m.value())),
        )
    }

    /// Returns the enumeration name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the members in declaration order.
    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    /// Finds a member by name or by display label.
    pub fn lookup(&self, label: &str) -> Option<&EnumMember> {
        self.members
            .iter()
            .find(|m| m.name == label)
            .or_else(|| self.members.iter().find(|m| m.display() == label))
    }

    /// Finds a member by stored code.
    pub fn by_value(&self, code: &ChoiceValue) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.value == *code)
    }
}

/// Maps member labels on input to stored codes, and back on output.
#[derive(Debug, Clone)]
pub struct EnumSerializer {
    options: FieldOptions,
    def: Arc<EnumDef>,
}

impl EnumSerializer {
    /// Creates a serializer for `def`.
    pub fn new(def: impl Into<Arc<EnumDef>>) -> Self {
        Self {
            options: FieldOptions::default(),
            def: def.into(),
        }
    }

    /// Creates a serializer for a [`Choices`] enum.
    pub fn of<C: Choices>() -> CommonkitResult<Self> {
        EnumDef::of::<C>().map(Self::new)
    }

    /// Returns the enumeration.
    pub fn definition(&self) -> &EnumDef {
        &self.def
    }

    /// Lists the labels this serializer produces, in member order.
    pub fn allowed_inputs(&self) -> Vec<&str> {
        self.def.members().iter().map(EnumMember::display).collect()
    }

    fn unknown_key(&self) -> ValidationError {
        ValidationError::new(
            format!(
                "non-existent key passed to EnumSerializer, available keys are [{}]",
                self.allowed_inputs().join(", ")
            ),
            "invalid_choice",
        )
    }
}

impl Field for EnumSerializer {
    fn class_name(&self) -> &str {
        "EnumSerializer"
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn to_internal_value(&self, data: Input<'_>, _scope: &Scope<'_>) -> CommonkitResult<Validated> {
        let Some(Json::String(label)) = data.as_json() else {
            return Err(self.unknown_key().into());
        };
        self.def
            .lookup(label)
            .map(|member| Validated::Json(member.value.to_json()))
            .ok_or_else(|| self.unknown_key().into())
    }

    fn to_representation(&self, value: &Json, _scope: &Scope<'_>) -> CommonkitResult<Json> {
        ChoiceValue::from_json(value)
            .and_then(|code| self.def.by_value(&code))
            .map(|member| Json::String(member.display().to_string()))
            .ok_or_else(|| {
                let code = ChoiceValue::from_json(value)
                    .map_or_else(|| value.to_string(), |c| c.to_string());
                ValidationError::new(
                    format!(
                        "code={code} has no corresponding value in enum {}",
                        self.def.name()
                    ),
                    "invalid_code",
                )
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SerializerContext;
    use serde_json::json;

    choices! {
        enum Level: i64 {
            BEGINNER = 0,
            INTERMEDIATE = 1,
            ADVANCED = 2,
        }
    }

    choices! {
        enum MilitaryStatus: &str {
            EXEMPTED = "exempted",
            SERVED = "served",
            POSTPONED = "postponed",
        }
    }

    fn input(field: &EnumSerializer, data: Json) -> CommonkitResult<Json> {
        let context = SerializerContext::new();
        field
            .to_internal_value(Input::Json(&data), &Scope::root(&context))
            .map(|v| v.to_json())
    }

    fn output(field: &EnumSerializer, data: Json) -> CommonkitResult<Json> {
        let context = SerializerContext::new();
        field.to_representation(&data, &Scope::root(&context))
    }

    #[test]
    fn test_integer_choices() {
        let level = EnumSerializer::of::<Level>().unwrap();
        assert_eq!(input(&level, json!("BEGINNER")).unwrap(), json!(0));
        assert_eq!(output(&level, json!(1)).unwrap(), json!("INTERMEDIATE"));
        assert_eq!(level.allowed_inputs(), vec!["BEGINNER", "INTERMEDIATE", "ADVANCED"]);
    }

    #[test]
    fn test_text_choices_use_the_code_as_label() {
        let status = EnumSerializer::of::<MilitaryStatus>().unwrap();
        assert_eq!(output(&status, json!("served")).unwrap(), json!("served"));
        assert_eq!(input(&status, json!("served")).unwrap(), json!("served"));
        assert_eq!(input(&status, json!("POSTPONED")).unwrap(), json!("postponed"));
        assert_eq!(status.allowed_inputs(), vec!["exempted", "served", "postponed"]);
    }

    #[test]
    fn test_unknown_label() {
        let level = EnumSerializer::of::<Level>().unwrap();
        let err = input(&level, json!("EXPERT")).unwrap_err();
        assert_eq!(
            err.as_validation().unwrap().message,
            "non-existent key passed to EnumSerializer, \
             available keys are [BEGINNER, INTERMEDIATE, ADVANCED]"
        );
        assert!(input(&level, json!(0)).is_err());
    }

    #[test]
    fn test_unknown_code() {
        let level = EnumSerializer::of::<Level>().unwrap();
        let err = output(&level, json!(9)).unwrap_err();
        assert_eq!(
            err.as_validation().unwrap().message,
            "code=9 has no corresponding value in enum Level"
        );
    }

    #[test]
    fn test_runtime_definitions_are_checked() {
        assert!(EnumDef::new("Empty", Vec::<(&str, i64)>::new()).is_err());
        assert!(EnumDef::new("Dup", [("A", 1), ("A", 2)]).is_err());
        assert!(EnumDef::new("Dup", [("A", 1), ("B", 1)]).is_err());
        let def = EnumDef::new("Size", [("S", "s"), ("M", "m")]).unwrap();
        assert_eq!(def.by_value(&"m".into()).unwrap().name, "M");
    }
}
