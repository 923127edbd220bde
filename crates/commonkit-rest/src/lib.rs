//! # commonkit-rest
//!
//! A small serializer layer and the serializer variants built on it.
//!
//! ## Modules
//!
//! - [`context`] - Serializer context and the representation [`Scope`](context::Scope)
//! - [`fields`] - The [`Field`] trait and primitive fields
//! - [`serializer`] - [`Serializer`], its builder and [`SerializerClass`]
//! - [`list`] - [`ListSerializer`]
//! - [`enums`] - [`EnumSerializer`], the [`Choices`](enums::Choices) trait and [`choices!`]
//! - [`recursive`] - [`RecursiveSerializer`]
//! - [`io`] - [`IoSerializer`], the split input/output serializer
//! - [`table`] - [`TableUploadField`] and its format handlers
//! - [`base64_field`] - [`Base64Field`]
//! - [`obfuscated`] - Output-masking char and email fields
//! - [`renderers`] - The [`Renderer`](renderers::Renderer) trait and [`JsonRenderer`]

pub mod base64_field;
pub mod context;
pub mod enums;
pub mod fields;
pub mod io;
pub mod list;
pub mod obfuscated;
pub mod recursive;
pub mod renderers;
pub mod serializer;
pub mod table;

pub use base64_field::Base64Field;
pub use context::{RowContext, Scope, SerializerContext};
pub use enums::{ChoiceValue, Choices, EnumDef, EnumMember, EnumSerializer};
pub use fields::{
    Binding, CharField, EmailField, Field, FieldExt, FieldOptions, Input, IntegerField, Validated,
    ValidatedData,
};
pub use io::IoSerializer;
pub use list::ListSerializer;
pub use obfuscated::{ObfuscatedCharField, ObfuscatedEmailField};
pub use recursive::RecursiveSerializer;
pub use renderers::{JsonRenderer, Renderer, RendererContext};
pub use serializer::{
    CreateHook, RowValidator, Serializer, SerializerBuilder, SerializerClass, UpdateHook,
};
pub use table::{FormatHandler, HandlerRegistry, Row, RowValidatorSpec, Table, TableUploadField};
