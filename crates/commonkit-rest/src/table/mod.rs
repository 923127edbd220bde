//! Tabular uploads.
//!
//! - [`data`] - [`Table`] and [`Row`]
//! - [`handlers`] - the [`HandlerRegistry`] and the built-in decoders
//! - [`field`] - [`TableUploadField`] and row validation

pub mod data;
pub mod field;
pub mod handlers;

pub use data::{Row, Table};
pub use field::{validate_row_with_serializer, RowValidatorSpec, TableUploadField};
pub use handlers::{
    default_formats, read_csv, read_json, read_tsv, FormatHandler, HandlerError, HandlerRegistry,
    WILDCARD,
};
