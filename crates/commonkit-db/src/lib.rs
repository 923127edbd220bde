//! # commonkit-db
//!
//! Model-side helpers: a backend-agnostic [`Value`](value::Value), lightweight
//! model metadata, fields that are never stored in the database, and a
//! [`MoneyField`](money::MoneyField) that exposes two concrete columns as one
//! [`Money`](money::Money) value.

pub mod fields;
pub mod model;
pub mod money;
pub mod value;

pub use fields::{FieldDef, FieldType, NonDatabaseField, NonDatabaseFieldOptions};
pub use model::{Model, ModelMeta};
pub use money::{Money, MoneyField, MoneyInput};
pub use value::Value;
