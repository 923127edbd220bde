//! # commonkit
//!
//! Extension utilities for Django-style REST services.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on
//! `commonkit` for everything, or on individual crates for finer-grained
//! control.
//!
//! ```
//! use commonkit::prelude::*;
//! use serde_json::json;
//!
//! let mut serializer = Serializer::builder("ContactSerializer")
//!     .field("email", ObfuscatedEmailField::new())
//!     .build(SerializerContext::new())
//!     .unwrap()
//!     .with_data(json!({"email": "johnsmith@example.com"}));
//! assert!(serializer.is_valid().unwrap());
//! ```

/// Errors, settings, logging and the obfuscator.
pub use commonkit_core as core;

/// Model field descriptors: `NonDatabaseField` and `MoneyField`.
#[cfg(feature = "db")]
pub use commonkit_db as db;

/// Requests, responses and uploaded files.
pub use commonkit_http as http;

/// Serializers, fields, table uploads and renderers.
pub use commonkit_rest as rest;

/// View-sets with per-action permissions.
#[cfg(feature = "views")]
pub use commonkit_views as views;

// Third-party re-exports
pub use async_trait::async_trait;
pub use serde_json;
pub use tracing;

/// The most commonly used types, for glob import.
pub mod prelude {
    pub use commonkit_core::{CommonkitError, CommonkitResult, Settings, ValidationError};
    pub use commonkit_http::{AuthUser, HttpRequest, HttpResponse, Response, UploadedFile};
    pub use commonkit_rest::{
        choices, Base64Field, CharField, Choices, EmailField, EnumSerializer, Field, FieldExt,
        IntegerField, IoSerializer, JsonRenderer, ListSerializer, ObfuscatedCharField,
        ObfuscatedEmailField, RecursiveSerializer, Renderer, RowValidatorSpec, Serializer,
        SerializerClass, SerializerContext, TableUploadField,
    };

    #[cfg(feature = "db")]
    pub use commonkit_db::{Model, MoneyField, NonDatabaseField};

    #[cfg(feature = "views")]
    pub use commonkit_views::{
        Action, AllowAny, GenericViewSet, IsAdminUser, IsAuthenticated,
        IsAuthenticatedOrReadOnly, ModelViewSet, Permission, PermissionClass,
    };
}
