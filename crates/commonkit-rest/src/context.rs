//! Serializer context and representation scope.

use std::collections::HashMap;
use std::sync::Arc;

use commonkit_http::HttpRequest;
use serde_json::Value as Json;

use crate::fields::Field;
use crate::table::{Row, Table};

/// The table row a row-level serializer is validating.
#[derive(Debug, Clone, PartialEq)]
pub struct RowContext {
    /// Zero-based index of the row in its table.
    pub index: usize,
    /// The row as it was when validation started.
    pub row: Row,
    /// The table the row belongs to, including replacements made for
    /// earlier rows.
    pub table: Arc<Table>,
}

/// Data shared by a serializer and every field bound under it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use commonkit_http::HttpRequest;
/// use commonkit_rest::SerializerContext;
///
/// let request = HttpRequest::builder().method(http::Method::POST).build();
/// let context = SerializerContext::new().with_request(Arc::new(request));
/// assert!(context.request().unwrap().is_write_method());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SerializerContext {
    request: Option<Arc<HttpRequest>>,
    row: Option<RowContext>,
    extra: HashMap<String, Json>,
}

impl SerializerContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the request being served.
    #[must_use]
    pub fn with_request(mut self, request: Arc<HttpRequest>) -> Self {
        self.request = Some(request);
        self
    }

    /// Attaches the table row being validated and its table.
    #[must_use]
    pub fn with_row(mut self, index: usize, row: Row, table: Arc<Table>) -> Self {
        self.row = Some(RowContext { index, row, table });
        self
    }

    /// Inserts an arbitrary value.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Json) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Returns the request, if one is bound.
    pub fn request(&self) -> Option<&HttpRequest> {
        self.request.as_deref()
    }

    /// Returns the shared handle to the request.
    pub fn request_arc(&self) -> Option<Arc<HttpRequest>> {
        self.request.clone()
    }

    /// Returns the row being validated, when inside a row serializer.
    pub const fn row(&self) -> Option<&RowContext> {
        self.row.as_ref()
    }

    /// Returns an extra value.
    pub fn get(&self, key: &str) -> Option<&Json> {
        self.extra.get(key)
    }
}

/// The chain of enclosing fields during validation or representation.
///
/// Every compound field hands its children a scope whose `parent` is itself,
/// so a field can reach the serializer it is nested in.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    /// The context of the outermost serializer.
    pub context: &'a SerializerContext,
    /// The enclosing field together with the scope it was called in.
    pub parent: Option<(&'a dyn Field, &'a Scope<'a>)>,
}

impl<'a> Scope<'a> {
    /// Creates the scope of an outermost serializer.
    pub const fn root(context: &'a SerializerContext) -> Self {
        Self {
            context,
            parent: None,
        }
    }

    /// Creates the scope handed to the children of `field`.
    pub fn child(field: &'a dyn Field, scope: &'a Scope<'a>) -> Self {
        Self {
            context: scope.context,
            parent: Some((field, scope)),
        }
    }

    /// Returns the enclosing field.
    pub fn parent_field(&self) -> Option<&'a dyn Field> {
        self.parent.map(|(field, _)| field)
    }

    /// Returns how many fields enclose this scope.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent;
        while let Some((_, scope)) = current {
            depth += 1;
            current = scope.parent;
        }
        depth
    }
}

impl std::fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("parent", &self.parent_field().map(Field::field_name))
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}
