//! # commonkit-http
//!
//! The request/response pair the serializer and view-set layers work with.
//!
//! - [`request`] - [`HttpRequest`] with its builder and the authenticated user
//! - [`response`] - the unrendered [`Response`] and the rendered [`HttpResponse`]
//! - [`upload`] - [`UploadedFile`]

pub mod request;
pub mod response;
pub mod upload;

pub use request::{AuthUser, HttpRequest, HttpRequestBuilder};
pub use response::{HttpResponse, Response};
pub use upload::UploadedFile;
