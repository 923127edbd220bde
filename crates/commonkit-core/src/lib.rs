//! # commonkit-core
//!
//! Core types for the commonkit utilities: the error hierarchy, settings and
//! their loaders, tracing setup, and small string helpers.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Kit-wide settings and the global settings container
//! - [`settings_loader`] - Loading settings from TOML, JSON and the environment
//! - [`logging`] - Tracing-based logging integration
//! - [`utils`] - String helpers such as the [`Obfuscator`](utils::Obfuscator)

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod utils;

// Re-export the most commonly used types at the crate root.
pub use error::{CommonkitError, CommonkitResult, ValidationError};
pub use settings::{Settings, SETTINGS};
