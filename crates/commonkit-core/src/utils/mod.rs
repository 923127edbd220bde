//! String utilities shared by the commonkit fields.

pub mod obfuscator;

pub use obfuscator::{obfuscate, obfuscate_email, Obfuscator};
