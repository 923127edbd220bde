//! Settings for the commonkit utilities.
//!
//! This module provides the [`Settings`] struct, which holds the defaults the
//! fields, renderers and upload handlers fall back to, and [`LazySettings`], a
//! globally-accessible, lazily-initialized settings instance.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Defaults for obfuscated output fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObfuscationSettings {
    /// The replacement character.
    pub char: char,
    /// How many characters to mask.
    pub cutoff: i64,
    /// Mask the tail of the value (`true`) or its head (`false`).
    pub from_end: bool,
}

impl Default for ObfuscationSettings {
    fn default() -> Self {
        Self {
            char: '*',
            cutoff: 4,
            from_end: true,
        }
    }
}

/// Defaults for tabular uploads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Maximum accepted upload size in bytes.
    pub max_upload_size: usize,
    /// Field delimiter used by the built-in CSV handler.
    pub csv_delimiter: char,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_upload_size: 10 * 1024 * 1024,
            csv_delimiter: ',',
        }
    }
}

/// Renderer behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererSettings {
    /// Whether error payloads are reshaped into `field_errors`/`non_field_errors`.
    pub reshape_errors: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            reshape_errors: true,
        }
    }
}

/// The complete set of commonkit settings.
///
/// # Examples
///
/// ```
/// use commonkit_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.obfuscation.cutoff, 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug mode is enabled.
    pub debug: bool,
    /// The log level (e.g. "info", "debug", "warn").
    pub log_level: String,
    /// Obfuscated field defaults.
    pub obfuscation: ObfuscationSettings,
    /// Table upload defaults.
    pub upload: UploadSettings,
    /// JSON renderer behaviour.
    pub renderer: RendererSettings,
    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            obfuscation: ObfuscationSettings::default(),
            upload: UploadSettings::default(),
            renderer: RendererSettings::default(),
            extra: HashMap::new(),
        }
    }
}

impl Settings {
    /// Returns the configured global settings, or the defaults when
    /// [`SETTINGS`] has not been configured.
    pub fn current() -> &'static Self {
        static DEFAULTS: OnceLock<Settings> = OnceLock::new();
        SETTINGS
            .try_get()
            .unwrap_or_else(|| DEFAULTS.get_or_init(Self::default))
    }
}

/// A lazily-initialized, globally-accessible settings container.
///
/// Call [`configure`](LazySettings::configure) once at startup to set the
/// settings, then use [`get`](LazySettings::get) to access them.
///
/// # Panics
///
/// [`get`](LazySettings::get) panics if settings have not been configured.
/// [`configure`](LazySettings::configure) panics if called more than once.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Creates a new, unconfigured `LazySettings`.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Configures the global settings. Must be called exactly once.
    ///
    /// # Panics
    ///
    /// Panics if settings have already been configured.
    pub fn configure(&self, settings: Settings) {
        self.inner
            .set(settings)
            .expect("Settings have already been configured");
    }

    /// Returns a reference to the configured settings.
    ///
    /// # Panics
    ///
    /// Panics if settings have not been configured.
    pub fn get(&self) -> &Settings {
        self.inner
            .get()
            .expect("Settings have not been configured. Call SETTINGS.configure() first.")
    }

    /// Returns the configured settings, if any.
    pub fn try_get(&self) -> Option<&Settings> {
        self.inner.get()
    }

    /// Returns `true` if settings have been configured.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings instance.
pub static SETTINGS: LazySettings = LazySettings::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert!(s.debug);
        assert_eq!(s.log_level, "info");
        assert_eq!(s.obfuscation.char, '*');
        assert_eq!(s.obfuscation.cutoff, 4);
        assert!(s.obfuscation.from_end);
        assert_eq!(s.upload.csv_delimiter, ',');
        assert_eq!(s.upload.max_upload_size, 10 * 1024 * 1024);
        assert!(s.renderer.reshape_errors);
    }

    #[test]
    fn test_current_is_borrowed_not_rebuilt() {
        let first = Settings::current();
        let second = Settings::current();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.obfuscation.cutoff, second.obfuscation.cutoff);
    }

    #[test]
    fn test_lazy_settings_configure_and_get() {
        let lazy = LazySettings::new();
        assert!(!lazy.is_configured());
        assert!(lazy.try_get().is_none());

        let mut settings = Settings::default();
        settings.debug = false;
        settings.obfuscation.cutoff = 2;

        lazy.configure(settings);
        assert!(lazy.is_configured());
        assert!(!lazy.get().debug);
        assert_eq!(lazy.get().obfuscation.cutoff, 2);
    }

    #[test]
    #[should_panic(expected = "already been configured")]
    fn test_lazy_settings_double_configure_panics() {
        let lazy = LazySettings::new();
        lazy.configure(Settings::default());
        lazy.configure(Settings::default());
    }

    #[test]
    #[should_panic(expected = "not been configured")]
    fn test_lazy_settings_get_before_configure_panics() {
        let lazy = LazySettings::new();
        let _ = lazy.get();
    }
}
