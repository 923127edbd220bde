//! Logging integration for commonkit.
//!
//! Provides a helper for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and a span constructor for
//! per-request work.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The log level is read from `settings.log_level`. In debug mode a pretty,
/// human-readable format is used; otherwise a structured JSON format.
/// Installing a subscriber twice is a no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for one view-set action.
///
/// # Examples
///
/// ```
/// use commonkit_core::logging::action_span;
///
/// let span = action_span("articles", "create");
/// let _guard = span.enter();
/// tracing::info!("handling request");
/// ```
pub fn action_span(basename: &str, action: &str) -> tracing::Span {
    tracing::info_span!("action", basename = basename, action = action)
}
