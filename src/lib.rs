//! # topicbus
//!
//! An in-process publish/subscribe event bus.
//!
//! ## Architecture
//!
//! topicbus is organized as a workspace with multiple crates:
//!
//! 1. **topicbus-core** - The event bus, handlers, subscriptions, typed topics, errors
//! 2. **topicbus-settings** - Bus and logging settings, TOML/JSON persistence
//! 3. **topicbus** - This facade: re-exports and process setup
//!
//! ## Features
//!
//! - **Topic routing**: exact-match string topics, payload generic per bus
//! - **Identity-based removal**: disposers and `unsubscribe` by handler identity
//! - **Snapshot delivery**: synchronous, registration-ordered, re-entrant safe
//! - **Failure isolation**: handler errors and panics are reported, never propagated

use std::path::Path;

pub use topicbus_core::{
    emit, event_bus, init_event_bus, on_event, BusError, Envelope, EventBus, EventBusConfig,
    Handler, HandlerError, HandlerErrorKind, Result, Subscription, SubscriptionId,
    SubscriptionState, TypedTopic, MAX_TAP_CAPACITY,
};

pub use topicbus_settings::{
    BusSettings, LogFormat, LoggingSettings, Settings, SettingsError, SettingsResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging from settings
///
/// Sets up structured logging with:
/// - Console output in the configured format (pretty, compact or JSON)
/// - RUST_LOG environment variable support, plus configured directives
///
/// Returns `Ok(false)` when a global subscriber was already installed.
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<bool> {
    use tracing_subscriber::filter::Directive;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let mut env_filter = EnvFilter::from_default_env().add_directive(settings.level()?.into());
    for directive in &settings.directives {
        env_filter = env_filter.add_directive(directive.parse::<Directive>()?);
    }

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(settings.with_thread_ids)
        .with_thread_names(true)
        .with_line_number(settings.with_line_number);

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match settings.format {
        LogFormat::Pretty => registry.with(fmt_layer.pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt_layer.compact()).try_init(),
        LogFormat::Json => registry.with(fmt_layer.json()).try_init(),
    }
    .is_ok();

    Ok(installed)
}

/// Set up logging and the global event bus from settings
///
/// If the global bus was already created (for instance by an early call to
/// [`event_bus`]), its configuration is kept and a warning is logged.
pub fn init(settings: &Settings) -> anyhow::Result<&'static EventBus> {
    settings.validate()?;
    init_logging(&settings.logging)?;

    if init_event_bus(settings.bus_config()).is_err() {
        tracing::warn!("Global event bus already initialized, keeping its configuration");
    }
    tracing::info!("topicbus {} ready", VERSION);
    Ok(event_bus())
}

/// Load settings from `path` (or the default location) and call [`init`]
///
/// A missing file means default settings.
pub fn init_from_file(path: Option<&Path>) -> anyhow::Result<(Settings, &'static EventBus)> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Settings::default_path()?,
    };
    let settings = Settings::load_or_default(&path)?;
    let bus = init(&settings)?;
    Ok((settings, bus))
}
