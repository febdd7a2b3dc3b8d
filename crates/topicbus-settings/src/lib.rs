//! topicbus Settings Crate
//!
//! Handles bus and logging configuration and its persistence.

pub mod config;
pub mod error;

pub use config::{BusSettings, LogFormat, LoggingSettings, Settings};
pub use error::{SettingsError, SettingsResult};
