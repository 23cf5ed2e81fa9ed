//! # Core Module
//!
//! Shared configuration types read by every stage of the bootstrap
//! sequence.

pub mod config;

// Re-export commonly used config types
pub use config::{
    AppConfig,
    ApplicationDescriptor,
    BuildConfig,
    Config,
    ConfigError,
    Version,
    WindowConfig,
};
