//! Logging utilities and severity-tagged diagnostic output
//!
//! Everything in the crate logs through the `log` facade. The binary installs
//! `env_logger` through [`init`], which colors each record by severity when
//! diagnostics are enabled and turns logging off entirely otherwise.

use std::io::Write;

use log::{Level, LevelFilter};

use crate::core::config::BuildConfig;

/// ANSI escape that restores the default terminal color
pub const COLOR_RESET: &str = "\x1b[0;0m";

/// Severity attached to a diagnostic line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Diagnostic chatter
    Verbose,
    /// Informational message such as resource creation
    Info,
    /// Probably a bug, not necessarily an error
    Warning,
    /// Invalid behavior that may crash
    Error,
}

impl Severity {
    /// All severities, lowest first
    pub const ALL: [Self; 4] = [Self::Verbose, Self::Info, Self::Warning, Self::Error];

    /// The `log` level a line of this severity is emitted at
    pub const fn level(self) -> Level {
        match self {
            Self::Verbose => Level::Trace,
            Self::Info => Level::Info,
            Self::Warning => Level::Warn,
            Self::Error => Level::Error,
        }
    }

    /// Map a `log` level back to a severity; `Debug` counts as verbose
    pub const fn from_level(level: Level) -> Self {
        match level {
            Level::Trace | Level::Debug => Self::Verbose,
            Level::Info => Self::Info,
            Level::Warn => Self::Warning,
            Level::Error => Self::Error,
        }
    }

    /// Terminal color used as the presentation hint for this severity
    pub const fn color(self) -> &'static str {
        match self {
            Self::Verbose => "\x1b[90m",
            Self::Info => "\x1b[32m",
            Self::Warning => "\x1b[33m",
            Self::Error => "\x1b[31m",
        }
    }
}

/// Severity-tagged diagnostic writer
///
/// Disabled loggers drop every line, so release builds stay silent without
/// the call sites having to check anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Logger {
    enabled: bool,
}

impl Logger {
    /// Create a logger that is active only when diagnostics are enabled
    pub const fn new(build: &BuildConfig) -> Self {
        Self { enabled: build.validation_enabled }
    }

    /// A logger that never writes
    pub const fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Whether lines written through this logger reach the log backend
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Write one line of text at the given severity
    pub fn write(&self, severity: Severity, text: &str) {
        if !self.enabled {
            return;
        }
        log::log!(severity.level(), "{}", text);
    }
}

/// Filter the log backend should use for a given build configuration
pub const fn level_filter(build: &BuildConfig) -> LevelFilter {
    if build.validation_enabled {
        LevelFilter::Trace
    } else {
        LevelFilter::Off
    }
}

/// Initialize the logging system
///
/// `RUST_LOG` still narrows the output when diagnostics are on.
pub fn init(build: &BuildConfig) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level_filter(build));
    if build.validation_enabled {
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }
    }
    builder.format(|buf, record| {
        let severity = Severity::from_level(record.level());
        writeln!(buf, "{}{}{}", severity.color(), record.args(), COLOR_RESET)
    });
    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_colors() {
        assert_eq!(Severity::Verbose.color(), "\x1b[90m");
        assert_eq!(Severity::Info.color(), "\x1b[32m");
        assert_eq!(Severity::Warning.color(), "\x1b[33m");
        assert_eq!(Severity::Error.color(), "\x1b[31m");
    }

    #[test]
    fn test_severity_level_round_trip() {
        for severity in Severity::ALL {
            assert_eq!(Severity::from_level(severity.level()), severity);
        }
        assert_eq!(Severity::from_level(Level::Debug), Severity::Verbose);
    }

    #[test]
    fn test_logger_follows_build_config() {
        let debug = BuildConfig { validation_enabled: true };
        let release = BuildConfig { validation_enabled: false };

        assert!(Logger::new(&debug).is_enabled());
        assert!(!Logger::new(&release).is_enabled());
        assert!(!Logger::disabled().is_enabled());

        assert_eq!(level_filter(&debug), LevelFilter::Trace);
        assert_eq!(level_filter(&release), LevelFilter::Off);
    }

    #[test]
    fn test_disabled_logger_write_is_noop() {
        // Must not panic even with no backend installed
        Logger::disabled().write(Severity::Error, "dropped");
    }
}
