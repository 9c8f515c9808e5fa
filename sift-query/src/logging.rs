//! Tracing bootstrap for Sift.
//!
//! The pipeline logs through the `tracing` macros: one `debug!` per token
//! decision, `warn!` for configuration errors and `trace!` for generated
//! joins. Applications that already install a subscriber need nothing from
//! this module. Others can call [`init`] with the `tracing-subscriber`
//! feature enabled.
//!
//! # Environment Variables
//!
//! - `SIFT_DEBUG=true|1|yes` - enable debug logging
//! - `SIFT_LOG_LEVEL=trace|debug|info|warn|error` - set the level explicitly
//! - `SIFT_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! ```rust,no_run
//! use sift_query::logging;
//!
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }
}

/// Logging settings derived from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Whether anything was requested at all.
    pub enabled: bool,
    /// Level directive applied to the Sift crates.
    pub level: &'static str,
    /// Output format.
    pub format: LogFormat,
}

impl LogSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let debug = lookup("SIFT_DEBUG")
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"));
        let explicit = lookup("SIFT_LOG_LEVEL");
        let fallback = if debug { "debug" } else { "warn" };
        let level = match explicit.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => fallback,
        };
        Self {
            enabled: debug || explicit.is_some(),
            level,
            format: lookup("SIFT_LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or_default(),
        }
    }

    /// `EnvFilter` directive for the Sift crates.
    pub fn directive(&self) -> String {
        ["sift", "sift_query", "sift_axum"]
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn level_enables_debug(&self) -> bool {
        self.enabled && matches!(self.level, "debug" | "trace")
    }
}

/// Check if debug logging is enabled via `SIFT_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    LogSettings::from_env().level_enables_debug()
}

/// Install a global subscriber according to [`LogSettings::from_env`].
///
/// Does nothing when no variable requests logging, when the
/// `tracing-subscriber` feature is off, or after the first call.
pub fn init() {
    INIT.call_once(|| {
        let settings = LogSettings::from_env();
        if !settings.enabled {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter =
                EnvFilter::try_new(settings.directive()).unwrap_or_else(|_| EnvFilter::new("warn"));
            let registry = tracing_subscriber::registry().with(filter);
            let installed = match settings.format {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };
            if installed.is_ok() {
                tracing::info!(level = settings.level, format = ?settings.format, "Sift logging initialized");
            }
        }
    });
}

/// Debug event emitted only when `SIFT_DEBUG` enables it at runtime.
#[macro_export]
macro_rules! sift_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_disabled_by_default() {
        let s = settings(&[]);
        assert!(!s.enabled);
        assert_eq!(s.level, "warn");
        assert_eq!(s.format, LogFormat::Json);
    }

    #[test]
    fn test_debug_flag() {
        let s = settings(&[("SIFT_DEBUG", "YES")]);
        assert!(s.enabled);
        assert_eq!(s.level, "debug");
        assert!(s.level_enables_debug());
    }

    #[test]
    fn test_explicit_level_and_format() {
        let s = settings(&[("SIFT_LOG_LEVEL", "Trace"), ("SIFT_LOG_FORMAT", "compact")]);
        assert_eq!(s.level, "trace");
        assert_eq!(s.format, LogFormat::Compact);
        assert_eq!(s.directive(), "sift=trace,sift_query=trace,sift_axum=trace");
    }

    #[test]
    fn test_unknown_level_falls_back() {
        let s = settings(&[("SIFT_LOG_LEVEL", "loud")]);
        assert!(s.enabled);
        assert_eq!(s.level, "warn");
        assert!(!s.level_enables_debug());
    }
}
