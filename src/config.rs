//! Configuration for tracing behavior.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::command::InternalKeys;

/// Environment variable that switches instrumentation on.
pub const ENV_ENABLED: &str = "OTEL_RUST_INSTRUMENTATION_MONGODB_ENABLED";

/// Environment variable bounding the `db.statement` length in bytes.
pub const ENV_QUERY_TEXT_MAX_LENGTH: &str = "OTEL_RUST_INSTRUMENTATION_MONGODB_QUERY_TEXT_MAX_LENGTH";

static TRUTHY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*(1|true|yes|on)\s*$").unwrap());

static FALSY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*(0|false|no|off)?\s*$").unwrap());

/// Configuration options for command tracing.
///
/// The enable flag is decided once, when a [`crate::Tracer`] is built from
/// this config.
///
/// # Example
///
/// ```rust
/// use mongodb_tracing::TracingConfig;
/// use std::time::Duration;
///
/// let config = TracingConfig::default()
///     .with_enabled(true)
///     .with_slow_command_threshold(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Whether spans are created at all.
    /// Default: `false`
    pub enabled: bool,

    /// Whether literal values in statements are replaced by `"?"`.
    /// Used by [`crate::TracedExecutor`]; direct `in_span` callers pass their own.
    /// Default: `true`
    pub obfuscate: bool,

    /// Upper bound on the `db.statement` text, in bytes.
    /// Default: `None`
    pub max_statement_length: Option<usize>,

    /// Commands running longer than this are logged at WARN level.
    /// Default: 500ms
    pub slow_command_threshold: Duration,

    /// Database name used in span names.
    /// Default: `None`
    pub database_name: Option<String>,

    /// Keys dropped from statements at every depth.
    pub internal_keys: InternalKeys,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            obfuscate: true,
            max_statement_length: None,
            slow_command_threshold: Duration::from_millis(500),
            database_name: None,
            internal_keys: InternalKeys::default(),
        }
    }
}

impl TracingConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// Malformed values never fail: an unrecognized enable flag leaves
    /// tracing off and an unparseable length is ignored, both with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_ENABLED) {
            config.enabled = parse_flag(&raw).unwrap_or_else(|| {
                tracing::warn!(
                    variable = ENV_ENABLED,
                    value = %raw,
                    "Unrecognized flag value, command tracing stays disabled"
                );
                false
            });
        }

        if let Some(raw) = lookup(ENV_QUERY_TEXT_MAX_LENGTH) {
            match raw.trim().parse::<usize>() {
                Ok(max) => config.max_statement_length = Some(max),
                Err(e) => tracing::warn!(
                    variable = ENV_QUERY_TEXT_MAX_LENGTH,
                    value = %raw,
                    error = %e,
                    "Ignoring invalid statement length"
                ),
            }
        }

        config
    }

    /// Enable or disable span creation.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Enable or disable value obfuscation for wrapped executors.
    ///
    /// **Security Warning**: With obfuscation off, filter and update values
    /// from your application end up verbatim in your traces.
    pub fn with_obfuscation(mut self, obfuscate: bool) -> Self {
        self.obfuscate = obfuscate;
        self
    }

    /// Bound the `db.statement` text to `max` bytes.
    pub fn with_max_statement_length(mut self, max: usize) -> Self {
        self.max_statement_length = Some(max);
        self
    }

    /// Set the threshold for slow command warnings.
    pub fn with_slow_command_threshold(mut self, threshold: Duration) -> Self {
        self.slow_command_threshold = threshold;
        self
    }

    /// Set a database name to include in span names.
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    /// Replace the set of keys dropped from statements.
    pub fn with_internal_keys(mut self, keys: InternalKeys) -> Self {
        self.internal_keys = keys;
        self
    }

    /// Create a development-friendly configuration with full statements.
    ///
    /// **Warning**: Do not use in production as statements carry real values.
    pub fn development() -> Self {
        Self {
            enabled: true,
            obfuscate: false,
            slow_command_threshold: Duration::from_millis(100),
            ..Self::default()
        }
    }

    /// Create a production-safe configuration.
    pub fn production() -> Self {
        Self {
            enabled: true,
            obfuscate: true,
            max_statement_length: Some(4096),
            slow_command_threshold: Duration::from_secs(1),
            ..Self::default()
        }
    }
}

/// Interpret a boolean-like flag value.
///
/// Returns `None` when the value is neither truthy nor falsy. An empty value
/// counts as off.
pub fn parse_flag(value: &str) -> Option<bool> {
    if TRUTHY_REGEX.is_match(value) {
        Some(true)
    } else if FALSY_REGEX.is_match(value) {
        Some(false)
    } else {
        None
    }
}
