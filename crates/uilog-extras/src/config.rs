//! Session configuration from environment variables.
//!
//! Reads a [`SessionConfig`] from `UILOG_*` variables (or any other prefix),
//! optionally loading a `.env` file first.
//!
//! | variable | field |
//! |---|---|
//! | `UILOG_API_URL` | `apiUrl` |
//! | `UILOG_API_HEADER` | `apiHeader` (JSON object) |
//! | `UILOG_MAX_LOG_SIZE` | `maxLogSize` |
//! | `UILOG_IDLE_TIME` | `idleTime` (ms) |
//! | `UILOG_SEND_DEBUG_LOG_TO_API` | `sendDebugLogToApi` |
//! | `UILOG_SEND_ERROR_LOG_TO_API` | `sendErrorLogToApi` |
//! | `UILOG_AUTO_CAPTURE_EVENTS` | `autoCaptureEvents` |
//! | `UILOG_AUTO_CAPTURE_API` | `autoCaptureAPI` |
//! | `UILOG_ENABLE_TIMESTAMPS` | `enableTimestamps` |
//!
//! # Example
//!
//! ```ignore
//! use uilog_extras::config::{load_dotenv, session_config_from_env};
//!
//! load_dotenv();
//! let config = session_config_from_env()?;
//! let logger = context.init(config)?;
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use uilog_core::SessionConfig;

/// Default variable prefix.
pub const DEFAULT_PREFIX: &str = "UILOG";

/// Error type for configuration loading failures.
#[derive(Debug)]
pub enum ConfigError {
    /// Environment variable deserialization failed.
    EnvyError(envy::Error),
    /// `API_HEADER` is not a JSON object of strings.
    InvalidHeader(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvyError(e) => write!(f, "Configuration error: {}", e),
            ConfigError::InvalidHeader(e) => write!(f, "Invalid API header: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::EnvyError(e) => Some(e),
            ConfigError::InvalidHeader(e) => Some(e),
        }
    }
}

impl From<envy::Error> for ConfigError {
    fn from(err: envy::Error) -> Self {
        ConfigError::EnvyError(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::InvalidHeader(err)
    }
}

#[derive(Debug, Default, Deserialize)]
struct EnvSessionConfig {
    api_url: Option<String>,
    api_header: Option<String>,
    max_log_size: Option<usize>,
    idle_time: Option<u64>,
    send_debug_log_to_api: Option<bool>,
    send_error_log_to_api: Option<bool>,
    auto_capture_events: Option<bool>,
    auto_capture_api: Option<bool>,
    enable_timestamps: Option<bool>,
}

impl EnvSessionConfig {
    fn into_session_config(self) -> Result<SessionConfig, ConfigError> {
        let mut config = SessionConfig::new();

        if let Some(url) = self.api_url {
            config = config.api_url(url);
        }
        if let Some(raw) = self.api_header.filter(|raw| !raw.trim().is_empty()) {
            let header: BTreeMap<String, String> = serde_json::from_str(&raw)?;
            config = config.api_header(header);
        }
        if let Some(size) = self.max_log_size {
            config = config.max_log_size(size);
        }
        if let Some(millis) = self.idle_time {
            config = config.idle_time_ms(millis);
        }
        if let Some(enabled) = self.send_debug_log_to_api {
            config = config.send_debug_log_to_api(enabled);
        }
        if let Some(enabled) = self.send_error_log_to_api {
            config = config.send_error_log_to_api(enabled);
        }
        if let Some(enabled) = self.auto_capture_events {
            config = config.auto_capture_events(enabled);
        }
        if let Some(enabled) = self.auto_capture_api {
            config = config.auto_capture_api(enabled);
        }
        if let Some(enabled) = self.enable_timestamps {
            config = config.enable_timestamps(enabled);
        }

        Ok(config)
    }
}

/// Read a session configuration from `UILOG_*` variables.
///
/// Unset variables keep their defaults.
///
/// # Errors
///
/// Returns an error if a variable has the wrong type or `UILOG_API_HEADER`
/// is not a JSON object of strings.
pub fn session_config_from_env() -> Result<SessionConfig, ConfigError> {
    session_config_from_env_prefixed(DEFAULT_PREFIX)
}

/// Read a session configuration from `<PREFIX>_*` variables.
///
/// # Errors
///
/// Same as [`session_config_from_env`].
pub fn session_config_from_env_prefixed(prefix: &str) -> Result<SessionConfig, ConfigError> {
    let raw: EnvSessionConfig = envy::prefixed(format!("{}_", prefix)).from_env()?;
    raw.into_session_config()
}

/// Load environment variables from a `.env` file.
///
/// Missing files are ignored and existing variables are not overridden.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Load environment variables from a specific file path.
pub fn load_dotenv_from<P: AsRef<std::path::Path>>(path: P) {
    let _ = dotenvy::from_path(path);
}

/// Get an environment variable with a default value.
pub fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable and parse it to a specific type.
///
/// # Example
///
/// ```ignore
/// use uilog_extras::config::env_parse;
///
/// let idle: u64 = env_parse("UILOG_IDLE_TIME").unwrap_or(30_000);
/// ```
pub fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serial_test::serial;
    use std::time::Duration;

    const VARS: [&str; 9] = [
        "API_URL",
        "API_HEADER",
        "MAX_LOG_SIZE",
        "IDLE_TIME",
        "SEND_DEBUG_LOG_TO_API",
        "SEND_ERROR_LOG_TO_API",
        "AUTO_CAPTURE_EVENTS",
        "AUTO_CAPTURE_API",
        "ENABLE_TIMESTAMPS",
    ];

    fn clear(prefix: &str) {
        for var in VARS {
            std::env::remove_var(format!("{}_{}", prefix, var));
        }
    }

    #[test]
    #[serial]
    fn test_empty_env_gives_defaults() {
        clear("UILOG");
        let config = session_config_from_env().unwrap().resolve();
        assert_eq!(config, SessionConfig::new().resolve());
    }

    #[test]
    #[serial]
    fn test_reads_all_fields() {
        clear("UILOG");
        std::env::set_var("UILOG_API_URL", "https://logs.example.com/ingest");
        std::env::set_var("UILOG_API_HEADER", r#"{"action":"audit","tenant":"acme"}"#);
        std::env::set_var("UILOG_MAX_LOG_SIZE", "50");
        std::env::set_var("UILOG_IDLE_TIME", "15000");
        std::env::set_var("UILOG_SEND_DEBUG_LOG_TO_API", "true");
        std::env::set_var("UILOG_SEND_ERROR_LOG_TO_API", "true");
        std::env::set_var("UILOG_AUTO_CAPTURE_EVENTS", "false");
        std::env::set_var("UILOG_AUTO_CAPTURE_API", "true");
        std::env::set_var("UILOG_ENABLE_TIMESTAMPS", "true");

        let config = session_config_from_env().unwrap().resolve();
        clear("UILOG");

        assert_eq!(config.api_url, "https://logs.example.com/ingest");
        assert_eq!(config.api_header["tenant"], "acme");
        assert_eq!(config.max_log_size, 50);
        assert_eq!(config.idle_time, Duration::from_millis(15_000));
        assert!(config.send_debug_log_to_api);
        assert!(config.send_error_log_to_api);
        assert!(!config.auto_capture_events);
        assert!(config.auto_capture_api);
        assert!(config.enable_timestamps);
    }

    #[test]
    #[serial]
    fn test_custom_prefix() {
        clear("CHECKOUT_LOG");
        std::env::set_var("CHECKOUT_LOG_MAX_LOG_SIZE", "5");

        let config = session_config_from_env_prefixed("CHECKOUT_LOG").unwrap().resolve();
        clear("CHECKOUT_LOG");
        assert_eq!(config.max_log_size, 5);
    }

    #[test]
    #[serial]
    fn test_invalid_header_is_an_error() {
        clear("UILOG");
        std::env::set_var("UILOG_API_HEADER", "not json");

        let result = session_config_from_env();
        clear("UILOG");
        assert!(matches!(result, Err(ConfigError::InvalidHeader(_))));
    }

    #[test]
    #[serial]
    fn test_invalid_number_is_an_error() {
        clear("UILOG");
        std::env::set_var("UILOG_MAX_LOG_SIZE", "lots");

        let result = session_config_from_env();
        clear("UILOG");
        assert!(matches!(result, Err(ConfigError::EnvyError(_))));
    }

    #[test]
    #[serial]
    fn test_env_helpers() {
        let var = "UILOG_TEST_ENV_HELPER";
        std::env::remove_var(var);
        assert_eq!(env_or(var, "fallback"), "fallback");
        assert_eq!(env_parse::<u32>(var), None);

        std::env::set_var(var, "42");
        assert_eq!(env_or(var, "fallback"), "42");
        assert_eq!(env_parse::<u32>(var), Some(42));
        std::env::remove_var(var);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_numeric_fields_round_trip(size in 1usize..10_000, idle in 1u64..600_000) {
            clear("PROP_UILOG");
            std::env::set_var("PROP_UILOG_MAX_LOG_SIZE", size.to_string());
            std::env::set_var("PROP_UILOG_IDLE_TIME", idle.to_string());

            let result = session_config_from_env_prefixed("PROP_UILOG");
            clear("PROP_UILOG");

            let config = result.unwrap().resolve();
            prop_assert_eq!(config.max_log_size, size);
            prop_assert_eq!(config.idle_time, Duration::from_millis(idle));
        }
    }
}
