//! Common configuration types for AAA components.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default log filter when neither `LOG_LEVEL` nor `RUST_LOG` is set
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    pub log_level: String,
    /// Enable JSON-formatted logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }
}

impl ObservabilityConfig {
    /// Read `LOG_LEVEL` and `JSON_LOGS` from a variable map.
    ///
    /// `JSON_LOGS` is enabled by `true`/`1` (case-insensitive); anything
    /// else, including absence, keeps plain-text logs.
    #[must_use]
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let log_level = vars
            .get("LOG_LEVEL")
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let json_logs = vars
            .get("JSON_LOGS")
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");

        Self {
            log_level,
            json_logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = ObservabilityConfig::from_vars(&HashMap::new());
        assert_eq!(config, ObservabilityConfig::default());
    }

    #[test]
    fn test_reads_level_and_json_flag() {
        let vars = HashMap::from([
            ("LOG_LEVEL".to_string(), "aaa_service=debug".to_string()),
            ("JSON_LOGS".to_string(), "TRUE".to_string()),
        ]);

        let config = ObservabilityConfig::from_vars(&vars);
        assert_eq!(config.log_level, "aaa_service=debug");
        assert!(config.json_logs);
    }

    #[test]
    fn test_blank_level_falls_back_to_default() {
        let vars = HashMap::from([
            ("LOG_LEVEL".to_string(), "  ".to_string()),
            ("JSON_LOGS".to_string(), "yes".to_string()),
        ]);

        let config = ObservabilityConfig::from_vars(&vars);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(!config.json_logs);
    }
}
