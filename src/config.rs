use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Search attempts per pass before the locator gives up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;
/// Wait between two searches of the same pass
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1500;
/// Wait between a page mutation and the pass it triggers
pub const DEFAULT_MUTATION_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_SEPARATOR: &str = "\n\n";
pub const DEFAULT_QUERY_LABEL: &str = "Query: ";
pub const DEFAULT_CARRY_MARKER: &str = "[Continue from previous session context]";

// ============ Engine Config ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub mutation_debounce_ms: u64,
    pub separator: String,
    pub query_label: String,
    pub carry_marker: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            mutation_debounce_ms: DEFAULT_MUTATION_DEBOUNCE_MS,
            separator: DEFAULT_SEPARATOR.to_string(),
            query_label: DEFAULT_QUERY_LABEL.to_string(),
            carry_marker: DEFAULT_CARRY_MARKER.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON document over the defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: EngineConfig = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// At least one search always runs
    fn normalized(mut self) -> Self {
        self.max_attempts = self.max_attempts.max(1);
        self
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn mutation_debounce(&self) -> Duration {
        Duration::from_millis(self.mutation_debounce_ms)
    }
}

// ============ Session Options ============

/// Where a session keeps its state on disk
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// SQLite file for saved profiles; in-memory when `None`
    pub database_path: Option<PathBuf>,
    /// Directory for daily log files; tracing-only when `None`
    pub log_dir: Option<PathBuf>,
    pub engine: EngineConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.max_attempts, 8);
        assert_eq!(config.retry_delay(), Duration::from_millis(1500));
        assert_eq!(config.mutation_debounce(), Duration::from_millis(1000));
        assert_eq!(config.separator, "\n\n");
        assert_eq!(config.query_label, "Query: ");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"max_attempts": 3, "query_label": "Q: "}"#).unwrap();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.query_label, "Q: ");
        assert_eq!(config.retry_delay_ms, DEFAULT_RETRY_DELAY_MS);
        assert_eq!(config.carry_marker, DEFAULT_CARRY_MARKER);
    }

    #[test]
    fn test_zero_attempts_is_raised_to_one() {
        let config = EngineConfig::from_json(r#"{"max_attempts": 0}"#).unwrap();
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(EngineConfig::from_json("{not json").is_err());
    }
}
