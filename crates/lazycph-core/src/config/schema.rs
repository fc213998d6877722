//! Config structs grouped by concern, loaded from the environment.

use super::env_keys::{observability as obv_keys, paths as path_keys, timeouts as timeout_keys};
use super::loader::{env_bool, env_optional, env_secs};
use std::path::PathBuf;
use std::time::Duration;

/// Default compile phase deadline in seconds
pub const DEFAULT_COMPILE_TIMEOUT_SECS: u64 = 10;

/// Default run phase deadline in seconds
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 5;

/// Process-wide deadlines, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    pub compile_secs: u64,
    pub execution_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            compile_secs: DEFAULT_COMPILE_TIMEOUT_SECS,
            execution_secs: DEFAULT_EXECUTION_TIMEOUT_SECS,
        }
    }
}

impl TimeoutConfig {
    pub fn from_env() -> Self {
        Self {
            compile_secs: env_secs(
                timeout_keys::LAZYCPH_COMPILE_TIMEOUT_SECS,
                &[],
                DEFAULT_COMPILE_TIMEOUT_SECS,
            ),
            execution_secs: env_secs(
                timeout_keys::LAZYCPH_EXECUTION_TIMEOUT_SECS,
                timeout_keys::EXECUTION_TIMEOUT_ALIASES,
                DEFAULT_EXECUTION_TIMEOUT_SECS,
            ),
        }
    }

    /// Override with CLI parameters. Zero is ignored.
    pub fn with_cli_overrides(mut self, compile: Option<u64>, execution: Option<u64>) -> Self {
        if let Some(secs) = compile.filter(|s| *s > 0) {
            self.compile_secs = secs;
        }
        if let Some(secs) = execution.filter(|s| *s > 0) {
            self.execution_secs = secs;
        }
        self
    }

    pub fn compile(&self) -> Duration {
        Duration::from_secs(self.compile_secs)
    }

    pub fn execution(&self) -> Duration {
        Duration::from_secs(self.execution_secs)
    }
}

/// Engines file and temp artifact locations
#[derive(Debug, Clone)]
pub struct PathsConfig {
    /// Explicit `LAZYCPH_ENGINES_FILE`, else `<config_dir>/lazycph/engines.yaml`
    pub engines_file: Option<PathBuf>,
    /// Where temp executables go; `None` means `std::env::temp_dir()`
    pub temp_dir: Option<PathBuf>,
}

impl PathsConfig {
    pub fn from_env() -> Self {
        let engines_file = env_optional(path_keys::LAZYCPH_ENGINES_FILE, &[])
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join("lazycph").join("engines.yaml")));
        let temp_dir = env_optional(path_keys::LAZYCPH_TEMP_DIR, &[]).map(PathBuf::from);
        Self {
            engines_file,
            temp_dir,
        }
    }
}

/// Logging and audit configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        Self {
            quiet: env_bool(obv_keys::LAZYCPH_QUIET, &[], false),
            log_level: env_optional(obv_keys::LAZYCPH_LOG_LEVEL, &[])
                .unwrap_or_else(|| "lazycph=info".to_string()),
            log_json: env_bool(obv_keys::LAZYCPH_LOG_JSON, &[], false),
            audit_log: env_optional(obv_keys::LAZYCPH_AUDIT_LOG, &[]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let t = TimeoutConfig::default();
        assert_eq!(t.compile(), Duration::from_secs(10));
        assert_eq!(t.execution(), Duration::from_secs(5));
    }

    #[test]
    fn test_cli_overrides() {
        let t = TimeoutConfig::default().with_cli_overrides(Some(30), None);
        assert_eq!(t.compile_secs, 30);
        assert_eq!(t.execution_secs, DEFAULT_EXECUTION_TIMEOUT_SECS);

        let t = TimeoutConfig::default().with_cli_overrides(Some(0), Some(2));
        assert_eq!(t.compile_secs, DEFAULT_COMPILE_TIMEOUT_SECS);
        assert_eq!(t.execution_secs, 2);
    }
}
