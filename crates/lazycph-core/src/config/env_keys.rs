//! Environment variable keys.

/// Compile / execution deadlines
pub mod timeouts {
    /// Compile phase deadline in seconds (default 10).
    pub const LAZYCPH_COMPILE_TIMEOUT_SECS: &str = "LAZYCPH_COMPILE_TIMEOUT_SECS";
    /// Run phase deadline in seconds (default 5).
    pub const LAZYCPH_EXECUTION_TIMEOUT_SECS: &str = "LAZYCPH_EXECUTION_TIMEOUT_SECS";
    pub const EXECUTION_TIMEOUT_ALIASES: &[&str] = &["LAZYCPH_TIMEOUT_SECS"];
}

/// Engines file and temp artifacts
pub mod paths {
    pub const LAZYCPH_ENGINES_FILE: &str = "LAZYCPH_ENGINES_FILE";
    pub const LAZYCPH_TEMP_DIR: &str = "LAZYCPH_TEMP_DIR";
}

/// Observability and logging
pub mod observability {
    pub const LAZYCPH_QUIET: &str = "LAZYCPH_QUIET";
    pub const LAZYCPH_LOG_LEVEL: &str = "LAZYCPH_LOG_LEVEL";
    pub const LAZYCPH_LOG_JSON: &str = "LAZYCPH_LOG_JSON";
    pub const LAZYCPH_AUDIT_LOG: &str = "LAZYCPH_AUDIT_LOG";
}
