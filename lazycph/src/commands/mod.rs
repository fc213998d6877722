//! CLI subcommands. Each returns `Ok(true)` when the command succeeded and
//! `Ok(false)` when it ran but the solution failed (non-zero exit).

pub mod engines;
pub mod judge;
pub mod run;

use anyhow::{Context, Result};
use lazycph_core::config::{PathsConfig, TimeoutConfig};
use lazycph_engine::EngineRegistry;
use std::io::Read;
use std::path::Path;

/// Registry from config: env timeouts with CLI overrides, engines file on top
/// of the defaults.
pub fn load_registry(
    compile_timeout: Option<u64>,
    timeout: Option<u64>,
) -> Result<EngineRegistry> {
    let timeouts = TimeoutConfig::from_env().with_cli_overrides(compile_timeout, timeout);
    let paths = PathsConfig::from_env();
    tracing::debug!(
        compile_secs = timeouts.compile_secs,
        execution_secs = timeouts.execution_secs,
        engines_file = ?paths.engines_file,
        "Loading engines"
    );
    EngineRegistry::from_config(timeouts, &paths)
}

/// `None` is empty input, `-` is our own stdin, anything else is a file.
pub fn read_input(source: Option<&str>) -> Result<String> {
    match source {
        None => Ok(String::new()),
        Some("-") => {
            let mut s = String::new();
            std::io::stdin()
                .read_to_string(&mut s)
                .context("Failed to read stdin")?;
            Ok(s)
        }
        Some(path) => read_file(Path::new(path)),
    }
}

pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))
}
