//! User-supplied engine definitions.
//!
//! # Example
//!
//! ```yaml
//! # ~/.config/lazycph/engines.yaml
//! engines:
//!   - extension: .go
//!     command: "go build -o {temp} {file}"
//!     mode: compiled
//!   - extension: .js
//!     command: "node {file}"
//!     mode: interpreted
//! ```

use crate::engine::{Engine, Mode};
use crate::registry::EngineRegistry;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EnginesFile {
    #[serde(default)]
    pub engines: Vec<EngineSpec>,
}

/// One entry: which extension, which command, which mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineSpec {
    pub extension: String,
    pub command: String,
    pub mode: Mode,
}

impl EngineSpec {
    pub fn to_engine(&self) -> Result<Engine> {
        Engine::new(&self.command, self.mode).with_context(|| {
            format!(
                "Invalid {} engine for '{}': {}",
                self.mode.as_str(),
                self.extension,
                self.command
            )
        })
    }
}

impl EnginesFile {
    pub fn parse(content: &str) -> Result<Self> {
        // An empty document is an empty file, not a type error.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Failed to parse engines file")
    }

    /// Read `path`. A missing file yields no engines.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No engines file");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read engines file: {}", path.display()))
            }
        };
        Self::parse(&content)
            .with_context(|| format!("Failed to load engines file: {}", path.display()))
    }

    /// Validate every entry. One bad entry fails the whole file.
    pub fn to_engines(&self) -> Result<Vec<(String, Engine)>> {
        self.engines
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let engine = spec
                    .to_engine()
                    .with_context(|| format!("engines[{}]", i))?;
                Ok((spec.extension.clone(), engine))
            })
            .collect()
    }
}

impl EngineRegistry {
    /// Register every engine from the file at `path` over the current ones.
    /// Nothing is registered if any entry is invalid.
    pub fn load_overrides(&mut self, path: &Path) -> Result<usize> {
        let engines = EnginesFile::load_from_file(path)?
            .to_engines()
            .with_context(|| format!("Invalid engines file: {}", path.display()))?;
        let count = engines.len();
        for (extension, engine) in engines {
            self.register(&extension, engine);
        }
        if count > 0 {
            tracing::info!(path = %path.display(), count, "Loaded engines file");
        }
        Ok(count)
    }
}
