//! Extension → engine mapping and the top-level `execute` entry point.

use crate::cancel::CancelToken;
use crate::engine::{Engine, Invocation, Mode};
use crate::error::{ExecutionError, TemplateError};
use crate::handle::RunHandle;
use crate::process::ProcessRunner;
use crate::ExecutionResult;
use lazycph_core::config::{PathsConfig, TimeoutConfig};
use lazycph_core::observability;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Built-in toolchains: (extension, template, mode).
pub const DEFAULT_ENGINES: &[(&str, &str, Mode)] = &[
    (".py", "python3 {file}", Mode::Interpreted),
    (".cpp", "g++ {file} -o {temp} -std=c++17", Mode::Compiled),
    (".c", "gcc {file} -o {temp} -std=gnu17", Mode::Compiled),
    (".rs", "rustc {file} -o {temp}", Mode::Compiled),
];

/// Fixed mapping from file extension to engine, built once at startup and
/// passed by reference (or `Arc`) to whoever needs to run code.
#[derive(Debug, Clone)]
pub struct EngineRegistry {
    engines: BTreeMap<String, Engine>,
    timeouts: TimeoutConfig,
    temp_dir: PathBuf,
    runner: ProcessRunner,
}

impl EngineRegistry {
    /// Empty registry with the given deadlines.
    pub fn new(timeouts: TimeoutConfig) -> Self {
        Self {
            engines: BTreeMap::new(),
            timeouts,
            temp_dir: std::env::temp_dir(),
            runner: ProcessRunner::new(),
        }
    }

    /// Registry holding [`DEFAULT_ENGINES`].
    pub fn with_defaults(timeouts: TimeoutConfig) -> Self {
        let mut registry = Self::new(timeouts);
        for (extension, template, mode) in DEFAULT_ENGINES {
            match Engine::new(template, *mode) {
                Ok(engine) => registry.register(extension, engine),
                Err(e) => tracing::error!(extension, error = %e, "Invalid built-in engine"),
            }
        }
        registry
    }

    /// Defaults, then the engines file named by `paths` on top. A broken
    /// engines file is an error rather than a silent fallback.
    pub fn from_config(timeouts: TimeoutConfig, paths: &PathsConfig) -> anyhow::Result<Self> {
        let mut registry = Self::with_defaults(timeouts);
        if let Some(dir) = &paths.temp_dir {
            registry = registry.with_temp_dir(dir);
        }
        if let Some(file) = &paths.engines_file {
            registry.load_overrides(file)?;
        }
        Ok(registry)
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Add or replace the engine for `extension` (`cpp` and `.cpp` are the same key).
    pub fn register(&mut self, extension: &str, engine: Engine) {
        let key = normalize_extension(extension);
        tracing::debug!(
            extension = %key,
            mode = engine.mode().as_str(),
            template = %engine.template(),
            "Registered engine"
        );
        self.engines.insert(key, engine);
    }

    /// Parse and register in one step.
    pub fn register_template(
        &mut self,
        extension: &str,
        template: &str,
        mode: Mode,
    ) -> Result<(), TemplateError> {
        let engine = Engine::new(template, mode)?;
        self.register(extension, engine);
        Ok(())
    }

    pub fn timeouts(&self) -> TimeoutConfig {
        self.timeouts
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn get(&self, extension: &str) -> Option<&Engine> {
        self.engines.get(&normalize_extension(extension))
    }

    /// Engine for `file`, by its extension.
    pub fn resolve(&self, file: &Path) -> Option<&Engine> {
        self.get(&extension_of(file))
    }

    /// Registered extensions with their engines, sorted by extension.
    pub fn engines(&self) -> impl Iterator<Item = (&str, &Engine)> {
        self.engines.iter().map(|(ext, engine)| (ext.as_str(), engine))
    }

    pub fn extensions(&self) -> Vec<&str> {
        self.engines.keys().map(String::as_str).collect()
    }

    /// Run `file` against `stdin`: trimmed output, or a classified failure.
    pub fn execute(&self, file: &Path, stdin: &str) -> ExecutionResult {
        self.execute_with_cancel(file, stdin, &CancelToken::new())
    }

    /// Like [`execute`](Self::execute), but `cancel` can stop the run early.
    pub fn execute_with_cancel(
        &self,
        file: &Path,
        stdin: &str,
        cancel: &CancelToken,
    ) -> ExecutionResult {
        let extension = extension_of(file);
        let Some(engine) = self.engines.get(&extension) else {
            tracing::info!(file = %file.display(), extension = %extension, "No engine registered");
            return Err(ExecutionError::UnsupportedExtension { extension });
        };

        let cwd = file
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        observability::audit_execution_started(&extension, &file.to_string_lossy(), &cwd);
        tracing::info!(
            file = %file.display(),
            extension = %extension,
            mode = engine.mode().as_str(),
            "Execution start"
        );

        let start = Instant::now();
        let invocation = Invocation {
            runner: &self.runner,
            timeouts: self.timeouts,
            temp_dir: &self.temp_dir,
            cancel,
        };
        let result = engine.execute(file, stdin, &invocation);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(output) => {
                tracing::info!(extension = %extension, elapsed_ms, "Execution succeeded");
                observability::audit_execution_completed(&extension, "ok", elapsed_ms, output.len());
            }
            Err(err) => {
                let kind = err.kind();
                if matches!(err, ExecutionError::Unknown(_) | ExecutionError::Launch(_)) {
                    tracing::warn!(extension = %extension, kind = %kind, error = %err, "Execution failed");
                } else {
                    tracing::info!(extension = %extension, kind = %kind, elapsed_ms, "Execution failed");
                }
                observability::audit_execution_completed(&extension, kind.as_str(), elapsed_ms, 0);
            }
        }
        result
    }

    /// Run on a worker thread. The returned handle can be polled, waited on
    /// or cancelled; dropping it lets the run finish and clean up on its own.
    pub fn spawn(self: &Arc<Self>, file: impl Into<PathBuf>, stdin: impl Into<String>) -> RunHandle {
        let registry = Arc::clone(self);
        let file = file.into();
        let stdin = stdin.into();
        RunHandle::spawn(move |cancel| registry.execute_with_cancel(&file, &stdin, cancel))
    }
}

/// `.CPP`, `cpp` and `.cpp` all map to `.cpp`.
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().trim_start_matches('.');
    format!(".{}", trimmed.to_lowercase())
}

/// Normalized extension of `file`; files without one map to `.`.
pub fn extension_of(file: &Path) -> String {
    normalize_extension(
        &file
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn test_defaults() {
        let registry = EngineRegistry::with_defaults(TimeoutConfig::default());
        assert_eq!(registry.extensions(), vec![".c", ".cpp", ".py", ".rs"]);
        assert_eq!(registry.get(".py").unwrap().mode(), Mode::Interpreted);
        assert_eq!(registry.get("cpp").unwrap().mode(), Mode::Compiled);
        assert_eq!(
            registry.resolve(Path::new("/x/Main.RS")).unwrap().template().program(),
            "rustc"
        );
    }

    #[test]
    fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let engines = dir.path().join("engines.yaml");
        std::fs::write(
            &engines,
            "engines:\n  - extension: .js\n    command: \"node {file}\"\n    mode: interpreted\n",
        )
        .unwrap();
        let paths = PathsConfig {
            engines_file: Some(engines),
            temp_dir: Some(dir.path().join("artifacts")),
        };
        let registry = EngineRegistry::from_config(TimeoutConfig::default(), &paths).unwrap();
        assert_eq!(registry.extensions(), vec![".c", ".cpp", ".js", ".py", ".rs"]);
        assert_eq!(registry.temp_dir(), dir.path().join("artifacts"));

        let paths = PathsConfig {
            engines_file: Some(dir.path().join("missing.yaml")),
            temp_dir: None,
        };
        let registry = EngineRegistry::from_config(TimeoutConfig::default(), &paths).unwrap();
        assert_eq!(registry.extensions().len(), 4);
        assert_eq!(registry.temp_dir(), std::env::temp_dir());
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("cpp"), ".cpp");
        assert_eq!(normalize_extension(".CPP"), ".cpp");
        assert_eq!(normalize_extension(" .py "), ".py");
        assert_eq!(extension_of(Path::new("Makefile")), ".");
        assert_eq!(extension_of(Path::new("a.tar.gz")), ".gz");
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = EngineRegistry::with_defaults(TimeoutConfig::default());
        registry
            .register_template(".py", "pypy3 {file}", Mode::Interpreted)
            .unwrap();
        assert_eq!(registry.get(".py").unwrap().template().program(), "pypy3");
        assert_eq!(registry.extensions().len(), 4);

        let err = registry
            .register_template(".go", "go run {file}", Mode::Compiled)
            .unwrap_err();
        assert!(matches!(err, TemplateError::MissingTempPlaceholder(_)));
        assert!(registry.get(".go").is_none());
    }

    #[test]
    fn test_unsupported_extension_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "hi").unwrap();
        // .py maps to a program that does not exist; .txt must never reach it.
        let mut registry = EngineRegistry::new(TimeoutConfig::default());
        registry
            .register_template(".py", "lazycph-should-not-run {file}", Mode::Interpreted)
            .unwrap();

        match registry.execute(&file, "") {
            Err(ExecutionError::UnsupportedExtension { extension }) => assert_eq!(extension, ".txt"),
            other => panic!("expected unsupported extension, got {:?}", other),
        }
        let err = registry.execute(Path::new("no_extension"), "").unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnsupportedExtension);
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_routes_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.sh");
        std::fs::write(&file, "read x\necho \"got $x\"\n").unwrap();
        let mut registry = EngineRegistry::new(TimeoutConfig::default());
        registry
            .register_template("sh", "sh {file}", Mode::Interpreted)
            .unwrap();
        assert_eq!(registry.execute(&file, "5\n").unwrap(), "got 5");
    }

    #[cfg(unix)]
    #[test]
    fn test_concurrent_compiled_runs_use_distinct_artifacts() {
        use std::os::unix::fs::PermissionsExt;

        let src = tempfile::tempdir().unwrap();
        let artifacts = tempfile::tempdir().unwrap();
        let file = src.path().join("prog.sh");
        // Each run reports the path it was started from, i.e. its own artifact.
        std::fs::write(&file, "#!/bin/sh\nsleep 0.3\necho \"$0\"\n").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut registry =
            EngineRegistry::new(TimeoutConfig::default()).with_temp_dir(artifacts.path());
        registry
            .register_template(".sh", "cp {file} {temp}", Mode::Compiled)
            .unwrap();
        let registry = Arc::new(registry);

        let handles: Vec<RunHandle> = (0..4).map(|_| registry.spawn(&file, "")).collect();
        let outputs: Vec<String> = handles.into_iter().map(|h| h.wait().unwrap()).collect();

        let unique: std::collections::HashSet<&String> = outputs.iter().collect();
        assert_eq!(unique.len(), 4);
        for path in &outputs {
            assert!(Path::new(path).starts_with(artifacts.path()));
            assert!(!Path::new(path).exists());
        }
        assert_eq!(std::fs::read_dir(artifacts.path()).unwrap().count(), 0);
    }
}
