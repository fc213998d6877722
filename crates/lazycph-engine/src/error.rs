//! Failure taxonomy shared by the engine and its consumers.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which phase of an invocation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Compile,
    Run,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Compile => "compile",
            Phase::Run => "run",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from parsing or rendering a command template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Empty command template")]
    Empty,

    #[error("Command template '{0}' has no {{file}} placeholder")]
    MissingFile(String),

    #[error("Command template '{template}' uses unknown placeholder '{{{name}}}'")]
    UnknownPlaceholder { template: String, name: String },

    #[error("Command template '{0}' uses {{temp}} but no temp path was given")]
    MissingTemp(String),

    #[error("Interpreted command template '{0}' must not use {{temp}}")]
    UnexpectedTemp(String),

    #[error("Compiled command template '{0}' has no {{temp}} placeholder")]
    MissingTempPlaceholder(String),
}

/// The toolchain program could not be started at all.
#[derive(Debug, Error)]
#[error("Failed to launch '{program}': {source}")]
pub struct LaunchError {
    pub program: String,
    #[source]
    pub source: std::io::Error,
}

/// A classified execution failure. Exactly one is produced per failed request.
///
/// Payloads are kept verbatim (never trimmed) so diagnostics survive intact.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Unsupported file type: {extension}")]
    UnsupportedExtension { extension: String },

    #[error("Invalid source file {}: {reason}", .path.display())]
    Validation { path: PathBuf, reason: String },

    #[error("CompilationError:\n{diagnostics}")]
    Compilation { diagnostics: String },

    #[error("Time Limit Exceeded ({phase} phase)")]
    Timeout { phase: Phase },

    #[error("Process exited with code {exit_code}\n{output}")]
    Runtime { exit_code: i32, output: String },

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("Cancelled during {phase} phase")]
    Cancelled { phase: Phase },

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

/// Payload-free classification of an [`ExecutionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    UnsupportedExtension,
    Validation,
    Compilation,
    Timeout,
    Runtime,
    Launch,
    Cancelled,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::UnsupportedExtension => "unsupported_extension",
            FailureKind::Validation => "validation",
            FailureKind::Compilation => "compilation",
            FailureKind::Timeout => "timeout",
            FailureKind::Runtime => "runtime",
            FailureKind::Launch => "launch",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ExecutionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExecutionError::UnsupportedExtension { .. } => FailureKind::UnsupportedExtension,
            ExecutionError::Validation { .. } => FailureKind::Validation,
            ExecutionError::Compilation { .. } => FailureKind::Compilation,
            ExecutionError::Timeout { .. } => FailureKind::Timeout,
            ExecutionError::Runtime { .. } => FailureKind::Runtime,
            ExecutionError::Launch(_) => FailureKind::Launch,
            ExecutionError::Cancelled { .. } => FailureKind::Cancelled,
            ExecutionError::Unknown(_) => FailureKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = ExecutionError::Runtime {
            exit_code: 3,
            output: "boom\n".into(),
        };
        assert_eq!(err.kind(), FailureKind::Runtime);
        assert_eq!(err.to_string(), "Process exited with code 3\nboom\n");

        let err = ExecutionError::Timeout { phase: Phase::Compile };
        assert_eq!(err.kind().as_str(), "timeout");
        assert!(err.to_string().contains("compile"));
    }

    #[test]
    fn test_compilation_keeps_diagnostics_verbatim() {
        let err = ExecutionError::Compilation {
            diagnostics: "  a.cpp:1:1: error: x\n\n".into(),
        };
        assert_eq!(err.to_string(), "CompilationError:\n  a.cpp:1:1: error: x\n\n");
    }

    #[test]
    fn test_launch_error_converts() {
        let launch = LaunchError {
            program: "g++".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let err: ExecutionError = launch.into();
        assert_eq!(err.kind(), FailureKind::Launch);
        assert!(err.to_string().contains("g++"));
    }

    #[test]
    fn test_template_error_messages() {
        let err = TemplateError::UnknownPlaceholder {
            template: "cc {src}".into(),
            name: "src".into(),
        };
        assert_eq!(
            err.to_string(),
            "Command template 'cc {src}' uses unknown placeholder '{src}'"
        );
    }
}
