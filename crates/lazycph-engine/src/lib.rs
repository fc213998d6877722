pub mod artifact;
pub mod cancel;
pub mod engine;
pub mod engines_file;
pub mod error;
pub mod handle;
pub mod process;
pub mod registry;
pub mod template;
pub mod verdict;

pub use artifact::TempArtifact;
pub use cancel::CancelToken;
pub use engine::{Engine, Mode};
pub use error::{ExecutionError, FailureKind, LaunchError, Phase, TemplateError};
pub use handle::RunHandle;
pub use process::{ProcessRunner, RunOutcome};
pub use registry::EngineRegistry;
pub use template::{CommandTemplate, RenderedCommand};
pub use verdict::{display_output, outputs_match, Verdict};

/// Result of one execution request: trimmed output or a classified failure.
pub type ExecutionResult = Result<String, ExecutionError>;
