//! Toolchain adapters: run a source file directly, or compile then run it.

use crate::artifact::TempArtifact;
use crate::cancel::CancelToken;
use crate::error::{ExecutionError, Phase, TemplateError};
use crate::process::{ProcessRunner, RunOutcome};
use crate::template::{CommandTemplate, RenderedCommand};
use crate::ExecutionResult;
use lazycph_core::config::TimeoutConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Execution mode of an engine, as written in the engines file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Interpreted,
    Compiled,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Interpreted => "interpreted",
            Mode::Compiled => "compiled",
        }
    }
}

/// One toolchain. Immutable once built; shared read-only by every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Engine {
    /// Single phase: `{file}` is handed to an interpreter.
    Interpreted { template: CommandTemplate },
    /// Compile `{file}` into `{temp}`, then run `{temp}` directly.
    Compiled { template: CommandTemplate },
}

/// Everything an engine needs from its caller for one request.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub runner: &'a ProcessRunner,
    pub timeouts: TimeoutConfig,
    /// Directory for the compiled executable
    pub temp_dir: &'a Path,
    pub cancel: &'a CancelToken,
}

impl Engine {
    pub fn interpreted(template: &str) -> Result<Self, TemplateError> {
        Self::new(template, Mode::Interpreted)
    }

    pub fn compiled(template: &str) -> Result<Self, TemplateError> {
        Self::new(template, Mode::Compiled)
    }

    /// Parse `template` and check it against `mode`: `{temp}` is required
    /// for compiled engines and rejected for interpreted ones.
    pub fn new(template: &str, mode: Mode) -> Result<Self, TemplateError> {
        let template = CommandTemplate::parse(template)?;
        match mode {
            Mode::Interpreted if template.uses_temp() => {
                Err(TemplateError::UnexpectedTemp(template.as_str().to_string()))
            }
            Mode::Compiled if !template.uses_temp() => Err(
                TemplateError::MissingTempPlaceholder(template.as_str().to_string()),
            ),
            Mode::Interpreted => Ok(Engine::Interpreted { template }),
            Mode::Compiled => Ok(Engine::Compiled { template }),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Engine::Interpreted { .. } => Mode::Interpreted,
            Engine::Compiled { .. } => Mode::Compiled,
        }
    }

    pub fn template(&self) -> &CommandTemplate {
        match self {
            Engine::Interpreted { template } | Engine::Compiled { template } => template,
        }
    }

    /// Run `file` against `stdin`. Successful output is trimmed; failure
    /// payloads are returned verbatim.
    pub fn execute(&self, file: &Path, stdin: &str, inv: &Invocation<'_>) -> ExecutionResult {
        let source = validate_source(file)?;
        let cwd = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        match self {
            Engine::Interpreted { template } => {
                let command = render(template, &source, None)?;
                let outcome = inv.runner.run(
                    &command,
                    stdin,
                    inv.timeouts.execution(),
                    &cwd,
                    inv.cancel,
                )?;
                classify_run(outcome)
            }
            Engine::Compiled { template } => {
                // Released on drop, whichever way this arm is left.
                let artifact = TempArtifact::acquire_in(inv.temp_dir);

                let command = render(template, &source, Some(artifact.path()))?;
                let compiled = inv.runner.run(
                    &command,
                    "",
                    inv.timeouts.compile(),
                    &cwd,
                    inv.cancel,
                )?;
                match compiled {
                    RunOutcome::Exited { exit_code: 0, .. } => {}
                    RunOutcome::Exited { exit_code, output } => {
                        tracing::debug!(exit_code, "Compilation failed");
                        return Err(ExecutionError::Compilation {
                            diagnostics: output,
                        });
                    }
                    RunOutcome::TimedOut { .. } => {
                        return Err(ExecutionError::Timeout {
                            phase: Phase::Compile,
                        })
                    }
                    RunOutcome::Cancelled => {
                        return Err(ExecutionError::Cancelled {
                            phase: Phase::Compile,
                        })
                    }
                }

                if !artifact.path().is_file() {
                    return Err(ExecutionError::Unknown(format!(
                        "'{}' exited successfully but produced no executable at {}",
                        template.program(),
                        artifact.path().display()
                    )));
                }

                let run = RenderedCommand::Direct {
                    program: artifact.path().to_string_lossy().into_owned(),
                    args: Vec::new(),
                };
                let outcome =
                    inv.runner
                        .run(&run, stdin, inv.timeouts.execution(), &cwd, inv.cancel)?;
                classify_run(outcome)
            }
        }
    }
}

/// The source must exist and be a regular file. Returns its absolute path.
fn validate_source(file: &Path) -> Result<PathBuf, ExecutionError> {
    let invalid = |reason: &str| ExecutionError::Validation {
        path: file.to_path_buf(),
        reason: reason.to_string(),
    };
    let metadata = std::fs::metadata(file).map_err(|_| invalid("file does not exist"))?;
    if !metadata.is_file() {
        return Err(invalid("not a regular file"));
    }
    file.canonicalize()
        .map_err(|e| invalid(&format!("cannot resolve path: {}", e)))
}

fn render(
    template: &CommandTemplate,
    source: &Path,
    temp: Option<&Path>,
) -> Result<RenderedCommand, ExecutionError> {
    template
        .render(source, temp)
        .map_err(|e| ExecutionError::Unknown(e.to_string()))
}

fn classify_run(outcome: RunOutcome) -> ExecutionResult {
    match outcome {
        RunOutcome::Exited {
            exit_code: 0,
            output,
        } => Ok(output.trim().to_string()),
        RunOutcome::Exited { exit_code, output } => {
            Err(ExecutionError::Runtime { exit_code, output })
        }
        RunOutcome::TimedOut { .. } => Err(ExecutionError::Timeout { phase: Phase::Run }),
        RunOutcome::Cancelled => Err(ExecutionError::Cancelled { phase: Phase::Run }),
    }
}
