//! Judge verdicts for one test case.

use crate::error::ExecutionError;
use crate::ExecutionResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of checking one run against its expected output.
/// Serialized as the short code (`"CA"`, `"TLE"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Verdict {
    #[default]
    #[serde(rename = "PE")]
    Pending,
    #[serde(rename = "CA")]
    Correct,
    #[serde(rename = "WA")]
    Wrong,
    #[serde(rename = "CE")]
    CompilationError,
    #[serde(rename = "RE")]
    RuntimeError,
    #[serde(rename = "TLE")]
    TimeLimitExceeded,
    #[serde(rename = "XX")]
    UnknownError,
}

impl Verdict {
    pub const ALL: [Verdict; 7] = [
        Verdict::Pending,
        Verdict::Correct,
        Verdict::Wrong,
        Verdict::CompilationError,
        Verdict::RuntimeError,
        Verdict::TimeLimitExceeded,
        Verdict::UnknownError,
    ];

    /// Classify `result` against `expected`.
    pub fn judge(result: &ExecutionResult, expected: &str) -> Self {
        match result {
            Ok(output) if outputs_match(output, expected) => Verdict::Correct,
            Ok(_) => Verdict::Wrong,
            Err(ExecutionError::Compilation { .. }) => Verdict::CompilationError,
            Err(ExecutionError::Runtime { .. }) => Verdict::RuntimeError,
            Err(ExecutionError::Timeout { .. }) => Verdict::TimeLimitExceeded,
            Err(_) => Verdict::UnknownError,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Verdict::Pending => "PE",
            Verdict::Correct => "CA",
            Verdict::Wrong => "WA",
            Verdict::CompilationError => "CE",
            Verdict::RuntimeError => "RE",
            Verdict::TimeLimitExceeded => "TLE",
            Verdict::UnknownError => "XX",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.code() == code)
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Correct)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outputs match when their whitespace-separated tokens are equal, so
/// trailing newlines and spacing differences do not matter.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.split_whitespace().eq(expected.split_whitespace())
}

/// Text to show for a finished run.
pub fn display_output(result: &ExecutionResult) -> String {
    match result {
        Ok(output) => output.clone(),
        Err(ExecutionError::Timeout { .. }) => "Time Limit Exceeded".to_string(),
        Err(err) => err.to_string(),
    }
}
