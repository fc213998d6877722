//! `lazycph judge`: run every test case concurrently and grade each one.

use anyhow::Result;
use lazycph_engine::{display_output, EngineRegistry, ExecutionResult, RunHandle, Verdict};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One test case: stdin and the expected stdout.
#[derive(Debug, Clone)]
pub struct Case {
    pub input: String,
    pub expected: String,
}

#[derive(Debug)]
pub struct CaseReport {
    pub verdict: Verdict,
    pub result: ExecutionResult,
}

/// Read `[in, expected, in, expected, ...]` pairs from disk.
pub fn load_cases(paths: &[PathBuf]) -> Result<Vec<Case>> {
    paths
        .chunks(2)
        .map(|pair| -> Result<Case> {
            match pair {
                [input, expected] => Ok(Case {
                    input: super::read_file(input)?,
                    expected: super::read_file(expected)?,
                }),
                _ => anyhow::bail!("--case takes an input file and an expected-output file"),
            }
        })
        .collect()
}

/// Start every case at once, then collect reports in case order.
pub fn judge_cases(registry: &Arc<EngineRegistry>, file: &Path, cases: &[Case]) -> Vec<CaseReport> {
    let handles: Vec<RunHandle> = cases
        .iter()
        .map(|case| registry.spawn(file, case.input.clone()))
        .collect();

    handles
        .into_iter()
        .zip(cases)
        .map(|(handle, case)| {
            let result = handle.wait();
            let verdict = Verdict::judge(&result, &case.expected);
            CaseReport { verdict, result }
        })
        .collect()
}

pub fn judge_file(
    registry: EngineRegistry,
    file: &Path,
    case_paths: &[PathBuf],
    verbose: bool,
) -> Result<bool> {
    let cases = load_cases(case_paths)?;
    let registry = Arc::new(registry);
    let reports = judge_cases(&registry, file, &cases);

    for (i, report) in reports.iter().enumerate() {
        println!("Testcase {} ({})", i, report.verdict);
        if verbose {
            println!("{}", display_output(&report.result));
        }
    }

    let accepted = reports.iter().filter(|r| r.verdict.is_accepted()).count();
    tracing::info!(accepted, total = reports.len(), "Judging finished");
    Ok(accepted == reports.len())
}
