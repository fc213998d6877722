//! Observability: tracing init and the JSONL audit log.
//!
//! Uses config::ObservabilityConfig for LAZYCPH_QUIET, LOG_LEVEL, LOG_JSON and AUDIT_LOG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

static AUDIT_PATH: Mutex<Option<String>> = Mutex::new(None);

/// Initialize tracing. Call once at process startup.
///
/// `RUST_LOG` wins over `LAZYCPH_LOG_LEVEL`. When LAZYCPH_QUIET=1 only WARN
/// and above are logged. Output goes to stderr so program output on stdout
/// stays clean.
pub fn init_tracing() {
    let cfg = crate::config::ObservabilityConfig::from_env();
    let level = if cfg.quiet {
        "lazycph=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
    };
}

fn get_audit_path() -> Option<String> {
    {
        let guard = AUDIT_PATH.lock().ok()?;
        if let Some(ref p) = *guard {
            return Some(p.clone());
        }
    }
    let path = crate::config::ObservabilityConfig::from_env().audit_log?;
    if let Some(parent) = Path::new(&path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    {
        let mut guard = AUDIT_PATH.lock().ok()?;
        *guard = Some(path.clone());
    }
    Some(path)
}

/// One `write_all` per record: O_APPEND keeps concurrent writers from
/// splitting each other's lines.
fn append_jsonl(path: &Path, record: &serde_json::Value) {
    let Ok(mut line) = serde_json::to_string(record) else {
        return;
    };
    line.push('\n');
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = f.write_all(line.as_bytes());
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn started_record(extension: &str, file: &str, cwd: &str) -> serde_json::Value {
    json!({
        "ts": timestamp(),
        "event": "execution_started",
        "extension": extension,
        "file": file,
        "cwd": cwd,
    })
}

fn completed_record(
    extension: &str,
    outcome: &str,
    duration_ms: u64,
    output_len: usize,
) -> serde_json::Value {
    json!({
        "ts": timestamp(),
        "event": "execution_completed",
        "extension": extension,
        "outcome": outcome,
        "success": outcome == "ok",
        "duration_ms": duration_ms,
        "output_len": output_len,
    })
}

/// Audit: execution_started (before the first phase spawns)
pub fn audit_execution_started(extension: &str, file: &str, cwd: &str) {
    if let Some(path) = get_audit_path() {
        append_jsonl(Path::new(&path), &started_record(extension, file, cwd));
    }
}

/// Audit: execution_completed. `outcome` is "ok" or a failure kind.
pub fn audit_execution_completed(
    extension: &str,
    outcome: &str,
    duration_ms: u64,
    output_len: usize,
) {
    if let Some(path) = get_audit_path() {
        append_jsonl(
            Path::new(&path),
            &completed_record(extension, outcome, duration_ms, output_len),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_jsonl_writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        append_jsonl(&path, &started_record(".py", "/tmp/a.py", "/tmp"));
        append_jsonl(&path, &completed_record(".py", "timeout", 5003, 0));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "execution_started");
        assert_eq!(first["extension"], ".py");

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["outcome"], "timeout");
        assert_eq!(second["success"], false);
        assert_eq!(second["duration_ms"], 5003);
    }

    #[test]
    fn test_concurrent_appends_keep_lines_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = std::sync::Arc::new(dir.path().join("audit.jsonl"));

        let writers: Vec<_> = (0..16)
            .map(|t| {
                let path = path.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        append_jsonl(&path, &completed_record(".cpp", "runtime", t * 1000 + i, 42));
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        let content = std::fs::read_to_string(path.as_ref()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 16 * 200);
        for line in lines {
            let record: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(record["event"], "execution_completed");
        }
    }
}
