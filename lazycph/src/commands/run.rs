//! `lazycph run`: execute once and print the output or the failure.

use anyhow::Result;
use lazycph_engine::{display_output, EngineRegistry, ExecutionResult};
use serde_json::{json, Value};
use std::path::Path;

pub fn run_file(registry: &EngineRegistry, file: &Path, stdin: &str, json_output: bool) -> Result<bool> {
    let result = registry.execute(file, stdin);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result_json(&result))?);
    } else {
        match &result {
            Ok(output) => println!("{}", output),
            Err(_) => eprintln!("{}", display_output(&result)),
        }
    }

    Ok(result.is_ok())
}

pub fn result_json(result: &ExecutionResult) -> Value {
    match result {
        Ok(output) => json!({ "ok": true, "output": output }),
        Err(err) => json!({
            "ok": false,
            "kind": err.kind().as_str(),
            "message": display_output(result),
        }),
    }
}
