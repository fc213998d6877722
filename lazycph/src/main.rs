mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use lazycph_core::observability;

fn main() -> Result<()> {
    observability::init_tracing();
    let cli = Cli::parse();

    let success = match cli.command {
        Commands::Run {
            file,
            input,
            timeout,
            compile_timeout,
            json,
        } => {
            let stdin = commands::read_input(input.as_deref())?;
            let registry = commands::load_registry(compile_timeout, timeout)?;
            commands::run::run_file(&registry, &file, &stdin, json)?
        }
        Commands::Judge {
            file,
            cases,
            timeout,
            compile_timeout,
            verbose,
        } => {
            let registry = commands::load_registry(compile_timeout, timeout)?;
            commands::judge::judge_file(registry, &file, &cases, verbose)?
        }
        Commands::Engines => {
            let registry = commands::load_registry(None, None)?;
            commands::engines::list_engines(&registry);
            true
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
