use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// lazycph - run and judge competitive programming solutions
#[derive(Parser, Debug)]
#[command(name = "lazycph")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a source file once and print its output
    Run {
        /// Source file; the engine is chosen by extension
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// File to feed on stdin. Use "-" to forward this process's stdin
        #[arg(long, short, value_name = "PATH")]
        input: Option<String>,

        /// Run-phase timeout in seconds (default: from env or 5)
        #[arg(long)]
        timeout: Option<u64>,

        /// Compile-phase timeout in seconds (default: from env or 10)
        #[arg(long)]
        compile_timeout: Option<u64>,

        /// Print the result as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Run a source file against test cases and print a verdict per case
    Judge {
        /// Source file; the engine is chosen by extension
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Input and expected-output files for one case (repeatable)
        #[arg(
            long = "case",
            num_args = 2,
            value_names = ["INPUT", "EXPECTED"],
            action = ArgAction::Append,
            required = true
        )]
        cases: Vec<PathBuf>,

        /// Run-phase timeout in seconds (default: from env or 5)
        #[arg(long)]
        timeout: Option<u64>,

        /// Compile-phase timeout in seconds (default: from env or 10)
        #[arg(long)]
        compile_timeout: Option<u64>,

        /// Also print each case's output
        #[arg(long, short, default_value = "false")]
        verbose: bool,
    },

    /// List registered engines and whether their toolchains are installed
    Engines,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_judge_cases_come_in_pairs() {
        let cli = Cli::try_parse_from([
            "lazycph", "judge", "a.py", "--case", "1.in", "1.out", "--case", "2.in", "2.out",
        ])
        .unwrap();
        match cli.command {
            Commands::Judge { cases, .. } => {
                assert_eq!(cases.len(), 4);
                assert_eq!(cases[2], PathBuf::from("2.in"));
            }
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["lazycph", "judge", "a.py", "--case", "1.in"]).is_err());
        assert!(Cli::try_parse_from(["lazycph", "judge", "a.py"]).is_err());
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from([
            "lazycph", "run", "main.cpp", "--input", "-", "--timeout", "2", "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                file,
                input,
                timeout,
                compile_timeout,
                json,
            } => {
                assert_eq!(file, PathBuf::from("main.cpp"));
                assert_eq!(input.as_deref(), Some("-"));
                assert_eq!(timeout, Some(2));
                assert_eq!(compile_timeout, None);
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
