//! Decoy catalog tool
//!
//! Checks type catalogs and renders proxy source for checking in ahead of
//! time.
//!
//! Usage:
//!   decoy check <catalog>...
//!   decoy list <catalog> [--output text|json]
//!   decoy render <catalog> --type <TYPE> [--name <PROXY>] [--override-constructor]

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Decoy - type catalogs and proxy source for runtime mocks
#[derive(Parser, Debug)]
#[command(name = "decoy")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate catalog files
    Check {
        /// Catalog files to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Output::Text)]
        output: Output,
    },
    /// Summarise the types in a catalog
    List {
        catalog: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Output::Text)]
        output: Output,
    },
    /// Print the Rust proxy source for one type
    Render {
        catalog: PathBuf,

        /// Type to render
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Proxy type name (defaults to Mock<Type>)
        #[arg(short, long)]
        name: Option<String>,

        /// Build the real base instance without constructor parameters
        #[arg(long)]
        override_constructor: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    Text,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{RED}{BOLD}error:{RESET} {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Check { paths, output } => {
            let reports = commands::check(&paths);
            let failed = reports.iter().any(|r| !r.is_ok());
            match output {
                Output::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
                Output::Text => {
                    for report in &reports {
                        if report.is_ok() {
                            println!(
                                "{GREEN}ok{RESET}    {} {DIM}({} types){RESET}",
                                report.file.display(),
                                report.types
                            );
                        } else {
                            println!("{RED}fail{RESET}  {}", report.file.display());
                            for problem in &report.problems {
                                println!("      {problem}");
                            }
                        }
                    }
                }
            }
            Ok(if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::List { catalog, output } => {
            print!("{}", commands::list(&catalog, output == Output::Json)?);
            if output == Output::Json {
                println!();
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Render {
            catalog,
            type_name,
            name,
            override_constructor,
        } => {
            print!(
                "{}",
                commands::render(&catalog, &type_name, name.as_deref(), override_constructor)?
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
