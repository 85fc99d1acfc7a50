//! # isoxsd CLI entry point
//!
//! Parses command-line arguments and dispatches to the subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use isoxsd_cli::convert::{ConvertArgs, run_convert};
use isoxsd_cli::schema::{SchemaArgs, run_schema};
use isoxsd_cli::validate::{ValidateArgs, run_validate};

/// ISO 20022 schema and message transcoder.
#[derive(Parser, Debug)]
#[command(name = "isoxsd", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Describe an XSD as schema-description JSON.
    Schema(SchemaArgs),

    /// Convert a JSON message instance to XML.
    Convert(ConvertArgs),

    /// Validate an XML message instance against an XSD.
    Validate(ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Schema(args) => run_schema(args),
        Commands::Convert(args) => run_convert(args),
        Commands::Validate(args) => run_validate(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
