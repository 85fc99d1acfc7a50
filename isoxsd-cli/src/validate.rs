//! `isoxsd validate`: XML message instance against an XSD.

use anyhow::{Context, Result};
use clap::Args;
use isoxsd::message::SchemaValidator;
use std::path::PathBuf;

use crate::read_input;

/// Arguments of the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// XSD file.
    pub schema: PathBuf,

    /// XML message instance.
    pub instance: PathBuf,
}

/// Runs the `validate` subcommand.
///
/// # Returns
/// Exit code 0 if the instance is valid, 1 otherwise.
///
/// # Errors
/// Returns an error if a file cannot be read or the schema cannot be
/// compiled.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let xsd = read_input(&args.schema)?;
    let xml = read_input(&args.instance)?;

    let validator = SchemaValidator::new(&xsd)
        .with_context(|| format!("failed to compile {}", args.schema.display()))?;
    let outcome = validator.validate(&xml);

    if outcome.is_valid {
        println!("{}: valid", args.instance.display());
        Ok(0)
    } else {
        println!("{}: invalid: {}", args.instance.display(), outcome.message);
        Ok(1)
    }
}
