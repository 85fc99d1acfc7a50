//! `isoxsd schema`: XSD to schema-description JSON.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::{output_path, read_input, write_output};

/// Arguments of the `schema` subcommand.
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// XSD file to describe.
    pub input: PathBuf,

    /// Output file. Defaults to the input path with a `.json` extension.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the JSON on a single line.
    #[arg(long)]
    pub compact: bool,
}

/// Runs the `schema` subcommand.
///
/// # Errors
/// Returns an error if the schema cannot be read, compiled or described, or
/// the output cannot be written.
pub fn run_schema(args: &SchemaArgs) -> Result<u8> {
    let xsd = read_input(&args.input)?;
    let document = isoxsd::tree::build_schema_document(&xsd)
        .with_context(|| format!("failed to describe {}", args.input.display()))?;

    let json = if args.compact {
        document.to_json()?
    } else {
        document.to_json_pretty()?
    };

    let output = output_path(&args.input, args.output.as_deref(), "json");
    write_output(&output, &json)?;
    tracing::info!(output = %output.display(), "Schema description written");
    println!("{}", output.display());
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{NS, SCHEMA};
    use isoxsd::SchemaDocument;

    #[test]
    fn test_schema_writes_json_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("camt.000.001.01.xsd");
        std::fs::write(&input, SCHEMA).unwrap();

        let args = SchemaArgs {
            input: input.clone(),
            output: None,
            compact: false,
        };
        assert_eq!(run_schema(&args).unwrap(), 0);

        let json = std::fs::read_to_string(input.with_extension("json")).unwrap();
        assert!(json.contains('\n'));
        let document = SchemaDocument::from_json(&json).unwrap();
        assert_eq!(document.namespace.as_deref(), Some(NS));
        assert!(document.schema_element.find("Document/Amt").unwrap().is_currency);
    }

    #[test]
    fn test_schema_compact_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.xsd");
        let output = dir.path().join("out/description.json");
        std::fs::write(&input, SCHEMA).unwrap();

        let args = SchemaArgs {
            input,
            output: Some(output.clone()),
            compact: true,
        };
        run_schema(&args).unwrap();
        assert!(!std::fs::read_to_string(output).unwrap().contains('\n'));
    }

    #[test]
    fn test_schema_reports_malformed_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.xsd");
        std::fs::write(&input, r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#).unwrap();

        let args = SchemaArgs {
            input,
            output: None,
            compact: false,
        };
        let err = run_schema(&args).unwrap_err();
        assert!(format!("{err:#}").contains("broken.xsd"));
    }
}
