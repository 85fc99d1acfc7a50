//! `isoxsd convert`: JSON message instance to XML.

use anyhow::{Context, Result};
use clap::Args;
use isoxsd::message::{ConverterOptions, InstanceJsonToXml, XmlWriteOptions, extract_target_namespace};
use std::path::PathBuf;

use crate::{output_path, read_input, write_output};

/// Arguments of the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// JSON message instance.
    pub input: PathBuf,

    /// Namespace applied to every element.
    #[arg(short, long, conflicts_with = "schema")]
    pub namespace: Option<String>,

    /// Take the namespace from this schema's targetNamespace.
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Name of the root element wrapping several top-level members.
    #[arg(long, default_value = isoxsd::message::DEFAULT_ROOT_NAME)]
    pub root_name: String,

    /// Indent nested elements by this many spaces.
    #[arg(long)]
    pub indent: Option<usize>,

    /// Output file. Defaults to the input path with an `.xml` extension.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ConvertArgs {
    fn namespace(&self) -> Result<Option<String>> {
        match (&self.namespace, &self.schema) {
            (Some(ns), _) => Ok(Some(ns.clone())),
            (None, Some(schema)) => {
                let xsd = read_input(schema)?;
                let ns = extract_target_namespace(&xsd)
                    .with_context(|| format!("no target namespace in {}", schema.display()))?;
                Ok(Some(ns))
            }
            (None, None) => Ok(None),
        }
    }
}

/// Runs the `convert` subcommand.
///
/// # Errors
/// Returns an error if the input cannot be read or converted, or the output
/// cannot be written.
pub fn run_convert(args: &ConvertArgs) -> Result<u8> {
    let json = read_input(&args.input)?;

    let mut options = ConverterOptions::new().root_name(args.root_name.as_str());
    if let Some(ns) = args.namespace()? {
        options = options.namespace(ns);
    }
    let root = InstanceJsonToXml::new(options)
        .convert_document(&json)
        .with_context(|| format!("failed to convert {}", args.input.display()))?;

    let write_options = match args.indent {
        Some(width) => XmlWriteOptions::new().indent(width),
        None => XmlWriteOptions::new(),
    };
    let xml = root.to_xml_string_with(&write_options)?;

    let output = output_path(&args.input, args.output.as_deref(), "xml");
    write_output(&output, &xml)?;
    tracing::info!(output = %output.display(), "XML instance written");
    println!("{}", output.display());
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{INSTANCE, NS, SCHEMA};

    fn args(input: PathBuf) -> ConvertArgs {
        ConvertArgs {
            input,
            namespace: None,
            schema: None,
            root_name: "Document".to_string(),
            indent: None,
            output: None,
        }
    }

    #[test]
    fn test_convert_with_explicit_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("payment.json");
        std::fs::write(&input, INSTANCE).unwrap();

        let mut args = args(input.clone());
        args.namespace = Some(NS.to_string());
        assert_eq!(run_convert(&args).unwrap(), 0);

        let xml = std::fs::read_to_string(input.with_extension("xml")).unwrap();
        assert!(xml.contains(&format!(r#"<Document xmlns="{NS}">"#)));
        assert!(xml.contains(r#"<Amt Ccy="CHF">12.50</Amt>"#));
    }

    #[test]
    fn test_convert_takes_namespace_from_schema() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("payment.json");
        let schema = dir.path().join("camt.xsd");
        std::fs::write(&input, INSTANCE).unwrap();
        std::fs::write(&schema, SCHEMA).unwrap();

        let mut args = args(input);
        args.schema = Some(schema);
        assert_eq!(args.namespace().unwrap().as_deref(), Some(NS));
    }

    #[test]
    fn test_convert_rejects_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.json");
        std::fs::write(&input, "{}").unwrap();

        let err = run_convert(&args(input)).unwrap_err();
        assert!(format!("{err:#}").contains("empty input"));
    }
}
