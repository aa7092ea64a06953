//! Defaults command
//!
//! Prints the fully defaulted document. Nothing is printed unless the
//! defaulted spec also passes validation; otherwise every error is carried
//! out in [`Error::Validation`](crate::Error::Validation).

use clap::{Args, ValueEnum};

use clusterspec_common::pipeline;

use super::InputArgs;
use crate::loader::{self, Document};
use crate::Result;

/// Print a cluster document with every default filled in
#[derive(Args, Debug)]
pub struct DefaultsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t, env = "CLUSTERSPEC_OUTPUT")]
    pub output: DocumentFormat,
}

/// Serialization format for documents
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum DocumentFormat {
    /// YAML (default)
    #[default]
    Yaml,
    /// Pretty-printed JSON
    Json,
}

pub fn run(args: DefaultsArgs) -> Result<()> {
    let mut document = loader::load_file(&args.input.file)?;
    pipeline::process(document.spec_mut())?;
    print!("{}", render(&document, args.output)?);
    Ok(())
}

/// Serialize a document in the requested format
pub fn render(document: &Document, format: DocumentFormat) -> Result<String> {
    Ok(match format {
        DocumentFormat::Yaml => serde_yaml::to_string(document)?,
        DocumentFormat::Json => format!("{}\n", serde_json::to_string_pretty(document)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterspec_common::SetDefaults;

    const SPEC: &str = r#"
hosts:
  - name: n1
    address: 10.0.0.1
kubernetes: {}
etcd: {}
network: {}
"#;

    #[test]
    fn rejected_spec_surfaces_every_field_error() {
        let mut document = loader::parse("hosts: []\nkubernetes: {}\netcd: {}\n").unwrap();
        let err: crate::Error = pipeline::process(document.spec_mut())
            .map_err(crate::Error::from)
            .unwrap_err();

        let crate::Error::Validation(inner) = &err else {
            panic!("expected a validation error, got {err:?}");
        };
        assert_eq!(inner.field_errors().len(), 2);
        let msg = err.to_string();
        assert!(msg.contains("spec.hosts: must contain at least one host"));
        assert!(msg.contains("spec.network: network section is required"));
    }

    #[test]
    fn yaml_output_reparses_to_the_same_spec() {
        let mut document = loader::parse(SPEC).unwrap();
        document.spec_mut().set_defaults();

        let rendered = render(&document, DocumentFormat::Yaml).unwrap();
        let reparsed = loader::parse(&rendered).unwrap();
        assert_eq!(reparsed, document);
    }

    #[test]
    fn json_output_carries_filled_defaults() {
        let mut document = loader::parse(SPEC).unwrap();
        document.spec_mut().set_defaults();

        let rendered = render(&document, DocumentFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["hosts"][0]["port"], 22);
        assert_eq!(value["hosts"][0]["user"], "root");
    }
}
