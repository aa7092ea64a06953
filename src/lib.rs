//! clusterspec CLI library

pub mod commands;
pub mod error;
pub mod loader;

pub use error::{Error, Result};

use clap::{Parser, Subcommand, ValueEnum};

/// clusterspec - fill defaults into and validate cluster deployment specs
#[derive(Parser, Debug)]
#[command(name = "clusterspec")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t, env = "CLUSTERSPEC_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines (default)
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fill defaults and report every validation error
    Validate(commands::validate::ValidateArgs),
    /// Print the fully defaulted document
    Defaults(commands::defaults::DefaultsArgs),
    /// Print the Cluster CustomResourceDefinition
    Crd(commands::crd::CrdArgs),
}

impl Cli {
    /// Run the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Validate(args) => commands::validate::run(args),
            Commands::Defaults(args) => commands::defaults::run(args),
            Commands::Crd(args) => commands::crd::run(args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_validate_with_json_output() {
        let cli = Cli::try_parse_from([
            "clusterspec",
            "--log-format",
            "json",
            "validate",
            "-f",
            "cluster.yaml",
            "-o",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.log_format, LogFormat::Json);
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.input.file.to_str(), Some("cluster.yaml"));
        assert_eq!(args.output, commands::ReportFormat::Json);
        assert!(!args.no_defaults);
    }

    #[test]
    fn defaults_output_is_yaml_unless_asked() {
        let cli = Cli::try_parse_from(["clusterspec", "defaults", "--file", "c.yaml"]).unwrap();
        let Commands::Defaults(args) = cli.command else {
            panic!("expected defaults");
        };
        assert_eq!(args.output, commands::defaults::DocumentFormat::Yaml);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
