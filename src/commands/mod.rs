//! CLI commands

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use serde::Serialize;

use clusterspec_common::{FieldError, ValidationErrors};

pub mod crd;
pub mod defaults;
pub mod validate;

/// Input document shared by commands that read a cluster spec
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Cluster document (a `Cluster` resource or a bare spec)
    #[arg(short, long, env = "CLUSTERSPEC_FILE")]
    pub file: PathBuf,
}

/// Report format for validation results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// One `path: message` line per error (default)
    #[default]
    Text,
    /// JSON object with a `valid` flag and the error list
    Json,
}

/// Machine-readable validation report
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    /// True if no errors were found
    pub valid: bool,
    /// Every violation, in traversal order
    pub errors: Vec<&'a FieldError>,
}

impl<'a> Report<'a> {
    /// Build a report from a collector
    pub fn new(errors: &'a ValidationErrors) -> Self {
        Self {
            valid: errors.is_empty(),
            errors: errors.iter().collect(),
        }
    }
}

/// Print validation errors in text form on stderr
pub(crate) fn print_errors(errors: &ValidationErrors) {
    eprintln!("Validation errors ({}):", errors.len());
    for error in errors {
        eprintln!("  - {error}");
    }
}
