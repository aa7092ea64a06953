//! Validate command

use clap::Args;
use tracing::debug;

use clusterspec_common::{pipeline, SetDefaults};

use super::{print_errors, InputArgs, Report, ReportFormat};
use crate::loader;
use crate::{Error, Result};

/// Apply defaults to a cluster document and report every violation
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Report format
    #[arg(short, long, value_enum, default_value_t, env = "CLUSTERSPEC_OUTPUT")]
    pub output: ReportFormat,

    /// Validate the document as written, without filling defaults first
    #[arg(long)]
    pub no_defaults: bool,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let mut document = loader::load_file(&args.input.file)?;
    if args.no_defaults {
        debug!("skipping defaults");
    } else {
        document.spec_mut().set_defaults();
    }

    let errors = pipeline::validate(document.spec());
    match args.output {
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&Report::new(&errors))?);
        }
        ReportFormat::Text if errors.is_empty() => {
            println!("{} is valid", args.input.file.display());
        }
        ReportFormat::Text => print_errors(&errors),
    }

    if errors.has_errors() {
        return Err(Error::Rejected(errors.len()));
    }
    Ok(())
}
