//! # Check Command Implementation
//!
//! The `check` subcommand runs the full reconciliation and reports the
//! result without writing anything. It fails when the run itself fails
//! (conflicts included), and with `--strict` also when files would change or
//! when unused variables or unresolved references are found.

use anyhow::{bail, Result};
use clap::{Args, ValueEnum};

use extract_env::output::{OutputConfig, Tone};
use extract_env::pipeline;
use extract_env::report::RunReport;

use super::RunArgs;

/// Report format for `check`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Report what `extract` would change without writing anything
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: ReportFormat,

    /// Fail when files would change or warnings were found
    #[arg(long)]
    pub strict: bool,
}

/// Execute the `check` command.
pub fn execute(args: CheckArgs, output: &OutputConfig) -> Result<()> {
    let options = args.run.to_options(true)?;
    let outcome = pipeline::execute(&options)?;
    let report = RunReport::new(&outcome);

    match args.format {
        ReportFormat::Json => println!("{}", report.to_json()?),
        ReportFormat::Text => {
            print!("{}", report.render_text(output));
            if report.is_clean() {
                println!(
                    "\n{} {}",
                    output.emoji("✅", "[OK]"),
                    output.paint(Tone::Success, "Everything is reconciled")
                );
            } else {
                println!(
                    "\n{} {}",
                    output.emoji("📝", "[PLAN]"),
                    output.paint(Tone::Warning, "`extract` would change files")
                );
            }
        }
    }

    if args.strict {
        if !report.is_clean() {
            bail!("Files are not reconciled");
        }
        if report.has_warnings() {
            bail!("Unused variables or unresolved references found");
        }
    }
    Ok(())
}
