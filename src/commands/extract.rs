//! # Extract Command Implementation
//!
//! The `extract` subcommand reconciles every compose manifest in the compose
//! folder with its dot-file, then writes the dot-files and the rewritten
//! manifests.
//!
//! All jobs are reconciled and staged before the first byte is written. A
//! conflict anywhere aborts the command with every file left as it was.

use anyhow::Result;
use clap::Args;

use extract_env::dotfile;
use extract_env::output::{OutputConfig, Tone};
use extract_env::pipeline;
use extract_env::report::RunReport;

use super::RunArgs;

/// Reconcile manifests with their dot-files and write the result
#[derive(Args, Debug)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Show what would change without writing anything
    #[arg(short, long)]
    pub dry_run: bool,

    /// Print every resulting dot-file with line numbers
    #[arg(long)]
    pub display: bool,

    /// Leave the compose manifests untouched
    #[arg(long)]
    pub no_update_compose: bool,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the `extract` command.
pub fn execute(args: ExtractArgs, output: &OutputConfig) -> Result<()> {
    let options = args.run.to_options(!args.no_update_compose)?;

    if !args.quiet && args.dry_run {
        println!(
            "{} {}",
            output.emoji("🔎", "[DRY RUN]"),
            output.paint(Tone::Heading, "Dry run, no files will be written")
        );
    }

    let outcome = pipeline::execute(&options)?;

    if args.display {
        for job in &outcome.jobs {
            println!("{}", output.paint(Tone::Heading, &job.job.dotfile.display().to_string()));
            print!("{}", output.paint(Tone::Muted, &dotfile::numbered(&job.dotfile_text)));
            for (path, text) in &job.updated_manifests {
                println!("{}", output.paint(Tone::Heading, &path.display().to_string()));
                print!("{}", output.paint(Tone::Muted, &dotfile::numbered(text)));
            }
        }
    }

    let report = RunReport::new(&outcome);
    if !args.quiet {
        print!("{}", report.render_text(output));
    }

    if args.dry_run {
        if !args.quiet {
            let changed = outcome.staged.changed();
            println!("\n{} {} file(s) would change", output.emoji("📝", "[PLAN]"), changed.len());
            for path in changed {
                println!("   {}", path.display());
            }
        }
        return Ok(());
    }

    let written = outcome.staged.commit()?;
    if !args.quiet {
        if written.is_empty() {
            println!(
                "\n{} {}",
                output.emoji("✅", "[OK]"),
                output.paint(Tone::Success, "Already up to date")
            );
        } else {
            println!(
                "\n{} {}",
                output.emoji("✅", "[OK]"),
                output.paint(Tone::Success, &format!("Wrote {} file(s)", written.len()))
            );
            for path in &written {
                println!("   {}", path.display());
            }
        }
    }
    Ok(())
}
