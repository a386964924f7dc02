//! # CLI Command Implementations
//!
//! One file per subcommand, each with an `Args` struct derived with `clap`
//! and an `execute` function. The folder and naming options shared by
//! `extract` and `check` live in [`RunArgs`] and are flattened into both.

pub mod check;
pub mod completions;
pub mod extract;

use std::path::PathBuf;

use clap::Args;

use extract_env::error::Error;
use extract_env::pipeline::RunOptions;
use extract_env::reconcile::{Mode, ReconcileConfig};

/// Where to look and how to key variables.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Folder holding the dot-file(s)
    #[arg(short = 'e', long, value_name = "DIR", default_value = ".")]
    pub env_folder: PathBuf,

    /// Base name of the dot-file; infixed manifests get `<name>.<infix>`
    #[arg(long, value_name = "NAME", default_value = ".env")]
    pub env_file_name: String,

    /// Folder holding the compose manifest(s)
    #[arg(short = 'c', long, value_name = "DIR", default_value = ".")]
    pub compose_folder: PathBuf,

    /// Scope every key by its service name
    #[arg(long)]
    pub split: bool,

    /// Prefix for generated keys
    #[arg(short, long, env = "EXTRACT_ENV_PREFIX", default_value = "")]
    pub prefix: String,

    /// Postfix for generated keys
    #[arg(long, env = "EXTRACT_ENV_POSTFIX", default_value = "")]
    pub postfix: String,

    /// Start from an empty dot-file instead of the existing one
    #[arg(long)]
    pub no_use_current_env: bool,

    /// Read everything from a single compose file
    #[arg(long)]
    pub one_file: bool,

    /// Compose file to use with --one-file
    #[arg(short = 'f', long, value_name = "FILE")]
    pub compose_file: Option<PathBuf>,
}

impl RunArgs {
    /// Pipeline options for these arguments.
    ///
    /// # Errors
    ///
    /// `Error::UnsupportedMode` for the single-file options.
    pub fn to_options(&self, update_manifests: bool) -> Result<RunOptions, Error> {
        if self.one_file || self.compose_file.is_some() {
            return Err(Error::UnsupportedMode {
                feature: "single compose file mode (--one-file / --compose-file)".to_string(),
            });
        }
        Ok(RunOptions {
            compose_folder: self.compose_folder.clone(),
            env_folder: self.env_folder.clone(),
            env_file_name: self.env_file_name.clone(),
            config: ReconcileConfig {
                mode: if self.split { Mode::Split } else { Mode::Combine },
                prefix: self.prefix.clone(),
                postfix: self.postfix.clone(),
                use_current_env: !self.no_use_current_env,
            },
            update_manifests,
        })
    }
}
