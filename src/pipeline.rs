//! # Run Pipeline
//!
//! A run goes through three steps:
//!
//! 1. **Plan**: discover the manifests and group them by dot-file.
//! 2. **Reconcile**: for each group, load the baseline and manifests and
//!    build the canonical collection plus the manifest rewrites.
//! 3. **Stage**: render every output into [`StagedWrites`].
//!
//! [`execute`] stops at step 3. Writing is a separate, explicit
//! [`StagedWrites::commit`], so any error in any group leaves every file on
//! disk untouched.

use std::path::PathBuf;

use log::{debug, info};

use crate::discovery::{self, Job};
use crate::dotfile;
use crate::error::Result;
use crate::filesystem::StagedWrites;
use crate::manifest::{Manifest, ManifestSource};
use crate::reconcile::{ReconcileConfig, Reconciler, Reconciliation};

/// Everything one run needs to know.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub compose_folder: PathBuf,
    pub env_folder: PathBuf,
    pub env_file_name: String,
    pub config: ReconcileConfig,
    /// Stage rewritten manifests alongside the dot-files.
    pub update_manifests: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            compose_folder: PathBuf::from("."),
            env_folder: PathBuf::from("."),
            env_file_name: ".env".to_string(),
            config: ReconcileConfig::default(),
            update_manifests: true,
        }
    }
}

/// Result of reconciling one dot-file.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job: Job,
    pub reconciliation: Reconciliation,
    /// Rendered dot-file content.
    pub dotfile_text: String,
    /// Manifests whose text changed, with their new content.
    pub updated_manifests: Vec<(PathBuf, String)>,
}

impl JobOutcome {
    pub fn rewrite_count(&self) -> usize {
        self.reconciliation.rewrites.iter().map(Vec::len).sum()
    }
}

/// Result of a whole run, not yet written.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub jobs: Vec<JobOutcome>,
    pub staged: StagedWrites,
}

/// Plan, reconcile and stage every job. Nothing is written.
pub fn execute(options: &RunOptions) -> Result<RunOutcome> {
    let jobs = discovery::plan_jobs(
        &options.compose_folder,
        &options.env_folder,
        &options.env_file_name,
    )?;
    info!("Planned {} dot-file(s)", jobs.len());

    let reconciler = Reconciler::new(options.config.clone());
    let mut staged = StagedWrites::new();
    let mut outcomes = Vec::with_capacity(jobs.len());
    for job in jobs {
        let outcome = run_job(&reconciler, job, options.update_manifests)?;
        staged.stage(&outcome.job.dotfile, outcome.dotfile_text.as_str());
        for (path, text) in &outcome.updated_manifests {
            staged.stage(path, text.as_str());
        }
        outcomes.push(outcome);
    }

    Ok(RunOutcome {
        jobs: outcomes,
        staged,
    })
}

fn run_job(reconciler: &Reconciler, job: Job, update_manifests: bool) -> Result<JobOutcome> {
    debug!(
        "Reconciling {} from {} manifest(s)",
        job.dotfile.display(),
        job.manifests.len()
    );
    let baseline = dotfile::read_baseline(&job.dotfile)?;
    let manifests = job
        .manifests
        .iter()
        .map(Manifest::load)
        .collect::<Result<Vec<_>>>()?;
    let sources: Vec<&dyn ManifestSource> = manifests
        .iter()
        .map(|m| m as &dyn ManifestSource)
        .collect();

    let reconciliation = reconciler.reconcile(baseline.as_deref(), &sources)?;
    let dotfile_text = dotfile::render(&reconciliation.collection);

    let mut updated_manifests = Vec::new();
    if update_manifests {
        for (manifest, rewrites) in manifests.iter().zip(&reconciliation.rewrites) {
            let text = manifest.rewrite(rewrites)?;
            if text != manifest.text() {
                updated_manifests.push((manifest.path().to_path_buf(), text));
            }
        }
    }

    Ok(JobOutcome {
        job,
        reconciliation,
        dotfile_text,
        updated_manifests,
    })
}
