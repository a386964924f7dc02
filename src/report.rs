//! Run summaries for `check` and `extract`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::collection::Stats;
use crate::error::Result;
use crate::output::{OutputConfig, Tone};
use crate::pipeline::{JobOutcome, RunOutcome};

/// Summary of one dot-file.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub dotfile: String,
    pub manifests: Vec<String>,
    pub stats: Stats,
    pub orphans: Vec<String>,
    pub dropped_references: Vec<String>,
    pub rewrites: usize,
    /// Whether the dot-file on disk differs from the reconciled content.
    pub dotfile_changed: bool,
    pub manifests_changed: Vec<String>,
    /// Keys each service reads, by service name.
    pub services: BTreeMap<String, Vec<String>>,
}

impl JobReport {
    pub fn new(outcome: &JobOutcome, staged_changed: &[&Path]) -> Self {
        let collection = &outcome.reconciliation.collection;
        Self {
            dotfile: outcome.job.dotfile.display().to_string(),
            manifests: outcome
                .job
                .manifests
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            stats: collection.stats(),
            orphans: outcome.reconciliation.orphans.clone(),
            dropped_references: collection
                .dropped_references()
                .iter()
                .map(ToString::to_string)
                .collect(),
            rewrites: outcome.rewrite_count(),
            dotfile_changed: staged_changed.contains(&outcome.job.dotfile.as_path()),
            manifests_changed: outcome
                .updated_manifests
                .iter()
                .filter(|(path, _)| staged_changed.contains(&path.as_path()))
                .map(|(path, _)| path.display().to_string())
                .collect(),
            services: collection
                .services_index()
                .into_iter()
                .map(|(service, keys)| {
                    (
                        service.to_string(),
                        keys.into_keys().map(str::to_string).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Nothing on disk would change.
    pub fn is_clean(&self) -> bool {
        !self.dotfile_changed && self.manifests_changed.is_empty()
    }

    pub fn render_text(&self, output: &OutputConfig) -> String {
        let mut text = format!(
            "{} {}\n",
            output.emoji("📄", "[ENV]"),
            output.paint(Tone::Heading, &self.dotfile)
        );
        text.push_str(&format!(
            "   {} line(s), {} used by services, {} unused, {} from manifests\n",
            self.stats.total, self.stats.with_services, self.stats.with_no_services, self.stats.new
        ));
        text.push_str(&format!(
            "   {} manifest entr{} to rewrite across {} manifest(s)\n",
            self.rewrites,
            if self.rewrites == 1 { "y" } else { "ies" },
            self.manifests.len()
        ));
        if !self.orphans.is_empty() {
            text.push_str(&format!(
                "   {} {}\n",
                output.emoji("⚠️", "[WARN]"),
                output.paint(
                    Tone::Warning,
                    &format!("Unused: {}", self.orphans.join(", "))
                )
            ));
        }
        if !self.dropped_references.is_empty() {
            text.push_str(&format!(
                "   {} {}\n",
                output.emoji("⚠️", "[WARN]"),
                output.paint(
                    Tone::Warning,
                    &format!("Unresolved: {}", self.dropped_references.join(", "))
                )
            ));
        }
        text
    }
}

/// Summary of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub jobs: Vec<JobReport>,
}

impl RunReport {
    pub fn new(outcome: &RunOutcome) -> Self {
        let changed = outcome.staged.changed();
        Self {
            jobs: outcome
                .jobs
                .iter()
                .map(|job| JobReport::new(job, &changed))
                .collect(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.jobs.iter().all(JobReport::is_clean)
    }

    pub fn has_warnings(&self) -> bool {
        self.jobs
            .iter()
            .any(|job| !job.orphans.is_empty() || !job.dropped_references.is_empty())
    }

    pub fn render_text(&self, output: &OutputConfig) -> String {
        self.jobs
            .iter()
            .map(|job| job.render_text(output))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
