//! # Reconciliation
//!
//! Drives one dot-file and the manifests that feed it through the record
//! pipeline and decides how each manifest entry should be rewritten.
//!
//! ## Modes
//!
//! - **Combine**: every service's variables land under their own name (plus
//!   the global prefix/postfix). Services declaring the same key share one
//!   record, which fails with a conflict if they disagree on the value.
//! - **Split**: every key is scoped by its service, giving
//!   `{PREFIX}_{SERVICE}_{KEY}_{POSTFIX}`. No cross-service merging happens.
//!
//! ## Sequencing
//!
//! The dot-file baseline is always loaded before any manifest, so references
//! like `${DB_HOST}` find their target on the first pass. Whatever is still
//! unresolved is retried during dedup, after every manifest is in.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::collection::EnvCollection;
use crate::error::Result;
use crate::manifest::{ManifestRewrite, ManifestSource, ServiceEnvironment};
use crate::record::{EnvRecord, KeyAffix, Source};

/// How manifest variables are keyed in the dot-file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Combine,
    Split,
}

/// Settings for one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    pub mode: Mode,
    pub prefix: String,
    pub postfix: String,
    /// Start from the existing dot-file instead of an empty one.
    pub use_current_env: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Combine,
            prefix: String::new(),
            postfix: String::new(),
            use_current_env: true,
        }
    }
}

/// Outcome of [`Reconciler::reconcile`].
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Final dot-file content.
    pub collection: EnvCollection,
    /// Entry rewrites, one list per manifest in input order.
    pub rewrites: Vec<Vec<ManifestRewrite>>,
    /// Keys in the dot-file that no service uses.
    pub orphans: Vec<String>,
}

/// Where a manifest entry ended up.
#[derive(Debug)]
struct Placement {
    manifest: usize,
    service: String,
    index: usize,
    raw: String,
    target: String,
}

/// Reconciles manifests against a dot-file baseline.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Build the canonical collection for `baseline` and `manifests`.
    ///
    /// Nothing is written here; the caller commits the result only when this
    /// returns `Ok`.
    ///
    /// # Errors
    ///
    /// `Error::Conflict` for divergent values, `Error::MalformedInput` for
    /// entries that cannot be parsed.
    pub fn reconcile(
        &self,
        baseline: Option<&str>,
        manifests: &[&dyn ManifestSource],
    ) -> Result<Reconciliation> {
        let mut collection = match baseline {
            Some(text) if self.config.use_current_env => EnvCollection::from_dotfile(text)?,
            _ => {
                let mut empty = EnvCollection::new();
                empty.mark_baseline_loaded();
                empty
            }
        };
        debug!("Baseline holds {} line(s)", collection.len());

        let placements = match self.config.mode {
            Mode::Combine => self.combine(&mut collection, manifests)?,
            Mode::Split => self.split(&mut collection, manifests)?,
        };

        collection.dedup()?;

        let mut rewrites = vec![Vec::new(); manifests.len()];
        for placement in placements {
            let Some(record) = collection.get(&placement.target) else {
                continue;
            };
            if !record.services.contains(&placement.service) {
                continue;
            }
            let entry_key = placement
                .raw
                .split_once('=')
                .map_or(placement.raw.as_str(), |(key, _)| key)
                .trim();
            let entry = format!("{}={}", entry_key, record.to_reference());
            if entry != placement.raw.trim() {
                rewrites[placement.manifest].push(ManifestRewrite {
                    service: placement.service,
                    index: placement.index,
                    entry,
                });
            }
        }

        let orphans: Vec<String> = collection
            .orphans()
            .into_iter()
            .map(|r| r.key.clone())
            .collect();
        if !orphans.is_empty() {
            warn!(
                "{} variable(s) are not used by any service: {}",
                orphans.len(),
                orphans.join(", ")
            );
        }
        info!(
            "Reconciled {} record(s), {} manifest entries to rewrite",
            collection.len(),
            rewrites.iter().map(Vec::len).sum::<usize>()
        );

        Ok(Reconciliation {
            collection,
            rewrites,
            orphans,
        })
    }

    /// Flatten every service of every manifest into one batch.
    fn combine(
        &self,
        collection: &mut EnvCollection,
        manifests: &[&dyn ManifestSource],
    ) -> Result<Vec<Placement>> {
        let affix = KeyAffix::new(self.config.prefix.as_str(), self.config.postfix.as_str());
        let mut batch = Vec::new();
        let mut placements = Vec::new();
        for (position, manifest) in manifests.iter().enumerate() {
            for service in manifest.services() {
                let records = parse_service(*manifest, position, service, &affix, &mut placements)?;
                batch.extend(records);
            }
        }
        collection.append(batch, Source::Manifest, None)?;
        Ok(placements)
    }

    /// Append each service on its own, under a service-scoped key.
    fn split(
        &self,
        collection: &mut EnvCollection,
        manifests: &[&dyn ManifestSource],
    ) -> Result<Vec<Placement>> {
        let mut placements = Vec::new();
        for (position, manifest) in manifests.iter().enumerate() {
            for service in manifest.services() {
                let affix = self.split_affix(&service.name);
                let records = parse_service(*manifest, position, service, &affix, &mut placements)?;
                collection.append(records, Source::Manifest, None)?;
            }
        }
        Ok(placements)
    }

    fn split_affix(&self, service: &str) -> KeyAffix {
        let label = service_label(service);
        let prefix = if self.config.prefix.is_empty() {
            format!("{}_", label)
        } else {
            format!("{}_{}_", self.config.prefix, label)
        };
        let postfix = if self.config.postfix.is_empty() {
            String::new()
        } else {
            format!("_{}", self.config.postfix)
        };
        KeyAffix::new(prefix, postfix)
    }
}

/// Upper-case a service name, replacing separators with `_`.
pub fn service_label(service: &str) -> String {
    service
        .chars()
        .flat_map(|c| {
            let mapped: Vec<char> = if c.is_alphanumeric() {
                c.to_uppercase().collect()
            } else {
                vec!['_']
            };
            mapped
        })
        .collect()
}

fn parse_service(
    manifest: &dyn ManifestSource,
    position: usize,
    service: &ServiceEnvironment,
    affix: &KeyAffix,
    placements: &mut Vec<Placement>,
) -> Result<Vec<EnvRecord>> {
    let comments: BTreeMap<usize, String> = manifest.comments_for(&service.name);

    let mut records = Vec::with_capacity(service.entries.len());
    for (index, raw) in service.entries.iter().enumerate() {
        let mut record =
            EnvRecord::parse(raw, affix, Source::Manifest)?.with_service(service.name.as_str());
        if !record.has_key() {
            debug!("Skipping entry {} of service '{}': no variable", index, service.name);
            continue;
        }
        if record.comment.is_empty() {
            if let Some(comment) = comments.get(&index) {
                record.set_comment(comment);
            }
        }

        let target = record
            .parameter_expansion_key()
            .map_or_else(|| record.key.clone(), str::to_string);
        placements.push(Placement {
            manifest: position,
            service: service.name.clone(),
            index,
            raw: raw.clone(),
            target,
        });
        records.push(record);
    }
    Ok(records)
}
