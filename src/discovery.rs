//! # Manifest Discovery
//!
//! Finds the compose manifests in a folder and works out which dot-file each
//! one feeds.
//!
//! ## Naming
//!
//! | Manifest | Dot-file |
//! |---|---|
//! | `compose.yaml`, `docker-compose.yml` | `<env_file_name>` |
//! | `compose.prod.yaml`, `docker-compose.prod.yml`, `prod.compose.yaml` | `<env_file_name>.prod` |
//!
//! Manifests that map to the same dot-file are reconciled together.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use glob::Pattern;
use log::debug;

use crate::error::{Error, Result};

/// File patterns recognised as compose manifests.
pub const MANIFEST_PATTERNS: &[&str] = &[
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
    "compose.*.yaml",
    "compose.*.yml",
    "docker-compose.*.yaml",
    "docker-compose.*.yml",
    "*.compose.yaml",
    "*.compose.yml",
];

/// One dot-file and the manifests reconciled into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub dotfile: PathBuf,
    pub manifests: Vec<PathBuf>,
}

/// All manifests in `folder`, sorted by path.
///
/// # Errors
///
/// `Error::MissingFile` when `folder` does not exist or holds no manifest.
pub fn find_manifests(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(Error::MissingFile {
            path: folder.display().to_string(),
        });
    }

    let base = Pattern::escape(&folder.to_string_lossy());
    let mut found = BTreeSet::new();
    for pattern in MANIFEST_PATTERNS {
        let full = format!("{}/{}", base.trim_end_matches('/'), pattern);
        for path in glob::glob(&full)?.flatten() {
            if path.is_file() {
                found.insert(path);
            }
        }
    }

    if found.is_empty() {
        return Err(Error::MissingFile {
            path: folder.join("compose.yaml").display().to_string(),
        });
    }
    debug!("Found {} manifest(s) in {}", found.len(), folder.display());
    Ok(found.into_iter().collect())
}

/// Dot-file name for `manifest`, derived from `base` (usually `.env`).
pub fn dotfile_name(manifest: &Path, base: &str) -> String {
    let file_name = manifest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name
        .strip_suffix(".yaml")
        .or_else(|| file_name.strip_suffix(".yml"))
        .unwrap_or(&file_name);
    let stem = stem.strip_prefix("docker-").unwrap_or(stem);

    let infix = stem
        .strip_prefix("compose.")
        .or_else(|| stem.strip_suffix(".compose"))
        .filter(|infix| !infix.is_empty());
    match infix {
        Some(infix) => format!("{}.{}", base, infix),
        None => base.to_string(),
    }
}

/// Group the manifests of `compose_folder` by the dot-file they feed.
pub fn plan_jobs(compose_folder: &Path, env_folder: &Path, env_file_name: &str) -> Result<Vec<Job>> {
    let mut jobs: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for manifest in find_manifests(compose_folder)? {
        let dotfile = env_folder.join(dotfile_name(&manifest, env_file_name));
        jobs.entry(dotfile).or_default().push(manifest);
    }
    Ok(jobs
        .into_iter()
        .map(|(dotfile, manifests)| Job { dotfile, manifests })
        .collect())
}
