//! # extract-env
//!
//! Keeps the `environment:` sections of compose manifests and a flat dot-file
//! in agreement. Literal values move into the dot-file, the manifests are
//! rewritten to reference them as `${KEY}`, and repeated runs leave an
//! already reconciled tree byte-for-byte unchanged.
//!
//! ## Quick Example
//!
//! ```
//! use extract_env::manifest::Manifest;
//! use extract_env::reconcile::Reconciler;
//!
//! let compose = "services:\n  api:\n    environment:\n      - PORT=8080\n";
//! let manifest = Manifest::parse("compose.yaml", compose).unwrap();
//!
//! let result = Reconciler::default().reconcile(None, &[&manifest]).unwrap();
//! assert_eq!(result.collection.get("PORT").unwrap().value, "8080");
//! assert_eq!(result.rewrites[0][0].entry, "PORT=${PORT}");
//!
//! let rewritten = manifest.rewrite(&result.rewrites[0]).unwrap();
//! assert!(rewritten.contains("- PORT=${PORT}"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Records (`record`)**: one dot-file line or manifest entry, with its
//!   comment and the services that use it.
//! - **Collections (`collection`)**: an ordered set of records with
//!   reference resolution and duplicate collapsing.
//! - **Manifests (`manifest`)**: reading service environments from YAML and
//!   writing rewritten entries back without disturbing the rest of the file.
//! - **Reconciliation (`reconcile`)**: combine and split modes over one
//!   dot-file and its manifests.
//! - **Pipeline (`pipeline`)**: discovery, reconciliation and staged writes
//!   for a whole folder.

pub mod collection;
pub mod discovery;
pub mod dotfile;
pub mod error;
pub mod filesystem;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod reconcile;
pub mod record;
pub mod report;

#[cfg(test)]
mod record_proptest;
