//! # Environment Collections
//!
//! An [`EnvCollection`] is the ordered list of records that becomes one
//! dot-file. Positions are the dense indexes of the underlying `Vec`, so
//! every structural change leaves the order gap-free without an explicit
//! renumbering step.
//!
//! ## Lifecycle
//!
//! 1. The dot-file baseline is appended first and the collection is marked
//!    with [`EnvCollection::mark_baseline_loaded`].
//! 2. Manifest records are appended. Same-key records with the same value are
//!    folded onto the record already present; different values are kept so
//!    that [`EnvCollection::dedup`] can report the conflict.
//! 3. `dedup` runs once. It resolves `${NAME}` references, collapses every
//!    group of same-key records onto one survivor and fails on divergent
//!    values without touching the collection.
//!
//! References whose target is not present yet are parked rather than
//! dropped, and resolved again inside `dedup` once every source is loaded.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, warn};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::record::{rank_tiebreak, same_declaration, EnvRecord, KeyAffix, Source};

/// Something that can be appended to a collection.
#[derive(Debug, Clone)]
pub enum Input {
    /// A raw dot-file style line, parsed without affixes.
    Line(String),
    /// An already parsed record.
    Parsed(EnvRecord),
    /// Several inputs applied in order.
    Batch(Vec<Input>),
}

impl From<&str> for Input {
    fn from(line: &str) -> Self {
        Input::Line(line.to_string())
    }
}

impl From<String> for Input {
    fn from(line: String) -> Self {
        Input::Line(line)
    }
}

impl From<EnvRecord> for Input {
    fn from(record: EnvRecord) -> Self {
        Input::Parsed(record)
    }
}

impl<T: Into<Input>> From<Vec<T>> for Input {
    fn from(items: Vec<T>) -> Self {
        Input::Batch(items.into_iter().map(Into::into).collect())
    }
}

/// Counts reported by [`EnvCollection::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Every line, including blanks and comments.
    pub total: usize,
    /// Keyed records claimed by at least one service.
    pub with_services: usize,
    /// Keyed records no service claims.
    pub with_no_services: usize,
    /// Keyed records contributed by a manifest.
    pub new: usize,
}

/// Ordered, de-duplicated set of environment records.
#[derive(Debug, Clone, Default)]
pub struct EnvCollection {
    records: Vec<EnvRecord>,
    pending_references: Vec<EnvRecord>,
    dropped_references: Vec<EnvRecord>,
    baseline_loaded: bool,
}

impl EnvCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from the lines of a dot-file and mark it as the
    /// baseline.
    pub fn from_dotfile(text: &str) -> Result<Self> {
        let mut collection = Self::new();
        for (idx, line) in text.lines().enumerate() {
            collection.append(line, Source::DotFile, Some(idx + 1))?;
        }
        collection.mark_baseline_loaded();
        Ok(collection)
    }

    /// Record that the dot-file baseline has been read.
    pub fn mark_baseline_loaded(&mut self) {
        self.baseline_loaded = true;
    }

    pub fn baseline_loaded(&self) -> bool {
        self.baseline_loaded
    }

    /// Append a line, a record or a batch of either.
    ///
    /// `line` is only used for `Input::Line`; batch members are numbered from
    /// it consecutively.
    pub fn append(
        &mut self,
        input: impl Into<Input>,
        source: Source,
        line: Option<usize>,
    ) -> Result<()> {
        match input.into() {
            Input::Line(text) => {
                let mut record = EnvRecord::parse(&text, &KeyAffix::none(), source)?;
                record.origin_line = line;
                self.append_record(record);
            }
            Input::Parsed(record) => self.append_record(record),
            Input::Batch(items) => {
                for (offset, item) in items.into_iter().enumerate() {
                    self.append(item, source, line.map(|start| start + offset))?;
                }
            }
        }
        Ok(())
    }

    fn append_record(&mut self, record: EnvRecord) {
        if let Some(target) = record.parameter_expansion_key() {
            if let Some(existing) = self.records.iter_mut().find(|r| r.key == target) {
                debug!(
                    "Reference '{}' -> '{}' claimed by {:?}",
                    record.key, target, record.services
                );
                existing.add_services(record.services.iter().cloned());
            } else {
                debug!(
                    "Reference '{}' -> '{}' has no target yet (baseline loaded: {})",
                    record.key, target, self.baseline_loaded
                );
                self.pending_references.push(record);
            }
            return;
        }

        if record.has_key() {
            if let Some(existing) = self
                .records
                .iter_mut()
                .find(|r| same_declaration(r, &record))
            {
                existing.add_services(record.services.iter().cloned());
                if rank_tiebreak(&record, existing) == Ordering::Greater {
                    existing.source = record.source;
                }
                return;
            }
        }

        self.records.push(record);
    }

    /// First record with `key`, in position order.
    pub fn get(&self, key: &str) -> Option<&EnvRecord> {
        self.records.iter().find(|r| !key.is_empty() && r.key == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut EnvRecord> {
        self.records
            .iter_mut()
            .find(|r| !key.is_empty() && r.key == key)
    }

    /// Record at a zero-based position.
    pub fn at(&self, position: usize) -> Option<&EnvRecord> {
        self.records.get(position)
    }

    /// Position of the first record with `key`.
    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|r| !key.is_empty() && r.key == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position_of(key).is_some()
    }

    /// Remove the record at `position`, shifting later records down.
    pub fn remove(&mut self, position: usize) -> Option<EnvRecord> {
        (position < self.records.len()).then(|| self.records.remove(position))
    }

    /// Non-empty keys in position order, duplicates included.
    pub fn keys(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.has_key())
            .map(|r| r.key.as_str())
            .collect()
    }

    pub fn records(&self) -> &[EnvRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// References that could not be resolved by the last `dedup`.
    pub fn dropped_references(&self) -> &[EnvRecord] {
        &self.dropped_references
    }

    /// Keys that occur more than once, with their counts.
    pub fn find_duplicates(&self) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for key in self.keys() {
            *counts.entry(key.to_string()).or_default() += 1;
        }
        counts.retain(|_, count| *count > 1);
        counts
    }

    /// Resolve references and collapse duplicate keys.
    ///
    /// On a conflict the collection is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns `Error::Conflict` when records sharing a key disagree on the
    /// value.
    pub fn dedup(&mut self) -> Result<()> {
        let pending = self.pending_references.clone();
        let outcome = dedup_records(self.records.clone(), pending)?;
        self.records = outcome.records;
        self.pending_references.clear();
        self.dropped_references.extend(outcome.dropped);
        Ok(())
    }

    /// Keyed records that no service claims.
    pub fn orphans(&self) -> Vec<&EnvRecord> {
        self.records
            .iter()
            .filter(|r| r.has_key() && r.services.is_empty())
            .collect()
    }

    /// `service -> key -> record` for every claimed record.
    pub fn services_index(&self) -> BTreeMap<&str, BTreeMap<&str, &EnvRecord>> {
        let mut index: BTreeMap<&str, BTreeMap<&str, &EnvRecord>> = BTreeMap::new();
        for record in self.records.iter().filter(|r| r.has_key()) {
            for service in &record.services {
                index
                    .entry(service.as_str())
                    .or_default()
                    .insert(record.key.as_str(), record);
            }
        }
        index
    }

    pub fn stats(&self) -> Stats {
        let keyed = || self.records.iter().filter(|r| r.has_key());
        Stats {
            total: self.records.len(),
            with_services: keyed().filter(|r| !r.services.is_empty()).count(),
            with_no_services: keyed().filter(|r| r.services.is_empty()).count(),
            new: keyed().filter(|r| r.source == Source::Manifest).count(),
        }
    }
}

/// Result of [`dedup_records`].
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub records: Vec<EnvRecord>,
    /// References whose target key does not exist.
    pub dropped: Vec<EnvRecord>,
}

/// Reference resolution and duplicate collapsing as a pure function.
///
/// 1. Every `${NAME}` / `{{NAME}}` record (inline or in `pending`) is removed
///    and its services are added to the first record keyed `NAME`. References
///    without a target are returned in `dropped`.
/// 2. For every key occurring more than once the survivor is the highest
///    ranked record (manifest over dot-file, first seen on ties).
/// 3. All records of the group must share the survivor's value.
/// 4. The survivor takes the union of the group's services and the comment
///    of the group's first record, and is placed at the group's first
///    position. The other group members are removed.
pub fn dedup_records(records: Vec<EnvRecord>, pending: Vec<EnvRecord>) -> Result<DedupOutcome> {
    let (references, mut records): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|r| r.is_parameter_expansion());

    let mut dropped = Vec::new();
    for reference in references.into_iter().chain(pending) {
        let target = reference.parameter_expansion_key().unwrap_or_default();
        match records.iter_mut().find(|r| r.has_key() && r.key == target) {
            Some(existing) => existing.add_services(reference.services.iter().cloned()),
            None => {
                warn!(
                    "Dropping '{}={}': '{}' is not declared anywhere",
                    reference.key, reference.value, target
                );
                dropped.push(reference);
            }
        }
    }

    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (position, record) in records.iter().enumerate() {
        if record.has_key() {
            groups.entry(record.key.as_str()).or_default().push(position);
        }
    }

    let mut replacements: HashMap<usize, EnvRecord> = HashMap::new();
    let mut removed: BTreeSet<usize> = BTreeSet::new();
    for positions in groups.values().filter(|p| p.len() > 1) {
        let survivor = positions
            .iter()
            .copied()
            .reduce(|best, candidate| {
                if rank_tiebreak(&records[candidate], &records[best]) == Ordering::Greater {
                    candidate
                } else {
                    best
                }
            })
            .unwrap_or(positions[0]);

        let mut merged = records[survivor].clone();
        for &position in positions {
            let member = &records[position];
            if member.value != merged.value {
                return Err(Error::Conflict {
                    key: merged.key,
                    first: merged.value,
                    second: member.value.clone(),
                });
            }
            merged.add_services(member.services.iter().cloned());
        }

        let first = positions[0];
        merged.comment = records[first].comment.clone();
        debug!(
            "Collapsed {} records for '{}' ({} wins)",
            positions.len(),
            merged.key,
            merged.source
        );
        replacements.insert(first, merged);
        removed.extend(positions.iter().copied().filter(|&p| p != first));
    }

    let records = records
        .into_iter()
        .enumerate()
        .filter(|(position, _)| !removed.contains(position))
        .map(|(position, record)| replacements.remove(&position).unwrap_or(record))
        .collect();

    Ok(DedupOutcome { records, dropped })
}
