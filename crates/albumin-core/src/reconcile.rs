//! # Reconciliation Engine
//!
//! Merges capture-date evidence per content key and decides what to record.
//!
//! 1. Gather raw evidence for the files and keep the best item per file
//! 2. Localize it to the configured zone
//! 3. Key every file through the content addresser
//! 4. Read what is already recorded for each key
//! 5. Merge evidence per key (equal ranks must agree exactly)
//! 6. Keep only merged evidence that outranks the recorded value
//! 7. Optionally write the updates
//!
//! A conflict or protocol failure aborts the pass before anything is written.

use crate::evidence::{Evidence, EvidenceMap, RawEvidence, gather_evidence};
use crate::protocol::MetadataService;
use crate::record::MetadataClient;
use crate::{AlbuminError, ContentKey};
use chrono_tz::Tz;
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Produces raw `(namespaced method, timestamp)` pairs for files.
pub trait EvidenceSource {
    fn gather(&mut self, files: &[PathBuf]) -> Result<RawEvidence, AlbuminError>;
}

/// Maps a file to its stable content key.
pub trait ContentAddresser {
    fn key_for(&mut self, file: &Path) -> Result<ContentKey, AlbuminError>;
}

// =============================================================================
// WORKING SET
// =============================================================================

/// Content key per file.
pub type KeyMap = BTreeMap<PathBuf, ContentKey>;

/// Merged evidence per key.
pub type MergedMap = BTreeMap<ContentKey, Evidence>;

/// Recorded evidence per key; `None` when the record has none.
pub type RecordedMap = BTreeMap<ContentKey, Option<Evidence>>;

/// A pending change of one key's datetime.
#[derive(Debug, Clone, Copy)]
pub struct Update {
    pub new: Evidence,
    pub old: Option<Evidence>,
}

/// Pending changes per key.
pub type UpdateMap = BTreeMap<ContentKey, Update>;

// =============================================================================
// ALGORITHMS
// =============================================================================

/// Merge per-file evidence into per-key evidence.
///
/// The most trusted item of each key wins. Any two items of one key with the
/// same rank must denote the same instant, otherwise the whole merge fails
/// with `Conflict`. The result does not depend on iteration order.
/// Files without a key are skipped.
pub fn merge_by_key(evidence: &EvidenceMap, keys: &KeyMap) -> Result<MergedMap, AlbuminError> {
    let mut merged = MergedMap::new();
    let mut seen: BTreeMap<(&ContentKey, usize), Evidence> = BTreeMap::new();

    for (file, datum) in evidence {
        let Some(key) = keys.get(file) else {
            tracing::warn!(file = %file.display(), "evidence for a file without content key");
            continue;
        };

        match seen.entry((key, datum.rank())) {
            Entry::Vacant(slot) => {
                slot.insert(*datum);
            }
            Entry::Occupied(slot) => {
                if !slot.get().same_instant(datum) {
                    return Err(AlbuminError::Conflict {
                        key: key.clone(),
                        first: *slot.get(),
                        second: *datum,
                    });
                }
            }
        }

        match merged.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(*datum);
            }
            Entry::Occupied(mut slot) => {
                if datum.cmp(slot.get()) == Ordering::Greater {
                    slot.insert(*datum);
                }
            }
        }
    }

    Ok(merged)
}

/// Select the keys whose merged evidence outranks the recorded evidence.
///
/// Absent recorded evidence ranks below everything. Equally or more trusted
/// recorded data is never replaced.
pub fn compute_updates(merged: &MergedMap, recorded: &RecordedMap) -> UpdateMap {
    merged
        .iter()
        .filter_map(|(key, new)| {
            let old = recorded.get(key).copied().flatten();
            (Some(*new) > old).then(|| (key.clone(), Update { new: *new, old }))
        })
        .collect()
}

/// Write every update through the record client.
pub fn apply_updates<S: MetadataService>(
    client: &mut MetadataClient<S>,
    updates: &UpdateMap,
) -> Result<(), AlbuminError> {
    for (key, update) in updates {
        tracing::info!(key = %key, "recording {}", update.new);
        client.write_evidence(key, &update.new)?;
    }
    Ok(())
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Reporting buckets of one pass.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Files whose key had nothing recorded and now receives a datetime.
    pub additions: BTreeMap<PathBuf, ContentKey>,
    /// Files whose key's recorded datetime is replaced.
    pub overwrites: BTreeMap<PathBuf, ContentKey>,
    /// Files that need a human: nothing accepted and nothing usable recorded,
    /// or evidence that lost against the recorded value.
    pub remaining: BTreeSet<PathBuf>,
    /// Files whose key keeps its recorded datetime: no evidence was found,
    /// or the evidence matches what is recorded.
    pub unchanged: BTreeSet<PathBuf>,
}

/// Sort every file of the pass into its reporting bucket.
pub fn classify(
    files: &[PathBuf],
    evidence: &EvidenceMap,
    keys: &KeyMap,
    recorded: &RecordedMap,
    updates: &UpdateMap,
) -> Classification {
    let mut buckets = Classification::default();

    for file in files {
        let key = keys.get(file);
        match key.and_then(|k| updates.get(k).map(|u| (k, u))) {
            Some((key, update)) if update.old.is_none() => {
                buckets.additions.insert(file.clone(), key.clone());
            }
            Some((key, _)) => {
                buckets.overwrites.insert(file.clone(), key.clone());
            }
            None => {
                let current = key.and_then(|k| recorded.get(k)).copied().flatten();
                let settled = match (evidence.get(file), current) {
                    (None, Some(_)) => true,
                    (Some(new), Some(old)) => *new == old && new.same_instant(&old),
                    (_, None) => false,
                };
                if settled {
                    buckets.unchanged.insert(file.clone());
                } else {
                    buckets.remaining.insert(file.clone());
                }
            }
        }
    }

    buckets
}

// =============================================================================
// REPORT
// =============================================================================

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub updates: UpdateMap,
    pub classification: Classification,
    /// True if the updates were written.
    pub applied: bool,
}

impl ReconcileReport {
    #[must_use]
    pub fn additions(&self) -> &BTreeMap<PathBuf, ContentKey> {
        &self.classification.additions
    }

    #[must_use]
    pub fn overwrites(&self) -> &BTreeMap<PathBuf, ContentKey> {
        &self.classification.overwrites
    }

    #[must_use]
    pub fn remaining(&self) -> &BTreeSet<PathBuf> {
        &self.classification.remaining
    }

    #[must_use]
    pub fn unchanged(&self) -> &BTreeSet<PathBuf> {
        &self.classification.unchanged
    }

    /// The update recorded for a file's key, if any.
    #[must_use]
    pub fn update_for(&self, key: &ContentKey) -> Option<&Update> {
        self.updates.get(key)
    }

    /// One summary line per bucket, for commit messages and logs.
    #[must_use]
    pub fn short(&self) -> Vec<String> {
        vec![
            format!("additions: {}", self.additions().len()),
            format!("overwrites: {}", self.overwrites().len()),
            format!("remaining: {}", self.remaining().len()),
            format!("unchanged: {}", self.unchanged().len()),
        ]
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[additions]")?;
        for (file, key) in self.additions() {
            if let Some(update) = self.updates.get(key) {
                writeln!(f, "  {}: {}", file.display(), update.new)?;
            }
        }
        writeln!(f, "[overwrites]")?;
        for (file, key) in self.overwrites() {
            if let Some(Update { new, old: Some(old) }) = self.updates.get(key) {
                writeln!(f, "  {}: {} -> {}", file.display(), old, new)?;
            }
        }
        writeln!(f, "[remaining]")?;
        for file in self.remaining() {
            writeln!(f, "  {}", file.display())?;
        }
        Ok(())
    }
}

// =============================================================================
// PASS
// =============================================================================

/// Runs reconciliation passes in one time zone.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    timezone: Tz,
}

impl Reconciler {
    /// Zoneless evidence is read as wall-clock time in `timezone`.
    #[must_use]
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Best evidence per file, localized to the pass's zone.
    ///
    /// Items that cannot be localized are discarded like any invalid evidence.
    pub fn localize(&self, evidence: EvidenceMap) -> EvidenceMap {
        evidence
            .into_iter()
            .filter_map(|(file, datum)| match datum.with_timezone(self.timezone) {
                Ok(datum) => Some((file, datum)),
                Err(e) => {
                    tracing::warn!(file = %file.display(), "discarding evidence: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Run one pass over `files`; write the updates only if `apply` is set.
    pub fn run<S, E, A>(
        &self,
        files: &[PathBuf],
        source: &mut E,
        addresser: &mut A,
        client: &mut MetadataClient<S>,
        apply: bool,
    ) -> Result<ReconcileReport, AlbuminError>
    where
        S: MetadataService,
        E: EvidenceSource + ?Sized,
        A: ContentAddresser + ?Sized,
    {
        let raw = source.gather(files)?;
        let evidence = self.localize(gather_evidence(&raw));
        tracing::info!(
            files = files.len(),
            with_evidence = evidence.len(),
            "gathered capture-date evidence"
        );

        let mut keys = KeyMap::new();
        for file in files {
            keys.insert(file.clone(), addresser.key_for(file)?);
        }

        let mut recorded = RecordedMap::new();
        for key in keys.values() {
            if !recorded.contains_key(key) {
                let current = client.recorded_evidence(key, Some(self.timezone))?;
                recorded.insert(key.clone(), current);
            }
        }

        let merged = merge_by_key(&evidence, &keys)?;
        let updates = compute_updates(&merged, &recorded);
        if apply {
            apply_updates(client, &updates)?;
        }

        let classification = classify(files, &evidence, &keys, &recorded, &updates);
        Ok(ReconcileReport {
            updates,
            classification,
            applied: apply,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
