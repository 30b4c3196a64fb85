//! Manifest comparison.
//!
//! Two manifests of the same unit are compared path by path: a path only in
//! the candidate is added, only in the base is removed, in both with equal
//! digests unchanged, otherwise modified. A record missing its digest on
//! either side is conservatively reported as modified rather than silently
//! called unchanged. Insertion order of either manifest never influences
//! the result.

use crate::errors::DiffError;
use crate::manifest::{FileRecord, Manifest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Status of one path across two manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffStatus {
    /// Present only in the candidate manifest.
    Added,
    /// Present only in the base manifest.
    Removed,
    /// Present in both with differing (or missing) digests.
    Modified,
    /// Present in both with identical digests.
    Unchanged,
}

impl DiffStatus {
    /// Single-character marker for compact listings.
    #[must_use]
    pub const fn status_char(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Removed => 'R',
            Self::Modified => 'M',
            Self::Unchanged => '=',
        }
    }
}

/// One path's comparison outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// The path under comparison.
    pub path: PathBuf,
    /// Its status.
    pub status: DiffStatus,
}

/// Aggregate counts over a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Paths only in the candidate.
    pub added: usize,
    /// Paths only in the base.
    pub removed: usize,
    /// Paths whose digests differ.
    pub modified: usize,
    /// Paths whose digests match.
    pub unchanged: usize,
}

/// Structured diff of two manifests of the same unit. Derived on demand,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDiff {
    /// The unit both manifests describe.
    pub unit: String,
    /// Per-path outcomes, sorted by path.
    pub entries: Vec<DiffEntry>,
    /// Aggregate counts.
    pub summary: DiffSummary,
}

impl ManifestDiff {
    /// Whether the diff reports no additions, removals, or modifications.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.summary.added == 0 && self.summary.removed == 0 && self.summary.modified == 0
    }

    /// Apply a verdict policy to this diff.
    #[must_use]
    pub fn verdict(&self, policy: &VerdictPolicy) -> Verdict {
        let mut violations = Vec::new();
        if self.summary.modified > 0 {
            violations.push(format!("{} modified", self.summary.modified));
        }
        if policy.fail_on_added && self.summary.added > 0 {
            violations.push(format!("{} added", self.summary.added));
        }
        if policy.fail_on_removed && self.summary.removed > 0 {
            violations.push(format!("{} removed", self.summary.removed));
        }
        if violations.is_empty() {
            Verdict::Consistent
        } else {
            Verdict::Inconsistent {
                reason: violations.join(", "),
            }
        }
    }
}

/// Which diff contents break a consistency verdict. Modified files always
/// do; additions and removals are a deployment decision (successive backups
/// of a live tree legitimately add files, a source-vs-backup comparison
/// should not).
#[derive(Debug, Clone, Copy)]
pub struct VerdictPolicy {
    /// Treat added paths as an inconsistency.
    pub fail_on_added: bool,
    /// Treat removed paths as an inconsistency.
    pub fail_on_removed: bool,
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self {
            fail_on_added: false,
            fail_on_removed: true,
        }
    }
}

/// Consistency verdict for a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The candidate is consistent with the base under the policy.
    Consistent,
    /// The candidate deviates from the base.
    Inconsistent {
        /// Summary of what deviated.
        reason: String,
    },
}

/// Whether two records carry the same, present digest.
fn digests_match(base: &FileRecord, candidate: &FileRecord) -> bool {
    match (&base.digest, &candidate.digest) {
        (Some(b), Some(c)) => b == c,
        // An unset digest on either side is never "unchanged"
        _ => false,
    }
}

/// Compare two manifests of the same unit.
///
/// # Errors
///
/// Fails with [`DiffError::UnitMismatch`] when the manifests describe
/// different units.
pub fn diff(base: &Manifest, candidate: &Manifest) -> Result<ManifestDiff, DiffError> {
    if base.unit != candidate.unit {
        return Err(DiffError::UnitMismatch {
            base: base.unit.to_string(),
            candidate: candidate.unit.to_string(),
        });
    }

    let base_by_path: HashMap<&Path, &FileRecord> =
        base.files.iter().map(|r| (r.path.as_path(), r)).collect();
    let candidate_by_path: HashMap<&Path, &FileRecord> = candidate
        .files
        .iter()
        .map(|r| (r.path.as_path(), r))
        .collect();

    let mut entries = Vec::with_capacity(base_by_path.len() + candidate_by_path.len());

    for (path, base_record) in &base_by_path {
        let status = match candidate_by_path.get(path) {
            Some(candidate_record) => {
                if digests_match(base_record, candidate_record) {
                    DiffStatus::Unchanged
                } else {
                    DiffStatus::Modified
                }
            }
            None => DiffStatus::Removed,
        };
        entries.push(DiffEntry {
            path: path.to_path_buf(),
            status,
        });
    }
    for path in candidate_by_path.keys() {
        if !base_by_path.contains_key(path) {
            entries.push(DiffEntry {
                path: path.to_path_buf(),
                status: DiffStatus::Added,
            });
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));

    let mut summary = DiffSummary::default();
    for entry in &entries {
        match entry.status {
            DiffStatus::Added => summary.added += 1,
            DiffStatus::Removed => summary.removed += 1,
            DiffStatus::Modified => summary.modified += 1,
            DiffStatus::Unchanged => summary.unchanged += 1,
        }
    }

    Ok(ManifestDiff {
        unit: base.unit.to_string(),
        entries,
        summary,
    })
}
