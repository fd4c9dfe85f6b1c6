//! Core domain types for relationship imports.
//!
//! Records and endpoint references are ephemeral: created per row and dropped
//! once the row has been classified. Only the [`MappingSummary`] outlives an
//! import.

use serde::{Deserialize, Serialize};

// ── Records ──────────────────────────────────────────────────────

/// An ordered sequence of string fields, addressed by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record(Vec<String>);

impl Record {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> From<Vec<S>> for Record {
    fn from(fields: Vec<S>) -> Self {
        Self(fields.into_iter().map(Into::into).collect())
    }
}

// ── Upsert Requests ──────────────────────────────────────────────

/// A resolved node address: label, key property and key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointRef {
    pub label: String,
    pub key: String,
    pub value: String,
}

/// A fully resolved request to ensure one relationship exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipUpsert {
    pub from: EndpointRef,
    pub to: EndpointRef,
    pub relationship_type: String,
}

/// What a successful upsert did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertEffect {
    /// The relationship did not exist and was created.
    Created,
    /// The relationship already existed; nothing was written.
    MatchedExisting,
    /// The store cannot tell the two cases apart.
    Applied,
}

// ── Outcomes ─────────────────────────────────────────────────────

/// Classification of a single data row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    MatchedExisting,
    Applied,
    /// Missing or unresolvable key value; no store call was made.
    SkippedInvalid { reason: String },
    /// The store rejected the upsert.
    Failed { reason: String },
}

impl From<UpsertEffect> for UpsertOutcome {
    fn from(effect: UpsertEffect) -> Self {
        match effect {
            UpsertEffect::Created => Self::Created,
            UpsertEffect::MatchedExisting => Self::MatchedExisting,
            UpsertEffect::Applied => Self::Applied,
        }
    }
}

/// A row the store rejected, kept for the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    /// Record index in the source; the header is row 0.
    pub row: usize,
    pub reason: String,
}

/// Counts for one mapping applied to one row source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSummary {
    pub relationship_type: String,
    /// Data rows seen, excluding the header.
    pub processed: u64,
    pub created: u64,
    pub matched_existing: u64,
    pub applied: u64,
    pub skipped: u64,
    pub failed: u64,
    pub failures: Vec<RowFailure>,
    /// Set when the import stopped early on a shutdown signal.
    pub cancelled: bool,
}

impl MappingSummary {
    pub fn new(relationship_type: impl Into<String>) -> Self {
        Self {
            relationship_type: relationship_type.into(),
            ..Default::default()
        }
    }

    /// Fold one row outcome into the counters.
    pub fn record(&mut self, row: usize, outcome: UpsertOutcome) {
        self.processed += 1;
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::MatchedExisting => self.matched_existing += 1,
            UpsertOutcome::Applied => self.applied += 1,
            UpsertOutcome::SkippedInvalid { .. } => self.skipped += 1,
            UpsertOutcome::Failed { reason } => {
                self.failed += 1;
                self.failures.push(RowFailure { row, reason });
            }
        }
    }

    /// Rows whose relationship is known to exist after the import.
    pub fn linked(&self) -> u64 {
        self.created + self.matched_existing + self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_access() {
        let r = Record::from(vec!["A1", "", "C1"]);
        assert_eq!(r.len(), 3);
        assert_eq!(r.get(0), Some("A1"));
        assert_eq!(r.get(1), Some(""));
        assert_eq!(r.get(3), None);
    }

    #[test]
    fn test_summary_counts() {
        let mut s = MappingSummary::new("HAS_ACCOUNT");
        s.record(1, UpsertEffect::Created.into());
        s.record(2, UpsertEffect::MatchedExisting.into());
        s.record(
            3,
            UpsertOutcome::SkippedInvalid {
                reason: "empty".into(),
            },
        );
        s.record(
            4,
            UpsertOutcome::Failed {
                reason: "endpoint missing".into(),
            },
        );

        assert_eq!(s.processed, 4);
        assert_eq!(s.created, 1);
        assert_eq!(s.matched_existing, 1);
        assert_eq!(s.skipped, 1);
        assert_eq!(s.failed, 1);
        assert_eq!(s.linked(), 2);
        assert_eq!(
            s.failures,
            vec![RowFailure {
                row: 4,
                reason: "endpoint missing".into()
            }]
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(UpsertOutcome::Failed {
            reason: "timeout".into(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["reason"], "timeout");
    }
}
