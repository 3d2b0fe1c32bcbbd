//! Structured convergence outcomes
//!
//! Every engine call returns a [`ConvergenceResult`] by value; a batch of
//! calls is collected into a [`BatchReport`]. Convergence failure is a
//! reportable outcome, not an exception: batch orchestration continues
//! past one failed resource.

use crate::resource::Properties;
use serde::{Deserialize, Serialize};

/// Outcome classification for one convergence attempt
///
/// `Predicted` appears if and only if dry-run suppressed a mutation: the
/// engine reports what it would have applied, but whether the real call
/// would have succeeded is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Convergence completed (mutation applied, or nothing to do)
    Succeeded,
    /// The query or the single mutation attempt failed
    Failed,
    /// Dry-run suppressed the mutation; outcome is a prediction
    Predicted,
}

impl Status {
    /// Whether the attempt failed
    pub fn is_failure(self) -> bool {
        self == Self::Failed
    }

    /// Whether the result is a dry-run prediction
    pub fn is_predicted(self) -> bool {
        self == Self::Predicted
    }
}

/// Outcome of one convergence attempt
///
/// Invariants, enforced by the constructors:
/// - `status == Predicted` iff dry-run suppressed a mutation
/// - `changed` is non-empty only when `status != Failed`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceResult {
    /// The declared resource name
    pub name: String,

    /// Outcome classification
    pub status: Status,

    /// Property-name → new-value pairs actually applied, or predicted
    /// if dry-run
    pub changed: Properties,

    /// Human-readable summary
    pub message: String,
}

impl ConvergenceResult {
    /// The remote already matched the declaration; nothing was done
    pub fn no_op(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::Succeeded,
            changed: Properties::new(),
            message: message.into(),
        }
    }

    /// A mutation was applied
    pub fn applied(
        name: impl Into<String>,
        changed: Properties,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            status: Status::Succeeded,
            changed,
            message: message.into(),
        }
    }

    /// Dry-run suppressed the mutation; `changed` is the predicted set
    pub fn predicted(
        name: impl Into<String>,
        changed: Properties,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            status: Status::Predicted,
            changed,
            message: message.into(),
        }
    }

    /// The query or the single mutation attempt failed
    ///
    /// A failed result never carries changes.
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::Failed,
            changed: Properties::new(),
            message: message.into(),
        }
    }

    /// Whether anything was (or would be) changed
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Aggregate of independent convergence results for one batch
///
/// Results are owned values pushed in call order; there is no shared
/// mutable accumulator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    results: Vec<ConvergenceResult>,
}

impl BatchReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one result
    pub fn push(&mut self, result: ConvergenceResult) {
        self.results.push(result);
    }

    /// Iterate over the collected results
    pub fn iter(&self) -> impl Iterator<Item = &ConvergenceResult> {
        self.results.iter()
    }

    /// Number of results collected
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the report is empty
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of failed results
    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status.is_failure())
            .count()
    }

    /// Whether no result failed (predictions count as non-failures)
    pub fn all_succeeded(&self) -> bool {
        self.failed_count() == 0
    }
}

impl IntoIterator for BatchReport {
    type Item = ConvergenceResult;
    type IntoIter = std::vec::IntoIter<ConvergenceResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}
