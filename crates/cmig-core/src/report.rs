//! Import reports

use cmig_model::{ActionTaken, ResolvedMapping};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall import outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportStatus {
    /// Every directive resolved
    Success,
    /// At least one directive carries an error type
    Conflict,
}

/// Result of one import call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// One entry per input directive, in input order
    pub results: Vec<ResolvedMapping>,
    /// Overall outcome
    pub status: ImportStatus,
    /// Whether the changes were published
    pub committed: bool,
    /// Whether this was a dry run
    pub test: bool,
}

impl ImportReport {
    /// Report over `results`; status follows from the error types
    #[must_use]
    pub fn new(results: Vec<ResolvedMapping>, committed: bool, test: bool) -> Self {
        let status = if results.iter().any(ResolvedMapping::is_error) {
            ImportStatus::Conflict
        } else {
            ImportStatus::Success
        };
        Self {
            results,
            status,
            committed,
            test,
        }
    }

    /// Whether every directive resolved
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ImportStatus::Success
    }

    /// Mappings carrying an error
    pub fn errors(&self) -> impl Iterator<Item = &ResolvedMapping> {
        self.results.iter().filter(|m| m.is_error())
    }

    /// Counts per outcome
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for mapping in &self.results {
            match mapping.action_taken {
                Some(ActionTaken::CreatedNew) => summary.created += 1,
                Some(ActionTaken::UsedExisting) => summary.used_existing += 1,
                Some(ActionTaken::UpdatedExisting) => summary.updated += 1,
                Some(ActionTaken::Deleted) => summary.deleted += 1,
                Some(ActionTaken::Ignored) => summary.ignored += 1,
                None => {}
            }
            if mapping.is_error() {
                summary.failed += 1;
            }
        }
        summary
    }
}

/// Outcome counts of an [`ImportReport`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    /// `CreatedNew`
    pub created: usize,
    /// `UsedExisting`
    pub used_existing: usize,
    /// `UpdatedExisting`
    pub updated: usize,
    /// `Deleted`
    pub deleted: usize,
    /// `Ignored`
    pub ignored: usize,
    /// Carrying an error type
    pub failed: usize,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} reused, {} updated, {} deleted, {} ignored, {} failed",
            self.created, self.used_existing, self.updated, self.deleted, self.ignored, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmig_model::{EntityType, ErrorType, MappingAction, MappingDirective};
    use pretty_assertions::assert_eq;

    fn directive(id: &str) -> MappingDirective {
        MappingDirective::new(EntityType::Policy, id, MappingAction::NewOrExisting)
    }

    #[test]
    fn test_conflict_status_and_summary() {
        let report = ImportReport::new(
            vec![
                ResolvedMapping::taken(directive("a"), ActionTaken::CreatedNew, None),
                ResolvedMapping::taken(directive("b"), ActionTaken::UsedExisting, None),
                ResolvedMapping::failed(directive("c"), ErrorType::TargetExists, "exists"),
            ],
            false,
            false,
        );
        assert_eq!(report.status, ImportStatus::Conflict);
        assert_eq!(report.errors().count(), 1);
        let summary = report.summary();
        assert_eq!((summary.created, summary.used_existing, summary.failed), (1, 1, 1));
        assert_eq!(
            summary.to_string(),
            "1 created, 1 reused, 0 updated, 0 deleted, 0 ignored, 1 failed"
        );
    }

    #[test]
    fn test_wire_shape() {
        let report = ImportReport::new(
            vec![ResolvedMapping::taken(directive("a"), ActionTaken::Ignored, None)],
            true,
            false,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "Success");
        assert_eq!(json["committed"], true);
        assert_eq!(json["results"][0]["actionTaken"], "Ignored");
        assert_eq!(json["results"][0]["srcId"], "a");
    }
}
