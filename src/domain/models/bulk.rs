//! Bulk operation result models.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::resource::ResourceType;

/// A bulk write exposed to tool callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    /// Archive workspaces.
    ArchiveWorkspaces,
    /// Archive boards.
    ArchiveBoards,
    /// Delete boards.
    DeleteBoards,
    /// Delete cards.
    DeleteCards,
    /// Apply one partial update to every card.
    UpdateCards,
}

impl BulkAction {
    /// Kind of resource the action targets.
    pub const fn resource(self) -> ResourceType {
        match self {
            Self::ArchiveWorkspaces => ResourceType::Workspace,
            Self::ArchiveBoards | Self::DeleteBoards => ResourceType::Board,
            Self::DeleteCards | Self::UpdateCards => ResourceType::Card,
        }
    }

    /// Human-readable name, e.g. `archive boards`.
    pub const fn label(self) -> &'static str {
        match self {
            Self::ArchiveWorkspaces => "archive workspaces",
            Self::ArchiveBoards => "archive boards",
            Self::DeleteBoards => "delete boards",
            Self::DeleteCards => "delete cards",
            Self::UpdateCards => "update cards",
        }
    }

    /// Whether the action removes or hides resources, and so warrants a
    /// dependency precheck.
    pub const fn is_destructive(self) -> bool {
        !matches!(self, Self::UpdateCards)
    }
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one id in a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemResult {
    /// Id the operation ran for.
    pub id: i64,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Failure reason; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkItemResult {
    /// Successful result for `id`.
    pub const fn succeeded(id: i64) -> Self {
        Self {
            id,
            success: true,
            error: None,
        }
    }

    /// Failed result for `id`.
    pub fn failed(id: i64, error: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Overall classification of a bulk run, used to shape the upstream response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOutcome {
    /// No ids were submitted.
    Empty,
    /// Every id succeeded.
    Completed,
    /// Some ids failed.
    PartialSuccess,
    /// Every id failed.
    Failed,
}

/// A failed id with its reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    /// Id that failed.
    pub id: i64,
    /// Failure reason.
    pub error: String,
}

/// Aggregate view of a bulk result array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSummary {
    /// Ids submitted.
    pub total: usize,
    /// Ids that succeeded.
    pub succeeded: usize,
    /// Failures in input order.
    pub failed: Vec<BulkFailure>,
}

impl BulkSummary {
    /// Summarize per-item results.
    pub fn from_results(results: &[BulkItemResult]) -> Self {
        let failed: Vec<BulkFailure> = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| BulkFailure {
                id: r.id,
                error: r.error.clone().unwrap_or_else(|| "unknown error".to_string()),
            })
            .collect();

        Self {
            total: results.len(),
            succeeded: results.len() - failed.len(),
            failed,
        }
    }

    /// Classify the run.
    pub fn outcome(&self) -> BulkOutcome {
        if self.total == 0 {
            BulkOutcome::Empty
        } else if self.failed.is_empty() {
            BulkOutcome::Completed
        } else if self.succeeded > 0 {
            BulkOutcome::PartialSuccess
        } else {
            BulkOutcome::Failed
        }
    }

    /// One-line human summary, e.g. `8 of 10 succeeded; failed: 3 (not found), 9 (timeout)`.
    pub fn describe(&self) -> String {
        let mut line = format!("{} of {} succeeded", self.succeeded, self.total);
        if !self.failed.is_empty() {
            let failures = self
                .failed
                .iter()
                .map(|f| format!("{} ({})", f.id, f.error))
                .collect::<Vec<_>>()
                .join(", ");
            line.push_str("; failed: ");
            line.push_str(&failures);
        }
        line
    }
}
