//! Scheduled task identity and state.

use crate::model::department::DepartmentCode;
use crate::model::document::DocumentId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Deterministic task identity derived from (document, source, target).
///
/// Independent of delay and call time, so rescheduling the same move maps
/// onto the same task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId {
    pub document_id: DocumentId,
    pub source_code: DepartmentCode,
    pub target_code: DepartmentCode,
}

impl TaskId {
    pub fn new(
        document_id: impl Into<DocumentId>,
        source_code: impl Into<DepartmentCode>,
        target_code: impl Into<DepartmentCode>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            source_code: source_code.into(),
            target_code: target_code.into(),
        }
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.document_id, self.source_code, self.target_code
        )
    }
}

/// Scheduled task lifecycle. `Fired` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    /// Timer elapsed and the transfer engine was invoked, whatever the outcome.
    Fired,
    Cancelled,
}

/// Snapshot of one deferred transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTransferTask {
    pub task_id: TaskId,
    /// Unix epoch milliseconds when `schedule` was called.
    pub scheduled_at: i64,
    /// Unix epoch milliseconds of the deadline.
    pub fire_at: i64,
    pub status: TaskStatus,
}

impl ScheduledTransferTask {
    pub fn document_id(&self) -> &str {
        &self.task_id.document_id
    }

    pub fn source_code(&self) -> &str {
        &self.task_id.source_code
    }

    pub fn target_code(&self) -> &str {
        &self.task_id.target_code
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    /// Milliseconds left until the deadline, clamped at zero.
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        self.fire_at.saturating_sub(now_ms).max(0)
    }
}
