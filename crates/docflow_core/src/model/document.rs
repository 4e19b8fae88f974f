//! Document and transfer audit model.
//!
//! # Responsibility
//! - Define the document aggregate and its append-only transfer history.
//! - Validate history chain invariants for any materialized document.
//!
//! # Invariants
//! - `history` is never empty; the first record is the creation record and
//!   has no source.
//! - Every later record's `source` equals the previous record's `target`.
//! - Record timestamps are strictly increasing.
//! - `current_department` equals the `target` of the last record.

use crate::clock::next_after;
use crate::model::department::DepartmentCode;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller-supplied unique document identifier, e.g. `DOC001`.
pub type DocumentId = String;

/// Reason stored on the synthetic first history record.
pub const CREATION_REASON: &str = "creation";

/// Immutable audit entry for one ownership change (or creation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Previous owner. `None` only for the creation record.
    pub source: Option<DepartmentCode>,
    /// New owner.
    pub target: DepartmentCode,
    /// Free text stored verbatim, e.g. `manual transfer`.
    pub reason: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

impl Display for TransferRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let source = self.source.as_deref().unwrap_or("creation");
        write!(
            f,
            "{source} -> {}: {} @{}",
            self.target, self.reason, self.timestamp
        )
    }
}

/// Document owned by exactly one department at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DocumentWire")]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    /// Opaque body; never interpreted or logged by core.
    pub content: String,
    pub current_department: DepartmentCode,
    pub history: Vec<TransferRecord>,
    /// Unix epoch milliseconds of the creation record.
    pub created_at: i64,
    /// Unix epoch milliseconds of the newest record.
    pub updated_at: i64,
}

impl Document {
    /// Creates a document with its synthetic creation record.
    pub(crate) fn new(
        id: DocumentId,
        title: String,
        content: String,
        department: DepartmentCode,
        now: i64,
    ) -> Self {
        Self {
            id,
            title,
            content,
            current_department: department.clone(),
            history: vec![TransferRecord {
                source: None,
                target: department,
                reason: CREATION_REASON.to_string(),
                timestamp: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends one transfer record and moves ownership to `target`.
    ///
    /// Callers are responsible for checking that `source` is the current
    /// owner; this only keeps timestamps ordered.
    pub(crate) fn apply_transfer(
        &mut self,
        source: DepartmentCode,
        target: DepartmentCode,
        reason: String,
        now: i64,
    ) -> &TransferRecord {
        let timestamp = next_after(self.updated_at, now);
        self.history.push(TransferRecord {
            source: Some(source),
            target: target.clone(),
            reason,
            timestamp,
        });
        self.current_department = target;
        self.updated_at = timestamp;
        &self.history[self.history.len() - 1]
    }

    /// Returns the newest history record.
    pub fn last_record(&self) -> Option<&TransferRecord> {
        self.history.last()
    }

    /// Checks history chain invariants.
    pub fn validate(&self) -> Result<(), DocumentValidationError> {
        let Some(first) = self.history.first() else {
            return Err(DocumentValidationError::EmptyHistory);
        };
        if first.source.is_some() {
            return Err(DocumentValidationError::CreationHasSource);
        }

        for (index, pair) in self.history.windows(2).enumerate() {
            let (previous, record) = (&pair[0], &pair[1]);
            let index = index + 1;
            match record.source.as_deref() {
                None => return Err(DocumentValidationError::MissingSource { index }),
                Some(source) if source != previous.target => {
                    return Err(DocumentValidationError::BrokenChain {
                        index,
                        expected: previous.target.clone(),
                        found: source.to_string(),
                    });
                }
                Some(_) => {}
            }
            if record.timestamp <= previous.timestamp {
                return Err(DocumentValidationError::TimestampNotIncreasing { index });
            }
        }

        if let Some(last) = self.history.last() {
            if last.target != self.current_department {
                return Err(DocumentValidationError::CurrentDepartmentMismatch {
                    current: self.current_department.clone(),
                    last_target: last.target.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} @ {}",
            self.id, self.title, self.current_department
        )
    }
}

/// History invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentValidationError {
    EmptyHistory,
    CreationHasSource,
    MissingSource {
        index: usize,
    },
    BrokenChain {
        index: usize,
        expected: DepartmentCode,
        found: DepartmentCode,
    },
    TimestampNotIncreasing {
        index: usize,
    },
    CurrentDepartmentMismatch {
        current: DepartmentCode,
        last_target: DepartmentCode,
    },
}

impl Display for DocumentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyHistory => write!(f, "document history must not be empty"),
            Self::CreationHasSource => write!(f, "creation record must not have a source"),
            Self::MissingSource { index } => {
                write!(f, "history record {index} is missing its source")
            }
            Self::BrokenChain {
                index,
                expected,
                found,
            } => write!(
                f,
                "history record {index} starts at `{found}` but previous record ends at `{expected}`"
            ),
            Self::TimestampNotIncreasing { index } => {
                write!(f, "history record {index} is not newer than its predecessor")
            }
            Self::CurrentDepartmentMismatch {
                current,
                last_target,
            } => write!(
                f,
                "current department `{current}` does not match last history target `{last_target}`"
            ),
        }
    }
}

impl Error for DocumentValidationError {}

#[derive(Deserialize)]
struct DocumentWire {
    id: DocumentId,
    title: String,
    content: String,
    current_department: DepartmentCode,
    history: Vec<TransferRecord>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<DocumentWire> for Document {
    type Error = DocumentValidationError;

    fn try_from(wire: DocumentWire) -> Result<Self, Self::Error> {
        let document = Self {
            id: wire.id,
            title: wire.title,
            content: wire.content,
            current_department: wire.current_department,
            history: wire.history,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        };
        document.validate()?;
        Ok(document)
    }
}
