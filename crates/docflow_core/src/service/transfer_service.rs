//! Transfer engine and thread-safe core facade.
//!
//! # Responsibility
//! - Validate and execute document moves, appending the audit record.
//! - Serve registry and store queries from one consistent state.
//!
//! # Invariants
//! - One store-level `RwLock` guards departments and documents together, so
//!   a transfer's check-then-append sequence never interleaves with another
//!   transfer and readers never observe a half-applied move.
//! - A failed transfer leaves state untouched.
//! - `reason` is stored verbatim and never validated.
//! - Every mutation after creation (manual or scheduled) goes through
//!   `transfer`.

use crate::model::department::{Department, DepartmentCode};
use crate::model::document::{Document, DocumentId, TransferRecord};
use crate::repo::department_repo::DepartmentRegistry;
use crate::repo::document_repo::{DepartmentGroup, DocumentStore, StoreResult};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Reason used by interactive callers for immediate moves.
pub const MANUAL_TRANSFER_REASON: &str = "manual transfer";

pub type TransferResult<T> = Result<T, TransferError>;

/// Transfer precondition failures, in check order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    DocumentNotFound(DocumentId),
    DepartmentNotFound(DepartmentCode),
    /// The document is not owned by the stated source department.
    SourceMismatch {
        document_id: DocumentId,
        stated: DepartmentCode,
        actual: DepartmentCode,
    },
}

impl TransferError {
    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DocumentNotFound(_) => "document_not_found",
            Self::DepartmentNotFound(_) => "department_not_found",
            Self::SourceMismatch { .. } => "source_mismatch",
        }
    }
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentNotFound(id) => write!(f, "document not found: {id}"),
            Self::DepartmentNotFound(code) => write!(f, "department not found: {code}"),
            Self::SourceMismatch {
                document_id,
                stated,
                actual,
            } => write!(
                f,
                "document {document_id} is in `{actual}`, not in stated source `{stated}`"
            ),
        }
    }
}

impl Error for TransferError {}

/// Department row with its current document count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentSummary {
    pub code: DepartmentCode,
    pub name: String,
    pub document_count: usize,
}

/// Store-wide counters for dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOverview {
    pub total_documents: usize,
    pub total_departments: usize,
}

#[derive(Debug, Default)]
struct CoreState {
    departments: DepartmentRegistry,
    documents: DocumentStore,
}

/// Shared handle over the department registry, document store and
/// transfer engine. Cloning is cheap and every clone sees the same state.
#[derive(Debug, Clone, Default)]
pub struct TransferService {
    state: Arc<RwLock<CoreState>>,
}

impl TransferService {
    pub fn new() -> Self {
        Self::default()
    }

    // Mutations are all-or-nothing before any foreign code runs, so a
    // poisoned lock still guards consistent state.
    fn read(&self) -> RwLockReadGuard<'_, CoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or overwrites a department. Returns the replaced entry.
    pub fn register_department(
        &self,
        code: impl Into<DepartmentCode>,
        name: impl Into<String>,
    ) -> Option<Department> {
        self.write().departments.register(code, name)
    }

    pub fn department(&self, code: &str) -> Option<Department> {
        self.read().departments.lookup(code).cloned()
    }

    /// Returns departments in registration order.
    pub fn departments(&self) -> Vec<Department> {
        self.read().departments.list().to_vec()
    }

    /// Creates a document in `department` and returns a snapshot of it.
    pub fn add_document(
        &self,
        id: impl Into<DocumentId>,
        title: impl Into<String>,
        content: impl Into<String>,
        department: &str,
    ) -> StoreResult<Document> {
        let mut state = self.write();
        let CoreState {
            departments,
            documents,
        } = &mut *state;
        documents
            .add(departments, id, title, content, department)
            .cloned()
    }

    pub fn document(&self, id: &str) -> Option<Document> {
        self.read().documents.get(id).cloned()
    }

    /// Returns all documents in creation order.
    pub fn documents(&self) -> Vec<Document> {
        self.read()
            .documents
            .list_all()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn count_by_department(&self, department: &str) -> usize {
        self.read().documents.count_by_department(department)
    }

    /// Groups documents by owner, one entry per registered department.
    pub fn group_by_department(&self) -> Vec<DepartmentGroup> {
        let state = self.read();
        state.documents.group_by_department(&state.departments)
    }

    /// Returns one row per department with its document count.
    pub fn department_summaries(&self) -> Vec<DepartmentSummary> {
        let state = self.read();
        state
            .departments
            .list()
            .iter()
            .map(|department| DepartmentSummary {
                code: department.code.clone(),
                name: department.name.clone(),
                document_count: state.documents.count_by_department(&department.code),
            })
            .collect()
    }

    pub fn overview(&self) -> StoreOverview {
        let state = self.read();
        StoreOverview {
            total_documents: state.documents.len(),
            total_departments: state.departments.len(),
        }
    }

    /// Moves a document from `source_code` to `target_code`.
    ///
    /// # Errors
    /// Checked in order, each leaving state unchanged:
    /// - `DocumentNotFound` when the document does not exist.
    /// - `DepartmentNotFound` when the source, then the target, is unknown.
    /// - `SourceMismatch` when the document is not owned by `source_code`.
    pub fn transfer(
        &self,
        document_id: &str,
        source_code: &str,
        target_code: &str,
        reason: &str,
    ) -> TransferResult<Document> {
        let mut state = self.write();
        let outcome =
            Self::transfer_locked(&mut state, document_id, source_code, target_code, reason);
        drop(state);

        match &outcome {
            Ok(document) => info!(
                "event=document_transfer module=transfer status=ok document_id={} source={} target={} history_len={}",
                document.id,
                source_code,
                target_code,
                document.history.len()
            ),
            Err(err) => warn!(
                "event=document_transfer module=transfer status=error error_code={} document_id={} source={} target={}",
                err.code(),
                document_id,
                source_code,
                target_code
            ),
        }
        outcome
    }

    fn transfer_locked(
        state: &mut CoreState,
        document_id: &str,
        source_code: &str,
        target_code: &str,
        reason: &str,
    ) -> TransferResult<Document> {
        let current = match state.documents.get(document_id) {
            Some(document) => document.current_department.clone(),
            None => return Err(TransferError::DocumentNotFound(document_id.to_string())),
        };
        let source = state
            .departments
            .lookup(source_code)
            .cloned()
            .ok_or_else(|| TransferError::DepartmentNotFound(source_code.to_string()))?;
        let target = state
            .departments
            .lookup(target_code)
            .cloned()
            .ok_or_else(|| TransferError::DepartmentNotFound(target_code.to_string()))?;
        if current != source.code {
            return Err(TransferError::SourceMismatch {
                document_id: document_id.to_string(),
                stated: source.code,
                actual: current,
            });
        }

        state
            .documents
            .append_transfer(document_id, &source, &target, reason)
            .cloned()
            .ok_or_else(|| TransferError::DocumentNotFound(document_id.to_string()))
    }

    /// Returns the ordered audit trail, or `None` for an unknown document.
    pub fn history(&self, document_id: &str) -> Option<Vec<TransferRecord>> {
        self.read()
            .documents
            .get(document_id)
            .map(|document| document.history.clone())
    }
}
