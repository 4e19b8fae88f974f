//! Document store.
//!
//! # Responsibility
//! - Own every `Document` and its transfer history.
//! - Answer listing and per-department grouping queries.
//!
//! # Invariants
//! - Document ids are unique; the first `add` wins.
//! - A document is only created in a registered department.
//! - `append_transfer` is crate-private so validation and audit stay
//!   coupled in the transfer engine.

use crate::clock::now_epoch_ms;
use crate::model::department::{Department, DepartmentCode};
use crate::model::document::{Document, DocumentId};
use crate::repo::department_repo::DepartmentRegistry;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Document creation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    DuplicateId(DocumentId),
    UnknownDepartment(DepartmentCode),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "document id already exists: {id}"),
            Self::UnknownDepartment(code) => write!(f, "department not registered: {code}"),
        }
    }
}

impl Error for StoreError {}

/// One department with the documents it currently owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentGroup {
    pub department: Department,
    pub documents: Vec<Document>,
}

/// Insertion-ordered document store.
#[derive(Debug, Default, Clone)]
pub struct DocumentStore {
    documents: HashMap<DocumentId, Document>,
    order: Vec<DocumentId>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a document owned by `department` with a creation record.
    ///
    /// # Errors
    /// - `DuplicateId` when `id` already exists (checked first).
    /// - `UnknownDepartment` when `department` is not registered.
    pub fn add(
        &mut self,
        registry: &DepartmentRegistry,
        id: impl Into<DocumentId>,
        title: impl Into<String>,
        content: impl Into<String>,
        department: &str,
    ) -> StoreResult<&Document> {
        let id = id.into();
        if self.documents.contains_key(id.as_str()) {
            warn!(
                "event=document_add module=store status=error error_code=duplicate_id document_id={id}"
            );
            return Err(StoreError::DuplicateId(id));
        }
        if !registry.contains(department) {
            warn!(
                "event=document_add module=store status=error error_code=unknown_department document_id={id} department={department}"
            );
            return Err(StoreError::UnknownDepartment(department.to_string()));
        }

        let document = Document::new(
            id.clone(),
            title.into(),
            content.into(),
            department.to_string(),
            now_epoch_ms(),
        );
        info!(
            "event=document_add module=store status=ok document_id={} department={}",
            document.id, document.current_department
        );
        self.order.push(id.clone());
        Ok(&*self.documents.entry(id).or_insert(document))
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    /// Returns documents in creation order.
    pub fn list_all(&self) -> Vec<&Document> {
        self.order
            .iter()
            .filter_map(|id| self.documents.get(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn count_by_department(&self, department: &str) -> usize {
        self.documents
            .values()
            .filter(|doc| doc.current_department == department)
            .count()
    }

    /// Groups documents by owner; every registered department gets an
    /// entry, in registry order, even when it owns nothing.
    pub fn group_by_department(&self, registry: &DepartmentRegistry) -> Vec<DepartmentGroup> {
        let mut groups: Vec<DepartmentGroup> = registry
            .list()
            .iter()
            .map(|department| DepartmentGroup {
                department: department.clone(),
                documents: Vec::new(),
            })
            .collect();
        let slots: HashMap<&str, usize> = registry
            .list()
            .iter()
            .enumerate()
            .map(|(position, department)| (department.code.as_str(), position))
            .collect();

        for document in self.list_all() {
            if let Some(&position) = slots.get(document.current_department.as_str()) {
                groups[position].documents.push(document.clone());
            }
        }
        groups
    }

    /// Appends one audit record and moves ownership.
    ///
    /// Returns `None` when the document does not exist. Performs no
    /// ownership checks; those belong to the transfer engine.
    pub(crate) fn append_transfer(
        &mut self,
        id: &str,
        source: &Department,
        target: &Department,
        reason: &str,
    ) -> Option<&Document> {
        let document = self.documents.get_mut(id)?;
        document.apply_transfer(
            source.code.clone(),
            target.code.clone(),
            reason.to_string(),
            now_epoch_ms(),
        );
        Some(&*document)
    }
}
