//! Department registry.
//!
//! # Responsibility
//! - Hold the set of valid department codes and their display names.
//!
//! # Invariants
//! - At most one entry per code; re-registration overwrites the name in
//!   place and keeps the original listing position.
//! - Listing order is registration order.

use crate::model::department::{Department, DepartmentCode};
use log::info;
use std::collections::HashMap;

/// Insertion-ordered department registry.
#[derive(Debug, Default, Clone)]
pub struct DepartmentRegistry {
    entries: Vec<Department>,
    index: HashMap<DepartmentCode, usize>,
}

impl DepartmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the department with `code`.
    ///
    /// Returns the replaced department, if any. Never fails and never
    /// touches documents.
    pub fn register(
        &mut self,
        code: impl Into<DepartmentCode>,
        name: impl Into<String>,
    ) -> Option<Department> {
        let department = Department::new(code, name);
        let replaced = match self.index.get(department.code.as_str()) {
            Some(&position) => Some(std::mem::replace(
                &mut self.entries[position],
                department.clone(),
            )),
            None => {
                self.index
                    .insert(department.code.clone(), self.entries.len());
                self.entries.push(department.clone());
                None
            }
        };

        info!(
            "event=department_register module=registry status=ok code={} replaced={}",
            department.code,
            replaced.is_some()
        );
        replaced
    }

    pub fn lookup(&self, code: &str) -> Option<&Department> {
        self.index.get(code).map(|&position| &self.entries[position])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    /// Returns departments in registration order.
    pub fn list(&self) -> &[Department] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
