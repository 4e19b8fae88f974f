//! Domain model for departments, documents and transfer audit records.
//!
//! # Responsibility
//! - Define the value types shared by registry, store, engine and scheduler.
//! - Keep history invariants checkable on any materialized document.
//!
//! # Invariants
//! - Departments compare by `code` only.
//! - Documents reference departments by code; the registry owns them.

pub mod department;
pub mod document;
