//! In-memory registry and store state.
//!
//! # Responsibility
//! - Hold the authoritative department and document maps.
//! - Enforce creation-time checks (duplicate ids, unknown departments).
//!
//! # Invariants
//! - These types are plain single-owner structs; callers that share them
//!   across threads wrap them in one lock (see `service::transfer_service`).
//! - Document mutation after creation goes through `append_transfer`,
//!   which is crate-private.

pub mod department_repo;
pub mod document_repo;
