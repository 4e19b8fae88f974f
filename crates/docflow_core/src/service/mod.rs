//! Core use-case services.
//!
//! # Responsibility
//! - Expose the transfer engine and registry/store queries behind one
//!   thread-safe handle.
//! - Keep presentation layers decoupled from locking and storage details.

pub mod transfer_service;
