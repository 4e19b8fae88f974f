//! Deferred (one-shot) transfer scheduling.
//!
//! # Responsibility
//! - Arrange a transfer to run after a delay without blocking the caller.
//! - Report every fired or cancelled task through an observer.
//!
//! # Invariants
//! - Exactly one background worker thread per scheduler.
//! - A task leaves the active index as soon as it stops being Pending.
//! - Fired tasks always go through `TransferService::transfer`.

pub mod deferred;
pub mod observer;
pub mod task;
