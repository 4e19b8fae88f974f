//! Core domain logic for DocFlow document routing.
//! This crate is the single source of truth for ownership and audit
//! invariants; presentation layers only call its public operations.

pub mod clock;
pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scheduler;
pub mod service;

pub use config::{ConfigError, CoreConfig, SchedulerConfig, SCHEDULED_TRANSFER_REASON};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::department::{Department, DepartmentCode};
pub use model::document::{
    Document, DocumentId, DocumentValidationError, TransferRecord, CREATION_REASON,
};
pub use repo::department_repo::DepartmentRegistry;
pub use repo::document_repo::{DepartmentGroup, DocumentStore, StoreError, StoreResult};
pub use scheduler::deferred::{DeferredScheduler, SchedulerError};
pub use scheduler::observer::{
    ChannelObserver, FireReport, LogObserver, SchedulerEvent, TransferObserver,
};
pub use scheduler::task::{ScheduledTransferTask, TaskId, TaskStatus};
pub use service::transfer_service::{
    DepartmentSummary, StoreOverview, TransferError, TransferResult, TransferService,
    MANUAL_TRANSFER_REASON,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
