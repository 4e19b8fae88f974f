//! Observer channel for scheduler outcomes.
//!
//! The worker thread has no caller to return to, so fired and cancelled
//! tasks are reported here instead.

use crate::model::document::Document;
use crate::scheduler::task::ScheduledTransferTask;
use crate::service::transfer_service::TransferResult;
use log::{info, warn};
use std::sync::mpsc::{self, Receiver, Sender};

/// Outcome of one fired task. Failures are terminal; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireReport {
    pub task: ScheduledTransferTask,
    pub outcome: TransferResult<Document>,
}

impl FireReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Receives scheduler notifications.
///
/// `on_fired` runs on the worker thread; `on_cancelled` runs on whichever
/// thread cancelled or replaced the task. Implementations should return
/// quickly: the worker fires nothing else while a callback runs.
pub trait TransferObserver: Send + Sync {
    fn on_fired(&self, report: &FireReport);

    fn on_cancelled(&self, _task: &ScheduledTransferTask) {}
}

/// Observer that only writes log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TransferObserver for LogObserver {
    fn on_fired(&self, report: &FireReport) {
        match &report.outcome {
            Ok(document) => info!(
                "event=scheduled_transfer_done module=scheduler status=ok task_id={} department={}",
                report.task.task_id, document.current_department
            ),
            Err(err) => warn!(
                "event=scheduled_transfer_done module=scheduler status=error task_id={} error_code={} error={}",
                report.task.task_id,
                err.code(),
                err
            ),
        }
    }

    fn on_cancelled(&self, task: &ScheduledTransferTask) {
        info!(
            "event=scheduled_transfer_cancelled module=scheduler status=ok task_id={}",
            task.task_id
        );
    }
}

/// Event forwarded by `ChannelObserver`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    Fired(FireReport),
    Cancelled(ScheduledTransferTask),
}

/// Observer that forwards events over an mpsc channel for polling callers.
///
/// A dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: Sender<SchedulerEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, Receiver<SchedulerEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl TransferObserver for ChannelObserver {
    fn on_fired(&self, report: &FireReport) {
        let _ = self.sender.send(SchedulerEvent::Fired(report.clone()));
    }

    fn on_cancelled(&self, task: &ScheduledTransferTask) {
        let _ = self.sender.send(SchedulerEvent::Cancelled(task.clone()));
    }
}
