//! Single-worker deferred transfer scheduler.
//!
//! # Responsibility
//! - Hold one-shot timers in a deadline-ordered queue.
//! - Fire due tasks through `TransferService::transfer` on one worker thread.
//! - Support cancellation until the worker claims a task.
//!
//! # Invariants
//! - At most one armed timer per `TaskId`; scheduling an already pending
//!   task cancels the old timer and arms the new one atomically.
//! - Cancelled and replaced timers leave no entry behind in the queue.
//! - The worker claims a task (Pending -> Fired) under the state lock and
//!   only then calls the engine, so `cancel` either wins cleanly or
//!   returns false.
//! - No lock is held while the engine or an observer runs.
//! - After `shutdown` nothing fires and nothing new is accepted.

use crate::clock::now_epoch_ms;
use crate::config::SchedulerConfig;
use crate::scheduler::observer::{FireReport, TransferObserver};
use crate::scheduler::task::{ScheduledTransferTask, TaskId, TaskStatus};
use crate::service::transfer_service::TransferService;
use log::{debug, error, info};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use uuid::Uuid;

// Deadline used when `now + delay` overflows `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Scheduler operation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// No pending task with this id (never scheduled, fired or cancelled).
    TaskNotFound(TaskId),
    /// The scheduler no longer accepts timers.
    ShutDown,
    /// The worker thread could not be started.
    WorkerSpawn(String),
}

impl Display for SchedulerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(task_id) => write!(f, "no pending scheduled transfer: {task_id}"),
            Self::ShutDown => write!(f, "scheduler is shut down"),
            Self::WorkerSpawn(message) => {
                write!(f, "failed to start scheduler worker: {message}")
            }
        }
    }
}

impl Error for SchedulerError {}

struct ArmedTimer {
    timer_id: Uuid,
    task: ScheduledTransferTask,
}

// Field order drives the derived ordering: deadline first, then FIFO.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct QueueEntry {
    deadline: Instant,
    sequence: u64,
    task_id: TaskId,
    timer_id: Uuid,
}

#[derive(Default)]
struct SchedulerState {
    active: HashMap<TaskId, ArmedTimer>,
    queue: BinaryHeap<Reverse<QueueEntry>>,
    next_sequence: u64,
    shutting_down: bool,
}

impl SchedulerState {
    /// Arms `task` at `deadline`. A timer already armed for the same id is
    /// disarmed and returned.
    fn arm(
        &mut self,
        task: ScheduledTransferTask,
        deadline: Instant,
    ) -> Option<ScheduledTransferTask> {
        let replaced = self.disarm(&task.task_id);
        let timer_id = Uuid::new_v4();
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.push(Reverse(QueueEntry {
            deadline,
            sequence,
            task_id: task.task_id.clone(),
            timer_id,
        }));
        self.active
            .insert(task.task_id.clone(), ArmedTimer { timer_id, task });
        replaced
    }

    /// Removes the armed timer for `task_id` together with its queue entry.
    fn disarm(&mut self, task_id: &TaskId) -> Option<ScheduledTransferTask> {
        let armed = self.active.remove(task_id)?;
        self.queue
            .retain(|Reverse(entry)| entry.timer_id != armed.timer_id);
        Some(armed.task)
    }

    /// Pops the head entry if it still belongs to an armed timer and claims
    /// the task as fired. Stale entries are dropped.
    fn claim_head(&mut self) -> Option<ScheduledTransferTask> {
        let Reverse(entry) = self.queue.pop()?;
        let is_armed = self
            .active
            .get(&entry.task_id)
            .is_some_and(|armed| armed.timer_id == entry.timer_id);
        if !is_armed {
            return None;
        }
        let mut task = self.active.remove(&entry.task_id)?.task;
        task.status = TaskStatus::Fired;
        Some(task)
    }
}

struct Shared {
    state: Mutex<SchedulerState>,
    wakeup: Condvar,
    service: TransferService,
    observer: Arc<dyn TransferObserver>,
    reason: String,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_cancelled(&self, task: &ScheduledTransferTask) {
        let observer = &self.observer;
        if catch_unwind(AssertUnwindSafe(|| observer.on_cancelled(task))).is_err() {
            error!(
                "event=observer_panic module=scheduler status=error callback=on_cancelled task_id={}",
                task.task_id
            );
        }
    }

    fn notify_fired(&self, report: &FireReport) {
        let observer = &self.observer;
        if catch_unwind(AssertUnwindSafe(|| observer.on_fired(report))).is_err() {
            error!(
                "event=observer_panic module=scheduler status=error callback=on_fired task_id={}",
                report.task.task_id
            );
        }
    }
}

/// One-shot delayed transfer scheduler backed by a single worker thread.
///
/// Dropping the scheduler shuts it down.
pub struct DeferredScheduler {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DeferredScheduler {
    /// Starts the worker thread.
    ///
    /// # Errors
    /// - `WorkerSpawn` when the OS refuses to create the thread.
    pub fn start(
        service: TransferService,
        observer: Arc<dyn TransferObserver>,
        config: SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        let shared = Arc::new(Shared {
            state: Mutex::new(SchedulerState::default()),
            wakeup: Condvar::new(),
            service,
            observer,
            reason: config.scheduled_reason,
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(config.worker_thread_name.clone())
            .spawn(move || run_worker(worker_shared))
            .map_err(|err| {
                error!(
                    "event=scheduler_start module=scheduler status=error error_code=spawn_failed error={err}"
                );
                SchedulerError::WorkerSpawn(err.to_string())
            })?;

        info!(
            "event=scheduler_start module=scheduler status=ok thread={}",
            config.worker_thread_name
        );
        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Arms a one-shot transfer after `delay` and returns immediately.
    ///
    /// A zero delay fires as soon as the worker gets to it. If the same
    /// (document, source, target) task is already pending, its timer is
    /// cancelled (and reported to the observer) and replaced.
    ///
    /// # Errors
    /// - `ShutDown` after `shutdown` was called.
    pub fn schedule(
        &self,
        document_id: &str,
        source_code: &str,
        target_code: &str,
        delay: Duration,
    ) -> Result<TaskId, SchedulerError> {
        let task_id = TaskId::new(document_id, source_code, target_code);
        let started = Instant::now();
        let deadline = started
            .checked_add(delay)
            .or_else(|| started.checked_add(FAR_FUTURE))
            .unwrap_or(started);
        let now_ms = now_epoch_ms();
        let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        let task = ScheduledTransferTask {
            task_id: task_id.clone(),
            scheduled_at: now_ms,
            fire_at: now_ms.saturating_add(delay_ms),
            status: TaskStatus::Pending,
        };

        let replaced = {
            let mut state = self.shared.lock();
            if state.shutting_down {
                info!(
                    "event=transfer_schedule module=scheduler status=rejected reason=shut_down task_id={task_id}"
                );
                return Err(SchedulerError::ShutDown);
            }
            state.arm(task, deadline)
        };
        self.shared.wakeup.notify_all();

        info!(
            "event=transfer_schedule module=scheduler status=ok task_id={task_id} delay_ms={delay_ms} replaced={}",
            replaced.is_some()
        );
        if let Some(mut previous) = replaced {
            previous.status = TaskStatus::Cancelled;
            self.shared.notify_cancelled(&previous);
        }
        Ok(task_id)
    }

    /// Cancels a pending task. Returns `false` when there is nothing
    /// pending to cancel, including when the worker already claimed it.
    pub fn cancel(&self, document_id: &str, source_code: &str, target_code: &str) -> bool {
        self.try_cancel(document_id, source_code, target_code)
            .is_ok()
    }

    /// Cancels a pending task and returns its final snapshot.
    ///
    /// # Errors
    /// - `TaskNotFound` when no task with this id is pending.
    pub fn try_cancel(
        &self,
        document_id: &str,
        source_code: &str,
        target_code: &str,
    ) -> Result<ScheduledTransferTask, SchedulerError> {
        let task_id = TaskId::new(document_id, source_code, target_code);
        let removed = self.shared.lock().disarm(&task_id);
        let Some(mut task) = removed else {
            debug!(
                "event=transfer_cancel module=scheduler status=not_found task_id={task_id}"
            );
            return Err(SchedulerError::TaskNotFound(task_id));
        };
        // The queue head may have changed; let the worker re-arm its wait.
        self.shared.wakeup.notify_all();

        task.status = TaskStatus::Cancelled;
        info!("event=transfer_cancel module=scheduler status=ok task_id={task_id}");
        self.shared.notify_cancelled(&task);
        Ok(task)
    }

    /// Returns the pending task with `task_id`, if any.
    pub fn task(&self, task_id: &TaskId) -> Option<ScheduledTransferTask> {
        self.shared
            .lock()
            .active
            .get(task_id)
            .map(|armed| armed.task.clone())
    }

    /// Returns pending tasks ordered by deadline.
    pub fn pending_tasks(&self) -> Vec<ScheduledTransferTask> {
        let mut tasks: Vec<ScheduledTransferTask> = self
            .shared
            .lock()
            .active
            .values()
            .map(|armed| armed.task.clone())
            .collect();
        tasks.sort_by(|a, b| {
            a.fire_at
                .cmp(&b.fire_at)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        tasks
    }

    pub fn pending_count(&self) -> usize {
        self.shared.lock().active.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().shutting_down
    }

    /// Stops the worker and discards pending timers without firing them.
    ///
    /// Idempotent. Waits for an in-flight fire callback to finish, except
    /// when called from that callback itself.
    pub fn shutdown(&self) {
        let discarded = {
            let mut state = self.shared.lock();
            if state.shutting_down {
                None
            } else {
                state.shutting_down = true;
                let discarded = state.active.len();
                state.active.clear();
                state.queue.clear();
                Some(discarded)
            }
        };
        self.shared.wakeup.notify_all();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                error!("event=scheduler_shutdown module=scheduler status=error error_code=worker_panicked");
            }
        }

        if let Some(discarded) = discarded {
            info!(
                "event=scheduler_shutdown module=scheduler status=ok discarded_tasks={discarded}"
            );
        }
    }
}

impl Drop for DeferredScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: Arc<Shared>) {
    debug!("event=scheduler_worker module=scheduler status=start");
    while let Some(task) = next_due(&shared) {
        fire(&shared, task);
    }
    debug!("event=scheduler_worker module=scheduler status=stop");
}

/// Blocks until a task is due (returns it claimed) or shutdown (`None`).
fn next_due(shared: &Shared) -> Option<ScheduledTransferTask> {
    let mut state = shared.lock();
    loop {
        if state.shutting_down {
            return None;
        }
        let now = Instant::now();
        let head_deadline = state.queue.peek().map(|Reverse(entry)| entry.deadline);
        match head_deadline {
            None => {
                state = shared
                    .wakeup
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            Some(deadline) if deadline > now => {
                state = shared
                    .wakeup
                    .wait_timeout(state, deadline - now)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
            }
            Some(_) => {
                if let Some(task) = state.claim_head() {
                    return Some(task);
                }
            }
        }
    }
}

fn fire(shared: &Shared, task: ScheduledTransferTask) {
    let lateness_ms = now_epoch_ms().saturating_sub(task.fire_at).max(0);
    info!(
        "event=scheduled_transfer_fire module=scheduler status=start task_id={} lateness_ms={lateness_ms}",
        task.task_id
    );
    let outcome = shared.service.transfer(
        task.document_id(),
        task.source_code(),
        task.target_code(),
        &shared.reason,
    );
    shared.notify_fired(&FireReport { task, outcome });
}
