use docflow_core::{
    ChannelObserver, DeferredScheduler, FireReport, LogObserver, SchedulerConfig, SchedulerError,
    SchedulerEvent, ScheduledTransferTask, TaskId, TaskStatus, TransferError, TransferObserver,
    TransferService,
};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

fn seeded() -> TransferService {
    let service = TransferService::new();
    service.register_department("FIN", "Financeiro");
    service.register_department("RH", "Recursos Humanos");
    service.register_department("TI", "Tecnologia da Informação");
    service.register_department("JUR", "Jurídico");
    service
        .add_document("DOC001", "Relatório Financeiro Q1", "", "FIN")
        .unwrap();
    service
        .add_document("DOC002", "Contratações Pendentes", "", "RH")
        .unwrap();
    service
}

fn start_with_channel(service: &TransferService) -> (DeferredScheduler, Receiver<SchedulerEvent>) {
    let (observer, events) = ChannelObserver::new();
    let scheduler =
        DeferredScheduler::start(service.clone(), Arc::new(observer), SchedulerConfig::default())
            .unwrap();
    (scheduler, events)
}

fn expect_fired(events: &Receiver<SchedulerEvent>) -> FireReport {
    match events.recv_timeout(EVENT_TIMEOUT) {
        Ok(SchedulerEvent::Fired(report)) => report,
        other => panic!("expected fired event, got {other:?}"),
    }
}

#[test]
fn scheduled_transfer_fires_after_delay() {
    let service = seeded();
    let (scheduler, _events) = start_with_channel(&service);

    let task_id = scheduler
        .schedule("DOC002", "RH", "TI", Duration::from_secs(1))
        .unwrap();
    assert_eq!(task_id, TaskId::new("DOC002", "RH", "TI"));
    assert_eq!(task_id.to_string(), "DOC002_RH_TI");
    assert_eq!(scheduler.pending_count(), 1);

    thread::sleep(Duration::from_secs(2));

    let doc = service.document("DOC002").unwrap();
    assert_eq!(doc.current_department, "TI");
    assert_eq!(doc.history.len(), 2);
    assert_eq!(doc.last_record().unwrap().reason, "scheduled transfer");
    assert_eq!(scheduler.pending_count(), 0);
    assert!(scheduler.task(&task_id).is_none());
}

#[test]
fn fired_report_carries_task_and_outcome() {
    let service = seeded();
    let (scheduler, events) = start_with_channel(&service);

    scheduler
        .schedule("DOC002", "RH", "TI", Duration::from_millis(50))
        .unwrap();
    let report = expect_fired(&events);

    assert!(report.is_success());
    assert_eq!(report.task.status, TaskStatus::Fired);
    assert_eq!(report.task.document_id(), "DOC002");
    assert_eq!(report.task.source_code(), "RH");
    assert_eq!(report.task.target_code(), "TI");
    assert_eq!(report.outcome.unwrap().current_department, "TI");
}

// Same flow as `cancel_within_one_second_of_five_second_delay`, scaled
// down to 500 ms / 50 ms.
#[test]
fn cancel_before_shortened_deadline_prevents_transfer() {
    let service = seeded();
    let (scheduler, events) = start_with_channel(&service);

    scheduler
        .schedule("DOC002", "RH", "TI", Duration::from_millis(500))
        .unwrap();
    thread::sleep(Duration::from_millis(50));
    assert!(scheduler.cancel("DOC002", "RH", "TI"));

    match events.recv_timeout(EVENT_TIMEOUT) {
        Ok(SchedulerEvent::Cancelled(task)) => {
            assert_eq!(task.status, TaskStatus::Cancelled);
            assert_eq!(task.task_id, TaskId::new("DOC002", "RH", "TI"));
        }
        other => panic!("expected cancelled event, got {other:?}"),
    }

    thread::sleep(Duration::from_millis(800));
    let doc = service.document("DOC002").unwrap();
    assert_eq!(doc.current_department, "RH");
    assert_eq!(doc.history.len(), 1);
    assert!(events.try_recv().is_err(), "cancelled task must not fire");
}

#[test]
#[ignore = "slow: waits out the full five second delay"]
fn cancel_within_one_second_of_five_second_delay() {
    let service = seeded();
    let (scheduler, events) = start_with_channel(&service);

    scheduler
        .schedule("DOC002", "RH", "TI", Duration::from_secs(5))
        .unwrap();
    thread::sleep(Duration::from_millis(500));
    assert!(scheduler.cancel("DOC002", "RH", "TI"));

    thread::sleep(Duration::from_secs(5));
    let doc = service.document("DOC002").unwrap();
    assert_eq!(doc.current_department, "RH");
    assert_eq!(doc.history.len(), 1);
    assert!(matches!(events.try_recv(), Ok(SchedulerEvent::Cancelled(_))));
    assert!(events.try_recv().is_err(), "cancelled task must not fire");
}

#[test]
fn cancel_is_false_the_second_time() {
    let service = seeded();
    let (scheduler, _events) = start_with_channel(&service);

    scheduler
        .schedule("DOC002", "RH", "TI", Duration::from_secs(5))
        .unwrap();
    assert!(scheduler.cancel("DOC002", "RH", "TI"));
    assert!(!scheduler.cancel("DOC002", "RH", "TI"));
    assert_eq!(
        scheduler.try_cancel("DOC002", "RH", "TI").unwrap_err(),
        SchedulerError::TaskNotFound(TaskId::new("DOC002", "RH", "TI"))
    );
    assert_eq!(service.document("DOC002").unwrap().history.len(), 1);
}

#[test]
fn cancel_unknown_or_fired_task_returns_false() {
    let service = seeded();
    let (scheduler, events) = start_with_channel(&service);

    assert!(!scheduler.cancel("DOC404", "RH", "TI"));

    scheduler
        .schedule("DOC002", "RH", "TI", Duration::ZERO)
        .unwrap();
    expect_fired(&events);
    assert!(!scheduler.cancel("DOC002", "RH", "TI"));
    assert_eq!(service.document("DOC002").unwrap().current_department, "TI");
}

#[test]
fn failed_scheduled_transfer_is_reported_and_worker_keeps_running() {
    let service = seeded();
    let (scheduler, events) = start_with_channel(&service);

    // DOC001 lives in FIN, not RH.
    scheduler
        .schedule("DOC001", "RH", "TI", Duration::ZERO)
        .unwrap();
    let report = expect_fired(&events);
    assert!(!report.is_success());
    assert!(matches!(
        report.outcome,
        Err(TransferError::SourceMismatch { .. })
    ));
    assert_eq!(service.document("DOC001").unwrap().history.len(), 1);

    scheduler
        .schedule("DOC001", "FIN", "JUR", Duration::ZERO)
        .unwrap();
    assert!(expect_fired(&events).is_success());
}

#[test]
fn rescheduling_same_triple_replaces_pending_timer() {
    let service = seeded();
    let (scheduler, events) = start_with_channel(&service);

    let first = scheduler
        .schedule("DOC002", "RH", "TI", Duration::from_millis(100))
        .unwrap();
    let second = scheduler
        .schedule("DOC002", "RH", "TI", Duration::from_millis(300))
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(scheduler.pending_count(), 1);

    match events.recv_timeout(EVENT_TIMEOUT) {
        Ok(SchedulerEvent::Cancelled(task)) => assert_eq!(task.status, TaskStatus::Cancelled),
        other => panic!("expected replaced timer to be cancelled, got {other:?}"),
    }
    let report = expect_fired(&events);
    assert!(report.is_success());

    thread::sleep(Duration::from_millis(200));
    assert!(events.try_recv().is_err(), "only one timer may fire");
    assert_eq!(service.document("DOC002").unwrap().history.len(), 2);
}

#[test]
fn pending_tasks_are_ordered_by_deadline() {
    let service = seeded();
    let (scheduler, _events) = start_with_channel(&service);

    scheduler
        .schedule("DOC001", "FIN", "JUR", Duration::from_secs(60))
        .unwrap();
    scheduler
        .schedule("DOC002", "RH", "TI", Duration::from_secs(30))
        .unwrap();

    let pending: Vec<ScheduledTransferTask> = scheduler.pending_tasks();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].document_id(), "DOC002");
    assert_eq!(pending[1].document_id(), "DOC001");
    assert!(pending.iter().all(ScheduledTransferTask::is_pending));
    assert!(pending[0].fire_at - pending[0].scheduled_at >= 30_000);

    let looked_up = scheduler
        .task(&TaskId::new("DOC001", "FIN", "JUR"))
        .expect("pending task is indexed");
    assert_eq!(looked_up, pending[1]);
}

#[test]
fn shutdown_discards_pending_and_rejects_new_work() {
    let service = seeded();
    let (scheduler, events) = start_with_channel(&service);

    scheduler
        .schedule("DOC002", "RH", "TI", Duration::from_millis(200))
        .unwrap();
    scheduler.shutdown();
    scheduler.shutdown();

    assert!(scheduler.is_shut_down());
    assert_eq!(scheduler.pending_count(), 0);
    assert!(!scheduler.cancel("DOC002", "RH", "TI"));
    assert_eq!(
        scheduler
            .schedule("DOC001", "FIN", "JUR", Duration::ZERO)
            .unwrap_err(),
        SchedulerError::ShutDown
    );

    thread::sleep(Duration::from_millis(400));
    assert_eq!(service.document("DOC002").unwrap().current_department, "RH");
    assert!(events.try_recv().is_err());
}

struct ShutdownOnFire {
    scheduler: Mutex<Option<Arc<DeferredScheduler>>>,
    done: Mutex<Sender<()>>,
}

impl TransferObserver for ShutdownOnFire {
    fn on_fired(&self, _report: &FireReport) {
        let scheduler = self.scheduler.lock().unwrap().take();
        if let Some(scheduler) = scheduler {
            scheduler.shutdown();
        }
        let _ = self.done.lock().unwrap().send(());
    }
}

#[test]
fn shutdown_from_fire_callback_does_not_deadlock() {
    let service = seeded();
    let (done_tx, done_rx) = mpsc::channel();
    let observer = Arc::new(ShutdownOnFire {
        scheduler: Mutex::new(None),
        done: Mutex::new(done_tx),
    });
    let scheduler = Arc::new(
        DeferredScheduler::start(service.clone(), observer.clone(), SchedulerConfig::default())
            .unwrap(),
    );
    *observer.scheduler.lock().unwrap() = Some(Arc::clone(&scheduler));

    scheduler
        .schedule("DOC002", "RH", "TI", Duration::ZERO)
        .unwrap();
    done_rx
        .recv_timeout(EVENT_TIMEOUT)
        .expect("fire callback should complete");

    assert!(scheduler.is_shut_down());
    scheduler.shutdown();
    assert_eq!(service.document("DOC002").unwrap().current_department, "TI");
}

struct PanickingObserver {
    fired: Mutex<Sender<String>>,
}

impl TransferObserver for PanickingObserver {
    fn on_fired(&self, report: &FireReport) {
        let _ = self
            .fired
            .lock()
            .unwrap()
            .send(report.task.document_id().to_string());
        panic!("observer failure");
    }
}

#[test]
fn observer_panic_does_not_stop_the_worker() {
    let service = seeded();
    let (fired_tx, fired_rx) = mpsc::channel();
    let scheduler = DeferredScheduler::start(
        service.clone(),
        Arc::new(PanickingObserver {
            fired: Mutex::new(fired_tx),
        }),
        SchedulerConfig::default(),
    )
    .unwrap();

    scheduler
        .schedule("DOC001", "FIN", "JUR", Duration::ZERO)
        .unwrap();
    assert_eq!(fired_rx.recv_timeout(EVENT_TIMEOUT).unwrap(), "DOC001");

    scheduler
        .schedule("DOC002", "RH", "TI", Duration::from_millis(10))
        .unwrap();
    assert_eq!(fired_rx.recv_timeout(EVENT_TIMEOUT).unwrap(), "DOC002");
    assert_eq!(service.document("DOC002").unwrap().current_department, "TI");
}

#[test]
fn custom_reason_and_thread_name_are_used() {
    let service = seeded();
    let config = SchedulerConfig {
        worker_thread_name: "docflow-test-timer".to_string(),
        scheduled_reason: "nightly routing".to_string(),
    };
    let (observer, events) = ChannelObserver::new();
    let scheduler = DeferredScheduler::start(service.clone(), Arc::new(observer), config).unwrap();

    scheduler
        .schedule("DOC001", "FIN", "JUR", Duration::ZERO)
        .unwrap();
    let report = expect_fired(&events);
    assert_eq!(
        report.outcome.unwrap().last_record().unwrap().reason,
        "nightly routing"
    );
}

#[test]
fn dropping_scheduler_stops_pending_timers() {
    let service = seeded();
    {
        let scheduler =
            DeferredScheduler::start(service.clone(), Arc::new(LogObserver), SchedulerConfig::default())
                .unwrap();
        scheduler
            .schedule("DOC002", "RH", "TI", Duration::from_millis(100))
            .unwrap();
    }
    thread::sleep(Duration::from_millis(300));
    assert_eq!(service.document("DOC002").unwrap().current_department, "RH");
}
