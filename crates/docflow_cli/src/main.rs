//! CLI demo entry point.
//!
//! # Responsibility
//! - Exercise `docflow_core` end to end: seed, transfer, defer, list.
//! - Keep output deterministic apart from timestamps.

use docflow_core::{
    init_logging, CoreConfig, DeferredScheduler, LogObserver, TransferService,
    MANUAL_TRANSFER_REASON,
};
use log::info;
use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const DEMO_DELAY: Duration = Duration::from_secs(5);
const DEMO_WAIT: Duration = Duration::from_secs(6);

fn main() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    if let Some(logging) = &config.logging {
        init_logging(logging)?;
    }
    println!("docflow_core version={}", docflow_core::core_version());

    let service = TransferService::new();
    seed(&service)?;

    let scheduler =
        DeferredScheduler::start(service.clone(), Arc::new(LogObserver), config.scheduler)?;

    println!("== initial ownership ==");
    print_groups(&service);

    let moved = service.transfer("DOC001", "FIN", "JUR", MANUAL_TRANSFER_REASON)?;
    println!("transferred {} to {}", moved.id, moved.current_department);

    let task_id = scheduler.schedule("DOC002", "RH", "TI", DEMO_DELAY)?;
    println!(
        "scheduled {task_id} in {}s (pending={})",
        DEMO_DELAY.as_secs(),
        scheduler.pending_count()
    );
    info!("event=cli_wait module=cli status=ok task_id={task_id}");
    thread::sleep(DEMO_WAIT);

    println!("== final ownership ==");
    print_groups(&service);
    print_summaries(&service);

    for document in service.documents() {
        println!("history {}:", document.id);
        for record in &document.history {
            println!("  {record}");
        }
    }

    scheduler.shutdown();
    Ok(())
}

fn seed(service: &TransferService) -> Result<(), Box<dyn Error>> {
    service.register_department("FIN", "Financeiro");
    service.register_department("RH", "Recursos Humanos");
    service.register_department("TI", "Tecnologia da Informação");
    service.register_department("JUR", "Jurídico");

    service.add_document("DOC001", "Relatório Financeiro Q1", "Conteúdo...", "FIN")?;
    service.add_document("DOC002", "Política de Férias", "Conteúdo...", "RH")?;
    service.add_document("DOC003", "Plano de Infraestrutura", "Conteúdo...", "TI")?;
    Ok(())
}

fn print_groups(service: &TransferService) {
    for group in service.group_by_department() {
        let ids: Vec<&str> = group
            .documents
            .iter()
            .map(|document| document.id.as_str())
            .collect();
        println!("{}: [{}]", group.department, ids.join(", "));
    }
}

fn print_summaries(service: &TransferService) {
    let overview = service.overview();
    println!(
        "documents={} departments={}",
        overview.total_documents, overview.total_departments
    );
    for summary in service.department_summaries() {
        println!(
            "  {} {} count={}",
            summary.code, summary.name, summary.document_count
        );
    }
}
