//! Scheduled job commands: one-shot runs and the scheduler loop.

use meridian_jobs::{
    CleanupJob, FileSink, HeartbeatJob, ReminderJob, ReplenishmentJob, ReportJob, Scheduler,
};
use meridian_store::{PgStore, create_pool};

use crate::JobName;
use crate::config::CrmConfig;

/// Log file names, one per job, under `CRM_LOG_DIR`. Downstream tooling
/// tails these by name.
const REPLENISHMENT_LOG: &str = "low_stock_updates_log.txt";
const CLEANUP_LOG: &str = "customer_cleanup_log.txt";
const REMINDERS_LOG: &str = "order_reminders_log.txt";
const REPORT_LOG: &str = "crm_report_log.txt";
const HEARTBEAT_LOG: &str = "crm_heartbeat_log.txt";

struct Jobs {
    heartbeat: HeartbeatJob<FileSink>,
    replenishment: ReplenishmentJob<PgStore, FileSink>,
    reminders: ReminderJob<PgStore, FileSink>,
    cleanup: CleanupJob<PgStore, FileSink>,
    report: ReportJob<PgStore, FileSink>,
}

async fn build(config: &CrmConfig) -> Result<Jobs, sqlx::Error> {
    let pool = create_pool(&config.database_url).await?;
    let store = PgStore::new(pool);
    let sink = |name: &str| FileSink::new(config.log_dir.join(name));

    Ok(Jobs {
        heartbeat: HeartbeatJob::new(sink(HEARTBEAT_LOG)),
        replenishment: ReplenishmentJob::new(
            store.clone(),
            sink(REPLENISHMENT_LOG),
            config.restock_threshold,
            config.restock_amount,
        ),
        reminders: ReminderJob::new(
            store.clone(),
            sink(REMINDERS_LOG),
            config.reminder_window_days,
        ),
        cleanup: CleanupJob::new(store.clone(), sink(CLEANUP_LOG), config.retention_days),
        report: ReportJob::new(store, sink(REPORT_LOG)),
    })
}

/// Run one job immediately and exit.
pub async fn run_once(config: &CrmConfig, name: JobName) -> Result<(), Box<dyn std::error::Error>> {
    let jobs = build(config).await?;
    match name {
        JobName::Heartbeat => jobs.heartbeat.run(),
        JobName::Replenishment => jobs.replenishment.run().await,
        JobName::Reminders => jobs.reminders.run().await,
        JobName::Cleanup => jobs.cleanup.run().await,
        JobName::Report => jobs.report.run().await,
    }
    Ok(())
}

/// Run every job on its configured interval until Ctrl-C.
pub async fn schedule(config: &CrmConfig) -> Result<(), Box<dyn std::error::Error>> {
    let jobs = build(config).await?;
    let scheduler = Scheduler::new(
        jobs.heartbeat,
        jobs.replenishment,
        jobs.reminders,
        jobs.cleanup,
        jobs.report,
        config.intervals,
    );

    scheduler
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Could not listen for shutdown signal: {e}");
            }
        })
        .await;
    Ok(())
}
