//! The job scheduler loop.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use meridian_store::Store;

use crate::sink::LogSink;
use crate::{CleanupJob, HeartbeatJob, ReminderJob, ReplenishmentJob, ReportJob};

/// How often each job fires.
#[derive(Debug, Clone, Copy)]
pub struct JobIntervals {
    pub heartbeat: Duration,
    pub replenishment: Duration,
    pub reminders: Duration,
    pub cleanup: Duration,
    pub report: Duration,
}

impl Default for JobIntervals {
    /// Heartbeat every 5 minutes, replenishment every 12 hours,
    /// reminders daily, cleanup and report weekly.
    fn default() -> Self {
        Self {
            heartbeat: Duration::from_secs(5 * 60),
            replenishment: Duration::from_secs(12 * 60 * 60),
            reminders: Duration::from_secs(24 * 60 * 60),
            cleanup: Duration::from_secs(7 * 24 * 60 * 60),
            report: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// Drives all jobs from a single task.
///
/// One `select!` loop polls a ticker per job, so two runs of the same
/// job can never overlap: the next tick is not polled until the current
/// run returns. Ticks missed while a run is in flight are delayed, not
/// burst. Distinct jobs take turns on this task; none of them is
/// latency-sensitive enough to need its own.
pub struct Scheduler<S, L> {
    heartbeat: HeartbeatJob<L>,
    replenishment: ReplenishmentJob<S, L>,
    reminders: ReminderJob<S, L>,
    cleanup: CleanupJob<S, L>,
    report: ReportJob<S, L>,
    intervals: JobIntervals,
}

impl<S: Store, L: LogSink> Scheduler<S, L> {
    pub const fn new(
        heartbeat: HeartbeatJob<L>,
        replenishment: ReplenishmentJob<S, L>,
        reminders: ReminderJob<S, L>,
        cleanup: CleanupJob<S, L>,
        report: ReportJob<S, L>,
        intervals: JobIntervals,
    ) -> Self {
        Self {
            heartbeat,
            replenishment,
            reminders,
            cleanup,
            report,
            intervals,
        }
    }

    /// Run until `shutdown` resolves. Every job fires once at startup
    /// (the first tick is immediate), then on its interval.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let mut heartbeat = ticker(self.intervals.heartbeat);
        let mut replenishment = ticker(self.intervals.replenishment);
        let mut reminders = ticker(self.intervals.reminders);
        let mut cleanup = ticker(self.intervals.cleanup);
        let mut report = ticker(self.intervals.report);

        tokio::pin!(shutdown);
        tracing::info!("Scheduler started");
        loop {
            tokio::select! {
                _ = heartbeat.tick() => self.heartbeat.run(),
                _ = replenishment.tick() => self.replenishment.run().await,
                _ = reminders.tick() => self.reminders.run().await,
                _ = cleanup.tick() => self.cleanup.run().await,
                _ = report.tick() => self.report.run().await,
                () = &mut shutdown => {
                    tracing::info!("Scheduler shutting down");
                    return;
                }
            }
        }
    }
}

fn ticker(period: Duration) -> time::Interval {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
