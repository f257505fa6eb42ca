//! Liveness heartbeat.

use crate::sink::LogSink;

/// Appends a `DD/MM/YYYY-HH:MM:SS CRM is alive` line so an operator can
/// confirm the scheduler loop is still ticking without reading service
/// logs. Note the day-first timestamp; existing tooling greps for it.
#[derive(Debug, Clone)]
pub struct HeartbeatJob<L> {
    sink: L,
}

impl<L: LogSink> HeartbeatJob<L> {
    pub const fn new(sink: L) -> Self {
        Self { sink }
    }

    /// Run once; a sink failure is traced and swallowed.
    pub fn run(&self) {
        let ts = chrono::Local::now().format("%d/%m/%Y-%H:%M:%S");
        if let Err(error) = self.sink.append(&format!("{ts} CRM is alive")) {
            tracing::error!(%error, "Could not write heartbeat line");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sink::MemorySink;

    #[test]
    fn test_heartbeat_line_format() {
        let sink = Arc::new(MemorySink::new());
        HeartbeatJob::new(Arc::clone(&sink)).run();

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        let line = lines.first().unwrap();
        assert!(line.ends_with(" CRM is alive"));
        // DD/MM/YYYY-HH:MM:SS is 19 characters.
        let (ts, _) = line.split_at(19);
        assert_eq!(ts.chars().filter(|c| *c == '/').count(), 2);
        assert_eq!(ts.chars().filter(|c| *c == ':').count(), 2);
    }
}
