//! Append-only text sinks for job output.
//!
//! Jobs report what they did as plain text lines, one per event, so an
//! operator can `tail -f` the file. The sink is a trait so tests can
//! capture lines in memory instead of touching the filesystem.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// An append-only destination for job log lines.
pub trait LogSink: Send + Sync {
    /// Append one line. The sink adds the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the line could not be durably appended.
    fn append(&self, line: &str) -> io::Result<()>;
}

/// File-backed sink. Opens the file in append mode on every write, so
/// concurrent processes interleave whole lines rather than corrupting
/// each other, and log rotation needs no coordination.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Sink appending to the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this sink appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn append(&self, line: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything appended so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if a writer panicked while holding the lock.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("sink lock poisoned").clone()
    }
}

impl LogSink for MemorySink {
    fn append(&self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .map_err(|_| io::Error::other("sink lock poisoned"))?
            .push(line.to_owned());
        Ok(())
    }
}

impl<S: LogSink + ?Sized> LogSink for std::sync::Arc<S> {
    fn append(&self, line: &str) -> io::Result<()> {
        (**self).append(line)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("job_log.txt");
        let sink = FileSink::new(&path);

        sink.append("first").unwrap();
        sink.append("second").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn test_file_sink_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("log.txt");
        FileSink::new(&path).append("line").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.append("one").unwrap();
        sink.append("two").unwrap();
        assert_eq!(sink.lines(), vec!["one".to_owned(), "two".to_owned()]);
    }
}
