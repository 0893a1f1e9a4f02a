//! Audit output destinations.

use std::fs::{File, OpenOptions};
use std::io::{self, Stdout, Write};
use std::path::Path;

use parking_lot::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::event::{AuditEvent, AuditLine};

/// Errors while writing an audit line.
#[derive(Debug, thiserror::Error)]
pub enum AuditWriteError {
    #[error("audit write failed: {0}")]
    Io(#[from] io::Error),

    #[error("audit serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The background writer has stopped.
    #[error("audit writer closed")]
    Closed,
}

/// A destination for audit events.
///
/// `write` is called on the request path and must not wait on slow I/O for
/// long. Sinks that write to files either hold a short lock around an
/// append or hand the line to a background task.
pub trait AuditSink: Send + Sync {
    fn write(&self, event: &AuditEvent) -> Result<(), AuditWriteError>;
}

fn encode_line(event: &AuditEvent) -> Result<Vec<u8>, AuditWriteError> {
    let mut line = serde_json::to_vec(&AuditLine::new(event))?;
    line.push(b'\n');
    Ok(line)
}

/// Appends one JSON line per event to a writer behind a mutex.
pub struct WriterAuditSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterAuditSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl WriterAuditSink<Stdout> {
    /// Write audit lines to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl WriterAuditSink<File> {
    /// Append audit lines to a file, creating it if needed.
    pub fn file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> AuditSink for WriterAuditSink<W> {
    fn write(&self, event: &AuditEvent) -> Result<(), AuditWriteError> {
        let line = encode_line(event)?;
        let mut writer = self.writer.lock();
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Hands audit lines to a single background writer task.
///
/// `write` only enqueues, so callers never wait on the underlying I/O.
#[derive(Clone)]
pub struct ChannelAuditSink {
    sender: mpsc::UnboundedSender<Vec<u8>>,
}

impl ChannelAuditSink {
    /// Spawn the writer task. Must be called inside a Tokio runtime.
    ///
    /// The task ends once every sink clone is dropped and the queue is
    /// drained, or on the first write error.
    pub fn spawn<W>(mut writer: W) -> (Self, JoinHandle<io::Result<()>>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Vec<u8>>();
        let handle = tokio::spawn(async move {
            while let Some(line) = receiver.recv().await {
                writer.write_all(&line).await?;
                writer.flush().await?;
            }
            Ok(())
        });
        (Self { sender }, handle)
    }
}

impl AuditSink for ChannelAuditSink {
    fn write(&self, event: &AuditEvent) -> Result<(), AuditWriteError> {
        let line = encode_line(event)?;
        self.sender
            .send(line)
            .map_err(|_| AuditWriteError::Closed)
    }
}

/// Emits each event through the `log` facade on the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn write(&self, event: &AuditEvent) -> Result<(), AuditWriteError> {
        let line = serde_json::to_string(&AuditLine::new(event))?;
        log::info!(target: "audit", "{}", line);
        Ok(())
    }
}

/// Keeps events in memory. Useful for tests and inspection.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, in order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Events of one type, in order.
    pub fn of_type(&self, event_type: super::EventType) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn write(&self, event: &AuditEvent) -> Result<(), AuditWriteError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditResult, EventType};

    fn event(subject: &str) -> AuditEvent {
        AuditEvent::new(
            EventType::Authentication,
            subject,
            "authenticate",
            AuditResult::Success,
        )
        .with_metadata("auth_type", "key")
    }

    #[test]
    fn test_writer_sink_writes_json_lines() {
        let sink = WriterAuditSink::new(Vec::new());
        sink.write(&event("alice")).unwrap();
        sink.write(&event("bob")).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["audit"], true);
        assert_eq!(first["user"], "alice");
        assert_eq!(first["metadata"]["auth_type"], "key");
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");

        WriterAuditSink::file(&path).unwrap().write(&event("a")).unwrap();
        WriterAuditSink::file(&path).unwrap().write(&event("b")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_channel_sink_drains_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let file = tokio::fs::File::create(&path).await.unwrap();

        let (sink, handle) = ChannelAuditSink::spawn(file);
        for subject in ["a", "b", "c"] {
            sink.write(&event(subject)).unwrap();
        }
        drop(sink);
        handle.await.unwrap().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let users: Vec<String> = contents
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["user"].to_string())
            .collect();
        assert_eq!(users, vec!["\"a\"", "\"b\"", "\"c\""]);
    }

    #[tokio::test]
    async fn test_channel_sink_reports_closed() {
        let (sink, handle) = ChannelAuditSink::spawn(tokio::io::sink());
        handle.abort();
        let _ = handle.await;

        assert!(matches!(
            sink.write(&event("late")),
            Err(AuditWriteError::Closed)
        ));
    }

    #[test]
    fn test_memory_sink_filters_by_type() {
        let sink = MemoryAuditSink::new();
        sink.write(&event("a")).unwrap();
        sink.write(&AuditEvent::new(
            EventType::Operation,
            "a",
            "list",
            AuditResult::Success,
        ))
        .unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.of_type(EventType::Operation).len(), 1);
        sink.clear();
        assert!(sink.is_empty());
    }
}
