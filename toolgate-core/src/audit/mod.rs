//! Structured audit trail.
//!
//! Every authentication attempt, authorization decision and completed
//! operation is recorded as one [`AuditEvent`]. Events are serialized as a
//! single JSON line carrying `"audit": true`:
//!
//! ```json
//! {"audit":true,"timestamp":"…","event_id":"…","event_type":"authorization",
//!  "user":"alice","action":"list","resource":"pods","namespace":"default",
//!  "result":"granted","metadata":{"permission":"k8s:pods:list"},"duration_ms":0}
//! ```
//!
//! Sinks:
//!
//! - [`WriterAuditSink`]: mutex-guarded append to stdout or a file
//! - [`ChannelAuditSink`]: single background writer fed by a channel
//! - [`LogAuditSink`]: the `log` facade, target `audit`
//! - [`MemoryAuditSink`]: in-memory, for tests

mod event;
mod logger;
mod sink;

pub use event::{AuditEvent, AuditResult, EventType};
pub use logger::AuditLogger;
pub use sink::{
    AuditSink, AuditWriteError, ChannelAuditSink, LogAuditSink, MemoryAuditSink, WriterAuditSink,
};
