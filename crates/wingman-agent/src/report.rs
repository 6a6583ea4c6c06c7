//! Report sink: best-effort telemetry of tool activity.
//!
//! Every executed tool call produces one record. Sinks are advisory: a
//! sink failure is logged at `warn` by the dispatch loop and never
//! aborts a round, because losing a report line must not lose a session.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::conversation::{ToolResultV1, ToolStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecordV1 {
    /// UTC wall-clock time the call finished.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Session the call belongs to.
    pub session: uuid::Uuid,
    pub tool: String,
    pub args: serde_json::Value,
    pub status: ToolStatus,
    pub result: serde_json::Value,
}

impl ToolRecordV1 {
    pub fn from_result(
        session: uuid::Uuid,
        args: serde_json::Value,
        result: &ToolResultV1,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            session,
            tool: result.tool.clone(),
            args,
            status: result.status,
            result: result.payload.clone(),
        }
    }
}

pub trait ReportSink: Send {
    fn record(&mut self, record: &ToolRecordV1) -> std::io::Result<()>;
    fn flush(&mut self) -> std::io::Result<()>;
}

/// Append-only JSON Lines file, one record per line.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl ReportSink for JsonlSink {
    fn record(&mut self, record: &ToolRecordV1) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Discards everything.
pub struct NullSink;

impl ReportSink for NullSink {
    fn record(&mut self, _record: &ToolRecordV1) -> std::io::Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Collects records in memory; the test sink.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<ToolRecordV1>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ToolRecordV1> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ReportSink for MemorySink {
    fn record(&mut self, record: &ToolRecordV1) -> std::io::Result<()> {
        self.records
            .lock()
            .map_err(|_| std::io::Error::other("record mutex poisoned"))?
            .push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(session: uuid::Uuid) -> ToolRecordV1 {
        ToolRecordV1 {
            timestamp: chrono::Utc::now(),
            session,
            tool: "run_polar".to_string(),
            args: serde_json::json!({"speed_ms": 10.0}),
            status: ToolStatus::Success,
            result: serde_json::json!({"points": 61}),
        }
    }

    #[test]
    fn jsonl_sink_appends_parseable_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.jsonl");
        let session = uuid::Uuid::new_v4();

        let mut sink = JsonlSink::open(&path).unwrap();
        sink.record(&sample(session)).unwrap();
        sink.record(&sample(session)).unwrap();
        sink.flush().unwrap();
        drop(sink);

        // Reopening appends rather than truncating.
        let mut sink = JsonlSink::open(&path).unwrap();
        sink.record(&sample(session)).unwrap();
        sink.flush().unwrap();
        drop(sink);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let record: ToolRecordV1 = serde_json::from_str(line).unwrap();
            assert_eq!(record.session, session);
            assert_eq!(record.tool, "run_polar");
        }
    }

    #[test]
    fn memory_sink_collects_in_order() {
        let session = uuid::Uuid::new_v4();
        let mut sink = MemorySink::new();
        let mut second = sample(session);
        second.tool = "wing_metrics".to_string();
        sink.record(&sample(session)).unwrap();
        sink.record(&second).unwrap();
        let records = sink.records();
        assert_eq!(records[0].tool, "run_polar");
        assert_eq!(records[1].tool, "wing_metrics");
    }
}
