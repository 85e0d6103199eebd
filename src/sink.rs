//! Persistence sink for decoded records.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::gt06::DecodedRecord;

/// One decoded record plus receive metadata, as handed to a sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Gateway-side receive time (device timestamps live in the record).
    pub received_at: DateTime<Utc>,
    /// Peer address of the device connection.
    pub peer: SocketAddr,
    #[serde(flatten)]
    pub record: DecodedRecord,
}

/// Consumer of decoded records.
pub trait RecordSink: Send {
    /// Persist one record.
    fn store(&mut self, record: &StoredRecord) -> Result<()>;
}

/// Append-only JSON-lines sink, one record per line.
pub struct JsonlSink {
    file: File,
}

impl JsonlSink {
    /// Open (or create) the output file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl RecordSink for JsonlSink {
    fn store(&mut self, record: &StoredRecord) -> Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| AppError::storage(format!("serialize record: {e}")))?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        Ok(())
    }
}

/// In-memory sink collecting records, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<StoredRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for MemorySink {
    fn store(&mut self, record: &StoredRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gt06::{HeartbeatRecord, LoginRecord};

    fn sample(record: DecodedRecord) -> StoredRecord {
        StoredRecord {
            received_at: Utc::now(),
            peer: "10.0.0.7:40213".parse().unwrap(),
            record,
        }
    }

    #[test]
    fn test_memory_sink_collects() {
        let mut sink = MemorySink::new();
        sink.store(&sample(DecodedRecord::Login(LoginRecord {
            device_id: "357718951227251".to_string(),
            serial: 8,
        })))
        .unwrap();
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].record.device_id(), Some("357718951227251"));
    }

    #[test]
    fn test_jsonl_sink_appends_lines() {
        let path = std::env::temp_dir().join(format!("gt06-sink-test-{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let mut sink = JsonlSink::open(&path).unwrap();
        sink.store(&sample(DecodedRecord::Login(LoginRecord {
            device_id: "357718951227251".to_string(),
            serial: 8,
        })))
        .unwrap();
        sink.store(&sample(DecodedRecord::Heartbeat(HeartbeatRecord {
            device_id: "357718951227251".to_string(),
            frame_len: 17,
        })))
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "login");
        assert_eq!(first["device_id"], "357718951227251");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["kind"], "heartbeat");

        let _ = std::fs::remove_file(&path);
    }
}
