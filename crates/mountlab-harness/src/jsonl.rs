#![forbid(unsafe_code)]

//! JSONL event sink.
//!
//! One JSON object per line. A run opens with a `run_start` line describing
//! the configuration and closes with `run_complete` carrying totals; every
//! line between is a serialized
//! [`LabEventRecord`](mountlab_core::LabEventRecord).
//!
//! ```json
//! {"event":"run_start","run_id":"...","count":50,"remount_delay_ms":100,"stress_period_ms":500}
//! {"at_ms":0,"event":"item_created","generation":1,"index":1}
//! {"event":"run_complete","run_id":"...","events":101,"created":50,"destroyed":50,"duration_ms":600}
//! ```

use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use mountlab_core::{LabConfig, LabEvent, LabEventRecord};
use serde_json::json;

/// Writes lifecycle events as JSON lines.
#[derive(Debug)]
pub struct JsonlSink<W: Write> {
    writer: W,
    run_id: String,
    events: u64,
    created: u64,
    destroyed: u64,
}

impl<W: Write> JsonlSink<W> {
    /// Wrap a writer with a time-derived run id.
    pub fn new(writer: W) -> Self {
        let run_id = format!(
            "{:016x}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        );
        Self::with_run_id(writer, run_id)
    }

    /// Wrap a writer with an explicit run id.
    pub fn with_run_id(writer: W, run_id: impl Into<String>) -> Self {
        Self {
            writer,
            run_id: run_id.into(),
            events: 0,
            created: 0,
            destroyed: 0,
        }
    }

    /// Identifier stamped on the header and footer lines.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Write the `run_start` line.
    pub fn start(&mut self, config: &LabConfig) -> io::Result<()> {
        let line = json!({
            "event": "run_start",
            "run_id": self.run_id,
            "count": config.initial_count.get(),
            "remount_delay_ms": config.remount_delay.as_millis() as u64,
            "stress_period_ms": config.stress_period.as_millis() as u64,
        });
        writeln!(self.writer, "{line}")
    }

    /// Write one event record.
    pub fn record(&mut self, record: &LabEventRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.events += 1;
        match record.event {
            LabEvent::ItemCreated { .. } => self.created += 1,
            LabEvent::ItemDestroyed { .. } => self.destroyed += 1,
            _ => {}
        }
        Ok(())
    }

    /// Write a batch of records.
    pub fn record_all<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a LabEventRecord>,
    ) -> io::Result<()> {
        for record in records {
            self.record(record)?;
        }
        Ok(())
    }

    /// Write the `run_complete` line and flush.
    pub fn finish(&mut self, duration_ms: u64) -> io::Result<()> {
        let line = json!({
            "event": "run_complete",
            "run_id": self.run_id,
            "events": self.events,
            "created": self.created,
            "destroyed": self.destroyed,
            "duration_ms": duration_ms,
        });
        writeln!(self.writer, "{line}")?;
        self.writer.flush()
    }

    /// Events written so far.
    pub fn events_written(&self) -> u64 {
        self.events
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
