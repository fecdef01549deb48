#![forbid(unsafe_code)]

//! Offline leak analysis over a JSONL event log.
//!
//! Replays `item_created` / `item_destroyed` lines and reports identities
//! that were never destroyed, destroyed twice, or destroyed without ever
//! being created. Lines with other `event` values are counted and skipped.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::BufRead;

use serde_json::Value;

/// `(generation, index)` as read from the log.
pub type LoggedIdentity = (u64, u64);

/// A line that could not be analyzed.
#[derive(Debug)]
pub struct ReportError {
    /// 1-based line number.
    pub line: usize,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ReportError {}

/// Result of replaying a log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeakReport {
    /// Lines read, blank lines excluded.
    pub lines: usize,
    /// `item_created` lines.
    pub created: u64,
    /// `item_destroyed` lines.
    pub destroyed: u64,
    /// Created and never destroyed.
    pub leaked: BTreeSet<LoggedIdentity>,
    /// Destroyed while already destroyed.
    pub double_destroyed: BTreeSet<LoggedIdentity>,
    /// Destroyed without a creation.
    pub orphaned: BTreeSet<LoggedIdentity>,
    /// Created more than once.
    pub reused: BTreeSet<LoggedIdentity>,
    /// Leaked items per generation.
    pub leaked_by_generation: BTreeMap<u64, usize>,
}

impl LeakReport {
    /// True when the log is balanced.
    pub fn is_clean(&self) -> bool {
        self.leaked.is_empty()
            && self.double_destroyed.is_empty()
            && self.orphaned.is_empty()
            && self.reused.is_empty()
    }

    /// Replay a JSONL stream.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, malformed JSON, or item events missing their
    /// `generation` / `index` fields.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ReportError> {
        let mut report = Self::default();
        let mut live: BTreeSet<LoggedIdentity> = BTreeSet::new();
        let mut ever: BTreeSet<LoggedIdentity> = BTreeSet::new();

        for (idx, line) in reader.lines().enumerate() {
            let number = idx + 1;
            let line = line.map_err(|e| ReportError {
                line: number,
                message: e.to_string(),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            report.lines += 1;
            let value: Value = serde_json::from_str(&line).map_err(|e| ReportError {
                line: number,
                message: format!("invalid JSON: {e}"),
            })?;
            match value.get("event").and_then(Value::as_str) {
                Some("item_created") => {
                    let id = identity(&value, number)?;
                    report.created += 1;
                    if !ever.insert(id) {
                        report.reused.insert(id);
                    }
                    live.insert(id);
                }
                Some("item_destroyed") => {
                    let id = identity(&value, number)?;
                    report.destroyed += 1;
                    if !live.remove(&id) {
                        if ever.contains(&id) {
                            report.double_destroyed.insert(id);
                        } else {
                            report.orphaned.insert(id);
                        }
                    }
                }
                _ => {}
            }
        }

        for &(generation, _) in &live {
            *report.leaked_by_generation.entry(generation).or_default() += 1;
        }
        report.leaked = live;
        tracing::info!(
            lines = report.lines,
            created = report.created,
            destroyed = report.destroyed,
            leaked = report.leaked.len(),
            clean = report.is_clean(),
            "leak analysis complete"
        );
        Ok(report)
    }
}

fn identity(value: &Value, line: usize) -> Result<LoggedIdentity, ReportError> {
    let field = |name: &str| {
        value.get(name).and_then(Value::as_u64).ok_or_else(|| ReportError {
            line,
            message: format!("item event missing `{name}`"),
        })
    };
    Ok((field("generation")?, field("index")?))
}

impl fmt::Display for LeakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} lines, {} created, {} destroyed",
            self.lines, self.created, self.destroyed
        )?;
        if self.is_clean() {
            return writeln!(f, "no leaks");
        }
        if !self.leaked.is_empty() {
            writeln!(f, "leaked: {}", self.leaked.len())?;
            for (generation, n) in &self.leaked_by_generation {
                writeln!(f, "  generation {generation}: {n}")?;
            }
        }
        let mut list = |label: &str, set: &BTreeSet<LoggedIdentity>| -> fmt::Result {
            if set.is_empty() {
                return Ok(());
            }
            let ids: Vec<String> = set.iter().map(|(g, i)| format!("{g}-{i}")).collect();
            writeln!(f, "{label}: {}", ids.join(", "))
        };
        list("destroyed twice", &self.double_destroyed)?;
        list("destroyed without creation", &self.orphaned)?;
        list("created twice", &self.reused)
    }
}
