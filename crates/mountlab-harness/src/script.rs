#![forbid(unsafe_code)]

//! Scripted headless runs.
//!
//! A script is a list of steps separated by `;` or newlines. `#` starts a
//! comment. Time only passes on `wait`, so a script is fully deterministic.
//!
//! | Step            | Effect                          |
//! |-----------------|---------------------------------|
//! | `toggle`        | toggle mount                    |
//! | `remount`       | remount                         |
//! | `inc` / `+`     | count +10                       |
//! | `dec` / `-`     | count -10                       |
//! | `adjust <n>`    | count +n, n a multiple of 10    |
//! | `stress`        | toggle the stress cycle         |
//! | `wait <ms>`     | advance virtual time            |
//!
//! ```text
//! toggle; wait 500; remount; wait 200
//! stress; wait 2000; stress
//! ```

use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

use mountlab_core::{COUNT_STEP, Intent, MountLab, Status};

use crate::jsonl::JsonlSink;

/// One script step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    /// Dispatch an intent.
    Intent(Intent),
    /// Advance virtual time.
    Wait(Duration),
}

/// A parsed script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    steps: Vec<ScriptStep>,
}

/// Unparseable script step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    /// 1-based line of the offending step.
    pub line: usize,
    /// The step text.
    pub step: String,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "script error at line {}: `{}`: {}",
            self.line, self.step, self.message
        )
    }
}

impl std::error::Error for ScriptError {}

impl Script {
    /// Parse script text.
    ///
    /// # Errors
    ///
    /// Returns the first step that cannot be parsed.
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut steps = Vec::new();
        for (line_idx, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or("");
            for raw in line.split(';') {
                let raw = raw.trim();
                if raw.is_empty() {
                    continue;
                }
                let step = parse_step(raw).map_err(|message| ScriptError {
                    line: line_idx + 1,
                    step: raw.to_string(),
                    message,
                })?;
                steps.push(step);
            }
        }
        Ok(Self { steps })
    }

    /// Parsed steps.
    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    /// Total virtual time the script waits.
    pub fn total_wait(&self) -> Duration {
        self.steps
            .iter()
            .map(|s| match s {
                ScriptStep::Wait(d) => *d,
                ScriptStep::Intent(_) => Duration::ZERO,
            })
            .sum()
    }
}

fn parse_step(raw: &str) -> Result<ScriptStep, String> {
    let mut parts = raw.split_whitespace();
    let head = parts.next().unwrap_or("").to_ascii_lowercase();
    let arg = parts.next();
    if parts.next().is_some() {
        return Err("too many arguments".into());
    }
    let no_arg = |step: ScriptStep| match arg {
        None => Ok(step),
        Some(_) => Err(format!("`{head}` takes no argument")),
    };
    match head.as_str() {
        "toggle" => no_arg(ScriptStep::Intent(Intent::ToggleMount)),
        "remount" => no_arg(ScriptStep::Intent(Intent::Remount)),
        "inc" | "+" => no_arg(ScriptStep::Intent(Intent::INCREASE)),
        "dec" | "-" => no_arg(ScriptStep::Intent(Intent::DECREASE)),
        "stress" => no_arg(ScriptStep::Intent(Intent::ToggleStress)),
        "adjust" => {
            let delta = arg
                .ok_or("`adjust` needs a delta")?
                .parse::<i32>()
                .map_err(|e| format!("bad delta: {e}"))?;
            if delta % i32::from(COUNT_STEP) != 0 {
                return Err(format!("delta must be a multiple of {COUNT_STEP}"));
            }
            Ok(ScriptStep::Intent(Intent::AdjustCount(delta)))
        }
        "wait" => {
            let ms = arg
                .ok_or("`wait` needs milliseconds")?
                .trim_end_matches("ms")
                .parse::<u64>()
                .map_err(|e| format!("bad duration: {e}"))?;
            Ok(ScriptStep::Wait(Duration::from_millis(ms)))
        }
        other => Err(format!("unknown step `{other}`")),
    }
}

/// Totals from a scripted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Steps executed.
    pub steps: usize,
    /// Events written.
    pub events: u64,
    /// Virtual time elapsed.
    pub elapsed: Duration,
    /// Status after the last step, before any shutdown.
    pub final_status: Status,
}

/// Run `script` against `lab`, streaming events to `sink`.
///
/// With `shutdown`, the lab is torn down afterwards so the stream ends
/// balanced.
pub fn run_script<W: Write>(
    lab: &mut MountLab,
    script: &Script,
    sink: &mut JsonlSink<W>,
    shutdown: bool,
) -> io::Result<RunSummary> {
    let started = lab.now();
    sink.start(lab.config())?;
    for (idx, step) in script.steps().iter().enumerate() {
        tracing::debug!(step = idx, ?step, "script step");
        match *step {
            ScriptStep::Intent(intent) => lab.dispatch(intent),
            ScriptStep::Wait(dt) => lab.advance(dt),
        }
        sink.record_all(&lab.drain_events())?;
    }
    let final_status = lab.status();
    if shutdown {
        lab.shutdown();
        sink.record_all(&lab.drain_events())?;
    }
    let elapsed = lab.now().saturating_sub(started);
    sink.finish(elapsed.as_millis() as u64)?;
    let summary = RunSummary {
        steps: script.steps().len(),
        events: sink.events_written(),
        elapsed,
        final_status,
    };
    tracing::info!(
        steps = summary.steps,
        events = summary.events,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        status = %summary.final_status,
        "script complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mountlab_core::{LabConfig, MIN_ITEMS};

    #[test]
    fn parses_mixed_separators_and_comments() {
        let script = Script::parse("toggle; wait 500ms # settle\nremount\n\n+ ; dec;stress").unwrap();
        assert_eq!(
            script.steps(),
            &[
                ScriptStep::Intent(Intent::ToggleMount),
                ScriptStep::Wait(Duration::from_millis(500)),
                ScriptStep::Intent(Intent::Remount),
                ScriptStep::Intent(Intent::INCREASE),
                ScriptStep::Intent(Intent::DECREASE),
                ScriptStep::Intent(Intent::ToggleStress),
            ]
        );
        assert_eq!(script.total_wait(), Duration::from_millis(500));
    }

    #[test]
    fn adjust_accepts_negative_delta() {
        let script = Script::parse("adjust -30").unwrap();
        assert_eq!(script.steps(), &[ScriptStep::Intent(Intent::AdjustCount(-30))]);
    }

    #[test]
    fn adjust_rejects_off_step_delta() {
        let err = Script::parse("adjust 7").unwrap_err();
        assert!(err.message.contains("multiple of 10"));
        assert!(Script::parse("adjust 2147483647").is_err());
    }

    #[test]
    fn huge_adjust_saturates_at_max() {
        let mut lab = MountLab::new(LabConfig::default());
        let script = Script::parse("toggle; adjust 2147483640; adjust -2147483640").unwrap();
        let mut sink = JsonlSink::with_run_id(Vec::new(), "t");
        run_script(&mut lab, &script, &mut sink, false).unwrap();
        assert_eq!(lab.snapshot().count.get(), MIN_ITEMS);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.contains("\"count_changed\",\"count\":200"));
        assert_eq!(lab.host().len(), usize::from(MIN_ITEMS));
    }

    #[test]
    fn reports_line_of_bad_step() {
        let err = Script::parse("toggle\nwait soon").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.step, "wait soon");
        assert!(err.to_string().contains("bad duration"));
    }

    #[test]
    fn rejects_unknown_and_extra_args() {
        assert!(Script::parse("explode").is_err());
        assert!(Script::parse("toggle now").is_err());
        assert!(Script::parse("wait").is_err());
        assert!(Script::parse("wait 1 2").is_err());
    }

    #[test]
    fn run_streams_balanced_events() {
        let mut lab = MountLab::new(LabConfig::default().with_initial_count(10));
        let script = Script::parse("toggle; wait 50; remount; wait 100").unwrap();
        let mut sink = JsonlSink::with_run_id(Vec::new(), "t");
        let summary = run_script(&mut lab, &script, &mut sink, true).unwrap();
        assert_eq!(summary.steps, 4);
        assert_eq!(summary.elapsed, Duration::from_millis(150));
        assert_eq!(summary.final_status.to_string(), "10 animations active");
        // 10 created, 10 destroyed, 10 created, 10 destroyed at shutdown, plus coarse events.
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.matches("\"item_created\"").count(), 20);
        assert_eq!(text.matches("\"item_destroyed\"").count(), 20);
    }
}
