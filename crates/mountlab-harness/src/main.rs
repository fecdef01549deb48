#![forbid(unsafe_code)]

//! Mount lab harness binary.
//!
//! Mode selection, first match wins:
//!
//! | Variable                        | Mode                                         |
//! |---------------------------------|----------------------------------------------|
//! | `MOUNTLAB_HARNESS_ANALYZE=path` | Leak report over a JSONL file; exit 2 on leaks |
//! | `MOUNTLAB_HARNESS_SCRIPT=text`  | Scripted run (inline text or a script file)  |
//! | (none)                          | Interactive terminal shell                   |
//!
//! Other variables:
//!
//! - `MOUNTLAB_HARNESS_JSONL=path`: event stream destination (default stdout
//!   for scripts; interactive runs only write one when this is set).
//! - `MOUNTLAB_HARNESS_KEEP_LIVE=1`: skip the final teardown of a scripted
//!   run, leaving live items unbalanced in the stream.
//! - `MOUNTLAB_HARNESS_EXIT_AFTER_MS=n`: quit the shell after `n` ms.
//! - `MOUNTLAB_COUNT`, `MOUNTLAB_REMOUNT_DELAY_MS`,
//!   `MOUNTLAB_STRESS_PERIOD_MS`: lab configuration.
//! - `MOUNTLAB_LOG`, `MOUNTLAB_LOG_JSON`, `MOUNTLAB_LOG_FILE`: logging.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use crossterm::event::Event;
use mountlab_core::{LabConfig, MountLab};
use mountlab_harness::logging::{self, LogConfig, LogTarget};
use mountlab_harness::{Action, JsonlSink, LeakReport, Script, TerminalSession, map_key, render};

/// Longest wait for input before redrawing the animation.
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> io::Result<()> {
    if let Some(path) = env_string("MOUNTLAB_HARNESS_ANALYZE") {
        logging::init(&LogConfig::from_env(LogTarget::Stderr))?;
        let file = File::open(&path)?;
        let report = match LeakReport::from_reader(BufReader::new(file)) {
            Ok(report) => report,
            Err(err) => {
                eprintln!("leak analysis failed: {path}: {err}");
                std::process::exit(2);
            }
        };
        print!("{report}");
        if !report.is_clean() {
            std::process::exit(2);
        }
        return Ok(());
    }

    if let Some(source) = env_string("MOUNTLAB_HARNESS_SCRIPT") {
        logging::init(&LogConfig::from_env(LogTarget::Stderr))?;
        return run_scripted(&source);
    }

    logging::init(&LogConfig::from_env(LogTarget::Discard))?;
    run_interactive()
}

fn run_scripted(source: &str) -> io::Result<()> {
    let text = if Path::new(source).is_file() {
        std::fs::read_to_string(source)?
    } else {
        source.to_string()
    };
    let script = Script::parse(&text)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    let shutdown = !env_flag("MOUNTLAB_HARNESS_KEEP_LIVE").unwrap_or(false);
    let mut lab = MountLab::new(LabConfig::from_env());

    let writer: Box<dyn Write> = match env_string("MOUNTLAB_HARNESS_JSONL") {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    let mut sink = JsonlSink::new(writer);
    let summary = mountlab_harness::run_script(&mut lab, &script, &mut sink, shutdown)?;
    eprintln!(
        "script OK: steps={} events={} elapsed_ms={} status=\"{}\"",
        summary.steps,
        summary.events,
        summary.elapsed.as_millis(),
        summary.final_status
    );
    Ok(())
}

fn run_interactive() -> io::Result<()> {
    let mut lab = MountLab::new(LabConfig::from_env());
    let exit_after = env_u64("MOUNTLAB_HARNESS_EXIT_AFTER_MS").map(Duration::from_millis);
    let mut sink = match env_string("MOUNTLAB_HARNESS_JSONL") {
        Some(path) => {
            let mut sink = JsonlSink::new(BufWriter::new(File::create(path)?));
            sink.start(lab.config())?;
            Some(sink)
        }
        None => None,
    };

    let started = Instant::now();
    let result = {
        let session = TerminalSession::enter()?;
        shell_loop(&session, &mut lab, sink.as_mut(), exit_after)
    };

    lab.shutdown();
    let leftover = lab.drain_events();
    if let Some(sink) = sink.as_mut() {
        sink.record_all(&leftover)?;
        sink.finish(started.elapsed().as_millis() as u64)?;
    }
    result
}

fn shell_loop<W: Write>(
    session: &TerminalSession,
    lab: &mut MountLab,
    mut sink: Option<&mut JsonlSink<W>>,
    exit_after: Option<Duration>,
) -> io::Result<()> {
    let started = Instant::now();
    let mut last = started;
    loop {
        let (width, height) = session.size()?;
        session.draw(&render(lab, width, height))?;

        // Wake for the next timer even when no key arrives.
        let timeout = lab
            .next_deadline()
            .map_or(FRAME_INTERVAL, |at| at.saturating_sub(lab.now()).min(FRAME_INTERVAL));
        if let Some(Event::Key(key)) = session.next_event(timeout)? {
            match map_key(&key, &lab.controls()) {
                Some(Action::Quit) => return Ok(()),
                Some(Action::Intent(intent)) => lab.dispatch(intent),
                None => {}
            }
        }

        let now = Instant::now();
        lab.advance(now.duration_since(last));
        last = now;

        let events = lab.drain_events();
        if let Some(sink) = sink.as_deref_mut() {
            sink.record_all(&events)?;
        }

        if exit_after.is_some_and(|limit| started.elapsed() >= limit) {
            tracing::info!("exit-after limit reached");
            return Ok(());
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(matches!(
        trimmed.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    ))
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
