#![forbid(unsafe_code)]

//! Harness for the mount lab.
//!
//! - **Interactive shell**: a crossterm UI over a live [`MountLab`](mountlab_core::MountLab)
//!   driven by real elapsed time ([`session`], [`view`], [`keymap`]).
//! - **Scripted runs**: deterministic headless runs in virtual time that
//!   stream the lifecycle as JSONL ([`script`], [`jsonl`]).
//! - **Leak analysis**: replays a JSONL stream and reports unbalanced item
//!   lifecycles ([`leak_report`]).
//!
//! The binary picks a mode from `MOUNTLAB_HARNESS_*` variables; see `main.rs`.

pub mod jsonl;
pub mod keymap;
pub mod leak_report;
pub mod logging;
pub mod script;
pub mod session;
pub mod view;

pub use jsonl::JsonlSink;
pub use keymap::{Action, map_key};
pub use leak_report::{LeakReport, ReportError};
pub use logging::{LogConfig, LogTarget};
pub use script::{RunSummary, Script, ScriptError, ScriptStep, run_script};
pub use session::TerminalSession;
pub use view::render;
