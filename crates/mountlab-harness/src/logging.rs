#![forbid(unsafe_code)]

//! Tracing subscriber setup.
//!
//! | Variable            | Effect                                         |
//! |---------------------|------------------------------------------------|
//! | `MOUNTLAB_LOG`      | `EnvFilter` directives (default `info`)        |
//! | `MOUNTLAB_LOG_JSON` | `1`/`true` switches to JSON lines              |
//! | `MOUNTLAB_LOG_FILE` | Append logs to this file instead of stderr     |
//!
//! The interactive shell owns the terminal, so it must log to a file or not
//! at all; [`LogTarget::Discard`] covers the latter.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Filter used when `MOUNTLAB_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard error.
    Stderr,
    /// Append to a file.
    File(PathBuf),
    /// Drop everything.
    Discard,
}

/// Resolved logging options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter directives.
    pub filter: String,
    /// Emit JSON instead of human-readable lines.
    pub json: bool,
    /// Destination.
    pub target: LogTarget,
}

impl LogConfig {
    /// Read `MOUNTLAB_LOG*` variables. `fallback` applies when no file is set.
    pub fn from_env(fallback: LogTarget) -> Self {
        Self::from_lookup(|name| std::env::var(name).ok(), fallback)
    }

    /// Resolve options through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, fallback: LogTarget) -> Self {
        let filter = lookup("MOUNTLAB_LOG")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let json = lookup("MOUNTLAB_LOG_JSON")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);
        let target = lookup("MOUNTLAB_LOG_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(|v| LogTarget::File(PathBuf::from(v)))
            .unwrap_or(fallback);
        Self {
            filter,
            json,
            target,
        }
    }
}

/// Install the global subscriber.
///
/// A second call is a no-op, so tests can call it freely.
pub fn init(config: &LogConfig) -> io::Result<()> {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match (&config.target, config.json) {
        (LogTarget::Discard, _) => return Ok(()),
        (LogTarget::Stderr, false) => builder.with_writer(io::stderr).try_init(),
        (LogTarget::Stderr, true) => builder.json().with_writer(io::stderr).try_init(),
        (LogTarget::File(path), json) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let writer = Mutex::new(file);
            if json {
                builder.json().with_ansi(false).with_writer(writer).try_init()
            } else {
                builder.with_ansi(false).with_writer(writer).try_init()
            }
        }
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = LogConfig::from_lookup(lookup(&[]), LogTarget::Stderr);
        assert_eq!(config.filter, "info");
        assert!(!config.json);
        assert_eq!(config.target, LogTarget::Stderr);
    }

    #[test]
    fn file_overrides_fallback() {
        let config = LogConfig::from_lookup(
            lookup(&[
                ("MOUNTLAB_LOG", "mountlab_core=debug"),
                ("MOUNTLAB_LOG_JSON", "TRUE"),
                ("MOUNTLAB_LOG_FILE", "/tmp/lab.log"),
            ]),
            LogTarget::Discard,
        );
        assert_eq!(config.filter, "mountlab_core=debug");
        assert!(config.json);
        assert_eq!(config.target, LogTarget::File(PathBuf::from("/tmp/lab.log")));
    }

    #[test]
    fn discard_installs_nothing() {
        let config = LogConfig::from_lookup(lookup(&[]), LogTarget::Discard);
        assert!(init(&config).is_ok());
    }
}
