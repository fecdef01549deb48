#![forbid(unsafe_code)]

//! Read-only projections for the presentation shell.

use std::fmt;

use crate::controller::MountState;
use crate::registry::{ItemCount, MountGeneration};

/// Point-in-time view of the lab state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabSnapshot {
    /// Mount state.
    pub state: MountState,
    /// Latest generation.
    pub generation: MountGeneration,
    /// Item count setting.
    pub count: ItemCount,
    /// Whether the stress cycle is running.
    pub stress_running: bool,
    /// Whether a remount is waiting for its timer.
    pub remount_pending: bool,
    /// Live item instances.
    pub live_items: usize,
}

/// Footer status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Stress cycle running at `generation`.
    Stressing {
        /// Latest generation.
        generation: MountGeneration,
    },
    /// Grid mounted with `count` items.
    Active {
        /// Item count.
        count: ItemCount,
    },
    /// Nothing happening.
    Idle,
}

impl Status {
    /// Derive the status from a snapshot. Stress takes precedence.
    pub fn project(snapshot: &LabSnapshot) -> Self {
        if snapshot.stress_running {
            Self::Stressing {
                generation: snapshot.generation,
            }
        } else if snapshot.state == MountState::Populated {
            Self::Active {
                count: snapshot.count,
            }
        } else {
            Self::Idle
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stressing { generation } => {
                write!(f, "Stress test running (cycle {generation})")
            }
            Self::Active { count } => write!(f, "{count} animations active"),
            Self::Idle => f.write_str("Idle"),
        }
    }
}

/// Header subtitle: `Mount cycle: N | Animations: M`.
pub fn header_line(snapshot: &LabSnapshot) -> String {
    format!(
        "Mount cycle: {} | Animations: {}",
        snapshot.generation, snapshot.count
    )
}

/// Labels and availability of the shell's controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    /// Label of the mount toggle.
    pub mount_label: &'static str,
    /// Whether the remount control is offered.
    pub remount_enabled: bool,
    /// Label of the stress toggle.
    pub stress_label: &'static str,
}

impl Controls {
    /// Derive control labels from a snapshot.
    pub fn project(snapshot: &LabSnapshot) -> Self {
        let populated = snapshot.state == MountState::Populated;
        Self {
            mount_label: if populated {
                "Unmount All"
            } else {
                "Mount Animations"
            },
            remount_enabled: populated && !snapshot.stress_running,
            stress_label: if snapshot.stress_running {
                "Stop Stress Test"
            } else {
                "Start Stress Test"
            },
        }
    }
}
