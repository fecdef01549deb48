#![forbid(unsafe_code)]

//! User intents accepted by the lab.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::registry::COUNT_STEP;

/// A discrete user request, mapped 1:1 to a lab operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Mount the grid if empty, unmount it if populated.
    ToggleMount,
    /// Unmount, then mount a fresh generation after the remount delay.
    Remount,
    /// Change the item count by a signed delta.
    AdjustCount(i32),
    /// Start the stress cycle if stopped, stop it if running.
    ToggleStress,
}

impl Intent {
    /// Raise the item count by one step.
    pub const INCREASE: Self = Self::AdjustCount(COUNT_STEP as i32);
    /// Lower the item count by one step.
    pub const DECREASE: Self = Self::AdjustCount(-(COUNT_STEP as i32));

    /// Short stable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ToggleMount => "toggle_mount",
            Self::Remount => "remount",
            Self::AdjustCount(_) => "adjust_count",
            Self::ToggleStress => "toggle_stress",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdjustCount(delta) => write!(f, "adjust_count({delta:+})"),
            other => f.write_str(other.name()),
        }
    }
}
