#![forbid(unsafe_code)]

//! Lifecycle event stream.
//!
//! Every observable transition is recorded as a [`LabEvent`] stamped with the
//! virtual time it happened at. Events queue up inside the lab and are pulled
//! by the caller with `drain_events()`; nothing is pushed through callbacks.
//!
//! # JSONL Schema
//!
//! ```json
//! {"at_ms":0,"event":"item_created","generation":1,"index":1}
//! {"at_ms":0,"event":"all_mounted","generation":1,"count":50,"cause":"toggle"}
//! {"at_ms":500,"event":"stress_cycle","tick":2,"generation":1,"phase":"unmount"}
//! {"at_ms":500,"event":"item_destroyed","generation":1,"index":1}
//! ```
//!
//! A leak shows up as an `item_created` line with no matching
//! `item_destroyed` line for the same `(generation, index)`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::host::ItemHooks;
use crate::intent::Intent;
use crate::registry::{ItemIdentity, MountGeneration};

/// What triggered a mount or unmount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cause {
    /// Manual toggle.
    Toggle,
    /// Manual remount.
    Remount,
    /// Stress cycle tick.
    Stress,
    /// Lab shutdown.
    Shutdown,
}

/// Direction of a single stress tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressPhase {
    /// Empty → Populated.
    Mount,
    /// Populated → Empty.
    Unmount,
}

/// An observable lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LabEvent {
    /// An item instance came into existence.
    ItemCreated {
        /// Generation of the item.
        generation: MountGeneration,
        /// 1-based grid index.
        index: u16,
    },
    /// An item instance was torn down.
    ItemDestroyed {
        /// Generation of the item.
        generation: MountGeneration,
        /// 1-based grid index.
        index: u16,
    },
    /// The grid was populated.
    AllMounted {
        /// Generation now mounted.
        generation: MountGeneration,
        /// Number of items mounted.
        count: u16,
        /// Trigger.
        cause: Cause,
    },
    /// The grid was emptied.
    AllUnmounted {
        /// Generation that was torn down.
        generation: MountGeneration,
        /// Trigger.
        cause: Cause,
    },
    /// A remount was requested; the new generation mounts after `delay_ms`.
    RemountScheduled {
        /// Generation current at request time.
        generation: MountGeneration,
        /// Delay before the fresh mount.
        delay_ms: u64,
    },
    /// The stress cycle started.
    StressStarted {
        /// Tick period.
        period_ms: u64,
    },
    /// One stress tick executed.
    StressCycle {
        /// 1-based tick number within the current run.
        tick: u64,
        /// Generation after the tick.
        generation: MountGeneration,
        /// Direction of the tick.
        phase: StressPhase,
    },
    /// The stress cycle stopped.
    StressStopped {
        /// Ticks executed during the run.
        ticks: u64,
    },
    /// The item count changed.
    CountChanged {
        /// New count.
        count: u16,
    },
    /// A manual intent was refused because the stress cycle holds control.
    IntentRejected {
        /// The refused intent.
        intent: Intent,
    },
}

impl LabEvent {
    /// Stable snake_case event name, matching the JSONL `event` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ItemCreated { .. } => "item_created",
            Self::ItemDestroyed { .. } => "item_destroyed",
            Self::AllMounted { .. } => "all_mounted",
            Self::AllUnmounted { .. } => "all_unmounted",
            Self::RemountScheduled { .. } => "remount_scheduled",
            Self::StressStarted { .. } => "stress_started",
            Self::StressCycle { .. } => "stress_cycle",
            Self::StressStopped { .. } => "stress_stopped",
            Self::CountChanged { .. } => "count_changed",
            Self::IntentRejected { .. } => "intent_rejected",
        }
    }

    /// Identity carried by per-item events.
    pub fn identity(&self) -> Option<ItemIdentity> {
        match *self {
            Self::ItemCreated { generation, index } | Self::ItemDestroyed { generation, index } => {
                Some(ItemIdentity::new(generation, index))
            }
            _ => None,
        }
    }

    /// Emit the event through `tracing`.
    ///
    /// Per-item events go to `debug`, everything else to `info`.
    pub fn log(&self) {
        match self {
            Self::ItemCreated { generation, index } => {
                tracing::debug!(generation = generation.get(), index, "item mounted");
            }
            Self::ItemDestroyed { generation, index } => {
                tracing::debug!(generation = generation.get(), index, "item unmounted, cleanup triggered");
            }
            Self::AllMounted {
                generation,
                count,
                cause,
            } => {
                tracing::info!(generation = generation.get(), count, ?cause, "all items mounted");
            }
            Self::AllUnmounted { generation, cause } => {
                tracing::info!(generation = generation.get(), ?cause, "all items unmounted");
            }
            Self::RemountScheduled {
                generation,
                delay_ms,
            } => {
                tracing::info!(generation = generation.get(), delay_ms, "remount scheduled");
            }
            Self::StressStarted { period_ms } => {
                tracing::info!(period_ms, "stress test started");
            }
            Self::StressCycle {
                tick,
                generation,
                phase,
            } => {
                tracing::info!(tick, generation = generation.get(), ?phase, "stress cycle");
            }
            Self::StressStopped { ticks } => {
                tracing::info!(ticks, "stress test stopped");
            }
            Self::CountChanged { count } => {
                tracing::info!(count, "item count changed");
            }
            Self::IntentRejected { intent } => {
                tracing::warn!(%intent, "intent rejected while stress test is running");
            }
        }
    }
}

/// A [`LabEvent`] stamped with the virtual time it occurred at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabEventRecord {
    /// Milliseconds of virtual time since the lab was created.
    pub at_ms: u64,
    /// The event itself.
    #[serde(flatten)]
    pub event: LabEvent,
}

/// Buffer of pending event records.
///
/// Also serves as the item hooks for the host, turning create/destroy
/// callbacks into events.
#[derive(Debug, Default)]
pub struct EventLog {
    now: Duration,
    records: Vec<LabEventRecord>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timestamp applied to subsequent records.
    pub fn set_now(&mut self, now: Duration) {
        self.now = now;
    }

    /// Record an event at the current timestamp.
    pub fn push(&mut self, event: LabEvent) {
        event.log();
        self.records.push(LabEventRecord {
            at_ms: self.now.as_millis() as u64,
            event,
        });
    }

    /// Take all pending records.
    pub fn drain(&mut self) -> Vec<LabEventRecord> {
        std::mem::take(&mut self.records)
    }
}

impl ItemHooks for EventLog {
    fn on_create(&mut self, id: ItemIdentity) {
        self.push(LabEvent::ItemCreated {
            generation: id.generation,
            index: id.index,
        });
    }

    fn on_destroy(&mut self, id: ItemIdentity) {
        self.push(LabEvent::ItemDestroyed {
            generation: id.generation,
            index: id.index,
        });
    }
}
