#![forbid(unsafe_code)]

//! Mount-cycle lab: lifecycle churn for many animated items.
//!
//! This crate decides how many items exist, when they are created, and when
//! they are torn down. It does not render anything and does not measure
//! memory; it produces a lifecycle event stream that an external profiler or
//! log sink can diff to find instances that were never destroyed.
//!
//! # Key Components
//!
//! - [`CycleController`] - manual mount, unmount, remount, count changes
//! - [`StressScheduler`] - automated alternating mount/unmount on a period
//! - [`identities`] - the identity set for a `(visible, generation, count)` triple
//! - [`ItemHost`] - owns live [`AnimatedItem`]s and runs create/destroy hooks
//! - [`TimerQueue`] - cancellable timers on a virtual clock
//! - [`MountLab`] - ties the above together behind `dispatch` and `advance`
//!
//! # Determinism
//!
//! No component reads the wall clock. Time only moves when the owner calls
//! [`MountLab::advance`], so a scripted run produces the same event stream
//! every time.

pub mod config;
pub mod controller;
pub mod event;
pub mod host;
pub mod intent;
pub mod lab;
pub mod registry;
pub mod status;
pub mod stress;
pub mod timer;

pub use config::LabConfig;
pub use controller::{Control, CycleController, MountState, Transition};
pub use event::{Cause, EventLog, LabEvent, LabEventRecord, StressPhase};
pub use host::{AnimatedItem, ItemHooks, ItemHost, ReconcileReport};
pub use intent::Intent;
pub use lab::{LabTimer, MountLab};
pub use registry::{
    COUNT_STEP, ItemCount, ItemIdentity, MAX_ITEMS, MIN_ITEMS, MountGeneration, identities,
};
pub use status::{Controls, LabSnapshot, Status, header_line};
pub use stress::{StressScheduler, StressStep};
pub use timer::{Fired, TimerHandle, TimerId, TimerQueue, TimerState};
