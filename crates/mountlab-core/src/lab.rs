#![forbid(unsafe_code)]

//! The lab: state, timers, and live items behind one event-driven loop.
//!
//! [`MountLab`] is the single writer of all mount state. Intents arrive
//! through [`dispatch`](MountLab::dispatch), time arrives through
//! [`advance`](MountLab::advance); both run to completion without blocking.
//! After every state change the item host is reconciled against the
//! registry, and the resulting lifecycle events queue up until
//! [`drain_events`](MountLab::drain_events) is called.
//!
//! # Example
//!
//! ```
//! use mountlab_core::{Intent, LabConfig, LabEvent, MountLab};
//! use std::time::Duration;
//!
//! let mut lab = MountLab::new(LabConfig::default());
//! lab.dispatch(Intent::ToggleMount);
//! assert_eq!(lab.host().len(), 50);
//!
//! lab.dispatch(Intent::Remount);
//! lab.advance(Duration::from_millis(100));
//! let created = lab
//!     .drain_events()
//!     .iter()
//!     .filter(|r| matches!(r.event, LabEvent::ItemCreated { .. }))
//!     .count();
//! assert_eq!(created, 100);
//! ```

use std::time::Duration;

use crate::config::LabConfig;
use crate::controller::{CycleController, Transition};
use crate::event::{Cause, EventLog, LabEvent, LabEventRecord};
use crate::host::{ItemHost, ReconcileReport};
use crate::intent::Intent;
use crate::registry::ItemIdentity;
use crate::status::{Controls, LabSnapshot, Status};
use crate::stress::{StressScheduler, StressStep};
use crate::timer::TimerQueue;

/// Payload of every timer the lab arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabTimer {
    /// The delayed half of a remount.
    RemountDue,
    /// A stress tick belonging to stress run `run`.
    StressTick {
        /// Run number the tick was armed for.
        run: u64,
    },
}

/// Mount-cycle lab.
#[derive(Debug)]
pub struct MountLab {
    config: LabConfig,
    controller: CycleController,
    stress: StressScheduler,
    timers: TimerQueue<LabTimer>,
    host: ItemHost,
    events: EventLog,
}

impl MountLab {
    /// Create an empty lab.
    pub fn new(config: LabConfig) -> Self {
        let controller = CycleController::new(config.initial_count, config.remount_delay);
        let stress = StressScheduler::new(config.stress_period);
        tracing::info!(
            count = config.initial_count.get(),
            remount_delay_ms = config.remount_delay.as_millis() as u64,
            stress_period_ms = config.stress_period.as_millis() as u64,
            "mount lab ready"
        );
        Self {
            config,
            controller,
            stress,
            timers: TimerQueue::new(),
            host: ItemHost::new(),
            events: EventLog::new(),
        }
    }

    /// Apply a user intent.
    pub fn dispatch(&mut self, intent: Intent) {
        let _span = tracing::debug_span!("dispatch", intent = %intent).entered();
        match intent {
            Intent::ToggleMount => self.toggle(),
            Intent::Remount => self.remount(),
            Intent::AdjustCount(delta) => self.adjust_count(delta),
            Intent::ToggleStress => {
                if self.stress.is_running() {
                    self.stop_stress();
                } else {
                    self.start_stress();
                }
            }
        }
    }

    /// Mount if empty, unmount if populated. Rejected while stressing.
    pub fn toggle(&mut self) {
        self.events.set_now(self.timers.now());
        let transition = self.controller.toggle(self.stress.control());
        self.apply(transition, Cause::Toggle, Intent::ToggleMount);
    }

    /// Unmount now, mount a fresh generation after the remount delay.
    /// Rejected while stressing.
    pub fn remount(&mut self) {
        self.events.set_now(self.timers.now());
        let transition = self.controller.remount(self.stress.control(), &mut self.timers);
        self.apply(transition, Cause::Remount, Intent::Remount);
    }

    /// Change the item count. A mounted grid follows immediately.
    pub fn adjust_count(&mut self, delta: i32) {
        self.events.set_now(self.timers.now());
        if let Some(count) = self.controller.adjust_count(delta) {
            self.events.push(LabEvent::CountChanged { count: count.get() });
            self.reconcile();
        }
    }

    /// Start the stress cycle, ticking once right away. No-op when already
    /// running.
    pub fn start_stress(&mut self) {
        if self.stress.is_running() {
            return;
        }
        self.events.set_now(self.timers.now());
        self.events.push(LabEvent::StressStarted {
            period_ms: self.stress.period().as_millis() as u64,
        });
        let step = self.stress.start(&mut self.controller, &mut self.timers);
        self.apply_step(step);
    }

    /// Stop the stress cycle. No-op when already stopped.
    pub fn stop_stress(&mut self) {
        self.events.set_now(self.timers.now());
        if let Some(ticks) = self.stress.stop() {
            self.events.push(LabEvent::StressStopped { ticks });
        }
    }

    /// Advance virtual time by `dt`, firing every timer that comes due.
    pub fn advance(&mut self, dt: Duration) {
        let target = self.timers.now() + dt;
        while let Some(fired) = self.timers.pop_due(target) {
            self.events.set_now(fired.at);
            match fired.payload {
                LabTimer::RemountDue => {
                    let transition = self.controller.complete_remount(fired.id);
                    self.apply_quiet(transition, Cause::Remount);
                }
                LabTimer::StressTick { run } => {
                    if let Some(step) =
                        self.stress
                            .on_tick(run, &mut self.controller, &mut self.timers)
                    {
                        self.apply_step(step);
                    }
                }
            }
        }
        self.timers.settle(target);
        self.events.set_now(target);
        self.host.tick(dt);
    }

    /// Stop everything and tear down every live item.
    ///
    /// Leaves a balanced event stream: every creation has its destruction.
    pub fn shutdown(&mut self) {
        self.stop_stress();
        self.controller.cancel_remount();
        let transition = self.controller.unmount();
        self.apply_quiet(transition, Cause::Shutdown);
        self.timers.cancel_all();
        tracing::info!(
            created = self.host.created_total(),
            destroyed = self.host.destroyed_total(),
            "mount lab shut down"
        );
    }

    /// Take all queued lifecycle events.
    pub fn drain_events(&mut self) -> Vec<LabEventRecord> {
        self.events.drain()
    }

    /// Current state.
    pub fn snapshot(&self) -> LabSnapshot {
        LabSnapshot {
            state: self.controller.state(),
            generation: self.controller.generation(),
            count: self.controller.count(),
            stress_running: self.stress.is_running(),
            remount_pending: self.controller.remount_pending(),
            live_items: self.host.len(),
        }
    }

    /// Footer status.
    pub fn status(&self) -> Status {
        Status::project(&self.snapshot())
    }

    /// Control labels and availability.
    pub fn controls(&self) -> Controls {
        Controls::project(&self.snapshot())
    }

    /// Identity set for the current state.
    pub fn identities(&self) -> impl ExactSizeIterator<Item = ItemIdentity> + Clone {
        self.controller.identities()
    }

    /// Configuration the lab was built with.
    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    /// Timers still armed.
    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// When the next timer fires, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// The mount controller.
    pub fn controller(&self) -> &CycleController {
        &self.controller
    }

    /// The stress scheduler.
    pub fn stress(&self) -> &StressScheduler {
        &self.stress
    }

    /// Live item instances.
    pub fn host(&self) -> &ItemHost {
        &self.host
    }

    fn apply_step(&mut self, step: StressStep) {
        self.events.push(LabEvent::StressCycle {
            tick: step.tick,
            generation: self.controller.generation(),
            phase: step.phase,
        });
        self.apply_quiet(step.transition, Cause::Stress);
    }

    fn apply(&mut self, transition: Transition, cause: Cause, intent: Intent) {
        if transition == Transition::Rejected {
            self.events.push(LabEvent::IntentRejected { intent });
            return;
        }
        self.apply_quiet(transition, cause);
    }

    fn apply_quiet(&mut self, transition: Transition, cause: Cause) {
        match transition {
            Transition::Mounted { generation, count } => {
                self.reconcile();
                self.events.push(LabEvent::AllMounted {
                    generation,
                    count: count.get(),
                    cause,
                });
            }
            Transition::Unmounted { generation } => {
                self.reconcile();
                self.events.push(LabEvent::AllUnmounted { generation, cause });
            }
            Transition::RemountScheduled {
                generation,
                unmounted,
                delay,
            } => {
                if unmounted {
                    self.reconcile();
                    self.events.push(LabEvent::AllUnmounted { generation, cause });
                }
                self.events.push(LabEvent::RemountScheduled {
                    generation,
                    delay_ms: delay.as_millis() as u64,
                });
            }
            Transition::Rejected | Transition::Unchanged => {}
        }
    }

    fn reconcile(&mut self) -> ReconcileReport {
        self.host
            .reconcile(self.controller.identities(), &mut self.events)
    }
}
