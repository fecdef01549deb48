#![forbid(unsafe_code)]

//! Automated mount/unmount churn.
//!
//! [`StressScheduler`] flips the controller on a fixed period. Each tick is a
//! single direction change: Populated → Empty or Empty → Populated (with a
//! fresh generation). A full round trip therefore takes two ticks.
//!
//! # Timer discipline
//!
//! The scheduler is `Running` exactly while it holds a timer handle. Stopping
//! drops the handle, which cancels the timer. Every run also carries a run
//! number in its tick payload, and ticks from any other run are discarded, so
//! even a tick that was already popped from the queue cannot act after a
//! stop/start pair.

use std::time::Duration;

use crate::controller::{Control, CycleController, MountState, Transition};
use crate::event::StressPhase;
use crate::lab::LabTimer;
use crate::timer::{TimerHandle, TimerQueue};

/// Outcome of one stress tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressStep {
    /// 1-based tick number within the run.
    pub tick: u64,
    /// Direction of the tick.
    pub phase: StressPhase,
    /// Transition applied to the controller.
    pub transition: Transition,
}

/// Repeating driver for the mount transition.
#[derive(Debug)]
pub struct StressScheduler {
    period: Duration,
    run: u64,
    ticks: u64,
    timer: Option<TimerHandle>,
}

impl StressScheduler {
    /// Create a stopped scheduler.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            run: 0,
            ticks: 0,
            timer: None,
        }
    }

    /// Tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether the cycle is running.
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Ticks executed in the current (or last) run.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Who owns the mount transition right now.
    pub fn control(&self) -> Control {
        if self.is_running() {
            Control::Stress
        } else {
            Control::Manual
        }
    }

    /// Start a run: cancel any previous timer, tick once, arm the next tick.
    pub fn start(
        &mut self,
        controller: &mut CycleController,
        timers: &mut TimerQueue<LabTimer>,
    ) -> StressStep {
        self.timer = None;
        controller.cancel_remount();
        self.run += 1;
        self.ticks = 0;
        tracing::debug!(run = self.run, period_ms = self.period.as_millis() as u64, "stress run starting");
        let step = self.step(controller);
        self.arm(timers);
        step
    }

    /// Stop the run. Returns the tick count, or `None` if already stopped.
    pub fn stop(&mut self) -> Option<u64> {
        let handle = self.timer.take()?;
        handle.cancel();
        tracing::debug!(run = self.run, ticks = self.ticks, "stress run stopped");
        Some(self.ticks)
    }

    /// Handle a fired tick timer for `run`.
    ///
    /// Returns `None` for ticks that do not belong to the active run.
    pub fn on_tick(
        &mut self,
        run: u64,
        controller: &mut CycleController,
        timers: &mut TimerQueue<LabTimer>,
    ) -> Option<StressStep> {
        if !self.is_running() || run != self.run {
            tracing::trace!(run, active_run = self.run, "stale stress tick ignored");
            return None;
        }
        let step = self.step(controller);
        self.arm(timers);
        Some(step)
    }

    fn arm(&mut self, timers: &mut TimerQueue<LabTimer>) {
        self.timer = Some(timers.schedule(self.period, LabTimer::StressTick { run: self.run }));
    }

    fn step(&mut self, controller: &mut CycleController) -> StressStep {
        self.ticks += 1;
        let (phase, transition) = match controller.state() {
            MountState::Populated => (StressPhase::Unmount, controller.unmount()),
            MountState::Empty => (StressPhase::Mount, controller.mount()),
        };
        StressStep {
            tick: self.ticks,
            phase,
            transition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ItemCount, MountGeneration};
    use crate::timer::Fired;

    const PERIOD: Duration = Duration::from_millis(500);

    fn setup() -> (StressScheduler, CycleController, TimerQueue<LabTimer>) {
        (
            StressScheduler::new(PERIOD),
            CycleController::new(ItemCount::new(50), Duration::from_millis(100)),
            TimerQueue::new(),
        )
    }

    fn run_until(
        stress: &mut StressScheduler,
        controller: &mut CycleController,
        timers: &mut TimerQueue<LabTimer>,
        until: Duration,
    ) -> Vec<StressStep> {
        let mut steps = Vec::new();
        while let Some(Fired { payload, .. }) = timers.pop_due(until) {
            if let LabTimer::StressTick { run } = payload {
                steps.extend(stress.on_tick(run, controller, timers));
            }
        }
        timers.settle(until);
        steps
    }

    #[test]
    fn start_ticks_immediately() {
        let (mut stress, mut controller, mut timers) = setup();
        let step = stress.start(&mut controller, &mut timers);
        assert_eq!(step.tick, 1);
        assert_eq!(step.phase, StressPhase::Mount);
        assert_eq!(controller.generation(), MountGeneration::new(1));
        assert!(stress.is_running());
        assert_eq!(stress.control(), Control::Stress);
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn ticks_alternate() {
        let (mut stress, mut controller, mut timers) = setup();
        stress.start(&mut controller, &mut timers);
        let steps = run_until(&mut stress, &mut controller, &mut timers, PERIOD * 3);
        let phases: Vec<_> = steps.iter().map(|s| s.phase).collect();
        assert_eq!(
            phases,
            vec![StressPhase::Unmount, StressPhase::Mount, StressPhase::Unmount]
        );
        assert_eq!(controller.generation(), MountGeneration::new(2));
        assert_eq!(stress.ticks(), 4);
    }

    #[test]
    fn stop_cancels_pending_tick() {
        let (mut stress, mut controller, mut timers) = setup();
        stress.start(&mut controller, &mut timers);
        assert_eq!(stress.stop(), Some(1));
        assert_eq!(timers.pending(), 0);
        assert!(run_until(&mut stress, &mut controller, &mut timers, PERIOD * 10).is_empty());
        assert_eq!(controller.state(), MountState::Populated);
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut stress, mut controller, mut timers) = setup();
        assert_eq!(stress.stop(), None);
        stress.start(&mut controller, &mut timers);
        assert!(stress.stop().is_some());
        assert_eq!(stress.stop(), None);
        assert_eq!(stress.control(), Control::Manual);
    }

    #[test]
    fn ticks_from_previous_run_are_ignored() {
        let (mut stress, mut controller, mut timers) = setup();
        stress.start(&mut controller, &mut timers);
        stress.stop();
        stress.start(&mut controller, &mut timers);
        assert_eq!(timers.pending(), 1);
        assert!(stress.on_tick(1, &mut controller, &mut timers).is_none());
    }

    #[test]
    fn restart_without_stop_keeps_one_timer() {
        let (mut stress, mut controller, mut timers) = setup();
        stress.start(&mut controller, &mut timers);
        stress.start(&mut controller, &mut timers);
        stress.start(&mut controller, &mut timers);
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn start_cancels_pending_remount() {
        let (mut stress, mut controller, mut timers) = setup();
        controller.remount(Control::Manual, &mut timers);
        assert!(controller.remount_pending());
        stress.start(&mut controller, &mut timers);
        assert!(!controller.remount_pending());
        assert_eq!(timers.pending(), 1);
    }
}
