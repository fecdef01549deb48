#![forbid(unsafe_code)]

//! Lab configuration.
//!
//! Defaults: 50 items, a 100 ms gap between
//! unmount and remount, and a 500 ms stress period. Every knob can be
//! overridden from the environment:
//!
//! | Variable                     | Meaning                      |
//! |------------------------------|------------------------------|
//! | `MOUNTLAB_COUNT`             | Initial item count           |
//! | `MOUNTLAB_REMOUNT_DELAY_MS`  | Unmount → remount gap        |
//! | `MOUNTLAB_STRESS_PERIOD_MS`  | Stress tick period           |
//!
//! Unparseable values are ignored.

use std::time::Duration;

use crate::registry::ItemCount;

/// Shortest accepted timer period.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Configuration for a [`MountLab`](crate::lab::MountLab).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabConfig {
    /// Item count at startup.
    pub initial_count: ItemCount,
    /// Delay between the unmount and the fresh mount of a remount.
    pub remount_delay: Duration,
    /// Interval between stress ticks.
    pub stress_period: Duration,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            initial_count: ItemCount::default(),
            remount_delay: Duration::from_millis(100),
            stress_period: Duration::from_millis(500),
        }
    }
}

impl LabConfig {
    /// Set the initial item count, clamped and snapped to the step grid.
    pub fn with_initial_count(mut self, count: u16) -> Self {
        self.initial_count = ItemCount::new(count);
        self
    }

    /// Set the remount delay.
    pub fn with_remount_delay(mut self, delay: Duration) -> Self {
        self.remount_delay = delay.max(MIN_PERIOD);
        self
    }

    /// Set the stress tick period.
    pub fn with_stress_period(mut self, period: Duration) -> Self {
        self.stress_period = period.max(MIN_PERIOD);
        self
    }

    /// Defaults overridden by `MOUNTLAB_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse_u64 = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());

        let mut config = Self::default();
        if let Some(count) = lookup("MOUNTLAB_COUNT").and_then(|v| v.trim().parse::<u16>().ok()) {
            config = config.with_initial_count(count);
        }
        if let Some(ms) = parse_u64("MOUNTLAB_REMOUNT_DELAY_MS") {
            config = config.with_remount_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_u64("MOUNTLAB_STRESS_PERIOD_MS") {
            config = config.with_stress_period(Duration::from_millis(ms));
        }
        tracing::debug!(
            count = config.initial_count.get(),
            remount_delay_ms = config.remount_delay.as_millis() as u64,
            stress_period_ms = config.stress_period.as_millis() as u64,
            "lab config resolved"
        );
        config
    }
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
    fn defaults() {
        let config = LabConfig::default();
        assert_eq!(config.initial_count.get(), 50);
        assert_eq!(config.remount_delay, Duration::from_millis(100));
        assert_eq!(config.stress_period, Duration::from_millis(500));
    }

    #[test]
    fn env_overrides_apply() {
        let config = LabConfig::from_lookup(lookup(&[
            ("MOUNTLAB_COUNT", "120"),
            ("MOUNTLAB_REMOUNT_DELAY_MS", "250"),
            ("MOUNTLAB_STRESS_PERIOD_MS", " 40 "),
        ]));
        assert_eq!(config.initial_count.get(), 120);
        assert_eq!(config.remount_delay, Duration::from_millis(250));
        assert_eq!(config.stress_period, Duration::from_millis(40));
    }

    #[test]
    fn garbage_is_ignored() {
        let config = LabConfig::from_lookup(lookup(&[
            ("MOUNTLAB_COUNT", "lots"),
            ("MOUNTLAB_STRESS_PERIOD_MS", "-5"),
        ]));
        assert_eq!(config, LabConfig::default());
    }

    #[test]
    fn count_is_clamped_and_snapped() {
        assert_eq!(LabConfig::default().with_initial_count(5000).initial_count.get(), 200);
        assert_eq!(LabConfig::default().with_initial_count(73).initial_count.get(), 70);
    }

    #[test]
    fn zero_periods_are_raised() {
        let config = LabConfig::default()
            .with_stress_period(Duration::ZERO)
            .with_remount_delay(Duration::ZERO);
        assert_eq!(config.stress_period, MIN_PERIOD);
        assert_eq!(config.remount_delay, MIN_PERIOD);
    }
}
