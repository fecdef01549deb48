#![forbid(unsafe_code)]

//! Ownership of live item instances.
//!
//! [`ItemHost`] is the shell-side owner of [`AnimatedItem`]s. After every
//! state change it diffs the live set against the registry output and calls
//! [`ItemHooks`] explicitly, instead of relying on a UI framework to tear
//! things down in some implicit order.
//!
//! # Invariants
//!
//! 1. Within one reconcile, every `on_destroy` runs before any `on_create`.
//! 2. Each identity is created at most once and destroyed at most once.
//! 3. After reconcile, the live set equals the requested set.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::registry::ItemIdentity;

/// Default length of one animation loop.
pub const DEFAULT_LOOP: Duration = Duration::from_millis(1200);

/// Creation/destruction capability invoked by the host.
pub trait ItemHooks {
    /// An instance for `id` was just created.
    fn on_create(&mut self, id: ItemIdentity);

    /// The instance for `id` was just destroyed.
    fn on_destroy(&mut self, id: ItemIdentity);
}

/// A single looping animated item. Opaque apart from its age.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimatedItem {
    identity: ItemIdentity,
    age: Duration,
}

impl AnimatedItem {
    fn new(identity: ItemIdentity) -> Self {
        Self {
            identity,
            age: Duration::ZERO,
        }
    }

    /// The identity this instance was created for.
    pub fn identity(&self) -> ItemIdentity {
        self.identity
    }

    /// Time since creation.
    pub fn age(&self) -> Duration {
        self.age
    }

    /// Advance the animation clock.
    pub fn tick(&mut self, dt: Duration) {
        self.age = self.age.saturating_add(dt);
    }

    /// Progress through the current loop, in [0.0, 1.0).
    pub fn phase(&self, loop_len: Duration) -> f32 {
        if loop_len.is_zero() {
            return 0.0;
        }
        let nanos = self.age.as_nanos() % loop_len.as_nanos();
        nanos as f32 / loop_len.as_nanos() as f32
    }

    /// Frame index for a loop of `frames` frames.
    pub fn frame(&self, loop_len: Duration, frames: usize) -> usize {
        if frames == 0 {
            return 0;
        }
        ((self.phase(loop_len) * frames as f32) as usize).min(frames - 1)
    }
}

/// Counts from a single reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Instances destroyed.
    pub destroyed: usize,
    /// Instances created.
    pub created: usize,
}

impl ReconcileReport {
    /// Whether the pass changed anything.
    pub fn is_noop(&self) -> bool {
        self.destroyed == 0 && self.created == 0
    }
}

/// Owner of the live item instances.
#[derive(Debug, Default)]
pub struct ItemHost {
    items: BTreeMap<ItemIdentity, AnimatedItem>,
    created_total: u64,
    destroyed_total: u64,
}

impl ItemHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the live set equal `next`, destroying first and creating second.
    pub fn reconcile<I, H>(&mut self, next: I, hooks: &mut H) -> ReconcileReport
    where
        I: IntoIterator<Item = ItemIdentity>,
        H: ItemHooks + ?Sized,
    {
        let next: BTreeSet<ItemIdentity> = next.into_iter().collect();
        let mut report = ReconcileReport::default();

        let doomed: Vec<ItemIdentity> = self
            .items
            .keys()
            .filter(|id| !next.contains(*id))
            .copied()
            .collect();
        for id in doomed {
            self.items.remove(&id);
            self.destroyed_total += 1;
            report.destroyed += 1;
            hooks.on_destroy(id);
        }

        for id in next {
            if self.items.contains_key(&id) {
                continue;
            }
            self.items.insert(id, AnimatedItem::new(id));
            self.created_total += 1;
            report.created += 1;
            hooks.on_create(id);
        }

        tracing::trace!(
            destroyed = report.destroyed,
            created = report.created,
            live = self.items.len(),
            "host reconciled"
        );
        report
    }

    /// Advance every live animation.
    pub fn tick(&mut self, dt: Duration) {
        for item in self.items.values_mut() {
            item.tick(dt);
        }
    }

    /// Live instances in identity order.
    pub fn items(&self) -> impl Iterator<Item = &AnimatedItem> {
        self.items.values()
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is live.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Instances created over the host's lifetime.
    pub fn created_total(&self) -> u64 {
        self.created_total
    }

    /// Instances destroyed over the host's lifetime.
    pub fn destroyed_total(&self) -> u64 {
        self.destroyed_total
    }
}
