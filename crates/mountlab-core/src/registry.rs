#![forbid(unsafe_code)]

//! Item identities for a mount generation.
//!
//! The identity set is a pure function of `(visible, generation, count)`.
//! Keys from an earlier generation never reappear, so every mount produces
//! fresh item instances instead of recycling the previous ones.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest number of items the grid can hold.
pub const MIN_ITEMS: u16 = 10;
/// Largest number of items the grid can hold.
pub const MAX_ITEMS: u16 = 200;
/// Granularity of count adjustments.
pub const COUNT_STEP: u16 = 10;

/// Counter identifying one epoch of mounted items.
///
/// Starts at zero and only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MountGeneration(u64);

impl MountGeneration {
    /// The generation before anything has been mounted.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw counter value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw counter value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The generation that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MountGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of items to mount, always within [`MIN_ITEMS`, `MAX_ITEMS`] and on
/// the [`COUNT_STEP`] grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub struct ItemCount(u16);

impl ItemCount {
    /// Clamp `value` into range and round it down onto the step grid.
    pub fn new(value: u16) -> Self {
        let clamped = value.clamp(MIN_ITEMS, MAX_ITEMS);
        Self(clamped - (clamped - MIN_ITEMS) % COUNT_STEP)
    }

    /// Raw item count.
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Apply a signed delta. The result is clamped and rounded down onto
    /// the step grid, so `50 + 7` stays at 50.
    #[must_use]
    pub fn adjusted(self, delta: i32) -> Self {
        let raw = (i64::from(self.0) + i64::from(delta))
            .clamp(i64::from(MIN_ITEMS), i64::from(MAX_ITEMS));
        Self::new(u16::try_from(raw).unwrap_or(MAX_ITEMS))
    }
}

impl From<u16> for ItemCount {
    fn from(value: u16) -> Self {
        Self::new(value)
    }
}

impl From<ItemCount> for u16 {
    fn from(count: ItemCount) -> Self {
        count.0
    }
}

impl Default for ItemCount {
    fn default() -> Self {
        Self(50)
    }
}

impl fmt::Display for ItemCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable key of one item instance: `(generation, index)`, index is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemIdentity {
    /// Generation the item was mounted in.
    pub generation: MountGeneration,
    /// Position in the grid, starting at 1.
    pub index: u16,
}

impl ItemIdentity {
    /// Create an identity.
    pub const fn new(generation: MountGeneration, index: u16) -> Self {
        Self { generation, index }
    }
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.generation, self.index)
    }
}

/// Ordered identity set for the given mount state.
///
/// Empty when `visible` is false, otherwise `(generation, 1) ..= (generation, count)`.
pub fn identities(
    visible: bool,
    generation: MountGeneration,
    count: ItemCount,
) -> impl ExactSizeIterator<Item = ItemIdentity> + Clone {
    let upper = if visible { count.get() } else { 0 };
    (1..=upper).map(move |index| ItemIdentity::new(generation, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_yields_nothing() {
        let ids: Vec<_> = identities(false, MountGeneration::new(4), ItemCount::new(50)).collect();
        assert!(ids.is_empty());
    }

    #[test]
    fn visible_yields_one_based_indices() {
        let generation = MountGeneration::new(2);
        let ids: Vec<_> = identities(true, generation, ItemCount::new(10)).collect();
        assert_eq!(ids.len(), 10);
        assert_eq!(ids[0], ItemIdentity::new(generation, 1));
        assert_eq!(ids[9], ItemIdentity::new(generation, 10));
    }

    #[test]
    fn generations_never_share_identities() {
        let a: Vec<_> = identities(true, MountGeneration::new(1), ItemCount::new(20)).collect();
        let b: Vec<_> = identities(true, MountGeneration::new(2), ItemCount::new(20)).collect();
        assert!(a.iter().all(|id| !b.contains(id)));
    }

    #[test]
    fn count_clamps_at_bounds() {
        assert_eq!(ItemCount::new(0).get(), MIN_ITEMS);
        assert_eq!(ItemCount::new(500).get(), MAX_ITEMS);
        assert_eq!(ItemCount::new(200).adjusted(10).get(), 200);
        assert_eq!(ItemCount::new(10).adjusted(-10).get(), 10);
        assert_eq!(ItemCount::new(50).adjusted(10).get(), 60);
    }

    #[test]
    fn new_lands_on_grid() {
        assert_eq!(ItemCount::new(55).get(), 50);
        assert_eq!(ItemCount::new(3).get(), 10);
        assert_eq!(ItemCount::new(999).get(), 200);
    }

    #[test]
    fn extreme_deltas_saturate() {
        assert_eq!(ItemCount::new(50).adjusted(i32::MAX).get(), MAX_ITEMS);
        assert_eq!(ItemCount::new(50).adjusted(i32::MIN).get(), MIN_ITEMS);
    }

    #[test]
    fn off_step_delta_stays_on_grid() {
        assert_eq!(ItemCount::new(50).adjusted(7).get(), 50);
        assert_eq!(ItemCount::new(50).adjusted(-3).get(), 40);
        assert_eq!(ItemCount::new(50).adjusted(25).get(), 70);
    }

    #[test]
    fn deserialized_count_is_snapped() {
        let count: ItemCount = serde_json::from_str("57").unwrap();
        assert_eq!(count.get(), 50);
        assert_eq!(serde_json::to_string(&count).unwrap(), "50");
    }

    #[test]
    fn identity_display_matches_key() {
        let id = ItemIdentity::new(MountGeneration::new(3), 7);
        assert_eq!(id.to_string(), "3-7");
    }
}
