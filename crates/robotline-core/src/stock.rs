//! The shared stockpile: resources available to every robot.
//!
//! Quantities are unsigned, so a negative stockpile is unrepresentable.
//! Reservation (the decrement at order acceptance) and completion (the
//! increment when outputs land) are the only ways quantities change.

use crate::id::ResourceKindId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The shared pool of resources, keyed by kind. BTreeMap keeps iteration
/// order deterministic for hashing and snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stockpile {
    contents: BTreeMap<ResourceKindId, u32>,
}

impl Stockpile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add resources of a kind.
    pub fn add(&mut self, kind: ResourceKindId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        *self.contents.entry(kind).or_insert(0) += quantity;
    }

    /// Remove resources. Returns the amount actually removed.
    #[must_use = "returns the quantity actually removed, which may be less than requested"]
    pub fn remove(&mut self, kind: ResourceKindId, quantity: u32) -> u32 {
        match self.contents.get_mut(&kind) {
            Some(held) => {
                let taken = quantity.min(*held);
                *held -= taken;
                if *held == 0 {
                    self.contents.remove(&kind);
                }
                taken
            }
            None => 0,
        }
    }

    /// Get the quantity of a specific kind.
    pub fn quantity(&self, kind: ResourceKindId) -> u32 {
        self.contents.get(&kind).copied().unwrap_or(0)
    }

    /// Total units across all kinds.
    pub fn total(&self) -> u64 {
        self.contents.values().map(|&q| q as u64).sum()
    }

    /// Iterate over (kind, quantity) pairs in ascending kind order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKindId, u32)> + '_ {
        self.contents.iter().map(|(&k, &q)| (k, q))
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}
