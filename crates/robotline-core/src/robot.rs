//! Robots: capability sets, carried-resource bags, and the activity state
//! machine.
//!
//! A robot is plain data owned by the [`World`](crate::world::World)'s
//! registry; it never holds a reference back to the world. The in-flight
//! action lives *inside* [`Activity::Busy`], so a robot holding two
//! concurrent actions is unrepresentable.

use crate::fixed::{Money, Ticks};
use crate::id::{LocationId, RecipeId, ResourceKindId, RobotId};
use crate::order::Order;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Actions and capabilities
// ---------------------------------------------------------------------------

/// The closed set of action kinds a robot can perform. Validation and the
/// scheduler match exhaustively over this enum, so adding an action kind is
/// a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Mine,
    Assemble,
    BuildRobot,
    Sell,
    Move,
}

impl Action {
    /// All action kinds in their canonical enumeration order.
    pub const ALL: [Action; 5] = [
        Action::Mine,
        Action::Assemble,
        Action::BuildRobot,
        Action::Sell,
        Action::Move,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Mine => "mine",
            Action::Assemble => "assemble",
            Action::BuildRobot => "build-robot",
            Action::Sell => "sell",
            Action::Move => "move",
        }
    }

    /// Parse the canonical kebab-case tag.
    pub fn parse(s: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.as_str() == s)
    }

    fn bit(self) -> u8 {
        match self {
            Action::Mine => 1 << 0,
            Action::Assemble => 1 << 1,
            Action::BuildRobot => 1 << 2,
            Action::Sell => 1 << 3,
            Action::Move => 1 << 4,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of action kinds a robot is permitted to perform. Stored as a
/// bitmask so it is cheap to copy, hash, and serialize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub fn empty() -> Self {
        Self(0)
    }

    /// Every action kind.
    pub fn all() -> Self {
        Action::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, action: Action) {
        self.0 |= action.bit();
    }

    pub fn contains(&self, action: Action) -> bool {
        self.0 & action.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate contained actions in canonical enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        let mask = self.0;
        Action::ALL.into_iter().filter(move |a| mask & a.bit() != 0)
    }

    /// Raw bitmask, for hashing.
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl FromIterator<Action> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = Self::empty();
        for action in iter {
            set.insert(action);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Carried-resource bag
// ---------------------------------------------------------------------------

/// A robot's carried resources, bounded by a per-robot capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bag {
    contents: BTreeMap<ResourceKindId, u32>,
    capacity: u32,
}

impl Bag {
    pub fn new(capacity: u32) -> Self {
        Self {
            contents: BTreeMap::new(),
            capacity,
        }
    }

    /// Add resources. Returns the amount that didn't fit.
    #[must_use = "overflow count indicates resources that did not fit"]
    pub fn add(&mut self, kind: ResourceKindId, quantity: u32) -> u32 {
        let space = self.capacity.saturating_sub(self.total_u32());
        let to_add = quantity.min(space);
        if to_add > 0 {
            *self.contents.entry(kind).or_insert(0) += to_add;
        }
        quantity - to_add
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

    pub fn quantity(&self, kind: ResourceKindId) -> u32 {
        self.contents.get(&kind).copied().unwrap_or(0)
    }

    fn total_u32(&self) -> u32 {
        self.contents.values().sum()
    }

    /// Total units carried.
    pub fn total(&self) -> u32 {
        self.total_u32()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Iterate over (kind, quantity) pairs in ascending kind order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKindId, u32)> + '_ {
        self.contents.iter().map(|(&k, &q)| (k, q))
    }
}

// ---------------------------------------------------------------------------
// In-flight actions
// ---------------------------------------------------------------------------

/// The inputs taken from the world when an order was accepted, split by
/// where they came from. Recorded exactly so cancellation can refund and the
/// conservation audit can count reserved units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// Units taken from the shared stockpile, per kind.
    pub stockpile: Vec<(ResourceKindId, u32)>,
    /// Units taken from the robot's own bag, per kind.
    pub bag: Vec<(ResourceKindId, u32)>,
    /// Money deducted.
    pub money: Money,
}

impl Reservation {
    /// Total units reserved of a given kind, across both sources.
    pub fn reserved(&self, kind: ResourceKindId) -> u32 {
        self.stockpile
            .iter()
            .chain(self.bag.iter())
            .filter(|(k, _)| *k == kind)
            .map(|(_, q)| q)
            .sum()
    }
}

/// What an in-flight action will do at its completion tick. Computed at
/// acceptance time so completion never re-validates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlannedOutcome {
    /// Apply a recipe's outputs to the stockpile (mine and assemble orders).
    /// Subject to the recipe's success roll.
    Produce { recipe: RecipeId },
    /// Spawn a new robot from the catalog blueprint.
    BuildRobot { recipe: RecipeId },
    /// Credit sale proceeds for the reserved units.
    Sell {
        kind: ResourceKindId,
        units: u32,
        proceeds: Money,
    },
    /// Set the robot's location.
    Arrive { location: LocationId },
}

/// An accepted order awaiting its completion tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InFlightAction {
    pub order: Order,
    pub started_at: Ticks,
    pub completes_at: Ticks,
    pub outcome: PlannedOutcome,
    pub reservation: Reservation,
}

// ---------------------------------------------------------------------------
// Robot
// ---------------------------------------------------------------------------

/// The robot activity state machine. Idle -> Busy on order acceptance;
/// Busy -> Idle on completion (applied by the scheduler only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Activity {
    Idle,
    Busy(InFlightAction),
}

/// A stateful actor on the production line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Robot {
    pub id: RobotId,
    pub capabilities: CapabilitySet,
    pub activity: Activity,
    pub bag: Bag,
    /// Current location, if the scenario uses locations at all.
    pub location: Option<LocationId>,
}

impl Robot {
    pub fn new(
        id: RobotId,
        capabilities: CapabilitySet,
        bag_capacity: u32,
        location: Option<LocationId>,
    ) -> Self {
        Self {
            id,
            capabilities,
            activity: Activity::Idle,
            bag: Bag::new(bag_capacity),
            location,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.activity, Activity::Idle)
    }

    /// The in-flight action, if busy.
    pub fn in_flight(&self) -> Option<&InFlightAction> {
        match &self.activity {
            Activity::Busy(action) => Some(action),
            Activity::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_robots_are_idle() {
        let robot = Robot::new(RobotId(1), CapabilitySet::all(), 10, None);
        assert!(robot.is_idle());
        assert!(robot.in_flight().is_none());
    }

    #[test]
    fn capability_set_round_trip() {
        let caps: CapabilitySet = [Action::Mine, Action::Sell].into_iter().collect();
        assert!(caps.contains(Action::Mine));
        assert!(caps.contains(Action::Sell));
        assert!(!caps.contains(Action::Assemble));
        let listed: Vec<_> = caps.iter().collect();
        assert_eq!(listed, vec![Action::Mine, Action::Sell]);
    }

    #[test]
    fn capability_set_all_contains_everything() {
        let caps = CapabilitySet::all();
        for action in Action::ALL {
            assert!(caps.contains(action));
        }
    }

    #[test]
    fn action_tag_round_trip() {
        for action in Action::ALL {
            assert_eq!(Action::parse(action.as_str()), Some(action));
        }
        assert_eq!(Action::parse("teleport"), None);
    }

    #[test]
    fn bag_overflow() {
        let mut bag = Bag::new(5);
        let ore = ResourceKindId(0);
        assert_eq!(bag.add(ore, 3), 0);
        assert_eq!(bag.add(ore, 4), 2);
        assert_eq!(bag.total(), 5);
    }

    #[test]
    fn bag_remove_caps_at_held() {
        let mut bag = Bag::new(10);
        let ore = ResourceKindId(0);
        let _ = bag.add(ore, 4);
        assert_eq!(bag.remove(ore, 9), 4);
        assert_eq!(bag.quantity(ore), 0);
    }

    #[test]
    fn reservation_counts_both_sources() {
        let ore = ResourceKindId(0);
        let res = Reservation {
            stockpile: vec![(ore, 2)],
            bag: vec![(ore, 1)],
            money: Money::ZERO,
        };
        assert_eq!(res.reserved(ore), 3);
        assert_eq!(res.reserved(ResourceKindId(1)), 0);
    }
}
