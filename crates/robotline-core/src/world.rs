//! The world: the single mutable simulation state.
//!
//! Owns the tick counter, the shared stockpile, the money balance, the robot
//! registry, and the PRNG. All mutation flows through the
//! [`Scheduler`](crate::scheduler::Scheduler); the world itself only offers
//! primitive moves and bookkeeping.

use crate::fixed::{Money, Ticks};
use crate::id::{LocationId, RobotId};
use crate::robot::{Activity, CapabilitySet, Robot};
use crate::rng::SimRng;
use crate::sim::StateHash;
use crate::stock::Stockpile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The complete mutable state of a production line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    /// Current simulation time. Advances by exactly 1 per scheduler tick.
    tick: Ticks,
    /// Shared resources available to every robot.
    pub stockpile: Stockpile,
    /// Shared money balance. Never negative.
    money: Money,
    /// Robot registry, keyed by id. BTreeMap keeps iteration in ascending id
    /// order, which fixes the completion order within a tick.
    robots: BTreeMap<RobotId, Robot>,
    /// Next id to assign. Starts at 1; ids are never reused.
    next_robot_id: u32,
    /// Seeded PRNG for recipe success rolls. Part of the state hash.
    rng: SimRng,
    /// Latched once a stop condition is reached. Never cleared.
    game_over: bool,
}

impl World {
    pub fn new(seed: u64) -> Self {
        Self {
            tick: 0,
            stockpile: Stockpile::new(),
            money: Money::ZERO,
            robots: BTreeMap::new(),
            next_robot_id: 1,
            rng: SimRng::new(seed),
            game_over: false,
        }
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    pub fn tick(&self) -> Ticks {
        self.tick
    }

    /// Advance time by one tick. Scheduler use only.
    pub(crate) fn advance_clock(&mut self) {
        self.tick += 1;
    }

    // -----------------------------------------------------------------------
    // Money
    // -----------------------------------------------------------------------

    pub fn money(&self) -> Money {
        self.money
    }

    pub fn credit(&mut self, amount: Money) {
        self.money += amount;
    }

    /// Deduct money. Returns false (leaving the balance unchanged) if the
    /// balance cannot cover it.
    pub fn debit(&mut self, amount: Money) -> bool {
        if self.money < amount {
            return false;
        }
        self.money -= amount;
        true
    }

    // -----------------------------------------------------------------------
    // Robots
    // -----------------------------------------------------------------------

    /// Add a robot and return its freshly assigned id.
    pub fn spawn_robot(
        &mut self,
        capabilities: CapabilitySet,
        bag_capacity: u32,
        location: Option<LocationId>,
    ) -> RobotId {
        let id = RobotId(self.next_robot_id);
        self.next_robot_id += 1;
        self.robots
            .insert(id, Robot::new(id, capabilities, bag_capacity, location));
        id
    }

    pub fn robot(&self, id: RobotId) -> Option<&Robot> {
        self.robots.get(&id)
    }

    pub fn robot_mut(&mut self, id: RobotId) -> Option<&mut Robot> {
        self.robots.get_mut(&id)
    }

    /// Robots in ascending id order.
    pub fn robots(&self) -> impl Iterator<Item = &Robot> {
        self.robots.values()
    }

    pub fn robots_mut(&mut self) -> impl Iterator<Item = &mut Robot> {
        self.robots.values_mut()
    }

    pub fn robot_count(&self) -> usize {
        self.robots.len()
    }

    /// Ids of robots currently idle, ascending.
    pub fn idle_robot_ids(&self) -> Vec<RobotId> {
        self.robots
            .values()
            .filter(|r| r.is_idle())
            .map(|r| r.id)
            .collect()
    }

    // -----------------------------------------------------------------------
    // RNG / game over
    // -----------------------------------------------------------------------

    pub fn rng_mut(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    /// The PRNG's raw state, for diffing and diagnostics.
    pub fn rng_state(&self) -> u64 {
        self.rng.state()
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub(crate) fn set_game_over(&mut self) {
        self.game_over = true;
    }

    // -----------------------------------------------------------------------
    // Hashing and consistency
    // -----------------------------------------------------------------------

    /// Compute a deterministic hash of the full world state. Two runs that
    /// are byte-identical produce equal hashes at every tick.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.tick);
        h.write_fixed64(self.money);
        h.write_u64(self.rng.state());
        h.write(&[self.game_over as u8]);

        for (kind, quantity) in self.stockpile.iter() {
            h.write_u32(kind.0);
            h.write_u32(quantity);
        }

        for robot in self.robots.values() {
            h.write_u32(robot.id.0);
            h.write(&[robot.capabilities.bits()]);
            match robot.location {
                Some(loc) => {
                    h.write(&[1]);
                    h.write(&loc.0.to_le_bytes());
                }
                None => h.write(&[0]),
            }
            h.write_u32(robot.bag.capacity());
            for (kind, quantity) in robot.bag.iter() {
                h.write_u32(kind.0);
                h.write_u32(quantity);
            }
            match &robot.activity {
                Activity::Idle => h.write(&[0]),
                Activity::Busy(action) => {
                    h.write(&[1]);
                    h.write_u64(action.started_at);
                    h.write_u64(action.completes_at);
                    h.write_fixed64(action.reservation.money);
                    for (kind, quantity) in &action.reservation.stockpile {
                        h.write_u32(kind.0);
                        h.write_u32(*quantity);
                    }
                    for (kind, quantity) in &action.reservation.bag {
                        h.write_u32(kind.0);
                        h.write_u32(*quantity);
                    }
                }
            }
        }

        h.finish()
    }

    /// Panic with a diagnostic if an internal invariant is broken. Called by
    /// the scheduler after every tick in debug builds.
    pub fn assert_consistent(&self) {
        assert!(
            self.money >= Money::ZERO,
            "money balance went negative: {} at tick {}",
            self.money,
            self.tick
        );
        for robot in self.robots.values() {
            assert!(
                robot.bag.total() <= robot.bag.capacity(),
                "robot {}: bag holds {} units, over its capacity of {}",
                robot.id,
                robot.bag.total(),
                robot.bag.capacity()
            );
            assert!(
                robot.id.0 < self.next_robot_id,
                "robot {} has an id at or past the allocation cursor {}",
                robot.id,
                self.next_robot_id
            );
            if let Activity::Busy(action) = &robot.activity {
                assert!(
                    action.completes_at > action.started_at,
                    "robot {}: in-flight action completes at {} but started at {}",
                    robot.id,
                    action.completes_at,
                    action.started_at
                );
                assert!(
                    action.completes_at > self.tick,
                    "robot {}: in-flight action due at {} survived past tick {}",
                    robot.id,
                    action.completes_at,
                    self.tick
                );
            }
        }
    }
}
