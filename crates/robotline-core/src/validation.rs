//! Validation tools: state comparison, determinism checking, and the
//! resource conservation audit.

use crate::catalog::Catalog;
use crate::fixed::Ticks;
use crate::id::{ResourceKindId, RobotId};
use crate::scheduler::Scheduler;
use crate::serialize::DeserializeError;
use crate::world::World;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// State diff types
// ---------------------------------------------------------------------------

/// Difference between two world states at the robot level.
#[derive(Debug, Clone)]
pub enum RobotDiff {
    /// Robot exists only in world A.
    OnlyInA(RobotId),
    /// Robot exists only in world B.
    OnlyInB(RobotId),
    /// Robot exists in both but has different state.
    StateMismatch { robot: RobotId, description: String },
}

/// Full state diff between two worlds.
#[derive(Debug, Clone)]
pub struct StateDiff {
    pub is_identical: bool,
    pub tick_matches: bool,
    pub money_matches: bool,
    pub stockpile_matches: bool,
    pub rng_matches: bool,
    pub robot_diffs: Vec<RobotDiff>,
}

/// Compute a detailed diff between two world states.
pub fn diff_worlds(a: &World, b: &World) -> StateDiff {
    let tick_matches = a.tick() == b.tick();
    let money_matches = a.money() == b.money();
    let stockpile_matches = a.stockpile == b.stockpile;
    let rng_matches = a.rng_state() == b.rng_state();

    let mut robot_diffs = Vec::new();
    for robot_a in a.robots() {
        match b.robot(robot_a.id) {
            None => robot_diffs.push(RobotDiff::OnlyInA(robot_a.id)),
            Some(robot_b) => {
                let mut mismatches = Vec::new();
                if robot_a.activity != robot_b.activity {
                    mismatches.push("activity");
                }
                if robot_a.bag != robot_b.bag {
                    mismatches.push("bag");
                }
                if robot_a.location != robot_b.location {
                    mismatches.push("location");
                }
                if robot_a.capabilities != robot_b.capabilities {
                    mismatches.push("capabilities");
                }
                if !mismatches.is_empty() {
                    robot_diffs.push(RobotDiff::StateMismatch {
                        robot: robot_a.id,
                        description: mismatches.join(", "),
                    });
                }
            }
        }
    }
    for robot_b in b.robots() {
        if a.robot(robot_b.id).is_none() {
            robot_diffs.push(RobotDiff::OnlyInB(robot_b.id));
        }
    }

    let is_identical = tick_matches
        && money_matches
        && stockpile_matches
        && robot_diffs.is_empty()
        && a.state_hash() == b.state_hash();

    StateDiff {
        is_identical,
        tick_matches,
        money_matches,
        stockpile_matches,
        rng_matches,
        robot_diffs,
    }
}

// ---------------------------------------------------------------------------
// Determinism validation
// ---------------------------------------------------------------------------

/// Result of a determinism validation run.
#[derive(Debug)]
pub struct DeterminismResult {
    /// Whether the two runs produced identical results.
    pub is_deterministic: bool,
    /// Tick at which divergence was first detected (if any).
    pub divergence_tick: Option<Ticks>,
    /// Hash log: (tick, hash_run1, hash_run2) for each tick.
    pub hash_log: Vec<(Ticks, u64, u64)>,
}

/// Validate that replaying the same snapshot with the same driver twice
/// produces identical results.
///
/// The driver is called once per tick before the clock advances and may
/// submit any orders it likes; it must decide from the scheduler state alone.
pub fn validate_determinism(
    catalog: &Catalog,
    snapshot_data: &[u8],
    ticks: Ticks,
    driver: impl Fn(&mut Scheduler),
) -> Result<DeterminismResult, DeserializeError> {
    let mut run_a = Scheduler::new(catalog.clone(), World::deserialize(snapshot_data)?);
    let mut run_b = Scheduler::new(catalog.clone(), World::deserialize(snapshot_data)?);

    let mut hash_log = Vec::new();
    let mut divergence_tick = None;

    for _ in 0..ticks {
        driver(&mut run_a);
        driver(&mut run_b);
        run_a.advance_tick();
        run_b.advance_tick();

        let hash_a = run_a.state_hash();
        let hash_b = run_b.state_hash();
        let tick = run_a.world().tick();

        hash_log.push((tick, hash_a, hash_b));

        if hash_a != hash_b && divergence_tick.is_none() {
            divergence_tick = Some(tick);
        }
    }

    Ok(DeterminismResult {
        is_deterministic: divergence_tick.is_none(),
        divergence_tick,
        hash_log,
    })
}

// ---------------------------------------------------------------------------
// Conservation audit
// ---------------------------------------------------------------------------

/// Count every unit in the system per kind: stockpile, robot bags, and live
/// reservations. Between completions this total is invariant; completions
/// change it by exactly their produced minus consumed quantities.
pub fn resource_audit(world: &World) -> BTreeMap<ResourceKindId, u64> {
    let mut totals: BTreeMap<ResourceKindId, u64> = BTreeMap::new();
    for (kind, quantity) in world.stockpile.iter() {
        *totals.entry(kind).or_insert(0) += quantity as u64;
    }
    for robot in world.robots() {
        for (kind, quantity) in robot.bag.iter() {
            *totals.entry(kind).or_insert(0) += quantity as u64;
        }
        if let Some(action) = robot.in_flight() {
            for &(kind, quantity) in action
                .reservation
                .stockpile
                .iter()
                .chain(action.reservation.bag.iter())
            {
                *totals.entry(kind).or_insert(0) += quantity as u64;
            }
        }
    }
    totals
}

// ===========================================================================
// Tests
// ===========================================================================
