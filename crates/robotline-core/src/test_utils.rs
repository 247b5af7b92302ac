//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::catalog::{Catalog, CatalogBuilder, RecipeSpec, RobotBlueprint, SellPolicy};
use crate::fixed::{money, rate, Money};
use crate::robot::{Action, CapabilitySet};
use crate::scheduler::Scheduler;
use crate::world::World;

// ===========================================================================
// Catalog builders
// ===========================================================================

/// Two kinds and two recipes: mine "iron-ore" (1 tick, 1 ore) and assemble
/// "iron-bar" (3 ticks, 2 ore -> 1 bar, bar sells for 1).
pub fn simple_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();
    let ore = b.register_kind("iron-ore", Money::ZERO);
    let bar = b.register_kind("iron-bar", money(1.0));
    b.register_recipe(RecipeSpec::new("iron-ore", Action::Mine, 1).output(ore, 1));
    b.register_recipe(
        RecipeSpec::new("iron-bar", Action::Assemble, 3)
            .input(ore, 2)
            .output(bar, 1),
    );
    b.build().expect("simple catalog is valid")
}

/// The full production-line scenario: foo/bar mining, a chancy foobar
/// assembly step with a reusable bar, a robot build recipe costing money,
/// batch-limited selling, and named locations with travel times.
pub fn full_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();
    let foo = b.register_kind("foo", Money::ZERO);
    let bar = b.register_kind("bar", Money::ZERO);
    let foobar = b.register_kind("foobar", money(1.0));

    let foo_mine = b.register_location("foo-mine", 5);
    let bar_mine = b.register_location("bar-mine", 5);
    let assembly = b.register_location("assembly-line", 5);
    let store = b.register_location("material-store", 5);
    b.register_location("robot-store", 5);

    b.register_recipe(
        RecipeSpec::new("foo", Action::Mine, 1)
            .output(foo, 1)
            .at(foo_mine),
    );
    b.register_recipe(
        RecipeSpec::new("bar", Action::Mine, 2)
            .output(bar, 1)
            .at(bar_mine),
    );
    b.register_recipe(
        RecipeSpec::new("foobar", Action::Assemble, 2)
            .input(foo, 1)
            .reusable_input(bar, 1)
            .output(foobar, 1)
            .success_rate(rate(0.6))
            .at(assembly),
    );
    b.register_recipe(
        RecipeSpec::new("robot", Action::BuildRobot, 1)
            .input(foo, 6)
            .money_cost(money(3.0)),
    );

    b.set_sell_policy(SellPolicy {
        duration: 10,
        batch_limit: 5,
        location: Some(store),
    });
    b.set_blueprint(RobotBlueprint {
        capabilities: CapabilitySet::all(),
        bag_capacity: 0,
        spawn_location: None,
    });

    b.build().expect("full catalog is valid")
}

// ===========================================================================
// World and scheduler helpers
// ===========================================================================

/// A world seeded with `robots` fully capable robots and nothing else.
pub fn world_with_robots(seed: u64, robots: u32) -> World {
    let mut world = World::new(seed);
    for _ in 0..robots {
        world.spawn_robot(CapabilitySet::all(), 0, None);
    }
    world
}

/// A scheduler over [`simple_catalog`] with the given robot count.
pub fn simple_scheduler(seed: u64, robots: u32) -> Scheduler {
    Scheduler::new(simple_catalog(), world_with_robots(seed, robots))
}

// ===========================================================================
// Drivers
// ===========================================================================

/// Greedy driver: repeatedly submit the first legal order until none remain.
/// Deterministic, since `legal_orders` enumerates in a fixed order.
pub fn drive_greedy(sched: &mut Scheduler) {
    loop {
        let Some(order) = sched.legal_orders().into_iter().next() else {
            return;
        };
        if sched.submit(order).is_err() {
            return;
        }
    }
}

/// Run `ticks` ticks with the greedy driver, returning the final state hash.
pub fn run_greedy(sched: &mut Scheduler, ticks: u64) -> u64 {
    for _ in 0..ticks {
        if sched.is_over() {
            break;
        }
        drive_greedy(sched);
        sched.advance_tick();
    }
    sched.state_hash()
}
