//! Robotline Core -- a deterministic, tick-based production line simulation.
//!
//! Robots mine resources, assemble parts, build more robots, and sell goods.
//! A driver (interactive or autonomous) issues orders; the scheduler
//! validates them, reserves their inputs immediately, and resolves them at
//! exact completion ticks.
//!
//! # Order Lifecycle
//!
//! Each order moves through three steps:
//!
//! 1. **Validate** -- [`scheduler::Scheduler::plan`] checks the order against
//!    a consistent read of the world. Rejections leave the world untouched.
//! 2. **Reserve** -- [`scheduler::Scheduler::submit`] removes the inputs from
//!    the stockpile (and the robot's bag) and debits money at acceptance, so
//!    no two in-flight actions can spend the same unit.
//! 3. **Resolve** -- [`scheduler::Scheduler::advance_tick`] advances the
//!    clock by one and resolves every due action in ascending robot id order.
//!
//! # Key Types
//!
//! - [`scheduler::Scheduler`] -- Order validation, reservation, and tick
//!   resolution.
//! - [`catalog::Catalog`] -- Immutable registry of resource kinds, recipes,
//!   locations, the sell policy, and the robot blueprint (frozen at startup).
//! - [`world::World`] -- The mutable simulation state: clock, stockpile,
//!   money, robots, and the seeded PRNG.
//! - [`robot::Robot`] -- Capability set, carried-resource bag, and the
//!   idle/busy activity state machine.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`event::EventBus`] -- Ring-buffered event bus with batched delivery.
//! - [`serialize`] -- Versioned serialization and snapshot support via
//!   bitcode.
//!
//! Identical catalogs, seeds, and order sequences produce byte-identical
//! runs; [`validation::validate_determinism`] checks this with per-tick
//! state hashes.

pub mod catalog;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod event;
pub mod fixed;
pub mod id;
pub mod order;
pub mod query;
pub mod rng;
pub mod robot;
pub mod scheduler;
pub mod serialize;
pub mod sim;
pub mod stock;
pub mod validation;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
