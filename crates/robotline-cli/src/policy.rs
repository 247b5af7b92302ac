//! Autonomous drivers over the decision interface.
//!
//! A policy looks at the scheduler (read-only) and proposes one order at a
//! time; the caller submits until the policy runs dry for the tick. Policies
//! decide from snapshots and `legal_orders` alone, so every policy works on
//! every scenario.

use robotline_core::fixed::Money;
use robotline_core::id::LocationId;
use robotline_core::order::Order;
use robotline_core::robot::{Action, Robot};
use robotline_core::scheduler::Scheduler;

/// An autonomous order source.
pub trait Policy {
    /// Propose the next order, or `None` when the policy is done this tick.
    fn next_order(&mut self, sched: &Scheduler) -> Option<Order>;
}

// ---------------------------------------------------------------------------
// Greedy
// ---------------------------------------------------------------------------

/// Baseline: submit the first legal order, whatever it is.
pub struct GreedyPolicy;

impl Policy for GreedyPolicy {
    fn next_order(&mut self, sched: &Scheduler) -> Option<Order> {
        sched.legal_orders().into_iter().next()
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Works towards growing the fleet: build robots when affordable, sell to
/// raise money, assemble to have something to sell, mine to feed assembly.
/// Idle robots that can't act where they stand are sent to wherever the best
/// blocked goal lives.
pub struct PlannerPolicy;

/// Immediate actions from most to least valuable.
const PREFERENCE: [Action; 4] = [
    Action::BuildRobot,
    Action::Sell,
    Action::Assemble,
    Action::Mine,
];

impl Policy for PlannerPolicy {
    fn next_order(&mut self, sched: &Scheduler) -> Option<Order> {
        let legal = sched.legal_orders();
        for action in PREFERENCE {
            if let Some(order) = legal.iter().find(|o| o.action == action) {
                return Some(order.clone());
            }
        }

        // Nothing executable in place: route an idle robot to the best goal.
        let world = sched.world();
        for robot_id in world.idle_robot_ids() {
            let robot = world.robot(robot_id)?;
            if let Some(dest) = best_destination(sched, robot)
                && let Some(name) = sched.catalog().location_name(dest)
            {
                return Some(Order::move_to(robot_id, name));
            }
        }
        None
    }
}

/// Where this robot should go next, in goal preference order. Only proposes
/// destinations the robot isn't already at.
fn best_destination(sched: &Scheduler, robot: &Robot) -> Option<LocationId> {
    let catalog = sched.catalog();
    let world = sched.world();

    // Anything worth selling sends us to the store.
    if robot.capabilities.contains(Action::Sell)
        && let Some(store) = catalog.sell().location
        && robot.location != Some(store)
        && catalog
            .kinds()
            .any(|(kind, def)| def.sell_value > Money::ZERO && world.stockpile.quantity(kind) > 0)
    {
        return Some(store);
    }

    // A recipe whose inputs are banked sends us to its site. Mine recipes
    // have no inputs, so they always qualify as the fallback.
    for action in [Action::BuildRobot, Action::Assemble, Action::Mine] {
        if !robot.capabilities.contains(action) {
            continue;
        }
        let mut candidates: Vec<(u32, LocationId)> = Vec::new();
        for (_, def) in catalog.recipes_for_action(action) {
            let Some(location) = def.location else {
                continue;
            };
            if robot.location == Some(location) {
                continue;
            }
            let covered = def
                .inputs
                .iter()
                .all(|entry| world.stockpile.quantity(entry.kind) >= entry.quantity)
                && world.money() >= def.money_cost;
            if !covered {
                continue;
            }
            // Prefer the recipe whose output is scarcest.
            let scarcity = def
                .outputs
                .iter()
                .map(|o| world.stockpile.quantity(o.kind))
                .min()
                .unwrap_or(0);
            candidates.push((scarcity, location));
        }
        if let Some(&(_, location)) = candidates.iter().min_by_key(|(scarcity, _)| *scarcity) {
            return Some(location);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Driving
// ---------------------------------------------------------------------------

/// Submit orders from the policy until it runs dry or an order bounces.
pub fn drive(policy: &mut dyn Policy, sched: &mut Scheduler) {
    while let Some(order) = policy.next_order(sched) {
        if sched.submit(order).is_err() {
            return;
        }
    }
}
