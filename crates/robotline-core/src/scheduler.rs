//! The scheduler: order validation, immediate reservation, and tick
//! resolution.
//!
//! # Order lifecycle
//!
//! 1. **Validate** -- [`Scheduler::plan`] checks an order against a consistent
//!    read of the world and computes everything the completion will need.
//! 2. **Reserve** -- [`Scheduler::submit`] applies the reservation at
//!    acceptance time: inputs leave the stockpile/bag and money is debited
//!    *before* the action starts, so two in-flight actions can never spend
//!    the same unit.
//! 3. **Resolve** -- [`Scheduler::advance_tick`] advances the clock by one,
//!    then resolves every action whose completion tick has arrived, in
//!    ascending robot id order.
//!
//! Rejected orders leave the world untouched. Cancellation refunds the full
//! reservation.

use crate::catalog::{Catalog, RecipeDef};
use crate::event::{Event, EventBus};
use crate::fixed::{Money, Ticks};
use crate::id::{RecipeId, ResourceKindId, RobotId};
use crate::order::{Order, OrderError};
use crate::robot::{Action, Activity, InFlightAction, PlannedOutcome, Reservation};
use crate::world::World;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Plans and completions
// ---------------------------------------------------------------------------

/// Everything a validated order needs to execute: how long it takes, what it
/// reserves, and what happens at the completion tick. Computed by
/// [`Scheduler::plan`] without mutating anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub duration: Ticks,
    pub outcome: PlannedOutcome,
    /// Units to take from the stockpile at acceptance, per kind, ascending.
    pub take_stockpile: Vec<(ResourceKindId, u32)>,
    /// Units to take from the robot's bag at acceptance, per kind, ascending.
    pub take_bag: Vec<(ResourceKindId, u32)>,
    /// Money to debit at acceptance.
    pub money: Money,
}

/// The result of one resolved action, reported by
/// [`Scheduler::advance_tick`]. Carries exact consumed/produced quantities so
/// callers can audit resource conservation.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub robot: RobotId,
    pub order: Order,
    pub completed_at: Ticks,
    /// False when the recipe's success roll failed.
    pub success: bool,
    /// Units that permanently left the system (reserved minus refunds).
    pub consumed: Vec<(ResourceKindId, u32)>,
    /// Units added to the stockpile.
    pub produced: Vec<(ResourceKindId, u32)>,
    /// Money credited by this completion (sale proceeds).
    pub proceeds: Money,
    /// The robot spawned by a build completion.
    pub built_robot: Option<RobotId>,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Drives a [`World`] against a frozen [`Catalog`].
#[derive(Debug)]
pub struct Scheduler {
    catalog: Catalog,
    world: World,
    /// Typed event bus; delivered at the end of every tick.
    pub event_bus: EventBus,
    /// Stop once the clock reaches this tick.
    horizon: Option<Ticks>,
    /// Stop once the robot registry reaches this size.
    robot_cap: Option<u32>,
}

impl Scheduler {
    pub fn new(catalog: Catalog, world: World) -> Self {
        Self {
            catalog,
            world,
            event_bus: EventBus::default(),
            horizon: None,
            robot_cap: None,
        }
    }

    pub fn with_horizon(mut self, horizon: Ticks) -> Self {
        self.horizon = Some(horizon);
        self
    }

    pub fn with_robot_cap(mut self, cap: u32) -> Self {
        self.robot_cap = Some(cap);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn is_over(&self) -> bool {
        self.world.is_game_over()
    }

    /// Replace the world wholesale, e.g. when restoring a snapshot. The
    /// catalog and stop conditions are kept.
    pub fn restore(&mut self, world: World) {
        self.world = world;
    }

    /// Deterministic hash of the current world state.
    pub fn state_hash(&self) -> u64 {
        self.world.state_hash()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Validate an order without mutating anything. On success, returns the
    /// plan the scheduler would execute.
    pub fn plan(&self, order: &Order) -> Result<Plan, OrderError> {
        let robot = self
            .world
            .robot(order.robot)
            .ok_or(OrderError::UnknownRobot(order.robot))?;

        if !robot.is_idle() {
            return Err(OrderError::RobotBusy(order.robot));
        }

        if !robot.capabilities.contains(order.action) {
            return Err(OrderError::MissingCapability {
                robot: order.robot,
                action: order.action,
            });
        }

        match order.action {
            Action::Mine | Action::Assemble | Action::BuildRobot => {
                self.plan_recipe(order, robot)
            }
            Action::Sell => self.plan_sell(order, robot),
            Action::Move => self.plan_move(order, robot),
        }
    }

    fn plan_recipe(
        &self,
        order: &Order,
        robot: &crate::robot::Robot,
    ) -> Result<Plan, OrderError> {
        let recipe_id = self
            .catalog
            .recipe_for(order.action, order.target.as_deref())
            .ok_or_else(|| OrderError::UnknownRecipe {
                action: order.action,
                target: order.target.clone(),
            })?;
        // recipe_for only returns ids it minted, so the lookup cannot miss.
        let recipe = self
            .catalog
            .get_recipe(recipe_id)
            .ok_or_else(|| OrderError::UnknownRecipe {
                action: order.action,
                target: order.target.clone(),
            })?;

        if let Some(required) = recipe.location
            && robot.location != Some(required)
        {
            return Err(OrderError::WrongLocation {
                robot: order.robot,
                required,
            });
        }

        let (take_stockpile, take_bag) = self.split_inputs(recipe, robot).ok_or(
            OrderError::InsufficientResources {
                robot: order.robot,
                action: order.action,
            },
        )?;

        if self.world.money() < recipe.money_cost {
            return Err(OrderError::InsufficientResources {
                robot: order.robot,
                action: order.action,
            });
        }

        let outcome = if recipe.builds_robot {
            PlannedOutcome::BuildRobot { recipe: recipe_id }
        } else {
            PlannedOutcome::Produce { recipe: recipe_id }
        };

        Ok(Plan {
            duration: recipe.duration,
            outcome,
            take_stockpile,
            take_bag,
            money: recipe.money_cost,
        })
    }

    /// Split a recipe's inputs between the stockpile and the robot's bag:
    /// stockpile first, then the bag. Returns None if the two combined can't
    /// cover the recipe.
    fn split_inputs(
        &self,
        recipe: &RecipeDef,
        robot: &crate::robot::Robot,
    ) -> Option<(Vec<(ResourceKindId, u32)>, Vec<(ResourceKindId, u32)>)> {
        let mut needed: BTreeMap<ResourceKindId, u32> = BTreeMap::new();
        for entry in &recipe.inputs {
            *needed.entry(entry.kind).or_insert(0) += entry.quantity;
        }

        let mut from_stockpile = Vec::new();
        let mut from_bag = Vec::new();
        for (kind, quantity) in needed {
            let stock = self.world.stockpile.quantity(kind).min(quantity);
            let rest = quantity - stock;
            if rest > robot.bag.quantity(kind) {
                return None;
            }
            if stock > 0 {
                from_stockpile.push((kind, stock));
            }
            if rest > 0 {
                from_bag.push((kind, rest));
            }
        }
        Some((from_stockpile, from_bag))
    }

    fn plan_sell(
        &self,
        order: &Order,
        robot: &crate::robot::Robot,
    ) -> Result<Plan, OrderError> {
        let policy = self.catalog.sell();

        if let Some(required) = policy.location
            && robot.location != Some(required)
        {
            return Err(OrderError::WrongLocation {
                robot: order.robot,
                required,
            });
        }

        let kind = order
            .target
            .as_deref()
            .and_then(|name| self.catalog.kind_id(name))
            .ok_or_else(|| OrderError::UnknownRecipe {
                action: Action::Sell,
                target: order.target.clone(),
            })?;

        let unit_value = self.catalog.sell_value(kind);
        if unit_value <= Money::ZERO {
            // Worthless kinds are not sellable.
            return Err(OrderError::UnknownRecipe {
                action: Action::Sell,
                target: order.target.clone(),
            });
        }

        let in_stock = self.world.stockpile.quantity(kind);
        let in_bag = robot.bag.quantity(kind);
        let available = (in_stock as u64 + in_bag as u64).min(policy.batch_limit as u64) as u32;
        if available == 0 {
            return Err(OrderError::InsufficientResources {
                robot: order.robot,
                action: Action::Sell,
            });
        }

        let from_stock = in_stock.min(available);
        let from_bag = available - from_stock;
        let proceeds = unit_value * Money::from_num(available);

        Ok(Plan {
            duration: policy.duration,
            outcome: PlannedOutcome::Sell {
                kind,
                units: available,
                proceeds,
            },
            take_stockpile: if from_stock > 0 {
                vec![(kind, from_stock)]
            } else {
                Vec::new()
            },
            take_bag: if from_bag > 0 {
                vec![(kind, from_bag)]
            } else {
                Vec::new()
            },
            money: Money::ZERO,
        })
    }

    fn plan_move(
        &self,
        order: &Order,
        _robot: &crate::robot::Robot,
    ) -> Result<Plan, OrderError> {
        let name = order.target.clone().unwrap_or_default();
        let location = self
            .catalog
            .location_id(&name)
            .ok_or(OrderError::UnknownDestination(name))?;
        // Checked at build time, so the def is always present.
        let travel_time = self
            .catalog
            .get_location(location)
            .map(|l| l.travel_time)
            .unwrap_or(1);

        Ok(Plan {
            duration: travel_time.max(1),
            outcome: PlannedOutcome::Arrive { location },
            take_stockpile: Vec::new(),
            take_bag: Vec::new(),
            money: Money::ZERO,
        })
    }

    // -----------------------------------------------------------------------
    // Submission and cancellation
    // -----------------------------------------------------------------------

    /// Validate an order and, on acceptance, reserve its inputs immediately
    /// and mark the robot busy. Returns the completion tick.
    pub fn submit(&mut self, order: Order) -> Result<Ticks, OrderError> {
        let plan = self.plan(&order)?;
        let now = self.world.tick();
        let completes_at = now + plan.duration;

        // Apply the reservation. plan() has verified availability, so every
        // take below succeeds in full.
        let mut reservation = Reservation {
            stockpile: Vec::new(),
            bag: Vec::new(),
            money: plan.money,
        };
        for &(kind, quantity) in &plan.take_stockpile {
            let taken = self.world.stockpile.remove(kind, quantity);
            debug_assert_eq!(taken, quantity);
            reservation.stockpile.push((kind, taken));
        }
        if plan.money > Money::ZERO {
            let ok = self.world.debit(plan.money);
            debug_assert!(ok);
        }
        let robot_id = order.robot;
        let action = order.action;
        {
            // plan() proved the robot exists and is idle.
            let robot = match self.world.robot_mut(robot_id) {
                Some(r) => r,
                None => return Err(OrderError::UnknownRobot(robot_id)),
            };
            for &(kind, quantity) in &plan.take_bag {
                let taken = robot.bag.remove(kind, quantity);
                debug_assert_eq!(taken, quantity);
                reservation.bag.push((kind, taken));
            }
            robot.activity = Activity::Busy(InFlightAction {
                order,
                started_at: now,
                completes_at,
                outcome: plan.outcome,
                reservation,
            });
        }

        self.event_bus.emit(Event::OrderAccepted {
            robot: robot_id,
            action,
            tick: now,
        });
        Ok(completes_at)
    }

    /// Abort a robot's in-flight action and refund its full reservation.
    pub fn cancel(&mut self, robot_id: RobotId) -> Result<(), OrderError> {
        let robot = self
            .world
            .robot(robot_id)
            .ok_or(OrderError::UnknownRobot(robot_id))?;
        if robot.is_idle() {
            return Err(OrderError::NothingToCancel(robot_id));
        }

        let action = {
            let robot = match self.world.robot_mut(robot_id) {
                Some(r) => r,
                None => return Err(OrderError::UnknownRobot(robot_id)),
            };
            match std::mem::replace(&mut robot.activity, Activity::Idle) {
                Activity::Busy(action) => action,
                Activity::Idle => return Err(OrderError::NothingToCancel(robot_id)),
            }
        };

        self.refund(robot_id, &action.reservation);
        let tick = self.world.tick();
        self.event_bus.emit(Event::OrderCancelled {
            robot: robot_id,
            tick,
        });
        Ok(())
    }

    /// Return a reservation's contents to where they came from.
    fn refund(&mut self, robot_id: RobotId, reservation: &Reservation) {
        for &(kind, quantity) in &reservation.stockpile {
            self.world.stockpile.add(kind, quantity);
        }
        if reservation.money > Money::ZERO {
            self.world.credit(reservation.money);
        }
        if let Some(robot) = self.world.robot_mut(robot_id) {
            for &(kind, quantity) in &reservation.bag {
                // The bag had room for these units when they were taken, and a
                // busy robot's bag cannot have gained anything since.
                let overflow = robot.bag.add(kind, quantity);
                debug_assert_eq!(overflow, 0);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tick resolution
    // -----------------------------------------------------------------------

    /// Advance the clock by one tick and resolve every due action, in
    /// ascending robot id order. Returns the completions in that order.
    ///
    /// A no-op once a stop condition has latched.
    pub fn advance_tick(&mut self) -> Vec<Completion> {
        if self.world.is_game_over() {
            return Vec::new();
        }

        self.world.advance_clock();
        let now = self.world.tick();

        // Ascending robot ids fix the completion order within a tick.
        let due: Vec<RobotId> = self
            .world
            .robots()
            .filter(|r| {
                r.in_flight()
                    .map(|a| a.completes_at <= now)
                    .unwrap_or(false)
            })
            .map(|r| r.id)
            .collect();

        let mut completions = Vec::with_capacity(due.len());
        for robot_id in due {
            if let Some(completion) = self.resolve(robot_id, now) {
                completions.push(completion);
            }
        }

        self.check_stop_conditions(now);
        #[cfg(debug_assertions)]
        self.world.assert_consistent();
        self.event_bus.deliver();
        completions
    }

    /// Resolve one due action. The reservation was applied at acceptance, so
    /// resolution only distributes outputs (or refunds on a failed roll).
    fn resolve(&mut self, robot_id: RobotId, now: Ticks) -> Option<Completion> {
        let action = {
            let robot = self.world.robot_mut(robot_id)?;
            match std::mem::replace(&mut robot.activity, Activity::Idle) {
                Activity::Busy(action) => action,
                Activity::Idle => return None,
            }
        };

        let mut completion = Completion {
            robot: robot_id,
            order: action.order.clone(),
            completed_at: now,
            success: true,
            consumed: Vec::new(),
            produced: Vec::new(),
            proceeds: Money::ZERO,
            built_robot: None,
        };

        match action.outcome {
            PlannedOutcome::Produce { recipe } | PlannedOutcome::BuildRobot { recipe } => {
                let builds_robot = matches!(action.outcome, PlannedOutcome::BuildRobot { .. });
                let def = self.catalog.get_recipe(recipe)?.clone();
                let rolled_ok = {
                    let rate = def.success_rate;
                    self.world.rng_mut().chance(rate)
                };
                if rolled_ok {
                    completion.consumed = reservation_totals(&action.reservation);
                    for (kind, quantity) in &completion.consumed {
                        self.event_bus.emit(Event::ResourceConsumed {
                            kind: *kind,
                            quantity: *quantity,
                            tick: now,
                        });
                    }
                    for output in &def.outputs {
                        self.world.stockpile.add(output.kind, output.quantity);
                        completion.produced.push((output.kind, output.quantity));
                        self.event_bus.emit(Event::ResourceProduced {
                            kind: output.kind,
                            quantity: output.quantity,
                            tick: now,
                        });
                    }
                    if builds_robot {
                        let blueprint = self.catalog.blueprint().clone();
                        let new_id = self.world.spawn_robot(
                            blueprint.capabilities,
                            blueprint.bag_capacity,
                            blueprint.spawn_location,
                        );
                        completion.built_robot = Some(new_id);
                        self.event_bus.emit(Event::RobotBuilt {
                            robot: new_id,
                            tick: now,
                        });
                    }
                    self.event_bus.emit(Event::ActionCompleted {
                        robot: robot_id,
                        action: action.order.action,
                        tick: now,
                    });
                } else {
                    completion.success = false;
                    completion.consumed =
                        self.refund_reusable(&def, &action.reservation);
                    self.event_bus.emit(Event::ActionFailed {
                        robot: robot_id,
                        recipe,
                        tick: now,
                    });
                }
            }
            PlannedOutcome::Sell {
                kind,
                units,
                proceeds,
            } => {
                self.world.credit(proceeds);
                completion.consumed = vec![(kind, units)];
                completion.proceeds = proceeds;
                self.event_bus.emit(Event::GoodsSold {
                    kind,
                    units,
                    proceeds,
                    tick: now,
                });
                self.event_bus.emit(Event::ActionCompleted {
                    robot: robot_id,
                    action: Action::Sell,
                    tick: now,
                });
            }
            PlannedOutcome::Arrive { location } => {
                if let Some(robot) = self.world.robot_mut(robot_id) {
                    robot.location = Some(location);
                }
                self.event_bus.emit(Event::RobotArrived {
                    robot: robot_id,
                    location,
                    tick: now,
                });
                self.event_bus.emit(Event::ActionCompleted {
                    robot: robot_id,
                    action: Action::Move,
                    tick: now,
                });
            }
        }

        Some(completion)
    }

    /// Refund a failed recipe's reusable inputs to the stockpile. Returns
    /// the consumed (non-refunded) quantities.
    fn refund_reusable(
        &mut self,
        def: &RecipeDef,
        reservation: &Reservation,
    ) -> Vec<(ResourceKindId, u32)> {
        let mut refunded: BTreeMap<ResourceKindId, u32> = BTreeMap::new();
        for entry in &def.inputs {
            if entry.reusable {
                *refunded.entry(entry.kind).or_insert(0) += entry.quantity;
            }
        }
        for (&kind, &quantity) in &refunded {
            self.world.stockpile.add(kind, quantity);
        }

        let mut consumed = Vec::new();
        for (kind, reserved) in reservation_totals(reservation) {
            let kept = reserved - refunded.get(&kind).copied().unwrap_or(0);
            if kept > 0 {
                consumed.push((kind, kept));
            }
        }
        consumed
    }

    fn check_stop_conditions(&mut self, now: Ticks) {
        let horizon_hit = self.horizon.map(|h| now >= h).unwrap_or(false);
        let cap_hit = self
            .robot_cap
            .map(|c| self.world.robot_count() as u32 >= c)
            .unwrap_or(false);
        if (horizon_hit || cap_hit) && !self.world.is_game_over() {
            self.world.set_game_over();
            self.event_bus.emit(Event::GameOver { tick: now });
        }
    }

    // -----------------------------------------------------------------------
    // Legal-order enumeration
    // -----------------------------------------------------------------------

    /// Every order that would currently be accepted, in deterministic order:
    /// ascending robot id, then action, then target registration order.
    /// Each candidate runs through the same validator `submit` uses.
    pub fn legal_orders(&self) -> Vec<Order> {
        let mut orders = Vec::new();
        for robot_id in self.world.idle_robot_ids() {
            for action in Action::ALL {
                for order in self.candidate_orders(robot_id, action) {
                    if self.plan(&order).is_ok() {
                        orders.push(order);
                    }
                }
            }
        }
        orders
    }

    fn candidate_orders(&self, robot: RobotId, action: Action) -> Vec<Order> {
        match action {
            Action::Mine | Action::Assemble | Action::BuildRobot => self
                .catalog
                .recipes_for_action(action)
                .map(|(_, def)| Order::recipe(robot, action, &def.name))
                .collect(),
            Action::Sell => self
                .catalog
                .kinds()
                .filter(|(_, def)| def.sell_value > Money::ZERO)
                .map(|(_, def)| Order::sell(robot, &def.name))
                .collect(),
            Action::Move => self
                .catalog
                .locations()
                .map(|(_, def)| Order::move_to(robot, &def.name))
                .collect(),
        }
    }
}

/// Total reserved units per kind, across both sources, ascending by kind.
fn reservation_totals(reservation: &Reservation) -> Vec<(ResourceKindId, u32)> {
    let mut totals: BTreeMap<ResourceKindId, u32> = BTreeMap::new();
    for &(kind, quantity) in reservation.stockpile.iter().chain(reservation.bag.iter()) {
        *totals.entry(kind).or_insert(0) += quantity;
    }
    totals.into_iter().collect()
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogBuilder, RecipeSpec, RobotBlueprint, SellPolicy};
    use crate::fixed::{money, rate};
    use crate::robot::CapabilitySet;

    /// Two kinds, a mine recipe, and a 3-tick assemble recipe (2 ore -> 1 bar).
    fn simple_catalog() -> Catalog {
        let mut b = CatalogBuilder::new();
        let ore = b.register_kind("iron-ore", Money::ZERO);
        let bar = b.register_kind("iron-bar", money(1.0));
        b.register_recipe(RecipeSpec::new("iron-ore", Action::Mine, 1).output(ore, 1));
        b.register_recipe(
            RecipeSpec::new("iron-bar", Action::Assemble, 3)
                .input(ore, 2)
                .output(bar, 1),
        );
        b.build().unwrap()
    }

    fn scheduler_with_robot(catalog: Catalog) -> (Scheduler, RobotId) {
        let mut world = World::new(42);
        let robot = world.spawn_robot(CapabilitySet::all(), 0, None);
        (Scheduler::new(catalog, world), robot)
    }

    // -----------------------------------------------------------------------
    // Test 1: Reservation happens at acceptance, not completion
    // -----------------------------------------------------------------------
    #[test]
    fn reservation_at_acceptance() {
        let catalog = simple_catalog();
        let ore = catalog.kind_id("iron-ore").unwrap();
        let (mut sched, robot) = scheduler_with_robot(catalog);
        // Reach into the world via a fresh one: seed stockpile before moving in.
        sched.world.stockpile.add(ore, 2);

        let done = sched
            .submit(Order::recipe(robot, Action::Assemble, "iron-bar"))
            .unwrap();
        assert_eq!(done, 3);
        // Inputs left the stockpile immediately.
        assert_eq!(sched.world().stockpile.quantity(ore), 0);
    }

    // -----------------------------------------------------------------------
    // Test 2: Double-spend is impossible (second order sees the reservation)
    // -----------------------------------------------------------------------
    #[test]
    fn no_double_spend() {
        let catalog = simple_catalog();
        let ore = catalog.kind_id("iron-ore").unwrap();
        let mut world = World::new(0);
        let r1 = world.spawn_robot(CapabilitySet::all(), 0, None);
        let r2 = world.spawn_robot(CapabilitySet::all(), 0, None);
        world.stockpile.add(ore, 2);
        let mut sched = Scheduler::new(catalog, world);

        sched
            .submit(Order::recipe(r1, Action::Assemble, "iron-bar"))
            .unwrap();
        let err = sched
            .submit(Order::recipe(r2, Action::Assemble, "iron-bar"))
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::InsufficientResources {
                robot: r2,
                action: Action::Assemble
            }
        );
    }

    // -----------------------------------------------------------------------
    // Test 3: Completion lands exactly at T + duration
    // -----------------------------------------------------------------------
    #[test]
    fn completion_at_exact_tick() {
        let catalog = simple_catalog();
        let ore = catalog.kind_id("iron-ore").unwrap();
        let bar = catalog.kind_id("iron-bar").unwrap();
        let (mut sched, robot) = scheduler_with_robot(catalog);
        sched.world.stockpile.add(ore, 2);

        sched
            .submit(Order::recipe(robot, Action::Assemble, "iron-bar"))
            .unwrap();

        assert!(sched.advance_tick().is_empty()); // tick 1
        assert!(sched.advance_tick().is_empty()); // tick 2
        let done = sched.advance_tick(); // tick 3
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].robot, robot);
        assert_eq!(done[0].completed_at, 3);
        assert_eq!(done[0].produced, vec![(bar, 1)]);
        assert_eq!(sched.world().stockpile.quantity(bar), 1);
        assert!(sched.world().robot(robot).unwrap().is_idle());
    }

    // -----------------------------------------------------------------------
    // Test 4: Busy robots reject further orders
    // -----------------------------------------------------------------------
    #[test]
    fn busy_robot_rejected() {
        let (mut sched, robot) = scheduler_with_robot(simple_catalog());
        sched
            .submit(Order::recipe(robot, Action::Mine, "iron-ore"))
            .unwrap();
        let err = sched
            .submit(Order::recipe(robot, Action::Mine, "iron-ore"))
            .unwrap_err();
        assert_eq!(err, OrderError::RobotBusy(robot));
    }

    // -----------------------------------------------------------------------
    // Test 5: Capability gating
    // -----------------------------------------------------------------------
    #[test]
    fn missing_capability_rejected() {
        let catalog = simple_catalog();
        let mut world = World::new(0);
        let robot = world.spawn_robot([Action::Mine].into_iter().collect(), 0, None);
        let mut sched = Scheduler::new(catalog, world);

        let err = sched
            .submit(Order::recipe(robot, Action::Assemble, "iron-bar"))
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::MissingCapability {
                robot,
                action: Action::Assemble
            }
        );
    }

    // -----------------------------------------------------------------------
    // Test 6: Unknown robot / unknown recipe
    // -----------------------------------------------------------------------
    #[test]
    fn unknown_robot_and_recipe() {
        let (mut sched, robot) = scheduler_with_robot(simple_catalog());
        assert_eq!(
            sched
                .submit(Order::recipe(RobotId(99), Action::Mine, "iron-ore"))
                .unwrap_err(),
            OrderError::UnknownRobot(RobotId(99))
        );
        assert!(matches!(
            sched
                .submit(Order::recipe(robot, Action::Mine, "gold-ore"))
                .unwrap_err(),
            OrderError::UnknownRecipe { .. }
        ));
    }

    // -----------------------------------------------------------------------
    // Test 7: Completions resolve in ascending robot id order
    // -----------------------------------------------------------------------
    #[test]
    fn completions_ascending_robot_id() {
        let catalog = simple_catalog();
        let mut world = World::new(0);
        let r1 = world.spawn_robot(CapabilitySet::all(), 0, None);
        let r2 = world.spawn_robot(CapabilitySet::all(), 0, None);
        let r3 = world.spawn_robot(CapabilitySet::all(), 0, None);
        let mut sched = Scheduler::new(catalog, world);

        // Submit in descending id order; completion order must still ascend.
        for robot in [r3, r1, r2] {
            sched
                .submit(Order::recipe(robot, Action::Mine, "iron-ore"))
                .unwrap();
        }
        let done = sched.advance_tick();
        let ids: Vec<RobotId> = done.iter().map(|c| c.robot).collect();
        assert_eq!(ids, vec![r1, r2, r3]);
    }

    // -----------------------------------------------------------------------
    // Test 8: Cancel refunds the full reservation
    // -----------------------------------------------------------------------
    #[test]
    fn cancel_refunds_reservation() {
        let catalog = simple_catalog();
        let ore = catalog.kind_id("iron-ore").unwrap();
        let (mut sched, robot) = scheduler_with_robot(catalog);
        sched.world.stockpile.add(ore, 2);

        sched
            .submit(Order::recipe(robot, Action::Assemble, "iron-bar"))
            .unwrap();
        assert_eq!(sched.world().stockpile.quantity(ore), 0);

        sched.cancel(robot).unwrap();
        assert_eq!(sched.world().stockpile.quantity(ore), 2);
        assert!(sched.world().robot(robot).unwrap().is_idle());

        // Nothing left to cancel.
        assert_eq!(
            sched.cancel(robot).unwrap_err(),
            OrderError::NothingToCancel(robot)
        );
    }

    // -----------------------------------------------------------------------
    // Test 9: Failed success roll refunds reusable inputs only
    // -----------------------------------------------------------------------
    #[test]
    fn failed_roll_refunds_reusable_inputs() {
        let mut b = CatalogBuilder::new();
        let foo = b.register_kind("foo", Money::ZERO);
        let bar = b.register_kind("bar", Money::ZERO);
        let foobar = b.register_kind("foobar", money(1.0));
        b.register_recipe(
            RecipeSpec::new("foobar", Action::Assemble, 2)
                .input(foo, 1)
                .reusable_input(bar, 1)
                .output(foobar, 1)
                .success_rate(rate(0.0)), // always fails
        );
        let catalog = b.build().unwrap();
        let (mut sched, robot) = scheduler_with_robot(catalog);
        sched.world.stockpile.add(foo, 1);
        sched.world.stockpile.add(bar, 1);

        sched
            .submit(Order::recipe(robot, Action::Assemble, "foobar"))
            .unwrap();
        sched.advance_tick();
        let done = sched.advance_tick();

        assert_eq!(done.len(), 1);
        assert!(!done[0].success);
        // The reusable bar came back; the foo was lost.
        assert_eq!(sched.world().stockpile.quantity(bar), 1);
        assert_eq!(sched.world().stockpile.quantity(foo), 0);
        assert_eq!(sched.world().stockpile.quantity(foobar), 0);
        assert_eq!(done[0].consumed, vec![(foo, 1)]);
    }

    // -----------------------------------------------------------------------
    // Test 10: Selling credits money and respects the batch limit
    // -----------------------------------------------------------------------
    #[test]
    fn sell_respects_batch_limit() {
        let mut b = CatalogBuilder::new();
        let bar = b.register_kind("iron-bar", money(1.0));
        b.set_sell_policy(SellPolicy {
            duration: 2,
            batch_limit: 5,
            location: None,
        });
        let catalog = b.build().unwrap();
        let (mut sched, robot) = scheduler_with_robot(catalog);
        sched.world.stockpile.add(bar, 8);

        sched.submit(Order::sell(robot, "iron-bar")).unwrap();
        // Only 5 of the 8 were reserved.
        assert_eq!(sched.world().stockpile.quantity(bar), 3);

        sched.advance_tick();
        let done = sched.advance_tick();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].proceeds, money(5.0));
        assert_eq!(sched.world().money(), money(5.0));
    }

    // -----------------------------------------------------------------------
    // Test 11: Build-robot consumes money and spawns from the blueprint
    // -----------------------------------------------------------------------
    #[test]
    fn build_robot_spawns_from_blueprint() {
        let mut b = CatalogBuilder::new();
        let foo = b.register_kind("foo", Money::ZERO);
        b.register_recipe(
            RecipeSpec::new("robot", Action::BuildRobot, 1)
                .input(foo, 6)
                .money_cost(money(3.0)),
        );
        b.set_blueprint(RobotBlueprint {
            capabilities: CapabilitySet::all(),
            bag_capacity: 4,
            spawn_location: None,
        });
        let catalog = b.build().unwrap();
        let (mut sched, robot) = scheduler_with_robot(catalog);
        sched.world.stockpile.add(foo, 6);
        sched.world.credit(money(3.0));

        sched
            .submit(Order::recipe(robot, Action::BuildRobot, "robot"))
            .unwrap();
        assert_eq!(sched.world().money(), Money::ZERO);
        assert_eq!(sched.world().stockpile.quantity(foo), 0);

        let done = sched.advance_tick();
        assert_eq!(done[0].built_robot, Some(RobotId(2)));
        assert_eq!(sched.world().robot_count(), 2);
        assert_eq!(sched.world().robot(RobotId(2)).unwrap().bag.capacity(), 4);
    }

    // -----------------------------------------------------------------------
    // Test 12: Insufficient money rejects a build order
    // -----------------------------------------------------------------------
    #[test]
    fn build_robot_needs_money() {
        let mut b = CatalogBuilder::new();
        b.register_recipe(
            RecipeSpec::new("robot", Action::BuildRobot, 1).money_cost(money(3.0)),
        );
        let catalog = b.build().unwrap();
        let (mut sched, robot) = scheduler_with_robot(catalog);

        let err = sched
            .submit(Order::recipe(robot, Action::BuildRobot, "robot"))
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::InsufficientResources {
                robot,
                action: Action::BuildRobot
            }
        );
    }

    // -----------------------------------------------------------------------
    // Test 13: Location gating and moving
    // -----------------------------------------------------------------------
    #[test]
    fn location_gating_and_move() {
        let mut b = CatalogBuilder::new();
        let ore = b.register_kind("iron-ore", Money::ZERO);
        let mine = b.register_location("mine", 2);
        b.register_recipe(
            RecipeSpec::new("iron-ore", Action::Mine, 1)
                .output(ore, 1)
                .at(mine),
        );
        let catalog = b.build().unwrap();
        let (mut sched, robot) = scheduler_with_robot(catalog);

        // Not at the mine yet.
        let err = sched
            .submit(Order::recipe(robot, Action::Mine, "iron-ore"))
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::WrongLocation {
                robot,
                required: mine
            }
        );

        // Unknown destination.
        assert_eq!(
            sched.submit(Order::move_to(robot, "cafeteria")).unwrap_err(),
            OrderError::UnknownDestination("cafeteria".to_string())
        );

        // Travel, then mine.
        sched.submit(Order::move_to(robot, "mine")).unwrap();
        sched.advance_tick();
        sched.advance_tick();
        assert_eq!(
            sched.world().robot(robot).unwrap().location,
            Some(mine)
        );
        sched
            .submit(Order::recipe(robot, Action::Mine, "iron-ore"))
            .unwrap();
        let done = sched.advance_tick();
        assert_eq!(done[0].produced, vec![(ore, 1)]);
    }

    // -----------------------------------------------------------------------
    // Test 14: Horizon and robot-cap stop conditions latch
    // -----------------------------------------------------------------------
    #[test]
    fn stop_conditions_latch() {
        let (sched, _) = scheduler_with_robot(simple_catalog());
        let mut sched = sched.with_horizon(2);
        assert!(!sched.is_over());
        sched.advance_tick();
        assert!(!sched.is_over());
        sched.advance_tick();
        assert!(sched.is_over());
        // Latched: further ticks are no-ops.
        assert!(sched.advance_tick().is_empty());
        assert_eq!(sched.world().tick(), 2);
    }

    #[test]
    fn robot_cap_stops_the_run() {
        let mut b = CatalogBuilder::new();
        b.register_recipe(RecipeSpec::new("robot", Action::BuildRobot, 1));
        let catalog = b.build().unwrap();
        let mut world = World::new(0);
        let robot = world.spawn_robot(CapabilitySet::all(), 0, None);
        let mut sched = Scheduler::new(catalog, world).with_robot_cap(2);

        sched
            .submit(Order::recipe(robot, Action::BuildRobot, "robot"))
            .unwrap();
        sched.advance_tick();
        assert_eq!(sched.world().robot_count(), 2);
        assert!(sched.is_over());
    }

    // -----------------------------------------------------------------------
    // Test 15: legal_orders agrees with submit
    // -----------------------------------------------------------------------
    #[test]
    fn legal_orders_agree_with_submit() {
        let catalog = simple_catalog();
        let ore = catalog.kind_id("iron-ore").unwrap();
        let (mut sched, robot) = scheduler_with_robot(catalog);
        sched.world.stockpile.add(ore, 2);

        let legal = sched.legal_orders();
        // Mining is always legal; assembling is legal with 2 ore banked.
        // No bars exist yet, so selling is not.
        assert!(legal.contains(&Order::recipe(robot, Action::Mine, "iron-ore")));
        assert!(legal.contains(&Order::recipe(robot, Action::Assemble, "iron-bar")));
        assert!(!legal.iter().any(|o| o.action == Action::Sell));

        for order in legal {
            let mut probe = sched.clone_for_probe();
            assert!(probe.submit(order).is_ok());
        }
    }

    impl Scheduler {
        /// Test helper: a submit-probe copy sharing no state with the original.
        fn clone_for_probe(&self) -> Scheduler {
            Scheduler {
                catalog: self.catalog.clone(),
                world: self.world.clone(),
                event_bus: EventBus::default(),
                horizon: self.horizon,
                robot_cap: self.robot_cap,
            }
        }
    }

    // -----------------------------------------------------------------------
    // Test 16: Rejected orders leave the state hash unchanged
    // -----------------------------------------------------------------------
    #[test]
    fn rejection_leaves_world_untouched() {
        let (mut sched, robot) = scheduler_with_robot(simple_catalog());
        let before = sched.state_hash();
        let _ = sched.submit(Order::recipe(robot, Action::Assemble, "iron-bar"));
        assert_eq!(sched.state_hash(), before);
    }

    // -----------------------------------------------------------------------
    // Test 17: Recipe draws from the bag when the stockpile runs short
    // -----------------------------------------------------------------------
    #[test]
    fn inputs_fall_back_to_bag() {
        let catalog = simple_catalog();
        let ore = catalog.kind_id("iron-ore").unwrap();
        let mut world = World::new(0);
        let robot = world.spawn_robot(CapabilitySet::all(), 10, None);
        world.stockpile.add(ore, 1);
        let overflow = world.robot_mut(robot).unwrap().bag.add(ore, 1);
        assert_eq!(overflow, 0);
        let mut sched = Scheduler::new(catalog, world);

        sched
            .submit(Order::recipe(robot, Action::Assemble, "iron-bar"))
            .unwrap();
        assert_eq!(sched.world().stockpile.quantity(ore), 0);
        assert_eq!(sched.world().robot(robot).unwrap().bag.quantity(ore), 0);
    }
}
