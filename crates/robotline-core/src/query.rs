//! Read-only snapshot types for drivers and UIs.
//!
//! Snapshots are owned copies: taking one borrows the world briefly and
//! returns plain data with names already resolved, so callers never hold a
//! borrow into the simulation while deciding what to do next.

use crate::catalog::Catalog;
use crate::fixed::{Money, Ticks};
use crate::id::{ResourceKindId, RobotId};
use crate::robot::Action;
use crate::scheduler::Scheduler;
use crate::world::World;

/// One stockpile or bag line: a kind, its display name, and the quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockEntry {
    pub kind: ResourceKindId,
    pub name: String,
    pub quantity: u32,
}

/// A robot's in-flight action, as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightSnapshot {
    pub action: Action,
    pub target: Option<String>,
    pub started_at: Ticks,
    pub completes_at: Ticks,
}

/// An owned copy of one robot's externally visible state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotSnapshot {
    pub id: RobotId,
    pub capabilities: Vec<Action>,
    pub busy: Option<InFlightSnapshot>,
    pub bag: Vec<StockEntry>,
    pub location: Option<String>,
}

impl RobotSnapshot {
    pub fn is_idle(&self) -> bool {
        self.busy.is_none()
    }
}

/// An owned copy of the full externally visible world state.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSnapshot {
    pub tick: Ticks,
    pub money: Money,
    pub game_over: bool,
    pub stockpile: Vec<StockEntry>,
    pub robots: Vec<RobotSnapshot>,
}

impl WorldSnapshot {
    /// Capture the current state. Entries are ordered ascending by kind and
    /// robot id, matching the world's own iteration order.
    pub fn capture(world: &World, catalog: &Catalog) -> Self {
        let name_of = |kind: ResourceKindId| {
            catalog
                .kind_name(kind)
                .unwrap_or("<unknown>")
                .to_string()
        };

        let stockpile = world
            .stockpile
            .iter()
            .map(|(kind, quantity)| StockEntry {
                kind,
                name: name_of(kind),
                quantity,
            })
            .collect();

        let robots = world
            .robots()
            .map(|robot| RobotSnapshot {
                id: robot.id,
                capabilities: robot.capabilities.iter().collect(),
                busy: robot.in_flight().map(|a| InFlightSnapshot {
                    action: a.order.action,
                    target: a.order.target.clone(),
                    started_at: a.started_at,
                    completes_at: a.completes_at,
                }),
                bag: robot
                    .bag
                    .iter()
                    .map(|(kind, quantity)| StockEntry {
                        kind,
                        name: name_of(kind),
                        quantity,
                    })
                    .collect(),
                location: robot
                    .location
                    .and_then(|l| catalog.location_name(l))
                    .map(str::to_string),
            })
            .collect();

        Self {
            tick: world.tick(),
            money: world.money(),
            game_over: world.is_game_over(),
            stockpile,
            robots,
        }
    }

    pub fn robot(&self, id: RobotId) -> Option<&RobotSnapshot> {
        self.robots.iter().find(|r| r.id == id)
    }

    pub fn stock_quantity(&self, name: &str) -> u32 {
        self.stockpile
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.quantity)
            .unwrap_or(0)
    }
}

impl Scheduler {
    /// Capture an owned snapshot of the current world state.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(self.world(), self.catalog())
    }
}
