//! Data-driven scenario loading from JSON.
//!
//! Feature-gated behind `data-loader`. A scenario file defines the catalog
//! (kinds, recipes, locations), the starting robots and stockpile, and the
//! settings block (seed, money, run limits, sell policy, robot blueprint).

use crate::catalog::{Catalog, CatalogBuilder, CatalogError, RecipeSpec, RobotBlueprint, SellPolicy};
use crate::fixed::{money, rate, Ticks};
use crate::robot::{Action, CapabilitySet};
use crate::scheduler::Scheduler;
use crate::world::World;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during scenario loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("unknown resource kind reference: {0}")]
    UnknownKindRef(String),
    #[error("unknown location reference: {0}")]
    UnknownLocationRef(String),
    #[error("unknown action tag: {0}")]
    UnknownAction(String),
    #[error("robot bag cannot hold its starting contents: {0} units over capacity")]
    BagOverflow(u32),
}

// ---------------------------------------------------------------------------
// JSON data structures
// ---------------------------------------------------------------------------

/// Top-level scenario data structure for JSON deserialization.
#[derive(Debug, serde::Deserialize)]
pub struct ScenarioData {
    #[serde(default)]
    pub kinds: Vec<KindData>,
    #[serde(default)]
    pub locations: Vec<LocationData>,
    #[serde(default)]
    pub recipes: Vec<RecipeData>,
    /// Robots present at tick 0, each with its own loadout.
    #[serde(default)]
    pub initial_robots: Vec<RobotData>,
    #[serde(default)]
    pub initial_stockpile: Vec<StockData>,
    #[serde(default)]
    pub settings: SettingsData,
}

/// JSON representation of a resource kind.
#[derive(Debug, serde::Deserialize)]
pub struct KindData {
    pub name: String,
    #[serde(default)]
    pub sell_value: f64,
}

/// JSON representation of a location.
#[derive(Debug, serde::Deserialize)]
pub struct LocationData {
    pub name: String,
    pub travel_time: Ticks,
}

/// JSON representation of a recipe.
#[derive(Debug, serde::Deserialize)]
pub struct RecipeData {
    pub name: String,
    /// Canonical kebab-case action tag ("mine", "assemble", "build-robot").
    pub action: String,
    pub duration: Ticks,
    #[serde(default)]
    pub inputs: Vec<RecipeEntryData>,
    #[serde(default)]
    pub outputs: Vec<RecipeEntryData>,
    #[serde(default)]
    pub money_cost: f64,
    /// Probability of success, defaulting to certain.
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
    #[serde(default)]
    pub location: Option<String>,
}

fn default_success_rate() -> f64 {
    1.0
}

/// JSON representation of a recipe input/output entry.
#[derive(Debug, serde::Deserialize)]
pub struct RecipeEntryData {
    pub kind: String, // references a kind by name
    pub quantity: u32,
    /// Input only: refunded to the stockpile when the success roll fails.
    #[serde(default)]
    pub reusable: bool,
}

/// JSON representation of a stockpile or bag line.
#[derive(Debug, serde::Deserialize)]
pub struct StockData {
    pub kind: String,
    pub quantity: u32,
}

/// JSON representation of one starting robot.
#[derive(Debug, Default, serde::Deserialize)]
pub struct RobotData {
    /// Action tags; an empty list grants every capability.
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub bag_capacity: u32,
    /// Starting bag contents (seed capital).
    #[serde(default)]
    pub bag: Vec<StockData>,
    #[serde(default)]
    pub location: Option<String>,
}

/// JSON representation of the robot blueprint (robots built mid-run).
#[derive(Debug, serde::Deserialize)]
pub struct BlueprintData {
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub bag_capacity: u32,
    #[serde(default)]
    pub spawn_location: Option<String>,
}

/// JSON representation of the sell policy.
#[derive(Debug, serde::Deserialize)]
pub struct SellData {
    pub duration: Ticks,
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u32,
    #[serde(default)]
    pub location: Option<String>,
}

fn default_batch_limit() -> u32 {
    u32::MAX
}

/// JSON representation of the settings block.
#[derive(Debug, Default, serde::Deserialize)]
pub struct SettingsData {
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub money: f64,
    /// Stop once the clock reaches this tick.
    #[serde(default)]
    pub tick_horizon: Option<Ticks>,
    /// Stop once the fleet reaches this many robots.
    #[serde(default)]
    pub robot_cap: Option<u32>,
    #[serde(default)]
    pub sell: Option<SellData>,
    #[serde(default)]
    pub blueprint: Option<BlueprintData>,
}

// ---------------------------------------------------------------------------
// Loaded scenario
// ---------------------------------------------------------------------------

/// Stop conditions carried by a scenario.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunLimits {
    pub tick_horizon: Option<Ticks>,
    pub robot_cap: Option<u32>,
}

/// A fully resolved scenario: the frozen catalog, the tick-0 world, and the
/// stop conditions.
#[derive(Debug)]
pub struct Scenario {
    pub catalog: Catalog,
    pub world: World,
    pub limits: RunLimits,
}

impl Scenario {
    /// Build a scheduler over this scenario with its limits applied.
    pub fn into_scheduler(self) -> Scheduler {
        let mut sched = Scheduler::new(self.catalog, self.world);
        if let Some(horizon) = self.limits.tick_horizon {
            sched = sched.with_horizon(horizon);
        }
        if let Some(cap) = self.limits.robot_cap {
            sched = sched.with_robot_cap(cap);
        }
        sched
    }
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load a scenario from a JSON string.
pub fn load_scenario_json(json: &str) -> Result<Scenario, DataLoadError> {
    let data: ScenarioData = serde_json::from_str(json)?;
    build_scenario(data)
}

/// Load a scenario from JSON bytes.
pub fn load_scenario_json_bytes(bytes: &[u8]) -> Result<Scenario, DataLoadError> {
    let data: ScenarioData = serde_json::from_slice(bytes)?;
    build_scenario(data)
}

fn parse_capabilities(tags: &[String]) -> Result<CapabilitySet, DataLoadError> {
    if tags.is_empty() {
        return Ok(CapabilitySet::all());
    }
    let mut caps = CapabilitySet::empty();
    for tag in tags {
        let action =
            Action::parse(tag).ok_or_else(|| DataLoadError::UnknownAction(tag.clone()))?;
        caps.insert(action);
    }
    Ok(caps)
}

fn build_scenario(data: ScenarioData) -> Result<Scenario, DataLoadError> {
    let mut builder = CatalogBuilder::new();

    // Phase 1: register kinds and locations so recipes can reference them.
    for kind in &data.kinds {
        builder.register_kind(&kind.name, money(kind.sell_value));
    }
    for location in &data.locations {
        builder.register_location(&location.name, location.travel_time);
    }

    // Phase 2: register recipes (resolve kind/location refs by name).
    for recipe in &data.recipes {
        let action = Action::parse(&recipe.action)
            .ok_or_else(|| DataLoadError::UnknownAction(recipe.action.clone()))?;
        let mut spec = RecipeSpec::new(&recipe.name, action, recipe.duration)
            .money_cost(money(recipe.money_cost))
            .success_rate(rate(recipe.success_rate));
        for entry in &recipe.inputs {
            let kind = builder
                .kind_id(&entry.kind)
                .ok_or_else(|| DataLoadError::UnknownKindRef(entry.kind.clone()))?;
            spec = if entry.reusable {
                spec.reusable_input(kind, entry.quantity)
            } else {
                spec.input(kind, entry.quantity)
            };
        }
        for entry in &recipe.outputs {
            let kind = builder
                .kind_id(&entry.kind)
                .ok_or_else(|| DataLoadError::UnknownKindRef(entry.kind.clone()))?;
            spec = spec.output(kind, entry.quantity);
        }
        if let Some(name) = &recipe.location {
            let location = builder
                .location_id(name)
                .ok_or_else(|| DataLoadError::UnknownLocationRef(name.clone()))?;
            spec = spec.at(location);
        }
        builder.register_recipe(spec);
    }

    // Phase 3: sell policy and blueprint.
    if let Some(sell) = &data.settings.sell {
        let location = match &sell.location {
            Some(name) => Some(
                builder
                    .location_id(name)
                    .ok_or_else(|| DataLoadError::UnknownLocationRef(name.clone()))?,
            ),
            None => None,
        };
        builder.set_sell_policy(SellPolicy {
            duration: sell.duration,
            batch_limit: sell.batch_limit,
            location,
        });
    }
    if let Some(blueprint) = &data.settings.blueprint {
        let spawn_location = match &blueprint.spawn_location {
            Some(name) => Some(
                builder
                    .location_id(name)
                    .ok_or_else(|| DataLoadError::UnknownLocationRef(name.clone()))?,
            ),
            None => None,
        };
        builder.set_blueprint(RobotBlueprint {
            capabilities: parse_capabilities(&blueprint.capabilities)?,
            bag_capacity: blueprint.bag_capacity,
            spawn_location,
        });
    }

    // Phase 4: the tick-0 world.
    let catalog = builder.build()?;
    let mut world = World::new(data.settings.seed);
    world.credit(money(data.settings.money));
    for entry in &data.initial_stockpile {
        let kind = catalog
            .kind_id(&entry.kind)
            .ok_or_else(|| DataLoadError::UnknownKindRef(entry.kind.clone()))?;
        world.stockpile.add(kind, entry.quantity);
    }
    for robot_data in &data.initial_robots {
        let location = match &robot_data.location {
            Some(name) => Some(
                catalog
                    .location_id(name)
                    .ok_or_else(|| DataLoadError::UnknownLocationRef(name.clone()))?,
            ),
            None => None,
        };
        let id = world.spawn_robot(
            parse_capabilities(&robot_data.capabilities)?,
            robot_data.bag_capacity,
            location,
        );
        for entry in &robot_data.bag {
            let kind = catalog
                .kind_id(&entry.kind)
                .ok_or_else(|| DataLoadError::UnknownKindRef(entry.kind.clone()))?;
            // spawn_robot just inserted this id.
            if let Some(robot) = world.robot_mut(id) {
                let overflow = robot.bag.add(kind, entry.quantity);
                if overflow > 0 {
                    return Err(DataLoadError::BagOverflow(overflow));
                }
            }
        }
    }

    Ok(Scenario {
        catalog,
        world,
        limits: RunLimits {
            tick_horizon: data.settings.tick_horizon,
            robot_cap: data.settings.robot_cap,
        },
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::money;
    use crate::id::RobotId;

    const SCENARIO: &str = r#"{
        "kinds": [
            {"name": "foo"},
            {"name": "bar"},
            {"name": "foobar", "sell_value": 1.0}
        ],
        "locations": [
            {"name": "foo-mine", "travel_time": 5},
            {"name": "assembly-line", "travel_time": 5}
        ],
        "recipes": [
            {"name": "foo", "action": "mine", "duration": 1,
             "outputs": [{"kind": "foo", "quantity": 1}],
             "location": "foo-mine"},
            {"name": "foobar", "action": "assemble", "duration": 2,
             "inputs": [{"kind": "foo", "quantity": 1},
                        {"kind": "bar", "quantity": 1, "reusable": true}],
             "outputs": [{"kind": "foobar", "quantity": 1}],
             "success_rate": 0.6,
             "location": "assembly-line"},
            {"name": "robot", "action": "build-robot", "duration": 1,
             "inputs": [{"kind": "foo", "quantity": 6}],
             "money_cost": 3.0}
        ],
        "initial_robots": [
            {"location": "foo-mine"},
            {"capabilities": ["mine", "move"], "bag_capacity": 10,
             "bag": [{"kind": "bar", "quantity": 2}]}
        ],
        "initial_stockpile": [{"kind": "bar", "quantity": 2}],
        "settings": {
            "seed": 42,
            "tick_horizon": 1000,
            "robot_cap": 30,
            "sell": {"duration": 10, "batch_limit": 5},
            "blueprint": {"bag_capacity": 10}
        }
    }"#;

    #[test]
    fn loads_a_full_scenario() {
        let scenario = load_scenario_json(SCENARIO).unwrap();
        let (catalog, world) = (&scenario.catalog, &scenario.world);

        assert_eq!(catalog.kind_count(), 3);
        assert_eq!(catalog.recipe_count(), 3);
        assert_eq!(catalog.location_count(), 2);
        assert_eq!(catalog.sell().batch_limit, 5);
        assert_eq!(catalog.blueprint().bag_capacity, 10);
        assert_eq!(
            scenario.limits,
            RunLimits {
                tick_horizon: Some(1000),
                robot_cap: Some(30)
            }
        );

        assert_eq!(world.robot_count(), 2);
        let first = world.robot(RobotId(1)).unwrap();
        assert_eq!(first.location, catalog.location_id("foo-mine"));
        let second = world.robot(RobotId(2)).unwrap();
        assert!(!second.capabilities.contains(Action::Sell));
        let bar = catalog.kind_id("bar").unwrap();
        assert_eq!(second.bag.quantity(bar), 2);
        assert_eq!(world.stockpile.quantity(bar), 2);

        let foobar = catalog.recipe_id("foobar").unwrap();
        let def = catalog.get_recipe(foobar).unwrap();
        assert!(def.inputs.iter().any(|e| e.reusable));
        assert_eq!(def.money_cost, money(0.0));
    }

    #[test]
    fn into_scheduler_applies_limits() {
        let mut sched = load_scenario_json(SCENARIO).unwrap().into_scheduler();
        // The horizon is active: run past it and the game-over latch trips.
        for _ in 0..1001 {
            sched.advance_tick();
        }
        assert!(sched.is_over());
        assert_eq!(sched.world().tick(), 1000);
    }

    #[test]
    fn unknown_kind_reference_is_an_error() {
        let json = r#"{
            "kinds": [{"name": "foo"}],
            "recipes": [
                {"name": "bad", "action": "mine", "duration": 1,
                 "outputs": [{"kind": "nonexistent", "quantity": 1}]}
            ]
        }"#;
        assert!(matches!(
            load_scenario_json(json),
            Err(DataLoadError::UnknownKindRef(_))
        ));
    }

    #[test]
    fn unknown_action_tag_is_an_error() {
        let json = r#"{
            "recipes": [{"name": "bad", "action": "teleport", "duration": 1}]
        }"#;
        assert!(matches!(
            load_scenario_json(json),
            Err(DataLoadError::UnknownAction(_))
        ));
    }

    #[test]
    fn overstuffed_bag_is_an_error() {
        let json = r#"{
            "kinds": [{"name": "foo"}],
            "initial_robots": [
                {"bag_capacity": 1, "bag": [{"kind": "foo", "quantity": 3}]}
            ]
        }"#;
        assert!(matches!(
            load_scenario_json(json),
            Err(DataLoadError::BagOverflow(2))
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            load_scenario_json("{not json"),
            Err(DataLoadError::JsonParse(_))
        ));
    }
}
