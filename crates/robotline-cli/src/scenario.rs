//! Scenario loading: either a JSON file from disk or the built-in default.

use anyhow::{Context, Result};
use robotline_core::data_loader::{load_scenario_json, Scenario};
use std::fs;
use std::path::Path;

/// The built-in scenario: two mines, an assembly line with a 60% success
/// rate, batch-limited selling at the store, robots bought for six foos plus
/// three units of money, and a 30-robot victory cap.
pub const DEFAULT_SCENARIO: &str = r#"{
    "kinds": [
        {"name": "foo"},
        {"name": "bar"},
        {"name": "foobar", "sell_value": 1.0}
    ],
    "locations": [
        {"name": "foo-mine", "travel_time": 5},
        {"name": "bar-mine", "travel_time": 5},
        {"name": "assembly-line", "travel_time": 5},
        {"name": "material-store", "travel_time": 5},
        {"name": "robot-store", "travel_time": 5}
    ],
    "recipes": [
        {"name": "foo", "action": "mine", "duration": 1,
         "outputs": [{"kind": "foo", "quantity": 1}],
         "location": "foo-mine"},
        {"name": "bar", "action": "mine", "duration": 2,
         "outputs": [{"kind": "bar", "quantity": 1}],
         "location": "bar-mine"},
        {"name": "foobar", "action": "assemble", "duration": 2,
         "inputs": [{"kind": "foo", "quantity": 1},
                    {"kind": "bar", "quantity": 1, "reusable": true}],
         "outputs": [{"kind": "foobar", "quantity": 1}],
         "success_rate": 0.6,
         "location": "assembly-line"},
        {"name": "robot", "action": "build-robot", "duration": 1,
         "inputs": [{"kind": "foo", "quantity": 6}],
         "money_cost": 3.0,
         "location": "robot-store"}
    ],
    "initial_robots": [
        {"location": "robot-store"},
        {"location": "robot-store"}
    ],
    "settings": {
        "seed": 42,
        "robot_cap": 30,
        "sell": {"duration": 10, "batch_limit": 5, "location": "material-store"},
        "blueprint": {"spawn_location": "robot-store"}
    }
}"#;

/// Load a scenario from `path`, or the built-in default when no path is
/// given. A `seed` override replaces the scenario's own seed.
pub fn load(path: Option<&Path>, seed: Option<u64>) -> Result<Scenario> {
    let text = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?,
        None => DEFAULT_SCENARIO.to_string(),
    };

    let text = match seed {
        Some(seed) => {
            let mut value: serde_json::Value =
                serde_json::from_str(&text).context("scenario is not valid JSON")?;
            value["settings"]["seed"] = seed.into();
            value.to_string()
        }
        None => text,
    };

    load_scenario_json(&text).context("failed to build scenario")
}
