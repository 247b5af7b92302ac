//! The resource catalog: kinds, recipes, locations, the sell policy, and the
//! robot blueprint. Built once at startup with a builder and frozen after
//! `build()`; read-only for the simulation's lifetime.

use crate::fixed::{Fixed64, Money, Ticks};
use crate::id::{LocationId, RecipeId, ResourceKindId};
use crate::robot::{Action, CapabilitySet};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// A resource kind definition: a name and the money value of one unit when
/// sold. Kinds with a zero sell value are not sellable.
#[derive(Debug, Clone)]
pub struct KindDef {
    pub name: String,
    pub sell_value: Money,
}

/// A recipe input entry. `reusable` inputs are returned to the stockpile
/// when the recipe's success roll fails.
#[derive(Debug, Clone)]
pub struct RecipeEntry {
    pub kind: ResourceKindId,
    pub quantity: u32,
    pub reusable: bool,
}

/// A recipe output entry.
#[derive(Debug, Clone)]
pub struct OutputEntry {
    pub kind: ResourceKindId,
    pub quantity: u32,
}

/// A recipe definition: a named transformation of inputs (+ time, + money)
/// into outputs, gated by a capability and optionally by a location.
#[derive(Debug, Clone)]
pub struct RecipeDef {
    pub name: String,
    pub action: Action,
    pub inputs: Vec<RecipeEntry>,
    pub outputs: Vec<OutputEntry>,
    pub duration: Ticks,
    pub money_cost: Money,
    /// Probability in [0, 1] that the outputs are produced at completion.
    pub success_rate: Fixed64,
    /// Required robot location, if the scenario uses locations.
    pub location: Option<LocationId>,
    /// Completion spawns a robot from the catalog blueprint.
    pub builds_robot: bool,
}

/// A named location with the travel time a move order takes to reach it.
#[derive(Debug, Clone)]
pub struct LocationDef {
    pub name: String,
    pub travel_time: Ticks,
}

/// How sell orders behave: a fixed duration, a per-trip batch limit, and an
/// optional required location.
#[derive(Debug, Clone)]
pub struct SellPolicy {
    pub duration: Ticks,
    pub batch_limit: u32,
    pub location: Option<LocationId>,
}

impl Default for SellPolicy {
    fn default() -> Self {
        Self {
            duration: 1,
            batch_limit: u32::MAX,
            location: None,
        }
    }
}

/// What a build-robot completion spawns.
#[derive(Debug, Clone)]
pub struct RobotBlueprint {
    pub capabilities: CapabilitySet,
    pub bag_capacity: u32,
    pub spawn_location: Option<LocationId>,
}

impl Default for RobotBlueprint {
    fn default() -> Self {
        Self {
            capabilities: CapabilitySet::all(),
            bag_capacity: 0,
            spawn_location: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Input to [`CatalogBuilder::register_recipe`]. Most fields have sensible
/// defaults; callers set only what the recipe needs.
#[derive(Debug, Clone)]
pub struct RecipeSpec {
    pub name: String,
    pub action: Action,
    pub inputs: Vec<RecipeEntry>,
    pub outputs: Vec<OutputEntry>,
    pub duration: Ticks,
    pub money_cost: Money,
    pub success_rate: Fixed64,
    pub location: Option<LocationId>,
    pub builds_robot: bool,
}

impl RecipeSpec {
    pub fn new(name: &str, action: Action, duration: Ticks) -> Self {
        Self {
            name: name.to_string(),
            action,
            inputs: Vec::new(),
            outputs: Vec::new(),
            duration,
            money_cost: Money::ZERO,
            success_rate: Fixed64::from_num(1),
            location: None,
            builds_robot: action == Action::BuildRobot,
        }
    }

    pub fn input(mut self, kind: ResourceKindId, quantity: u32) -> Self {
        self.inputs.push(RecipeEntry {
            kind,
            quantity,
            reusable: false,
        });
        self
    }

    pub fn reusable_input(mut self, kind: ResourceKindId, quantity: u32) -> Self {
        self.inputs.push(RecipeEntry {
            kind,
            quantity,
            reusable: true,
        });
        self
    }

    pub fn output(mut self, kind: ResourceKindId, quantity: u32) -> Self {
        self.outputs.push(OutputEntry { kind, quantity });
        self
    }

    pub fn money_cost(mut self, cost: Money) -> Self {
        self.money_cost = cost;
        self
    }

    pub fn success_rate(mut self, rate: Fixed64) -> Self {
        self.success_rate = rate;
        self
    }

    pub fn at(mut self, location: LocationId) -> Self {
        self.location = Some(location);
        self
    }
}

/// Builder for constructing an immutable Catalog.
/// Two-phase lifecycle: registration, then finalization via `build()`.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    kinds: Vec<KindDef>,
    kind_name_to_id: HashMap<String, ResourceKindId>,
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
    locations: Vec<LocationDef>,
    location_name_to_id: HashMap<String, LocationId>,
    sell: SellPolicy,
    blueprint: RobotBlueprint,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource kind. Returns its id.
    pub fn register_kind(&mut self, name: &str, sell_value: Money) -> ResourceKindId {
        let id = ResourceKindId(self.kinds.len() as u32);
        self.kinds.push(KindDef {
            name: name.to_string(),
            sell_value,
        });
        self.kind_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Register a location. Returns its id.
    pub fn register_location(&mut self, name: &str, travel_time: Ticks) -> LocationId {
        let id = LocationId(self.locations.len() as u16);
        self.locations.push(LocationDef {
            name: name.to_string(),
            travel_time,
        });
        self.location_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Register a recipe. Returns its id.
    pub fn register_recipe(&mut self, spec: RecipeSpec) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        self.recipe_name_to_id.insert(spec.name.clone(), id);
        self.recipes.push(RecipeDef {
            name: spec.name,
            action: spec.action,
            inputs: spec.inputs,
            outputs: spec.outputs,
            duration: spec.duration,
            money_cost: spec.money_cost,
            success_rate: spec.success_rate,
            location: spec.location,
            builds_robot: spec.builds_robot,
        });
        id
    }

    pub fn set_sell_policy(&mut self, sell: SellPolicy) {
        self.sell = sell;
    }

    pub fn set_blueprint(&mut self, blueprint: RobotBlueprint) {
        self.blueprint = blueprint;
    }

    pub fn kind_id(&self, name: &str) -> Option<ResourceKindId> {
        self.kind_name_to_id.get(name).copied()
    }

    pub fn location_id(&self, name: &str) -> Option<LocationId> {
        self.location_name_to_id.get(name).copied()
    }

    /// Finalize and build the immutable catalog.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        let one = Fixed64::from_num(1);
        for recipe in &self.recipes {
            if recipe.duration == 0 {
                return Err(CatalogError::ZeroDuration(recipe.name.clone()));
            }
            if recipe.success_rate < Fixed64::ZERO || recipe.success_rate > one {
                return Err(CatalogError::InvalidSuccessRate(recipe.name.clone()));
            }
            for entry in &recipe.inputs {
                if entry.kind.0 as usize >= self.kinds.len() {
                    return Err(CatalogError::InvalidKindRef(entry.kind));
                }
                if recipe.outputs.iter().any(|out| out.kind == entry.kind) {
                    return Err(CatalogError::InputOutputOverlap(recipe.name.clone()));
                }
            }
            for entry in &recipe.outputs {
                if entry.kind.0 as usize >= self.kinds.len() {
                    return Err(CatalogError::InvalidKindRef(entry.kind));
                }
            }
            if let Some(loc) = recipe.location
                && loc.0 as usize >= self.locations.len()
            {
                return Err(CatalogError::InvalidLocationRef(recipe.name.clone()));
            }
        }
        if let Some(loc) = self.sell.location
            && loc.0 as usize >= self.locations.len()
        {
            return Err(CatalogError::InvalidLocationRef("sell policy".to_string()));
        }
        if let Some(loc) = self.blueprint.spawn_location
            && loc.0 as usize >= self.locations.len()
        {
            return Err(CatalogError::InvalidLocationRef("blueprint".to_string()));
        }

        Ok(Catalog {
            kinds: self.kinds,
            kind_name_to_id: self.kind_name_to_id,
            recipes: self.recipes,
            recipe_name_to_id: self.recipe_name_to_id,
            locations: self.locations,
            location_name_to_id: self.location_name_to_id,
            sell: self.sell,
            blueprint: self.blueprint,
        })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable catalog. Frozen after build(). Cheap to clone for replays.
#[derive(Debug, Clone)]
pub struct Catalog {
    kinds: Vec<KindDef>,
    kind_name_to_id: HashMap<String, ResourceKindId>,
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
    locations: Vec<LocationDef>,
    location_name_to_id: HashMap<String, LocationId>,
    sell: SellPolicy,
    blueprint: RobotBlueprint,
}

impl Catalog {
    /// Resolve the recipe for an action/target pair. The target is the recipe
    /// name; a missing target resolves only when the catalog registers exactly
    /// one recipe for the action.
    pub fn recipe_for(&self, action: Action, target: Option<&str>) -> Option<RecipeId> {
        match target {
            Some(name) => {
                let id = self.recipe_name_to_id.get(name).copied()?;
                (self.recipes[id.0 as usize].action == action).then_some(id)
            }
            None => {
                let mut found = None;
                for (idx, recipe) in self.recipes.iter().enumerate() {
                    if recipe.action == action {
                        if found.is_some() {
                            return None;
                        }
                        found = Some(RecipeId(idx as u32));
                    }
                }
                found
            }
        }
    }

    /// Money value of one unit of a kind when sold.
    pub fn sell_value(&self, kind: ResourceKindId) -> Money {
        self.kinds
            .get(kind.0 as usize)
            .map(|k| k.sell_value)
            .unwrap_or(Money::ZERO)
    }

    pub fn get_recipe(&self, id: RecipeId) -> Option<&RecipeDef> {
        self.recipes.get(id.0 as usize)
    }

    pub fn get_kind(&self, id: ResourceKindId) -> Option<&KindDef> {
        self.kinds.get(id.0 as usize)
    }

    pub fn get_location(&self, id: LocationId) -> Option<&LocationDef> {
        self.locations.get(id.0 as usize)
    }

    pub fn kind_id(&self, name: &str) -> Option<ResourceKindId> {
        self.kind_name_to_id.get(name).copied()
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    pub fn location_id(&self, name: &str) -> Option<LocationId> {
        self.location_name_to_id.get(name).copied()
    }

    pub fn kind_name(&self, id: ResourceKindId) -> Option<&str> {
        self.kinds.get(id.0 as usize).map(|k| k.name.as_str())
    }

    pub fn location_name(&self, id: LocationId) -> Option<&str> {
        self.locations.get(id.0 as usize).map(|l| l.name.as_str())
    }

    /// Recipes for an action, in ascending registration order.
    pub fn recipes_for_action(&self, action: Action) -> impl Iterator<Item = (RecipeId, &RecipeDef)> {
        self.recipes
            .iter()
            .enumerate()
            .filter(move |(_, r)| r.action == action)
            .map(|(idx, r)| (RecipeId(idx as u32), r))
    }

    /// Kinds in ascending id order.
    pub fn kinds(&self) -> impl Iterator<Item = (ResourceKindId, &KindDef)> {
        self.kinds
            .iter()
            .enumerate()
            .map(|(idx, k)| (ResourceKindId(idx as u32), k))
    }

    /// Locations in ascending id order.
    pub fn locations(&self) -> impl Iterator<Item = (LocationId, &LocationDef)> {
        self.locations
            .iter()
            .enumerate()
            .map(|(idx, l)| (LocationId(idx as u16), l))
    }

    pub fn sell(&self) -> &SellPolicy {
        &self.sell
    }

    pub fn blueprint(&self) -> &RobotBlueprint {
        &self.blueprint
    }

    pub fn kind_count(&self) -> usize {
        self.kinds.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("recipe {0:?} has zero duration")]
    ZeroDuration(String),
    #[error("recipe {0:?} has a success rate outside [0, 1]")]
    InvalidSuccessRate(String),
    #[error("recipe {0:?} both consumes and produces the same kind")]
    InputOutputOverlap(String),
    #[error("invalid resource kind reference: {0:?}")]
    InvalidKindRef(ResourceKindId),
    #[error("invalid location reference in {0:?}")]
    InvalidLocationRef(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::money;

    fn setup_builder() -> CatalogBuilder {
        let mut b = CatalogBuilder::new();
        let ore = b.register_kind("iron-ore", Money::ZERO);
        let bar = b.register_kind("iron-bar", money(5.0));
        b.register_recipe(
            RecipeSpec::new("iron-ore", Action::Mine, 1).output(ore, 1),
        );
        b.register_recipe(
            RecipeSpec::new("iron-bar", Action::Assemble, 3)
                .input(ore, 2)
                .output(bar, 1),
        );
        b
    }

    #[test]
    fn register_and_build() {
        let catalog = setup_builder().build().unwrap();
        assert_eq!(catalog.kind_count(), 2);
        assert_eq!(catalog.recipe_count(), 2);
    }

    #[test]
    fn recipe_for_checks_action_tag() {
        let catalog = setup_builder().build().unwrap();
        assert!(catalog.recipe_for(Action::Assemble, Some("iron-bar")).is_some());
        // Same target, wrong action tag.
        assert!(catalog.recipe_for(Action::Mine, Some("iron-bar")).is_none());
        assert!(catalog.recipe_for(Action::Assemble, Some("nonexistent")).is_none());
    }

    #[test]
    fn omitted_target_resolves_sole_recipe() {
        let catalog = setup_builder().build().unwrap();
        let id = catalog.recipe_for(Action::Assemble, None).unwrap();
        assert_eq!(catalog.get_recipe(id).unwrap().name, "iron-bar");
    }

    #[test]
    fn omitted_target_ambiguous_when_multiple() {
        let mut b = setup_builder();
        let bar = b.kind_id("iron-bar").unwrap();
        b.register_recipe(
            RecipeSpec::new("iron-bar-fast", Action::Assemble, 1)
                .input(b.kind_id("iron-ore").unwrap(), 4)
                .output(bar, 1),
        );
        let catalog = b.build().unwrap();
        assert!(catalog.recipe_for(Action::Assemble, None).is_none());
    }

    #[test]
    fn sell_value_lookup() {
        let catalog = setup_builder().build().unwrap();
        let bar = catalog.kind_id("iron-bar").unwrap();
        assert_eq!(catalog.sell_value(bar), money(5.0));
        assert_eq!(catalog.sell_value(ResourceKindId(99)), Money::ZERO);
    }

    #[test]
    fn input_output_overlap_rejected() {
        let mut b = CatalogBuilder::new();
        let ore = b.register_kind("ore", Money::ZERO);
        b.register_recipe(
            RecipeSpec::new("loop", Action::Assemble, 1)
                .input(ore, 1)
                .output(ore, 2),
        );
        assert!(matches!(
            b.build(),
            Err(CatalogError::InputOutputOverlap(_))
        ));
    }

    #[test]
    fn zero_duration_rejected() {
        let mut b = CatalogBuilder::new();
        let ore = b.register_kind("ore", Money::ZERO);
        b.register_recipe(RecipeSpec::new("instant", Action::Mine, 0).output(ore, 1));
        assert!(matches!(b.build(), Err(CatalogError::ZeroDuration(_))));
    }

    #[test]
    fn invalid_kind_ref_rejected() {
        let mut b = CatalogBuilder::new();
        b.register_recipe(
            RecipeSpec::new("bad", Action::Mine, 1).output(ResourceKindId(42), 1),
        );
        assert!(matches!(b.build(), Err(CatalogError::InvalidKindRef(_))));
    }

    #[test]
    fn success_rate_out_of_range_rejected() {
        let mut b = CatalogBuilder::new();
        let ore = b.register_kind("ore", Money::ZERO);
        b.register_recipe(
            RecipeSpec::new("lucky", Action::Mine, 1)
                .output(ore, 1)
                .success_rate(Fixed64::from_num(2)),
        );
        assert!(matches!(
            b.build(),
            Err(CatalogError::InvalidSuccessRate(_))
        ));
    }

    #[test]
    fn location_gating_validated() {
        let mut b = CatalogBuilder::new();
        let ore = b.register_kind("ore", Money::ZERO);
        b.register_recipe(
            RecipeSpec::new("mine-ore", Action::Mine, 1)
                .output(ore, 1)
                .at(LocationId(3)),
        );
        assert!(matches!(
            b.build(),
            Err(CatalogError::InvalidLocationRef(_))
        ));
    }

    #[test]
    fn catalog_is_immutable_after_build() {
        // Catalog has no &mut self methods -- immutability enforced by the type system.
        let catalog = setup_builder().build().unwrap();
        let _ = catalog.get_recipe(RecipeId(0));
        let _ = catalog.get_kind(ResourceKindId(0));
    }
}
