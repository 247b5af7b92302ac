//! Orders: player/agent-issued intents, and the errors that reject them.
//!
//! An order names a robot, an action tag, and an optional target (a recipe
//! name for mine/assemble/build-robot, a resource kind name for sell, a
//! destination name for move). Validation happens in the scheduler against a
//! consistent read of the world; rejected orders leave the world unchanged.

use crate::id::{LocationId, RobotId};
use crate::robot::Action;
use serde::{Deserialize, Serialize};

/// A player/agent-issued intent: "robot R, perform action A on target T".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub robot: RobotId,
    pub action: Action,
    /// Recipe name, sell kind name, or destination name. May be omitted when
    /// the catalog registers exactly one recipe for the action.
    pub target: Option<String>,
}

impl Order {
    pub fn new(robot: RobotId, action: Action, target: Option<String>) -> Self {
        Self {
            robot,
            action,
            target,
        }
    }

    /// A mine/assemble/build-robot order targeting a recipe by name.
    pub fn recipe(robot: RobotId, action: Action, recipe: &str) -> Self {
        Self::new(robot, action, Some(recipe.to_string()))
    }

    /// A sell order targeting a resource kind by name.
    pub fn sell(robot: RobotId, kind: &str) -> Self {
        Self::new(robot, Action::Sell, Some(kind.to_string()))
    }

    /// A move order targeting a destination by name.
    pub fn move_to(robot: RobotId, destination: &str) -> Self {
        Self::new(robot, Action::Move, Some(destination.to_string()))
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            Some(target) => write!(f, "robot {} {} {}", self.robot, self.action, target),
            None => write!(f, "robot {} {}", self.robot, self.action),
        }
    }
}

/// Why an order was rejected. All variants are non-fatal: the world is left
/// unchanged and the caller may submit a different order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("unknown robot: {0}")]
    UnknownRobot(RobotId),

    #[error("robot {0} is busy")]
    RobotBusy(RobotId),

    #[error("robot {robot} lacks the {action} capability")]
    MissingCapability { robot: RobotId, action: Action },

    #[error("no recipe registered for {action} target {target:?}")]
    UnknownRecipe {
        action: Action,
        target: Option<String>,
    },

    #[error("unknown destination: {0:?}")]
    UnknownDestination(String),

    #[error("robot {robot} is not at location {required} required by this order")]
    WrongLocation {
        robot: RobotId,
        required: LocationId,
    },

    #[error("insufficient resources for {action} order on robot {robot}")]
    InsufficientResources { robot: RobotId, action: Action },

    #[error("robot {0} has no in-flight action to cancel")]
    NothingToCancel(RobotId),
}
