use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pong_core::error::PongError;
use pong_core::ids::{EntityUuid, GameUuid};
use pong_core::net::actions::GameMode;
use pong_core::scene::{EntityId, Scene};

/// A scoring zone and the parts bound to it. Parts are stored by UUID and
/// resolved against the scene each time they are used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalBinding {
    pub entity: EntityUuid,
    pub health: i32,
    pub starting_health: i32,
    pub paddle: Option<EntityUuid>,
    pub text: Option<EntityUuid>,
    pub plate: Option<EntityUuid>,
    /// Recomputed every tick.
    pub avatar: Option<EntityUuid>,
}

impl GoalBinding {
    pub fn new(entity: EntityUuid, starting_health: i32) -> Self {
        Self {
            entity,
            health: starting_health,
            starting_health,
            paddle: None,
            text: None,
            plate: None,
            avatar: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallBinding {
    pub entity: EntityUuid,
    /// Clock time of the last volley; smallest goes next.
    pub last_volley: f64,
}

/// One physical game area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameInstance {
    pub mode: GameMode,
    pub goals: Vec<GoalBinding>,
    pub balls: Vec<BallBinding>,
    /// Earliest clock time the next volley may fire.
    pub next_volley_at: f64,
}

impl GameInstance {
    pub fn goal_mut(&mut self, entity: &EntityUuid) -> Option<&mut GoalBinding> {
        self.goals.iter_mut().find(|g| &g.entity == entity)
    }

    pub fn any_goal_down(&self) -> bool {
        self.goals.iter().any(|g| g.health <= 0)
    }
}

/// Replicated state of every arena game in the scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArenaState {
    pub games: BTreeMap<GameUuid, GameInstance>,
}

impl ArenaState {
    /// True if any game already owns this goal or ball.
    pub fn is_claimed(&self, uuid: &EntityUuid) -> bool {
        self.games.values().any(|g| {
            g.goals.iter().any(|goal| &goal.entity == uuid)
                || g.balls.iter().any(|ball| &ball.entity == uuid)
        })
    }

    pub fn goal_mut(&mut self, entity: &EntityUuid) -> Option<&mut GoalBinding> {
        self.games.values_mut().find_map(|g| g.goal_mut(entity))
    }
}

/// Resolve a bound part to its scene handle.
pub fn resolve(scene: &Scene, uuid: &EntityUuid) -> Result<EntityId, PongError> {
    scene
        .entity_by_uuid(uuid)
        .ok_or_else(|| PongError::MissingBinding(format!("{uuid} is no longer in the scene")))
}
