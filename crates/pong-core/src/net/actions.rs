use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::{EntityUuid, GameUuid, Handedness, UserId};

/// Number of player slots in a cardinal game.
pub const MAX_PLAYERS: usize = 4;

/// Longest accepted `pong.log` line, in bytes.
pub const MAX_LOG_LEN: usize = 1024;

pub const BALL_PREFAB: &str = "ee.pong.ball";
pub const PADDLE_PREFAB: &str = "ee.pong.paddle";

/// Arena game lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Stopped,
    Starting,
    Playing,
    Completed,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Playing => "playing",
            Self::Completed => "completed",
        }
    }
}

/// Pose and impulse update for one entity. Every field but the target is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveAction {
    #[serde(rename = "entityUUID")]
    pub entity_uuid: EntityUuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinematic_position: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinematic_rotation: Option<Quat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Quat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impulse: Option<Vec3>,
}

impl MoveAction {
    pub fn new(entity_uuid: EntityUuid) -> Self {
        Self {
            entity_uuid,
            kinematic_position: None,
            kinematic_rotation: None,
            position: None,
            rotation: None,
            impulse: None,
        }
    }

    pub fn position(entity_uuid: EntityUuid, position: Vec3) -> Self {
        Self {
            position: Some(position),
            ..Self::new(entity_uuid)
        }
    }

    pub fn kinematic(entity_uuid: EntityUuid, position: Vec3, rotation: Quat) -> Self {
        Self {
            kinematic_position: Some(position),
            kinematic_rotation: Some(rotation),
            ..Self::new(entity_uuid)
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        non_empty(self.entity_uuid.is_empty(), "entityUUID")?;
        if self.kinematic_position.is_none()
            && self.kinematic_rotation.is_none()
            && self.position.is_none()
            && self.rotation.is_none()
            && self.impulse.is_none()
        {
            return Err(ValidationError::EmptyMove);
        }
        finite_vec(self.kinematic_position, "kinematicPosition")?;
        finite_vec(self.position, "position")?;
        finite_vec(self.impulse, "impulse")?;
        unit_quat(self.kinematic_rotation, "kinematicRotation")?;
        unit_quat(self.rotation, "rotation")?;
        Ok(())
    }
}

/// Every replicated action on the `world` topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PongAction {
    #[serde(rename = "pong.log")]
    Log { log: String },

    #[serde(rename = "pong.pong")]
    SetMode { uuid: GameUuid, mode: GameMode },

    #[serde(rename = "pong.goal")]
    SetGoalHealth {
        #[serde(rename = "entityUUID")]
        entity_uuid: EntityUuid,
        health: i32,
    },

    #[serde(rename = "pong.move")]
    Move(MoveAction),

    #[serde(rename = "ee.pong.START_GAME")]
    StartGame {
        #[serde(rename = "gameEntityUUID")]
        game: GameUuid,
    },

    #[serde(rename = "ee.pong.END_GAME")]
    EndGame {
        #[serde(rename = "gameEntityUUID")]
        game: GameUuid,
    },

    #[serde(rename = "ee.pong.PLAYER_CONNECTED")]
    PlayerChange {
        #[serde(rename = "gameEntityUUID")]
        game: GameUuid,
        #[serde(rename = "playerIndex")]
        player_index: u8,
        #[serde(
            rename = "playerUserID",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        player: Option<UserId>,
    },

    #[serde(rename = "ee.pong.PLAYER_SCORE")]
    PlayerScore {
        #[serde(rename = "gameEntityUUID")]
        game: GameUuid,
        #[serde(rename = "playerIndex")]
        player_index: u8,
    },

    #[serde(rename = "ee.pong.SPAWN_BALL")]
    SpawnBall {
        #[serde(rename = "entityUUID")]
        entity_uuid: EntityUuid,
        #[serde(rename = "gameEntityUUID")]
        game: GameUuid,
        prefab: String,
    },

    #[serde(rename = "ee.pong.SPAWN_PADDLE")]
    SpawnPaddle {
        #[serde(rename = "entityUUID")]
        entity_uuid: EntityUuid,
        #[serde(rename = "gameEntityUUID")]
        game: GameUuid,
        prefab: String,
        handedness: Handedness,
        owner: UserId,
    },

    #[serde(rename = "ee.pong.DESTROY_OBJECT")]
    DestroyObject {
        #[serde(rename = "entityUUID")]
        entity_uuid: EntityUuid,
    },
}

impl PongAction {
    pub fn log(line: impl Into<String>) -> Self {
        Self::Log { log: line.into() }
    }

    pub fn set_mode(uuid: GameUuid, mode: GameMode) -> Self {
        Self::SetMode { uuid, mode }
    }

    pub fn set_goal_health(entity_uuid: EntityUuid, health: i32) -> Self {
        Self::SetGoalHealth {
            entity_uuid,
            health,
        }
    }

    pub fn spawn_ball(entity_uuid: EntityUuid, game: GameUuid) -> Self {
        Self::SpawnBall {
            entity_uuid,
            game,
            prefab: BALL_PREFAB.to_string(),
        }
    }

    pub fn spawn_paddle(game: GameUuid, owner: UserId, handedness: Handedness) -> Self {
        Self::SpawnPaddle {
            entity_uuid: owner.paddle_uuid(handedness),
            game,
            prefab: PADDLE_PREFAB.to_string(),
            handedness,
            owner,
        }
    }

    /// Wire `type` string.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Log { .. } => "pong.log",
            Self::SetMode { .. } => "pong.pong",
            Self::SetGoalHealth { .. } => "pong.goal",
            Self::Move(_) => "pong.move",
            Self::StartGame { .. } => "ee.pong.START_GAME",
            Self::EndGame { .. } => "ee.pong.END_GAME",
            Self::PlayerChange { .. } => "ee.pong.PLAYER_CONNECTED",
            Self::PlayerScore { .. } => "ee.pong.PLAYER_SCORE",
            Self::SpawnBall { .. } => "ee.pong.SPAWN_BALL",
            Self::SpawnPaddle { .. } => "ee.pong.SPAWN_PADDLE",
            Self::DestroyObject { .. } => "ee.pong.DESTROY_OBJECT",
        }
    }

    /// Reject payloads no handler should ever see.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Log { log } => {
                if log.len() > MAX_LOG_LEN {
                    return Err(ValidationError::LogTooLong(log.len()));
                }
                Ok(())
            },
            Self::SetMode { uuid, .. } => non_empty(uuid.is_empty(), "uuid"),
            Self::SetGoalHealth { entity_uuid, .. } => {
                non_empty(entity_uuid.is_empty(), "entityUUID")
            },
            Self::Move(m) => m.validate(),
            Self::StartGame { game } | Self::EndGame { game } => {
                non_empty(game.is_empty(), "gameEntityUUID")
            },
            Self::PlayerChange {
                game,
                player_index,
                player,
            } => {
                non_empty(game.is_empty(), "gameEntityUUID")?;
                player_index_in_range(*player_index)?;
                if let Some(user) = player {
                    non_empty(user.is_empty(), "playerUserID")?;
                }
                Ok(())
            },
            Self::PlayerScore { game, player_index } => {
                non_empty(game.is_empty(), "gameEntityUUID")?;
                player_index_in_range(*player_index)
            },
            Self::SpawnBall {
                entity_uuid,
                game,
                prefab,
            } => {
                non_empty(entity_uuid.is_empty(), "entityUUID")?;
                non_empty(game.is_empty(), "gameEntityUUID")?;
                expect_prefab(prefab, BALL_PREFAB)
            },
            Self::SpawnPaddle {
                entity_uuid,
                game,
                prefab,
                owner,
                ..
            } => {
                non_empty(entity_uuid.is_empty(), "entityUUID")?;
                non_empty(game.is_empty(), "gameEntityUUID")?;
                non_empty(owner.is_empty(), "owner")?;
                expect_prefab(prefab, PADDLE_PREFAB)
            },
            Self::DestroyObject { entity_uuid } => non_empty(entity_uuid.is_empty(), "entityUUID"),
        }
    }
}

fn non_empty(is_empty: bool, field: &'static str) -> Result<(), ValidationError> {
    if is_empty {
        Err(ValidationError::EmptyId(field))
    } else {
        Ok(())
    }
}

fn player_index_in_range(index: u8) -> Result<(), ValidationError> {
    if usize::from(index) >= MAX_PLAYERS {
        return Err(ValidationError::PlayerIndexOutOfRange(index));
    }
    Ok(())
}

fn expect_prefab(found: &str, expected: &'static str) -> Result<(), ValidationError> {
    if found != expected {
        return Err(ValidationError::WrongPrefab {
            expected,
            found: found.to_string(),
        });
    }
    Ok(())
}

fn finite_vec(v: Option<Vec3>, field: &'static str) -> Result<(), ValidationError> {
    match v {
        Some(v) if !v.is_finite() => Err(ValidationError::NonFinite(field)),
        _ => Ok(()),
    }
}

fn unit_quat(q: Option<Quat>, field: &'static str) -> Result<(), ValidationError> {
    match q {
        Some(q) if !q.is_finite() => Err(ValidationError::NonFinite(field)),
        Some(q) if q.length_squared() < 1e-8 => Err(ValidationError::ZeroQuaternion(field)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> GameUuid {
        GameUuid::new("game-1")
    }

    #[test]
    fn player_index_bounds() {
        let ok = PongAction::PlayerScore {
            game: game(),
            player_index: 3,
        };
        assert!(ok.validate().is_ok());
        let bad = PongAction::PlayerScore {
            game: game(),
            player_index: 4,
        };
        assert_eq!(
            bad.validate(),
            Err(ValidationError::PlayerIndexOutOfRange(4))
        );
    }

    #[test]
    fn empty_move_is_rejected() {
        let action = PongAction::Move(MoveAction::new(EntityUuid::new("ball")));
        assert_eq!(action.validate(), Err(ValidationError::EmptyMove));
    }

    #[test]
    fn non_finite_and_degenerate_poses_are_rejected() {
        let nan = PongAction::Move(MoveAction::position(
            EntityUuid::new("ball"),
            Vec3::new(f32::NAN, 0.0, 0.0),
        ));
        assert_eq!(nan.validate(), Err(ValidationError::NonFinite("position")));

        let zero = PongAction::Move(MoveAction {
            rotation: Some(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)),
            ..MoveAction::new(EntityUuid::new("ball"))
        });
        assert_eq!(
            zero.validate(),
            Err(ValidationError::ZeroQuaternion("rotation"))
        );
    }

    #[test]
    fn blank_ids_are_rejected() {
        let action = PongAction::StartGame {
            game: GameUuid::new(""),
        };
        assert_eq!(
            action.validate(),
            Err(ValidationError::EmptyId("gameEntityUUID"))
        );
    }

    #[test]
    fn spawn_requires_matching_prefab() {
        let mut action = PongAction::spawn_ball(EntityUuid::new("game-1_ball"), game());
        assert!(action.validate().is_ok());
        if let PongAction::SpawnBall { prefab, .. } = &mut action {
            *prefab = PADDLE_PREFAB.to_string();
        }
        assert!(matches!(
            action.validate(),
            Err(ValidationError::WrongPrefab { .. })
        ));
    }

    #[test]
    fn spawn_paddle_derives_entity_uuid() {
        let action = PongAction::spawn_paddle(game(), UserId::new("u7"), Handedness::Left);
        match &action {
            PongAction::SpawnPaddle { entity_uuid, .. } => {
                assert_eq!(entity_uuid.as_str(), "u7_paddle_left")
            },
            other => panic!("unexpected {other:?}"),
        }
        assert!(action.validate().is_ok());
    }

    #[test]
    fn oversized_log_line_is_rejected() {
        let action = PongAction::log("x".repeat(MAX_LOG_LEN + 1));
        assert!(matches!(
            action.validate(),
            Err(ValidationError::LogTooLong(_))
        ));
    }

    #[test]
    fn wire_names_use_dotted_types_and_camel_case_fields() {
        let action = PongAction::PlayerChange {
            game: game(),
            player_index: 2,
            player: Some(UserId::new("u1")),
        };
        let bytes = rmp_serde::to_vec_named(&action).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("ee.pong.PLAYER_CONNECTED"));
        assert!(text.contains("gameEntityUUID"));
        assert!(text.contains("playerIndex"));
        assert!(text.contains("playerUserID"));
        assert_eq!(action.type_name(), "ee.pong.PLAYER_CONNECTED");
    }
}
