use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a scene entity, shared by every peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityUuid(pub String);

/// Identifier of a game instance: the UUID of the game's root entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameUuid(pub String);

/// Identifier of a connected user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(EntityUuid);
string_id!(GameUuid);
string_id!(UserId);

impl GameUuid {
    /// The root entity this game is keyed by.
    pub fn entity(&self) -> EntityUuid {
        EntityUuid(self.0.clone())
    }
}

impl From<&EntityUuid> for GameUuid {
    fn from(uuid: &EntityUuid) -> Self {
        Self(uuid.0.clone())
    }
}

impl UserId {
    /// Entity UUID of the paddle this user wields in the given hand.
    pub fn paddle_uuid(&self, handedness: Handedness) -> EntityUuid {
        EntityUuid(format!("{}_paddle_{}", self.0, handedness.as_str()))
    }
}

/// Which hand a paddle is attached to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    #[default]
    Right,
}

impl Handedness {
    pub const BOTH: [Handedness; 2] = [Handedness::Left, Handedness::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}
