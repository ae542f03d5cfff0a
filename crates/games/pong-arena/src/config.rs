use glam::Vec3;
use serde::{Deserialize, Serialize};

use pong_core::ids::Handedness;

/// How a goal picks its controlling avatar when several stand on its plate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarPolicy {
    First,
    #[default]
    Last,
    Closest,
}

/// Data-driven configuration for the arena variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Planar radius within which paddles, texts and plates attach to a goal.
    pub bind_radius: f32,
    /// Health every goal is reset to when a game starts.
    pub starting_health: i32,
    /// Seconds between volleys.
    pub volley_interval_secs: f64,
    /// Launch point relative to the game center.
    pub launch_offset: Vec3,
    /// Volley impulse magnitude is drawn from `[impulse_min, impulse_max)`.
    pub impulse_min: f32,
    pub impulse_max: f32,
    /// Where scored balls are stashed.
    pub parked_position: Vec3,
    /// Balls farther than this from the game center count as parked.
    pub play_radius: f32,
    pub avatar_policy: AvatarPolicy,
    /// Hand whose pose drives a goal's paddle.
    pub paddle_hand: Handedness,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            bind_radius: 3.0,
            starting_health: 9,
            volley_interval_secs: 5.0,
            launch_offset: Vec3::new(0.0, 5.0, 0.0),
            impulse_min: 0.2,
            impulse_max: 0.3,
            parked_position: Vec3::splat(-1000.0),
            play_radius: 50.0,
            avatar_policy: AvatarPolicy::Last,
            paddle_hand: Handedness::Right,
        }
    }
}

impl ArenaConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("PONG_ARENA_CONFIG")
            && let Ok(contents) = std::fs::read_to_string(&path)
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        if let Ok(contents) = std::fs::read_to_string("config/arena.toml")
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        Self::default()
    }
}
