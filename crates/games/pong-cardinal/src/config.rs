use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Data-driven configuration for the four-player cardinal variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CardinalConfig {
    /// Score every slot starts with; also the full width of a score bar.
    pub max_score: i32,
    /// Delay before the first ball and after every destroyed ball, in ms.
    pub ball_cooldown_ms: f64,
    /// A ball whose game-local height drops below this is a miss.
    pub drop_threshold: f32,
    /// Impulse given to a fresh ball toward the last connected player.
    pub ball_velocity: f32,
    /// Ball spawn point relative to the game entity.
    pub spawn_offset: Vec3,
    pub ball_radius: f32,
    pub ball_scale: f32,
    pub paddle_scale: Vec3,
    pub paddle_radius: f32,
    pub paddle_restitution: f32,
    /// End the game when a slot's score reaches zero.
    pub end_game_on_zero_score: bool,
}

impl Default for CardinalConfig {
    fn default() -> Self {
        Self {
            max_score: 9,
            ball_cooldown_ms: 3000.0,
            drop_threshold: 0.2,
            ball_velocity: 0.025,
            spawn_offset: Vec3::new(0.0, 2.0, 0.0),
            ball_radius: 0.1,
            ball_scale: 0.1,
            paddle_scale: Vec3::new(0.2, 0.2, 0.1),
            paddle_radius: 0.1,
            paddle_restitution: 0.5,
            end_game_on_zero_score: false,
        }
    }
}

impl CardinalConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("PONG_CARDINAL_CONFIG")
            && let Ok(contents) = std::fs::read_to_string(&path)
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        if let Ok(contents) = std::fs::read_to_string("config/cardinal.toml")
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_end_is_off_by_default() {
        assert!(!CardinalConfig::default().end_game_on_zero_score);
        let config: CardinalConfig = toml::from_str("end_game_on_zero_score = true").unwrap();
        assert!(config.end_game_on_zero_score);
        assert_eq!(config.max_score, 9);
    }
}
