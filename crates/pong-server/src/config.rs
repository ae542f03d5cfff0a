use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use pong_core::error::PongError;
use pong_core::physics::PhysicsSettings;

/// Which rules variant a session hosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    Arena,
    Cardinal,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arena => "arena",
            Self::Cardinal => "cardinal",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = PongError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "arena" => Ok(Self::Arena),
            "cardinal" => Ok(Self::Cardinal),
            other => Err(PongError::Configuration(format!(
                "unknown variant {other:?}"
            ))),
        }
    }
}

/// Host configuration, loaded from `config/server.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub variant: Variant,
    pub tick_rate_hz: f64,
    /// Seed for every peer's `StdRng`.
    pub seed: u64,
    /// Named client peers, one avatar each.
    pub clients: Vec<String>,
    /// Extra client peers with generated user ids.
    pub anonymous_clients: usize,
    /// Stop after this many ticks. Runs until stopped when unset.
    pub max_ticks: Option<u64>,
    pub physics: PhysicsSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Arena,
            tick_rate_hz: 60.0,
            seed: 7,
            clients: vec!["alice".to_string(), "bob".to_string()],
            anonymous_clients: 0,
            max_ticks: None,
            physics: PhysicsSettings::default(),
        }
    }
}

impl ServerConfig {
    pub fn timestep_ms(&self) -> f64 {
        1000.0 / self.tick_rate_hz
    }

    /// Named clients followed by generated ones.
    pub fn client_ids(&self) -> Vec<String> {
        let mut ids = self.clients.clone();
        ids.extend((0..self.anonymous_clients).map(|_| uuid::Uuid::new_v4().to_string()));
        ids
    }

    /// Check the config without exiting.
    pub fn check(&self) -> Result<(), PongError> {
        if !self.tick_rate_hz.is_finite() || self.tick_rate_hz <= 0.0 {
            return Err(PongError::Configuration(
                "tick_rate_hz must be > 0".to_string(),
            ));
        }
        if self.tick_rate_hz > 1000.0 {
            return Err(PongError::Configuration(
                "tick_rate_hz must be <= 1000".to_string(),
            ));
        }
        if let Some(name) = self.clients.iter().find(|c| c.is_empty()) {
            return Err(PongError::Configuration(format!(
                "client names must not be empty, got {name:?}"
            )));
        }
        let mut seen = std::collections::BTreeSet::new();
        for name in &self.clients {
            if name == "server" || !seen.insert(name) {
                return Err(PongError::Configuration(format!(
                    "client name {name:?} is reserved or repeated"
                )));
            }
        }
        if self.physics.floor_half_extent <= 0.0 {
            return Err(PongError::Configuration(
                "physics.floor_half_extent must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate configuration, exiting on anything the host cannot run with.
    pub fn validate(&self) {
        if let Err(e) = self.check() {
            tracing::error!(error = %e, "invalid server configuration");
            std::process::exit(1);
        }
        if self.clients.is_empty() && self.anonymous_clients == 0 {
            tracing::warn!("no client peers configured; only the server will tick");
        }
    }

    /// Load config from `PONG_SERVER_CONFIG` or `config/server.toml`, then
    /// apply env var overrides.
    pub fn load() -> Self {
        let path = std::env::var("PONG_SERVER_CONFIG")
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "config/server.toml".to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(path = %path, "failed to parse config: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(path = %path, "no config file found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(val) = std::env::var("PONG_VARIANT")
            && let Ok(variant) = val.parse::<Variant>()
        {
            config.variant = variant;
        }
        if let Ok(val) = std::env::var("PONG_TICK_RATE")
            && let Ok(hz) = val.parse::<f64>()
        {
            config.tick_rate_hz = hz;
        }
        if let Ok(val) = std::env::var("PONG_SEED")
            && let Ok(seed) = val.parse::<u64>()
        {
            config.seed = seed;
        }
        if let Ok(val) = std::env::var("PONG_MAX_TICKS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.max_ticks = Some(n);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.variant, Variant::Arena);
        assert_eq!(cfg.tick_rate_hz, 60.0);
        assert_eq!(cfg.clients, vec!["alice", "bob"]);
        assert!(cfg.max_ticks.is_none());
        assert!(cfg.check().is_ok());
    }

    #[test]
    fn parse_minimal_toml() {
        let toml_str = r#"
variant = "cardinal"
tick_rate_hz = 30.0

[physics]
floor_height = 0.5
"#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.variant, Variant::Cardinal);
        assert_eq!(cfg.tick_rate_hz, 30.0);
        assert_eq!(cfg.physics.floor_height, Some(0.5));
        assert_eq!(cfg.physics.gravity, PhysicsSettings::default().gravity);
        assert_eq!(cfg.seed, 7);
    }

    #[test]
    fn check_rejects_zero_tick_rate() {
        let cfg = ServerConfig {
            tick_rate_hz: 0.0,
            ..ServerConfig::default()
        };
        assert!(matches!(cfg.check(), Err(PongError::Configuration(_))));
    }

    #[test]
    fn check_rejects_duplicate_or_reserved_clients() {
        for clients in [vec!["a", "a"], vec!["server"], vec![""]] {
            let cfg = ServerConfig {
                clients: clients.into_iter().map(String::from).collect(),
                ..ServerConfig::default()
            };
            assert!(cfg.check().is_err());
        }
    }

    #[test]
    fn anonymous_clients_get_generated_ids() {
        let cfg = ServerConfig {
            clients: vec!["alice".to_string()],
            anonymous_clients: 2,
            ..ServerConfig::default()
        };
        let ids = cfg.client_ids();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], "alice");
        assert_ne!(ids[1], ids[2]);
    }

    #[test]
    fn variant_parses_case_insensitively() {
        assert_eq!("Cardinal".parse::<Variant>().unwrap(), Variant::Cardinal);
        assert!("golf".parse::<Variant>().is_err());
    }
}
