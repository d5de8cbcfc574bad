//! Engine configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file,
//! then `SKIRMISH_*` environment variables.

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SKIRMISH_";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inventory capacity, counted in item units
    pub max_inventory_size: u32,
    /// Resolve the monster's turn inside the player's intent
    pub auto_monster_turn: bool,
    /// SQLite database path; None = in-memory store
    pub db_path: Option<String>,
    /// Fixed RNG seed; None = seeded from OS entropy
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_inventory_size: 20,
            auto_monster_turn: false,
            db_path: None,
            seed: None,
        }
    }
}

impl Config {
    /// Load configuration, optionally merging a TOML file
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX)).extract()
    }
}
