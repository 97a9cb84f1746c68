//! World configuration.
//!
//! Loaded from the `[world]` table of a TOML file:
//!
//! ```toml
//! [world]
//! max_observer_rounds = 16
//!
//! [world.logging]
//! format = "pretty"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::logging::LogConfig;

/// Default cap on observer rounds per transition.
pub const DEFAULT_MAX_OBSERVER_ROUNDS: usize = 64;

/// Settings applied to every transition of a lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Observer rounds allowed in one transition before it is aborted.
    pub max_observer_rounds: usize,
    /// Subscriber settings for [`logging::init`](crate::logging::init).
    pub logging: LogConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_observer_rounds: DEFAULT_MAX_OBSERVER_ROUNDS,
            logging: LogConfig::default(),
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    world: WorldConfig,
}

impl WorldConfig {
    /// Parse the `[world]` table of a TOML document; missing keys take defaults.
    pub fn from_toml(source: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(source)?;
        Ok(file.world)
    }

    /// Set the observer round cap.
    pub fn with_max_observer_rounds(mut self, rounds: usize) -> Self {
        self.max_observer_rounds = rounds;
        self
    }
}
