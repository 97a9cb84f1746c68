//! Logging setup for applications embedding Urd.
//!
//! The crates only emit `tracing` events. An application that has no
//! subscriber of its own can install one from the `[world.logging]` table:
//!
//! ```toml
//! [world.logging]
//! format = "json"
//! filter = "world_core=debug,relational_model=info"
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

use crate::error::Result;

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "world_core=info,relational_model=warn";

/// How events are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directives.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl LogConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// The filter to install. `RUST_LOG` takes precedence over `filter`.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => Ok(EnvFilter::try_new(&self.filter)?),
        }
    }
}

/// Install a global subscriber for `config`.
///
/// Fails with [`WorldError::Logging`](crate::WorldError::Logging) if the
/// process already has one, leaving the existing subscriber in place.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = config.env_filter()?;
    match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .finish()
            .try_init()?,
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .finish()
            .try_init()?,
    }
    tracing::debug!(format = ?config.format, "installed subscriber");
    Ok(())
}
