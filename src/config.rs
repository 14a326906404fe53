//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Minimum participants needed to start a game.
pub const DEFAULT_MIN_PLAYERS: usize = 2;

/// Join cap.
pub const DEFAULT_MAX_PARTICIPANTS: usize = 8;

/// Buildup delay between `Assigning` and `Remixing` (3 seconds).
pub const DEFAULT_ASSIGNMENT_DELAY_MS: u64 = 3_000;

/// Longest accepted fact, in characters.
pub const DEFAULT_MAX_FACT_LEN: usize = 280;

/// Display names are truncated to this many characters.
pub const DEFAULT_MAX_NAME_LEN: usize = 32;

/// Rules and pacing for one session, fixed when the authority starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub min_players: usize,
    pub max_participants: usize,
    pub assignment_delay_ms: u64,
    pub max_fact_len: usize,
    pub max_name_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_players: DEFAULT_MIN_PLAYERS,
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            assignment_delay_ms: DEFAULT_ASSIGNMENT_DELAY_MS,
            max_fact_len: DEFAULT_MAX_FACT_LEN,
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }
}

impl SessionConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_players < DEFAULT_MIN_PLAYERS {
            return Err(ConfigError::MinPlayers(self.min_players));
        }
        if self.max_participants < self.min_players {
            return Err(ConfigError::Capacity {
                min: self.min_players,
                max: self.max_participants,
            });
        }
        if self.max_fact_len == 0 {
            return Err(ConfigError::ZeroLimit("max_fact_len"));
        }
        if self.max_name_len == 0 {
            return Err(ConfigError::ZeroLimit("max_name_len"));
        }
        Ok(())
    }

    pub fn assignment_delay(&self) -> Duration {
        Duration::from_millis(self.assignment_delay_ms)
    }
}
