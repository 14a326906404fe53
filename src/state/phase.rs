//! Session phase lifecycle.
//!
//! # State Diagram
//!
//! ```text
//! ┌───────┐ start  ┌────────────┐ all facts ┌───────────┐ delay ┌──────────┐
//! │ Lobby │───────▶│ Collecting │──────────▶│ Assigning │──────▶│ Remixing │
//! └───────┘        └────────────┘           └───────────┘       └────┬─────┘
//!     ▲                                                              │ all artifacts
//!     │ return                                                       ▼
//! ┌─────────┐  all votes  ┌────────┐  advance past last   ┌────────────┐
//! │ Results │◀────────────│ Voting │◀─────────────────────│ Presenting │
//! └─────────┘             └────────┘                      └────────────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for players
    #[default]
    Lobby,
    /// Every participant submits one fact
    Collecting,
    /// Remix assignments revealed, waiting out the buildup delay
    Assigning,
    /// Every participant remixes the fact assigned to them
    Remixing,
    /// The host walks through the remixed rounds
    Presenting,
    /// Every participant votes for one round
    Voting,
    /// Final ranking
    Results,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Collecting => "collecting",
            Self::Assigning => "assigning",
            Self::Remixing => "remixing",
            Self::Presenting => "presenting",
            Self::Voting => "voting",
            Self::Results => "results",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
