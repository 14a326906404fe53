//! Error types.
//!
//! Rejected intents are not errors here; the engine reports them through
//! [`crate::engine::Rejection`] and drops them. These types cover the edges
//! that a caller can actually act on.

use crate::state::PeerId;

/// Failure to turn a message into bytes or back.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("{kind} is not a participant intent")]
    NotAnIntent { kind: &'static str },
}

/// Failure to push a message into a channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel is closed")]
    Closed,
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Failure to open a link to an authority.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("no session reachable at {code}")]
    Unreachable { code: PeerId },
}

/// Invalid session configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("min_players must be at least 2 (got {0})")]
    MinPlayers(usize),
    #[error("max_participants ({max}) is below min_players ({min})")]
    Capacity { min: usize, max: usize },
    #[error("{0} must be at least 1")]
    ZeroLimit(&'static str),
}

/// Errors surfaced by [`crate::client::SessionClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("the authority is no longer running")]
    AuthorityStopped,
    #[error("cannot vote for the round you remixed")]
    SelfVote,
    #[error("display name is empty")]
    InvalidName,
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
