//! Remix Party State Library
//!
//! Host-authoritative session state for a party game: everyone submits a
//! fact, each fact is handed to another player to remix, the remixes are
//! presented one by one and everybody votes on them.
//!
//! # Overview
//!
//! - **Session model** (`state`) - participants, rounds, phases, and the
//!   replicated `Session` aggregate.
//!
//! - **Transition engine** (`engine`) - a pure function from
//!   (session, event, sender) to (session, outcome). Intents that do not fit
//!   the current phase are ignored.
//!
//! - **Authority** (`authority`) - a single task that owns the canonical
//!   session, runs every event through the engine in arrival order and
//!   broadcasts a full snapshot after each accepted one.
//!
//! - **Participant facade** (`client`) - create or join a session, submit
//!   intents, observe the latest snapshot.
//!
//! - **Wire protocol** (`protocol`) - the JSON `{kind, payload}` envelope.
//!
//! # Design Principles
//!
//! 1. **One writer** - only the authority mutates the session. Participants
//!    replace their copy with each snapshot and never merge.
//!
//! 2. **Always whole** - every replication message carries the entire
//!    session. There are no deltas to reorder or lose.
//!
//! 3. **No transport** - connection establishment lives behind the
//!    `Connector` and `Channel` traits. `MemoryNetwork` is an in-process
//!    implementation.
//!
//! # Example
//!
//! ```rust
//! use remix_party_state::{Intent, MemoryNetwork, Phase, SessionClient, SessionConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let network = MemoryNetwork::new();
//! let listener = network.listen("host-addr".into()).await;
//!
//! // The host runs the authority and serves the listener.
//! let host = SessionClient::create_session(
//!     "host-addr".into(),
//!     "Alice",
//!     "owl",
//!     SessionConfig::default(),
//! )?;
//! if let Some(authority) = host.authority() {
//!     authority.serve(listener);
//! }
//!
//! // Another participant joins by code.
//! let guest = SessionClient::join_session(&network, &"host-addr".into(), "Bob", "fox").await?;
//!
//! let mut view = guest.on_session_changed();
//! view.wait_for(|s| s.participant_count() == 2).await?;
//!
//! host.submit_intent(Intent::StartGame)?;
//! view.wait_for(|s| s.phase == Phase::Collecting).await?;
//! # Ok(())
//! # }
//! ```

pub mod authority;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod replication;
pub mod state;
pub mod transport;

pub use authority::{Authority, AuthorityHandle};
pub use client::{LinkStatus, SessionClient};
pub use config::SessionConfig;
pub use error::{ChannelError, ClientError, CodecError, ConfigError, ConnectError};
pub use protocol::{Intent, Message};
pub use replication::{Broadcaster, Channel};
pub use state::*;
pub use transport::{Connector, Link, MemoryNetwork};
