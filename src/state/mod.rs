//! Session state types.
//!
//! - `participant` - peer identity and player records
//! - `round` - facts, remix artifacts, ranking
//! - `phase` - the session lifecycle
//! - `session` - the replicated aggregate
//! - `store` - authority-owned store and participant replicas
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────── Authority ────────────────────────┐
//! │                                                           │
//! │   Intent ──▶ SessionStore::dispatch ──▶ engine::transition │
//! │                     │                                     │
//! │                     ▼                                     │
//! │               Session (canonical) ──▶ StateSnapshot ──────┼──▶ every channel
//! └───────────────────────────────────────────────────────────┘        │
//!                                                                      ▼
//! ┌─────────────────────── Participant ───────────────────────┐
//! │   Replica::apply_snapshot  (replace, never merge)         │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod participant;
pub mod phase;
pub mod round;
pub mod session;
pub mod store;

pub use participant::{normalize_name, Participant, PeerId};
pub use phase::Phase;
pub use round::{rank, Artifact, Round};
pub use session::Session;
pub use store::{Replica, SessionStore};
