//! Wire protocol.
//!
//! - `message` - the `{kind, payload}` envelope and the typed `Intent` the
//!   engine consumes.
//! - `codec` - JSON encoding of envelopes to bytes and back.
//!
//! Every accepted change is carried by a full `StateSnapshot`; there is no
//! delta format.

pub mod codec;
pub mod message;

pub use codec::{decode, encode};
pub use message::{Intent, Message};
