//! Participant records.
//!
//! A participant is identified by the transport address of its link to the
//! authority. Entries are created by the first accepted `Join` and are never
//! removed while the session lives; a closed link only clears `is_connected`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport-level address of a peer, stable for the lifetime of a session.
///
/// The authority's own address doubles as the session code handed to
/// joining players.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

/// One player in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Transport address
    pub id: PeerId,

    /// Display name
    pub name: String,

    /// Avatar tag chosen by the player
    pub avatar: String,

    /// Cumulative score across games in this session
    pub score: u32,

    /// Whether this participant is the authority
    pub is_host: bool,

    /// Per-phase submission flag
    pub has_submitted: bool,

    /// Whether the participant's link is currently open
    pub is_connected: bool,
}

impl Participant {
    pub fn new(id: PeerId, name: String, avatar: String) -> Self {
        Self {
            id,
            name,
            avatar,
            score: 0,
            is_host: false,
            has_submitted: false,
            is_connected: true,
        }
    }

    /// Create the authority's own participant entry.
    pub fn host(id: PeerId, name: String, avatar: String) -> Self {
        Self {
            is_host: true,
            ..Self::new(id, name, avatar)
        }
    }
}

/// Trim a display name and cap it at `max_len` characters.
///
/// Returns `None` when nothing printable is left.
pub fn normalize_name(raw: &str, max_len: usize) -> Option<String> {
    let capped: String = raw.trim().chars().take(max_len).collect();
    let name = capped.trim_end();
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_new() {
        let p = Participant::new(PeerId::from("peer-1"), "Ana".into(), "fox".into());
        assert!(!p.is_host);
        assert!(!p.has_submitted);
        assert!(p.is_connected);
        assert_eq!(p.score, 0);
    }

    #[test]
    fn test_host_flag() {
        let p = Participant::host(PeerId::from("host"), "Bo".into(), "owl".into());
        assert!(p.is_host);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Ana  ", 32), Some("Ana".to_string()));
        assert_eq!(normalize_name("   ", 32), None);
        assert_eq!(normalize_name("abcdef", 3), Some("abc".to_string()));
        assert_eq!(normalize_name("ab cd", 3), Some("ab".to_string()));
        assert_eq!(normalize_name("Ana", 0), None);
    }

    #[test]
    fn test_peer_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PeerId::from("10.0.0.7:4000")).unwrap();
        assert_eq!(json, "\"10.0.0.7:4000\"");
    }
}
