//! Rounds: one fact and its remix.

use serde::{Deserialize, Serialize};

use super::participant::PeerId;

/// Opaque output of the canvas editor.
///
/// The state layer never looks inside; it is stored and forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Artifact(pub serde_json::Value);

impl Artifact {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// A fact submitted by one author, remixed by another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// Fact text as submitted
    pub fact: String,

    /// Participant who wrote the fact
    pub author_id: PeerId,

    /// Author's display name when the fact was submitted
    pub author_name: String,

    /// Participant assigned to remix this fact
    pub assignee_id: Option<PeerId>,

    /// The remix, once delivered
    pub artifact: Option<Artifact>,

    /// Votes received
    pub votes: u32,
}

impl Round {
    pub fn new(fact: String, author_id: PeerId, author_name: String) -> Self {
        Self {
            fact,
            author_id,
            author_name,
            assignee_id: None,
            artifact: None,
            votes: 0,
        }
    }

    pub fn is_assigned_to(&self, id: &PeerId) -> bool {
        self.assignee_id.as_ref() == Some(id)
    }

    pub fn has_artifact(&self) -> bool {
        self.artifact.is_some()
    }
}

/// Round indices ordered by votes, highest first.
///
/// Ties keep list order.
pub fn rank(rounds: &[Round]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rounds.len()).collect();
    order.sort_by(|a, b| rounds[*b].votes.cmp(&rounds[*a].votes));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_with_votes(author: &str, votes: u32) -> Round {
        Round {
            votes,
            ..Round::new(format!("fact by {}", author), author.into(), author.into())
        }
    }

    #[test]
    fn test_rank_descending() {
        let rounds = vec![
            round_with_votes("a", 1),
            round_with_votes("b", 3),
            round_with_votes("c", 2),
        ];
        assert_eq!(rank(&rounds), vec![1, 2, 0]);
    }

    #[test]
    fn test_rank_ties_keep_order() {
        let rounds = vec![
            round_with_votes("a", 2),
            round_with_votes("b", 5),
            round_with_votes("c", 2),
            round_with_votes("d", 2),
        ];
        assert_eq!(rank(&rounds), vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_assignment_check() {
        let mut round = Round::new("f".into(), "a".into(), "A".into());
        assert!(!round.is_assigned_to(&"b".into()));
        round.assignee_id = Some("b".into());
        assert!(round.is_assigned_to(&"b".into()));
    }
}
