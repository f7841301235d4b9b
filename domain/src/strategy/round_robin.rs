//! Round-robin selection by join order

use crate::discussion::entities::Discussion;
use crate::discussion::participant::Participant;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundRobinConfig {
    /// How many inactive roster slots may be probed past before giving up
    pub max_skips: u32,
}

impl Default for RoundRobinConfig {
    fn default() -> Self {
        Self { max_skips: 4 }
    }
}

/// The full roster sorted by `joined_at` ascending (id as a stable tiebreak)
pub(super) fn sorted_roster(participants: &[Participant]) -> Vec<&Participant> {
    let mut roster: Vec<&Participant> = participants.iter().collect();
    roster.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));
    roster
}

/// Pick the next speaker by rotating over the join-ordered roster.
///
/// The candidate index is `turn_number % len`; inactive participants are
/// probed past, each costing one skip. `None` once the skip budget is spent
/// or nobody is active.
pub(super) fn next_participant<'a>(
    config: &RoundRobinConfig,
    discussion: &Discussion,
    participants: &'a [Participant],
) -> Option<&'a Participant> {
    let roster = sorted_roster(participants);
    if roster.is_empty() {
        return None;
    }

    let start = (discussion.current_turn.turn_number % roster.len() as u64) as usize;
    let mut skips = 0u32;
    for offset in 0..roster.len() {
        let candidate = roster[(start + offset) % roster.len()];
        if candidate.is_active {
            return Some(candidate);
        }
        skips += 1;
        if skips > config.max_skips {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discussion::participant::ParticipantRole;
    use crate::discussion::settings::DiscussionSettings;
    use chrono::{Duration, Utc};

    fn discussion_at_turn(turn_number: u64) -> Discussion {
        let mut d = Discussion::new(
            "disc-1",
            "topic",
            "title",
            "user-1",
            DiscussionSettings::default(),
            Utc::now(),
        );
        d.current_turn.turn_number = turn_number;
        d
    }

    fn joined(id: &str, offset_secs: i64) -> Participant {
        Participant::new(
            id,
            "disc-1".into(),
            format!("principal-{id}"),
            ParticipantRole::Participant,
            Utc::now() + Duration::seconds(offset_secs),
        )
    }

    #[test]
    fn test_rotation_follows_join_order() {
        let participants = vec![joined("b", 10), joined("a", 0), joined("c", 20)];
        let config = RoundRobinConfig::default();

        let expected = ["a", "b", "c", "a", "b", "c"];
        for (turn, want) in expected.iter().enumerate() {
            let d = discussion_at_turn(turn as u64);
            let picked = next_participant(&config, &d, &participants).unwrap();
            assert_eq!(picked.id.as_str(), *want, "turn {turn}");
        }
    }

    #[test]
    fn test_inactive_participants_are_skipped() {
        let mut b = joined("b", 10);
        b.deactivate();
        let participants = vec![joined("a", 0), b, joined("c", 20)];

        // Turn 1 would be b's slot; the probe lands on c instead
        let d = discussion_at_turn(1);
        let picked = next_participant(&RoundRobinConfig::default(), &d, &participants).unwrap();
        assert_eq!(picked.id.as_str(), "c");
    }

    #[test]
    fn test_all_inactive_returns_none() {
        let mut a = joined("a", 0);
        let mut b = joined("b", 10);
        a.deactivate();
        b.deactivate();
        let participants = vec![a, b];

        let d = discussion_at_turn(3);
        assert!(next_participant(&RoundRobinConfig::default(), &d, &participants).is_none());
    }

    #[test]
    fn test_skip_budget_is_enforced() {
        let mut participants: Vec<Participant> = (0..4)
            .map(|i| {
                let mut p = joined(&format!("p{i}"), i);
                p.deactivate();
                p
            })
            .collect();
        participants.push(joined("active", 99));

        let d = discussion_at_turn(0);
        // Four inactive slots stand before the active one; a budget of 2 gives up first
        let strict = RoundRobinConfig { max_skips: 2 };
        assert!(next_participant(&strict, &d, &participants).is_none());

        let generous = RoundRobinConfig { max_skips: 4 };
        let picked = next_participant(&generous, &d, &participants).unwrap();
        assert_eq!(picked.id.as_str(), "active");
    }

    #[test]
    fn test_empty_roster_returns_none() {
        let d = discussion_at_turn(0);
        assert!(next_participant(&RoundRobinConfig::default(), &d, &[]).is_none());
    }
}
