//! Stateful diff engine turning consecutive sessions into events.
//!
//! The detector remembers only the last session it saw. Its first comparison
//! runs against an empty roster, so every player present is reported as
//! joined; scoreboard, goal and possession changes need a previous session
//! and start with the second comparison.
//!
//! ## Event Order
//!
//! Events from one comparison are emitted as: joins (roster order), leaves
//! (ascending slot), scoreboard update, goal, possession change, disc throw,
//! then stat increments (roster order, counters in [`StatKind::ALL`] order).

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Event, Player, Role, Scoreboard, Session, StatKind};

/// Assigns a team role to a newly joined player.
pub trait RoleClassifier: Send {
    fn classify(&self, player: &Player) -> Role;
}

/// Infers roles from jersey and slot numbers.
///
/// Jersey `-1` is a spectator; otherwise even slots are blue and odd slots
/// orange. This is a heuristic and can be wrong for custom lobbies.
#[derive(Debug, Default, Clone, Copy)]
pub struct SlotParityHeuristic;

impl RoleClassifier for SlotParityHeuristic {
    fn classify(&self, player: &Player) -> Role {
        if player.number == -1 {
            Role::Spectator
        } else if player.slot.rem_euclid(2) == 0 {
            Role::Blue
        } else {
            Role::Orange
        }
    }
}

/// Position of a player inside `Session::teams`.
type PlayerIndex = (usize, usize);

/// State kept from the last compared session.
struct Baseline {
    session: Arc<Session>,
    scoreboard: Scoreboard,
    possession: Option<i32>,
}

/// Compares each session against the previous one.
///
/// Not thread-safe; use one detector per capture stream.
pub struct EventDetector {
    classifier: Box<dyn RoleClassifier>,
    baseline: Option<Baseline>,
    /// Slots of `baseline.session`; empty until the first comparison.
    players_by_slot: HashMap<i32, PlayerIndex>,
    scratch: HashMap<i32, PlayerIndex>,
}

impl Default for EventDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDetector {
    pub fn new() -> Self {
        Self::with_classifier(SlotParityHeuristic)
    }

    pub fn with_classifier<C: RoleClassifier + 'static>(classifier: C) -> Self {
        Self {
            classifier: Box::new(classifier),
            baseline: None,
            players_by_slot: HashMap::new(),
            scratch: HashMap::new(),
        }
    }

    /// Whether a previous session is cached.
    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// Forget the cached session.
    pub fn reset(&mut self) {
        self.baseline = None;
        self.players_by_slot.clear();
        self.scratch.clear();
    }

    /// Compare `session` with the cached one and cache it.
    pub fn detect(&mut self, session: &Arc<Session>) -> Vec<Event> {
        let mut current = std::mem::take(&mut self.scratch);
        current.clear();
        for (t, team) in session.teams.iter().enumerate() {
            for (p, player) in team.players.iter().enumerate() {
                current.entry(player.slot).or_insert((t, p));
            }
        }

        let scoreboard = session.scoreboard();
        let possession = session.possession_holder();
        let previous = self.baseline.as_ref();
        let previous_player = |(team, player): PlayerIndex| {
            previous.map(|baseline| &baseline.session.teams[team].players[player])
        };

        let mut events = Vec::new();
        let roster = || {
            session.teams.iter().enumerate().flat_map(|(t, team)| {
                team.players.iter().enumerate().map(move |(p, player)| ((t, p), player))
            })
        };
        // Duplicate slots within one session resolve to their first entry.
        let is_primary = |index: PlayerIndex, player: &Player| current.get(&player.slot) == Some(&index);

        for (index, player) in roster() {
            if is_primary(index, player) && !self.players_by_slot.contains_key(&player.slot) {
                events.push(Event::PlayerJoined {
                    slot: player.slot,
                    name: Arc::from(player.name.as_str()),
                    user_id: player.user_id,
                    role: self.classifier.classify(player),
                });
            }
        }

        let mut departed: Vec<(i32, PlayerIndex)> = self
            .players_by_slot
            .iter()
            .filter(|(slot, _)| !current.contains_key(slot))
            .map(|(slot, index)| (*slot, *index))
            .collect();
        departed.sort_unstable_by_key(|(slot, _)| *slot);
        for (slot, index) in departed {
            let name = previous_player(index).map_or("", |player| player.name.as_str());
            events.push(Event::PlayerLeft { slot, name: Arc::from(name) });
        }

        if let Some(previous) = previous {
            if scoreboard != previous.scoreboard {
                events.push(Event::ScoreboardUpdated {
                    previous: previous.scoreboard,
                    current: scoreboard,
                    game_clock_display: Arc::from(session.game_clock_display.as_str()),
                });
            }

            if let Some(score) = session.score_detail() {
                events.push(Event::GoalScored { score: Arc::new(score.clone()) });
            }

            if possession != previous.possession {
                events.push(Event::PossessionChanged { previous: previous.possession, current: possession });
            }
        }

        if let (Some(throw), Some(slot)) = (session.throw_detail(), possession) {
            events.push(Event::DiscThrown { slot, throw: Arc::new(throw.clone()) });
        }

        for (index, player) in roster() {
            if !is_primary(index, player) {
                continue;
            }
            let Some(before) = self.players_by_slot.get(&player.slot).and_then(|&i| previous_player(i)) else {
                continue;
            };
            for stat in StatKind::ALL {
                let (old, new) = (stat.read(&before.stats), stat.read(&player.stats));
                if new > old {
                    events.push(Event::StatIncremented {
                        slot: player.slot,
                        stat,
                        previous: old,
                        current: new,
                    });
                }
            }
        }

        self.scratch = std::mem::replace(&mut self.players_by_slot, current);
        self.baseline = Some(Baseline { session: Arc::clone(session), scoreboard, possession });

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::SessionBuilder;
    use crate::types::{LastScore, LastThrow};

    fn detect(detector: &mut EventDetector, builder: SessionBuilder) -> Vec<Event> {
        detector.detect(&Arc::new(builder.build()))
    }

    #[test]
    fn first_comparison_reports_the_roster() {
        let mut detector = EventDetector::new();
        let throw = LastThrow { total_speed: 7.25, ..LastThrow::default() };
        let score = LastScore { point_amount: 2, ..LastScore::default() };
        let events = detect(
            &mut detector,
            SessionBuilder::new()
                .player(0, "a", 1)
                .player(1, "b", 2)
                .blue_points(3)
                .possession(1)
                .last_score(score)
                .last_throw(throw.clone()),
        );
        assert_eq!(
            events,
            vec![
                Event::PlayerJoined { slot: 0, name: "a".into(), user_id: 1000, role: Role::Blue },
                Event::PlayerJoined { slot: 1, name: "b".into(), user_id: 1001, role: Role::Orange },
                Event::DiscThrown { slot: 1, throw: Arc::new(throw) },
            ]
        );
        assert!(detector.has_baseline());
    }

    #[test]
    fn throw_without_holder_is_not_reported() {
        let mut detector = EventDetector::new();
        let roster = || SessionBuilder::new().player(0, "a", 1).player(1, "b", 2);
        detect(&mut detector, roster());

        let throw = LastThrow { total_speed: 9.0, ..LastThrow::default() };
        assert!(detect(&mut detector, roster().last_throw(throw)).is_empty());
    }

    #[test]
    fn stat_increments_only_when_strictly_greater() {
        let mut detector = EventDetector::new();
        let base = || SessionBuilder::new().player(0, "keeper", 1);

        detect(&mut detector, base().stat(0, StatKind::Saves, 2));
        assert!(detect(&mut detector, base().stat(0, StatKind::Saves, 2)).is_empty());

        let events = detect(&mut detector, base().stat(0, StatKind::Saves, 5));
        assert_eq!(
            events,
            vec![Event::StatIncremented { slot: 0, stat: StatKind::Saves, previous: 2, current: 5 }]
        );

        let events = detect(&mut detector, base().stat(0, StatKind::Saves, 1));
        assert!(events.is_empty(), "decreases are not reported");

        // A new slot arriving with saves already at 5 has no baseline.
        let events = detect(
            &mut detector,
            base().stat(0, StatKind::Saves, 1).player(3, "late", 4).stat(3, StatKind::Saves, 5),
        );
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::PlayerJoined { slot: 3, role: Role::Orange, .. }));
    }

    #[test]
    fn leave_then_rejoin_are_separate_events() {
        let mut detector = EventDetector::new();
        detect(&mut detector, SessionBuilder::new().player(0, "a", 1).player(2, "b", 2));

        let events = detect(&mut detector, SessionBuilder::new().player(0, "a", 1));
        assert_eq!(events, vec![Event::PlayerLeft { slot: 2, name: "b".into() }]);

        let events = detect(&mut detector, SessionBuilder::new().player(0, "a", 1).player(2, "b", 2));
        assert_eq!(
            events,
            vec![Event::PlayerJoined { slot: 2, name: "b".into(), user_id: 1002, role: Role::Blue }]
        );
    }

    #[test]
    fn scoreboard_changes_aggregate_into_one_event() {
        let mut detector = EventDetector::new();
        detect(&mut detector, SessionBuilder::new());
        let events = detect(&mut detector, SessionBuilder::new().blue_points(2).orange_round_score(1));
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::ScoreboardUpdated { previous, current, .. } => {
                assert_eq!(previous.blue_points, 0);
                assert_eq!(current.blue_points, 2);
                assert_eq!(current.orange_round_score, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn goal_is_reported_every_frame_the_detail_is_present() {
        let mut detector = EventDetector::new();
        let score = LastScore { point_amount: 2, person_scored: "ace".into(), ..LastScore::default() };
        assert!(detect(&mut detector, SessionBuilder::new().last_score(score.clone())).is_empty());

        for _ in 0..2 {
            let events = detect(&mut detector, SessionBuilder::new().last_score(score.clone()));
            assert_eq!(events, vec![Event::GoalScored { score: Arc::new(score.clone()) }]);
        }
    }

    #[test]
    fn possession_and_throw_are_attributed_to_first_holder() {
        let mut detector = EventDetector::new();
        let roster = || SessionBuilder::new().player(0, "a", 1).player(1, "b", 2);
        detect(&mut detector, roster());

        let events = detect(&mut detector, roster().possession(1));
        assert_eq!(events, vec![Event::PossessionChanged { previous: None, current: Some(1) }]);

        let throw = LastThrow { total_speed: 11.5, ..LastThrow::default() };
        let events = detect(&mut detector, roster().possession(1).last_throw(throw.clone()));
        assert_eq!(events, vec![Event::DiscThrown { slot: 1, throw: Arc::new(throw) }]);

        let events = detect(&mut detector, roster());
        assert_eq!(events, vec![Event::PossessionChanged { previous: Some(1), current: None }]);
    }

    #[test]
    fn events_follow_documented_order() {
        let mut detector = EventDetector::new();
        detect(&mut detector, SessionBuilder::new().player(0, "a", 1).player(5, "gone", 3));

        let events = detect(
            &mut detector,
            SessionBuilder::new()
                .player(0, "a", 1)
                .stat(0, StatKind::Passes, 1)
                .player(4, "new", 7)
                .possession(0)
                .blue_points(3),
        );
        let kinds: Vec<&str> = events
            .iter()
            .map(|event| match event {
                Event::PlayerJoined { .. } => "joined",
                Event::PlayerLeft { .. } => "left",
                Event::ScoreboardUpdated { .. } => "scoreboard",
                Event::PossessionChanged { .. } => "possession",
                Event::StatIncremented { .. } => "stat",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, ["joined", "left", "scoreboard", "possession", "stat"]);
    }

    #[test]
    fn spectators_are_classified_by_jersey() {
        let mut detector = EventDetector::new();
        detect(&mut detector, SessionBuilder::new());
        let events = detect(&mut detector, SessionBuilder::new().player(7, "watcher", -1));
        assert!(matches!(events[0], Event::PlayerJoined { role: Role::Spectator, .. }));
    }

    #[test]
    fn custom_classifier_is_used() {
        struct AlwaysOrange;
        impl RoleClassifier for AlwaysOrange {
            fn classify(&self, _player: &Player) -> Role {
                Role::Orange
            }
        }

        let mut detector = EventDetector::with_classifier(AlwaysOrange);
        detect(&mut detector, SessionBuilder::new());
        let events = detect(&mut detector, SessionBuilder::new().player(0, "a", 1));
        assert!(matches!(events[0], Event::PlayerJoined { role: Role::Orange, .. }));
    }

    #[test]
    fn reset_forgets_baseline() {
        let mut detector = EventDetector::new();
        detect(&mut detector, SessionBuilder::new().player(0, "a", 1));
        detector.reset();
        assert!(!detector.has_baseline());

        let events = detect(&mut detector, SessionBuilder::new().player(0, "a", 1).blue_points(2));
        assert!(matches!(events[..], [Event::PlayerJoined { slot: 0, .. }]));
    }
}
