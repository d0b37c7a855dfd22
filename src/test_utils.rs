//! Builders for synthetic sessions, frames and legacy captures.
//!
//! Shared by unit tests, integration tests and the benchmarks so that every
//! fixture is generated in code instead of checked in.

#![cfg(any(test, feature = "benchmark"))]

use chrono::{DateTime, Utc};

use crate::legacy::format_timestamp;
use crate::types::{
    Frame, LastScore, LastThrow, Player, PlayerStats, Session, Snapshot, StatKind, Team,
};

/// Milliseconds since the Unix epoch of the first synthetic frame.
pub const BASE_TIMESTAMP_MS: i64 = 1_709_319_600_000;

/// Spacing between synthetic frames, roughly a 60 Hz poll.
pub const FRAME_INTERVAL_MS: i64 = 17;

const BLUE: usize = 0;
const ORANGE: usize = 1;
const SPECTATORS: usize = 2;

/// Fluent builder for [`Session`] payloads.
///
/// Players land on the blue team for even slots, orange for odd slots and
/// spectators for jersey `-1`. User ids are `1000 + slot`.
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    session: Session,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    pub fn new() -> Self {
        let team = |name: &str| Team { team: name.to_string(), ..Team::default() };
        Self {
            session: Session {
                session_id: "7D2C0E5A-43C4-4A4E-9B4C-2D6F5A1B0C11".to_string(),
                game_status: "playing".to_string(),
                game_clock_display: "04:59.00".to_string(),
                game_clock: 299.0,
                match_type: "Echo_Arena".to_string(),
                map_name: "mpl_arena_a".to_string(),
                client_name: "recorder".to_string(),
                total_round_count: 3,
                teams: vec![team("BLUE TEAM"), team("ORANGE TEAM"), team("SPECTATORS")],
                ..Session::default()
            },
        }
    }

    pub fn player(mut self, slot: i32, name: &str, number: i32) -> Self {
        let team = if number == -1 {
            SPECTATORS
        } else if slot.rem_euclid(2) == 0 {
            BLUE
        } else {
            ORANGE
        };
        self.session.teams[team].players.push(Player {
            name: name.to_string(),
            slot,
            user_id: 1000 + slot.unsigned_abs() as u64,
            number,
            level: 30,
            ping: 40,
            ..Player::default()
        });
        self
    }

    /// Set one counter on the player in `slot`. No-op for unknown slots.
    pub fn stat(mut self, slot: i32, stat: StatKind, value: u32) -> Self {
        if let Some(player) = self.player_mut(slot) {
            *stat_field(&mut player.stats, stat) = value;
        }
        self
    }

    /// Give the disc to the player in `slot`.
    pub fn possession(mut self, slot: i32) -> Self {
        if let Some(player) = self.player_mut(slot) {
            player.possession = true;
        }
        self
    }

    pub fn blue_points(mut self, points: i32) -> Self {
        self.session.blue_points = points;
        self
    }

    pub fn orange_points(mut self, points: i32) -> Self {
        self.session.orange_points = points;
        self
    }

    pub fn blue_round_score(mut self, score: i32) -> Self {
        self.session.blue_round_score = score;
        self
    }

    pub fn orange_round_score(mut self, score: i32) -> Self {
        self.session.orange_round_score = score;
        self
    }

    pub fn game_clock(mut self, seconds: f64) -> Self {
        self.session.game_clock = seconds;
        self.session.game_clock_display = format!("{:02}:{:05.2}", (seconds / 60.0) as u32, seconds % 60.0);
        self
    }

    pub fn last_score(mut self, score: LastScore) -> Self {
        self.session.last_score = Some(score);
        self
    }

    pub fn last_throw(mut self, throw: LastThrow) -> Self {
        self.session.last_throw = Some(throw);
        self
    }

    pub fn build(self) -> Session {
        self.session
    }

    pub fn json(&self) -> String {
        serde_json::to_string(&self.session).unwrap_or_default()
    }

    pub fn build_snapshot(self) -> Snapshot<Session> {
        let text = self.json();
        Snapshot::from_text(text.into(), "test session").unwrap_or_default()
    }

    fn player_mut(&mut self, slot: i32) -> Option<&mut Player> {
        self.session.teams.iter_mut().flat_map(|team| team.players.iter_mut()).find(|p| p.slot == slot)
    }
}

fn stat_field(stats: &mut PlayerStats, stat: StatKind) -> &mut u32 {
    match stat {
        StatKind::Saves => &mut stats.saves,
        StatKind::Stuns => &mut stats.stuns,
        StatKind::Passes => &mut stats.passes,
        StatKind::Steals => &mut stats.steals,
        StatKind::Blocks => &mut stats.blocks,
        StatKind::Interceptions => &mut stats.interceptions,
        StatKind::Assists => &mut stats.assists,
        StatKind::ShotsTaken => &mut stats.shots_taken,
    }
}

/// Whole-millisecond timestamp of synthetic frame `index`.
pub fn timestamp_at(index: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(BASE_TIMESTAMP_MS + index as i64 * FRAME_INTERVAL_MS)
        .unwrap_or_default()
}

/// Frame without events or bones at `index`.
pub fn frame_at(index: u64, session: SessionBuilder) -> Frame {
    Frame {
        index,
        timestamp: timestamp_at(index),
        session: session.build_snapshot(),
        bones: None,
        events: Vec::new().into(),
    }
}

/// Bones payload with `players` skeletons of `bones` bones each.
pub fn bones_json(players: usize, bones: usize) -> String {
    let skeleton = |seed: usize| {
        let translations: Vec<String> =
            (0..bones * 3).map(|i| format!("{:.3}", (seed * 31 + i) as f32 * 0.01)).collect();
        let orientations: Vec<String> =
            (0..bones * 4).map(|i| format!("{:.3}", ((seed + i) % 4) as f32 * 0.25)).collect();
        format!(r#"{{"bone_t":[{}],"bone_o":[{}]}}"#, translations.join(","), orientations.join(","))
    };
    let users: Vec<String> = (0..players).map(skeleton).collect();
    format!(r#"{{"user_bones":[{}],"err_code":0}}"#, users.join(","))
}

/// Session text of synthetic frame `index` in a scripted match.
///
/// Points, possession and saves move as the index grows and the payload keeps
/// fields the typed model ignores, so re-emission must be verbatim to match.
pub fn scripted_session_json(index: u64) -> String {
    let slot_count = 4 + (index / 50 % 3) as i32;
    let mut builder = SessionBuilder::new()
        .game_clock(300.0 - index as f64 * 0.017)
        .blue_points((index / 40) as i32)
        .orange_points((index / 65) as i32);
    for slot in 0..slot_count {
        builder = builder.player(slot, &format!("player{slot}"), slot + 10).stat(
            slot,
            StatKind::Saves,
            (index / 30) as u32 + slot as u32,
        );
    }
    builder = builder.possession((index / 20 % slot_count as u64) as i32);
    let body = builder.json();
    // Splice in a field the model does not know about, with its own spacing.
    format!(r#"{{"disc": {{"position": [0.0, 1.5, {}]}}, {}"#, index % 7, &body[1..])
}

/// Legacy capture text with `count` scripted frames.
pub fn legacy_capture(count: u64) -> String {
    (0..count)
        .map(|index| format!("{}\t{}\n", format_timestamp(&timestamp_at(index)), scripted_session_json(index)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bones;

    #[test]
    fn builder_places_players_by_slot_and_jersey() {
        let session = SessionBuilder::new()
            .player(0, "a", 1)
            .player(1, "b", 2)
            .player(9, "watcher", -1)
            .possession(1)
            .build();
        assert_eq!(session.teams[BLUE].players[0].name, "a");
        assert_eq!(session.teams[ORANGE].players[0].user_id, 1001);
        assert_eq!(session.teams[SPECTATORS].players[0].slot, 9);
        assert_eq!(session.possession_holder(), Some(1));
    }

    #[test]
    fn timestamps_are_whole_milliseconds() {
        let ts = timestamp_at(3);
        assert_eq!(ts.timestamp_subsec_nanos() % 1_000_000, 0);
        assert_eq!((ts - timestamp_at(2)).num_milliseconds(), FRAME_INTERVAL_MS);
    }

    #[test]
    fn generated_payloads_parse() {
        let bones: Bones = serde_json::from_str(&bones_json(2, 3)).unwrap();
        assert_eq!(bones.user_bones.len(), 2);
        assert_eq!(bones.user_bones[0].bone_t.len(), 9);

        let session: Session = serde_json::from_str(&scripted_session_json(120)).unwrap();
        assert_eq!(session.blue_points, 3);
        assert_eq!(legacy_capture(5).lines().count(), 5);
    }
}
