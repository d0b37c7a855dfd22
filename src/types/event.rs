//! Semantic gameplay events derived from consecutive frames.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::session::{LastScore, LastThrow, Scoreboard};
use crate::codec::{Compression, FieldStream, Streamable};
use crate::{CaptureError, Result};

/// Team assignment reported with a join.
///
/// Produced by a [`RoleClassifier`](crate::processor::RoleClassifier); the
/// default classifier infers it from the slot number and is not authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Role {
    #[default]
    Blue,
    Orange,
    Spectator,
}

impl Role {
    fn code(self) -> u8 {
        match self {
            Role::Blue => 0,
            Role::Orange => 1,
            Role::Spectator => 2,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Role::Blue),
            1 => Some(Role::Orange),
            2 => Some(Role::Spectator),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Blue => f.write_str("blue"),
            Role::Orange => f.write_str("orange"),
            Role::Spectator => f.write_str("spectator"),
        }
    }
}

impl Streamable for Role {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        let offset = s.position();
        let mut code = self.code();
        s.byte(&mut code)?;
        if s.is_decoding() {
            *self = Role::from_code(code).ok_or_else(|| {
                CaptureError::wire("role", offset, format!("unknown role code {}", code))
            })?;
        }
        Ok(())
    }
}

/// Per-player counters tracked for increments, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    Saves,
    Stuns,
    Passes,
    Steals,
    Blocks,
    Interceptions,
    Assists,
    ShotsTaken,
}

impl StatKind {
    pub const ALL: [StatKind; 8] = [
        StatKind::Saves,
        StatKind::Stuns,
        StatKind::Passes,
        StatKind::Steals,
        StatKind::Blocks,
        StatKind::Interceptions,
        StatKind::Assists,
        StatKind::ShotsTaken,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StatKind::Saves => "saves",
            StatKind::Stuns => "stuns",
            StatKind::Passes => "passes",
            StatKind::Steals => "steals",
            StatKind::Blocks => "blocks",
            StatKind::Interceptions => "interceptions",
            StatKind::Assists => "assists",
            StatKind::ShotsTaken => "shots_taken",
        }
    }

    pub fn read(self, stats: &super::PlayerStats) -> u32 {
        match self {
            StatKind::Saves => stats.saves,
            StatKind::Stuns => stats.stuns,
            StatKind::Passes => stats.passes,
            StatKind::Steals => stats.steals,
            StatKind::Blocks => stats.blocks,
            StatKind::Interceptions => stats.interceptions,
            StatKind::Assists => stats.assists,
            StatKind::ShotsTaken => stats.shots_taken,
        }
    }
}

/// A discrete change between two consecutive frames.
///
/// Every statistic has its own wire tag, so the set of event kinds stays closed
/// even though increments share one Rust variant. Text and detail payloads are
/// shared, so cloning an event never allocates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    PlayerJoined { slot: i32, name: Arc<str>, user_id: u64, role: Role },
    PlayerLeft { slot: i32, name: Arc<str> },
    ScoreboardUpdated { previous: Scoreboard, current: Scoreboard, game_clock_display: Arc<str> },
    GoalScored { score: Arc<LastScore> },
    PossessionChanged { previous: Option<i32>, current: Option<i32> },
    /// Thrown by the player holding the disc when the throw was recorded.
    DiscThrown { slot: i32, throw: Arc<LastThrow> },
    StatIncremented { slot: i32, stat: StatKind, previous: u32, current: u32 },
}

const TAG_JOINED: u8 = 1;
const TAG_LEFT: u8 = 2;
const TAG_SCOREBOARD: u8 = 3;
const TAG_GOAL: u8 = 4;
const TAG_POSSESSION: u8 = 5;
const TAG_THROWN: u8 = 6;
const TAG_FIRST_STAT: u8 = 7;

impl Event {
    fn tag(&self) -> u8 {
        match self {
            Event::PlayerJoined { .. } => TAG_JOINED,
            Event::PlayerLeft { .. } => TAG_LEFT,
            Event::ScoreboardUpdated { .. } => TAG_SCOREBOARD,
            Event::GoalScored { .. } => TAG_GOAL,
            Event::PossessionChanged { .. } => TAG_POSSESSION,
            Event::DiscThrown { .. } => TAG_THROWN,
            Event::StatIncremented { stat, .. } => {
                let index = StatKind::ALL.iter().position(|kind| kind == stat).unwrap_or(0);
                TAG_FIRST_STAT + index as u8
            }
        }
    }

    fn empty(tag: u8) -> Option<Self> {
        let event = match tag {
            TAG_JOINED => Event::PlayerJoined {
                slot: 0,
                name: Arc::from(""),
                user_id: 0,
                role: Role::default(),
            },
            TAG_LEFT => Event::PlayerLeft { slot: 0, name: Arc::from("") },
            TAG_SCOREBOARD => Event::ScoreboardUpdated {
                previous: Scoreboard::default(),
                current: Scoreboard::default(),
                game_clock_display: Arc::from(""),
            },
            TAG_GOAL => Event::GoalScored { score: Arc::default() },
            TAG_POSSESSION => Event::PossessionChanged { previous: None, current: None },
            TAG_THROWN => Event::DiscThrown { slot: 0, throw: Arc::default() },
            _ => {
                let stat = *StatKind::ALL.get(tag.checked_sub(TAG_FIRST_STAT)? as usize)?;
                Event::StatIncremented { slot: 0, stat, previous: 0, current: 0 }
            }
        };
        Some(event)
    }

    /// Slot of the player the event is about, if any.
    pub fn slot(&self) -> Option<i32> {
        match self {
            Event::PlayerJoined { slot, .. }
            | Event::PlayerLeft { slot, .. }
            | Event::DiscThrown { slot, .. }
            | Event::StatIncremented { slot, .. } => Some(*slot),
            Event::PossessionChanged { current, .. } => *current,
            Event::ScoreboardUpdated { .. } | Event::GoalScored { .. } => None,
        }
    }
}

/// Placeholder decode target; overwritten by the first decoded tag.
impl Default for Event {
    fn default() -> Self {
        Event::PossessionChanged { previous: None, current: None }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::PlayerJoined { slot, name, role, .. } => {
                write!(f, "{} joined slot {} ({})", name, slot, role)
            }
            Event::PlayerLeft { slot, name } => write!(f, "{} left slot {}", name, slot),
            Event::ScoreboardUpdated { current, game_clock_display, .. } => write!(
                f,
                "score {}-{} (rounds {}-{}) at {}",
                current.blue_points,
                current.orange_points,
                current.blue_round_score,
                current.orange_round_score,
                game_clock_display
            ),
            Event::GoalScored { score } => {
                write!(f, "{} scored {} for {}", score.person_scored, score.point_amount, score.team)
            }
            Event::PossessionChanged { previous, current } => {
                write!(f, "possession {:?} -> {:?}", previous, current)
            }
            Event::DiscThrown { slot, throw } => {
                write!(f, "disc thrown by slot {} at {:.2} m/s", slot, throw.total_speed)
            }
            Event::StatIncremented { slot, stat, previous, current } => {
                write!(f, "slot {} {} {} -> {}", slot, stat.name(), previous, current)
            }
        }
    }
}

/// Optional slot carried as `i32`, `-1` meaning none.
fn stream_optional_slot(s: &mut FieldStream<'_>, slot: &mut Option<i32>) -> Result<()> {
    let mut raw = slot.unwrap_or(-1);
    s.number(&mut raw)?;
    if s.is_decoding() {
        *slot = (raw >= 0).then_some(raw);
    }
    Ok(())
}

impl Streamable for Scoreboard {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.number(&mut self.blue_points)?;
        s.number(&mut self.orange_points)?;
        s.number(&mut self.blue_round_score)?;
        s.number(&mut self.orange_round_score)
    }
}

impl Streamable for Event {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        let offset = s.position();
        let mut tag = self.tag();
        s.byte(&mut tag)?;
        if s.is_decoding() {
            *self = Event::empty(tag).ok_or_else(|| {
                CaptureError::wire("event", offset, format!("unknown event tag {}", tag))
            })?;
        }

        match self {
            Event::PlayerJoined { slot, name, user_id, role } => {
                s.number(slot)?;
                s.shared_str(name)?;
                s.number(user_id)?;
                s.message(role)
            }
            Event::PlayerLeft { slot, name } => {
                s.number(slot)?;
                s.shared_str(name)
            }
            Event::ScoreboardUpdated { previous, current, game_clock_display } => {
                s.message(previous)?;
                s.message(current)?;
                s.shared_str(game_clock_display)
            }
            Event::GoalScored { score } => s.shared_json(score, Compression::None),
            Event::PossessionChanged { previous, current } => {
                stream_optional_slot(s, previous)?;
                stream_optional_slot(s, current)
            }
            Event::DiscThrown { slot, throw } => {
                s.number(slot)?;
                s.shared_json(throw, Compression::None)
            }
            Event::StatIncremented { slot, previous, current, .. } => {
                s.number(slot)?;
                s.number(previous)?;
                s.number(current)
            }
        }
    }
}
