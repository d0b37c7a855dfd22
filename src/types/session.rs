//! Session and skeletal pose payloads as published by the game's local API.
//!
//! Only the fields the event detector and tooling need are modelled; unknown
//! fields are ignored on decode. Field names follow the game's snake_case JSON.

use serde::{Deserialize, Serialize};

/// Full arena state for one poll of the session endpoint.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Session {
    #[serde(rename = "sessionid")]
    pub session_id: String,
    pub game_status: String,
    pub game_clock_display: String,
    pub game_clock: f64,
    pub match_type: String,
    pub map_name: String,
    pub private_match: bool,
    pub client_name: String,
    pub blue_points: i32,
    pub orange_points: i32,
    pub blue_round_score: i32,
    pub orange_round_score: i32,
    pub total_round_count: i32,
    pub teams: Vec<Team>,
    pub last_score: Option<LastScore>,
    pub last_throw: Option<LastThrow>,
    pub err_code: i32,
}

impl Session {
    /// All players across all teams, in team then roster order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.teams.iter().flat_map(|team| team.players.iter())
    }

    pub fn scoreboard(&self) -> Scoreboard {
        Scoreboard {
            blue_points: self.blue_points,
            orange_points: self.orange_points,
            blue_round_score: self.blue_round_score,
            orange_round_score: self.orange_round_score,
        }
    }

    /// Slot of the first player holding the disc.
    pub fn possession_holder(&self) -> Option<i32> {
        self.players().find(|player| player.possession).map(|player| player.slot)
    }

    /// Score detail, if present and not all-default.
    pub fn score_detail(&self) -> Option<&LastScore> {
        self.last_score.as_ref().filter(|score| **score != LastScore::default())
    }

    /// Throw detail, if present and not all-default.
    pub fn throw_detail(&self) -> Option<&LastThrow> {
        self.last_throw.as_ref().filter(|throw| **throw != LastThrow::default())
    }
}

#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Team {
    pub team: String,
    pub possession: bool,
    pub players: Vec<Player>,
    pub stats: Option<PlayerStats>,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Player {
    pub name: String,
    /// Arena slot, stable for the lifetime of a connection.
    #[serde(rename = "playerid")]
    pub slot: i32,
    #[serde(rename = "userid")]
    pub user_id: u64,
    /// Jersey number; `-1` for spectators.
    pub number: i32,
    pub level: i32,
    pub possession: bool,
    pub stunned: bool,
    pub ping: i32,
    pub stats: PlayerStats,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerStats {
    pub possession_time: f64,
    pub points: u32,
    pub saves: u32,
    pub goals: u32,
    pub stuns: u32,
    pub passes: u32,
    pub catches: u32,
    pub steals: u32,
    pub blocks: u32,
    pub interceptions: u32,
    pub assists: u32,
    pub shots_taken: u32,
}

/// The four score-like scalars compared between frames.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scoreboard {
    pub blue_points: i32,
    pub orange_points: i32,
    pub blue_round_score: i32,
    pub orange_round_score: i32,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LastScore {
    pub disc_speed: f64,
    pub team: String,
    pub goal_type: String,
    pub point_amount: i32,
    pub distance_thrown: f64,
    pub person_scored: String,
    pub assist_scored: String,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LastThrow {
    pub arm_speed: f64,
    pub total_speed: f64,
    pub off_axis_spin_deg: f64,
    pub wrist_throw_penalty: f64,
    pub rot_per_sec: f64,
    pub pot_speed_from_rot: f64,
    pub speed_from_arm: f64,
    pub speed_from_movement: f64,
    pub speed_from_wrist: f64,
    pub wrist_align_to_throw_deg: f64,
    pub throw_align_to_movement_deg: f64,
    pub off_axis_penalty: f64,
    pub throw_move_penalty: f64,
}

/// Per-player skeletal pose data from the bones endpoint.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Bones {
    pub user_bones: Vec<UserBones>,
    pub err_code: i32,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserBones {
    /// Bone translations, three floats per bone.
    pub bone_t: Vec<f32>,
    /// Bone orientations, four floats per bone.
    pub bone_o: Vec<f32>,
}
