//! Game server session messages.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;
use crate::codec::{Compression, FieldStream, Streamable};
use crate::types::Xpid;

/// Default entrant flags sent for every player slot.
pub const DEFAULT_ENTRANT_FLAGS: u64 = 0x0044_BB80_00;

/// Settings document embedded in [`GameServerSessionStart`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(rename = "appid")]
    pub app_id: String,
    /// Game mode symbol.
    #[serde(rename = "gametype")]
    pub mode: i64,
    /// Level symbol.
    pub level: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

/// A player slot reserved in a new session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntrantDescriptor {
    pub unk0: Uuid,
    pub xpid: Xpid,
    pub flags: u64,
}

impl EntrantDescriptor {
    /// Descriptor with a fresh random id and the default flags.
    pub fn new(xpid: Xpid) -> Self {
        Self { unk0: Uuid::new_v4(), xpid, flags: DEFAULT_ENTRANT_FLAGS }
    }
}

impl Streamable for EntrantDescriptor {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.guid(&mut self.unk0)?;
        s.message(&mut self.xpid)?;
        s.number(&mut self.flags)
    }
}

/// Instructs a game server to start a session.
///
/// The entrant count is a `u8` written well before the entrant list, with
/// other fields in between.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameServerSessionStart {
    pub match_id: Uuid,
    pub group_id: Uuid,
    pub player_limit: u8,
    pub lobby_type: u8,
    pub settings: SessionSettings,
    pub entrants: Vec<EntrantDescriptor>,
}

impl Streamable for GameServerSessionStart {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.guid(&mut self.match_id)?;
        s.guid(&mut self.group_id)?;
        s.byte(&mut self.player_limit)?;
        let entrant_count = s.count::<u8>(self.entrants.len())?;
        s.byte(&mut self.lobby_type)?;
        s.padding(1)?;
        s.json(&mut self.settings, Compression::None)?;
        s.items(entrant_count, &mut self.entrants)
    }
}

impl fmt::Display for GameServerSessionStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GameServerSessionStart(session_id={}, player_limit={}, mode={}, level={}, entrants={})",
            self.match_id,
            self.player_limit,
            self.settings.mode,
            self.settings.level,
            self.entrants.len()
        )
    }
}
