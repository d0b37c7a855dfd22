//! Matchmaking and lobby messages.

use std::fmt;

use uuid::Uuid;

use crate::Result;
use crate::codec::{FieldStream, Streamable};
use crate::types::Xpid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LobbyMatchmakerStatusRequest {
    pub unk0: u8,
}

impl Streamable for LobbyMatchmakerStatusRequest {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.byte(&mut self.unk0)
    }
}

impl fmt::Display for LobbyMatchmakerStatusRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LobbyMatchmakerStatusRequest(unk0={})", self.unk0)
    }
}

/// Matchmaker status sent in reply to [`LobbyMatchmakerStatusRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LobbyMatchmakerStatus {
    pub status_code: u32,
}

impl Streamable for LobbyMatchmakerStatus {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.number(&mut self.status_code)
    }
}

impl fmt::Display for LobbyMatchmakerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LobbyMatchmakerStatus(status={})", self.status_code)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LobbyPendingSessionCancel {
    pub session: Uuid,
}

impl Streamable for LobbyPendingSessionCancel {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.guid(&mut self.session)
    }
}

impl fmt::Display for LobbyPendingSessionCancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LobbyPendingSessionCancel(session={})", self.session)
    }
}

/// Client asks the server to resolve the sessions of the listed players.
///
/// The player list is preceded by a `u64` count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LobbyPlayerSessionsRequest {
    pub login_session: Uuid,
    pub xpid: Xpid,
    pub lobby: Uuid,
    /// Platform symbol hash, opaque to this crate.
    pub platform: u64,
    pub players: Vec<Xpid>,
}

impl Streamable for LobbyPlayerSessionsRequest {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.guid(&mut self.login_session)?;
        s.message(&mut self.xpid)?;
        s.guid(&mut self.lobby)?;
        s.number(&mut self.platform)?;
        s.vec::<u64, _>(&mut self.players)
    }
}

impl fmt::Display for LobbyPlayerSessionsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let players: Vec<String> = self.players.iter().map(Xpid::to_string).collect();
        write!(
            f,
            "LobbyPlayerSessionsRequest(login_session_id={}, user_id={}, lobby_id={}, players=[{}])",
            self.login_session,
            self.xpid,
            self.lobby,
            players.join(", ")
        )
    }
}

/// Server removes a player from a lobby, with an HTTP-style status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LobbySmiteEntrant {
    pub xpid: Xpid,
    pub status_code: u64,
    pub message: String,
}

impl Streamable for LobbySmiteEntrant {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.message(&mut self.xpid)?;
        s.number(&mut self.status_code)?;
        s.text(&mut self.message)
    }
}

impl fmt::Display for LobbySmiteEntrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LobbySmiteEntrant(user_id={}, status={}, msg=\"{}\")",
            self.xpid, self.status_code, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::types::PlatformCode;

    #[test]
    fn player_sessions_request_uses_u64_count() {
        let mut message = LobbyPlayerSessionsRequest {
            login_session: Uuid::from_u128(10),
            xpid: Xpid::new(PlatformCode::STEAM, 1),
            lobby: Uuid::from_u128(11),
            platform: 0xdead_beef,
            players: vec![Xpid::new(PlatformCode::BOT, 5), Xpid::new(PlatformCode::DEMO, u64::MAX)],
        };
        let bytes = codec::encode(&mut message).unwrap();
        assert_eq!(bytes.len(), 16 + 16 + 16 + 8 + 8 + 2 * 16);
        assert_eq!(&bytes[56..64], &2u64.to_le_bytes());
        assert_eq!(codec::decode::<LobbyPlayerSessionsRequest>(&bytes).unwrap(), message);
    }

    #[test]
    fn truncated_player_list_fails() {
        let mut message = LobbyPlayerSessionsRequest {
            players: vec![Xpid::new(PlatformCode::STEAM, 3)],
            ..LobbyPlayerSessionsRequest::default()
        };
        let bytes = codec::encode(&mut message).unwrap();
        assert!(codec::decode::<LobbyPlayerSessionsRequest>(&bytes[..bytes.len() - 1]).is_err());
    }
}
