//! Protocol messages exchanged between game clients and servers.
//!
//! Each message is plain data plus one [`Streamable`] implementation listing its
//! fields in wire order. Structured-text fields declare their compression mode
//! in that implementation; it never depends on content.

mod gameserver;
mod lobby;
mod login;

pub use gameserver::{DEFAULT_ENTRANT_FLAGS, EntrantDescriptor, GameServerSessionStart, SessionSettings};
pub use lobby::{
    LobbyMatchmakerStatus, LobbyMatchmakerStatusRequest, LobbyPendingSessionCancel,
    LobbyPlayerSessionsRequest, LobbySmiteEntrant,
};
pub use login::{
    IapBalance, IapCurrency, IapData, IapEchoPoints, LoggedInUserProfileFailure,
    LoggedInUserProfileRequest, LoginSuccess, OtherUserProfileFailure, OtherUserProfileSuccess,
    ProfileFailure, ProfileRequestData, ReconcileIapResult, UpdateProfileFailure,
    UserServerProfileUpdateSuccess,
};

use std::fmt;

use crate::Result;
use crate::codec::{FieldStream, Streamable};

/// A structurally empty message: a single padding byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyMessage;

impl Streamable for EmptyMessage {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.padding(1)
    }
}

impl fmt::Display for EmptyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EmptyMessage")
    }
}

pub type PlayerSessionsLocked = EmptyMessage;
pub type PlayerSessionsUnlocked = EmptyMessage;
pub type TcpConnectionUnrequireEvent = EmptyMessage;
