//! Core data model for captures.
//!
//! - [`Xpid`] identifies a player across platforms
//! - [`Session`] and [`Bones`] model the game's JSON payloads
//! - [`Snapshot`] keeps those payloads verbatim next to their decoded form
//! - [`Frame`] and [`CaptureHeader`] are the records stored in a container
//! - [`Event`] is a change detected between two frames

mod event;
mod frame;
mod session;
mod snapshot;
mod xpid;

pub use event::{Event, Role, StatKind};
pub use frame::{CaptureHeader, Frame};
pub use session::{
    Bones, LastScore, LastThrow, Player, PlayerStats, Scoreboard, Session, Team, UserBones,
};
pub use snapshot::Snapshot;
pub use xpid::{PlatformCode, Xpid};
