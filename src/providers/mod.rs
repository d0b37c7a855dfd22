//! Frame providers: container replay and live payload processing.

pub mod live;
pub mod replay;

pub use live::{LiveProvider, RawPayload};
pub use replay::ReplayProvider;
