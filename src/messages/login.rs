//! Login and profile messages.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;
use crate::codec::{Compression, FieldStream, Streamable};
use crate::types::Xpid;

/// Server accepted a login and assigned a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginSuccess {
    pub session: Uuid,
    pub xpid: Xpid,
}

impl Streamable for LoginSuccess {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.guid(&mut self.session)?;
        s.message(&mut self.xpid)
    }
}

impl fmt::Display for LoginSuccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoginSuccess(session={}, user_id={})", self.session, self.xpid)
    }
}

/// Profile groups the client asks for when loading its own profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileRequestData {
    #[serde(rename = "defaultclientprofileid")]
    pub default_client_profile_id: String,
    #[serde(rename = "defaultserverprofileid")]
    pub default_server_profile_id: String,
    #[serde(rename = "unlocksetids")]
    pub unlock_set_ids: serde_json::Value,
    #[serde(rename = "statgroupids")]
    pub stat_group_ids: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoggedInUserProfileRequest {
    pub session: Uuid,
    pub xpid: Xpid,
    pub request: ProfileRequestData,
}

impl Streamable for LoggedInUserProfileRequest {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.guid(&mut self.session)?;
        s.message(&mut self.xpid)?;
        s.json(&mut self.request, Compression::None)
    }
}

impl fmt::Display for LoggedInUserProfileRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoggedInUserProfileRequest(session={}, user_id={})", self.session, self.xpid)
    }
}

/// A profile operation failed with an HTTP-style status code.
///
/// Shared layout of the logged-in profile, other-user profile and profile
/// update failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFailure {
    pub xpid: Xpid,
    pub status_code: u64,
    pub message: String,
}

impl ProfileFailure {
    pub fn new(xpid: Xpid, status_code: u64, message: impl Into<String>) -> Self {
        Self { xpid, status_code, message: message.into() }
    }
}

impl Streamable for ProfileFailure {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.message(&mut self.xpid)?;
        s.number(&mut self.status_code)?;
        s.text(&mut self.message)
    }
}

impl fmt::Display for ProfileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProfileFailure(user_id={}, status={}, msg=\"{}\")",
            self.xpid, self.status_code, self.message
        )
    }
}

pub type LoggedInUserProfileFailure = ProfileFailure;
pub type OtherUserProfileFailure = ProfileFailure;
pub type UpdateProfileFailure = ProfileFailure;

/// Another player's server profile, carried as zstd-compressed JSON.
///
/// The profile document is kept as raw bytes; its schema belongs to the
/// profile service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtherUserProfileSuccess {
    pub xpid: Xpid,
    pub profile_json: Vec<u8>,
}

impl Streamable for OtherUserProfileSuccess {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.message(&mut self.xpid)?;
        s.blob(&mut self.profile_json, Compression::Zstd)
    }
}

impl fmt::Display for OtherUserProfileSuccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OtherUserProfileSuccess(user_id={}, profile_len={})",
            self.xpid,
            self.profile_json.len()
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserServerProfileUpdateSuccess {
    pub xpid: Xpid,
}

impl Streamable for UserServerProfileUpdateSuccess {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.message(&mut self.xpid)
    }
}

impl fmt::Display for UserServerProfileUpdateSuccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserServerProfileUpdateSuccess(user_id={})", self.xpid)
    }
}

/// Result of reconciling in-app purchases, with the player's balance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileIapResult {
    pub xpid: Xpid,
    pub data: IapData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IapData {
    pub balance: IapBalance,
    #[serde(rename = "transactionid")]
    pub transaction_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IapBalance {
    pub currency: IapCurrency,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IapCurrency {
    #[serde(rename = "echopoints")]
    pub echo_points: IapEchoPoints,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IapEchoPoints {
    #[serde(rename = "val")]
    pub value: i64,
}

impl ReconcileIapResult {
    /// Zero-balance result with transaction id 1.
    pub fn new(xpid: Xpid) -> Self {
        Self { xpid, data: IapData { transaction_id: 1, ..IapData::default() } }
    }
}

impl Streamable for ReconcileIapResult {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.message(&mut self.xpid)?;
        s.json(&mut self.data, Compression::None)
    }
}

impl fmt::Display for ReconcileIapResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReconcileIapResult(user_id={}, echopoints={})",
            self.xpid, self.data.balance.currency.echo_points.value
        )
    }
}
