//! Cross-platform player identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::codec::{FieldStream, Streamable};
use crate::{CaptureError, Result};

/// Platform an account belongs to.
///
/// Codes outside the known set are preserved as-is so they survive a decode
/// and re-encode untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PlatformCode(pub u64);

impl PlatformCode {
    pub const UNKNOWN: Self = Self(0);
    pub const STEAM: Self = Self(1);
    pub const PLAYSTATION: Self = Self(2);
    pub const XBOX: Self = Self(3);
    pub const OCULUS_ORG: Self = Self(4);
    pub const OCULUS: Self = Self(5);
    pub const BOT: Self = Self(6);
    pub const DEMO: Self = Self(7);
    pub const TENCENT: Self = Self(8);

    const TOKENS: [(&'static str, PlatformCode); 9] = [
        ("UNK", Self::UNKNOWN),
        ("STM", Self::STEAM),
        ("PSN", Self::PLAYSTATION),
        ("XBX", Self::XBOX),
        ("OVR-ORG", Self::OCULUS_ORG),
        ("OVR", Self::OCULUS),
        ("BOT", Self::BOT),
        ("DMO", Self::DEMO),
        ("TEN", Self::TENCENT),
    ];

    /// Canonical token, `UNK` for codes outside the known set.
    pub fn token(self) -> &'static str {
        Self::TOKENS.iter().find(|(_, code)| *code == self).map_or("UNK", |(token, _)| token)
    }

    /// Look up a platform by token. Accepts the historical `OVR_ORG` spelling.
    pub fn from_token(token: &str) -> Option<Self> {
        if token == "OVR_ORG" {
            return Some(Self::OCULUS_ORG);
        }
        Self::TOKENS.iter().find(|(known, _)| *known == token).map(|(_, code)| *code)
    }

    pub fn is_known(self) -> bool {
        Self::TOKENS.iter().any(|(_, code)| *code == self)
    }
}

/// Cross-platform identifier: platform code plus account id.
///
/// The canonical text form is `<PLATFORM>-<account id>`, for example `STM-1`.
/// The all-zero identifier renders as the empty string.
///
/// ```rust
/// use arenacap::types::{PlatformCode, Xpid};
///
/// let id: Xpid = "OVR_ORG-3963667097037078".parse()?;
/// assert_eq!(id, Xpid::new(PlatformCode::OCULUS_ORG, 3963667097037078));
/// assert_eq!(id.to_string(), "OVR-ORG-3963667097037078");
/// # Ok::<(), arenacap::CaptureError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Xpid {
    pub platform: PlatformCode,
    pub account_id: u64,
}

impl Xpid {
    pub const NIL: Self = Self { platform: PlatformCode::UNKNOWN, account_id: 0 };

    pub const fn new(platform: PlatformCode, account_id: u64) -> Self {
        Self { platform, account_id }
    }

    /// True only when both the platform code and the account id are zero.
    pub fn is_nil(&self) -> bool {
        self.platform.0 == 0 && self.account_id == 0
    }

    /// Version 5 UUID over the canonical text form, in the OID namespace.
    ///
    /// Identifiers with either field zero derive the nil UUID.
    pub fn uuid(&self) -> Uuid {
        if self.platform.0 == 0 || self.account_id == 0 {
            return Uuid::nil();
        }
        Uuid::new_v5(&Uuid::NAMESPACE_OID, self.to_string().as_bytes())
    }
}

impl fmt::Display for Xpid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            return Ok(());
        }
        write!(f, "{}-{}", self.platform.token(), self.account_id)
    }
}

impl FromStr for Xpid {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |details: &str| CaptureError::Identifier {
            input: s.to_string(),
            details: details.to_string(),
        };

        let (token, account) = s.rsplit_once('-').ok_or_else(|| invalid("missing '-' separator"))?;
        let platform = PlatformCode::from_token(token)
            .ok_or_else(|| invalid("unknown platform token"))?;
        let account_id = account.parse::<u64>().map_err(|_| invalid("account id is not a u64"))?;

        Ok(Self { platform, account_id })
    }
}

impl Serialize for Xpid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Xpid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        if text.is_empty() {
            return Ok(Self::NIL);
        }
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl Streamable for Xpid {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.number(&mut self.platform.0)?;
        s.number(&mut self.account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use proptest::prelude::*;

    #[test]
    fn parses_canonical_forms() {
        assert_eq!("STM-1".parse::<Xpid>().unwrap(), Xpid::new(PlatformCode::STEAM, 1));
        assert_eq!("UNK-1".parse::<Xpid>().unwrap(), Xpid::new(PlatformCode::UNKNOWN, 1));
        let expected = Xpid::new(PlatformCode::OCULUS_ORG, 3963667097037078);
        assert_eq!("OVR_ORG-3963667097037078".parse::<Xpid>().unwrap(), expected);
        assert_eq!("OVR-ORG-3963667097037078".parse::<Xpid>().unwrap(), expected);
    }

    #[test]
    fn rejects_malformed_text() {
        for input in ["", "STM", "STM-", "ABC-1", "STM-x", "STM--1"] {
            assert!(input.parse::<Xpid>().is_err(), "{input:?} should not parse");
        }
    }

    #[test]
    fn nil_requires_both_fields_zero() {
        assert!(Xpid::new(PlatformCode(0), 0).is_nil());
        assert!(!Xpid::new(PlatformCode(1), 0).is_nil());
        assert!(!Xpid::new(PlatformCode(0), 1).is_nil());
    }

    #[test]
    fn text_form_edge_cases() {
        assert_eq!(Xpid::NIL.to_string(), "");
        assert_eq!(Xpid::new(PlatformCode(0), 1).to_string(), "UNK-1");
        assert_eq!(Xpid::new(PlatformCode(1), 0).to_string(), "STM-0");
        assert_eq!(Xpid::new(PlatformCode(99), 5).to_string(), "UNK-5");
    }

    #[test]
    fn derived_uuid_is_stable() {
        let id = Xpid::new(PlatformCode::STEAM, 1);
        assert_eq!(id.uuid().to_string(), "496d8944-6159-5c53-bdc8-1cab22f9d28d");
        assert!(Xpid::new(PlatformCode::STEAM, 0).uuid().is_nil());
        assert!(Xpid::new(PlatformCode::UNKNOWN, 1).uuid().is_nil());
    }

    #[test]
    fn serde_uses_text_form() {
        let id = Xpid::new(PlatformCode::DEMO, 42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"DMO-42\"");
        assert_eq!(serde_json::from_str::<Xpid>(&json).unwrap(), id);
        assert_eq!(serde_json::from_str::<Xpid>("\"\"").unwrap(), Xpid::NIL);
    }

    #[test]
    fn wire_form_is_two_little_endian_words() {
        let mut id = Xpid::new(PlatformCode::XBOX, 0x0102);
        let bytes = codec::encode(&mut id).unwrap();
        assert_eq!(bytes, [3, 0, 0, 0, 0, 0, 0, 0, 0x02, 0x01, 0, 0, 0, 0, 0, 0]);
    }

    proptest! {
        #[test]
        fn known_platforms_round_trip_through_text(code in 1u64..=8, account in 1u64..=u64::MAX) {
            let id = Xpid::new(PlatformCode(code), account);
            let parsed: Xpid = id.to_string().parse().unwrap();
            prop_assert_eq!(parsed, id);
        }

        #[test]
        fn uuid_depends_only_on_fields(code in 1u64..=8, account in 1u64..=u64::MAX) {
            let a = Xpid::new(PlatformCode(code), account);
            let b = Xpid::new(PlatformCode(code), account);
            prop_assert_eq!(a.uuid(), b.uuid());
            prop_assert!(!a.uuid().is_nil());
        }
    }
}
