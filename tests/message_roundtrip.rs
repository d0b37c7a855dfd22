//! Property tests for protocol messages built on the field stream engine.

use arenacap::codec::{self, Streamable};
use arenacap::messages::{
    EntrantDescriptor, GameServerSessionStart, LobbyPlayerSessionsRequest, LoginSuccess,
    OtherUserProfileSuccess, ProfileFailure, SessionSettings,
};
use arenacap::{PlatformCode, Xpid};
use proptest::prelude::*;
use uuid::Uuid;

fn xpid() -> impl Strategy<Value = Xpid> {
    let account = prop_oneof![Just(0u64), Just(u64::MAX), any::<u64>()];
    let platform = prop_oneof![Just(0u64), 1u64..=8, any::<u64>()];
    (platform, account).prop_map(|(platform, account)| Xpid::new(PlatformCode(platform), account))
}

fn guid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

fn text() -> impl Strategy<Value = String> {
    "[^\\x00]{0,40}"
}

fn round_trip<M: Streamable + Default + Clone + PartialEq + std::fmt::Debug>(message: &M) -> M {
    let bytes = codec::encode(&mut message.clone()).expect("encode");
    codec::decode(&bytes).expect("decode")
}

#[test]
fn boundary_identifiers_survive_the_wire() {
    for xpid in [Xpid::NIL, Xpid::new(PlatformCode::UNKNOWN, u64::MAX), Xpid::new(PlatformCode(u64::MAX), 0)] {
        let message = LoginSuccess { session: Uuid::nil(), xpid };
        assert_eq!(round_trip(&message), message);
    }
}

#[test]
fn session_start_encodes_entrant_count_as_one_byte() {
    let entrant = EntrantDescriptor::new("STM-1".parse().expect("valid xpid"));
    let mut message = GameServerSessionStart {
        match_id: Uuid::from_u128(1),
        group_id: Uuid::from_u128(2),
        player_limit: 8,
        lobby_type: 1,
        settings: SessionSettings { app_id: "1369078409873402".into(), mode: 1, level: 2, features: vec![] },
        entrants: vec![entrant; 3],
    };
    let bytes = codec::encode(&mut message).expect("encode");
    assert_eq!(bytes[32], 8);
    assert_eq!(bytes[33], 3);
    assert_eq!(round_trip(&message), message);
}

proptest! {
    #[test]
    fn profile_failures_round_trip(xpid in xpid(), status in any::<u64>(), message in text()) {
        let failure = ProfileFailure::new(xpid, status, message);
        prop_assert_eq!(round_trip(&failure), failure);
    }

    #[test]
    fn player_session_requests_round_trip(
        login in guid(),
        lobby in guid(),
        xpid in xpid(),
        players in prop::collection::vec(xpid(), 0..12),
    ) {
        let request = LobbyPlayerSessionsRequest { login_session: login, xpid, lobby, platform: 7, players };
        prop_assert_eq!(round_trip(&request), request);
    }

    #[test]
    fn compressed_profiles_round_trip(xpid in xpid(), profile in prop::collection::vec(any::<u8>(), 0..512)) {
        let success = OtherUserProfileSuccess { xpid, profile_json: profile };
        prop_assert_eq!(round_trip(&success), success);
    }

    #[test]
    fn truncated_input_fails_without_touching_target(xpid in xpid(), message in text(), cut in 0usize..16) {
        let mut failure = ProfileFailure::new(xpid, 404, message);
        let bytes = codec::encode(&mut failure).expect("encode");
        let cut = cut.min(bytes.len().saturating_sub(1));

        let mut target = ProfileFailure::new(Xpid::NIL, 1, "untouched");
        prop_assert!(codec::decode_into(&bytes[..cut], &mut target).is_err());
        prop_assert_eq!(target, ProfileFailure::new(Xpid::NIL, 1, "untouched"));
    }
}
