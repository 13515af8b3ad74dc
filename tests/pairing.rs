mod common;

use std::{collections::HashSet, time::Duration};

use common::{test_pool, user};
use soulroom::{
    db::{self, RoomStatus},
    feed::{Feed, FeedEvent, Table},
    pairing::{self, PairingError, PairingMode, PairingSession},
    profiles::FALLBACK_DISPLAY_NAME,
};

#[tokio::test]
async fn created_room_is_pending_with_a_six_character_code() {
    let pool = test_pool().await;
    let alice = user(&pool, "alice", "Alice").await;

    let room = pairing::create_room(&pool, &alice).await.unwrap();

    assert_eq!(room.room_code.len(), 6);
    assert_eq!(room.room_code, room.room_code.to_uppercase());
    assert_eq!(room.creator_id, "alice");
    assert_eq!(room.partner_id, None);
    assert_eq!(room.status(), RoomStatus::Pending);

    let stored = db::room_by_id(&pool, room.id).await.unwrap().unwrap();
    assert_eq!(stored, room);
}

#[tokio::test]
async fn room_codes_are_unique() {
    let pool = test_pool().await;
    let alice = user(&pool, "alice", "Alice").await;

    let mut codes = HashSet::new();
    for _ in 0..50 {
        let room = pairing::create_room(&pool, &alice).await.unwrap();
        assert!(codes.insert(room.room_code));
    }
}

#[tokio::test]
async fn both_sides_see_each_others_names() {
    let pool = test_pool().await;
    let feed = Feed::new();
    let alice = user(&pool, "alice", "Alice").await;
    let bob = user(&pool, "bob", "Bob").await;

    let room = pairing::create_room(&pool, &alice).await.unwrap();
    let mut wait = pairing::await_partner(&pool, &feed, &alice, &room);

    let bob_side = pairing::join_room(&pool, &feed, &bob, &room.room_code).await.unwrap();
    assert_eq!(bob_side.room_id, room.id);
    assert_eq!(bob_side.partner_name, "Alice");

    let alice_side = wait.resolve().await.unwrap();
    assert_eq!(alice_side.room_id, room.id);
    assert_eq!(alice_side.partner_name, "Bob");

    let stored = db::room_by_id(&pool, room.id).await.unwrap().unwrap();
    assert!(stored.is_active);
    assert_eq!(stored.partner_id.as_deref(), Some("bob"));
}

#[tokio::test]
async fn wait_does_not_resolve_before_the_room_is_active() {
    let pool = test_pool().await;
    let feed = Feed::new();
    let alice = user(&pool, "alice", "Alice").await;
    let bob = user(&pool, "bob", "Bob").await;

    let room = pairing::create_room(&pool, &alice).await.unwrap();
    let mut wait = pairing::await_partner(&pool, &feed, &alice, &room);

    // an update that still shows the room pending
    feed.publish(FeedEvent::update(room.id, Table::Rooms, serde_json::to_value(&room).unwrap()));
    let early = tokio::time::timeout(Duration::from_millis(50), wait.resolve()).await;
    assert!(early.is_err(), "resolved while the room was still pending");

    pairing::join_room(&pool, &feed, &bob, &room.room_code).await.unwrap();
    let paired = tokio::time::timeout(Duration::from_secs(5), wait.resolve())
        .await
        .expect("partner event delivered")
        .unwrap();
    assert_eq!(paired.partner_name, "Bob");
}

#[tokio::test]
async fn join_before_subscribing_is_not_missed() {
    let pool = test_pool().await;
    let feed = Feed::new();
    let alice = user(&pool, "alice", "Alice").await;
    let bob = user(&pool, "bob", "Bob").await;

    let room = pairing::create_room(&pool, &alice).await.unwrap();
    pairing::join_room(&pool, &feed, &bob, &room.room_code).await.unwrap();

    let mut wait = pairing::await_partner(&pool, &feed, &alice, &room);
    let paired = tokio::time::timeout(Duration::from_secs(5), wait.resolve())
        .await
        .expect("resolved from the stored row")
        .unwrap();
    assert_eq!(paired.partner_name, "Bob");
}

#[tokio::test]
async fn creator_cannot_join_own_room() {
    let pool = test_pool().await;
    let feed = Feed::new();
    let alice = user(&pool, "alice", "Alice").await;
    let room = pairing::create_room(&pool, &alice).await.unwrap();

    let err = pairing::join_room(&pool, &feed, &alice, &room.room_code).await.unwrap_err();
    assert!(matches!(err, PairingError::CannotJoinOwnRoom));

    let stored = db::room_by_id(&pool, room.id).await.unwrap().unwrap();
    assert_eq!(stored, room);
}

#[tokio::test]
async fn full_room_rejects_a_third_person() {
    let pool = test_pool().await;
    let feed = Feed::new();
    let alice = user(&pool, "alice", "Alice").await;
    let bob = user(&pool, "bob", "Bob").await;
    let carol = user(&pool, "carol", "Carol").await;

    let room = pairing::create_room(&pool, &alice).await.unwrap();
    pairing::join_room(&pool, &feed, &bob, &room.room_code).await.unwrap();

    let err = pairing::join_room(&pool, &feed, &carol, &room.room_code).await.unwrap_err();
    assert!(matches!(err, PairingError::RoomFull));

    let stored = db::room_by_id(&pool, room.id).await.unwrap().unwrap();
    assert_eq!(stored.partner_id.as_deref(), Some("bob"));
}

#[tokio::test]
async fn partner_can_re_enter_with_the_code() {
    let pool = test_pool().await;
    let feed = Feed::new();
    let alice = user(&pool, "alice", "Alice").await;
    let bob = user(&pool, "bob", "Bob").await;

    let room = pairing::create_room(&pool, &alice).await.unwrap();
    let first = pairing::join_room(&pool, &feed, &bob, &room.room_code).await.unwrap();
    let again = pairing::join_room(&pool, &feed, &bob, &room.room_code).await.unwrap();
    assert_eq!(first, again);
}

#[tokio::test]
async fn unknown_code_is_not_found_and_writes_nothing() {
    let pool = test_pool().await;
    let feed = Feed::new();
    let alice = user(&pool, "alice", "Alice").await;
    let bob = user(&pool, "bob", "Bob").await;
    let room = pairing::create_room(&pool, &alice).await.unwrap();

    let unknown = if room.room_code == "ZZZZZZ" { "YYYYYY" } else { "ZZZZZZ" };
    for code in [unknown, "", "   ", "ABC", "TOOLONG1"] {
        let err = pairing::join_room(&pool, &feed, &bob, code).await.unwrap_err();
        assert!(matches!(err, PairingError::RoomNotFound), "{code:?} gave {err:?}");
    }

    let stored = db::room_by_id(&pool, room.id).await.unwrap().unwrap();
    assert_eq!(stored, room);
}

#[tokio::test]
async fn codes_match_ignoring_case_and_whitespace() {
    let pool = test_pool().await;
    let feed = Feed::new();
    let alice = user(&pool, "alice", "Alice").await;
    let bob = user(&pool, "bob", "Bob").await;
    let room = pairing::create_room(&pool, &alice).await.unwrap();

    let sloppy = format!("  {}\n", room.room_code.to_lowercase());
    let paired = pairing::join_room(&pool, &feed, &bob, &sloppy).await.unwrap();
    assert_eq!(paired.room_id, room.id);
}

#[tokio::test]
async fn racing_joiners_leave_exactly_one_partner() {
    let pool = test_pool().await;
    let feed = Feed::new();
    let alice = user(&pool, "alice", "Alice").await;
    let bob = user(&pool, "bob", "Bob").await;
    let carol = user(&pool, "carol", "Carol").await;
    let room = pairing::create_room(&pool, &alice).await.unwrap();

    let (bob_result, carol_result) = tokio::join!(
        pairing::join_room(&pool, &feed, &bob, &room.room_code),
        pairing::join_room(&pool, &feed, &carol, &room.room_code),
    );

    let stored = db::room_by_id(&pool, room.id).await.unwrap().unwrap();
    let winner = stored.partner_id.clone().expect("someone joined");
    match (bob_result, carol_result) {
        (Ok(_), Err(PairingError::RoomFull)) => assert_eq!(winner, "bob"),
        (Err(PairingError::RoomFull), Ok(_)) => assert_eq!(winner, "carol"),
        other => panic!("expected exactly one winner, got {other:?}"),
    }
    assert!(stored.is_active);
}

#[tokio::test]
async fn missing_creator_profile_falls_back() {
    let pool = test_pool().await;
    let feed = Feed::new();
    let ghost = soulroom::session::CurrentUser::new("ghost");
    let bob = user(&pool, "bob", "Bob").await;

    let room = pairing::create_room(&pool, &ghost).await.unwrap();
    let paired = pairing::join_room(&pool, &feed, &bob, &room.room_code).await.unwrap();
    assert_eq!(paired.partner_name, FALLBACK_DISPLAY_NAME);
}

#[tokio::test]
async fn cancelled_pairing_leaves_the_room_pending() {
    let pool = test_pool().await;
    let feed = Feed::new();
    let alice = user(&pool, "alice", "Alice").await;

    let mut session = PairingSession::new(pool.clone(), feed.clone(), alice);
    assert_eq!(session.mode(), PairingMode::Choosing);

    let room = session.create_room().await.unwrap();
    assert_eq!(session.mode(), PairingMode::Creating);
    assert!(session.is_waiting_for_partner());
    assert_eq!(session.pending_room(), Some(&room));
    assert_eq!(feed.subscriber_count(room.id), 1);

    session.cancel();
    assert_eq!(session.mode(), PairingMode::Choosing);
    assert!(!session.is_waiting_for_partner());
    assert_eq!(feed.subscriber_count(room.id), 0);

    let stored = db::room_by_id(&pool, room.id).await.unwrap().unwrap();
    assert_eq!(stored.status(), RoomStatus::Pending);
    assert!(matches!(session.wait_for_partner().await, Err(PairingError::NoPendingRoom)));
}

#[tokio::test]
async fn session_resolves_at_most_once() {
    let pool = test_pool().await;
    let feed = Feed::new();
    let alice = user(&pool, "alice", "Alice").await;
    let bob = user(&pool, "bob", "Bob").await;

    let mut creator = PairingSession::new(pool.clone(), feed.clone(), alice);
    let room = creator.create_room().await.unwrap();

    let mut joiner = PairingSession::new(pool.clone(), feed.clone(), bob);
    let joined = joiner.join_room(&room.room_code).await.unwrap();
    assert_eq!(joined.partner_name, "Alice");

    let paired = creator.wait_for_partner().await.unwrap();
    assert_eq!(paired.partner_name, "Bob");
    assert!(!creator.is_waiting_for_partner());
    assert!(matches!(creator.wait_for_partner().await, Err(PairingError::NoPendingRoom)));
}

#[tokio::test]
async fn creating_again_abandons_the_previous_room() {
    let pool = test_pool().await;
    let feed = Feed::new();
    let alice = user(&pool, "alice", "Alice").await;

    let mut session = PairingSession::new(pool.clone(), feed.clone(), alice);
    let first = session.create_room().await.unwrap();
    let second = session.create_room().await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(session.pending_room(), Some(&second));
    assert_eq!(feed.subscriber_count(first.id), 0);
    assert!(db::room_by_id(&pool, first.id).await.unwrap().is_some());
}
