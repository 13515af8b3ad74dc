mod common;

use common::{paired_room, test_pool, user};
use soulroom::{
    db,
    feed::{ChangeKind, FeedFilter, Table},
    pairing,
    rooms::{self, PlantStage, RoomError, ThoughtSource, Vitals, MAX_THOUGHT_CHARS, TICK_SECS},
};
use uuid::Uuid;

#[tokio::test]
async fn pending_room_is_not_open_yet() {
    let pool = test_pool().await;
    let alice = user(&pool, "alice", "Alice").await;
    let room = pairing::create_room(&pool, &alice).await.unwrap();

    let err = rooms::membership(&pool, room.id, &alice).await.unwrap_err();
    assert!(matches!(err, RoomError::RoomNotActive));
}

#[tokio::test]
async fn strangers_are_kept_out() {
    let paired = paired_room().await;
    let carol = user(&paired.pool, "carol", "Carol").await;

    let err = rooms::membership(&paired.pool, paired.room.id, &carol).await.unwrap_err();
    assert!(matches!(err, RoomError::NotRoomMember));

    let err = rooms::membership(&paired.pool, Uuid::now_v7(), &carol).await.unwrap_err();
    assert!(matches!(err, RoomError::RoomNotFound));
}

#[tokio::test]
async fn members_know_who_their_partner_is() {
    let paired = paired_room().await;
    assert_eq!(paired.alice.partner_id(), "bob");
    assert_eq!(paired.bob.partner_id(), "alice");
}

#[tokio::test]
async fn chat_messages_come_back_in_order_and_hit_the_feed() {
    let paired = paired_room().await;
    let mut sub = paired.feed.subscribe(paired.room.id, FeedFilter::all());

    rooms::send_message(&paired.pool, &paired.feed, &paired.alice, "hello *you*").await.unwrap();
    rooms::send_message(&paired.pool, &paired.feed, &paired.bob, "  hi  ").await.unwrap();
    rooms::send_message(&paired.pool, &paired.feed, &paired.alice, "third").await.unwrap();

    let messages = rooms::list_messages(&paired.pool, &paired.bob).await.unwrap();
    let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["hello *you*", "hi", "third"]);
    assert_eq!(messages[0].content_html, "<p>hello <em>you</em></p>\n");
    assert_eq!(messages[1].user_id, "bob");

    let event = sub.next().await.unwrap();
    assert_eq!((event.table, event.kind), (Table::Messages, ChangeKind::Insert));
    assert_eq!(event.row["content"], "hello *you*");
}

#[tokio::test]
async fn blank_messages_are_refused() {
    let paired = paired_room().await;
    let err = rooms::send_message(&paired.pool, &paired.feed, &paired.alice, " \n ").await.unwrap_err();
    assert!(matches!(err, RoomError::EmptyContent));
    assert!(rooms::list_messages(&paired.pool, &paired.alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn reactions_update_the_message() {
    let paired = paired_room().await;
    let message = rooms::send_message(&paired.pool, &paired.feed, &paired.alice, "hey").await.unwrap();

    let mut sub = paired.feed.subscribe(paired.room.id, FeedFilter::all());
    let reacted = rooms::react(&paired.pool, &paired.feed, &paired.bob, message.id, "❤️").await.unwrap();
    assert_eq!(reacted.reaction.as_deref(), Some("❤️"));

    let event = sub.next().await.unwrap();
    assert_eq!(event.kind, ChangeKind::Update);
    assert_eq!(event.row["reaction"], "❤️");

    let err = rooms::react(&paired.pool, &paired.feed, &paired.bob, Uuid::now_v7(), "😊").await.unwrap_err();
    assert!(matches!(err, RoomError::MessageNotFound));
}

#[tokio::test]
async fn reactions_from_another_room_do_not_apply() {
    let first = paired_room().await;
    let message = rooms::send_message(&first.pool, &first.feed, &first.alice, "ours").await.unwrap();

    // a second pair in the same database
    let dave = user(&first.pool, "dave", "Dave").await;
    let erin = user(&first.pool, "erin", "Erin").await;
    let room = pairing::create_room(&first.pool, &dave).await.unwrap();
    pairing::join_room(&first.pool, &first.feed, &erin, &room.room_code).await.unwrap();
    let dave = rooms::membership(&first.pool, room.id, &dave).await.unwrap();

    let err = rooms::react(&first.pool, &first.feed, &dave, message.id, "😊").await.unwrap_err();
    assert!(matches!(err, RoomError::MessageNotFound));
}

#[tokio::test]
async fn thoughts_stay_anonymous_until_revealed() {
    let paired = paired_room().await;
    rooms::share_thought(&paired.pool, &paired.feed, &paired.alice, "grateful for you").await.unwrap();
    rooms::share_thought(&paired.pool, &paired.feed, &paired.bob, "me too").await.unwrap();

    let hidden = rooms::list_thoughts(&paired.pool, &paired.alice, false).await.unwrap();
    assert_eq!(hidden.len(), 2);
    assert!(hidden.iter().all(|t| t.source.is_none()));
    let json = serde_json::to_value(&hidden).unwrap();
    assert!(json[0].get("source").is_none());

    let revealed = rooms::list_thoughts(&paired.pool, &paired.alice, true).await.unwrap();
    let sources: Vec<_> = revealed.iter().map(|t| t.source).collect();
    assert_eq!(sources, [Some(ThoughtSource::You), Some(ThoughtSource::Partner)]);

    let from_bob = rooms::list_thoughts(&paired.pool, &paired.bob, true).await.unwrap();
    assert_eq!(from_bob[0].source, Some(ThoughtSource::Partner));
}

#[tokio::test]
async fn thought_length_is_bounded() {
    let paired = paired_room().await;

    let err = rooms::share_thought(&paired.pool, &paired.feed, &paired.alice, "   ").await.unwrap_err();
    assert!(matches!(err, RoomError::EmptyContent));

    let long = "ä".repeat(MAX_THOUGHT_CHARS + 1);
    let err = rooms::share_thought(&paired.pool, &paired.feed, &paired.alice, &long).await.unwrap_err();
    assert!(matches!(err, RoomError::TooLong { max: MAX_THOUGHT_CHARS }));

    let exact = "ä".repeat(MAX_THOUGHT_CHARS);
    rooms::share_thought(&paired.pool, &paired.feed, &paired.alice, &exact).await.unwrap();
}

#[tokio::test]
async fn thought_events_carry_no_author() {
    let paired = paired_room().await;
    let mut sub = paired.feed.subscribe(paired.room.id, FeedFilter::all());
    rooms::share_thought(&paired.pool, &paired.feed, &paired.bob, "secret").await.unwrap();

    let event = sub.next().await.unwrap();
    assert_eq!(event.table, Table::Thoughts);
    assert!(!event.row.to_string().contains("bob"));
}

#[tokio::test]
async fn plant_starts_as_a_seedling() {
    let paired = paired_room().await;
    let now = db::now();

    let state = rooms::plant_state(&paired.pool, &paired.alice, now).await.unwrap();
    assert_eq!(state.vitals, Vitals::SEEDLING);
    assert_eq!(state.stage, PlantStage::Healthy);
    assert!(!state.you_watered_today);
    assert!(!state.partner_watered_today);
    assert_eq!(state.last_watered_at, None);
}

#[tokio::test]
async fn plant_dries_out_over_time() {
    let paired = paired_room().await;
    let start = db::now();
    rooms::plant_state(&paired.pool, &paired.alice, start).await.unwrap();

    // ten ticks and a bit; the remainder carries over
    let later = start + 10 * TICK_SECS + 7;
    let state = rooms::plant_state(&paired.pool, &paired.bob, later).await.unwrap();
    assert_eq!(state.vitals.water_level, 55.0);

    let again = rooms::plant_state(&paired.pool, &paired.alice, later).await.unwrap();
    assert_eq!(again.vitals, state.vitals);

    let state = rooms::plant_state(&paired.pool, &paired.alice, start + 11 * TICK_SECS).await.unwrap();
    assert_eq!(state.vitals.water_level, 54.5);
}

#[tokio::test]
async fn each_partner_waters_once_a_day() {
    let paired = paired_room().await;
    let now = db::now();

    let state = rooms::water(&paired.pool, &paired.feed, &paired.alice, now).await.unwrap();
    assert_eq!(state.vitals.water_level, 85.0);
    assert!(state.you_watered_today);
    assert!(!state.partner_watered_today);
    assert_eq!(state.last_watered_at, Some(now));

    let err = rooms::water(&paired.pool, &paired.feed, &paired.alice, now).await.unwrap_err();
    assert!(matches!(err, RoomError::AlreadyWateredToday));

    let state = rooms::water(&paired.pool, &paired.feed, &paired.bob, now).await.unwrap();
    assert_eq!(state.vitals.water_level, 100.0);
    assert!(state.you_watered_today);
    assert!(state.partner_watered_today);

    let tomorrow = now + 86_400;
    let state = rooms::plant_state(&paired.pool, &paired.alice, tomorrow).await.unwrap();
    assert!(!state.you_watered_today);
    rooms::water(&paired.pool, &paired.feed, &paired.alice, tomorrow).await.unwrap();
}

#[tokio::test]
async fn candle_is_lit_until_blown_out() {
    let paired = paired_room().await;

    let candle = rooms::candle(&paired.pool, &paired.alice).await.unwrap();
    assert!(candle.is_lit);
    assert_eq!(candle.changed_by, None);

    let mut sub = paired.feed.subscribe(paired.room.id, FeedFilter::updates_to(Table::Candles));
    let out = rooms::set_candle(&paired.pool, &paired.feed, &paired.bob, false).await.unwrap();
    assert!(!out.is_lit);
    assert_eq!(out.changed_by.as_deref(), Some("bob"));

    let event = sub.next().await.unwrap();
    assert_eq!(event.row["is_lit"], false);

    let seen_by_alice = rooms::candle(&paired.pool, &paired.alice).await.unwrap();
    assert_eq!(seen_by_alice, out);
}
