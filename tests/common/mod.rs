#![allow(dead_code)]

use soulroom::{
    auth::Clients,
    db::{self, Room},
    feed::Feed,
    pairing,
    profiles,
    rooms::{self, Membership},
    session::CurrentUser,
    AppState,
};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

/// A fresh in-memory database with the schema applied. One connection, kept
/// alive for the whole test, so every query sees the same database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    db::migrate(&pool).await.expect("apply migrations");
    pool
}

pub async fn user(pool: &SqlitePool, id: &str, display_name: &str) -> CurrentUser {
    profiles::upsert_profile(pool, id, display_name)
        .await
        .expect("create profile");
    CurrentUser::new(id)
}

pub fn test_state(pool: SqlitePool) -> AppState {
    let clients = Clients::from_json(
        serde_json::json!({"firebase": {"apikey": "test"}}),
        "http://localhost:8080",
    )
    .expect("test clients");
    AppState { db_pool: pool, clients, feed: Feed::new() }
}

/// Two users who already paired: alice created the room, bob joined it.
pub struct PairedRoom {
    pub pool: SqlitePool,
    pub feed: Feed,
    pub room: Room,
    pub alice: Membership,
    pub bob: Membership,
}

pub async fn paired_room() -> PairedRoom {
    let pool = test_pool().await;
    let feed = Feed::new();
    let alice = user(&pool, "alice", "Alice").await;
    let bob = user(&pool, "bob", "Bob").await;

    let room = pairing::create_room(&pool, &alice).await.expect("create room");
    pairing::join_room(&pool, &feed, &bob, &room.room_code)
        .await
        .expect("join room");

    let room = db::room_by_id(&pool, room.id).await.unwrap().unwrap();
    let alice = rooms::membership(&pool, room.id, &alice).await.expect("alice is a member");
    let bob = rooms::membership(&pool, room.id, &bob).await.expect("bob is a member");

    PairedRoom { pool, feed, room, alice, bob }
}
