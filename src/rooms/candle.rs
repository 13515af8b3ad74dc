use axum::{debug_handler, extract::{Path, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    db,
    feed::{self, Feed, FeedEvent, Table},
    AppState,
};

use super::{member_from_session, Membership, RoomError};

/// The session candle. It starts lit; blowing it out marks the session as
/// ending for both members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candle {
    pub room_id: Uuid,
    pub is_lit: bool,
    pub changed_by: Option<String>,
    pub changed_at: i64,
}

pub async fn candle(db_pool: &SqlitePool, member: &Membership) -> Result<Candle, RoomError> {
    sqlx::query("INSERT INTO candles (room_id,is_lit,changed_by,changed_at) VALUES (?,1,NULL,?) ON CONFLICT(room_id) DO NOTHING")
        .bind(member.room_id().to_string())
        .bind(db::now())
        .execute(db_pool)
        .await?;

    let (is_lit, changed_by, changed_at): (bool, Option<String>, i64) =
        sqlx::query_as("SELECT is_lit,changed_by,changed_at FROM candles WHERE room_id=?")
            .bind(member.room_id().to_string())
            .fetch_one(db_pool)
            .await?;

    Ok(Candle { room_id: member.room_id(), is_lit, changed_by, changed_at })
}

pub async fn set_candle(db_pool: &SqlitePool, feed: &Feed, member: &Membership, lit: bool) -> Result<Candle, RoomError> {
    let candle = Candle {
        room_id: member.room_id(),
        is_lit: lit,
        changed_by: Some(member.user.id.clone()),
        changed_at: db::now(),
    };

    sqlx::query("INSERT INTO candles (room_id,is_lit,changed_by,changed_at) VALUES (?,?,?,?) ON CONFLICT(room_id) DO UPDATE SET is_lit=excluded.is_lit, changed_by=excluded.changed_by, changed_at=excluded.changed_at")
        .bind(candle.room_id.to_string())
        .bind(candle.is_lit)
        .bind(&candle.changed_by)
        .bind(candle.changed_at)
        .execute(db_pool)
        .await?;

    tracing::info!(room_id = %candle.room_id, lit, "candle changed");
    feed.publish(FeedEvent::update(candle.room_id, Table::Candles, feed::to_row(&candle)));
    Ok(candle)
}

#[derive(Deserialize)]
pub(crate) struct CandleRequest {
    lit: bool,
}

#[debug_handler(state = AppState)]
pub(crate) async fn get_candle(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<Uuid>,
) -> Result<Json<Candle>, RoomError> {
    let member = member_from_session(&db_pool, &session, room_id).await?;
    Ok(Json(candle(&db_pool, &member).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn post_candle(
    State(db_pool): State<SqlitePool>,
    State(feed): State<Feed>,
    session: Session,
    Path(room_id): Path<Uuid>,
    Json(CandleRequest { lit }): Json<CandleRequest>,
) -> Result<Json<Candle>, RoomError> {
    let member = member_from_session(&db_pool, &session, room_id).await?;
    Ok(Json(set_candle(&db_pool, &feed, &member, lit).await?))
}
