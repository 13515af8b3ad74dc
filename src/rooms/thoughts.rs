use axum::{debug_handler, extract::{Path, Query, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    db::{self, parse_uuid},
    feed::{self, Feed, FeedEvent, Table},
    AppState,
};

use super::{member_from_session, Membership, RoomError};

pub const MAX_THOUGHT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtSource {
    You,
    Partner,
}

/// A thought as one member sees it. `source` is only filled in when sources
/// are revealed.
#[derive(Debug, Clone, Serialize)]
pub struct Thought {
    pub id: Uuid,
    pub text: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ThoughtSource>,
}

pub async fn share_thought(
    db_pool: &SqlitePool,
    feed: &Feed,
    member: &Membership,
    text: &str,
) -> Result<Thought, RoomError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(RoomError::EmptyContent);
    }
    if text.chars().count() > MAX_THOUGHT_CHARS {
        return Err(RoomError::TooLong { max: MAX_THOUGHT_CHARS });
    }

    let thought = Thought {
        id: Uuid::now_v7(),
        text: text.to_owned(),
        created_at: db::now(),
        source: None,
    };

    sqlx::query("INSERT INTO thoughts (id,room_id,author_id,text,created_at) VALUES (?,?,?,?,?)")
        .bind(thought.id.to_string())
        .bind(member.room_id().to_string())
        .bind(&member.user.id)
        .bind(&thought.text)
        .bind(thought.created_at)
        .execute(db_pool)
        .await?;

    feed.publish(FeedEvent::insert(member.room_id(), Table::Thoughts, feed::to_row(&thought)));
    Ok(thought)
}

pub async fn list_thoughts(db_pool: &SqlitePool, member: &Membership, reveal: bool) -> Result<Vec<Thought>, RoomError> {
    let rows: Vec<(String, String, String, i64)> =
        sqlx::query_as("SELECT id,author_id,text,created_at FROM thoughts WHERE room_id=? ORDER BY created_at, id")
            .bind(member.room_id().to_string())
            .fetch_all(db_pool)
            .await?;

    let mut thoughts = Vec::with_capacity(rows.len());
    for (id, author_id, text, created_at) in rows {
        let source = reveal.then(|| {
            if author_id == member.user.id {
                ThoughtSource::You
            } else {
                ThoughtSource::Partner
            }
        });
        thoughts.push(Thought { id: parse_uuid(&id)?, text, created_at, source });
    }

    Ok(thoughts)
}

#[derive(Deserialize)]
pub(crate) struct ThoughtsQuery {
    #[serde(default)]
    reveal: bool,
}

#[derive(Deserialize)]
pub(crate) struct ShareThoughtRequest {
    text: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn get_thoughts(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<Uuid>,
    Query(ThoughtsQuery { reveal }): Query<ThoughtsQuery>,
) -> Result<Json<Vec<Thought>>, RoomError> {
    let member = member_from_session(&db_pool, &session, room_id).await?;
    Ok(Json(list_thoughts(&db_pool, &member, reveal).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn post_thought(
    State(db_pool): State<SqlitePool>,
    State(feed): State<Feed>,
    session: Session,
    Path(room_id): Path<Uuid>,
    Json(ShareThoughtRequest { text }): Json<ShareThoughtRequest>,
) -> Result<Json<Thought>, RoomError> {
    let member = member_from_session(&db_pool, &session, room_id).await?;
    Ok(Json(share_thought(&db_pool, &feed, &member, &text).await?))
}
