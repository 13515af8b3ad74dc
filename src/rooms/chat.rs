use axum::{debug_handler, extract::{Path, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqlitePool};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    db::{self, parse_uuid},
    feed::{self, Feed, FeedEvent, Table},
    AppState,
};

use super::{member_from_session, Membership, RoomError};

pub const MAX_REACTION_CHARS: usize = 8;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: String,
    pub content: String,
    pub content_html: String,
    pub reaction: Option<String>,
    pub created_at: i64,
}

impl FromRow<'_, SqliteRow> for Message {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let content: String = row.try_get("content")?;
        Ok(Message {
            id: parse_uuid(row.try_get("id")?)?,
            room_id: parse_uuid(row.try_get("room_id")?)?,
            user_id: row.try_get("user_id")?,
            content_html: render_markdown(&content),
            content,
            reaction: row.try_get("reaction")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

const MESSAGE_COLUMNS: &str = "id,room_id,user_id,content,reaction,created_at";

/// Markdown to HTML. Raw HTML in the source is shown as text.
pub fn render_markdown(content: &str) -> String {
    use pulldown_cmark::{Event, Parser};

    let parser = Parser::new(content).map(|event| match event {
        Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
        _ => event,
    });

    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    html_output
}

pub async fn send_message(
    db_pool: &SqlitePool,
    feed: &Feed,
    member: &Membership,
    content: &str,
) -> Result<Message, RoomError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(RoomError::EmptyContent);
    }

    let message = Message {
        id: Uuid::now_v7(),
        room_id: member.room_id(),
        user_id: member.user.id.clone(),
        content: content.to_owned(),
        content_html: render_markdown(content),
        reaction: None,
        created_at: db::now(),
    };

    sqlx::query(&format!("INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?,?,?,?,NULL,?)"))
        .bind(message.id.to_string())
        .bind(message.room_id.to_string())
        .bind(&message.user_id)
        .bind(&message.content)
        .bind(message.created_at)
        .execute(db_pool)
        .await?;

    feed.publish(FeedEvent::insert(message.room_id, Table::Messages, feed::to_row(&message)));
    Ok(message)
}

/// Oldest first. UUIDv7 ids break ties within the same second.
pub async fn list_messages(db_pool: &SqlitePool, member: &Membership) -> Result<Vec<Message>, RoomError> {
    Ok(
        sqlx::query_as(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE room_id=? ORDER BY created_at, id"))
            .bind(member.room_id().to_string())
            .fetch_all(db_pool)
            .await?
    )
}

pub async fn react(
    db_pool: &SqlitePool,
    feed: &Feed,
    member: &Membership,
    message_id: Uuid,
    reaction: &str,
) -> Result<Message, RoomError> {
    let reaction = reaction.trim();
    if reaction.is_empty() {
        return Err(RoomError::EmptyContent);
    }
    if reaction.chars().count() > MAX_REACTION_CHARS {
        return Err(RoomError::TooLong { max: MAX_REACTION_CHARS });
    }

    let message: Message = sqlx::query_as(&format!(
            "UPDATE messages SET reaction=? WHERE id=? AND room_id=? RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(reaction)
        .bind(message_id.to_string())
        .bind(member.room_id().to_string())
        .fetch_optional(db_pool)
        .await?
        .ok_or(RoomError::MessageNotFound)?;

    feed.publish(FeedEvent::update(message.room_id, Table::Messages, feed::to_row(&message)));
    Ok(message)
}

#[derive(Deserialize)]
pub(crate) struct SendMessageRequest {
    content: String,
}

#[derive(Deserialize)]
pub(crate) struct ReactionRequest {
    reaction: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn get_messages(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, RoomError> {
    let member = member_from_session(&db_pool, &session, room_id).await?;
    Ok(Json(list_messages(&db_pool, &member).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn post_message(
    State(db_pool): State<SqlitePool>,
    State(feed): State<Feed>,
    session: Session,
    Path(room_id): Path<Uuid>,
    Json(SendMessageRequest { content }): Json<SendMessageRequest>,
) -> Result<Json<Message>, RoomError> {
    let member = member_from_session(&db_pool, &session, room_id).await?;
    Ok(Json(send_message(&db_pool, &feed, &member, &content).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn post_reaction(
    State(db_pool): State<SqlitePool>,
    State(feed): State<Feed>,
    session: Session,
    Path((room_id, message_id)): Path<(Uuid, Uuid)>,
    Json(ReactionRequest { reaction }): Json<ReactionRequest>,
) -> Result<Json<Message>, RoomError> {
    let member = member_from_session(&db_pool, &session, room_id).await?;
    Ok(Json(react(&db_pool, &feed, &member, message_id, &reaction).await?))
}
