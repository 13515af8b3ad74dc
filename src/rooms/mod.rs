//! The surfaces two paired people share: chat, anonymous thoughts, the plant
//! and the candle. All of them are keyed by room id and only open to the two
//! members of an active room.

mod candle;
mod chat;
mod error;
mod plant;
mod room;
mod thoughts;
mod ws;

use axum::{routing::{get, post}, Router};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{db::{self, Room, RoomStatus}, session::CurrentUser, AppState};

pub use candle::{candle, set_candle, Candle};
pub use chat::{list_messages, react, render_markdown, send_message, Message, MAX_REACTION_CHARS};
pub use error::RoomError;
pub use plant::{plant_state, water, PlantStage, PlantState, Vitals, TICK_SECS};
pub use thoughts::{list_thoughts, share_thought, Thought, ThoughtSource, MAX_THOUGHT_CHARS};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{room_id}", get(room::room_page))
        .route("/{room_id}/state", get(room::room_state))
        .route("/{room_id}/messages", get(chat::get_messages).post(chat::post_message))
        .route("/{room_id}/messages/{message_id}/reaction", post(chat::post_reaction))
        .route("/{room_id}/thoughts", get(thoughts::get_thoughts).post(thoughts::post_thought))
        .route("/{room_id}/plant", get(plant::get_plant))
        .route("/{room_id}/plant/water", post(plant::post_water))
        .route("/{room_id}/candle", get(candle::get_candle).post(candle::post_candle))
        .route("/{room_id}/ws", get(ws::room_ws))
}

/// Proof that `user` is one of the two members of an active `room`.
#[derive(Debug, Clone)]
pub struct Membership {
    pub room: Room,
    pub user: CurrentUser,
}

impl Membership {
    pub fn room_id(&self) -> Uuid {
        self.room.id
    }

    pub fn partner_id(&self) -> &str {
        self.room.other_member(&self.user.id).unwrap_or_default()
    }
}

pub async fn membership(db_pool: &SqlitePool, room_id: Uuid, user: &CurrentUser) -> Result<Membership, RoomError> {
    let room = db::room_by_id(db_pool, room_id)
        .await?
        .ok_or(RoomError::RoomNotFound)?;

    if !room.has_member(&user.id) {
        return Err(RoomError::NotRoomMember);
    }
    if room.status() != RoomStatus::Active {
        return Err(RoomError::RoomNotActive);
    }

    Ok(Membership { room, user: user.clone() })
}

pub(crate) async fn member_from_session(
    db_pool: &SqlitePool,
    session: &tower_sessions::Session,
    room_id: Uuid,
) -> Result<Membership, RoomError> {
    let user = CurrentUser::from_session(session).await?;
    membership(db_pool, room_id, &user).await
}
