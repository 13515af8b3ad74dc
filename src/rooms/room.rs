use axum::{debug_handler, extract::{Path, State}, response::{Html, IntoResponse, Redirect, Response}, Json};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{include_res, profiles, res, AppState};

use super::{member_from_session, RoomError};

#[derive(Debug, Serialize)]
pub(crate) struct RoomSummary {
    room_id: Uuid,
    room_code: String,
    partner_name: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn room_page(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<Uuid>,
) -> Result<Response, RoomError> {
    let member = match member_from_session(&db_pool, &session, room_id).await {
        Ok(member) => member,
        Err(RoomError::NotAuthenticated) => {
            return Ok(Redirect::to(&format!("/login?return_url=/r/{room_id}")).into_response());
        }
        Err(RoomError::RoomNotFound | RoomError::NotRoomMember) => return Ok(res::sorry("room")),
        Err(err) => return Err(err),
    };

    let body = include_res!(str, "/pages/room.html")
        .replace("{room_id}", &member.room_id().to_string());

    Ok(Html(body).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn room_state(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<Uuid>,
) -> Result<Json<RoomSummary>, RoomError> {
    let member = member_from_session(&db_pool, &session, room_id).await?;
    let partner_name = profiles::display_name_of(&db_pool, member.partner_id()).await?;

    Ok(Json(RoomSummary {
        room_id: member.room_id(),
        room_code: member.room.room_code,
        partner_name,
    }))
}
