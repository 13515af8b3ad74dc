use axum::{debug_handler, extract::State, response::{Html, IntoResponse, Redirect, Response}, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{feed::Feed, include_res, session::{CurrentUser, IdentityError}, AppResult, AppState};

use super::{Paired, PairingError, PairingSession};

#[derive(Debug, Deserialize)]
pub(crate) struct JoinRequest {
    code: String,
}

#[debug_handler]
pub(crate) async fn pairing_page(session: Session) -> AppResult<Response> {
    match CurrentUser::from_session(&session).await {
        Ok(_) => Ok(Html(include_res!(str, "/pages/pair.html")).into_response()),
        Err(IdentityError::NotAuthenticated) => Ok(Redirect::to("/login?return_url=/pair").into_response()),
        Err(IdentityError::Session(err)) => Err(err.into()),
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn join(
    State(db_pool): State<SqlitePool>,
    State(feed): State<Feed>,
    session: Session,
    Json(JoinRequest { code }): Json<JoinRequest>,
) -> Result<Json<Paired>, PairingError> {
    let user = CurrentUser::from_session(&session).await?;

    let mut pairing = PairingSession::new(db_pool, feed, user);
    let paired = pairing.join_room(&code).await?;

    Ok(Json(paired))
}
