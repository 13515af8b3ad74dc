use axum::{debug_handler, extract::State, response::{IntoResponse, Response}, Json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{res, session::CurrentUser, AppResult};

#[debug_handler]
pub(crate) async fn me(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let user = match CurrentUser::from_session(&session).await {
        Ok(user) => user,
        Err(err) => return Ok(err.into_response()),
    };

    let Some(profile) = super::profile_by_user(&db_pool, &user.id).await? else {
        return Ok(res::sorry("profile"));
    };

    Ok(Json(profile).into_response())
}
