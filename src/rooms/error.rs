use axum::{http::StatusCode, response::{IntoResponse, Response}};
use thiserror::Error;

use crate::session::IdentityError;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("sign in to enter your room")]
    NotAuthenticated,

    #[error("room not found")]
    RoomNotFound,

    #[error("this room belongs to two other people")]
    NotRoomMember,

    #[error("your partner hasn't joined yet")]
    RoomNotActive,

    #[error("empty thoughts float away, share something from your heart")]
    EmptyContent,

    #[error("that's too long, keep it under {max} characters")]
    TooLong { max: usize },

    #[error("message not found")]
    MessageNotFound,

    #[error("already watered today, wait for tomorrow")]
    AlreadyWateredToday,

    #[error("something went wrong, please try again")]
    Store(#[from] sqlx::Error),

    #[error("session unavailable")]
    Session(#[source] tower_sessions::session::Error),
}

impl From<IdentityError> for RoomError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NotAuthenticated => RoomError::NotAuthenticated,
            IdentityError::Session(err) => RoomError::Session(err),
        }
    }
}

impl RoomError {
    pub fn status(&self) -> StatusCode {
        use RoomError::*;
        match self {
            NotAuthenticated => StatusCode::UNAUTHORIZED,
            RoomNotFound | MessageNotFound => StatusCode::NOT_FOUND,
            NotRoomMember => StatusCode::FORBIDDEN,
            RoomNotActive | AlreadyWateredToday => StatusCode::CONFLICT,
            EmptyContent | TooLong { .. } => StatusCode::BAD_REQUEST,
            Store(_) | Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "room request failed");
        }
        crate::error_body(status, self.to_string())
    }
}
