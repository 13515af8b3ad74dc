use axum::{http::StatusCode, response::{IntoResponse, Response}};
use thiserror::Error;

use crate::session::IdentityError;

/// Everything that can stop two people from ending up in the same room.
/// Each one is shown to the user as a transient notification; none is retried.
#[derive(Debug, Error)]
pub enum PairingError {
    #[error("sign in to pair with someone")]
    NotAuthenticated,

    #[error("couldn't reserve a room code, please try again")]
    CodeGenerationFailed,

    #[error("room not found with that code")]
    RoomNotFound,

    #[error("you cannot join your own room")]
    CannotJoinOwnRoom,

    #[error("this room is already full")]
    RoomFull,

    #[error("no room is waiting for a partner")]
    NoPendingRoom,

    #[error("failed to look up the room")]
    StoreReadFailed(#[source] sqlx::Error),

    #[error("failed to save the room")]
    StoreWriteFailed(#[source] sqlx::Error),

    #[error("failed to connect with your partner")]
    ProfileLookupFailed(#[source] sqlx::Error),

    #[error("the room stopped listening before your partner arrived")]
    FeedClosed,

    #[error("session unavailable")]
    Session(#[source] tower_sessions::session::Error),
}

impl From<IdentityError> for PairingError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NotAuthenticated => PairingError::NotAuthenticated,
            IdentityError::Session(err) => PairingError::Session(err),
        }
    }
}

impl PairingError {
    pub fn status(&self) -> StatusCode {
        use PairingError::*;
        match self {
            NotAuthenticated => StatusCode::UNAUTHORIZED,
            RoomNotFound => StatusCode::NOT_FOUND,
            CannotJoinOwnRoom | RoomFull | NoPendingRoom => StatusCode::CONFLICT,
            CodeGenerationFailed | FeedClosed => StatusCode::SERVICE_UNAVAILABLE,
            StoreReadFailed(_) | StoreWriteFailed(_) | ProfileLookupFailed(_) | Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PairingError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "pairing failed");
        }
        crate::error_body(status, self.to_string())
    }
}
