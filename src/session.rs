use axum::{http::StatusCode, response::{IntoResponse, Response}};
use thiserror::Error;
use tower_sessions::Session;

pub const USER_ID: &str = "user_id";
pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("sign in to continue")]
    NotAuthenticated,

    #[error("session unavailable: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let status = match self {
            IdentityError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            IdentityError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        crate::error_body(status, self.to_string())
    }
}

/// The signed-in identity for one request. Lives from sign-in until the
/// session is cleared on sign-out or expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub async fn from_session(session: &Session) -> Result<Self, IdentityError> {
        session
            .get::<String>(USER_ID)
            .await?
            .map(Self::new)
            .ok_or(IdentityError::NotAuthenticated)
    }

    pub async fn sign_in(session: &Session, user_id: &str) -> Result<Self, IdentityError> {
        session.cycle_id().await?;
        session.insert(USER_ID, user_id).await?;
        Ok(Self::new(user_id))
    }

    pub async fn sign_out(session: &Session) {
        session.clear().await;
    }
}
