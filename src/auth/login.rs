use axum::{debug_handler, extract::{Path, Query, State}, response::{Html, IntoResponse, Redirect, Response}};
use oauth2::{CsrfToken, PkceCodeChallenge, Scope};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{include_res, res, session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL}, AppResult, AppState};

use super::{clients::ClientProvider, Clients};

const DEFAULT_RETURN_URL: &str = "/pair";

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) return_url: Option<String>,
}

/// Remembers where to go after signing in, whichever way that happens.
/// Only paths on this site are accepted.
pub(crate) async fn remember_return_url(session: &Session, return_url: Option<String>) -> AppResult<()> {
    if let Some(return_url) = return_url.filter(|url| url.starts_with('/') && !url.starts_with("//")) {
        session.insert(RETURN_URL, return_url).await?;
    }
    Ok(())
}

pub(crate) async fn take_return_url(session: &Session) -> AppResult<String> {
    Ok(session
        .remove::<String>(RETURN_URL)
        .await?
        .unwrap_or_else(|| DEFAULT_RETURN_URL.to_owned()))
}

#[debug_handler]
pub(crate) async fn login_page(
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    session: Session,
) -> AppResult<Html<&'static str>> {
    remember_return_url(&session, return_url).await?;
    Ok(Html(include_res!(str, "/pages/login.html")))
}

/// Starts the authorization code flow with PKCE.
#[debug_handler(state = AppState)]
pub(crate) async fn login(
    Path(provider): Path<ClientProvider>,
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Response> {
    let Ok(client) = clients.get_client(provider) else {
        tracing::warn!(%provider, "login with an unconfigured provider");
        return Ok(res::sorry("sign-in provider"));
    };

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let (authorize_url, csrf_state) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(provider.scopes().iter().map(|scope| Scope::new((*scope).to_owned())))
        .set_pkce_challenge(pkce_challenge)
        .url();

    session.insert(CSRF_STATE, csrf_state.secret()).await?;
    session.insert(PKCE_VERIFIER, pkce_verifier.secret()).await?;
    remember_return_url(&session, return_url).await?;

    tracing::debug!(%provider, "redirecting to OAuth provider");
    Ok(Redirect::to(authorize_url.as_str()).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::{MemoryStore, Session};

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn return_url_defaults_to_pairing() {
        let session = session();
        assert_eq!(take_return_url(&session).await.unwrap(), "/pair");
    }

    #[tokio::test]
    async fn return_url_is_taken_once() {
        let session = session();
        remember_return_url(&session, Some("/r/abc".to_owned())).await.unwrap();
        assert_eq!(take_return_url(&session).await.unwrap(), "/r/abc");
        assert_eq!(take_return_url(&session).await.unwrap(), "/pair");
    }

    #[tokio::test]
    async fn offsite_return_urls_are_ignored() {
        let session = session();
        remember_return_url(&session, Some("https://evil.example".to_owned())).await.unwrap();
        remember_return_url(&session, Some("//evil.example".to_owned())).await.unwrap();
        assert_eq!(take_return_url(&session).await.unwrap(), "/pair");
    }
}
