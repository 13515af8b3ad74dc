use axum::{debug_handler, extract::State, response::Redirect, Form};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{profiles, session::CurrentUser, AppResult, AppState, GetField};

use super::{login::take_return_url, random_alias, Clients};

#[derive(Deserialize)]
pub(crate) struct SignUpForm {
    email: String,
    password: String,
    display_name: String,
}

#[derive(Deserialize)]
pub(crate) struct SignInForm {
    email: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

/// What the identity toolkit said, reduced to what the login page shows.
enum Outcome {
    SignedIn(String),
    Rejected(String),
}

async fn call_identity_toolkit(clients: &Clients, method: &str, email: &str, password: &str) -> AppResult<Outcome> {
    let response = reqwest::Client::new()
        .post(clients.identity_url(method))
        .json(&PasswordRequest { email: email.trim(), password, return_secure_token: true })
        .send()
        .await?;

    let status = response.status();
    let body: serde_json::Value = response.json().await?;
    if status.is_success() {
        return Ok(Outcome::SignedIn(body.get_str_field("localId")?));
    }

    // e.g. {"error": {"message": "EMAIL_EXISTS"}} or "WEAK_PASSWORD : ..."
    let reason = body
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .and_then(|m| m.split_whitespace().next())
        .unwrap_or("SIGN_IN_FAILED")
        .to_owned();
    Ok(Outcome::Rejected(reason))
}

fn back_to_login(reason: &str) -> Redirect {
    Redirect::to(&format!("/login?error={reason}"))
}

#[debug_handler(state = AppState)]
pub(crate) async fn sign_up(
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    session: Session,
    Form(SignUpForm { email, password, display_name }): Form<SignUpForm>,
) -> AppResult<Redirect> {
    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Ok(back_to_login("DISPLAY_NAME_REQUIRED"));
    }

    let user_id = match call_identity_toolkit(&clients, "signUp", &email, &password).await? {
        Outcome::SignedIn(user_id) => user_id,
        Outcome::Rejected(reason) => {
            tracing::info!(%reason, "sign up rejected");
            return Ok(back_to_login(&reason));
        }
    };

    profiles::upsert_profile(&db_pool, &user_id, display_name).await?;
    CurrentUser::sign_in(&session, &user_id).await.map_err(anyhow::Error::from)?;
    tracing::info!(%user_id, "account created");

    Ok(Redirect::to(&take_return_url(&session).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn sign_in(
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    session: Session,
    Form(SignInForm { email, password }): Form<SignInForm>,
) -> AppResult<Redirect> {
    let user_id = match call_identity_toolkit(&clients, "signInWithPassword", &email, &password).await? {
        Outcome::SignedIn(user_id) => user_id,
        Outcome::Rejected(reason) => {
            tracing::info!(%reason, "sign in rejected");
            return Ok(back_to_login(&reason));
        }
    };

    profiles::ensure_profile(&db_pool, &user_id, &random_alias()).await?;
    CurrentUser::sign_in(&session, &user_id).await.map_err(anyhow::Error::from)?;
    tracing::info!(%user_id, "welcome back");

    Ok(Redirect::to(&take_return_url(&session).await?))
}
