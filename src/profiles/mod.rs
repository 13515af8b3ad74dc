mod me;

use axum::{routing::get, Router};
use sqlx::SqlitePool;

use crate::{db::{self, Profile}, AppState};

/// Shown when the other member of a room has no profile row.
pub const FALLBACK_DISPLAY_NAME: &str = "Your Partner";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me::me))
}

pub async fn profile_by_user(db_pool: &SqlitePool, user_id: &str) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as("SELECT user_id,display_name FROM profiles WHERE user_id=?")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await
}

/// Display name for `user_id`, falling back when the profile is missing.
pub async fn display_name_of(db_pool: &SqlitePool, user_id: &str) -> Result<String, sqlx::Error> {
    Ok(profile_by_user(db_pool, user_id)
        .await?
        .map(|p| p.display_name)
        .unwrap_or_else(|| FALLBACK_DISPLAY_NAME.to_owned()))
}

/// Creates the profile unless one exists; an existing name is kept.
pub async fn ensure_profile(db_pool: &SqlitePool, user_id: &str, display_name: &str) -> Result<(), sqlx::Error> {
    let inserted = sqlx::query("INSERT INTO profiles (user_id,display_name,created_at) VALUES (?,?,?) ON CONFLICT(user_id) DO NOTHING")
        .bind(user_id)
        .bind(display_name)
        .bind(db::now())
        .execute(db_pool)
        .await?
        .rows_affected();
    if inserted > 0 {
        tracing::info!(user_id, display_name, "profile created");
    }
    Ok(())
}

pub async fn upsert_profile(db_pool: &SqlitePool, user_id: &str, display_name: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO profiles (user_id,display_name,created_at) VALUES (?,?,?) ON CONFLICT(user_id) DO UPDATE SET display_name=excluded.display_name")
        .bind(user_id)
        .bind(display_name)
        .bind(db::now())
        .execute(db_pool)
        .await?;
    Ok(())
}
