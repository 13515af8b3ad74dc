use axum::{debug_handler, extract::State, response::Html};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{include_res, profiles, session::{CurrentUser, IdentityError}, AppResult};

#[debug_handler]
pub async fn index(
    State(db_pool): State<SqlitePool>,
    session: Session
) -> AppResult<Html<String>> {
    let greeting = match CurrentUser::from_session(&session).await {
        Ok(user) => {
            let name = profiles::display_name_of(&db_pool, &user.id).await?;
            format!(r#"<p class="welcome">Welcome back, {}</p><a href="/logout">Sign Out</a>"#, escape_html(&name))
        }
        Err(IdentityError::NotAuthenticated) => r#"<a href="/login">Sign In</a>"#.to_owned(),
        Err(IdentityError::Session(err)) => return Err(err.into()),
    };

    Ok(
        Html(
            include_res!(str, "/pages/index.html")
                .replace("{greeting}", &greeting)
        )
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
