use axum::{routing::{get, post}, Router};
use rand::seq::IndexedRandom;

use crate::AppState;

mod clients;
mod login;
mod lockin;
mod logout;
mod password;

pub use clients::{ClientProvider, Clients};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page))
        .route("/login/{provider}", get(login::login))
        .route("/lockin/{provider}", get(lockin::lockin))
        .route("/signup", post(password::sign_up))
        .route("/signin", post(password::sign_in))
        .route("/logout", get(logout::logout))
}

/// Display name for identities that never told us one.
pub(crate) fn random_alias() -> String {
    let adjectives = [
        "Quiet", "Gentle", "Warm", "Bright", "Tender", "Golden", "Silver", "Calm",
        "Kind", "Brave", "Shy", "Wild", "Soft", "Glowing", "Dreamy", "Lucky",
    ];
    let nouns = [
        "Candle", "Fern", "Willow", "Moth", "Lantern", "Sparrow", "Comet", "Ember",
        "Harbor", "Meadow", "Otter", "Heron", "Poppy", "Tide", "Cloud", "Fox",
    ];

    let mut rng = rand::rng();
    format!(
        "{} {}",
        adjectives.choose(&mut rng).copied().unwrap_or("Quiet"),
        nouns.choose(&mut rng).copied().unwrap_or("Soul"),
    )
}
