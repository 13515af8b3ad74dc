//! Double-consent room pairing.
//!
//! One user creates a pending room and shares its code; the other joins with
//! the code, which binds them as partner and activates the room. The creator
//! learns about the join from the room feed rather than by polling.

mod code;
mod engine;
mod error;
mod join;
mod ws;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use code::{generate_room_code, RoomCode, ROOM_CODE_LEN};
pub use engine::{await_partner, create_room, join_room, Paired, PairingMode, PairingSession, PartnerWait};
pub use error::PairingError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(join::pairing_page))
        .route("/join", post(join::join))
        .route("/ws", get(ws::pairing_ws))
}
