use axum::{
    debug_handler,
    extract::{ws::{Message, WebSocket}, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
};
use futures_util::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{feed::Feed, session::CurrentUser, AppState};

use super::{PairingError, PairingSession};

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMsg {
    RoomCreated { room_id: Uuid, room_code: String },
    Paired { room_id: Uuid, partner_name: String },
    Cancelled,
    Error { message: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ClientMsg {
    Cancel,
}

impl From<PairingError> for ServerMsg {
    fn from(err: PairingError) -> Self {
        if err.status().is_server_error() {
            tracing::error!(error = ?err, "pairing socket failed");
        }
        ServerMsg::Error { message: err.to_string() }
    }
}

/// Creator side of the handshake. The pairing session lives exactly as long
/// as this socket: closing it, or sending `{"action":"cancel"}`, cancels.
#[debug_handler(state = AppState)]
pub(crate) async fn pairing_ws(
    State(db_pool): State<SqlitePool>,
    State(feed): State<Feed>,
    session: Session,

    ws: WebSocketUpgrade,
) -> Result<Response, PairingError> {
    let user = CurrentUser::from_session(&session).await?;

    Ok(ws.on_upgrade(move |stream| run_pairing(stream, PairingSession::new(db_pool, feed, user)))
        .into_response())
}

enum Step {
    Partner(Result<super::Paired, PairingError>),
    Client(Option<Result<Message, axum::Error>>),
}

async fn run_pairing(stream: WebSocket, mut pairing: PairingSession) {
    let (mut sender, mut receiver) = stream.split();

    let first = match pairing.create_room().await {
        Ok(room) => ServerMsg::RoomCreated { room_id: room.id, room_code: room.room_code },
        Err(err) => ServerMsg::from(err),
    };
    let created = matches!(first, ServerMsg::RoomCreated { .. });
    if send(&mut sender, &first).await.is_err() || !created {
        pairing.cancel();
        return;
    }

    loop {
        let step = tokio::select! {
            paired = pairing.wait_for_partner() => Step::Partner(paired),
            msg = receiver.next() => Step::Client(msg),
        };

        match step {
            Step::Partner(Ok(paired)) => {
                let _ = send(&mut sender, &ServerMsg::Paired {
                    room_id: paired.room_id,
                    partner_name: paired.partner_name,
                }).await;
                break;
            }
            Step::Partner(Err(err)) => {
                pairing.cancel();
                let _ = send(&mut sender, &ServerMsg::from(err)).await;
                break;
            }
            Step::Client(Some(Ok(Message::Text(text)))) => {
                match serde_json::from_str::<ClientMsg>(text.as_str()) {
                    Ok(ClientMsg::Cancel) => {
                        pairing.cancel();
                        let _ = send(&mut sender, &ServerMsg::Cancelled).await;
                        break;
                    }
                    Err(err) => tracing::debug!(error = %err, "ignoring pairing socket message"),
                }
            }
            Step::Client(Some(Ok(Message::Close(_)))) | Step::Client(Some(Err(_))) | Step::Client(None) => {
                pairing.cancel();
                break;
            }
            Step::Client(Some(Ok(_))) => {}
        }
    }

    let _ = sender.close().await;
}

async fn send<S>(sender: &mut S, msg: &ServerMsg) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let text = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(text.into())).await
}
