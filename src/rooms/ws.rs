use axum::{
    debug_handler,
    extract::{ws::Message, Path, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{feed::{Feed, FeedFilter}, AppState};

use super::{member_from_session, RoomError};

/// Pushes every change in the room to one member. The socket is read only
/// to notice when the client goes away.
#[debug_handler(state = AppState)]
pub(crate) async fn room_ws(
    Path(room_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    State(feed): State<Feed>,
    session: Session,

    ws: WebSocketUpgrade,
) -> Result<Response, RoomError> {
    let member = member_from_session(&db_pool, &session, room_id).await?;
    let mut subscription = feed.subscribe(member.room_id(), FeedFilter::all());

    Ok(ws.on_upgrade(move |stream| async move {
        let (mut sender, mut receiver) = stream.split();
        tracing::debug!(%room_id, user_id = %member.user.id, "room feed connected");

        let mut forward_task = tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                let Ok(text) = serde_json::to_string(&event) else {
                    continue;
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        });

        let mut drain_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = receiver.next().await {
                if matches!(msg, Message::Close(_)) {
                    break;
                }
            }
        });

        tokio::select! {
            _ = &mut forward_task => drain_task.abort(),
            _ = &mut drain_task => forward_task.abort(),
        };
        tracing::debug!(%room_id, "room feed disconnected");
    }).into_response())
}
