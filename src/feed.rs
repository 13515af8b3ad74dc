//! In-process change feed.
//!
//! Every write the server makes to a room-scoped row is published here as a
//! [`FeedEvent`]. Consumers hold a [`Subscription`] for one room, optionally
//! narrowed to a table and change kind. Delivery is best effort: a subscriber
//! that falls behind the channel capacity skips the events it missed.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Rooms,
    Messages,
    Thoughts,
    Plants,
    Candles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedEvent {
    pub room_id: Uuid,
    pub table: Table,
    pub kind: ChangeKind,
    pub row: serde_json::Value,
}

/// Serializes a row for an event payload.
pub fn to_row<T: Serialize>(row: &T) -> serde_json::Value {
    serde_json::to_value(row).unwrap_or_else(|err| {
        tracing::error!(error = %err, "feed row failed to serialize");
        serde_json::Value::Null
    })
}

impl FeedEvent {
    pub fn insert(room_id: Uuid, table: Table, row: serde_json::Value) -> Self {
        Self { room_id, table, kind: ChangeKind::Insert, row }
    }

    pub fn update(room_id: Uuid, table: Table, row: serde_json::Value) -> Self {
        Self { room_id, table, kind: ChangeKind::Update, row }
    }
}

/// Equality filter applied on top of the room id.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedFilter {
    pub table: Option<Table>,
    pub kind: Option<ChangeKind>,
}

impl FeedFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn updates_to(table: Table) -> Self {
        Self { table: Some(table), kind: Some(ChangeKind::Update) }
    }

    fn matches(&self, event: &FeedEvent) -> bool {
        self.table.is_none_or(|t| t == event.table)
            && self.kind.is_none_or(|k| k == event.kind)
    }
}

/// Room-keyed broadcast hub. Cheap to clone.
#[derive(Clone)]
pub struct Feed {
    channels: Arc<Mutex<HashMap<Uuid, broadcast::Sender<FeedEvent>>>>,
    capacity: usize,
}

impl Feed {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<Uuid, broadcast::Sender<FeedEvent>>> {
        // the map stays consistent even if a holder panicked
        self.channels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish to the event's room. No-op when nobody is subscribed.
    pub fn publish(&self, event: FeedEvent) {
        let channels = self.channels();
        if let Some(tx) = channels.get(&event.room_id) {
            let delivered = tx.send(event).unwrap_or(0);
            tracing::trace!(delivered, "feed event published");
        }
    }

    pub fn subscribe(&self, room_id: Uuid, filter: FeedFilter) -> Subscription {
        let mut channels = self.channels();
        let rx = channels
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        Subscription {
            feed: self.clone(),
            room_id,
            filter,
            rx,
        }
    }

    pub fn subscriber_count(&self, room_id: Uuid) -> usize {
        self.channels()
            .get(&room_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Called while the departing receiver is still alive.
    fn release(&self, room_id: Uuid) {
        let mut channels = self.channels();
        if channels.get(&room_id).is_some_and(|tx| tx.receiver_count() <= 1) {
            channels.remove(&room_id);
        }
    }
}

impl Default for Feed {
    fn default() -> Self {
        Self::new()
    }
}

/// A live registration on one room's feed. Dropping it unsubscribes.
pub struct Subscription {
    feed: Feed,
    room_id: Uuid,
    filter: FeedFilter,
    rx: broadcast::Receiver<FeedEvent>,
}

impl Subscription {
    pub fn room_id(&self) -> Uuid {
        self.room_id
    }

    /// Next matching event, or `None` once the room channel is gone.
    pub async fn next(&mut self) -> Option<FeedEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(room_id = %self.room_id, missed, "feed subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.feed.release(self.room_id);
    }
}
