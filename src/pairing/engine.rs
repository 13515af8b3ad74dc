use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::{self, Room, RoomStatus, ROOM_COLUMNS},
    feed::{self, Feed, FeedEvent, FeedFilter, Subscription, Table},
    profiles,
    session::CurrentUser,
};

use super::{
    code::{self, RoomCode, MAX_CODE_ATTEMPTS},
    PairingError,
};

/// What a successful handshake hands to the room surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paired {
    pub room_id: Uuid,
    pub partner_name: String,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|e| e.is_unique_violation())
}

/// Inserts a pending room owned by `user` under a fresh code.
pub async fn create_room(db_pool: &SqlitePool, user: &CurrentUser) -> Result<Room, PairingError> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let room = Room {
            id: Uuid::now_v7(),
            room_code: code::generate_room_code(db_pool).await?.to_string(),
            creator_id: user.id.clone(),
            partner_id: None,
            is_active: false,
            created_at: db::now(),
        };

        let inserted = sqlx::query(&format!("INSERT INTO rooms ({ROOM_COLUMNS}) VALUES (?,?,?,NULL,0,?)"))
            .bind(room.id.to_string())
            .bind(&room.room_code)
            .bind(&room.creator_id)
            .bind(room.created_at)
            .execute(db_pool)
            .await;

        match inserted {
            Ok(_) => {
                tracing::info!(room_id = %room.id, room_code = %room.room_code, creator = %user.id, "room created");
                return Ok(room);
            }
            Err(err) if is_unique_violation(&err) => {
                tracing::debug!(room_code = %room.room_code, "room code claimed concurrently");
            }
            Err(err) => return Err(PairingError::StoreWriteFailed(err)),
        }
    }

    Err(PairingError::CodeGenerationFailed)
}

/// Binds `user` as the partner of the room named by `code` and activates it.
///
/// The claim is a conditional update on `partner_id IS NULL`, so of several
/// joiners racing for one pending room exactly one gets it; the rest see
/// [`PairingError::RoomFull`].
pub async fn join_room(
    db_pool: &SqlitePool,
    feed: &Feed,
    user: &CurrentUser,
    code: &str,
) -> Result<Paired, PairingError> {
    let Some(code) = RoomCode::parse(code) else {
        return Err(PairingError::RoomNotFound);
    };

    let mut room = db::room_by_code(db_pool, code.as_str())
        .await
        .map_err(PairingError::StoreReadFailed)?
        .ok_or(PairingError::RoomNotFound)?;

    if room.creator_id == user.id {
        return Err(PairingError::CannotJoinOwnRoom);
    }

    match room.partner_id.as_deref() {
        Some(partner_id) if partner_id != user.id => return Err(PairingError::RoomFull),
        Some(_) => tracing::debug!(room_id = %room.id, "partner re-entering room"),
        None => {
            let claimed = sqlx::query("UPDATE rooms SET partner_id=?, is_active=1 WHERE id=? AND partner_id IS NULL")
                .bind(&user.id)
                .bind(room.id.to_string())
                .execute(db_pool)
                .await
                .map_err(PairingError::StoreWriteFailed)?
                .rows_affected();

            room = db::room_by_id(db_pool, room.id)
                .await
                .map_err(PairingError::StoreReadFailed)?
                .ok_or(PairingError::RoomNotFound)?;

            if room.partner_id.as_deref() != Some(user.id.as_str()) {
                tracing::info!(room_id = %room.id, joiner = %user.id, "lost the race for a room");
                return Err(PairingError::RoomFull);
            }

            if claimed > 0 {
                tracing::info!(room_id = %room.id, partner = %user.id, "room activated");
                feed.publish(FeedEvent::update(room.id, Table::Rooms, feed::to_row(&room)));
            }
        }
    }

    let partner_name = profiles::display_name_of(db_pool, &room.creator_id)
        .await
        .map_err(PairingError::ProfileLookupFailed)?;

    Ok(Paired { room_id: room.id, partner_name })
}

/// The creator's side of the handshake: a live subscription to updates of one
/// pending room.
pub struct PartnerWait {
    db_pool: SqlitePool,
    user: CurrentUser,
    room: Room,
    subscription: Subscription,
}

/// Registers interest in `room` becoming active. Nothing blocks until
/// [`PartnerWait::resolve`] is awaited.
pub fn await_partner(db_pool: &SqlitePool, feed: &Feed, user: &CurrentUser, room: &Room) -> PartnerWait {
    PartnerWait {
        db_pool: db_pool.clone(),
        user: user.clone(),
        room: room.clone(),
        subscription: feed.subscribe(room.id, FeedFilter::updates_to(Table::Rooms)),
    }
}

impl PartnerWait {
    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Waits until the room has a partner and is active, then names the
    /// partner. Dropping the future leaves the subscription in place.
    pub async fn resolve(&mut self) -> Result<Paired, PairingError> {
        // the join may have landed before we subscribed
        let current = db::room_by_id(&self.db_pool, self.room.id)
            .await
            .map_err(PairingError::StoreReadFailed)?;
        if let Some(room) = current.filter(|room| room.status() == RoomStatus::Active) {
            return self.paired(room).await;
        }

        while let Some(event) = self.subscription.next().await {
            let room = match serde_json::from_value::<Room>(event.row) {
                Ok(room) => room,
                Err(err) => {
                    tracing::warn!(error = %err, "unreadable room update on feed");
                    continue;
                }
            };
            if room.status() == RoomStatus::Active {
                return self.paired(room).await;
            }
        }

        Err(PairingError::FeedClosed)
    }

    async fn paired(&mut self, room: Room) -> Result<Paired, PairingError> {
        let partner_id = room.other_member(&self.user.id).ok_or(PairingError::NoPendingRoom)?;
        let partner_name = profiles::display_name_of(&self.db_pool, partner_id)
            .await
            .map_err(PairingError::ProfileLookupFailed)?;

        tracing::info!(room_id = %room.id, "partner arrived");
        self.room = room;
        Ok(Paired { room_id: self.room.id, partner_name })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingMode {
    Choosing,
    Creating,
    Joining,
}

/// One user's attempt at pairing. Lives until it yields a [`Paired`] or is
/// cancelled; cancelling drops the feed subscription but leaves the room row
/// behind as a pending room nobody will join.
pub struct PairingSession {
    db_pool: SqlitePool,
    feed: Feed,
    user: CurrentUser,
    mode: PairingMode,
    pending: Option<PartnerWait>,
}

impl PairingSession {
    pub fn new(db_pool: SqlitePool, feed: Feed, user: CurrentUser) -> Self {
        Self {
            db_pool,
            feed,
            user,
            mode: PairingMode::Choosing,
            pending: None,
        }
    }

    pub fn mode(&self) -> PairingMode {
        self.mode
    }

    pub fn pending_room(&self) -> Option<&Room> {
        self.pending.as_ref().map(PartnerWait::room)
    }

    pub fn is_waiting_for_partner(&self) -> bool {
        self.pending.is_some()
    }

    /// Creates a room and starts listening for its partner. A previously
    /// pending room is abandoned first.
    pub async fn create_room(&mut self) -> Result<Room, PairingError> {
        self.cancel();
        let room = create_room(&self.db_pool, &self.user).await?;
        self.pending = Some(await_partner(&self.db_pool, &self.feed, &self.user, &room));
        self.mode = PairingMode::Creating;
        Ok(room)
    }

    pub async fn wait_for_partner(&mut self) -> Result<Paired, PairingError> {
        let wait = self.pending.as_mut().ok_or(PairingError::NoPendingRoom)?;
        let paired = wait.resolve().await?;
        self.pending = None;
        self.mode = PairingMode::Choosing;
        Ok(paired)
    }

    pub async fn join_room(&mut self, code: &str) -> Result<Paired, PairingError> {
        self.cancel();
        self.mode = PairingMode::Joining;
        let paired = join_room(&self.db_pool, &self.feed, &self.user, code).await?;
        self.mode = PairingMode::Choosing;
        Ok(paired)
    }

    pub fn cancel(&mut self) {
        if let Some(wait) = self.pending.take() {
            tracing::info!(room_id = %wait.room.id, "pairing cancelled, room left pending");
        }
        self.mode = PairingMode::Choosing;
    }
}
