use std::str::FromStr;

use serde::Serialize;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    FromRow, Row, SqlitePool,
};
use uuid::Uuid;

pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

pub async fn migrate(db_pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(db_pool).await
}

/// Seconds since the unix epoch; every `*_at` column holds one of these.
pub fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, sqlx::Error> {
    Uuid::parse_str(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Client-observed lifecycle of a room. There is no way back from `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Pending,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub room_code: String,
    pub creator_id: String,
    pub partner_id: Option<String>,
    pub is_active: bool,
    pub created_at: i64,

    // unique: id
    // unique: room_code
}

impl Room {
    pub fn status(&self) -> RoomStatus {
        if self.is_active && self.partner_id.is_some() {
            RoomStatus::Active
        } else {
            RoomStatus::Pending
        }
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.creator_id == user_id || self.partner_id.as_deref() == Some(user_id)
    }

    /// The member of this room who is not `user_id`, if one is bound yet.
    pub fn other_member(&self, user_id: &str) -> Option<&str> {
        if self.partner_id.as_deref() == Some(user_id) {
            Some(&self.creator_id)
        } else {
            self.partner_id.as_deref()
        }
    }
}

impl FromRow<'_, SqliteRow> for Room {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Room {
            id: parse_uuid(row.try_get("id")?)?,
            room_code: row.try_get("room_code")?,
            creator_id: row.try_get("creator_id")?,
            partner_id: row.try_get("partner_id")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

pub(crate) const ROOM_COLUMNS: &str = "id,room_code,creator_id,partner_id,is_active,created_at";

pub async fn room_by_id(db_pool: &SqlitePool, room_id: Uuid) -> Result<Option<Room>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id=?"))
        .bind(room_id.to_string())
        .fetch_optional(db_pool)
        .await
}

pub async fn room_by_code(db_pool: &SqlitePool, room_code: &str) -> Result<Option<Room>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE room_code=?"))
        .bind(room_code)
        .fetch_optional(db_pool)
        .await
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,

    // unique: user_id
}
