use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    db,
    feed::{self, Feed, FeedEvent, Table},
    AppState,
};

use super::{member_from_session, Membership, RoomError};

/// Plant time moves in steps of this many seconds.
pub const TICK_SECS: i64 = 30;
const WATER_PER_POUR: f64 = 25.0;
// no tick changes anything once water and health have both hit zero
const MAX_TICKS: u64 = 1_000;
const CAS_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vitals {
    pub health: f64,
    pub water_level: f64,
}

impl Vitals {
    pub const SEEDLING: Vitals = Vitals { health: 75.0, water_level: 60.0 };

    /// Water evaporates every tick; health follows the level it had before.
    pub fn tick(&mut self) {
        let water = self.water_level;
        self.water_level = (water - 0.5).max(0.0);
        if water < 20.0 {
            self.health = (self.health - 1.0).max(0.0);
        } else if water > 80.0 {
            self.health = (self.health + 0.5).min(100.0);
        }
    }

    pub fn advance(&mut self, ticks: u64) {
        for _ in 0..ticks.min(MAX_TICKS) {
            self.tick();
        }
    }

    pub fn stage(&self) -> PlantStage {
        match self.health {
            h if h >= 80.0 => PlantStage::Blooming,
            h if h >= 60.0 => PlantStage::Healthy,
            h if h >= 40.0 => PlantStage::Growing,
            h if h >= 20.0 => PlantStage::Struggling,
            _ => PlantStage::Wilting,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantStage {
    Blooming,
    Healthy,
    Growing,
    Struggling,
    Wilting,
}

impl PlantStage {
    pub fn message(&self) -> &'static str {
        use PlantStage::*;
        match self {
            Blooming => "Your plant is flourishing with love from both of you!",
            Healthy => "Your plant is thriving thanks to your shared care",
            Growing => "Your plant is growing steadily with your attention",
            Struggling => "Your plant needs more consistent care from both of you",
            Wilting => "Your plant is suffering from neglect - show it some love!",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlantState {
    pub room_id: Uuid,
    #[serde(flatten)]
    pub vitals: Vitals,
    pub stage: PlantStage,
    pub message: &'static str,
    pub you_watered_today: bool,
    pub partner_watered_today: bool,
    pub last_watered_at: Option<i64>,
}

/// UTC calendar day of a unix timestamp, `YYYY-MM-DD`.
fn day_of(at: i64) -> String {
    time::OffsetDateTime::from_unix_timestamp(at)
        .unwrap_or(time::OffsetDateTime::UNIX_EPOCH)
        .date()
        .to_string()
}

/// Loads the plant, creating it on first sight, and catches it up to `now`.
/// Advancing is a compare-and-swap on `updated_at`, so two members looking at
/// the plant at once never apply the same ticks twice.
async fn caught_up(db_pool: &SqlitePool, room_id: Uuid, now: i64) -> Result<Vitals, RoomError> {
    sqlx::query("INSERT INTO plants (room_id,health,water_level,updated_at) VALUES (?,?,?,?) ON CONFLICT(room_id) DO NOTHING")
        .bind(room_id.to_string())
        .bind(Vitals::SEEDLING.health)
        .bind(Vitals::SEEDLING.water_level)
        .bind(now)
        .execute(db_pool)
        .await?;

    let mut vitals = Vitals::SEEDLING;
    for _ in 0..CAS_ATTEMPTS {
        let (health, water_level, updated_at): (f64, f64, i64) =
            sqlx::query_as("SELECT health,water_level,updated_at FROM plants WHERE room_id=?")
                .bind(room_id.to_string())
                .fetch_one(db_pool)
                .await?;
        vitals = Vitals { health, water_level };

        let ticks = (now - updated_at).max(0) / TICK_SECS;
        if ticks == 0 {
            return Ok(vitals);
        }
        vitals.advance(ticks as u64);

        let swapped = sqlx::query("UPDATE plants SET health=?, water_level=?, updated_at=? WHERE room_id=? AND updated_at=?")
            .bind(vitals.health)
            .bind(vitals.water_level)
            .bind(updated_at + ticks * TICK_SECS)
            .bind(room_id.to_string())
            .bind(updated_at)
            .execute(db_pool)
            .await?
            .rows_affected();
        if swapped > 0 {
            return Ok(vitals);
        }
    }

    Ok(vitals)
}

async fn state_of(db_pool: &SqlitePool, member: &Membership, vitals: Vitals, now: i64) -> Result<PlantState, RoomError> {
    let watered: Vec<(String,)> = sqlx::query_as("SELECT user_id FROM plant_waterings WHERE room_id=? AND day=?")
        .bind(member.room_id().to_string())
        .bind(day_of(now))
        .fetch_all(db_pool)
        .await?;
    let (last_watered_at,): (Option<i64>,) = sqlx::query_as("SELECT MAX(watered_at) FROM plant_waterings WHERE room_id=?")
        .bind(member.room_id().to_string())
        .fetch_one(db_pool)
        .await?;

    let stage = vitals.stage();
    Ok(PlantState {
        room_id: member.room_id(),
        vitals,
        stage,
        message: stage.message(),
        you_watered_today: watered.iter().any(|(id,)| *id == member.user.id),
        partner_watered_today: watered.iter().any(|(id,)| id == member.partner_id()),
        last_watered_at,
    })
}

pub async fn plant_state(db_pool: &SqlitePool, member: &Membership, now: i64) -> Result<PlantState, RoomError> {
    let vitals = caught_up(db_pool, member.room_id(), now).await?;
    state_of(db_pool, member, vitals, now).await
}

/// One pour per member per UTC day.
pub async fn water(db_pool: &SqlitePool, feed: &Feed, member: &Membership, now: i64) -> Result<PlantState, RoomError> {
    caught_up(db_pool, member.room_id(), now).await?;

    let first_today = sqlx::query("INSERT INTO plant_waterings (room_id,user_id,day,watered_at) VALUES (?,?,?,?) ON CONFLICT DO NOTHING")
        .bind(member.room_id().to_string())
        .bind(&member.user.id)
        .bind(day_of(now))
        .bind(now)
        .execute(db_pool)
        .await?
        .rows_affected() > 0;
    if !first_today {
        return Err(RoomError::AlreadyWateredToday);
    }

    let (health, water_level): (f64, f64) =
        sqlx::query_as("UPDATE plants SET water_level=MIN(100.0, water_level + ?) WHERE room_id=? RETURNING health,water_level")
            .bind(WATER_PER_POUR)
            .bind(member.room_id().to_string())
            .fetch_one(db_pool)
            .await?;

    tracing::debug!(room_id = %member.room_id(), water_level, "plant watered");
    let state = state_of(db_pool, member, Vitals { health, water_level }, now).await?;
    feed.publish(FeedEvent::update(member.room_id(), Table::Plants, feed::to_row(&state)));
    Ok(state)
}

#[debug_handler(state = AppState)]
pub(crate) async fn get_plant(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<Uuid>,
) -> Result<Json<PlantState>, RoomError> {
    let member = member_from_session(&db_pool, &session, room_id).await?;
    Ok(Json(plant_state(&db_pool, &member, db::now()).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn post_water(
    State(db_pool): State<SqlitePool>,
    State(feed): State<Feed>,
    session: Session,
    Path(room_id): Path<Uuid>,
) -> Result<Json<PlantState>, RoomError> {
    let member = member_from_session(&db_pool, &session, room_id).await?;
    Ok(Json(water(&db_pool, &feed, &member, db::now()).await?))
}
