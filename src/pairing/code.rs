use std::fmt;

use rand::Rng;
use sqlx::SqlitePool;

use super::PairingError;

pub const ROOM_CODE_LEN: usize = 6;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub(crate) const MAX_CODE_ATTEMPTS: usize = 8;

/// A normalised six character room code: ASCII, uppercase, alphanumeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    /// Trims and uppercases `input`. Anything that is not six alphanumerics
    /// afterwards cannot name a room.
    pub fn parse(input: &str) -> Option<RoomCode> {
        let code = input.trim().to_ascii_uppercase();
        if code.len() == ROOM_CODE_LEN && code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Some(RoomCode(code))
        } else {
            None
        }
    }

    pub fn random() -> RoomCode {
        let mut rng = rand::rng();
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        RoomCode(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A code no room currently uses. The UNIQUE constraint on `rooms.room_code`
/// still has the final word when two creators draw the same code at once.
pub async fn generate_room_code(db_pool: &SqlitePool) -> Result<RoomCode, PairingError> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = RoomCode::random();
        let taken = sqlx::query("SELECT 1 FROM rooms WHERE room_code=?")
            .bind(code.as_str())
            .fetch_optional(db_pool)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "room code lookup failed");
                PairingError::CodeGenerationFailed
            })?
            .is_some();
        if !taken {
            return Ok(code);
        }
        tracing::debug!(%code, "room code already taken");
    }

    Err(PairingError::CodeGenerationFailed)
}
