//! Shared encode/decode helpers for SQLite ↔ domain type conversions.
//!
//! Enum columns are TEXT constrained by CHECKs in the schema; anything else
//! coming back from the database is reported as a corrupt record.

use chess::PlayerSide;

use crate::game::GameStatus;
use crate::persistence::PersistenceError;
use crate::player::{Player, PlayerId, PlayerKind};

pub fn decode_kind(kind: &str) -> Result<PlayerKind, PersistenceError> {
    PlayerKind::parse(kind)
        .ok_or_else(|| PersistenceError::Corrupt(format!("unknown player kind '{kind}'")))
}

pub fn decode_status(status: &str) -> Result<GameStatus, PersistenceError> {
    GameStatus::parse(status)
        .ok_or_else(|| PersistenceError::Corrupt(format!("unknown game status '{status}'")))
}

pub fn decode_side(side: Option<&str>) -> Result<Option<PlayerSide>, PersistenceError> {
    side.map(|s| {
        PlayerSide::parse(s)
            .ok_or_else(|| PersistenceError::Corrupt(format!("unknown side '{s}'")))
    })
    .transpose()
}

/// Row type for player queries, mapped via `sqlx::FromRow`.
#[derive(sqlx::FromRow)]
pub struct PlayerRow {
    pub player_id: i64,
    pub display_name: String,
    pub kind: String,
    pub robot_engine: Option<String>,
    pub created_at: i64,
}

impl TryFrom<PlayerRow> for Player {
    type Error = PersistenceError;

    fn try_from(r: PlayerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PlayerId(r.player_id),
            kind: decode_kind(&r.kind)?,
            display_name: r.display_name,
            robot_engine: r.robot_engine,
            created_at: r.created_at as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_unknown_values() {
        assert_eq!(decode_kind("ROBOT").unwrap(), PlayerKind::Robot);
        assert!(matches!(decode_kind("robot"), Err(PersistenceError::Corrupt(_))));
        assert_eq!(decode_status("ENDED_DRAW").unwrap(), GameStatus::EndedDraw);
        assert!(decode_status("PAUSED").is_err());
        assert_eq!(decode_side(None).unwrap(), None);
        assert_eq!(decode_side(Some("black")).unwrap(), Some(PlayerSide::Black));
        assert!(decode_side(Some("red")).is_err());
    }
}
