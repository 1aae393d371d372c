//! Club members, robots and players known only from imported archives.

mod factory;

pub use factory::{PlayerError, PlayerFactory};

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerKind {
    /// A registered club member.
    Human,
    /// Driven by an engine; its games are picked up by the robot recovery job.
    Robot,
    /// Known only by name from an imported archive.
    External,
}

impl PlayerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "HUMAN",
            Self::Robot => "ROBOT",
            Self::External => "EXTERNAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HUMAN" => Some(Self::Human),
            "ROBOT" => Some(Self::Robot),
            "EXTERNAL" => Some(Self::External),
            _ => None,
        }
    }
}

/// A persisted player. Two players are equal iff their ids are.
#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub kind: PlayerKind,
    pub robot_engine: Option<String>,
    pub created_at: u64,
}

impl Player {
    pub fn is_robot(&self) -> bool {
        self.kind == PlayerKind::Robot
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Player {}

impl Hash for Player {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.display_name, self.id)
    }
}

/// A player that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlayer {
    pub display_name: String,
    pub kind: PlayerKind,
    pub robot_engine: Option<String>,
}

impl NewPlayer {
    pub fn human(name: impl Into<String>) -> Self {
        Self {
            display_name: name.into(),
            kind: PlayerKind::Human,
            robot_engine: None,
        }
    }

    pub fn robot(name: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            display_name: name.into(),
            kind: PlayerKind::Robot,
            robot_engine: Some(engine.into()),
        }
    }

    pub fn external(name: impl Into<String>) -> Self {
        Self {
            display_name: name.into(),
            kind: PlayerKind::External,
            robot_engine: None,
        }
    }

    /// The stored player once the database has assigned `id`.
    pub(crate) fn into_player(self, id: PlayerId, created_at: u64) -> Player {
        Player {
            id,
            display_name: self.display_name,
            kind: self.kind,
            robot_engine: self.robot_engine,
            created_at,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_player(id: i64, name: &str, kind: PlayerKind) -> Player {
    Player {
        id: PlayerId(id),
        display_name: name.to_string(),
        kind,
        robot_engine: (kind == PlayerKind::Robot).then(|| "stockfish".to_string()),
        created_at: 0,
    }
}
