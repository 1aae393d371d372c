//! Side type owned by the project. cozy-chess colours stay an
//! implementation detail of the engine.

/// One of the two sides of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerSide {
    White,
    Black,
}

impl PlayerSide {
    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "white" => Some(Self::White),
            "black" => Some(Self::Black),
            _ => None,
        }
    }

    /// Side that plays the given 1-indexed ply. Odd plies belong to White.
    pub fn of_ply(ply: u32) -> Self {
        if ply % 2 == 1 {
            Self::White
        } else {
            Self::Black
        }
    }
}

impl From<cozy_chess::Color> for PlayerSide {
    fn from(c: cozy_chess::Color) -> Self {
        match c {
            cozy_chess::Color::White => Self::White,
            cozy_chess::Color::Black => Self::Black,
        }
    }
}

impl From<PlayerSide> for cozy_chess::Color {
    fn from(s: PlayerSide) -> Self {
        match s {
            PlayerSide::White => Self::White,
            PlayerSide::Black => Self::Black,
        }
    }
}

impl std::fmt::Display for PlayerSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ply_parity() {
        assert_eq!(PlayerSide::of_ply(1), PlayerSide::White);
        assert_eq!(PlayerSide::of_ply(2), PlayerSide::Black);
        assert_eq!(PlayerSide::of_ply(41), PlayerSide::White);
    }

    #[test]
    fn text_roundtrip() {
        for side in [PlayerSide::White, PlayerSide::Black] {
            assert_eq!(PlayerSide::parse(side.as_str()), Some(side));
        }
        assert_eq!(PlayerSide::parse("red"), None);
        assert_eq!(PlayerSide::White.opposite(), PlayerSide::Black);
    }
}
