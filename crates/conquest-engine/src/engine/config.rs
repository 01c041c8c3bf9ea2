use serde::{Deserialize, Serialize};

use crate::{ConfigError, Position};

/// Shape of a Conquest match.
///
/// Missing fields fall back to [`BoardConfig::default`] when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub width: usize,
    pub height: usize,
    pub colors: usize,
    pub players: usize,
    /// Successful turns after which a game counts as finished even if cells
    /// remain unclaimed.
    pub max_turns: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 40,
            height: 40,
            colors: 6,
            players: 2,
            max_turns: 200,
        }
    }
}

impl BoardConfig {
    /// Smallest side length that keeps both starting regions intact and apart.
    pub const MIN_SIDE: usize = 5;
    /// One anchor per corner pair.
    pub const MAX_PLAYERS: usize = 2;
    pub const MAX_COLORS: usize = u8::MAX as usize;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < Self::MIN_SIDE || self.height < Self::MIN_SIDE {
            return Err(ConfigError::BoardTooSmall {
                width: self.width,
                height: self.height,
                min: Self::MIN_SIDE,
            });
        }
        if !(1..=Self::MAX_PLAYERS).contains(&self.players) {
            return Err(ConfigError::UnsupportedPlayerCount {
                players: self.players,
                max: Self::MAX_PLAYERS,
            });
        }
        if self.colors <= self.players {
            return Err(ConfigError::NotEnoughColors {
                colors: self.colors,
                players: self.players,
            });
        }
        if self.colors > Self::MAX_COLORS {
            return Err(ConfigError::TooManyColors {
                colors: self.colors,
                max: Self::MAX_COLORS,
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn area(&self) -> usize {
        self.width * self.height
    }

    /// Anchor cell of every seat: opposite corners, inset by one so the
    /// starting plus shape fits on the board.
    #[must_use]
    pub fn anchors(&self) -> Vec<Position> {
        [
            Position::new(1, 1),
            Position::new(self.width - 2, self.height - 2),
        ]
        .into_iter()
        .take(self.players)
        .collect()
    }
}
