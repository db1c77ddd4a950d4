//! Faction definitions.

use serde::{Deserialize, Serialize};

/// The two building factions, plus `None` for spectators and the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Faction {
    /// Not on a building team.
    None,
    /// The growth faction: structures need territory from spawns or the core.
    Aliens,
    /// The power faction: structures need a reactor or relay in range.
    Humans,
}

impl Faction {
    /// Get the display name for this faction.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::None => "Spectators",
            Self::Aliens => "Aliens",
            Self::Humans => "Humans",
        }
    }

    /// Whether this is one of the two building factions.
    #[must_use]
    pub const fn is_team(&self) -> bool {
        !matches!(self, Self::None)
    }
}
