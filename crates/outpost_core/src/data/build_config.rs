//! Server tunables that affect building.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::faction::Faction;

/// Server-side building configuration.
///
/// # Example RON
///
/// ```ron
/// BuildConfig(
///     mark_deconstruct: true,
///     anti_spawn_block: 1,
///     alien_build_points: 120,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct BuildConfig {
    /// Instant build, no spawn floor.
    #[serde(default)]
    pub cheats: bool,

    /// Allow replacing marked structures to free build points.
    #[serde(default)]
    pub mark_deconstruct: bool,

    /// Remove marked structures until the full cost is yielded.
    #[serde(default)]
    pub mark_deconstruct_full_cost: bool,

    /// Maximum number of build log entries kept.
    #[serde(default = "default_build_log_max_length")]
    pub build_log_max_length: usize,

    /// Spawn-block countermeasure strength; 0 disables it.
    #[serde(default)]
    pub anti_spawn_block: u32,

    /// Pick a random layout when none is requested.
    #[serde(default)]
    pub layout_auto: bool,

    /// Practise mode: structures never target actors.
    #[serde(default)]
    pub practise: bool,

    /// Alien build point pool.
    #[serde(default = "default_build_points")]
    pub alien_build_points: i32,

    /// Human build point pool.
    #[serde(default = "default_build_points")]
    pub human_build_points: i32,
}

/// Default build log length.
const fn default_build_log_max_length() -> usize {
    50
}

/// Default build point pool.
const fn default_build_points() -> i32 {
    100
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            cheats: false,
            mark_deconstruct: false,
            mark_deconstruct_full_cost: false,
            build_log_max_length: default_build_log_max_length(),
            anti_spawn_block: 0,
            layout_auto: false,
            practise: false,
            alien_build_points: default_build_points(),
            human_build_points: default_build_points(),
        }
    }
}

impl BuildConfig {
    /// Parse a configuration from RON.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DataParse`] on malformed input.
    pub fn from_ron(path: &str, source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| SimError::DataParse {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Build point pool of a faction.
    #[must_use]
    pub const fn max_build_points(&self, faction: Faction) -> i32 {
        match faction {
            Faction::Aliens => self.alien_build_points,
            Faction::Humans => self.human_build_points,
            Faction::None => 0,
        }
    }
}
