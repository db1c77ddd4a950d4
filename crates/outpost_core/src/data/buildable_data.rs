//! Archetype attribute table.

use serde::{Deserialize, Serialize};

use crate::archetype::Archetype;
use crate::error::{Result, SimError};
use crate::math::Vec3;

/// Data-driven attributes of one structure archetype.
///
/// Times are in milliseconds, distances in world units.
///
/// # Example RON
///
/// ```ron
/// BuildableData(
///     archetype: MgTurret,
///     build_points: 8,
///     build_time: 10000,
///     health: 190,
///     mins: (-25.0, -25.0, -20.0),
///     maxs: (25.0, 25.0, 20.0),
///     think_interval: 50,
///     range: 300.0,
///     damage: 4,
///     fire_interval: 100,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildableData {
    /// Archetype this row describes.
    pub archetype: Archetype,

    /// Build points consumed while the structure exists.
    pub build_points: i32,

    /// Time from placement until the structure is spawned.
    pub build_time: u32,

    /// Maximum health.
    pub health: i32,

    /// Local bounding box minimum.
    pub mins: Vec3,

    /// Local bounding box maximum.
    pub maxs: Vec3,

    /// Health regained per second while spawned and undamaged.
    #[serde(default)]
    pub regen: i32,

    /// Damage dealt by the death blast.
    #[serde(default = "default_splash_damage")]
    pub splash_damage: i32,

    /// Radius of the death blast.
    #[serde(default = "default_splash_radius")]
    pub splash_radius: f32,

    /// Delay between steady-state thinks.
    #[serde(default = "default_think_interval")]
    pub think_interval: u32,

    /// Minimum `normal.z` of the surface it is placed on.
    #[serde(default = "default_min_normal")]
    pub min_normal: f32,

    /// Whether ceiling placement is allowed.
    #[serde(default)]
    pub allow_inverted: bool,

    /// Whether the structure needs territory to build and survive.
    #[serde(default)]
    pub creep_test: bool,

    /// Half-extent of the creep-slow box.
    #[serde(default = "default_creep_size")]
    pub creep_size: f32,

    /// Whether the structure needs a network node to build and operate.
    #[serde(default)]
    pub dcc_test: bool,

    /// Whether only one may exist per faction.
    #[serde(default)]
    pub unique: bool,

    /// Attack, aura or scan range.
    #[serde(default)]
    pub range: f32,

    /// Damage per attack.
    #[serde(default)]
    pub damage: i32,

    /// Delay between attacks or attack sequences.
    #[serde(default)]
    pub fire_interval: u32,

    /// Power distribution radius for power sources.
    #[serde(default)]
    pub node_radius: Option<f32>,

    /// Territory radius for creep sources.
    #[serde(default)]
    pub territory_radius: Option<f32>,
}

/// Default death blast damage.
const fn default_splash_damage() -> i32 {
    50
}

/// Default death blast radius.
const fn default_splash_radius() -> f32 {
    100.0
}

/// Default think interval.
const fn default_think_interval() -> u32 {
    100
}

/// Default minimum surface normal.
const fn default_min_normal() -> f32 {
    0.95
}

/// Default creep-slow half-extent.
const fn default_creep_size() -> f32 {
    120.0
}

impl BuildableData {
    /// Row with default optional attributes.
    #[must_use]
    pub fn new(
        archetype: Archetype,
        build_points: i32,
        build_time: u32,
        health: i32,
        mins: Vec3,
        maxs: Vec3,
    ) -> Self {
        Self {
            archetype,
            build_points,
            build_time,
            health,
            mins,
            maxs,
            regen: 0,
            splash_damage: default_splash_damage(),
            splash_radius: default_splash_radius(),
            think_interval: default_think_interval(),
            min_normal: default_min_normal(),
            allow_inverted: false,
            creep_test: false,
            creep_size: default_creep_size(),
            dcc_test: false,
            unique: false,
            range: 0.0,
            damage: 0,
            fire_interval: 0,
            node_radius: None,
            territory_radius: None,
        }
    }

    /// Health gained per growth step while building.
    ///
    /// Growth steps happen once per second, so full health is reached
    /// when the build time elapses.
    #[must_use]
    pub fn growth_per_second(&self) -> i32 {
        if self.build_time == 0 {
            return self.health;
        }
        (self.health as f32 / (self.build_time as f32 * 0.001)).ceil() as i32
    }
}

fn sym(half_xy: f32, low: f32, high: f32) -> (Vec3, Vec3) {
    (
        Vec3::new(-half_xy, -half_xy, low),
        Vec3::new(half_xy, half_xy, high),
    )
}

/// Attribute rows for every archetype, indexed by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeTable {
    rows: Vec<BuildableData>,
}

impl ArchetypeTable {
    /// Stock attribute values.
    #[must_use]
    pub fn standard() -> Self {
        let rows = Archetype::ALL.iter().map(|&a| standard_row(a)).collect();
        Self { rows }
    }

    /// Load overrides from a RON list of rows on top of the stock values.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DataParse`] if the text is not a valid list.
    pub fn from_ron(path: &str, source: &str) -> Result<Self> {
        let overrides: Vec<BuildableData> =
            ron::from_str(source).map_err(|e| SimError::DataParse {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        let mut table = Self::standard();
        for row in overrides {
            tracing::debug!(archetype = %row.archetype, path, "Archetype override loaded");
            table.set(row);
        }
        Ok(table)
    }

    /// Replace the row of `row.archetype`.
    pub fn set(&mut self, row: BuildableData) {
        let index = row.archetype as usize - 1;
        self.rows[index] = row;
    }

    /// Attributes of an archetype.
    #[must_use]
    pub fn get(&self, archetype: Archetype) -> &BuildableData {
        &self.rows[archetype as usize - 1]
    }

    /// All rows in id order.
    pub fn iter(&self) -> impl Iterator<Item = &BuildableData> {
        self.rows.iter()
    }
}

impl Default for ArchetypeTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[allow(clippy::too_many_lines)]
fn standard_row(archetype: Archetype) -> BuildableData {
    use Archetype as A;

    let (mins, maxs) = match archetype {
        A::AlienSpawn | A::Trapper => sym(15.0, -15.0, 15.0),
        A::Barricade => sym(35.0, -15.0, 60.0),
        A::Booster => sym(26.0, -9.0, 9.0),
        A::AcidTube => sym(25.0, -25.0, 25.0),
        A::Hive => sym(35.0, -25.0, 25.0),
        A::Overmind => sym(45.0, -15.0, 95.0),
        A::Hovel => sym(50.0, -20.0, 20.0),
        A::HumanSpawn => sym(40.0, -4.0, 4.0),
        A::MgTurret => sym(25.0, -20.0, 20.0),
        A::TeslaGen => sym(22.0, -40.0, 40.0),
        A::Armoury => sym(40.0, -13.0, 50.0),
        A::Dcc => sym(35.0, -13.0, 47.0),
        A::Medistat => sym(35.0, -7.0, 7.0),
        A::Reactor => sym(50.0, -15.0, 95.0),
        A::Repeater => sym(15.0, -15.0, 25.0),
    };

    let (cost, build_time, health) = match archetype {
        A::AlienSpawn => (10, 15000, 250),
        A::Barricade => (10, 20000, 300),
        A::Booster => (12, 15000, 150),
        A::AcidTube => (8, 15000, 125),
        A::Hive => (12, 20000, 125),
        A::Trapper => (8, 12000, 50),
        A::Overmind => (0, 30000, 750),
        A::Hovel => (0, 15000, 375),
        A::HumanSpawn => (10, 10000, 310),
        A::MgTurret | A::Dcc | A::Medistat => (8, 10000, 190),
        A::TeslaGen => (10, 15000, 220),
        A::Armoury => (10, 10000, 420),
        A::Reactor => (0, 20000, 930),
        A::Repeater => (0, 10000, 250),
    };

    let mut row = BuildableData::new(archetype, cost, build_time, health, mins, maxs);

    match archetype {
        A::AlienSpawn => {
            row.regen = 8;
            row.splash_radius = 50.0;
            row.min_normal = 0.0;
            row.allow_inverted = true;
            row.territory_radius = Some(700.0);
        }
        A::Barricade => {
            row.regen = 14;
            row.splash_radius = 50.0;
            row.min_normal = 0.707;
            row.creep_test = true;
        }
        A::Booster => {
            row.regen = 8;
            row.splash_radius = 50.0;
            row.min_normal = 0.707;
            row.creep_test = true;
            row.range = 200.0;
        }
        A::AcidTube => {
            row.regen = 10;
            row.splash_damage = 6;
            row.splash_radius = 300.0;
            row.think_interval = 200;
            row.min_normal = 0.0;
            row.allow_inverted = true;
            row.creep_test = true;
            row.range = 300.0;
            row.damage = 8;
            row.fire_interval = 3000;
        }
        A::Hive => {
            row.regen = 10;
            row.splash_damage = 30;
            row.splash_radius = 200.0;
            row.think_interval = 500;
            row.min_normal = 0.0;
            row.allow_inverted = true;
            row.creep_test = true;
            row.range = 300.0;
            row.fire_interval = 5000;
        }
        A::Trapper => {
            row.regen = 6;
            row.splash_damage = 15;
            row.splash_radius = 100.0;
            row.min_normal = 0.0;
            row.allow_inverted = true;
            row.creep_test = true;
            row.creep_size = 30.0;
            row.range = 400.0;
            row.fire_interval = 1000;
        }
        A::Overmind => {
            row.regen = 6;
            row.splash_damage = 15;
            row.splash_radius = 300.0;
            row.think_interval = 1000;
            row.unique = true;
            row.range = 150.0;
            row.territory_radius = Some(700.0);
        }
        A::Hovel => {
            row.regen = 20;
            row.splash_damage = 20;
            row.splash_radius = 200.0;
            row.think_interval = 150;
            row.creep_test = true;
            row.unique = true;
        }
        A::MgTurret => {
            row.think_interval = 50;
            row.range = 300.0;
            row.damage = 4;
            row.fire_interval = 100;
        }
        A::TeslaGen => {
            row.think_interval = 150;
            row.dcc_test = true;
            row.range = 250.0;
            row.damage = 9;
            row.fire_interval = 250;
        }
        A::Reactor => {
            row.splash_damage = 200;
            row.splash_radius = 300.0;
            row.think_interval = 1000;
            row.unique = true;
            row.range = 100.0;
            row.damage = 40;
            row.node_radius = Some(1000.0);
        }
        A::Repeater => {
            row.node_radius = Some(500.0);
        }
        A::HumanSpawn | A::Armoury | A::Dcc | A::Medistat => {}
    }
    row
}
