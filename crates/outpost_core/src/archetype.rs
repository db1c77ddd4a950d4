//! Structure archetypes.
//!
//! Every structure is exactly one [`Archetype`]. The archetype fixes the
//! faction, the attribute row in [`crate::data::ArchetypeTable`] and the
//! behavior bound by [`crate::behavior::behavior_for`].

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::faction::Faction;

/// Fixed enumeration of structure kinds.
///
/// Discriminants are the stable numeric ids written to layout files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Archetype {
    /// Alien spawn point and territory source.
    AlienSpawn = 1,
    /// Alien blocking structure that shrinks when walked over.
    Barricade = 2,
    /// Alien aura granting a poison boost.
    Booster = 3,
    /// Alien area-denial acid sprayer.
    AcidTube = 4,
    /// Alien single-shot swarm launcher.
    Hive = 5,
    /// Alien predictive blob launcher.
    Trapper = 6,
    /// Alien core: territory source and attack aura.
    Overmind = 7,
    /// Alien shelter for a single builder.
    Hovel = 8,
    /// Human spawn point.
    HumanSpawn = 9,
    /// Human machine gun turret.
    MgTurret = 10,
    /// Human tesla generator.
    TeslaGen = 11,
    /// Human equipment shop.
    Armoury = 12,
    /// Human defense computer (network node).
    Dcc = 13,
    /// Human healing station.
    Medistat = 14,
    /// Human core and root power source.
    Reactor = 15,
    /// Human power relay.
    Repeater = 16,
}

impl Archetype {
    /// All archetypes in id order.
    pub const ALL: [Self; 16] = [
        Self::AlienSpawn,
        Self::Barricade,
        Self::Booster,
        Self::AcidTube,
        Self::Hive,
        Self::Trapper,
        Self::Overmind,
        Self::Hovel,
        Self::HumanSpawn,
        Self::MgTurret,
        Self::TeslaGen,
        Self::Armoury,
        Self::Dcc,
        Self::Medistat,
        Self::Reactor,
        Self::Repeater,
    ];

    /// Look up an archetype by its numeric id.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownArchetype`] for ids outside `1..=16`.
    pub fn from_id(id: i32) -> Result<Self> {
        usize::try_from(id)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(SimError::UnknownArchetype(id))
    }

    /// Stable numeric id.
    #[must_use]
    pub const fn id(self) -> i32 {
        self as i32
    }

    /// Short machine name used in logs and data files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AlienSpawn => "eggpod",
            Self::Barricade => "barricade",
            Self::Booster => "booster",
            Self::AcidTube => "acid_tube",
            Self::Hive => "hive",
            Self::Trapper => "trapper",
            Self::Overmind => "overmind",
            Self::Hovel => "hovel",
            Self::HumanSpawn => "telenode",
            Self::MgTurret => "mgturret",
            Self::TeslaGen => "tesla",
            Self::Armoury => "arm",
            Self::Dcc => "dcc",
            Self::Medistat => "medistat",
            Self::Reactor => "reactor",
            Self::Repeater => "repeater",
        }
    }

    /// Human readable name for notices.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::AlienSpawn => "Egg",
            Self::Barricade => "Barricade",
            Self::Booster => "Booster",
            Self::AcidTube => "Acid Tube",
            Self::Hive => "Hive",
            Self::Trapper => "Trapper",
            Self::Overmind => "Overmind",
            Self::Hovel => "Hovel",
            Self::HumanSpawn => "Telenode",
            Self::MgTurret => "Machinegun Turret",
            Self::TeslaGen => "Tesla Generator",
            Self::Armoury => "Armoury",
            Self::Dcc => "Defense Computer",
            Self::Medistat => "Medistation",
            Self::Reactor => "Reactor",
            Self::Repeater => "Repeater",
        }
    }

    /// Owning faction.
    #[must_use]
    pub const fn faction(self) -> Faction {
        if (self as u8) <= (Self::Hovel as u8) {
            Faction::Aliens
        } else {
            Faction::Humans
        }
    }

    /// Whether players of the faction spawn from this structure.
    #[must_use]
    pub const fn is_spawn(self) -> bool {
        matches!(self, Self::AlienSpawn | Self::HumanSpawn)
    }

    /// Whether this is a faction's core structure.
    #[must_use]
    pub const fn is_core(self) -> bool {
        matches!(self, Self::Overmind | Self::Reactor)
    }

    /// Core archetype of a faction.
    #[must_use]
    pub const fn core_of(faction: Faction) -> Option<Self> {
        match faction {
            Faction::Aliens => Some(Self::Overmind),
            Faction::Humans => Some(Self::Reactor),
            Faction::None => None,
        }
    }

    /// Spawn archetype of a faction.
    #[must_use]
    pub const fn spawn_of(faction: Faction) -> Option<Self> {
        match faction {
            Faction::Aliens => Some(Self::AlienSpawn),
            Faction::Humans => Some(Self::HumanSpawn),
            Faction::None => None,
        }
    }

    /// Whether this structure distributes power to others.
    #[must_use]
    pub const fn is_power_source(self) -> bool {
        matches!(self, Self::Reactor | Self::Repeater)
    }

    /// Whether this structure projects territory.
    #[must_use]
    pub const fn is_creep_source(self) -> bool {
        matches!(self, Self::AlienSpawn | Self::Overmind)
    }

    /// Position in the deconstruction precedence table.
    ///
    /// Lower values are removed first when nothing else decides.
    #[must_use]
    pub const fn removal_precedence(self) -> u8 {
        match self {
            Self::Barricade => 1,
            Self::AcidTube => 2,
            Self::Trapper => 3,
            Self::Hive => 4,
            Self::Booster => 5,
            Self::Hovel => 6,
            Self::AlienSpawn => 7,
            Self::Overmind => 8,
            Self::MgTurret => 9,
            Self::TeslaGen => 10,
            Self::Dcc => 11,
            Self::Medistat => 12,
            Self::Armoury => 13,
            Self::HumanSpawn => 14,
            Self::Repeater => 15,
            Self::Reactor => 16,
        }
    }
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
