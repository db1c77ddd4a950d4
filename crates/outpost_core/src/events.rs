//! Events emitted by the structure simulation for the host to present.

use serde::{Deserialize, Serialize};

use crate::archetype::Archetype;
use crate::faction::Faction;
use crate::history::BuildFate;
use crate::level::ExclusionZone;
use crate::math::Vec3;
use crate::placement::BuildError;
use crate::structure::StructureId;
use crate::world::ActorId;

/// Server-wide alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlobalAlert {
    /// The aliens have no spawns left.
    OvermindSpawns,
    /// The overmind is nearly dead.
    OvermindDying,
    /// The overmind is being attacked.
    OvermindAttack,
    /// The human base is being attacked.
    DccAttack,
}

/// Per-player menu notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notice {
    /// A build request was refused.
    BuildRejected(BuildError),
    /// A repeater was built with no reactor to feed it.
    RelayWithoutReactor,
    /// The hovel already has an occupant.
    HovelOccupied,
    /// The hovel's exit is blocked.
    HovelBlocked,
    /// Open the armoury shop.
    ArmouryMenu,
    /// The structure has no power.
    NotPowered,
    /// The actor is standing in a spawn's exit.
    SpawnBlocking,
}

/// Weapons fired by structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weapon {
    /// Machine gun turret burst.
    MachineGun,
    /// Hive swarm.
    Hive,
    /// Trapper lock blob.
    LockBlob,
}

/// Something the host should render, play or forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BuildableEvent {
    /// A structure was placed.
    Constructed {
        /// New structure.
        structure: StructureId,
        /// Its archetype.
        archetype: Archetype,
        /// Where it stands.
        origin: Vec3,
    },
    /// A structure reached zero health.
    Destroyed {
        /// Dead structure.
        structure: StructureId,
        /// Its archetype.
        archetype: Archetype,
        /// How it died.
        fate: BuildFate,
    },
    /// Death blast visual.
    Explosion {
        /// Exploding structure.
        structure: StructureId,
        /// Blast center.
        origin: Vec3,
        /// Blast direction.
        normal: Vec3,
    },
    /// A structure left the world.
    Removed {
        /// Removed structure.
        structure: StructureId,
        /// Its archetype.
        archetype: Archetype,
    },
    /// An acid tube sprays.
    AcidSpray {
        /// Spraying tube.
        structure: StructureId,
        /// Spray direction.
        normal: Vec3,
    },
    /// A structure fires a weapon.
    FireWeapon {
        /// Firing structure.
        structure: StructureId,
        /// Weapon fired.
        weapon: Weapon,
        /// Aim direction.
        aim: Vec3,
        /// Intended target.
        target: Option<ActorId>,
    },
    /// An electric zap from a structure to an actor.
    TeslaTrail {
        /// Zapping structure.
        structure: StructureId,
        /// Zapped actor.
        target: ActorId,
    },
    /// A server-wide alert.
    Broadcast(GlobalAlert),
    /// A menu notice for one player.
    Notify {
        /// Recipient.
        actor: ActorId,
        /// Notice to show.
        notice: Notice,
    },
    /// Chat line to one team.
    TeamMessage {
        /// Recipient team.
        faction: Faction,
        /// Text.
        message: String,
    },
    /// An exclusion zone was placed instead of a structure.
    ZonePlaced(ExclusionZone),
}
