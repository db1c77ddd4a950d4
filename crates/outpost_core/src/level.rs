//! Level-wide state shared by every structure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::archetype::Archetype;
use crate::data::{ArchetypeTable, BuildConfig};
use crate::faction::Faction;
use crate::layout::LayoutRecord;
use crate::math::Vec3;
use crate::structure::{StructureId, StructureStore};
use crate::world::ActorId;

/// Operator-placed volume where nothing may be built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExclusionZone {
    /// Center.
    pub origin: Vec3,
    /// Horizontal half-extent.
    pub radius: f32,
    /// Vertical half-extent.
    pub height: f32,
}

impl ExclusionZone {
    /// Whether a candidate origin falls inside the zone.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        let d = (point - self.origin).abs();
        d.x <= self.radius && d.y <= self.radius && d.z <= self.height
    }
}

/// Exclusion zone armed for the next successful build request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingZone {
    /// Horizontal half-extent.
    pub radius: f32,
    /// Vertical half-extent.
    pub height: f32,
}

/// Layout item waiting to be spawned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSpawn {
    /// What to spawn.
    pub record: LayoutRecord,
    /// When to spawn it.
    pub due: u32,
}

/// Level globals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Level {
    /// Simulation clock in milliseconds.
    pub time: u32,
    /// Loaded map name.
    pub map: Option<String>,
    /// Remaining alien build points.
    pub alien_build_points: i32,
    /// Remaining human build points.
    pub human_build_points: i32,
    /// Live alien spawns.
    pub alien_spawns: i32,
    /// Live human spawns.
    pub human_spawns: i32,
    /// The overmind stopped announcing missing spawns.
    pub overmind_muted: bool,
    /// Next allowed human base attack alert.
    pub human_base_attack_at: u32,
    /// Placed exclusion zones.
    pub exclusion_zones: Vec<ExclusionZone>,
    /// Zone to place on the next build request.
    pub pending_zone: Option<PendingZone>,
    /// Layout items queued for spawning.
    pub pending_spawns: Vec<PendingSpawn>,
    /// Targets claimed by turrets: actor to turret.
    pub painted: BTreeMap<ActorId, StructureId>,
    /// Structures the last successful placement check will remove.
    pub removal_list: Vec<StructureId>,
    /// One-time list of requested layout names.
    pub layout_request: String,
}

impl Level {
    /// Remaining build points of a faction.
    #[must_use]
    pub const fn build_points(&self, faction: Faction) -> i32 {
        match faction {
            Faction::Aliens => self.alien_build_points,
            Faction::Humans => self.human_build_points,
            Faction::None => 0,
        }
    }

    /// Live spawns of a faction.
    #[must_use]
    pub const fn spawns(&self, faction: Faction) -> i32 {
        match faction {
            Faction::Aliens => self.alien_spawns,
            Faction::Humans => self.human_spawns,
            Faction::None => 0,
        }
    }

    /// Recount build points and spawns from the structure table.
    ///
    /// Every present structure consumes its cost until it is removed.
    pub fn recalculate(
        &mut self,
        structures: &StructureStore,
        table: &ArchetypeTable,
        config: &BuildConfig,
    ) {
        self.alien_build_points = config.max_build_points(Faction::Aliens);
        self.human_build_points = config.max_build_points(Faction::Humans);
        self.alien_spawns = 0;
        self.human_spawns = 0;

        for s in structures.iter() {
            let cost = table.get(s.archetype).build_points;
            match s.faction() {
                Faction::Aliens => self.alien_build_points -= cost,
                Faction::Humans => self.human_build_points -= cost,
                Faction::None => {}
            }
            if s.is_alive() {
                match s.archetype {
                    Archetype::AlienSpawn => self.alien_spawns += 1,
                    Archetype::HumanSpawn => self.human_spawns += 1,
                    _ => {}
                }
            }
        }

        self.alien_build_points = self.alien_build_points.max(0);
        self.human_build_points = self.human_build_points.max(0);
    }

    /// Whether `point` lies in any exclusion zone.
    #[must_use]
    pub fn in_exclusion_zone(&self, point: Vec3) -> bool {
        self.exclusion_zones.iter().any(|z| z.contains(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::Structure;

    #[test]
    fn test_zone_contains_uses_box() {
        let zone = ExclusionZone {
            origin: Vec3::ZERO,
            radius: 50.0,
            height: 20.0,
        };
        assert!(zone.contains(Vec3::new(10.0, 0.0, 0.0)));
        assert!(zone.contains(Vec3::new(50.0, -50.0, 20.0)));
        assert!(!zone.contains(Vec3::new(0.0, 0.0, 21.0)));
        assert!(!zone.contains(Vec3::new(51.0, 0.0, 0.0)));
    }

    #[test]
    fn test_recalculate_counts_costs_and_spawns() {
        let table = ArchetypeTable::standard();
        let config = BuildConfig::default();
        let mut store = StructureStore::new();
        for archetype in [Archetype::HumanSpawn, Archetype::MgTurret, Archetype::AlienSpawn] {
            let row = table.get(archetype);
            store.insert(Structure::new(archetype, Vec3::ZERO, row.mins, row.maxs, row.health));
        }
        let mut level = Level::default();
        level.recalculate(&store, &table, &config);
        assert_eq!(level.build_points(Faction::Humans), 100 - 10 - 8);
        assert_eq!(level.build_points(Faction::Aliens), 90);
        assert_eq!(level.spawns(Faction::Humans), 1);
        assert_eq!(level.spawns(Faction::Aliens), 1);
    }
}
