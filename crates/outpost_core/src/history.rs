//! Bounded build log.
//!
//! Newest entries are at the front. Structures removed by automatic
//! deconstruction are recorded under the entry of the build that
//! displaced them and are pruned together with it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::archetype::Archetype;
use crate::math::Vec3;
use crate::structure::Structure;
use crate::world::ActorId;

/// Build log ids wrap back to 1 after this value.
pub const MAX_BUILD_ID: u32 = 1000;

/// Name reported for ids no longer in the log.
pub const EXPIRED_NAME: &str = "<buildlog entry expired>";

/// How a log entry came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildFate {
    /// Placed by a player.
    Built,
    /// Killed by the enemy or the world.
    Destroyed,
    /// Killed by a player of its own faction.
    TeamKilled,
    /// Removed to make room for another structure.
    Deconstructed,
}

/// Who is responsible for a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildActor {
    /// A player.
    Player {
        /// Player id.
        id: ActorId,
        /// Name at the time of the event.
        name: String,
    },
    /// Map geometry, layouts or anything without a player.
    World,
    /// Automatic deconstruction.
    MarkDecon,
}

impl BuildActor {
    /// Name shown in the log.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Player { name, .. } => name,
            Self::World => "<world>",
            Self::MarkDecon => "<markdecon>",
        }
    }
}

/// One build log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    /// Log id; deconstruction records have none.
    pub id: Option<u32>,
    /// Responsible party.
    pub actor: BuildActor,
    /// Structure kind.
    pub archetype: Archetype,
    /// Position.
    pub origin: Vec3,
    /// Orientation.
    pub angles: Vec3,
    /// Surface normal.
    pub normal: Vec3,
    /// Turret aim.
    pub turret_angles: Vec3,
    /// What happened.
    pub fate: BuildFate,
    /// Structures deconstructed to make room for this one.
    pub marked: Vec<BuildRecord>,
}

impl BuildRecord {
    /// Record describing `structure` at this moment.
    #[must_use]
    pub fn of(structure: &Structure, id: Option<u32>, actor: BuildActor, fate: BuildFate) -> Self {
        Self {
            id,
            actor,
            archetype: structure.archetype,
            origin: structure.origin,
            angles: structure.angles,
            normal: structure.normal,
            turret_angles: structure.turret_angles,
            fate,
            marked: Vec::new(),
        }
    }
}

/// Most-recent-first log capped at a maximum length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildLog {
    entries: VecDeque<BuildRecord>,
    last_id: u32,
    max_len: usize,
}

impl BuildLog {
    /// Create an empty log keeping at most `max_len` entries.
    #[must_use]
    pub fn new(max_len: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            last_id: 0,
            max_len,
        }
    }

    /// Allocate the next log id, wrapping after [`MAX_BUILD_ID`].
    pub fn next_id(&mut self) -> u32 {
        self.last_id += 1;
        if self.last_id > MAX_BUILD_ID {
            self.last_id = 1;
        }
        self.last_id
    }

    /// Prepend an entry and drop the oldest beyond the cap.
    pub fn push(&mut self, record: BuildRecord) {
        self.entries.push_front(record);
        self.entries.truncate(self.max_len);
    }

    /// Attach a deconstruction record to the newest entry.
    ///
    /// Returns `false` when the log is empty and the record was dropped.
    pub fn attach_marked(&mut self, record: BuildRecord) -> bool {
        match self.entries.front_mut() {
            Some(front) => {
                front.marked.push(record);
                true
            }
            None => false,
        }
    }

    /// Newest entry.
    #[must_use]
    pub fn front(&self) -> Option<&BuildRecord> {
        self.entries.front()
    }

    /// Newest entry, mutably.
    pub fn front_mut(&mut self) -> Option<&mut BuildRecord> {
        self.entries.front_mut()
    }

    /// Entry with the given id.
    #[must_use]
    pub fn find(&self, id: u32) -> Option<&BuildRecord> {
        self.entries.iter().find(|r| r.id == Some(id))
    }

    /// Name of whoever is behind log id `id`.
    #[must_use]
    pub fn name_for(&self, id: u32) -> &str {
        self.find(id).map_or(EXPIRED_NAME, |r| r.actor.name())
    }

    /// Entries newest first.
    pub fn iter(&self) -> impl Iterator<Item = &BuildRecord> {
        self.entries.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Change the cap, pruning if needed.
    pub fn set_max_len(&mut self, max_len: usize) {
        self.max_len = max_len;
        self.entries.truncate(max_len);
    }
}
