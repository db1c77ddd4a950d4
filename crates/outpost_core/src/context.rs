//! Per-call simulation context.
//!
//! Every component receives a [`Ctx`] holding the clock, level counters,
//! structure table, build log, host world and event sink for the duration
//! of one call.

use rand::rngs::SmallRng;

use crate::archetype::Archetype;
use crate::data::{ArchetypeTable, BuildConfig, BuildableData};
use crate::events::{BuildableEvent, GlobalAlert, Notice};
use crate::faction::Faction;
use crate::history::BuildLog;
use crate::level::Level;
use crate::structure::{Structure, StructureId, StructureStore};
use crate::world::{ActorId, ActorSnapshot, World};

/// Mutable view of the whole simulation plus the host world.
pub struct Ctx<'a> {
    /// Archetype attributes.
    pub table: &'a ArchetypeTable,
    /// Server tunables.
    pub config: &'a BuildConfig,
    /// Level globals.
    pub level: &'a mut Level,
    /// All structures.
    pub structures: &'a mut StructureStore,
    /// Build log.
    pub history: &'a mut BuildLog,
    /// Host engine.
    pub world: &'a mut dyn World,
    /// Event sink.
    pub events: &'a mut Vec<BuildableEvent>,
    /// Seeded randomness.
    pub rng: &'a mut SmallRng,
}

impl Ctx<'_> {
    /// Current time.
    #[must_use]
    pub fn now(&self) -> u32 {
        self.level.time
    }

    /// Attributes of an archetype.
    #[must_use]
    pub fn data(&self, archetype: Archetype) -> &BuildableData {
        self.table.get(archetype)
    }

    /// Structure by handle.
    #[must_use]
    pub fn get(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(id)
    }

    /// Structure by handle, mutably.
    pub fn get_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.structures.get_mut(id)
    }

    /// Actor by id.
    #[must_use]
    pub fn actor(&self, id: ActorId) -> Option<ActorSnapshot> {
        self.world.actor(id)
    }

    /// Queue an event.
    pub fn emit(&mut self, event: BuildableEvent) {
        self.events.push(event);
    }

    /// Send a menu notice to one player.
    pub fn notify(&mut self, actor: ActorId, notice: Notice) {
        self.emit(BuildableEvent::Notify { actor, notice });
    }

    /// Send a server-wide alert.
    pub fn broadcast(&mut self, alert: GlobalAlert) {
        tracing::debug!(time = self.level.time, ?alert, "Broadcast");
        self.emit(BuildableEvent::Broadcast(alert));
    }

    /// Send a chat line to one team.
    pub fn team_message(&mut self, faction: Faction, message: String) {
        self.emit(BuildableEvent::TeamMessage { faction, message });
    }

    /// Schedule the phase think of a structure.
    pub fn schedule(&mut self, id: StructureId, at: u32) {
        if let Some(s) = self.structures.get_mut(id) {
            s.next_think = Some(at);
        }
    }

    /// Push a structure's current box and solidity into the spatial index.
    pub fn link(&mut self, id: StructureId) {
        if let Some(s) = self.structures.get(id) {
            self.world.link(id, s.bounds(), s.solid);
        }
    }

    /// Remove a structure from the spatial index.
    pub fn unlink(&mut self, id: StructureId) {
        self.world.unlink(id);
    }

    /// Unlink every structure, for occupancy checks that must ignore them.
    pub fn unlink_all(&mut self) {
        for id in self.structures.ids() {
            self.world.unlink(id);
        }
    }

    /// Relink every structure after [`Ctx::unlink_all`].
    pub fn link_all(&mut self) {
        for id in self.structures.ids() {
            self.link(id);
        }
    }
}
