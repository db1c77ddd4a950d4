//! The tick driver and public entry points.
//!
//! A [`Simulation`] owns every structure and the level globals. The host
//! engine is passed in as a [`World`] on each call, so the simulation
//! itself never holds references into the engine.
//!
//! # Determinism
//!
//! - Structures are advanced in entity-index order
//! - All randomness comes from a seeded [`SmallRng`]
//! - Waiting is expressed as stored timestamps compared to the clock
//!
//! # Example
//!
//! ```ignore
//! use outpost_core::prelude::*;
//!
//! let mut sim = Simulation::with_seed(7);
//! let outcome = sim.build_if_valid(&mut world, &builder, Archetype::Reactor, 100.0);
//! let events = sim.tick(&mut world, 100);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::archetype::Archetype;
use crate::behavior::alien::Hovel;
use crate::behavior::{self, behavior_for, LEVEL1_GRAB_TIME};
use crate::combat::damage_structure;
use crate::construction::{self, Builder};
use crate::context::Ctx;
use crate::data::{ArchetypeTable, BuildConfig};
use crate::error::{Result, SimError};
use crate::events::{BuildableEvent, Notice};
use crate::faction::Faction;
use crate::history::{BuildLog, BuildRecord};
use crate::layout::{self, LayoutChoice, LayoutRecord, LayoutStore};
use crate::level::{ExclusionZone, Level, PendingZone};
use crate::math::Vec3;
use crate::network;
use crate::placement::{self, BuildError, PlacementVerdict};
use crate::structure::{Structure, StructureId, StructureStore};
use crate::world::{ActorId, ActorSnapshot, EntityRef, World};

/// Default simulation frame length in milliseconds.
pub const FRAME_MSEC: u32 = 100;

/// Events generated during a simulation tick.
///
/// Events queued by entry points called between ticks are delivered with
/// the next tick.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Everything the host should present, in emission order.
    pub events: Vec<BuildableEvent>,
    /// Structures that finished construction this tick.
    pub completed: Vec<StructureId>,
    /// Structures that left the world this tick.
    pub removed: Vec<StructureId>,
}

/// Result of a build request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuildOutcome {
    /// The structure was placed.
    Built(StructureId),
    /// An exclusion zone was placed instead of a structure.
    ZonePlaced(ExclusionZone),
    /// The request was refused.
    Rejected(BuildError),
}

/// The structure simulation.
///
/// # Tick Order
///
/// Each tick:
/// 1. **Clock** - advance the level time
/// 2. **Layout spawns** - place queued layout items that are due
/// 3. **Structures** - in entity-index order, run the general frame step
///    then the phase think if it is due
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    tick: u64,
    seed: u64,
    table: ArchetypeTable,
    config: BuildConfig,
    level: Level,
    structures: StructureStore,
    history: BuildLog,
    #[serde(skip, default = "unseeded_rng")]
    rng: SmallRng,
    #[serde(skip)]
    events: Vec<BuildableEvent>,
}

fn unseeded_rng() -> SmallRng {
    SmallRng::seed_from_u64(0)
}

impl Simulation {
    /// Create a simulation with stock tables, default tunables and seed 0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Create a simulation with stock tables and default tunables.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_data(ArchetypeTable::standard(), BuildConfig::default(), seed)
    }

    /// Create a simulation from explicit tables.
    #[must_use]
    pub fn with_data(table: ArchetypeTable, config: BuildConfig, seed: u64) -> Self {
        let mut level = Level::default();
        let structures = StructureStore::new();
        level.recalculate(&structures, &table, &config);
        Self {
            tick: 0,
            seed,
            history: BuildLog::new(config.build_log_max_length),
            table,
            config,
            level,
            structures,
            rng: SmallRng::seed_from_u64(seed),
            events: Vec::new(),
        }
    }

    fn ctx<'a>(&'a mut self, world: &'a mut dyn World) -> Ctx<'a> {
        Ctx {
            table: &self.table,
            config: &self.config,
            level: &mut self.level,
            structures: &mut self.structures,
            history: &mut self.history,
            world,
            events: &mut self.events,
            rng: &mut self.rng,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Number of ticks run.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Simulation clock in milliseconds.
    #[must_use]
    pub const fn time(&self) -> u32 {
        self.level.time
    }

    /// All structures.
    #[must_use]
    pub fn structures(&self) -> &StructureStore {
        &self.structures
    }

    /// One structure.
    #[must_use]
    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(id)
    }

    /// Level globals.
    #[must_use]
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Archetype attributes.
    #[must_use]
    pub fn table(&self) -> &ArchetypeTable {
        &self.table
    }

    /// Server tunables.
    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Replace the server tunables and recount the budgets.
    pub fn set_config(&mut self, config: BuildConfig) {
        self.history.set_max_len(config.build_log_max_length);
        self.config = config;
        self.level
            .recalculate(&self.structures, &self.table, &self.config);
    }

    /// Build log, most recent first.
    #[must_use]
    pub fn history(&self) -> &BuildLog {
        &self.history
    }

    /// Remaining build points of a faction.
    #[must_use]
    pub const fn build_points(&self, faction: Faction) -> i32 {
        self.level.build_points(faction)
    }

    /// Drain events queued since the last tick.
    pub fn take_events(&mut self) -> Vec<BuildableEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance the simulation by `msec` milliseconds.
    ///
    /// Returns the events generated since the previous tick.
    pub fn tick(&mut self, world: &mut dyn World, msec: u32) -> TickEvents {
        self.level.time += msec;
        let growing: Vec<StructureId> = self
            .structures
            .iter()
            .filter(|s| !s.spawned)
            .map(|s| s.id)
            .collect();

        let mut ctx = self.ctx(world);
        construction::spawn_pending(&mut ctx);

        let now = ctx.now();
        for id in ctx.structures.ids() {
            behavior::frame(&mut ctx, id, msec);
            let due = ctx
                .get(id)
                .and_then(|s| s.next_think)
                .is_some_and(|at| at <= now);
            if due {
                behavior::run_think(&mut ctx, id);
            }
        }

        self.tick += 1;

        let events = std::mem::take(&mut self.events);
        let removed = events
            .iter()
            .filter_map(|e| match e {
                BuildableEvent::Removed { structure, .. } => Some(*structure),
                _ => None,
            })
            .collect();
        let completed = growing
            .into_iter()
            .filter(|&id| self.structures.get(id).is_some_and(|s| s.spawned))
            .collect();

        #[cfg(feature = "debug-validation")]
        self.validate_counters();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, time = self.level.time, state_hash = hash, "Simulation state hash");
        }

        TickEvents {
            events,
            completed,
            removed,
        }
    }

    // ========================================================================
    // Building
    // ========================================================================

    /// Validate building `archetype` in front of `actor`.
    ///
    /// A successful verdict also arms the removal list for the next build.
    pub fn can_build(
        &mut self,
        world: &mut dyn World,
        actor: &ActorSnapshot,
        archetype: Archetype,
        max_distance: f32,
    ) -> PlacementVerdict {
        let mut ctx = self.ctx(world);
        placement::validate(&mut ctx, actor, archetype, max_distance)
    }

    /// Build unconditionally for `actor`.
    pub fn build(
        &mut self,
        world: &mut dyn World,
        actor: &ActorSnapshot,
        archetype: Archetype,
        origin: Vec3,
        angles: Vec3,
    ) -> StructureId {
        let mut ctx = self.ctx(world);
        construction::build(&mut ctx, Builder::Actor(actor), archetype, origin, angles)
    }

    /// Validate and, if allowed, build.
    ///
    /// Rejections are also sent to the builder as a notice. With an armed
    /// exclusion zone the zone is placed at the candidate instead.
    pub fn build_if_valid(
        &mut self,
        world: &mut dyn World,
        actor: &ActorSnapshot,
        archetype: Archetype,
        max_distance: f32,
    ) -> BuildOutcome {
        let verdict = self.can_build(world, actor, archetype, max_distance);
        let mut ctx = self.ctx(world);

        if let Some(error) = verdict.reason() {
            tracing::debug!(actor = ?actor.id, %archetype, %error, "Build rejected");
            ctx.notify(actor.id, Notice::BuildRejected(error));
            return BuildOutcome::Rejected(error);
        }

        if let Some(zone) = ctx.level.pending_zone {
            let mut origin = verdict.origin;
            origin.z += ctx.data(archetype).mins.z;
            let zone = ExclusionZone {
                origin,
                radius: zone.radius,
                height: zone.height,
            };
            ctx.level.exclusion_zones.push(zone);
            ctx.level.removal_list.clear();
            ctx.emit(BuildableEvent::ZonePlaced(zone));
            tracing::info!(?origin, radius = zone.radius, height = zone.height, "Exclusion zone placed");
            return BuildOutcome::ZonePlaced(zone);
        }

        if verdict.warning.is_some() {
            ctx.notify(actor.id, Notice::RelayWithoutReactor);
        }
        let id = construction::build(
            &mut ctx,
            Builder::Actor(actor),
            archetype,
            verdict.origin,
            verdict.angles,
        );
        BuildOutcome::Built(id)
    }

    /// Remove the structures the last successful check planned to remove.
    pub fn free_marked(&mut self, world: &mut dyn World) {
        let mut ctx = self.ctx(world);
        construction::free_marked(&mut ctx);
    }

    /// Place a layout item now, dropped onto its surface.
    pub fn instant_build(&mut self, world: &mut dyn World, record: &LayoutRecord) -> Option<StructureId> {
        let mut ctx = self.ctx(world);
        construction::instant_build(&mut ctx, record)
    }

    /// Queue a map or layout item for spawning shortly.
    pub fn queue_layout_item(&mut self, world: &mut dyn World, record: LayoutRecord) {
        let mut ctx = self.ctx(world);
        construction::queue_layout_item(&mut ctx, record);
    }

    // ========================================================================
    // Interaction
    // ========================================================================

    /// Deal damage to a structure.
    pub fn damage(
        &mut self,
        world: &mut dyn World,
        id: StructureId,
        amount: i32,
        attacker: Option<EntityRef>,
    ) {
        let mut ctx = self.ctx(world);
        damage_structure(&mut ctx, id, amount, attacker);
    }

    /// An actor uses a structure.
    pub fn activate(&mut self, world: &mut dyn World, id: StructureId, actor: ActorId) {
        let Some(archetype) = self.structures.get(id).map(|s| s.archetype) else {
            return;
        };
        let mut ctx = self.ctx(world);
        behavior_for(archetype).activate(&mut ctx, id, actor);
    }

    /// An actor touches a structure.
    pub fn touch(&mut self, world: &mut dyn World, id: StructureId, actor: ActorId) {
        let Some(archetype) = self.structures.get(id).map(|s| s.archetype) else {
            return;
        };
        let mut ctx = self.ctx(world);
        behavior_for(archetype).touch(&mut ctx, id, actor);
    }

    /// A structure is grabbed and slows down for a moment.
    pub fn grab(&mut self, id: StructureId) {
        let now = self.level.time;
        if let Some(s) = self.structures.get_mut(id) {
            s.grabbed_until = now + LEVEL1_GRAB_TIME;
        }
    }

    /// Mark or unmark a structure for replacement.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::StructureNotFound`] for a stale handle.
    pub fn set_marked(&mut self, id: StructureId, marked: bool) -> Result<()> {
        let now = self.level.time;
        let s = self
            .structures
            .get_mut(id)
            .ok_or(SimError::StructureNotFound(id))?;
        if marked && !s.marked {
            s.mark_time = now;
        }
        s.marked = marked;
        Ok(())
    }

    /// Let `actor` out of the shelter it occupies.
    ///
    /// Returns `false` when the actor is not sheltered or the exit is blocked.
    pub fn leave_shelter(&mut self, world: &mut dyn World, actor: ActorId) -> bool {
        let Some(id) = self
            .structures
            .iter()
            .find(|s| s.archetype == Archetype::Hovel && s.occupant == Some(actor))
            .map(|s| s.id)
        else {
            return false;
        };
        let mut ctx = self.ctx(world);
        Hovel::leave(&mut ctx, id, actor)
    }

    /// Detonate every live structure of `faction`.
    pub fn self_destruct(&mut self, world: &mut dyn World, faction: Faction) {
        let mut ctx = self.ctx(world);
        construction::self_destruct(&mut ctx, faction);
    }

    /// Whether a live, spawned `archetype` lies within `range` of `point`.
    /// Human structures must also be powered.
    #[must_use]
    pub fn structure_in_range(&self, point: Vec3, range: f32, archetype: Archetype) -> bool {
        network::structure_in_range(&self.structures, point, range, archetype)
    }

    // ========================================================================
    // Exclusion zones
    // ========================================================================

    /// Place an exclusion zone on the next valid build request instead of
    /// building. `None` disarms.
    pub fn arm_exclusion_zone(&mut self, zone: Option<PendingZone>) {
        self.level.pending_zone = zone;
    }

    /// Placed exclusion zones.
    #[must_use]
    pub fn exclusion_zones(&self) -> &[ExclusionZone] {
        &self.level.exclusion_zones
    }

    /// Save the placed exclusion zones of the current map.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoMapLoaded`] without a map, or the store's error.
    pub fn save_exclusion_zones(&self, store: &mut dyn LayoutStore) -> Result<()> {
        layout::save_exclusion_zones(store, self.level.map.as_deref(), &self.level.exclusion_zones)
    }

    // ========================================================================
    // Build log and revert
    // ========================================================================

    /// Name of the actor behind a build log entry.
    #[must_use]
    pub fn build_log_name(&self, id: u32) -> &str {
        self.history.name_for(id)
    }

    /// Whether a logged structure could be put back.
    #[must_use]
    pub fn revert_can_fit(&mut self, world: &mut dyn World, record: &BuildRecord) -> bool {
        let ctx = self.ctx(world);
        construction::revert_can_fit(&ctx, record)
    }

    /// Put a logged structure back, optionally marked.
    pub fn spawn_reverted(
        &mut self,
        world: &mut dyn World,
        record: &BuildRecord,
        mark: bool,
    ) -> Option<StructureId> {
        let mut ctx = self.ctx(world);
        construction::spawn_reverted(&mut ctx, record, mark)
    }

    // ========================================================================
    // Layouts
    // ========================================================================

    /// Request layouts for the next map start, space separated.
    pub fn request_layouts(&mut self, names: &str) {
        self.level.layout_request = names.to_string();
    }

    /// Start `map`: load its exclusion zones, select a layout and queue the
    /// layout's structures.
    ///
    /// Returns the layout in use. With [`LayoutChoice::Builtin`] the host
    /// queues the map's own structures through
    /// [`Simulation::queue_layout_item`].
    ///
    /// # Errors
    ///
    /// Returns the store's error when listing or reading fails.
    pub fn load_map(
        &mut self,
        world: &mut dyn World,
        store: &dyn LayoutStore,
        map: &str,
    ) -> Result<LayoutChoice> {
        self.level.map = Some(map.to_string());
        self.level.exclusion_zones = layout::load_exclusion_zones(store, map)?;

        let auto = self.config.layout_auto;
        let choice = layout::select_layout(
            store,
            map,
            &mut self.level.layout_request,
            auto,
            &mut self.rng,
        )?;
        let records = layout::load_layout(store, map, &choice)?;
        tracing::info!(map, layout = %choice, structures = records.len(), "Map loaded");

        let mut ctx = self.ctx(world);
        for record in records {
            construction::queue_layout_item(&mut ctx, record);
        }
        Ok(choice)
    }

    /// Save every live structure as layout `name` of the current map.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoMapLoaded`] without a map, or the store's error.
    pub fn save_layout(&self, store: &mut dyn LayoutStore, name: &str) -> Result<()> {
        layout::save_layout(store, self.level.map.as_deref(), name, &self.structures)
    }

    /// Layouts available for the current map.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoMapLoaded`] without a map, or the store's error.
    pub fn list_layouts(&self, store: &dyn LayoutStore) -> Result<Vec<String>> {
        let map = self.level.map.as_deref().ok_or(SimError::NoMapLoaded)?;
        layout::list_layouts(store, map)
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Check that the level counters match a fresh recount.
    #[cfg(feature = "debug-validation")]
    fn validate_counters(&self) {
        let mut fresh = self.level.clone();
        fresh.recalculate(&self.structures, &self.table, &self.config);
        debug_assert_eq!(
            (self.level.alien_build_points, self.level.human_build_points),
            (fresh.alien_build_points, fresh.human_build_points),
            "build points out of date at tick {}",
            self.tick
        );
        debug_assert_eq!(
            (self.level.alien_spawns, self.level.human_spawns),
            (fresh.alien_spawns, fresh.human_spawns),
            "spawn counts out of date at tick {}",
            self.tick
        );
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Two simulations with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.level.time.hash(&mut hasher);
        self.level.alien_build_points.hash(&mut hasher);
        self.level.human_build_points.hash(&mut hasher);
        self.level.alien_spawns.hash(&mut hasher);
        self.level.human_spawns.hash(&mut hasher);
        self.level.pending_spawns.len().hash(&mut hasher);
        self.history.len().hash(&mut hasher);

        self.structures.len().hash(&mut hasher);
        for s in self.structures.iter() {
            s.id.hash(&mut hasher);
            s.archetype.hash(&mut hasher);
            for c in s.origin.to_array() {
                c.to_bits().hash(&mut hasher);
            }
            s.health.hash(&mut hasher);
            s.phase.hash(&mut hasher);
            s.spawned.hash(&mut hasher);
            s.powered.hash(&mut hasher);
            s.marked.hash(&mut hasher);
            s.solid.hash(&mut hasher);
            s.next_think.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the simulation state for replay or network sync.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SimError::InvalidState(format!("Failed to serialize simulation: {e}")))
    }

    /// Deserialize simulation state from bytes.
    ///
    /// The random stream is reseeded from the seed and tick count, so two
    /// peers restoring the same bytes stay in step.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let mut sim: Self = bincode::deserialize(data).map_err(|e| {
            SimError::InvalidState(format!("Failed to deserialize simulation: {e}"))
        })?;
        sim.rng = SmallRng::seed_from_u64(sim.seed ^ sim.tick);
        Ok(sim)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}
