//! The filler job engine: owns the volume, mode, job status and energy gate,
//! and drives the active pattern one energy-gated step at a time.
//!
//! # Architecture
//!
//! The `FillerEngine` owns:
//! - A [`Volume`] (the box being transformed)
//! - A [`MaterialSupply`] (grid recipe slots + consumable input slots)
//! - An [`EnergyGate`] (admission control for steps)
//! - A [`ModeController`] (external On/Off/Loop switch)
//! - The job status: `done`, and the transient `force_done`
//!
//! It holds the [`PatternRegistry`] and the active pattern by shared handle;
//! pattern instances belong to the registry.
//!
//! # Tick
//!
//! Each `tick()`:
//! 1. **Open** -- advance the tick counter, open the gate's receive window.
//! 2. **Restart** -- if the job is done, restart it under `Loop`, otherwise idle.
//! 3. **Work** -- while a full step cost can be withdrawn, run one pattern
//!    step. Suspension only ever happens between steps.
//!
//! # Authority
//!
//! An engine built with [`Authority::Observer`] mirrors an authoritative
//! engine through [`FillerEngine::apply_sync`] and never mutates job state on
//! its own: recomputation, ticking and mode changes are no-ops there.

use std::sync::Arc;

use filler_power::EnergyGate;
use tracing::{debug, trace, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::event::EngineEvent;
use crate::fixed::{Energy, Ticks, whole_steps};
use crate::id::PatternId;
use crate::item::ItemStack;
use crate::mode::{Mode, ModeController, Trigger};
use crate::pattern::{PatternContext, PatternRegistry, SharedPattern, same_pattern};
use crate::serialize::{self, DeserializeError, FillerState, SerializeError};
use crate::supply::{MaterialSupply, Side, SupplyError};
use crate::sync::SyncPayload;
use crate::volume::{AreaSource, Volume};
use crate::world::WorldCells;

// ---------------------------------------------------------------------------
// Authority and results
// ---------------------------------------------------------------------------

/// Whether this engine is the source of truth or a mirror of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Authoritative,
    Observer,
}

/// Result of one `tick()` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Pattern steps executed this tick.
    pub steps_run: u32,
    /// The pattern reported completion during this tick.
    pub completed: bool,
    /// A completed job was restarted by `Loop` mode at the start of this tick.
    pub restarted: bool,
}

/// Result of one `do_work()` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkOutcome {
    pub steps_run: u32,
    pub completed: bool,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FillerEngine {
    config: EngineConfig,
    authority: Authority,
    registry: Arc<dyn PatternRegistry>,

    volume: Volume,
    supply: MaterialSupply,
    energy: EnergyGate,
    mode: ModeController,

    current_pattern: Option<SharedPattern>,
    /// Durable form of `current_pattern`; `PatternId::NONE` when there is none.
    current_pattern_id: PatternId,
    done: bool,
    /// Set on load; makes the next pattern swap complete the job instead of
    /// starting it.
    force_done: bool,

    tick: Ticks,
    destroyed: bool,
    events: Vec<EngineEvent>,
}

impl FillerEngine {
    /// Create an engine. The job starts done, with no volume and no pattern.
    pub fn new(
        config: EngineConfig,
        registry: Arc<dyn PatternRegistry>,
        authority: Authority,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut energy = EnergyGate::new(config.energy);
        energy.configure_perdition(config.perdition);
        Ok(Self {
            supply: MaterialSupply::new(&config.supply_layout()),
            config,
            authority,
            registry,
            volume: Volume::new(),
            energy,
            mode: ModeController::default(),
            current_pattern: None,
            current_pattern_id: PatternId::NONE,
            done: true,
            force_done: false,
            tick: 0,
            destroyed: false,
            events: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn is_authoritative(&self) -> bool {
        self.authority == Authority::Authoritative
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn supply(&self) -> &MaterialSupply {
        &self.supply
    }

    pub fn energy(&self) -> &EnergyGate {
        &self.energy
    }

    /// Mutable gate access for the outside power-distribution collaborator.
    pub fn energy_mut(&mut self) -> &mut EnergyGate {
        &mut self.energy
    }

    /// Offer energy to the gate. Returns the amount accepted.
    pub fn receive_energy(&mut self, amount: Energy) -> Energy {
        self.energy.receive(amount)
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn current_pattern(&self) -> Option<&SharedPattern> {
        self.current_pattern.as_ref()
    }

    pub fn current_pattern_id(&self) -> PatternId {
        self.current_pattern_id
    }

    pub fn tick_count(&self) -> Ticks {
        self.tick
    }

    /// Steps the stored energy would pay for right now.
    pub fn affordable_steps(&self) -> u32 {
        whole_steps(self.energy.stored(), self.config.step_cost)
    }

    /// Whether the machine is working or waiting to work.
    pub fn is_active(&self) -> bool {
        !self.done && !self.mode.suspended()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Events queued since the last drain.
    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Take all queued events.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    fn push_refresh_and_sync(&mut self) {
        self.events.push(EngineEvent::Refresh);
        let payload = self.description();
        self.events.push(EngineEvent::Sync(payload));
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// First-tick initialization: claim an area from `area` if the volume is
    /// still uninitialized, then select a pattern for the current supply.
    pub fn initialize(&mut self, area: Option<&mut dyn AreaSource>) {
        if self.is_authoritative() {
            if let Some(source) = area {
                match self.volume.initialize_from_area(source) {
                    Ok(true) => {
                        if let Some(bounds) = self.volume.bounds().copied() {
                            self.events.push(EngineEvent::MarkersCreated { bounds });
                        }
                        let payload = self.description();
                        self.events.push(EngineEvent::Sync(payload));
                    }
                    Ok(false) => {}
                    Err(error) => {
                        debug!(%error, "area source ignored");
                    }
                }
            }
        }

        self.recompute_pattern();
    }

    /// Remove the boundary markers. Call when the machine is broken or
    /// unloaded. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if self.volume.is_initialized() {
            self.events.push(EngineEvent::MarkersRemoved);
        }
    }

    // -----------------------------------------------------------------------
    // Pattern selection
    // -----------------------------------------------------------------------

    /// Re-select the active pattern for the current supply contents.
    ///
    /// Keeping the same pattern (by id) is a no-op, so in-progress work is
    /// preserved. A swap to no pattern, or any swap while `force_done` is
    /// pending, completes the job unless the mode is `Loop`; a swap to a new
    /// pattern otherwise starts the job fresh.
    pub fn recompute_pattern(&mut self) {
        if !self.is_authoritative() {
            return;
        }

        let new_pattern = self.registry.find_matching(&self.supply);
        if same_pattern(new_pattern.as_ref(), self.current_pattern.as_ref()) {
            return;
        }

        let from = self.current_pattern_id;
        self.current_pattern = new_pattern;

        if self.current_pattern.is_none() || self.force_done {
            self.done = !self.mode.restarts();
            self.force_done = false;
        } else {
            self.done = false;
        }

        self.current_pattern_id = self
            .current_pattern
            .as_ref()
            .map_or(PatternId::NONE, |p| p.id());

        debug!(
            from = from.0,
            to = self.current_pattern_id.0,
            done = self.done,
            "pattern changed"
        );
        self.events.push(EngineEvent::PatternChanged {
            from,
            to: self.current_pattern_id,
        });
        self.push_refresh_and_sync();
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance by one scheduling tick.
    pub fn tick(&mut self, world: &mut dyn WorldCells) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if !self.is_authoritative() {
            return outcome;
        }

        self.tick += 1;
        self.energy.begin_tick();

        if self.done {
            if !self.mode.restarts() {
                return outcome;
            }
            self.done = false;
            outcome.restarted = true;
            debug!(pattern = self.current_pattern_id.0, "loop restart");
        }

        if self.energy.has(self.config.step_cost) {
            let work = self.do_work(world);
            outcome.steps_run = work.steps_run;
            outcome.completed = work.completed;
        }
        outcome
    }

    /// Run energy-gated steps while the gate holds a full step cost.
    ///
    /// Each iteration withdraws the step cost before anything else. The
    /// withdrawn energy is spent even when there is no volume or pattern to
    /// run, or the job has already completed; only real pattern invocations
    /// count as steps.
    pub fn do_work(&mut self, world: &mut dyn WorldCells) -> WorkOutcome {
        let mut outcome = WorkOutcome::default();
        let cost = self.config.step_cost;

        while self.is_authoritative() && !self.mode.suspended() {
            if self.energy.try_consume(cost, cost) < cost {
                trace!(stored = %self.energy.stored(), "step deferred");
                break;
            }
            if self.step(world) {
                outcome.steps_run += 1;
                outcome.completed |= self.done;
            }
            if !self.energy.has(cost) {
                break;
            }
        }

        if outcome.steps_run > 0 {
            trace!(steps = outcome.steps_run, stored = %self.energy.stored(), "work done");
        }
        outcome
    }

    /// One pattern invocation. Returns `false` if there was nothing to run.
    fn step(&mut self, world: &mut dyn WorldCells) -> bool {
        let Some(bounds) = self.volume.bounds().copied() else {
            return false;
        };
        let Some(pattern) = self.current_pattern.clone() else {
            return false;
        };
        if self.done {
            return false;
        }

        let slot = self.supply.first_consumable();
        let mut ctx = PatternContext {
            bounds: &bounds,
            world,
            tick: self.tick,
        };
        let stack = slot.and_then(|s| self.supply.consumable_mut(s));
        let complete = pattern.iterate(&mut ctx, stack);

        if let Some(slot) = slot {
            self.supply.clear_if_exhausted(slot);
        }

        self.done = complete;
        if complete {
            debug!(pattern = self.current_pattern_id.0, tick = self.tick, "job completed");
            self.events.push(EngineEvent::JobCompleted {
                pattern: self.current_pattern_id,
            });
            self.push_refresh_and_sync();
        }
        true
    }

    // -----------------------------------------------------------------------
    // Mode control
    // -----------------------------------------------------------------------

    /// Deliver an external trigger. Returns whether the mode changed.
    pub fn set_mode(&mut self, trigger: Trigger) -> bool {
        if !self.is_authoritative() {
            return false;
        }
        match self.mode.apply(trigger) {
            Some(from) => {
                let to = self.mode.mode();
                debug!(?from, ?to, "mode changed");
                self.events.push(EngineEvent::ModeChanged { from, to });
                true
            }
            None => false,
        }
    }

    /// Every trigger is accepted.
    pub fn allows_trigger(&self, trigger: Trigger) -> bool {
        self.mode.allows(trigger)
    }

    // -----------------------------------------------------------------------
    // Supply mutation
    // -----------------------------------------------------------------------

    /// Replace a slot's contents (overflow past the slot cap is dropped) and
    /// recompute the pattern. Returns the dropped count.
    pub fn set_slot(&mut self, slot: usize, stack: Option<ItemStack>) -> Result<u32, SupplyError> {
        let dropped = self.supply.set(slot, stack)?;
        self.recompute_pattern();
        Ok(dropped)
    }

    /// Remove up to `amount` items from a slot and recompute the pattern.
    pub fn decrease_slot(
        &mut self,
        slot: usize,
        amount: u32,
    ) -> Result<Option<ItemStack>, SupplyError> {
        let taken = self.supply.decrease(slot, amount)?;
        self.recompute_pattern();
        Ok(taken)
    }

    /// Empty a slot when its view is closed, and recompute the pattern.
    pub fn take_slot_on_close(&mut self, slot: usize) -> Result<Option<ItemStack>, SupplyError> {
        let taken = self.supply.take(slot)?;
        self.recompute_pattern();
        Ok(taken)
    }

    /// Insert through a face of the machine. Returns the count that did not
    /// fit.
    pub fn insert_from_side(
        &mut self,
        side: Side,
        slot: usize,
        stack: ItemStack,
    ) -> Result<u32, SupplyError> {
        let leftover = self.supply.insert(slot, stack, side)?;
        self.recompute_pattern();
        Ok(leftover)
    }

    /// Extract through a face of the machine.
    pub fn extract_from_side(
        &mut self,
        side: Side,
        slot: usize,
        amount: u32,
    ) -> Result<Option<ItemStack>, SupplyError> {
        if !self.supply.can_extract(slot, side) {
            if slot >= self.supply.len() {
                return Err(SupplyError::SlotOutOfRange {
                    slot,
                    len: self.supply.len(),
                });
            }
            return Err(SupplyError::NotAccessible { slot, side });
        }
        self.decrease_slot(slot, amount)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Capture the persisted record.
    pub fn save_state(&self) -> FillerState {
        FillerState {
            slots: self.supply.to_slots(),
            volume: self.volume.bounds().copied(),
            done: self.done,
            last_mode: self.mode.mode().ordinal(),
        }
    }

    /// Restore from a persisted record. The pattern is not re-selected
    /// here; `initialize` does that on the first tick after loading.
    pub fn load_state(&mut self, state: &FillerState) {
        self.supply.restore_slots(&state.slots);

        if !self.volume.restore(state.volume) && state.volume.is_some() {
            warn!(bounds = ?state.volume, "malformed persisted volume, left uninitialized");
        }

        self.done = state.done;
        let (mode, clamped) = Mode::from_ordinal(state.last_mode);
        if clamped {
            warn!(ordinal = state.last_mode, "unknown mode ordinal, using Unknown");
        }
        self.mode = ModeController::new(mode);
        self.force_done = self.done;

        debug!(
            done = self.done,
            ?mode,
            volume = self.volume.is_initialized(),
            "state loaded"
        );
    }

    /// Encode the persisted record with a versioned header.
    pub fn save_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        serialize::encode_state(&self.save_state(), self.tick)
    }

    /// Decode and restore bytes produced by [`FillerEngine::save_bytes`].
    pub fn load_bytes(&mut self, data: &[u8]) -> Result<(), DeserializeError> {
        let (header, state) = serialize::decode_state(data)?;
        self.load_state(&state);
        self.tick = header.tick;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Observer synchronization
    // -----------------------------------------------------------------------

    /// The full description sent to a (re)connecting observer.
    pub fn description(&self) -> SyncPayload {
        SyncPayload {
            bounds: self.volume.bounds().copied(),
            pattern_id: self.current_pattern_id,
            done: self.done,
        }
    }

    /// Mirror a payload from the authoritative engine. Ignored (returns
    /// `false`) on an authoritative engine.
    pub fn apply_sync(&mut self, payload: &SyncPayload) -> bool {
        if self.is_authoritative() {
            return false;
        }

        // The volume is immutable once initialized, so only the first
        // payload carrying bounds installs them.
        let mut created = None;
        if !self.volume.is_initialized() && self.volume.restore(payload.bounds) {
            created = self.volume.bounds().copied();
        }
        self.current_pattern_id = payload.pattern_id;
        self.current_pattern = self.registry.resolve(payload.pattern_id);
        self.done = payload.done;

        self.events.push(EngineEvent::Refresh);
        if let Some(bounds) = created {
            self.events.push(EngineEvent::MarkersCreated { bounds });
        }

        debug!(
            pattern = self.current_pattern_id.0,
            done = self.done,
            "observer synced"
        );
        true
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::energy;
    use crate::test_utils::*;
    use crate::volume::{Bounds, CellPos};
    use crate::world::SparseWorld;

    fn count_syncs(events: &[EngineEvent]) -> usize {
        events.iter().filter(|e| e.is_sync()).count()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn new_engine_is_idle() {
        let (engine, _) = scripted_engine();
        assert!(engine.done());
        assert_eq!(engine.current_pattern_id(), PatternId::NONE);
        assert!(!engine.volume().is_initialized());
        assert_eq!(engine.mode(), Mode::Unknown);
        assert!(!engine.is_active());
    }

    #[test]
    fn invalid_config_rejected() {
        let config = EngineConfig {
            step_cost: Energy::ZERO,
            ..test_config()
        };
        let registry = Arc::new(ScriptedRegistry::new());
        assert!(FillerEngine::new(config, registry, Authority::Authoritative).is_err());
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    #[test]
    fn initialize_claims_area_and_detaches_source() {
        let (mut engine, _) = scripted_engine();
        let mut marker = StaticArea::new(cube(4));
        engine.initialize(Some(&mut marker));

        assert!(marker.detached);
        assert_eq!(engine.volume().bounds(), Some(&cube(4)));
        let events = engine.drain_events();
        assert!(events.contains(&EngineEvent::MarkersCreated { bounds: cube(4) }));
        assert_eq!(count_syncs(&events), 1);
    }

    #[test]
    fn initialize_without_area_leaves_volume_empty() {
        let (mut engine, _) = scripted_engine();
        engine.initialize(None);
        assert!(!engine.volume().is_initialized());
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn initialize_selects_matching_pattern() {
        let (mut engine, registry) = scripted_engine();
        registry.set_match(Some(counting(7, 10)));
        engine.initialize(None);
        assert_eq!(engine.current_pattern_id(), PatternId(7));
        assert!(!engine.done());
    }

    // -----------------------------------------------------------------------
    // Pattern recomputation
    // -----------------------------------------------------------------------

    #[test]
    fn null_pattern_on_empty_supply_is_done() {
        let (mut engine, _) = scripted_engine();
        engine.recompute_pattern();
        assert!(engine.done());
        assert_eq!(engine.current_pattern_id(), PatternId::NONE);
    }

    #[test]
    fn new_pattern_starts_unfinished() {
        let (mut engine, registry) = scripted_engine();
        registry.set_match(Some(counting(3, 5)));
        engine.recompute_pattern();
        assert!(!engine.done());
        assert_eq!(engine.current_pattern_id(), PatternId(3));

        let events = engine.drain_events();
        assert!(events.contains(&EngineEvent::PatternChanged {
            from: PatternId::NONE,
            to: PatternId(3)
        }));
        assert!(events.contains(&EngineEvent::Refresh));
        assert_eq!(count_syncs(&events), 1);
    }

    #[test]
    fn recompute_is_idempotent() {
        let (mut engine, registry) = scripted_engine();
        registry.set_match(Some(counting(3, 5)));
        engine.recompute_pattern();
        engine.drain_events();

        engine.recompute_pattern();
        assert!(engine.drain_events().is_empty());
        assert_eq!(engine.current_pattern_id(), PatternId(3));
        assert!(!engine.done());
    }

    #[test]
    fn same_id_keeps_progress() {
        let (mut engine, registry) = scripted_engine();
        let mut world = SparseWorld::new();
        engine.initialize(Some(&mut StaticArea::new(cube(2))));
        registry.set_match(Some(counting(3, 10)));
        engine.recompute_pattern();
        engine.receive_energy(energy(50));
        engine.tick(&mut world);

        // A fresh instance with the same id must not reset the job.
        registry.set_match(Some(counting(3, 10)));
        engine.recompute_pattern();
        assert!(!engine.done());
        assert!(engine.drain_events().iter().all(|e| !matches!(e, EngineEvent::PatternChanged { .. })));
    }

    #[test]
    fn losing_pattern_completes_job_outside_loop() {
        let (mut engine, registry) = scripted_engine();
        registry.set_match(Some(counting(3, 5)));
        engine.recompute_pattern();
        engine.set_mode(Trigger::MachineOn);

        registry.set_match(None);
        engine.recompute_pattern();
        assert!(engine.done());
        assert_eq!(engine.current_pattern_id(), PatternId::NONE);
    }

    #[test]
    fn losing_pattern_under_loop_stays_ready() {
        let (mut engine, registry) = scripted_engine();
        engine.set_mode(Trigger::MachineLoop);
        registry.set_match(Some(counting(3, 5)));
        engine.recompute_pattern();

        registry.set_match(None);
        engine.recompute_pattern();
        assert!(!engine.done());
        assert_eq!(engine.current_pattern_id(), PatternId::NONE);
    }

    #[test]
    fn force_done_completes_next_swap_once() {
        let (mut engine, registry) = scripted_engine();
        engine.load_state(&FillerState {
            slots: Vec::new(),
            volume: None,
            done: true,
            last_mode: Mode::On.ordinal(),
        });

        registry.set_match(Some(counting(4, 5)));
        engine.recompute_pattern();
        assert!(engine.done(), "pending force_done completes the swap");

        registry.set_match(Some(counting(5, 5)));
        engine.recompute_pattern();
        assert!(!engine.done(), "force_done applies once");
    }

    #[test]
    fn observer_never_recomputes() {
        let (mut engine, registry) = observer_engine();
        registry.set_match(Some(counting(3, 5)));
        engine.recompute_pattern();
        assert_eq!(engine.current_pattern_id(), PatternId::NONE);
        assert_eq!(registry.find_calls(), 0);
    }

    // -----------------------------------------------------------------------
    // Tick and work
    // -----------------------------------------------------------------------

    fn running_engine(pattern_id: u16, complete_after: u32) -> (FillerEngine, Arc<ScriptedRegistry>) {
        let (mut engine, registry) = scripted_engine();
        registry.set_match(Some(counting(pattern_id, complete_after)));
        engine.initialize(Some(&mut StaticArea::new(cube(3))));
        engine.set_mode(Trigger::MachineOn);
        engine.drain_events();
        (engine, registry)
    }

    #[test]
    fn energy_bounds_steps_per_tick() {
        let (mut engine, _) = running_engine(7, 100);
        let mut world = SparseWorld::new();
        engine.receive_energy(energy(100));
        assert_eq!(engine.affordable_steps(), 4);

        let outcome = engine.tick(&mut world);
        assert_eq!(outcome.steps_run, 4);
        assert!(!outcome.completed);
        assert_eq!(engine.energy().stored(), Energy::ZERO);
    }

    #[test]
    fn completion_skips_pattern_but_spends_energy() {
        let (mut engine, _) = running_engine(7, 2);
        let mut world = SparseWorld::new();
        engine.receive_energy(energy(100));

        let outcome = engine.tick(&mut world);
        assert_eq!(outcome.steps_run, 2);
        assert!(outcome.completed);
        assert!(engine.done());
        assert_eq!(engine.energy().stored(), Energy::ZERO);

        let events = engine.drain_events();
        assert!(events.contains(&EngineEvent::JobCompleted { pattern: PatternId(7) }));
        assert_eq!(count_syncs(&events), 1);
    }

    #[test]
    fn insufficient_energy_defers_silently() {
        let (mut engine, _) = running_engine(7, 2);
        let mut world = SparseWorld::new();
        engine.receive_energy(energy(10));

        let before = engine.save_state();
        let outcome = engine.tick(&mut world);
        assert_eq!(outcome, TickOutcome::default());
        assert_eq!(engine.save_state(), before);
        assert_eq!(engine.energy().stored(), energy(10));

        let work = engine.do_work(&mut world);
        assert_eq!(work, WorkOutcome::default());
        assert_eq!(engine.energy().stored(), energy(10));
    }

    #[test]
    fn done_job_idles_outside_loop() {
        let (mut engine, _) = running_engine(7, 1);
        let mut world = SparseWorld::new();
        engine.receive_energy(energy(25));
        assert!(engine.tick(&mut world).completed);

        engine.receive_energy(energy(50));
        let outcome = engine.tick(&mut world);
        assert_eq!(outcome.steps_run, 0);
        assert!(!outcome.restarted);
        assert_eq!(engine.energy().stored(), energy(50));
    }

    #[test]
    fn loop_restarts_completed_job() {
        let (mut engine, _) = running_engine(7, 1);
        let mut world = SparseWorld::new();
        engine.set_mode(Trigger::MachineLoop);
        engine.receive_energy(energy(25));
        assert!(engine.tick(&mut world).completed);

        engine.receive_energy(energy(25));
        let outcome = engine.tick(&mut world);
        assert!(outcome.restarted);
        assert_eq!(outcome.steps_run, 1);
    }

    #[test]
    fn off_mode_suspends_without_losing_progress() {
        let (mut engine, _) = running_engine(7, 100);
        let mut world = SparseWorld::new();
        engine.set_mode(Trigger::MachineOff);
        assert!(!engine.is_active());

        for _ in 0..10 {
            engine.receive_energy(energy(50));
            let outcome = engine.tick(&mut world);
            assert_eq!(outcome.steps_run, 0);
            assert!(!engine.done());
        }

        engine.set_mode(Trigger::MachineOn);
        assert!(engine.tick(&mut world).steps_run > 0);
    }

    #[test]
    fn no_volume_spends_energy_without_steps() {
        let (mut engine, registry) = scripted_engine();
        registry.set_match(Some(counting(7, 1)));
        engine.initialize(None);
        let mut world = SparseWorld::new();
        engine.receive_energy(energy(100));

        let outcome = engine.tick(&mut world);
        assert_eq!(outcome.steps_run, 0);
        assert!(!engine.done());
        assert_eq!(engine.energy().stored(), Energy::ZERO);
    }

    #[test]
    fn loop_without_pattern_drains_gate() {
        let (mut engine, registry) = scripted_engine();
        let pattern = Arc::new(CountingPattern::new(PatternId(7), 100));
        registry.set_match(Some(pattern.clone()));
        engine.initialize(Some(&mut StaticArea::new(cube(3))));
        engine.set_mode(Trigger::MachineLoop);

        registry.set_match(None);
        engine.recompute_pattern();
        assert!(engine.current_pattern().is_none());
        assert!(!engine.done());

        engine.receive_energy(energy(110));
        let outcome = engine.tick(&mut SparseWorld::new());
        assert_eq!(outcome.steps_run, 0);
        assert!(!outcome.completed);
        assert_eq!(pattern.calls(), 0);
        assert_eq!(engine.energy().stored(), energy(10));
    }

    #[test]
    fn exhausted_stack_is_cleared_after_step() {
        let (mut engine, _) = running_engine(7, 100);
        let mut world = SparseWorld::new();
        engine.set_slot(9, Some(ItemStack::new(stone(), 1))).unwrap();
        engine.set_slot(10, Some(ItemStack::new(dirt(), 5))).unwrap();
        engine.receive_energy(energy(25));

        engine.tick(&mut world);
        assert_eq!(engine.supply().get(9), None);
        assert_eq!(engine.supply().get(10), Some(ItemStack::new(dirt(), 5)));
    }

    #[test]
    fn fill_pattern_fills_volume_and_completes() {
        let (mut engine, registry) = scripted_engine();
        registry.set_match(Some(Arc::new(FillPattern::new(PatternId(1)))));
        let bounds = Bounds::new(CellPos::new(0, 0, 0), CellPos::new(1, 0, 1)).unwrap();
        engine.initialize(Some(&mut StaticArea::new(bounds)));
        engine.set_slot(9, Some(ItemStack::new(stone(), 64))).unwrap();
        let mut world = SparseWorld::new();

        let mut ticks = 0;
        while !engine.done() && ticks < 20 {
            engine.receive_energy(energy(50));
            engine.tick(&mut world);
            ticks += 1;
        }
        assert!(engine.done());
        assert_eq!(world.occupied(), 4);
        assert_eq!(engine.supply().get(9).unwrap().count, 60);
    }

    #[test]
    fn observer_tick_is_inert() {
        let (mut engine, _) = observer_engine();
        let mut world = SparseWorld::new();
        engine.receive_energy(energy(100));
        assert_eq!(engine.tick(&mut world), TickOutcome::default());
        assert_eq!(engine.tick_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Mode
    // -----------------------------------------------------------------------

    #[test]
    fn mode_change_emits_event() {
        let (mut engine, _) = scripted_engine();
        assert!(engine.set_mode(Trigger::MachineLoop));
        assert!(!engine.set_mode(Trigger::MachineLoop));
        assert!(!engine.set_mode(Trigger::Other(9)));
        assert!(engine.allows_trigger(Trigger::Other(9)));
        assert_eq!(
            engine.drain_events(),
            vec![EngineEvent::ModeChanged {
                from: Mode::Unknown,
                to: Mode::Loop
            }]
        );
    }

    // -----------------------------------------------------------------------
    // Supply access through the engine
    // -----------------------------------------------------------------------

    #[test]
    fn grid_changes_drive_pattern_table() {
        let table = standard_table();
        let mut engine =
            FillerEngine::new(test_config(), table, Authority::Authoritative).unwrap();
        for slot in 0..9 {
            engine
                .insert_from_side(Side::Up, slot, ItemStack::new(brick(), 1))
                .unwrap();
        }
        assert_eq!(engine.current_pattern_id(), FILL_ID);

        engine.extract_from_side(Side::Up, 4, 1).unwrap();
        assert_eq!(engine.current_pattern_id(), PatternId::NONE);
        assert!(engine.done());
    }

    #[test]
    fn extraction_respects_faces() {
        let (mut engine, _) = scripted_engine();
        engine.set_slot(9, Some(ItemStack::new(stone(), 3))).unwrap();
        assert!(matches!(
            engine.extract_from_side(Side::Up, 9, 1),
            Err(SupplyError::NotAccessible { .. })
        ));
        assert!(matches!(
            engine.extract_from_side(Side::Down, 99, 1),
            Err(SupplyError::SlotOutOfRange { .. })
        ));
        assert_eq!(
            engine.extract_from_side(Side::Down, 9, 2).unwrap(),
            Some(ItemStack::new(stone(), 2))
        );
    }

    #[test]
    fn take_on_close_recomputes() {
        let (mut engine, registry) = scripted_engine();
        engine.set_slot(9, Some(ItemStack::new(stone(), 3))).unwrap();
        let calls = registry.find_calls();
        assert_eq!(
            engine.take_slot_on_close(9).unwrap(),
            Some(ItemStack::new(stone(), 3))
        );
        assert_eq!(registry.find_calls(), calls + 1);
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    #[test]
    fn save_load_round_trip() {
        let (mut engine, registry) = running_engine(7, 100);
        engine.set_mode(Trigger::MachineLoop);
        engine.set_slot(12, Some(ItemStack::new(stone(), 33))).unwrap();
        let bytes = engine.save_bytes().unwrap();

        let mut restored =
            FillerEngine::new(test_config(), registry, Authority::Authoritative).unwrap();
        restored.load_bytes(&bytes).unwrap();
        assert_eq!(restored.save_state(), engine.save_state());
        assert_eq!(restored.mode(), Mode::Loop);
        assert_eq!(restored.volume().bounds(), Some(&cube(3)));
    }

    #[test]
    fn load_clamps_unknown_mode_and_bad_volume() {
        let (mut engine, _) = scripted_engine();
        engine.load_state(&FillerState {
            slots: vec![None; 36],
            volume: Some(Bounds {
                min: CellPos::new(5, 5, 5),
                max: CellPos::new(0, 0, 0),
            }),
            done: false,
            last_mode: 200,
        });
        assert_eq!(engine.mode(), Mode::Unknown);
        assert!(!engine.volume().is_initialized());
        assert!(!engine.done());
    }

    #[test]
    fn reload_mid_job_resumes_with_pattern() {
        let (mut engine, registry) = running_engine(7, 100);
        let mut world = SparseWorld::new();
        engine.receive_energy(energy(50));
        engine.tick(&mut world);
        let state = engine.save_state();
        assert!(!state.done);

        let mut restored =
            FillerEngine::new(test_config(), registry, Authority::Authoritative).unwrap();
        restored.load_state(&state);
        restored.initialize(None);
        assert_eq!(restored.current_pattern_id(), PatternId(7));
        assert!(!restored.done());
    }

    #[test]
    fn reload_of_finished_job_stays_done() {
        let (mut engine, registry) = running_engine(7, 1);
        let mut world = SparseWorld::new();
        engine.receive_energy(energy(25));
        engine.tick(&mut world);
        let state = engine.save_state();
        assert!(state.done);

        let mut restored =
            FillerEngine::new(test_config(), registry, Authority::Authoritative).unwrap();
        restored.load_state(&state);
        restored.initialize(None);
        assert_eq!(restored.current_pattern_id(), PatternId(7));
        assert!(restored.done(), "force_done keeps a finished job finished");
    }

    // -----------------------------------------------------------------------
    // Observer sync
    // -----------------------------------------------------------------------

    #[test]
    fn observer_mirrors_description() {
        let (mut server, _) = running_engine(7, 100);
        server.drain_events();
        let (mut client, client_registry) = observer_engine();
        client_registry.add_known(counting(7, 100));

        assert!(client.apply_sync(&server.description()));
        assert_eq!(client.current_pattern_id(), PatternId(7));
        assert_eq!(client.current_pattern().map(|p| p.id()), Some(PatternId(7)));
        assert_eq!(client.volume().bounds(), Some(&cube(3)));
        assert!(!client.done());

        let events = client.drain_events();
        assert!(events.contains(&EngineEvent::Refresh));
        assert!(events.contains(&EngineEvent::MarkersCreated { bounds: cube(3) }));

        // A second sync with the same volume does not recreate markers.
        client.apply_sync(&server.description());
        assert!(!client
            .drain_events()
            .iter()
            .any(|e| matches!(e, EngineEvent::MarkersCreated { .. })));
    }

    #[test]
    fn authoritative_engine_ignores_sync() {
        let (mut engine, _) = scripted_engine();
        let payload = SyncPayload {
            bounds: Some(cube(2)),
            pattern_id: PatternId(3),
            done: false,
        };
        assert!(!engine.apply_sync(&payload));
        assert!(!engine.volume().is_initialized());
    }

    #[test]
    fn destroy_removes_markers_once() {
        let (mut engine, _) = running_engine(7, 100);
        engine.destroy();
        engine.destroy();
        assert_eq!(engine.drain_events(), vec![EngineEvent::MarkersRemoved]);
    }

    #[test]
    fn destroy_without_volume_is_silent() {
        let (mut engine, _) = scripted_engine();
        engine.destroy();
        assert!(engine.drain_events().is_empty());
    }
}
