//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use filler_power::EnergyConfig;

use crate::config::EngineConfig;
use crate::engine::{Authority, FillerEngine};
use crate::fixed::{Energy, energy};
use crate::id::{MaterialId, PatternId};
use crate::item::ItemStack;
use crate::pattern::{FillerPattern, PatternContext, PatternRegistry, SharedPattern};
use crate::registry::{GridRecipe, PatternTable, PatternTableBuilder};
use crate::supply::MaterialSupply;
use crate::volume::{AreaSource, Bounds, CellPos};

// ===========================================================================
// Materials
// ===========================================================================

pub fn brick() -> MaterialId {
    MaterialId(1)
}
pub fn glass() -> MaterialId {
    MaterialId(2)
}
pub fn stone() -> MaterialId {
    MaterialId(3)
}
pub fn dirt() -> MaterialId {
    MaterialId(4)
}

// ===========================================================================
// Patterns
// ===========================================================================

pub const FILL_ID: PatternId = PatternId(1);
pub const CLEAR_ID: PatternId = PatternId(2);

/// Places the consumable material into the first empty cell, bottom layer
/// first. Complete once no empty cell remains.
#[derive(Debug)]
pub struct FillPattern {
    id: PatternId,
}

impl FillPattern {
    pub fn new(id: PatternId) -> Self {
        Self { id }
    }
}

impl FillerPattern for FillPattern {
    fn id(&self) -> PatternId {
        self.id
    }

    fn name(&self) -> &str {
        "fill"
    }

    fn iterate(&self, ctx: &mut PatternContext<'_>, stack: Option<&mut ItemStack>) -> bool {
        let Some(target) = ctx.bounds.cells().find(|&p| ctx.world.cell(p).is_none()) else {
            return true;
        };
        let Some(stack) = stack else {
            return false;
        };
        if ctx.world.set_cell(target, Some(stack.material)) {
            let _ = stack.shrink(1);
        }
        false
    }
}

/// Removes the topmost occupied cell. Complete once the volume is empty.
#[derive(Debug)]
pub struct ClearPattern {
    id: PatternId,
}

impl ClearPattern {
    pub fn new(id: PatternId) -> Self {
        Self { id }
    }
}

impl FillerPattern for ClearPattern {
    fn id(&self) -> PatternId {
        self.id
    }

    fn name(&self) -> &str {
        "clear"
    }

    fn iterate(&self, ctx: &mut PatternContext<'_>, _stack: Option<&mut ItemStack>) -> bool {
        let Some(target) = ctx
            .bounds
            .cells_top_down()
            .find(|&p| ctx.world.cell(p).is_some())
        else {
            return true;
        };
        ctx.world.set_cell(target, None);
        false
    }
}

/// Touches no cells. Consumes one item per call when a stack is offered and
/// reports completion on its `complete_after`-th call.
#[derive(Debug)]
pub struct CountingPattern {
    id: PatternId,
    complete_after: u32,
    calls: AtomicU32,
}

impl CountingPattern {
    pub fn new(id: PatternId, complete_after: u32) -> Self {
        Self {
            id,
            complete_after,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl FillerPattern for CountingPattern {
    fn id(&self) -> PatternId {
        self.id
    }

    fn name(&self) -> &str {
        "counting"
    }

    fn iterate(&self, _ctx: &mut PatternContext<'_>, stack: Option<&mut ItemStack>) -> bool {
        if let Some(stack) = stack {
            let _ = stack.shrink(1);
        }
        let calls = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        calls >= self.complete_after
    }
}

pub fn counting(id: u16, complete_after: u32) -> SharedPattern {
    Arc::new(CountingPattern::new(PatternId(id), complete_after))
}

// ===========================================================================
// Registries
// ===========================================================================

/// A registry whose match is set by the test, independent of the supply.
#[derive(Debug, Default)]
pub struct ScriptedRegistry {
    current: Mutex<Option<SharedPattern>>,
    known: Mutex<Vec<SharedPattern>>,
    find_calls: AtomicUsize,
}

impl ScriptedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set what `find_matching` returns from now on. The pattern also
    /// becomes resolvable by id.
    pub fn set_match(&self, pattern: Option<SharedPattern>) {
        if let Some(p) = &pattern {
            self.add_known(p.clone());
        }
        *self.current.lock().unwrap() = pattern;
    }

    /// Make a pattern resolvable by id without matching it.
    pub fn add_known(&self, pattern: SharedPattern) {
        let mut known = self.known.lock().unwrap();
        known.retain(|p| p.id() != pattern.id());
        known.push(pattern);
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::Relaxed)
    }
}

impl PatternRegistry for ScriptedRegistry {
    fn find_matching(&self, _supply: &MaterialSupply) -> Option<SharedPattern> {
        self.find_calls.fetch_add(1, Ordering::Relaxed);
        self.current.lock().unwrap().clone()
    }

    fn resolve(&self, id: PatternId) -> Option<SharedPattern> {
        self.known
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id() == id)
            .cloned()
    }
}

/// Fill on a full brick grid, clear on a full glass grid.
pub fn standard_table() -> Arc<PatternTable> {
    let mut b = PatternTableBuilder::new();
    b.register_pattern(Arc::new(FillPattern::new(FILL_ID)))
        .unwrap();
    b.register_pattern(Arc::new(ClearPattern::new(CLEAR_ID)))
        .unwrap();
    b.add_recipe(GridRecipe::filled(9, brick()), FILL_ID)
        .unwrap();
    b.add_recipe(GridRecipe::filled(9, glass()), CLEAR_ID)
        .unwrap();
    Arc::new(b.build())
}

// ===========================================================================
// Volumes
// ===========================================================================

/// An `n`-sided cube with its low corner at the origin.
pub fn cube(n: i32) -> Bounds {
    Bounds::from_corners(CellPos::new(0, 0, 0), CellPos::new(n - 1, n - 1, n - 1))
}

/// A marker-like area source that always offers the same bounds.
#[derive(Debug)]
pub struct StaticArea {
    pub bounds: Option<Bounds>,
    pub detached: bool,
}

impl StaticArea {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds: Some(bounds),
            detached: false,
        }
    }
}

impl AreaSource for StaticArea {
    fn provide_area(&self) -> Option<Bounds> {
        self.bounds
    }

    fn detach(&mut self) {
        self.detached = true;
    }
}

// ===========================================================================
// Engines
// ===========================================================================

/// Generous limits so tests control throttling through `step_cost` alone.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        step_cost: energy(25),
        energy: EnergyConfig {
            capacity: energy(1000),
            max_receive: energy(1000),
            max_extract: energy(1000),
            min_extract: Energy::ZERO,
        },
        grid_whitelist: vec![brick(), glass()],
        ..EngineConfig::default()
    }
}

pub fn scripted_engine() -> (FillerEngine, Arc<ScriptedRegistry>) {
    let registry = Arc::new(ScriptedRegistry::new());
    let engine = FillerEngine::new(test_config(), registry.clone(), Authority::Authoritative)
        .unwrap();
    (engine, registry)
}

pub fn observer_engine() -> (FillerEngine, Arc<ScriptedRegistry>) {
    let registry = Arc::new(ScriptedRegistry::new());
    let engine =
        FillerEngine::new(test_config(), registry.clone(), Authority::Observer).unwrap();
    (engine, registry)
}

/// An authoritative engine on the standard table with its volume claimed.
pub fn table_engine(bounds: Bounds) -> FillerEngine {
    let mut engine =
        FillerEngine::new(test_config(), standard_table(), Authority::Authoritative).unwrap();
    engine.initialize(Some(&mut StaticArea::new(bounds)));
    engine.drain_events();
    engine
}

/// Fill the grid with one material through the top face. Slots holding
/// something else are emptied first; slots already holding `material` are
/// left alone.
pub fn load_grid(engine: &mut FillerEngine, material: MaterialId) {
    for slot in 0..engine.config().grid_slots {
        match engine.supply().get(slot) {
            Some(stack) if stack.material == material => continue,
            Some(_) => {
                engine.take_slot_on_close(slot).unwrap();
            }
            None => {}
        }
        engine
            .insert_from_side(crate::supply::Side::Up, slot, ItemStack::new(material, 1))
            .unwrap();
    }
}
