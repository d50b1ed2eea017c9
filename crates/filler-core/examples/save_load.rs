//! Save/load example: persistence round-trip of a running fill job.
//!
//! Builds a pattern table with a single "floor" pattern, runs a few ticks,
//! saves the engine to bytes, loads them into a fresh engine and finishes
//! the job there.
//!
//! Run with: `cargo run -p filler-core --example save_load`

use std::sync::Arc;

use filler_core::config::EngineConfig;
use filler_core::engine::{Authority, FillerEngine};
use filler_core::fixed::energy;
use filler_core::id::{MaterialId, PatternId};
use filler_core::item::ItemStack;
use filler_core::pattern::{FillerPattern, PatternContext};
use filler_core::registry::{GridRecipe, PatternTable, PatternTableBuilder};
use filler_core::supply::Side;
use filler_core::volume::{AreaSource, Bounds, CellPos};
use filler_core::world::SparseWorld;

const PLANK: MaterialId = MaterialId(5);
const COBBLE: MaterialId = MaterialId(6);

/// Covers the bottom layer of the volume with the consumable material.
#[derive(Debug)]
struct FloorPattern;

impl FillerPattern for FloorPattern {
    fn id(&self) -> PatternId {
        PatternId(1)
    }

    fn name(&self) -> &str {
        "floor"
    }

    fn iterate(&self, ctx: &mut PatternContext<'_>, stack: Option<&mut ItemStack>) -> bool {
        let floor = ctx.bounds.min.y;
        let next = ctx
            .bounds
            .cells()
            .find(|p| p.y == floor && ctx.world.cell(*p).is_none());
        let (Some(pos), Some(stack)) = (next, stack) else {
            return next.is_none();
        };
        if ctx.world.set_cell(pos, Some(stack.material)) {
            let _ = stack.shrink(1);
        }
        false
    }
}

struct Markers(Bounds);

impl AreaSource for Markers {
    fn provide_area(&self) -> Option<Bounds> {
        Some(self.0)
    }
}

fn build_table() -> PatternTable {
    let mut builder = PatternTableBuilder::new();
    let floor = builder.register_pattern(Arc::new(FloorPattern)).unwrap();
    builder
        .add_recipe(GridRecipe::filled(9, PLANK), floor)
        .unwrap();
    builder.build()
}

fn config() -> EngineConfig {
    EngineConfig {
        grid_whitelist: vec![PLANK],
        ..EngineConfig::default()
    }
}

fn main() {
    let table = Arc::new(build_table());
    let mut world = SparseWorld::new();

    let mut engine = FillerEngine::new(config(), table.clone(), Authority::Authoritative).unwrap();
    let area = Bounds::from_corners(CellPos::new(0, 64, 0), CellPos::new(5, 66, 5));
    engine.initialize(Some(&mut Markers(area)));
    for slot in 0..9 {
        engine
            .insert_from_side(Side::Up, slot, ItemStack::new(PLANK, 1))
            .unwrap();
    }
    engine
        .insert_from_side(Side::West, 9, ItemStack::new(COBBLE, 64))
        .unwrap();

    for _ in 0..5 {
        engine.receive_energy(energy(50));
        engine.tick(&mut world);
    }
    println!(
        "before save: {} cells placed, pattern {:?}, done = {}",
        world.occupied(),
        engine.current_pattern_id(),
        engine.done()
    );

    let bytes = engine.save_bytes().unwrap();
    println!("saved {} bytes", bytes.len());

    let mut restored = FillerEngine::new(config(), table, Authority::Authoritative).unwrap();
    restored.load_bytes(&bytes).unwrap();
    restored.initialize(None);
    assert_eq!(restored.save_state(), engine.save_state());

    let mut ticks = 0;
    while !restored.done() {
        restored.receive_energy(energy(50));
        restored.tick(&mut world);
        ticks += 1;
    }
    println!(
        "after load: finished in {ticks} more ticks, {} cells placed, {} cobble left",
        world.occupied(),
        restored.supply().get(9).map_or(0, |s| s.count)
    );
}
