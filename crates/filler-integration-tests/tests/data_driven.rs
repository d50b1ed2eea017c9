//! Engines built from data directories loaded by filler-data.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filler_core::engine::{Authority, FillerEngine};
use filler_core::fixed::{Energy, energy};
use filler_core::item::ItemStack;
use filler_core::registry::PatternTableBuilder;
use filler_core::supply::Side;
use filler_core::test_utils::*;
use filler_core::world::SparseWorld;
use filler_data::{DataLoadError, load_filler_data};

fn make_test_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "filler_integration_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

fn pattern_builder() -> PatternTableBuilder {
    let mut b = PatternTableBuilder::new();
    b.register_pattern(Arc::new(FillPattern::new(FILL_ID)))
        .unwrap();
    b.register_pattern(Arc::new(ClearPattern::new(CLEAR_ID)))
        .unwrap();
    b
}

#[test]
fn data_directory_drives_a_fill_job() {
    let dir = make_test_dir("fill_job");
    fs::write(
        dir.join("engine.toml"),
        r#"
step_cost = 10.0
capacity = 200.0
max_receive = 200.0
min_extract = 10.0
stack_limit = 32
grid_whitelist = [1, 2]
"#,
    )
    .unwrap();
    fs::write(
        dir.join("patterns.ron"),
        r#"[
    (pattern: "fill", grid: [1, 1, 1, 1, 1, 1, 1, 1, 1]),
    (pattern: "clear", grid: [2, 2, 2, 2, 2, 2, 2, 2, 2]),
]"#,
    )
    .unwrap();

    let data = load_filler_data(&dir, pattern_builder()).unwrap();
    assert_eq!(data.config.stack_limit, 32);

    let mut engine =
        FillerEngine::new(data.config, Arc::new(data.table), Authority::Authoritative).unwrap();
    engine.initialize(Some(&mut StaticArea::new(cube(2))));
    load_grid(&mut engine, brick());
    assert_eq!(engine.current_pattern_id(), FILL_ID);

    let leftover = engine
        .insert_from_side(Side::East, 9, ItemStack::new(stone(), 40))
        .unwrap();
    assert_eq!(leftover, 8, "stack limit from the data file applies");

    // 200 energy at 10 per step covers 8 placements and the completion; the
    // rest is withdrawn by the idle iterations that follow.
    engine.receive_energy(energy(200));
    let outcome = engine.tick(&mut SparseWorld::new());
    assert!(outcome.completed);
    assert_eq!(outcome.steps_run, 9);
    assert_eq!(engine.energy().stored(), Energy::ZERO);

    cleanup(&dir);
}

#[test]
fn recipe_for_unregistered_pattern_fails_the_load() {
    let dir = make_test_dir("bad_recipe");
    fs::write(dir.join("engine.json"), "{}").unwrap();
    fs::write(
        dir.join("patterns.json"),
        r#"[{"pattern": "pyramid", "grid": [1, 1, 1, 1, 1, 1, 1, 1, 1]}]"#,
    )
    .unwrap();

    assert!(matches!(
        load_filler_data(&dir, pattern_builder()),
        Err(DataLoadError::UnresolvedPattern { .. })
    ));

    cleanup(&dir);
}
