#![no_main]
use arbitrary::Arbitrary;
use filler_core::fixed::energy;
use filler_core::item::ItemStack;
use filler_core::mode::Trigger;
use filler_core::supply::Side;
use filler_core::test_utils::*;
use filler_core::world::SparseWorld;
use libfuzzer_sys::fuzz_target;

/// A structured operation for fuzzing.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Charge { amount: u8 },
    Tick,
    Trigger { which: u8 },
    Insert { side: u8, slot: u8, material: u8, count: u8 },
    Extract { side: u8, slot: u8, count: u8 },
    SetSlot { slot: u8, material: u8, count: u8 },
    SaveLoad,
}

fuzz_target!(|ops: Vec<FuzzOp>| {
    let mut engine = table_engine(cube(3));
    let mut world = SparseWorld::new();

    for op in ops.iter().take(256) {
        match *op {
            FuzzOp::Charge { amount } => {
                engine.receive_energy(energy(i32::from(amount)));
            }
            FuzzOp::Tick => {
                engine.tick(&mut world);
            }
            FuzzOp::Trigger { which } => {
                let trigger = match which % 4 {
                    0 => Trigger::MachineOn,
                    1 => Trigger::MachineOff,
                    2 => Trigger::MachineLoop,
                    n => Trigger::Other(u32::from(n)),
                };
                engine.set_mode(trigger);
            }
            FuzzOp::Insert { side, slot, material, count } => {
                let side = Side::all()[usize::from(side % 6)];
                let stack = ItemStack::new(filler_core::id::MaterialId(u32::from(material % 6)), u32::from(count));
                let _ = engine.insert_from_side(side, usize::from(slot), stack);
            }
            FuzzOp::Extract { side, slot, count } => {
                let side = Side::all()[usize::from(side % 6)];
                let _ = engine.extract_from_side(side, usize::from(slot), u32::from(count));
            }
            FuzzOp::SetSlot { slot, material, count } => {
                let stack = ItemStack::new(filler_core::id::MaterialId(u32::from(material % 6)), u32::from(count));
                let _ = engine.set_slot(usize::from(slot), Some(stack));
            }
            FuzzOp::SaveLoad => {
                if let Ok(bytes) = engine.save_bytes() {
                    let _ = engine.load_bytes(&bytes);
                    engine.initialize(None);
                }
            }
        }

        let stored = engine.energy().stored();
        assert!(stored >= filler_core::fixed::Energy::ZERO);
        assert!(stored <= engine.energy().capacity());
    }
});
