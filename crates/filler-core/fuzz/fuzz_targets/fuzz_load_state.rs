#![no_main]
use filler_core::test_utils::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Must not panic -- returning Err is fine.
    let mut engine = table_engine(cube(2));
    let _ = engine.load_bytes(data);
});
