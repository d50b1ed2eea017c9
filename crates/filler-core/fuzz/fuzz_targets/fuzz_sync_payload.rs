#![no_main]
use filler_core::sync::SyncPayload;
use filler_core::test_utils::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoded payloads are applied to an observer; neither step may panic.
    if let Ok(payload) = SyncPayload::decode(data) {
        let (mut observer, _) = observer_engine();
        observer.apply_sync(&payload);
    }
});
