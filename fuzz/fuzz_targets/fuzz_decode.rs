#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Some(d) = harvest_core::decode(s) {
            assert!(!d.server.is_empty());
            assert!(d.port > 0);
            let _ = d.identity();
        }
    }
});
