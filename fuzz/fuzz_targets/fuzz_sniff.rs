#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = harvest_core::sniff(s);
        let _ = harvest_core::aggregate(&[s]);
    }
});
