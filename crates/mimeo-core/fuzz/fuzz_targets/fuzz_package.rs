//! Fuzz target for package parsing (shared-mime-info XML, IANA type lists,
//! globs2 lines).
//!
//! Malformed packages must come back as errors, never panics.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(registry) = mimeo_core::package::parse_auto("fuzz", data) {
        let _ = registry.match_file_name("fuzz.bin");
        let _ = registry.sniff(data.as_bytes());
    }
});
