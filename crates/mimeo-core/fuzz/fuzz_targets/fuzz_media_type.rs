//! Fuzz target for media type parsing.
//!
//! Anything that parses must print back to text that parses to an equal
//! value.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mimeo_core::MediaType;

fuzz_target!(|data: &str| {
    if let Ok(parsed) = MediaType::parse(data) {
        let text = parsed.to_string();
        let again = MediaType::parse(&text).expect("printed media type must parse");
        assert_eq!(parsed, again);
    }
});
