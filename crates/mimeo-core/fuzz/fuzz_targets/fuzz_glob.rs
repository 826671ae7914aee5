//! Fuzz target for the glob compiler and file name matchers.
//!
//! Properties validated:
//! - No panics on unbalanced brackets or trailing escapes
//! - A compiled glob can be run against arbitrary names
//! - Matcher constructors reject bad input with an error

#![no_main]

use libfuzzer_sys::fuzz_target;
use mimeo_core::glob::{self, GlobFlags};
use mimeo_core::{Extension, FilenamePattern};

fuzz_target!(|data: &str| {
    if let Ok(compiled) = glob::compile(data, GlobFlags::case_insensitive()) {
        let _ = compiled.is_match(data);
        let _ = compiled.is_match("report.doc");
    }
    let _ = FilenamePattern::from_glob(data, false);
    let _ = Extension::new(data, true);
});
