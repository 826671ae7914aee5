//! Media type descriptor packages bundled with mimeo.
//!
//! Every file under `packages/` is embedded at build time. The reference
//! package is a shared-mime-info XML subset; the others extend it in the
//! flat type-list and `globs2` formats.
//!
//! # Usage
//!
//! ```
//! use mimeo_packages::{BUNDLED, REFERENCE_PACKAGE};
//!
//! assert!(BUNDLED.iter().any(|(name, _)| *name == REFERENCE_PACKAGE));
//! for (name, contents) in BUNDLED {
//!     println!("{}: {} bytes", name, contents.len());
//! }
//! ```

// Include the auto-generated package table from build.rs
include!(concat!(env!("OUT_DIR"), "/packages_data.rs"));

/// The package loaded first into every area that includes bundled packages.
pub const REFERENCE_PACKAGE: &str = "freedesktop.org.xml";

/// Returns the number of bundled packages.
pub fn package_count() -> usize {
    BUNDLED.len()
}

/// Looks up a bundled package by file name.
pub fn get(name: &str) -> Option<&'static str> {
    BUNDLED
        .iter()
        .find(|(package, _)| *package == name)
        .map(|(_, contents)| *contents)
}

/// Bundled package names, sorted.
pub fn names() -> impl Iterator<Item = &'static str> {
    BUNDLED.iter().map(|(name, _)| *name)
}
