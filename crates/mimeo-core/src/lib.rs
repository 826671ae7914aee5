//! # mimeo-core
//!
//! Media type classification engine.
//!
//! Classifies:
//! - file names and paths, by glob patterns
//! - byte streams, by magic signatures
//! - files on disk, by globs, then magic, then a text/binary fallback
//! - URIs, by the file name in their path
//! - IETF media type strings, by identifier and alias
//!
//! Types come from descriptor packages merged into a [`Registry`] per
//! [`Area`]. The free `resolve_*` functions query the default area of
//! [`MimeDb::global`]; use [`MimeDb::area`] to query another one.
//!
//! ```
//! let entry = mimeo_core::resolve_path("report.doc").expect("bundled type");
//! assert_eq!(entry.media_type(), "application/vnd.ms-word");
//! ```

pub mod area;
pub mod cache;
pub mod config;
pub mod db;
pub mod entry;
pub mod error;
pub mod glob;
pub mod magic;
pub mod media_type;
pub mod one_or_many;
pub mod package;
pub mod patterns;
pub mod registry;
#[cfg(feature = "filesystem")]
pub mod scan;

use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

pub use area::Area;
pub use cache::{CacheCapacity, EntryCache};
pub use config::{ConfigError, ConfigLayer, MimeConfig};
pub use db::{AreaBinding, DEFAULT_AREA, MimeDb};
pub use entry::MimeEntry;
pub use error::{MimeError, MimeResult};
pub use magic::{MagicRule, Signature};
pub use media_type::MediaType;
pub use one_or_many::OneOrMany;
pub use package::{LoadReport, PackageFormat, PackageSource};
pub use patterns::{
    CompoundExtension, DottedExtension, Extension, FilenameMatcher, FilenamePattern, GlobPattern,
};
pub use registry::Registry;
#[cfg(feature = "filesystem")]
pub use scan::{Classified, ScanOptions, classify_tree};

fn default_area() -> Arc<Area> {
    MimeDb::global().default_area()
}

/// [`Area::resolve`] on the default area.
pub fn resolve(media_type: &MediaType) -> Option<Arc<MimeEntry>> {
    default_area().resolve(media_type)
}

/// [`Area::resolve_str`] on the default area.
pub fn resolve_str(text: &str) -> MimeResult<Option<Arc<MimeEntry>>> {
    default_area().resolve_str(text)
}

/// [`Area::resolve_parts`] on the default area.
pub fn resolve_parts(
    facet: Option<&str>,
    top_level: &str,
    subtype: &str,
) -> MimeResult<Option<Arc<MimeEntry>>> {
    default_area().resolve_parts(facet, top_level, subtype)
}

/// [`Area::resolve_pattern`] on the default area.
pub fn resolve_pattern(pattern: &str) -> MimeResult<Vec<Arc<MimeEntry>>> {
    default_area().resolve_pattern(pattern)
}

/// [`Area::resolve_path`] on the default area.
pub fn resolve_path(path: impl AsRef<Path>) -> Option<Arc<MimeEntry>> {
    default_area().resolve_path(path)
}

/// [`Area::resolve_stream`] on the default area.
pub fn resolve_stream<R: Read>(reader: R) -> io::Result<Option<Arc<MimeEntry>>> {
    default_area().resolve_stream(reader)
}

/// [`Area::resolve_file`] on the default area.
pub fn resolve_file(path: impl AsRef<Path>) -> MimeResult<Arc<MimeEntry>> {
    default_area().resolve_file(path)
}

/// [`Area::resolve_uri`] on the default area.
pub fn resolve_uri(uri: &str) -> Option<Arc<MimeEntry>> {
    default_area().resolve_uri(uri)
}
