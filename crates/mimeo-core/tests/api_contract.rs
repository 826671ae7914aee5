//! API contract tests for mimeo-core.
//!
//! These catch accidental public API breakage by checking that the public
//! types, functions, and trait implementations stay importable with the
//! expected shape.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use mimeo_core::{
    Area, CacheCapacity, CompoundExtension, DottedExtension, Extension, FilenameMatcher,
    FilenamePattern, GlobPattern, MediaType, MimeDb, MimeEntry, MimeError, MimeResult, Registry,
};

// ============================================================================
// Public type importability
// ============================================================================

#[test]
fn public_types_are_importable() {
    let _ = std::any::type_name::<mimeo_core::Area>();
    let _ = std::any::type_name::<mimeo_core::AreaBinding>();
    let _ = std::any::type_name::<mimeo_core::CacheCapacity>();
    let _ = std::any::type_name::<mimeo_core::EntryCache>();
    let _ = std::any::type_name::<mimeo_core::MimeConfig>();
    let _ = std::any::type_name::<mimeo_core::ConfigLayer>();
    let _ = std::any::type_name::<mimeo_core::MimeDb>();
    let _ = std::any::type_name::<mimeo_core::MimeEntry>();
    let _ = std::any::type_name::<mimeo_core::MimeError>();
    let _ = std::any::type_name::<mimeo_core::MagicRule>();
    let _ = std::any::type_name::<mimeo_core::Signature>();
    let _ = std::any::type_name::<mimeo_core::MediaType>();
    let _ = std::any::type_name::<mimeo_core::OneOrMany<Extension>>();
    let _ = std::any::type_name::<mimeo_core::LoadReport>();
    let _ = std::any::type_name::<mimeo_core::PackageFormat>();
    let _ = std::any::type_name::<mimeo_core::PackageSource>();
    let _ = std::any::type_name::<mimeo_core::Registry>();
    let _ = std::any::type_name::<mimeo_core::MimeResult<()>>();

    fn _assert_matcher_trait(_: &dyn FilenameMatcher) {}
}

// ============================================================================
// Public function signatures
// ============================================================================

#[test]
fn public_functions_compile_with_expected_signatures() {
    let _: fn(&MediaType) -> Option<Arc<MimeEntry>> = mimeo_core::resolve;
    let _: fn(&str) -> MimeResult<Option<Arc<MimeEntry>>> = mimeo_core::resolve_str;
    let _: fn(Option<&str>, &str, &str) -> MimeResult<Option<Arc<MimeEntry>>> =
        mimeo_core::resolve_parts;
    let _: fn(&str) -> MimeResult<Vec<Arc<MimeEntry>>> = mimeo_core::resolve_pattern;
    let _: fn(&Path) -> Option<Arc<MimeEntry>> = |p| mimeo_core::resolve_path(p);
    let _: fn(Cursor<Vec<u8>>) -> std::io::Result<Option<Arc<MimeEntry>>> =
        mimeo_core::resolve_stream::<Cursor<Vec<u8>>>;
    let _: fn(&Path) -> MimeResult<Arc<MimeEntry>> = |p| mimeo_core::resolve_file(p);
    let _: fn(&str) -> Option<Arc<MimeEntry>> = mimeo_core::resolve_uri;
    let _: fn(&Path, &Area) -> Vec<mimeo_core::Classified> = mimeo_core::classify_tree;
    let _: fn(&Path) -> MimeResult<Registry> = mimeo_core::package::load;
    let _: fn(&str) -> MimeResult<MediaType> = MediaType::parse;
    let _: fn() -> &'static MimeDb = MimeDb::global;
}

// ============================================================================
// Matcher contracts
// ============================================================================

#[test]
fn matcher_constructors_accept_every_input_form() {
    for text in ["doc", ".doc", "*.doc", "report.doc", "/tmp/report.doc", "C:\\tmp\\report.doc"] {
        let ext = Extension::new(text, false).unwrap();
        assert_eq!(ext.glob(), "*.doc", "input {text}");
        let dotted = DottedExtension::new(text, false).unwrap();
        assert_eq!(dotted, ext);
    }
    let compound = CompoundExtension::new("archive.tar.gz", false).unwrap();
    assert_eq!(compound.glob(), "*.tar.gz");
    assert!(compound.is_compound());
}

#[test]
fn matcher_construction_is_idempotent() {
    let ext = Extension::new("doc", true).unwrap();
    let again = Extension::new(ext.glob(), true).unwrap();
    assert_eq!(ext, again);

    let glob = GlobPattern::new("*.7z.001", false).unwrap();
    let again = GlobPattern::new(glob.glob(), false).unwrap();
    assert_eq!(glob, again);
    assert!(glob.is_compound());
}

#[test]
fn matchers_hash_consistently_with_equality() {
    let mut set = HashSet::new();
    set.insert(FilenamePattern::from_glob("*.DOC", false).unwrap());
    assert!(!set.insert(FilenamePattern::from_glob("*.doc", false).unwrap()));
    assert_eq!(set.len(), 1);
    // The first inserted form is kept.
    assert_eq!(set.iter().next().unwrap().glob(), "*.DOC");

    let mut map = HashMap::new();
    map.entry(Extension::new("jpg", false).unwrap()).or_insert("first");
    map.entry(Extension::new("JPG", false).unwrap()).or_insert("second");
    assert_eq!(map.len(), 1);
    assert_eq!(map.values().next(), Some(&"first"));
}

#[test]
fn case_sensitive_matchers_compare_exactly() {
    let upper = Extension::new("C", true).unwrap();
    let lower = Extension::new("c", true).unwrap();
    assert_ne!(upper, lower);
    assert!(upper.matches("main.C"));
    assert!(!upper.matches("main.c"));
    assert_eq!(upper, "*.C");
}

#[test]
fn strict_parsers_reject_wrong_forms() {
    assert!(matches!(DottedExtension::parse("doc"), Err(MimeError::InvalidPattern { .. })));
    assert!(matches!(DottedExtension::parse("*.tar.gz"), Err(MimeError::InvalidPattern { .. })));
    assert!(matches!(CompoundExtension::parse("*.gz"), Err(MimeError::InvalidPattern { .. })));
    assert!(CompoundExtension::parse("*.tar.gz").is_ok());
}

#[test]
fn compound_components_are_rightmost_first() {
    let compound = CompoundExtension::parse("*.7z.001").unwrap();
    let globs: Vec<String> = compound.components().iter().map(|c| c.glob().to_string()).collect();
    assert_eq!(globs, vec!["*.001", "*.7z"]);
    assert_eq!(compound.to_glob(), "*.7z.001");
}

// ============================================================================
// Identifier contracts
// ============================================================================

#[test]
fn media_type_round_trips_and_compares_with_text() {
    let word = MediaType::parse("application/vnd.ms-word").unwrap();
    assert_eq!(word.facet(), Some("vnd"));
    assert_eq!(word.top_level(), "application");
    assert_eq!(word.subtype(), "ms-word");
    assert_eq!(word.to_string(), "application/vnd.ms-word");
    assert_eq!(word, "application/vnd.ms-word");
    assert_eq!("application/vnd.ms-word", word);
    assert_eq!(word, String::from("application/vnd.ms-word"));

    let jpeg = MediaType::parse("image/jpeg").unwrap();
    assert_eq!(jpeg.facet(), None);
}

#[test]
fn facet_participates_in_equality() {
    let with_facet = MediaType::from_parts(Some("x"), "application", "foo").unwrap();
    let without = MediaType::parse("application/foo").unwrap();
    assert_ne!(with_facet, without);
    assert_eq!(with_facet, "application/x.foo");
}

#[test]
fn malformed_media_types_are_errors() {
    for text in ["", "image", "image/", "/png", "a/b/c", "image/p ng"] {
        assert!(
            matches!(MediaType::parse(text), Err(MimeError::MalformedMediaType { .. })),
            "{text:?} should be malformed"
        );
    }
}

// ============================================================================
// Area contracts
// ============================================================================

#[test]
fn misses_are_none_not_errors() {
    let area = Area::new("empty", Registry::new(), CacheCapacity::default());
    assert!(area.resolve_path("anything.xyz").is_none());
    assert!(area.resolve_str("application/x-nothing").unwrap().is_none());
    assert!(area.resolve_pattern("*").unwrap().is_empty());
    assert!(area.resolve_stream(Cursor::new(vec![1, 2, 3])).unwrap().is_none());
}

#[test]
fn entries_compare_with_their_media_type() {
    let db = MimeDb::new();
    let area = db.default_area();
    let entry = area.resolve_path("x.png").unwrap();
    let png = MediaType::parse("image/png").unwrap();
    assert!(*entry == png);
    assert!(png == *entry);
}
