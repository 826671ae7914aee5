//! Filename-pattern matchers.
//!
//! This module provides:
//!
//! - [`FilenameMatcher`] -- the contract every matcher implements
//! - [`Extension`] -- single extension, plain form `doc`
//! - [`DottedExtension`] -- single extension, plain form `.doc`, strict parser
//! - [`CompoundExtension`] -- multi-extension suffix such as `*.tar.gz`
//! - [`GlobPattern`] -- arbitrary POSIX glob
//! - [`FilenamePattern`] -- enum holding any of the above for storage
//!
//! ## Identity
//!
//! Every matcher normalizes to a canonical glob string. Two matchers are
//! equal when their globs are equal, compared exactly when both are
//! case-sensitive and case-folded otherwise. A matcher also equals a plain
//! string holding its glob under the same rule. [`Hash`] always hashes the
//! case-folded glob, so matchers of any variant can share a `HashSet` or key a
//! `HashMap` and collapse into one bucket when only case differs; the first
//! inserted form is the one kept.

mod compound;
mod extension;
mod glob_pattern;

use std::fmt;
use std::hash::{Hash, Hasher};

pub use compound::CompoundExtension;
pub use extension::{DottedExtension, Extension};
pub use glob_pattern::{GlobExtension, GlobPattern};

use crate::error::MimeResult;

/// Shared contract of the filename-pattern matcher variants.
pub trait FilenameMatcher {
    /// Canonical glob text, e.g. `*.doc` or `*.tar.gz`.
    fn glob(&self) -> &str;

    fn is_case_sensitive(&self) -> bool;

    /// Test a bare file name (no directory components).
    fn matches(&self, file_name: &str) -> bool;

    /// `true` when the pattern is a multi-extension suffix.
    fn is_compound(&self) -> bool {
        false
    }

    /// Equality under the case policy of both sides.
    fn same_pattern(&self, other: &dyn FilenameMatcher) -> bool {
        globs_equal(
            self.glob(),
            self.is_case_sensitive(),
            other.glob(),
            other.is_case_sensitive(),
        )
    }
}

pub(crate) fn globs_equal(a: &str, a_sensitive: bool, b: &str, b_sensitive: bool) -> bool {
    if a_sensitive && b_sensitive {
        a == b
    } else {
        fold(a).eq(fold(b))
    }
}

fn fold(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().flat_map(char::to_lowercase)
}

pub(crate) fn hash_folded<H: Hasher>(glob: &str, state: &mut H) {
    for c in fold(glob) {
        state.write_u32(c as u32);
    }
    state.write_u8(0xff);
}

/// Equality, hashing, and display for a matcher type, all driven by
/// [`FilenameMatcher::glob`].
macro_rules! pattern_identity {
    ($ty:ty) => {
        impl<U: $crate::patterns::FilenameMatcher + ?Sized> PartialEq<U> for $ty {
            fn eq(&self, other: &U) -> bool {
                $crate::patterns::globs_equal(
                    $crate::patterns::FilenameMatcher::glob(self),
                    $crate::patterns::FilenameMatcher::is_case_sensitive(self),
                    $crate::patterns::FilenameMatcher::glob(other),
                    $crate::patterns::FilenameMatcher::is_case_sensitive(other),
                )
            }
        }

        impl Eq for $ty {}

        impl PartialEq<str> for $ty {
            fn eq(&self, other: &str) -> bool {
                let sensitive = $crate::patterns::FilenameMatcher::is_case_sensitive(self);
                $crate::patterns::globs_equal(
                    $crate::patterns::FilenameMatcher::glob(self),
                    sensitive,
                    other,
                    sensitive,
                )
            }
        }

        impl PartialEq<&str> for $ty {
            fn eq(&self, other: &&str) -> bool {
                *self == **other
            }
        }

        impl PartialEq<String> for $ty {
            fn eq(&self, other: &String) -> bool {
                *self == *other.as_str()
            }
        }

        impl std::hash::Hash for $ty {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                $crate::patterns::hash_folded(
                    $crate::patterns::FilenameMatcher::glob(self),
                    state,
                );
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::patterns::FilenameMatcher::glob(self))
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                $crate::patterns::FilenameMatcher::glob(self)
            }
        }
    };
}

pub(crate) use pattern_identity;

/// Any filename-pattern matcher.
#[derive(Debug, Clone)]
pub enum FilenamePattern {
    Extension(Extension),
    Dotted(DottedExtension),
    Compound(CompoundExtension),
    Glob(GlobPattern),
}

impl FilenamePattern {
    /// Build the most specific matcher for a glob: a single extension, a
    /// compound extension, or a general glob.
    pub fn from_glob(glob: &str, case_sensitive: bool) -> MimeResult<Self> {
        Ok(GlobPattern::new(glob, case_sensitive)?.simplify())
    }

    /// `true` for the single-extension variants (postfix patterns).
    pub fn is_postfix(&self) -> bool {
        matches!(self, FilenamePattern::Extension(_) | FilenamePattern::Dotted(_))
    }

    /// The single extension, for postfix patterns.
    pub fn as_extension(&self) -> Option<&Extension> {
        match self {
            FilenamePattern::Extension(e) => Some(e),
            FilenamePattern::Dotted(d) => Some(d.as_extension()),
            _ => None,
        }
    }

    /// Number of literal characters, used to rank competing matches.
    pub fn specificity(&self) -> usize {
        match self {
            FilenamePattern::Glob(g) => g.literal_len(),
            other => other.glob().chars().count() - 1,
        }
    }

    fn inner(&self) -> &dyn FilenameMatcher {
        match self {
            FilenamePattern::Extension(e) => e,
            FilenamePattern::Dotted(d) => d,
            FilenamePattern::Compound(c) => c,
            FilenamePattern::Glob(g) => g,
        }
    }
}

impl FilenameMatcher for FilenamePattern {
    fn glob(&self) -> &str {
        self.inner().glob()
    }

    fn is_case_sensitive(&self) -> bool {
        self.inner().is_case_sensitive()
    }

    fn matches(&self, file_name: &str) -> bool {
        self.inner().matches(file_name)
    }

    fn is_compound(&self) -> bool {
        self.inner().is_compound()
    }
}

impl<U: FilenameMatcher + ?Sized> PartialEq<U> for FilenamePattern {
    fn eq(&self, other: &U) -> bool {
        globs_equal(
            self.glob(),
            self.is_case_sensitive(),
            other.glob(),
            other.is_case_sensitive(),
        )
    }
}

impl Eq for FilenamePattern {}

impl PartialEq<str> for FilenamePattern {
    fn eq(&self, other: &str) -> bool {
        let sensitive = self.is_case_sensitive();
        globs_equal(self.glob(), sensitive, other, sensitive)
    }
}

impl PartialEq<&str> for FilenamePattern {
    fn eq(&self, other: &&str) -> bool {
        *self == **other
    }
}

impl Hash for FilenamePattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_folded(self.glob(), state);
    }
}

impl fmt::Display for FilenamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glob())
    }
}

impl From<Extension> for FilenamePattern {
    fn from(value: Extension) -> Self {
        FilenamePattern::Extension(value)
    }
}

impl From<DottedExtension> for FilenamePattern {
    fn from(value: DottedExtension) -> Self {
        FilenamePattern::Dotted(value)
    }
}

impl From<CompoundExtension> for FilenamePattern {
    fn from(value: CompoundExtension) -> Self {
        FilenamePattern::Compound(value)
    }
}

impl From<GlobPattern> for FilenamePattern {
    fn from(value: GlobPattern) -> Self {
        FilenamePattern::Glob(value)
    }
}

/// Reduce any accepted input shape to the file-name part: drops directory
/// components written with either `/` or `\`.
pub(crate) fn base_name(text: &str) -> &str {
    text.rsplit(['/', '\\']).next().unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn ext(text: &str, case_sensitive: bool) -> Extension {
        Extension::new(text, case_sensitive).unwrap()
    }

    #[test]
    fn test_case_insensitive_matchers_are_equal() {
        assert_eq!(ext("doc", false), ext("DOC", false));
    }

    #[test]
    fn test_case_sensitive_matchers_differ() {
        assert_ne!(ext("doc", true), ext("DOC", true));
    }

    #[test]
    fn test_matchers_equal_their_glob_text() {
        assert_eq!(ext("doc", false), "*.doc");
        assert_eq!(ext("doc", false), "*.DOC");
        assert_eq!(ext("DOC", true), "*.DOC");
        assert_ne!(ext("DOC", true), "*.doc");
        assert_eq!(ext("doc", true), String::from("*.doc"));
    }

    #[test]
    fn test_mixed_case_policy_folds() {
        assert_eq!(ext("doc", false), ext("DOC", true));
        assert_eq!(ext("DOC", true), ext("doc", false));
        assert_ne!(ext("doc", false), ext("docx", true));
    }

    #[test]
    fn test_cross_variant_equality() {
        let e = ext("doc", false);
        let d = DottedExtension::new(".doc", false).unwrap();
        let g = GlobPattern::new("*.doc", false).unwrap();
        assert_eq!(e, d);
        assert_eq!(d, g);
        assert_eq!(FilenamePattern::from(g.clone()), e);
    }

    #[test]
    fn test_set_collapses_case_variants() {
        let mut set = HashSet::new();
        set.insert(ext("doc", false));
        set.insert(ext("DOC", false));
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().glob(), "*.doc");
    }

    #[test]
    fn test_map_keeps_first_inserted_key_and_value() {
        let mut map = HashMap::new();
        map.insert(ext("doc", false), "word");
        map.entry(ext("DOC", false)).or_insert("shouting");
        assert_eq!(map.len(), 1);
        let (key, value) = map.iter().next().unwrap();
        assert_eq!(key.glob(), "*.doc");
        assert_eq!(*value, "word");
    }

    #[test]
    fn test_mixed_variant_set() {
        let mut set: HashSet<FilenamePattern> = HashSet::new();
        set.insert(ext("gz", false).into());
        set.insert(FilenamePattern::from_glob("*.GZ", false).unwrap());
        set.insert(FilenamePattern::from_glob("*.tar.gz", false).unwrap());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_from_glob_picks_specific_variant() {
        assert!(matches!(
            FilenamePattern::from_glob("*.png", false).unwrap(),
            FilenamePattern::Extension(_)
        ));
        assert!(matches!(
            FilenamePattern::from_glob("*.tar.gz", false).unwrap(),
            FilenamePattern::Compound(_)
        ));
        assert!(matches!(
            FilenamePattern::from_glob("[Mm]akefile", false).unwrap(),
            FilenamePattern::Glob(_)
        ));
    }

    #[test]
    fn test_postfix_classification() {
        assert!(FilenamePattern::from_glob("*.png", false).unwrap().is_postfix());
        assert!(!FilenamePattern::from_glob("*.tar.gz", false).unwrap().is_postfix());
        assert!(!FilenamePattern::from_glob("README", false).unwrap().is_postfix());
    }

    #[test]
    fn test_specificity_ranks_longer_patterns_higher() {
        let gz = FilenamePattern::from_glob("*.gz", false).unwrap();
        let tgz = FilenamePattern::from_glob("*.tar.gz", false).unwrap();
        assert!(tgz.specificity() > gz.specificity());
    }

    #[test]
    fn test_base_name_handles_both_separators() {
        assert_eq!(base_name("a/b/c.txt"), "c.txt");
        assert_eq!(base_name(r"C:\dir\c.txt"), "c.txt");
        assert_eq!(base_name("c.txt"), "c.txt");
    }
}
