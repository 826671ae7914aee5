//! Arbitrary POSIX glob matcher.

use super::{CompoundExtension, Extension, FilenameMatcher, FilenamePattern, pattern_identity};
use crate::error::MimeResult;
use crate::glob::{self, CompiledGlob, GlobFlags};

/// A general filename glob, compiled once at construction.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    glob: String,
    case_sensitive: bool,
    compiled: CompiledGlob,
}

/// Extension view of a [`GlobPattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobExtension<'a> {
    /// Exactly one trailing literal extension: `*.zip` gives `zip`.
    Single(&'a str),
    /// Several trailing literal extensions, rightmost first: `*.7z.001` gives
    /// `["001", "7z"]`.
    Fragments(&'a str),
    /// Not extension-shaped; the pattern itself.
    Verbatim(&'a GlobPattern),
}

impl<'a> GlobExtension<'a> {
    /// Extension fragments, rightmost first. Empty for `Verbatim`.
    pub fn fragments(&self) -> Vec<&'a str> {
        match *self {
            GlobExtension::Single(ext) => vec![ext],
            GlobExtension::Fragments(chain) => chain.rsplit('.').collect(),
            GlobExtension::Verbatim(_) => Vec::new(),
        }
    }
}

impl GlobPattern {
    /// Compile `glob`. Fails with [`MalformedPattern`](crate::MimeError::MalformedPattern)
    /// on empty or NUL-containing text.
    pub fn new(glob: impl AsRef<str>, case_sensitive: bool) -> MimeResult<Self> {
        let glob = glob.as_ref();
        let flags = if case_sensitive {
            GlobFlags::case_sensitive()
        } else {
            GlobFlags::case_insensitive()
        };
        let compiled = glob::compile(glob, flags)?;
        Ok(Self {
            glob: glob.to_string(),
            case_sensitive,
            compiled,
        })
    }

    pub fn compiled(&self) -> &CompiledGlob {
        &self.compiled
    }

    /// Decompose into trailing extensions when the pattern is `*.` followed
    /// by literal, dot-separated, non-empty fragments.
    pub fn extension(&self) -> GlobExtension<'_> {
        let Some(chain) = self.glob.strip_prefix("*.") else {
            return GlobExtension::Verbatim(self);
        };
        if chain.is_empty()
            || glob::has_wildcards(chain)
            || chain.contains('\\')
            || chain.chars().any(char::is_whitespace)
            || chain.split('.').any(str::is_empty)
        {
            return GlobExtension::Verbatim(self);
        }
        if chain.contains('.') {
            GlobExtension::Fragments(chain)
        } else {
            GlobExtension::Single(chain)
        }
    }

    /// Reduce to the most specific matcher variant.
    pub fn simplify(self) -> FilenamePattern {
        let simpler = match self.extension() {
            GlobExtension::Single(_) => Extension::new(&self.glob, self.case_sensitive)
                .ok()
                .map(FilenamePattern::Extension),
            GlobExtension::Fragments(_) => {
                CompoundExtension::parse_with_case(&self.glob, self.case_sensitive)
                    .ok()
                    .map(FilenamePattern::Compound)
            }
            GlobExtension::Verbatim(_) => None,
        };
        simpler.unwrap_or(FilenamePattern::Glob(self))
    }

    /// Number of characters that must match literally. A bracket expression
    /// counts as one; `*` and `?` count as none.
    pub fn literal_len(&self) -> usize {
        let mut len = 0;
        let mut chars = self.glob.chars();
        while let Some(c) = chars.next() {
            match c {
                '*' | '?' => {}
                '\\' => {
                    chars.next();
                    len += 1;
                }
                '[' => {
                    let mut first = true;
                    for member in chars.by_ref() {
                        if member == ']' && !first {
                            break;
                        }
                        first = first && (member == '!' || member == '^');
                    }
                    len += 1;
                }
                _ => len += 1,
            }
        }
        len
    }
}

impl FilenameMatcher for GlobPattern {
    fn glob(&self) -> &str {
        &self.glob
    }

    fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn matches(&self, file_name: &str) -> bool {
        self.compiled.is_match(file_name)
    }

    fn is_compound(&self) -> bool {
        matches!(self.extension(), GlobExtension::Fragments(_))
    }
}

pattern_identity!(GlobPattern);
