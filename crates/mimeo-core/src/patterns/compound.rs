//! Multi-extension matchers such as `*.tar.gz` or `*.7z.001`.

use std::str::FromStr;

use super::{Extension, FilenameMatcher, base_name, pattern_identity};
use crate::error::{MimeError, MimeResult};

const KIND: &str = "compound extension";

/// An ordered chain of single extensions. Components are stored rightmost
/// first: for `*.7z.001` they are `*.001` (the primary, outer extension) then
/// `*.7z`.
#[derive(Debug, Clone)]
pub struct CompoundExtension {
    glob: String,
    components: Vec<Extension>,
    case_sensitive: bool,
}

impl CompoundExtension {
    /// Build from `*.a.b`, `.a.b`, a file name (`x.a.b`: everything after the
    /// first dot), or a path.
    pub fn new(text: impl AsRef<str>, case_sensitive: bool) -> MimeResult<Self> {
        let text = text.as_ref();
        let name = base_name(text);
        let chain = if let Some(rest) = name.strip_prefix("*.") {
            rest
        } else if let Some(rest) = name.strip_prefix('.') {
            rest
        } else {
            match name.split_once('.') {
                Some((_, rest)) => rest,
                None => {
                    return Err(MimeError::invalid_pattern(
                        KIND,
                        text,
                        "no extension in file name",
                    ));
                }
            }
        };
        Self::from_chain(text, chain, case_sensitive)
    }

    /// Strictly parse a multi-extension glob (`*.a.b` or `.a.b`),
    /// case-insensitive.
    pub fn parse(text: &str) -> MimeResult<Self> {
        Self::parse_with_case(text, false)
    }

    pub fn parse_with_case(text: &str, case_sensitive: bool) -> MimeResult<Self> {
        let Some(chain) = text.strip_prefix("*.").or_else(|| text.strip_prefix('.')) else {
            return Err(MimeError::invalid_pattern(
                KIND,
                text,
                "expected `*.ext1.ext2`",
            ));
        };
        Self::from_chain(text, chain, case_sensitive)
    }

    fn from_chain(text: &str, chain: &str, case_sensitive: bool) -> MimeResult<Self> {
        let components = chain
            .rsplit('.')
            .map(|part| {
                if part.is_empty() {
                    return Err(MimeError::invalid_pattern(KIND, text, "empty extension"));
                }
                Extension::new(format!("*.{part}"), case_sensitive)
                    .map_err(|_| MimeError::invalid_pattern(KIND, text, "not a literal extension"))
            })
            .collect::<MimeResult<Vec<_>>>()?;

        if components.len() < 2 {
            return Err(MimeError::invalid_pattern(
                KIND,
                text,
                "needs at least two extensions",
            ));
        }

        Ok(Self {
            glob: format!("*.{chain}"),
            components,
            case_sensitive,
        })
    }

    /// Components, rightmost (primary) first.
    pub fn components(&self) -> &[Extension] {
        &self.components
    }

    /// The outermost extension, e.g. `*.gz` for `*.tar.gz`.
    pub fn primary(&self) -> &Extension {
        &self.components[0]
    }

    /// The additional, non-primary extensions, e.g. `[*.tar]` for `*.tar.gz`.
    pub fn secondary(&self) -> &[Extension] {
        &self.components[1..]
    }

    /// Reassemble the canonical multi-extension glob from the components.
    pub fn to_glob(&self) -> String {
        let chain: Vec<&str> = self.components.iter().rev().map(Extension::ext).collect();
        format!("*.{}", chain.join("."))
    }
}

impl FilenameMatcher for CompoundExtension {
    fn glob(&self) -> &str {
        &self.glob
    }

    fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn matches(&self, file_name: &str) -> bool {
        let suffix = &self.glob[1..];
        if self.case_sensitive {
            file_name.ends_with(suffix)
        } else {
            file_name.to_lowercase().ends_with(&suffix.to_lowercase())
        }
    }

    fn is_compound(&self) -> bool {
        true
    }
}

pattern_identity!(CompoundExtension);

impl FromStr for CompoundExtension {
    type Err = MimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
