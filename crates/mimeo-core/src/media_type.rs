//! IETF media-type identifiers.
//!
//! A [`MediaType`] is three interned tokens: an optional facet (`vnd`, `x`,
//! `prs`), the top-level type, and the subtype remainder. Tokens are 4-byte
//! keys into a process-wide [`ThreadedRodeo`], so identifiers are `Copy` and
//! compare in constant time.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{MimeError, MimeResult};

static INTERNER: OnceLock<ThreadedRodeo> = OnceLock::new();

#[inline]
fn interner() -> &'static ThreadedRodeo {
    INTERNER.get_or_init(ThreadedRodeo::new)
}

/// Subtype prefixes recognized as facets, without their trailing dot.
pub const FACETS: &[&str] = &["vnd", "x", "prs"];

/// RFC 6838 caps each restricted name at 127 characters.
const MAX_NAME_LEN: usize = 127;

/// An interned string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(Spur);

impl Token {
    #[inline]
    pub fn new(text: &str) -> Self {
        Token(interner().get_or_intern(text))
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        interner().resolve(&self.0)
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0 == other.0 {
            return Ordering::Equal;
        }
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A media type such as `image/jpeg` or `application/vnd.ms-word`.
///
/// Equality is structural and the facet is significant:
/// `application/vnd.foo` and a hypothetical facet-less `application/foo`
/// never compare equal. A `MediaType` also equals a string holding its exact
/// text, and any [`MimeEntry`](crate::MimeEntry) with an equal canonical type.
///
/// Structured-syntax suffixes (`+xml`) are kept verbatim inside the subtype
/// and exposed through [`MediaType::suffix`]; they are not modeled as a
/// separate component.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaType {
    facet: Option<Token>,
    top_level: Token,
    subtype: Token,
}

impl MediaType {
    /// Parse IETF `top/subtype` text.
    pub fn parse(text: &str) -> MimeResult<Self> {
        let mut parts = text.split('/');
        let (Some(top), Some(sub), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(MimeError::malformed_media_type(
                text,
                "expected exactly one `/`",
            ));
        };
        validate_name(text, top)?;
        validate_name(text, sub)?;

        let (facet, subtype) = split_facet(sub);
        Ok(Self {
            facet: facet.map(Token::new),
            top_level: Token::new(top),
            subtype: Token::new(subtype),
        })
    }

    /// Build from components. `subtype` is the remainder after the facet.
    ///
    /// Equivalent to parsing the joined text, so a facet-less subtype that
    /// starts with a known facet prefix still gets that facet. A `facet`
    /// outside [`FACETS`] is rejected.
    pub fn from_parts(facet: Option<&str>, top_level: &str, subtype: &str) -> MimeResult<Self> {
        let full = match facet {
            Some(f) => format!("{top_level}/{f}.{subtype}"),
            None => format!("{top_level}/{subtype}"),
        };
        let parsed = Self::parse(&full)?;
        if facet.is_some() && parsed.facet() != facet {
            return Err(MimeError::malformed_media_type(&full, "unknown facet"));
        }
        Ok(parsed)
    }

    /// Facet-less type from text known to be valid.
    fn well_known(top_level: &str, subtype: &str) -> Self {
        Self {
            facet: None,
            top_level: Token::new(top_level),
            subtype: Token::new(subtype),
        }
    }

    /// `text/plain`, the root of every text type.
    pub fn text_plain() -> Self {
        Self::well_known("text", "plain")
    }

    /// `application/octet-stream`, the root of every non-inode type.
    pub fn octet_stream() -> Self {
        Self::well_known("application", "octet-stream")
    }

    /// `inode/directory`
    pub fn directory() -> Self {
        Self::well_known("inode", "directory")
    }

    pub fn facet(&self) -> Option<&'static str> {
        self.facet.map(|t| t.as_str())
    }

    pub fn top_level(&self) -> &'static str {
        self.top_level.as_str()
    }

    /// Subtype remainder, without the facet.
    pub fn subtype(&self) -> &'static str {
        self.subtype.as_str()
    }

    /// Full subtype text, facet included (`vnd.ms-word`).
    pub fn full_subtype(&self) -> String {
        match self.facet {
            Some(f) => format!("{f}.{}", self.subtype),
            None => self.subtype.as_str().to_string(),
        }
    }

    /// Structured-syntax suffix, e.g. `xml` for `image/svg+xml`.
    pub fn suffix(&self) -> Option<&'static str> {
        self.subtype
            .as_str()
            .rsplit_once('+')
            .map(|(_, suffix)| suffix)
            .filter(|s| !s.is_empty())
    }

    pub fn is_text(&self) -> bool {
        self.top_level() == "text"
    }

    /// Borrowed pieces of the subtype as written: facet, separator, remainder.
    fn subtype_chunks(&self) -> [&'static str; 3] {
        match self.facet {
            Some(f) => [f.as_str(), ".", self.subtype.as_str()],
            None => ["", "", self.subtype.as_str()],
        }
    }

    fn eq_text(&self, text: &str) -> bool {
        let Some((top, sub)) = text.split_once('/') else {
            return false;
        };
        if top != self.top_level() {
            return false;
        }
        let [facet, dot, rest] = self.subtype_chunks();
        sub.len() == facet.len() + dot.len() + rest.len()
            && sub.starts_with(facet)
            && sub[facet.len()..].starts_with(dot)
            && sub.ends_with(rest)
    }
}

fn split_facet(sub: &str) -> (Option<&str>, &str) {
    for &facet in FACETS {
        if let Some(rest) = sub
            .strip_prefix(facet)
            .and_then(|r| r.strip_prefix('.'))
            .filter(|r| !r.is_empty())
        {
            return (Some(facet), rest);
        }
    }
    (None, sub)
}

/// RFC 6838 restricted-name: alphanumeric first, then
/// `ALPHA DIGIT ! # $ & - ^ _ . +`.
fn validate_name(text: &str, name: &str) -> MimeResult<()> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err(MimeError::malformed_media_type(text, "empty token")),
        Some(c) if !c.is_ascii_alphanumeric() => {
            return Err(MimeError::malformed_media_type(
                text,
                format!("token {name:?} must start with a letter or digit"),
            ));
        }
        Some(_) => {}
    }
    if let Some(bad) =
        chars.find(|c| !(c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(*c)))
    {
        return Err(MimeError::malformed_media_type(
            text,
            format!("invalid character {bad:?} in {name:?}"),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(MimeError::malformed_media_type(text, "token too long"));
    }
    Ok(())
}

impl Ord for MediaType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.top_level.cmp(&other.top_level).then_with(|| {
            let a = self.subtype_chunks();
            let b = other.subtype_chunks();
            a.iter()
                .flat_map(|s| s.bytes())
                .cmp(b.iter().flat_map(|s| s.bytes()))
        })
    }
}

impl PartialOrd for MediaType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [facet, dot, rest] = self.subtype_chunks();
        write!(f, "{}/{facet}{dot}{rest}", self.top_level)
    }
}

impl fmt::Debug for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MediaType({self})")
    }
}

impl FromStr for MediaType {
    type Err = MimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for MediaType {
    type Error = MimeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl PartialEq<str> for MediaType {
    fn eq(&self, other: &str) -> bool {
        self.eq_text(other)
    }
}

impl PartialEq<&str> for MediaType {
    fn eq(&self, other: &&str) -> bool {
        self.eq_text(other)
    }
}

impl PartialEq<String> for MediaType {
    fn eq(&self, other: &String) -> bool {
        self.eq_text(other)
    }
}

impl PartialEq<MediaType> for str {
    fn eq(&self, other: &MediaType) -> bool {
        other.eq_text(self)
    }
}

impl PartialEq<MediaType> for &str {
    fn eq(&self, other: &MediaType) -> bool {
        other.eq_text(self)
    }
}

impl Serialize for MediaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        MediaType::parse(&text).map_err(serde::de::Error::custom)
    }
}
