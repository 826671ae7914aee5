//! Registry entries: everything known about one media type.

use std::collections::HashSet;

use crate::error::MimeResult;
use crate::magic::Signature;
use crate::media_type::MediaType;
use crate::one_or_many::OneOrMany;
use crate::patterns::{Extension, FilenameMatcher, FilenamePattern};

/// A canonical media type with its aliases, filename patterns, content
/// signatures, and declared parents.
///
/// Pattern collections stay `None` until the first pattern arrives, then hold
/// a single value, then upgrade to a set. An entry without postfix patterns
/// never has a primary extension.
#[derive(Debug, Clone)]
pub struct MimeEntry {
    media_type: MediaType,
    aliases: Option<HashSet<MediaType>>,
    postfixes: Option<OneOrMany<Extension>>,
    complexes: Option<OneOrMany<FilenamePattern>>,
    signatures: Option<OneOrMany<Signature>>,
    primary_extension: Option<String>,
    parents: Vec<MediaType>,
    comment: Option<String>,
}

impl MimeEntry {
    pub fn new(media_type: MediaType) -> Self {
        Self {
            media_type,
            aliases: None,
            postfixes: None,
            complexes: None,
            signatures: None,
            primary_extension: None,
            parents: Vec::new(),
            comment: None,
        }
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn aliases(&self) -> Option<&HashSet<MediaType>> {
        self.aliases.as_ref()
    }

    pub fn postfixes(&self) -> Option<&OneOrMany<Extension>> {
        self.postfixes.as_ref()
    }

    pub fn complexes(&self) -> Option<&OneOrMany<FilenamePattern>> {
        self.complexes.as_ref()
    }

    pub fn signatures(&self) -> Option<&OneOrMany<Signature>> {
        self.signatures.as_ref()
    }

    /// Plain form of the first postfix pattern added.
    pub fn primary_extension(&self) -> Option<&str> {
        self.primary_extension.as_deref()
    }

    pub fn parents(&self) -> &[MediaType] {
        &self.parents
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Every filename pattern, postfixes first.
    pub fn patterns(&self) -> impl Iterator<Item = &dyn FilenameMatcher> {
        let postfixes = self
            .postfixes
            .iter()
            .flat_map(|p| p.iter())
            .map(|e| e as &dyn FilenameMatcher);
        let complexes = self
            .complexes
            .iter()
            .flat_map(|c| c.iter())
            .map(|c| c as &dyn FilenameMatcher);
        postfixes.chain(complexes)
    }

    /// `true` if the entry's type or one of its aliases is `media_type`.
    pub fn answers_to(&self, media_type: &MediaType) -> bool {
        self.media_type == *media_type
            || self.aliases.as_ref().is_some_and(|a| a.contains(media_type))
    }

    /// Add a filename pattern. Single-extension patterns become postfixes;
    /// everything else, compound extensions included, is complex. Returns
    /// `false` if an equal pattern was already present.
    pub fn add_pattern(&mut self, pattern: impl Into<FilenamePattern>) -> bool {
        let pattern = pattern.into();
        match pattern.as_extension() {
            Some(ext) => {
                let ext = ext.clone();
                if self.primary_extension.is_none() {
                    self.primary_extension = Some(ext.plain().to_string());
                }
                OneOrMany::insert_into(&mut self.postfixes, ext)
            }
            None => OneOrMany::insert_into(&mut self.complexes, pattern),
        }
    }

    /// Compile `glob` and add it through [`MimeEntry::add_pattern`].
    pub fn add_glob(&mut self, glob: &str, case_sensitive: bool) -> MimeResult<bool> {
        let pattern = FilenamePattern::from_glob(glob, case_sensitive)?;
        Ok(self.add_pattern(pattern))
    }

    pub fn add_signature(&mut self, signature: Signature) -> bool {
        if signature.is_empty() {
            return false;
        }
        OneOrMany::insert_into(&mut self.signatures, signature)
    }

    /// Record another name for this type. The canonical type is never its own
    /// alias.
    pub fn add_alias(&mut self, alias: MediaType) -> bool {
        if alias == self.media_type {
            return false;
        }
        self.aliases.get_or_insert_with(HashSet::new).insert(alias)
    }

    pub fn add_parent(&mut self, parent: MediaType) -> bool {
        if parent == self.media_type || self.parents.contains(&parent) {
            return false;
        }
        self.parents.push(parent);
        true
    }

    /// Keep the first comment seen.
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        if self.comment.is_none() {
            self.comment = Some(comment.into());
        }
    }

    /// Drop every filename pattern and the primary extension.
    pub fn clear_patterns(&mut self) {
        self.postfixes = None;
        self.complexes = None;
        self.primary_extension = None;
    }

    /// Add everything `other` knows that this entry does not. Nothing already
    /// present is replaced.
    pub fn absorb(&mut self, other: &MimeEntry) {
        for ext in other.postfixes.iter().flat_map(|p| p.iter()) {
            self.add_pattern(ext.clone());
        }
        for pattern in other.complexes.iter().flat_map(|c| c.iter()) {
            self.add_pattern(pattern.clone());
        }
        for signature in other.signatures.iter().flat_map(|s| s.iter()) {
            self.add_signature(signature.clone());
        }
        for alias in other.aliases.iter().flatten() {
            self.add_alias(*alias);
        }
        for parent in &other.parents {
            self.add_parent(*parent);
        }
        if let Some(comment) = &other.comment {
            self.set_comment(comment.clone());
        }
    }

    /// Highest priority among the signatures that match `head`.
    pub fn sniff(&self, head: &[u8]) -> Option<u32> {
        self.signatures
            .iter()
            .flat_map(|s| s.iter())
            .filter(|s| s.matches_bytes(head))
            .map(Signature::priority)
            .max()
    }

    /// Leading bytes needed to evaluate every signature.
    pub fn magic_len(&self) -> usize {
        self.signatures
            .iter()
            .flat_map(|s| s.iter())
            .map(Signature::required_len)
            .max()
            .unwrap_or(0)
    }
}

impl PartialEq for MimeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.media_type == other.media_type
    }
}

impl Eq for MimeEntry {}

impl PartialEq<MediaType> for MimeEntry {
    fn eq(&self, other: &MediaType) -> bool {
        self.media_type == *other
    }
}

impl PartialEq<MimeEntry> for MediaType {
    fn eq(&self, other: &MimeEntry) -> bool {
        *self == other.media_type
    }
}

impl PartialEq<str> for MimeEntry {
    fn eq(&self, other: &str) -> bool {
        self.media_type == *other
    }
}

impl PartialEq<&str> for MimeEntry {
    fn eq(&self, other: &&str) -> bool {
        self.media_type == **other
    }
}
