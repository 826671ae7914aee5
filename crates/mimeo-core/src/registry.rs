//! Merged type registry for one area.
//!
//! A [`Registry`] is built from one or more packages and then shared
//! read-only behind an `Arc`. Building only ever adds: merging a later
//! package can contribute new types, patterns, signatures, aliases, and
//! parents, but never removes or replaces what an earlier package declared.

use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::debug;

use crate::entry::MimeEntry;
use crate::error::MimeResult;
use crate::glob::{self, GlobFlags};
use crate::magic::Signature;
use crate::media_type::MediaType;
use crate::patterns::{FilenameMatcher, FilenamePattern};

/// Weight given to globs that do not declare one.
pub const DEFAULT_GLOB_WEIGHT: u32 = 50;

/// A filename pattern bound to the type it identifies.
#[derive(Debug, Clone)]
pub struct GlobRule {
    pub pattern: FilenamePattern,
    pub media_type: MediaType,
    pub weight: u32,
}

impl GlobRule {
    /// A pattern without wildcards names one exact file (`Makefile`).
    pub fn is_literal(&self) -> bool {
        matches!(self.pattern, FilenamePattern::Glob(_)) && !glob::has_wildcards(self.pattern.glob())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<MediaType, Arc<MimeEntry>>,
    aliases: HashMap<MediaType, MediaType>,
    globs: Vec<GlobRule>,
    /// Every `(type, pattern)` pair in `globs`.
    glob_keys: HashSet<(MediaType, FilenamePattern)>,
    max_magic_len: usize,
    sources: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the packages merged into this registry, in merge order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn add_source(&mut self, name: impl Into<String>) {
        self.sources.push(name.into());
    }

    /// Entries in media-type order.
    pub fn entries(&self) -> impl Iterator<Item = &Arc<MimeEntry>> {
        self.entries.values()
    }

    pub fn media_types(&self) -> impl Iterator<Item = MediaType> + '_ {
        self.entries.keys().copied()
    }

    pub fn glob_rules(&self) -> &[GlobRule] {
        &self.globs
    }

    /// Leading bytes a stream must supply to evaluate every signature.
    pub fn max_magic_len(&self) -> usize {
        self.max_magic_len
    }

    /// Resolve an alias to its canonical type. Canonical types map to
    /// themselves; unknown types give `None`.
    pub fn canonical(&self, media_type: &MediaType) -> Option<MediaType> {
        if self.entries.contains_key(media_type) {
            return Some(*media_type);
        }
        self.aliases.get(media_type).copied()
    }

    pub fn contains(&self, media_type: &MediaType) -> bool {
        self.canonical(media_type).is_some()
    }

    /// Entry for a canonical type or one of its aliases.
    pub fn get(&self, media_type: &MediaType) -> Option<&Arc<MimeEntry>> {
        self.canonical(media_type)
            .and_then(|canonical| self.entries.get(&canonical))
    }

    /// Mutable access for building, creating an empty entry on first use.
    /// Entries already shared elsewhere are copied on write.
    pub fn entry_mut(&mut self, media_type: MediaType) -> &mut MimeEntry {
        let arc = self
            .entries
            .entry(media_type)
            .or_insert_with(|| Arc::new(MimeEntry::new(media_type)));
        Arc::make_mut(arc)
    }

    /// Declare a type without any patterns.
    pub fn declare(&mut self, media_type: MediaType) {
        self.entry_mut(media_type);
    }

    /// Bind a filename pattern to a type. Returns `false` when the type
    /// already had an equal pattern; the earlier weight is kept.
    pub fn add_glob(&mut self, media_type: MediaType, pattern: FilenamePattern, weight: u32) -> bool {
        let added = self.entry_mut(media_type).add_pattern(pattern.clone());
        if added && self.glob_keys.insert((media_type, pattern.clone())) {
            self.globs.push(GlobRule {
                pattern,
                media_type,
                weight,
            });
        }
        added
    }

    /// Compile `glob` and bind it with [`Registry::add_glob`].
    pub fn add_glob_text(
        &mut self,
        media_type: MediaType,
        glob: &str,
        case_sensitive: bool,
        weight: u32,
    ) -> MimeResult<bool> {
        let pattern = FilenamePattern::from_glob(glob, case_sensitive)?;
        Ok(self.add_glob(media_type, pattern, weight))
    }

    pub fn add_signature(&mut self, media_type: MediaType, signature: Signature) -> bool {
        let len = signature.required_len();
        let added = self.entry_mut(media_type).add_signature(signature);
        if added {
            self.max_magic_len = self.max_magic_len.max(len);
        }
        added
    }

    /// Record `alias` as another name for `canonical`. The first canonical
    /// type claiming an alias keeps it.
    pub fn add_alias(&mut self, canonical: MediaType, alias: MediaType) -> bool {
        if !self.entry_mut(canonical).add_alias(alias) {
            return false;
        }
        self.aliases.entry(alias).or_insert(canonical);
        true
    }

    pub fn add_parent(&mut self, child: MediaType, parent: MediaType) -> bool {
        self.entry_mut(child).add_parent(parent)
    }

    /// Fold `other` into this registry. Existing entries absorb the other
    /// side's additions; nothing already present is removed or replaced.
    pub fn merge(&mut self, other: Registry) {
        debug!(
            sources = ?other.sources,
            types = other.entries.len(),
            globs = other.globs.len(),
            "Merging registry"
        );

        for (media_type, incoming) in other.entries {
            // A type declared here only as an alias folds into its canonical entry.
            let target = match self.aliases.get(&media_type) {
                Some(canonical) if self.entries.contains_key(canonical) => *canonical,
                _ => media_type,
            };
            if target != media_type {
                debug!(alias = %media_type, canonical = %target, "Folding aliased type");
            }
            match self.entries.entry(target) {
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(incoming);
                }
                btree_map::Entry::Occupied(mut slot) => {
                    Arc::make_mut(slot.get_mut()).absorb(&incoming);
                }
            }
        }
        for (alias, canonical) in other.aliases {
            if !self.entries.contains_key(&alias) {
                let canonical = self.canonical(&canonical).unwrap_or(canonical);
                self.aliases.entry(alias).or_insert(canonical);
            }
        }

        for mut rule in other.globs {
            rule.media_type = self.canonical(&rule.media_type).unwrap_or(rule.media_type);
            if self.glob_keys.insert((rule.media_type, rule.pattern.clone())) {
                self.globs.push(rule);
            }
        }

        self.max_magic_len = self.max_magic_len.max(other.max_magic_len);
        self.sources.extend(other.sources);
    }

    /// Types whose filename patterns match `file_name`, best first.
    ///
    /// Exact-name patterns beat wildcard patterns, and case-sensitive
    /// patterns beat case-insensitive ones. Among the rest the highest weight
    /// wins, then the most literal characters. More than one result
    /// means the candidates tied.
    pub fn match_file_name(&self, file_name: &str) -> Vec<MediaType> {
        let hits: Vec<&GlobRule> = self
            .globs
            .iter()
            .filter(|r| r.pattern.matches(file_name))
            .collect();

        let literal: Vec<&GlobRule> = hits.iter().copied().filter(|r| r.is_literal()).collect();
        let pool = if literal.is_empty() { hits } else { literal };
        let exact_case: Vec<&GlobRule> = pool
            .iter()
            .copied()
            .filter(|r| r.pattern.is_case_sensitive())
            .collect();
        let pool = if exact_case.is_empty() { pool } else { exact_case };

        let Some(best_weight) = pool.iter().map(|r| r.weight).max() else {
            return Vec::new();
        };
        let weighted: Vec<&GlobRule> = pool.into_iter().filter(|r| r.weight == best_weight).collect();
        let best_len = weighted
            .iter()
            .map(|r| r.pattern.specificity())
            .max()
            .unwrap_or(0);

        let mut out: Vec<MediaType> = Vec::new();
        for rule in weighted {
            if rule.pattern.specificity() == best_len && !out.contains(&rule.media_type) {
                out.push(rule.media_type);
            }
        }
        out
    }

    /// Types with a signature matching `head`, highest priority first.
    pub fn sniff(&self, head: &[u8]) -> Vec<(MediaType, u32)> {
        let mut hits: Vec<(MediaType, u32)> = self
            .entries
            .values()
            .filter_map(|e| e.sniff(head).map(|p| (e.media_type(), p)))
            .collect();
        hits.sort_by(|a, b| b.1.cmp(&a.1));
        hits
    }

    /// Entries whose canonical text (or an alias) matches an identifier glob
    /// such as `image/*`.
    pub fn find(&self, pattern: &str) -> MimeResult<Vec<Arc<MimeEntry>>> {
        let compiled = glob::compile(pattern, GlobFlags::case_insensitive())?;
        Ok(self
            .entries
            .values()
            .filter(|e| {
                compiled.is_match(&e.media_type().to_string())
                    || e
                        .aliases()
                        .is_some_and(|a| a.iter().any(|alias| compiled.is_match(&alias.to_string())))
            })
            .cloned()
            .collect())
    }

    /// `true` if `child` is `ancestor` or descends from it through declared
    /// parents. Every `text/*` type implicitly descends from `text/plain`, and
    /// every type other than `inode/*` from `application/octet-stream`.
    pub fn is_subclass_of(&self, child: &MediaType, ancestor: &MediaType) -> bool {
        let child = self.canonical(child).unwrap_or(*child);
        let ancestor = self.canonical(ancestor).unwrap_or(*ancestor);
        if child == ancestor {
            return true;
        }
        if ancestor == MediaType::octet_stream() && child.top_level() != "inode" {
            return true;
        }

        let mut seen = vec![child];
        let mut queue = VecDeque::from([child]);
        while let Some(current) = queue.pop_front() {
            let mut parents: Vec<MediaType> = self
                .entries
                .get(&current)
                .map(|e| e.parents().to_vec())
                .unwrap_or_default();
            if current.is_text() && current != "text/plain" {
                parents.push(MediaType::text_plain());
            }
            for parent in parents {
                let parent = self.canonical(&parent).unwrap_or(parent);
                if parent == ancestor {
                    return true;
                }
                if !seen.contains(&parent) {
                    seen.push(parent);
                    queue.push_back(parent);
                }
            }
        }
        false
    }
}
