//! Areas: isolated registry and cache partitions.
//!
//! Every query runs against one [`Area`]. The area normalizes the query,
//! consults its [`EntryCache`], and on a miss matches against its merged
//! [`Registry`]. Misses are `None`, never errors.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};
use url::Url;

use crate::cache::{CacheCapacity, EntryCache};
use crate::entry::MimeEntry;
use crate::error::{MimeError, MimeResult};
use crate::magic::read_head;
use crate::media_type::MediaType;
use crate::package::{self, PackageSource};
use crate::patterns::base_name;
use crate::registry::Registry;

/// Bytes inspected when no signature matched and the content has to be
/// classified as text or binary.
pub const TEXT_SNIFF_LEN: usize = 512;

#[derive(Debug)]
pub struct Area {
    name: String,
    registry: Arc<Registry>,
    cache: EntryCache,
    load_errors: Vec<MimeError>,
}

impl Area {
    pub fn new(name: impl Into<String>, registry: Registry, capacity: CacheCapacity) -> Self {
        Self {
            name: name.into(),
            registry: Arc::new(registry),
            cache: EntryCache::new(capacity),
            load_errors: Vec::new(),
        }
    }

    /// Load and merge `sources` in order. Packages that fail to load are
    /// kept in [`Area::load_errors`].
    pub fn from_sources(
        name: impl Into<String>,
        sources: &[PackageSource],
        capacity: CacheCapacity,
    ) -> Self {
        let name = name.into();
        let report = package::load_all(sources);
        debug!(
            area = %name,
            packages = sources.len(),
            types = report.registry.len(),
            errors = report.errors.len(),
            "Built area"
        );
        Self {
            name,
            registry: Arc::new(report.registry),
            cache: EntryCache::new(capacity),
            load_errors: report.errors,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn cache(&self) -> &EntryCache {
        &self.cache
    }

    pub fn load_errors(&self) -> &[MimeError] {
        &self.load_errors
    }

    /// Entry for a canonical type or an alias.
    pub fn resolve(&self, media_type: &MediaType) -> Option<Arc<MimeEntry>> {
        let canonical = self.registry.canonical(media_type)?;
        self.cache
            .get_or_insert_with(canonical, || self.registry.get(&canonical).cloned())
    }

    /// Resolve IETF text. Parameters (`; charset=utf-8`) and surrounding
    /// whitespace are ignored. When the exact text is unknown, its lowercase
    /// form is tried.
    pub fn resolve_str(&self, text: &str) -> MimeResult<Option<Arc<MimeEntry>>> {
        let essence = text.split_once(';').map_or(text, |(head, _)| head).trim();
        let media_type = MediaType::parse(essence)?;
        if let Some(entry) = self.resolve(&media_type) {
            return Ok(Some(entry));
        }
        if essence.bytes().any(|b| b.is_ascii_uppercase()) {
            let lower = MediaType::parse(&essence.to_ascii_lowercase())?;
            return Ok(self.resolve(&lower));
        }
        Ok(None)
    }

    /// Resolve from components; `subtype` excludes the facet.
    pub fn resolve_parts(
        &self,
        facet: Option<&str>,
        top_level: &str,
        subtype: &str,
    ) -> MimeResult<Option<Arc<MimeEntry>>> {
        let media_type = MediaType::from_parts(facet, top_level, subtype)?;
        Ok(self.resolve(&media_type))
    }

    /// Every entry whose identifier or alias matches the glob `pattern`
    /// (`image/*`, `*`). Matches are stored in the cache.
    pub fn resolve_pattern(&self, pattern: &str) -> MimeResult<Vec<Arc<MimeEntry>>> {
        let found = self.registry.find(pattern)?;
        for entry in &found {
            self.cache.insert(entry.media_type(), Arc::clone(entry));
        }
        Ok(found)
    }

    /// Entries whose filename patterns best match the last component of
    /// `path`. Both `/` and `\` separate components. More than one result
    /// means the patterns tied.
    pub fn glob_candidates(&self, path: impl AsRef<Path>) -> Vec<Arc<MimeEntry>> {
        let text = path.as_ref().to_string_lossy();
        self.candidates_for_name(base_name(&text))
    }

    fn candidates_for_name(&self, file_name: &str) -> Vec<Arc<MimeEntry>> {
        if file_name.is_empty() {
            return Vec::new();
        }
        self.registry
            .match_file_name(file_name)
            .iter()
            .filter_map(|t| self.resolve(t))
            .collect()
    }

    /// Best filename match for `path`, without touching the filesystem.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> Option<Arc<MimeEntry>> {
        self.glob_candidates(path).into_iter().next()
    }

    /// Sniff content. Reads at most [`Registry::max_magic_len`] bytes.
    pub fn resolve_stream<R: Read>(&self, reader: R) -> io::Result<Option<Arc<MimeEntry>>> {
        let head = read_head(reader, self.registry.max_magic_len())?;
        Ok(self.sniff_best(&head))
    }

    fn sniff_best(&self, head: &[u8]) -> Option<Arc<MimeEntry>> {
        self.registry
            .sniff(head)
            .first()
            .and_then(|(t, _)| self.resolve(t))
    }

    /// Classify a file on disk.
    ///
    /// Directories are `inode/directory`. A single filename match is taken
    /// as is. Otherwise the head of the file is sniffed: a filename candidate
    /// equal to or descending from a sniffed type wins, then the sniffed type
    /// with the highest priority, then the first filename candidate. With no
    /// match at all the file is `text/plain` when its head is UTF-8 without
    /// NUL bytes and `application/octet-stream` otherwise.
    pub fn resolve_file(&self, path: impl AsRef<Path>) -> MimeResult<Arc<MimeEntry>> {
        let path = path.as_ref();
        let io_err = |source| MimeError::Io {
            path: path.to_path_buf(),
            source,
        };

        if std::fs::metadata(path).map_err(io_err)?.is_dir() {
            return Ok(self.resolve_or_bare(MediaType::directory()));
        }

        let candidates = self.glob_candidates(path);
        if let [only] = candidates.as_slice() {
            trace!(path = %path.display(), media_type = %only.media_type(), "Single glob match");
            return Ok(Arc::clone(only));
        }

        let limit = self.registry.max_magic_len().max(TEXT_SNIFF_LEN);
        let head = read_head(File::open(path).map_err(io_err)?, limit).map_err(io_err)?;
        Ok(self.classify(&candidates, &head))
    }

    /// Pick among filename candidates using the content head.
    fn classify(&self, candidates: &[Arc<MimeEntry>], head: &[u8]) -> Arc<MimeEntry> {
        let sniffed = self.registry.sniff(head);
        for (hit, _) in &sniffed {
            let preferred = candidates
                .iter()
                .find(|c| self.registry.is_subclass_of(&c.media_type(), hit));
            if let Some(candidate) = preferred {
                return Arc::clone(candidate);
            }
        }
        if let Some(best) = sniffed.first().and_then(|(t, _)| self.resolve(t)) {
            return best;
        }
        if let Some(first) = candidates.first() {
            return Arc::clone(first);
        }
        let fallback = if looks_like_text(head) {
            MediaType::text_plain()
        } else {
            MediaType::octet_stream()
        };
        self.resolve_or_bare(fallback)
    }

    fn resolve_or_bare(&self, media_type: MediaType) -> Arc<MimeEntry> {
        self.resolve(&media_type)
            .unwrap_or_else(|| Arc::new(MimeEntry::new(media_type)))
    }

    /// Resolve a URI by its file name.
    ///
    /// Text without a scheme, single-letter schemes (`C:\...`), and `file:`
    /// URIs are treated as paths. Other schemes use the last path segment,
    /// so query strings and fragments never affect the result.
    pub fn resolve_uri(&self, uri: &str) -> Option<Arc<MimeEntry>> {
        let url = match Url::parse(uri) {
            Ok(url) if url.scheme().len() > 1 => url,
            _ => return self.resolve_path(uri),
        };
        if url.scheme() == "file" {
            return match url.to_file_path() {
                Ok(path) => self.resolve_path(path),
                Err(()) => self.resolve_path(url.path()),
            };
        }
        let segment = url.path_segments()?.next_back()?;
        self.candidates_for_name(&decode_segment(segment))
            .into_iter()
            .next()
    }

    /// Whether `child` is `ancestor` or descends from it.
    pub fn is_subclass_of(&self, child: &MediaType, ancestor: &MediaType) -> bool {
        self.registry.is_subclass_of(child, ancestor)
    }
}

/// UTF-8 without NUL bytes. A multi-byte sequence cut off at the end of the
/// head still counts as text.
fn looks_like_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

/// Percent-decode one path segment.
fn decode_segment(segment: &str) -> String {
    // form_urlencoded also splits on `&`/`=` and maps `+` to a space.
    let escaped = segment
        .replace('+', "%2B")
        .replace('&', "%26")
        .replace('=', "%3D");
    url::form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magic::{MagicRule, Signature};
    use std::io::Cursor;

    fn mt(text: &str) -> MediaType {
        MediaType::parse(text).unwrap()
    }

    fn sample_registry() -> Registry {
        let mut r = Registry::new();
        r.declare(MediaType::text_plain());
        r.declare(MediaType::octet_stream());
        r.add_glob_text(mt("text/plain"), "*.txt", false, 50).unwrap();

        r.add_glob_text(mt("application/vnd.ms-word"), "*.doc", false, 50).unwrap();
        r.add_alias(mt("application/vnd.ms-word"), mt("application/msword"));

        r.add_glob_text(mt("image/png"), "*.png", false, 50).unwrap();
        r.add_signature(
            mt("image/png"),
            Signature::new(50).with_rule(MagicRule::new(b"\x89PNG".to_vec(), 0)),
        );

        r.add_glob_text(mt("application/zip"), "*.zip", false, 50).unwrap();
        r.add_signature(
            mt("application/zip"),
            Signature::new(40).with_rule(MagicRule::new(b"PK\x03\x04".to_vec(), 0)),
        );
        r.add_parent(mt("application/vnd.oasis.opendocument.text"), mt("application/zip"));
        r.add_glob_text(mt("application/vnd.oasis.opendocument.text"), "*.odt", false, 50)
            .unwrap();

        // Two types claiming the same extension.
        r.add_glob_text(mt("text/x-tex"), "*.tex", false, 50).unwrap();
        r.add_glob_text(mt("text/x-texinfo"), "*.tex", false, 50).unwrap();
        r
    }

    fn area() -> Area {
        Area::new("test", sample_registry(), CacheCapacity::default())
    }

    #[test]
    fn test_resolve_canonical_and_alias() {
        let a = area();
        let canonical = a.resolve(&mt("application/vnd.ms-word")).unwrap();
        let alias = a.resolve(&mt("application/msword")).unwrap();
        assert!(Arc::ptr_eq(&canonical, &alias));
        assert_eq!(alias.media_type(), "application/vnd.ms-word");
        assert!(a.resolve(&mt("application/x-unknown")).is_none());
    }

    #[test]
    fn test_resolve_populates_cache() {
        let a = area();
        assert!(a.cache().is_empty());
        a.resolve(&mt("image/png"));
        a.resolve(&mt("image/png"));
        assert_eq!(a.cache().len(), 1);
        assert_eq!(a.cache().stats().hits, 1);
    }

    #[test]
    fn test_resolve_str_strips_parameters_and_folds_case() {
        let a = area();
        let e = a.resolve_str("text/plain; charset=utf-8").unwrap().unwrap();
        assert_eq!(e.media_type(), "text/plain");
        let e = a.resolve_str(" IMAGE/PNG ").unwrap().unwrap();
        assert_eq!(e.media_type(), "image/png");
        assert!(a.resolve_str("image/x-nothing").unwrap().is_none());
        assert!(matches!(
            a.resolve_str("no-slash"),
            Err(MimeError::MalformedMediaType { .. })
        ));
    }

    #[test]
    fn test_resolve_parts() {
        let a = area();
        let e = a.resolve_parts(Some("vnd"), "application", "ms-word").unwrap().unwrap();
        assert_eq!(e.media_type(), "application/vnd.ms-word");
        assert!(a.resolve_parts(None, "image", "png").unwrap().is_some());
        assert!(a.resolve_parts(Some("bogus"), "image", "png").is_err());
    }

    #[test]
    fn test_resolve_pattern_fills_unbounded_cache() {
        let a = Area::new("sweep", sample_registry(), CacheCapacity::Unbounded);
        let all = a.resolve_pattern("*").unwrap();
        assert_eq!(all.len(), a.registry().len());
        assert_eq!(a.cache().len(), a.registry().len());

        let images = a.resolve_pattern("image/*").unwrap();
        assert_eq!(images.len(), 1);
        // Alias text matches too.
        let word = a.resolve_pattern("application/MSWORD").unwrap();
        assert_eq!(word[0].media_type(), "application/vnd.ms-word");
    }

    #[test]
    fn test_resolve_path_uses_last_component() {
        let a = area();
        assert_eq!(a.resolve_path("/tmp/report.DOC").unwrap().media_type(), "application/vnd.ms-word");
        assert_eq!(a.resolve_path("C:\\docs\\notes.txt").unwrap().media_type(), "text/plain");
        assert!(a.resolve_path("/tmp/archive.unknown").is_none());
        assert!(a.resolve_path("/tmp/").is_none());
        assert_eq!(a.glob_candidates("paper.tex").len(), 2);
    }

    #[test]
    fn test_resolve_stream_sniffs() {
        let a = area();
        let png = a.resolve_stream(Cursor::new(b"\x89PNG\r\n\x1a\n....")).unwrap().unwrap();
        assert_eq!(png.media_type(), "image/png");
        assert!(a.resolve_stream(Cursor::new(b"plain words")).unwrap().is_none());
    }

    #[test]
    fn test_classify_prefers_glob_subclass_of_sniffed() {
        let a = area();
        let candidates = a.glob_candidates("letter.odt");
        let e = a.classify(&candidates, b"PK\x03\x04rest");
        assert_eq!(e.media_type(), "application/vnd.oasis.opendocument.text");
    }

    #[test]
    fn test_classify_magic_beats_conflicting_globs() {
        let a = area();
        let candidates = a.glob_candidates("paper.tex");
        assert_eq!(a.classify(&candidates, b"\x89PNG").media_type(), "image/png");
        // No magic: the first declared candidate.
        assert_eq!(a.classify(&candidates, b"\\input").media_type(), "text/x-tex");
    }

    #[test]
    fn test_classify_fallbacks() {
        let a = area();
        assert_eq!(a.classify(&[], b"hello world\n").media_type(), "text/plain");
        assert_eq!(a.classify(&[], b"").media_type(), "text/plain");
        assert_eq!(a.classify(&[], b"ab\0cd").media_type(), "application/octet-stream");
        assert_eq!(a.classify(&[], b"\xff\xfe\xfa").media_type(), "application/octet-stream");
    }

    #[test]
    fn test_looks_like_text_allows_truncated_sequence() {
        assert!(looks_like_text("héllo".as_bytes()));
        assert!(looks_like_text(&"é".as_bytes()[..1]));
        assert!(!looks_like_text(b"\xc3("));
    }

    #[test]
    fn test_resolve_file_on_disk() {
        let a = area();
        let dir = tempfile::tempdir().unwrap();

        let single = dir.path().join("pic.png");
        std::fs::write(&single, b"not really a png").unwrap();
        assert_eq!(a.resolve_file(&single).unwrap().media_type(), "image/png");

        let unnamed = dir.path().join("blob");
        std::fs::write(&unnamed, b"\x89PNG\r\n\x1a\n").unwrap();
        assert_eq!(a.resolve_file(&unnamed).unwrap().media_type(), "image/png");

        let text = dir.path().join("README");
        std::fs::write(&text, "plain text").unwrap();
        assert_eq!(a.resolve_file(&text).unwrap().media_type(), "text/plain");

        assert_eq!(a.resolve_file(dir.path()).unwrap().media_type(), "inode/directory");

        let missing = a.resolve_file(dir.path().join("gone")).unwrap_err();
        assert!(matches!(missing, MimeError::Io { .. }));
    }

    #[test]
    fn test_resolve_uri() {
        let a = area();
        let doc = "application/vnd.ms-word";
        assert_eq!(a.resolve_uri("report.doc").unwrap().media_type(), doc);
        assert_eq!(a.resolve_uri("file:///home/me/report.doc").unwrap().media_type(), doc);
        assert_eq!(
            a.resolve_uri("https://example.com/files/report.doc?download=1#top").unwrap().media_type(),
            doc
        );
        assert_eq!(
            a.resolve_uri("https://example.com/my%20notes.txt").unwrap().media_type(),
            "text/plain"
        );
        assert!(a.resolve_uri("https://example.com/").is_none());
        assert!(a.resolve_uri("mailto:someone@example.com").is_none());
    }

    #[test]
    fn test_decode_segment() {
        assert_eq!(decode_segment("my%20file.txt"), "my file.txt");
        assert_eq!(decode_segment("a+b&c=d.txt"), "a+b&c=d.txt");
    }

    #[test]
    fn test_from_sources_keeps_errors() {
        let a = Area::from_sources(
            "partial",
            &[
                PackageSource::bundled(mimeo_packages::REFERENCE_PACKAGE),
                PackageSource::bundled("missing.xml"),
            ],
            CacheCapacity::default(),
        );
        assert_eq!(a.load_errors().len(), 1);
        assert!(a.resolve(&mt("image/png")).is_some());
    }
}
