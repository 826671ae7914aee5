//! Descriptor packages and area building.
//!
//! A package is one descriptor file in one of three formats (see
//! [`PackageFormat`]). Loading a package yields a partial [`Registry`];
//! building an area loads every package bound to it, in precedence order,
//! and merges them. A package that fails to load is reported in the
//! [`LoadReport`] and does not stop the others.
//!
//! Default precedence, earliest wins on conflicts:
//!
//! 1. the bundled reference package ([`mimeo_packages::REFERENCE_PACKAGE`])
//! 2. the other bundled packages, by name
//! 3. `mime/packages/*.xml` under the XDG data directories (user first)
//! 4. packages named in configuration

mod flat;
mod globs2;
mod xml;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{MimeError, MimeResult};
use crate::registry::Registry;

/// Largest descriptor file read from disk.
pub const MAX_PACKAGE_SIZE: u64 = 16 * 1024 * 1024;

/// On-disk descriptor formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFormat {
    /// shared-mime-info XML with globs, magic, aliases, and parents.
    Structured,
    /// One media type per line, optionally followed by extensions.
    Types,
    /// `weight:type:glob[:flags]` lines.
    Globs2,
}

impl PackageFormat {
    /// Pick a format from the file name, falling back to the content.
    pub fn detect(name: &str, text: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".xml") {
            PackageFormat::Structured
        } else if lower.ends_with("globs2") {
            PackageFormat::Globs2
        } else if lower.ends_with(".types") {
            PackageFormat::Types
        } else if text.trim_start().starts_with('<') {
            PackageFormat::Structured
        } else if looks_like_globs2(text) {
            PackageFormat::Globs2
        } else {
            PackageFormat::Types
        }
    }
}

fn looks_like_globs2(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .and_then(|l| l.split_once(':'))
        .is_some_and(|(weight, _)| weight.parse::<u32>().is_ok())
}

/// Parse descriptor text in a known format.
pub fn parse(package: &str, text: &str, format: PackageFormat) -> MimeResult<Registry> {
    let mut registry = match format {
        PackageFormat::Structured => xml::parse(package, text)?,
        PackageFormat::Types => flat::parse(package, text)?,
        PackageFormat::Globs2 => globs2::parse(package, text)?,
    };
    registry.add_source(package);
    debug!(
        package,
        ?format,
        types = registry.len(),
        globs = registry.glob_rules().len(),
        "Loaded package"
    );
    Ok(registry)
}

/// Parse descriptor text, detecting its format.
pub fn parse_auto(package: &str, text: &str) -> MimeResult<Registry> {
    parse(package, text, PackageFormat::detect(package, text))
}

/// Load one descriptor file from disk.
pub fn load(path: &Path) -> MimeResult<Registry> {
    let io_err = |source| MimeError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = fs::metadata(path).map_err(io_err)?.len();
    if size > MAX_PACKAGE_SIZE {
        return Err(MimeError::descriptor(
            path.display().to_string(),
            format!("file is {size} bytes, limit is {MAX_PACKAGE_SIZE}"),
        ));
    }
    let text = fs::read_to_string(path).map_err(io_err)?;
    parse_auto(&path.display().to_string(), &text)
}

/// Where a package comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// A package compiled into `mimeo-packages`, by name.
    Bundled(String),
    /// A descriptor file on disk.
    Path(PathBuf),
}

impl PackageSource {
    pub fn bundled(name: impl Into<String>) -> Self {
        PackageSource::Bundled(name.into())
    }

    pub fn load(&self) -> MimeResult<Registry> {
        match self {
            PackageSource::Bundled(name) => {
                let text = mimeo_packages::get(name)
                    .ok_or_else(|| MimeError::descriptor(name.clone(), "no bundled package with this name"))?;
                parse_auto(name, text)
            }
            PackageSource::Path(path) => load(path),
        }
    }
}

impl FromStr for PackageSource {
    type Err = std::convert::Infallible;

    /// `bundled:NAME` names a bundled package; anything else is a path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.strip_prefix("bundled:") {
            Some(name) => PackageSource::bundled(name),
            None => PackageSource::Path(PathBuf::from(s)),
        })
    }
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageSource::Bundled(name) => write!(f, "bundled:{name}"),
            PackageSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The outcome of building a registry from several packages.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub registry: Registry,
    pub errors: Vec<MimeError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Load and merge `sources` in order. Failures are collected, not fatal.
pub fn load_all(sources: &[PackageSource]) -> LoadReport {
    let mut report = LoadReport::default();
    for source in sources {
        match source.load() {
            Ok(registry) => report.registry.merge(registry),
            Err(e) => {
                warn!(package = %source, error = %e, "Skipping package");
                report.errors.push(e);
            }
        }
    }
    report
}

/// Bundled packages in precedence order: the reference package first, then
/// the rest by name.
pub fn bundled_sources() -> Vec<PackageSource> {
    let mut names: Vec<&str> = mimeo_packages::names().collect();
    names.sort_by_key(|name| (*name != mimeo_packages::REFERENCE_PACKAGE, *name));
    names.into_iter().map(PackageSource::bundled).collect()
}

/// `mime/packages/*.xml` under the XDG data directories: the user data
/// directory, then each entry of `XDG_DATA_DIRS` (default
/// `/usr/local/share:/usr/share`). Files within a directory are taken by name.
#[cfg(feature = "filesystem")]
pub fn system_sources() -> Vec<PackageSource> {
    let mut dirs: Vec<PathBuf> = dirs::data_dir().into_iter().collect();
    let data_dirs = std::env::var("XDG_DATA_DIRS")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());
    dirs.extend(std::env::split_paths(&data_dirs));

    let mut sources = Vec::new();
    for dir in dirs {
        let packages = dir.join("mime").join("packages");
        let Ok(read) = fs::read_dir(&packages) else {
            continue;
        };
        let mut files: Vec<PathBuf> = read
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "xml"))
            .collect();
        files.sort();
        debug!(dir = %packages.display(), count = files.len(), "Found system packages");
        sources.extend(files.into_iter().map(PackageSource::Path));
    }
    sources
}

#[cfg(not(feature = "filesystem"))]
pub fn system_sources() -> Vec<PackageSource> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_type::MediaType;
    use std::io::Write;

    #[test]
    fn test_detect_by_name_and_content() {
        assert_eq!(PackageFormat::detect("a.xml", ""), PackageFormat::Structured);
        assert_eq!(PackageFormat::detect("globs2", ""), PackageFormat::Globs2);
        assert_eq!(PackageFormat::detect("extra.globs2", ""), PackageFormat::Globs2);
        assert_eq!(PackageFormat::detect("iana.types", ""), PackageFormat::Types);
        assert_eq!(PackageFormat::detect("pkg", "  <mime-info/>"), PackageFormat::Structured);
        assert_eq!(PackageFormat::detect("pkg", "# x\n50:text/plain:*.txt"), PackageFormat::Globs2);
        assert_eq!(PackageFormat::detect("pkg", "text/plain\n"), PackageFormat::Types);
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".types").tempfile().unwrap();
        writeln!(file, "text/plain txt").unwrap();
        let r = load(file.path()).unwrap();
        assert_eq!(r.len(), 1);
        assert_eq!(r.sources().len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = load(Path::new("/definitely/not/here.xml")).unwrap_err();
        assert!(matches!(err, MimeError::Io { .. }));
    }

    #[test]
    fn test_load_all_collects_errors_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.xml");
        let good = dir.path().join("good.types");
        fs::write(&bad, "<mime-info><mime-type type=\"oops\"/></mime-info>").unwrap();
        fs::write(&good, "text/x-good good\n").unwrap();

        let report = load_all(&[
            PackageSource::Path(bad),
            PackageSource::bundled("no-such-package.xml"),
            PackageSource::Path(good),
        ]);
        assert_eq!(report.errors.len(), 2);
        assert!(!report.is_clean());
        assert!(report.registry.contains(&MediaType::parse("text/x-good").unwrap()));
    }

    #[test]
    fn test_bundled_reference_comes_first() {
        let sources = bundled_sources();
        assert_eq!(
            sources.first(),
            Some(&PackageSource::bundled(mimeo_packages::REFERENCE_PACKAGE))
        );
        assert_eq!(sources.len(), mimeo_packages::BUNDLED.len());
    }

    #[test]
    fn test_source_display_and_parse() {
        assert_eq!(PackageSource::bundled("a.xml").to_string(), "bundled:a.xml");
        assert_eq!("bundled:a.xml".parse(), Ok(PackageSource::bundled("a.xml")));
        assert_eq!(
            "/etc/mime/extra.xml".parse(),
            Ok(PackageSource::Path(PathBuf::from("/etc/mime/extra.xml")))
        );
    }
}
