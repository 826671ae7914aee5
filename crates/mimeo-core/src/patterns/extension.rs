//! Single-extension matchers.

use std::str::FromStr;

use super::{FilenameMatcher, base_name, globs_equal, pattern_identity};
use crate::error::{MimeError, MimeResult};

/// Matcher for one trailing extension, canonical glob `*.ext`.
///
/// Accepts a bare extension (`doc`), a dotted extension (`.doc`), a glob
/// (`*.doc`), a file name (`report.doc`), or a path with either separator.
/// The plain form is the bare extension.
#[derive(Debug, Clone)]
pub struct Extension {
    glob: String,
    case_sensitive: bool,
}

impl Extension {
    pub fn new(text: impl AsRef<str>, case_sensitive: bool) -> MimeResult<Self> {
        let ext = extension_text(text.as_ref(), "extension")?;
        Ok(Self {
            glob: format!("*.{ext}"),
            case_sensitive,
        })
    }

    /// The extension without its dot, e.g. `doc`.
    pub fn ext(&self) -> &str {
        &self.glob[2..]
    }

    /// Plain form: the bare extension.
    pub fn plain(&self) -> &str {
        self.ext()
    }

    pub fn with_case_sensitivity(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

impl FilenameMatcher for Extension {
    fn glob(&self) -> &str {
        &self.glob
    }

    fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name.rsplit_once('.').is_some_and(|(_, ext)| {
            globs_equal(ext, self.case_sensitive, self.ext(), self.case_sensitive)
        })
    }
}

pattern_identity!(Extension);

/// Matcher for one trailing extension whose plain form keeps the dot
/// (`.doc`). Adds the strict [`DottedExtension::parse`].
#[derive(Debug, Clone)]
pub struct DottedExtension(Extension);

impl DottedExtension {
    pub fn new(text: impl AsRef<str>, case_sensitive: bool) -> MimeResult<Self> {
        let ext = extension_text(text.as_ref(), "dotted extension")?;
        Ok(Self(Extension {
            glob: format!("*.{ext}"),
            case_sensitive,
        }))
    }

    /// Strictly parse `*.ext` or `.ext`, case-insensitive.
    ///
    /// Rejects free text, bare extensions, and multi-extension globs such as
    /// `*.7z.001` (those belong to [`CompoundExtension`](super::CompoundExtension)).
    pub fn parse(text: &str) -> MimeResult<Self> {
        Self::parse_with_case(text, false)
    }

    pub fn parse_with_case(text: &str, case_sensitive: bool) -> MimeResult<Self> {
        let Some(ext) = text.strip_prefix("*.").or_else(|| text.strip_prefix('.')) else {
            return Err(MimeError::invalid_pattern(
                "dotted extension",
                text,
                "expected `*.ext` or `.ext`",
            ));
        };
        validate_extension(text, ext, "dotted extension")?;
        Self::new(text, case_sensitive)
    }

    pub fn ext(&self) -> &str {
        self.0.ext()
    }

    /// Plain form: the extension with its leading dot.
    pub fn plain(&self) -> &str {
        &self.0.glob[1..]
    }

    pub fn as_extension(&self) -> &Extension {
        &self.0
    }

    pub fn into_extension(self) -> Extension {
        self.0
    }
}

impl FilenameMatcher for DottedExtension {
    fn glob(&self) -> &str {
        self.0.glob()
    }

    fn is_case_sensitive(&self) -> bool {
        self.0.is_case_sensitive()
    }

    fn matches(&self, file_name: &str) -> bool {
        self.0.matches(file_name)
    }
}

pattern_identity!(DottedExtension);

impl FromStr for DottedExtension {
    type Err = MimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DottedExtension> for Extension {
    fn from(value: DottedExtension) -> Self {
        value.0
    }
}

impl From<Extension> for DottedExtension {
    fn from(value: Extension) -> Self {
        DottedExtension(value)
    }
}

/// Reduce any accepted input shape to its single extension.
fn extension_text<'a>(text: &'a str, kind: &'static str) -> MimeResult<&'a str> {
    let name = base_name(text);
    let ext = if let Some(rest) = name.strip_prefix("*.") {
        rest
    } else if let Some(rest) = name.strip_prefix('.') {
        rest.rsplit('.').next().unwrap_or(rest)
    } else {
        name.rsplit('.').next().unwrap_or(name)
    };
    validate_extension(text, ext, kind)?;
    Ok(ext)
}

fn validate_extension(text: &str, ext: &str, kind: &'static str) -> MimeResult<()> {
    if ext.is_empty() {
        return Err(MimeError::invalid_pattern(kind, text, "empty extension"));
    }
    if ext.contains('.') {
        return Err(MimeError::invalid_pattern(
            kind,
            text,
            "more than one extension",
        ));
    }
    if ext
        .chars()
        .any(|c| matches!(c, '*' | '?' | '[' | ']' | '/' | '\\') || c.is_whitespace())
    {
        return Err(MimeError::invalid_pattern(
            kind,
            text,
            "extension contains wildcard, separator, or whitespace",
        ));
    }
    Ok(())
}
