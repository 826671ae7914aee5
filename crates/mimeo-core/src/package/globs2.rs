//! `globs2` descriptor format: `weight:type:glob[:flags]` lines.
//!
//! The only flag understood is `cs` (case-sensitive). A glob of
//! `__NOGLOBS__` asks to drop earlier globs; merges only add, so it is
//! ignored.

use tracing::debug;

use crate::error::{MimeError, MimeResult};
use crate::media_type::MediaType;
use crate::registry::Registry;

const NO_GLOBS: &str = "__NOGLOBS__";

pub(crate) fn parse(package: &str, text: &str) -> MimeResult<Registry> {
    let mut registry = Registry::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fail = |reason: String| MimeError::descriptor(package, format!("line {}: {reason}", idx + 1));

        let mut fields = line.splitn(4, ':');
        let (Some(weight), Some(media_type), Some(glob)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(fail("expected weight:type:glob".to_string()));
        };
        let weight: u32 = weight
            .trim()
            .parse()
            .map_err(|_| fail(format!("invalid weight {weight:?}")))?;
        let media_type = MediaType::parse(media_type).map_err(|e| fail(e.to_string()))?;

        if glob == NO_GLOBS {
            debug!(package, %media_type, "Ignoring __NOGLOBS__; merges only add");
            registry.declare(media_type);
            continue;
        }

        let case_sensitive = fields
            .next()
            .is_some_and(|flags| flags.split(',').any(|f| f.trim() == "cs"));
        registry
            .add_glob_text(media_type, glob, case_sensitive, weight)
            .map_err(|e| fail(e.to_string()))?;
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::FilenameMatcher;

    fn mt(text: &str) -> MediaType {
        MediaType::parse(text).unwrap()
    }

    #[test]
    fn test_weights_and_flags() {
        let text = "# comment\n80:text/x-readme:README*\n50:text/x-c++src:*.C:cs\n50:text/x-csrc:*.c\n";
        let r = parse("extra.globs2", text).unwrap();
        assert_eq!(r.glob_rules().len(), 3);
        assert_eq!(r.glob_rules()[0].weight, 80);
        assert!(r.glob_rules()[1].pattern.is_case_sensitive());
        assert!(!r.glob_rules()[2].pattern.is_case_sensitive());
        assert_eq!(r.match_file_name("main.C"), vec![mt("text/x-c++src")]);
        assert_eq!(r.match_file_name("README.md"), vec![mt("text/x-readme")]);
    }

    #[test]
    fn test_noglobs_declares_type_only() {
        let r = parse("x.globs2", "50:text/plain:__NOGLOBS__\n").unwrap();
        assert!(r.get(&mt("text/plain")).unwrap().postfixes().is_none());
    }

    #[test]
    fn test_malformed_lines_fail() {
        assert!(parse("x.globs2", "50:text/plain\n").is_err());
        assert!(parse("x.globs2", "heavy:text/plain:*.txt\n").is_err());
        assert!(parse("x.globs2", "50:text:*.txt\n").is_err());
    }
}
