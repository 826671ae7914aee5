//! Flat descriptor format: one media type per line.
//!
//! ```text
//! # comment
//! application/vnd.ms-excel
//! text/csv            csv
//! ```
//!
//! Tokens after the type are bare extensions, as in an Apache `mime.types`
//! file. A line whose type does not parse fails the package.

use tracing::debug;

use crate::error::{MimeError, MimeResult};
use crate::media_type::MediaType;
use crate::patterns::Extension;
use crate::registry::{DEFAULT_GLOB_WEIGHT, Registry};

pub(crate) fn parse(package: &str, text: &str) -> MimeResult<Registry> {
    let mut registry = Registry::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };
        let media_type = MediaType::parse(first).map_err(|e| {
            MimeError::descriptor(package, format!("line {}: {e}", idx + 1))
        })?;
        registry.declare(media_type);

        for token in tokens {
            if token.starts_with('#') {
                break;
            }
            let ext = Extension::new(token, false).map_err(|e| {
                MimeError::descriptor(package, format!("line {}: {e}", idx + 1))
            })?;
            registry.add_glob(media_type, ext.into(), DEFAULT_GLOB_WEIGHT);
        }
    }

    debug!(package, types = registry.len(), "Parsed type list");
    Ok(registry)
}
