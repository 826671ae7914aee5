//! Structured descriptor format: shared-mime-info XML.
//!
//! ```xml
//! <mime-info xmlns="http://www.freedesktop.org/standards/shared-mime-info">
//!   <mime-type type="application/vnd.ms-word">
//!     <comment>Word document</comment>
//!     <alias type="application/msword"/>
//!     <sub-class-of type="application/x-ole-storage"/>
//!     <glob pattern="*.doc" weight="50"/>
//!     <magic priority="50">
//!       <match type="string" value="\xd0\xcf\x11\xe0" offset="0"/>
//!     </magic>
//!   </mime-type>
//! </mime-info>
//! ```
//!
//! Malformed XML or a `<mime-type>` without a valid `type` fails the package.
//! A single bad glob, match, alias, or parent is logged and skipped.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};

use crate::error::{MimeError, MimeResult};
use crate::magic::{DEFAULT_PRIORITY, MagicRule, Signature};
use crate::media_type::MediaType;
use crate::registry::{DEFAULT_GLOB_WEIGHT, Registry};

type Attrs = HashMap<String, String>;

/// Parse state for the element currently open.
#[derive(Default)]
struct State {
    current: Option<MediaType>,
    signature: Option<Signature>,
    rules: Vec<MagicRule>,
    in_comment: bool,
    comment_lang: bool,
    depth_unknown: usize,
}

pub(crate) fn parse(package: &str, text: &str) -> MimeResult<Registry> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut registry = Registry::new();
    let mut state = State::default();
    let mut saw_root = false;
    let mut open = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            MimeError::descriptor(
                package,
                format!("XML error at byte {}: {e}", reader.buffer_position()),
            )
        })?;
        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                if name == "mime-info" {
                    saw_root = true;
                }
                open += 1;
                start_element(package, &name, &attrs(package, &e)?, &mut registry, &mut state)?;
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                if name == "mime-info" {
                    saw_root = true;
                }
                let attrs = attrs(package, &e)?;
                start_element(package, &name, &attrs, &mut registry, &mut state)?;
                end_element(package, &name, &mut registry, &mut state);
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                open = open.saturating_sub(1);
                end_element(package, &name, &mut registry, &mut state);
            }
            Event::Text(t) => {
                if state.in_comment && !state.comment_lang {
                    if let Some(media_type) = state.current {
                        let comment = t
                            .unescape()
                            .map_err(|e| MimeError::descriptor(package, e.to_string()))?;
                        registry.entry_mut(media_type).set_comment(comment.trim());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if open > 0 {
        return Err(MimeError::descriptor(package, "unexpected end of document"));
    }
    if !saw_root {
        return Err(MimeError::descriptor(package, "missing <mime-info> root element"));
    }
    Ok(registry)
}

fn start_element(
    package: &str,
    name: &str,
    attrs: &Attrs,
    registry: &mut Registry,
    state: &mut State,
) -> MimeResult<()> {
    // Every start is paired with an `end_element` call, empty elements too.
    if state.depth_unknown > 0 {
        state.depth_unknown += 1;
        return Ok(());
    }

    match name {
        "mime-info" => {}
        "mime-type" => {
            let text = attrs
                .get("type")
                .ok_or_else(|| MimeError::descriptor(package, "<mime-type> without type"))?;
            let media_type = MediaType::parse(text)
                .map_err(|e| MimeError::descriptor(package, e.to_string()))?;
            registry.declare(media_type);
            state.current = Some(media_type);
        }
        "comment" => {
            state.in_comment = true;
            state.comment_lang = attrs.contains_key("xml:lang");
        }
        "glob" => {
            if let Some(media_type) = state.current {
                add_glob(package, media_type, attrs, registry);
            }
        }
        "glob-deleteall" | "magic-deleteall" => {
            debug!(package, element = name, "Ignoring delete directive; merges only add");
        }
        "alias" | "sub-class-of" => {
            if let Some(media_type) = state.current {
                match attrs.get("type").map(|t| MediaType::parse(t)) {
                    Some(Ok(other)) if name == "alias" => {
                        registry.add_alias(media_type, other);
                    }
                    Some(Ok(other)) => {
                        registry.add_parent(media_type, other);
                    }
                    Some(Err(e)) => warn!(package, %media_type, error = %e, "Skipping <{name}>"),
                    None => warn!(package, %media_type, "Skipping <{name}> without type"),
                }
            }
        }
        "magic" => {
            let priority = match attrs.get("priority") {
                Some(p) => p.parse::<u32>().unwrap_or_else(|_| {
                    warn!(package, priority = %p, "Invalid magic priority, using default");
                    DEFAULT_PRIORITY
                }),
                None => DEFAULT_PRIORITY,
            };
            state.signature = Some(Signature::new(priority));
            state.rules.clear();
        }
        "match" => {
            let rule = MagicRule::parse(
                attrs.get("type").map(String::as_str).unwrap_or("string"),
                attrs.get("value").map(String::as_str).unwrap_or_default(),
                attrs.get("offset").map(String::as_str).unwrap_or("0"),
                attrs.get("mask").map(String::as_str),
            );
            match rule {
                Ok(rule) => state.rules.push(rule),
                Err(reason) => {
                    warn!(package, media_type = ?state.current, %reason, "Skipping <match>");
                    // Children of a broken rule have nothing to attach to.
                    state.depth_unknown = 1;
                }
            }
        }
        _ => state.depth_unknown = 1,
    }
    Ok(())
}

fn end_element(package: &str, name: &str, registry: &mut Registry, state: &mut State) {
    if state.depth_unknown > 0 {
        state.depth_unknown -= 1;
        return;
    }
    match name {
        "mime-type" => state.current = None,
        "comment" => {
            state.in_comment = false;
            state.comment_lang = false;
        }
        "match" => {
            if let Some(rule) = state.rules.pop() {
                match (state.rules.last_mut(), state.signature.as_mut()) {
                    (Some(parent), _) => parent.push_child(rule),
                    (None, Some(signature)) => signature.push_rule(rule),
                    (None, None) => warn!(package, "Skipping <match> outside <magic>"),
                }
            }
        }
        "magic" => {
            if let (Some(signature), Some(media_type)) = (state.signature.take(), state.current) {
                if !registry.add_signature(media_type, signature) {
                    debug!(package, %media_type, "Duplicate or empty signature");
                }
            }
        }
        _ => {}
    }
}

fn add_glob(package: &str, media_type: MediaType, attrs: &Attrs, registry: &mut Registry) {
    let Some(pattern) = attrs.get("pattern") else {
        warn!(package, %media_type, "Skipping <glob> without pattern");
        return;
    };
    let weight = attrs
        .get("weight")
        .and_then(|w| w.parse::<u32>().ok())
        .unwrap_or(DEFAULT_GLOB_WEIGHT);
    let case_sensitive = attrs.get("case-sensitive").is_some_and(|v| v == "true");
    if let Err(e) = registry.add_glob_text(media_type, pattern, case_sensitive, weight) {
        warn!(package, %media_type, error = %e, "Skipping <glob>");
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attrs(package: &str, e: &BytesStart<'_>) -> MimeResult<Attrs> {
    let mut out = Attrs::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| MimeError::descriptor(package, err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| MimeError::descriptor(package, err.to_string()))?;
        out.insert(key, value.into_owned());
    }
    Ok(out)
}
