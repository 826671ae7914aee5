//! Parallel directory classification.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::area::Area;
use crate::error::MimeError;
use crate::media_type::MediaType;

/// What to walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub hidden: bool,
    pub git_ignore: bool,
    pub max_depth: Option<usize>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            hidden: false,
            git_ignore: true,
            max_depth: None,
        }
    }
}

/// One classified file.
#[derive(Debug, Serialize)]
pub struct Classified {
    pub path: PathBuf,
    pub media_type: Option<MediaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Classified {
    fn ok(path: PathBuf, media_type: MediaType) -> Self {
        Self {
            path,
            media_type: Some(media_type),
            error: None,
        }
    }

    fn failed(path: PathBuf, error: &MimeError) -> Self {
        Self {
            path,
            media_type: None,
            error: Some(error.to_string()),
        }
    }
}

/// Classify every file under `root` with [`Area::resolve_file`], sorted
/// by path. Files that cannot be read are reported with their error.
pub fn classify_tree(root: &Path, area: &Area) -> Vec<Classified> {
    classify_tree_with(root, area, ScanOptions::default())
}

pub fn classify_tree_with(root: &Path, area: &Area, options: ScanOptions) -> Vec<Classified> {
    let mut results: Vec<Classified> = WalkBuilder::new(root)
        .hidden(!options.hidden)
        .git_ignore(options.git_ignore)
        .max_depth(options.max_depth)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .par_bridge()
        .fold(Vec::new, |mut acc, path| {
            let classified = match area.resolve_file(&path) {
                Ok(entry) => Classified::ok(path, entry.media_type()),
                Err(e) => Classified::failed(path, &e),
            };
            acc.push(classified);
            acc
        })
        .reduce(Vec::new, |mut a, b| {
            a.extend(b);
            a
        });
    results.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(root = %root.display(), files = results.len(), area = area.name(), "Classified tree");
    results
}
