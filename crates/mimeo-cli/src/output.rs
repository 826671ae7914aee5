//! Text and JSON rendering.

use colored::Colorize;
use serde::Serialize;

use mimeo_core::{Classified, FilenameMatcher, MimeEntry, MimeError};

#[derive(Debug, Serialize)]
pub struct Detection {
    pub input: String,
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Detection {
    pub fn found(input: &str, entry: Option<&MimeEntry>) -> Self {
        Self {
            input: input.to_string(),
            media_type: entry.map(|e| e.media_type().to_string()),
            comment: entry.and_then(|e| e.comment()).map(str::to_string),
            error: None,
        }
    }

    pub fn failed(input: &str, error: &MimeError) -> Self {
        Self {
            input: input.to_string(),
            media_type: None,
            comment: None,
            error: Some(error.to_string()),
        }
    }

    pub fn from_classified(classified: &Classified) -> Self {
        Self {
            input: classified.path.display().to_string(),
            media_type: classified.media_type.map(|t| t.to_string()),
            comment: None,
            error: classified.error.clone(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.media_type.is_some()
    }
}

pub fn print_detection(detection: &Detection) {
    match (&detection.media_type, &detection.error) {
        (Some(media_type), _) => println!("{}: {}", detection.input, media_type.green()),
        (None, Some(error)) => println!("{}: {}", detection.input, error.red()),
        (None, None) => println!("{}: {}", detection.input, "unknown".yellow()),
    }
}

/// Everything known about one entry.
#[derive(Debug, Serialize)]
pub struct EntryReport {
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    pub aliases: Vec<String>,
    pub parents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_extension: Option<String>,
    pub patterns: Vec<String>,
    pub signatures: usize,
}

impl From<&MimeEntry> for EntryReport {
    fn from(entry: &MimeEntry) -> Self {
        let mut aliases: Vec<String> = entry
            .aliases()
            .into_iter()
            .flatten()
            .map(ToString::to_string)
            .collect();
        aliases.sort();
        Self {
            media_type: entry.media_type().to_string(),
            comment: entry.comment().map(str::to_string),
            suffix: entry.media_type().suffix().map(str::to_string),
            aliases,
            parents: entry.parents().iter().map(ToString::to_string).collect(),
            primary_extension: entry.primary_extension().map(str::to_string),
            patterns: entry.patterns().map(|p| p.glob().to_string()).collect(),
            signatures: entry.signatures().map_or(0, |s| s.len()),
        }
    }
}

pub fn print_entry(report: &EntryReport) {
    println!("{}", report.media_type.bold());
    if let Some(comment) = &report.comment {
        println!("  {}", comment.dimmed());
    }
    let rows = [
        ("aliases", report.aliases.join(", ")),
        ("parents", report.parents.join(", ")),
        ("extension", report.primary_extension.clone().unwrap_or_default()),
        ("patterns", report.patterns.join(", ")),
        ("suffix", report.suffix.clone().unwrap_or_default()),
    ];
    for (label, value) in rows {
        if !value.is_empty() {
            println!("  {:<10} {}", format!("{label}:").cyan(), value);
        }
    }
    if report.signatures > 0 {
        println!("  {:<10} {}", "magic:".cyan(), report.signatures);
    }
}

#[derive(Debug, Serialize)]
pub struct ListItem {
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl From<&MimeEntry> for ListItem {
    fn from(entry: &MimeEntry) -> Self {
        Self {
            media_type: entry.media_type().to_string(),
            comment: entry.comment().map(str::to_string),
        }
    }
}

pub fn print_list_item(item: &ListItem) {
    match &item.comment {
        Some(comment) => println!("{}  {}", item.media_type, comment.dimmed()),
        None => println!("{}", item.media_type),
    }
}
