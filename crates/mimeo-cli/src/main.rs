//! mimeo - detect and inspect media types

mod output;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mimeo_core::config::{self, ConfigLayer, MimeConfig};
use mimeo_core::{Area, MimeDb};

use crate::output::{Detection, EntryReport, ListItem};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "MIMEO_LOG";

#[derive(Parser, Debug)]
#[command(name = "mimeo", author, version, about = "Detect and inspect media types", long_about = None)]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Area to query instead of the configured default
    #[arg(short, long, global = true)]
    area: Option<String>,

    /// Cache entries per area (0 = unbounded)
    #[arg(long, global = true)]
    cache_size: Option<usize>,

    /// Extra package for the default area; repeatable. A path, or bundled:NAME
    #[arg(short, long = "package", global = true)]
    packages: Vec<String>,

    /// Skip packages from the XDG data directories
    #[arg(long, global = true)]
    no_system: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect the media type of files, URIs, or stdin (`-`)
    Detect {
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Match file names only, without reading anything
        #[arg(long)]
        name_only: bool,

        /// Classify every file under directory inputs
        #[arg(short, long)]
        recursive: bool,
    },
    /// Show everything known about a media type or alias
    Show { media_type: String },
    /// List known media types matching a glob such as `image/*`
    List {
        #[arg(default_value = "*")]
        pattern: String,
    },
    /// Print the JSON schema of the config file
    Schema,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Returns `Ok(false)` when something asked for was not found.
fn run(cli: &Cli) -> Result<bool> {
    if let Commands::Schema = cli.command {
        let schema = serde_json::to_string_pretty(&config::generate_schema())?;
        println!("{schema}");
        return Ok(true);
    }

    let config = build_config(cli)?;
    let db = MimeDb::from_config(&config)?;
    let area = db
        .area(db.default_area_name())
        .with_context(|| format!("Cannot open area {}", db.default_area_name()))?;
    debug!(
        area = area.name(),
        types = area.registry().len(),
        packages = area.registry().sources().len(),
        "Area ready"
    );

    match &cli.command {
        Commands::Detect {
            inputs,
            name_only,
            recursive,
        } => detect(&area, inputs, *name_only, *recursive, cli.json),
        Commands::Show { media_type } => show(&area, media_type, cli.json),
        Commands::List { pattern } => list(&area, pattern, cli.json),
        Commands::Schema => Ok(true),
    }
}

/// Defaults, then the config file, then the environment, then flags.
fn build_config(cli: &Cli) -> Result<MimeConfig> {
    let (file, warning) = MimeConfig::load_or_default(cli.config.as_ref());
    if let Some(warning) = warning {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
    let env = ConfigLayer::from_env()?;
    let flags = ConfigLayer {
        default_area: cli.area.clone(),
        cache_capacity: cli.cache_size,
        system_packages: cli.no_system.then_some(false),
        packages: (!cli.packages.is_empty()).then(|| cli.packages.clone()),
        areas: None,
    };
    Ok(MimeConfig::from_layers([ConfigLayer::from(file), env, flags]))
}

fn is_uri(input: &str) -> bool {
    input.contains("://") || input.starts_with("file:")
}

fn detect(area: &Area, inputs: &[String], name_only: bool, recursive: bool, json: bool) -> Result<bool> {
    let mut detections = Vec::new();
    for input in inputs {
        if input == "-" {
            let entry = area
                .resolve_stream(io::stdin().lock())
                .context("Failed to read stdin")?;
            detections.push(Detection::found(input, entry.as_deref()));
            continue;
        }
        if is_uri(input) {
            detections.push(Detection::found(input, area.resolve_uri(input).as_deref()));
            continue;
        }

        let path = Path::new(input);
        if name_only {
            detections.push(Detection::found(input, area.resolve_path(path).as_deref()));
        } else if recursive && path.is_dir() {
            for classified in mimeo_core::classify_tree(path, area) {
                detections.push(Detection::from_classified(&classified));
            }
        } else {
            match area.resolve_file(path) {
                Ok(entry) => detections.push(Detection::found(input, Some(entry.as_ref()))),
                Err(e) => detections.push(Detection::failed(input, &e)),
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&detections)?);
    } else {
        for detection in &detections {
            output::print_detection(detection);
        }
    }
    Ok(detections.iter().all(Detection::is_resolved))
}

fn show(area: &Area, text: &str, json: bool) -> Result<bool> {
    let Some(entry) = area.resolve_str(text)? else {
        eprintln!("{} unknown media type {text}", "error:".red().bold());
        return Ok(false);
    };
    let report = EntryReport::from(entry.as_ref());
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_entry(&report);
    }
    Ok(true)
}

fn list(area: &Area, pattern: &str, json: bool) -> Result<bool> {
    let entries = area.resolve_pattern(pattern)?;
    let items: Vec<ListItem> = entries.iter().map(|e| ListItem::from(e.as_ref())).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for item in &items {
            output::print_list_item(item);
        }
    }
    Ok(!items.is_empty())
}
