//! Configuration for areas, packages, and caches

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{CacheCapacity, DEFAULT_CACHE_CAPACITY};
use crate::db::{AreaBinding, DEFAULT_AREA};
use crate::package::{self, MAX_PACKAGE_SIZE, PackageSource};

mod builder;
mod layer;


pub use builder::MimeConfigBuilder;
pub use layer::{ConfigLayer, ENV_AREA, ENV_CACHE_SIZE};

/// Errors that make a configuration unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Area names must not be empty")]
    EmptyAreaName,

    #[error("Area {0:?} is declared more than once")]
    DuplicateArea(String),

    /// Configured areas cannot take the name of the built-in default area.
    #[error("Area {0:?} is reserved")]
    ReservedArea(String),

    #[error("Default area {0:?} is not declared")]
    UnknownDefaultArea(String),

    #[error("Invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Top-level configuration, usually read from `mimeo.toml`.
///
/// ```toml
/// default_area = "default"
/// cache_capacity = 1024
/// system_packages = true
/// packages = ["/opt/site/mime/site.xml"]
///
/// [[areas]]
/// name = "strict"
/// packages = ["bundled:freedesktop.org.xml"]
/// capacity = 0
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MimeConfig {
    #[schemars(description = "Area used when a query does not name one")]
    pub default_area: String,

    #[schemars(description = "Cache entries per area; 0 means unbounded")]
    pub cache_capacity: usize,

    #[schemars(
        description = "Load mime/packages/*.xml from the XDG data directories into the default area"
    )]
    pub system_packages: bool,

    #[schemars(
        description = "Extra packages for the default area, loaded last. Paths, or bundled:NAME"
    )]
    pub packages: Vec<String>,

    #[schemars(description = "Additional named areas")]
    pub areas: Vec<AreaConfig>,
}

impl Default for MimeConfig {
    fn default() -> Self {
        Self {
            default_area: DEFAULT_AREA.to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            system_packages: true,
            packages: Vec::new(),
            areas: Vec::new(),
        }
    }
}

/// One named area.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AreaConfig {
    #[schemars(description = "Area name")]
    pub name: String,

    #[schemars(description = "Packages in precedence order. Paths, or bundled:NAME")]
    pub packages: Vec<String>,

    #[schemars(description = "Cache entries for this area; 0 means unbounded. Defaults to cache_capacity")]
    pub capacity: Option<usize>,

    #[schemars(description = "Load every bundled package before the listed ones")]
    pub include_bundled: bool,
}

impl AreaConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.packages.push(package.into());
        self
    }

    pub fn binding(&self, default_capacity: usize) -> AreaBinding {
        let mut sources = if self.include_bundled {
            package::bundled_sources()
        } else {
            Vec::new()
        };
        sources.extend(parse_sources(&self.packages));
        AreaBinding::new(
            sources,
            CacheCapacity::from_count(self.capacity.unwrap_or(default_capacity)),
        )
    }
}

fn parse_sources(packages: &[String]) -> impl Iterator<Item = PackageSource> + '_ {
    packages.iter().map(|p| match p.parse() {
        Ok(source) => source,
        Err(never) => match never {},
    })
}

impl MimeConfig {
    pub fn builder() -> MimeConfigBuilder {
        MimeConfigBuilder::new()
    }

    /// Load a TOML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?
            .len();
        if size > MAX_PACKAGE_SIZE {
            anyhow::bail!("Config {} is too large ({size} bytes)", path.display());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config or use default, returning any load warning.
    ///
    /// A path that cannot be read or parsed yields the default config plus
    /// a message, so a typo never silently changes behavior.
    pub fn load_or_default(path: Option<&PathBuf>) -> (Self, Option<String>) {
        match path {
            Some(p) => match Self::load(p) {
                Ok(config) => (config, None),
                Err(e) => {
                    let warning = format!(
                        "Failed to load config {}: {e:#}. Using defaults.",
                        p.display()
                    );
                    (Self::default(), Some(warning))
                }
            },
            None => (Self::default(), None),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for area in &self.areas {
            if area.name.trim().is_empty() {
                return Err(ConfigError::EmptyAreaName);
            }
            if area.name == DEFAULT_AREA {
                return Err(ConfigError::ReservedArea(area.name.clone()));
            }
            if !seen.insert(area.name.as_str()) {
                return Err(ConfigError::DuplicateArea(area.name.clone()));
            }
        }
        if self.default_area != DEFAULT_AREA && !seen.contains(self.default_area.as_str()) {
            return Err(ConfigError::UnknownDefaultArea(self.default_area.clone()));
        }
        Ok(())
    }

    /// Packages for the built-in default area: bundled, then system, then
    /// configured extras.
    pub fn default_binding(&self) -> AreaBinding {
        let mut sources = package::bundled_sources();
        if self.system_packages {
            sources.extend(package::system_sources());
        }
        sources.extend(parse_sources(&self.packages));
        AreaBinding::new(sources, CacheCapacity::from_count(self.cache_capacity))
    }

    /// Fold `layers` over the defaults; later layers override earlier ones.
    pub fn from_layers(layers: impl IntoIterator<Item = ConfigLayer>) -> Self {
        layers.into_iter().fold(Self::default(), |mut config, layer| {
            layer.apply_to(&mut config);
            config
        })
    }
}

/// JSON schema for [`MimeConfig`].
pub fn generate_schema() -> schemars::Schema {
    schemars::schema_for!(MimeConfig)
}
