use super::*;

/// Area used when a query does not name one.
pub const ENV_AREA: &str = "MIMEO_AREA";
/// Cache entries per area; `0` means unbounded.
pub const ENV_CACHE_SIZE: &str = "MIMEO_CACHE_SIZE";

/// A partial configuration. Unset fields leave the value below untouched.
///
/// Layers compose defaults, a config file, the environment, and command
/// line flags through [`MimeConfig::from_layers`]. Scalars are replaced,
/// `packages` are appended without duplicates, and `areas` replace any
/// earlier area of the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub default_area: Option<String>,
    pub cache_capacity: Option<usize>,
    pub system_packages: Option<bool>,
    pub packages: Option<Vec<String>>,
    pub areas: Option<Vec<AreaConfig>>,
}

impl ConfigLayer {
    /// Read `MIMEO_AREA` and `MIMEO_CACHE_SIZE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Like [`ConfigLayer::from_env`] with a custom variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut layer = Self::default();
        if let Some(area) = lookup(ENV_AREA).filter(|v| !v.trim().is_empty()) {
            layer.default_area = Some(area.trim().to_string());
        }
        if let Some(value) = lookup(ENV_CACHE_SIZE) {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|e| ConfigError::InvalidEnv {
                    var: ENV_CACHE_SIZE,
                    value: value.clone(),
                    reason: e.to_string(),
                })?;
            layer.cache_capacity = Some(parsed);
        }
        Ok(layer)
    }

    pub fn apply_to(self, config: &mut MimeConfig) {
        if let Some(area) = self.default_area {
            config.default_area = area;
        }
        if let Some(capacity) = self.cache_capacity {
            config.cache_capacity = capacity;
        }
        if let Some(system) = self.system_packages {
            config.system_packages = system;
        }
        if let Some(packages) = self.packages {
            for package in packages {
                if !config.packages.contains(&package) {
                    config.packages.push(package);
                }
            }
        }
        if let Some(areas) = self.areas {
            for area in areas {
                match config.areas.iter_mut().find(|a| a.name == area.name) {
                    Some(existing) => *existing = area,
                    None => config.areas.push(area),
                }
            }
        }
    }
}

impl From<MimeConfig> for ConfigLayer {
    /// A layer that sets every field.
    fn from(config: MimeConfig) -> Self {
        Self {
            default_area: Some(config.default_area),
            cache_capacity: Some(config.cache_capacity),
            system_packages: Some(config.system_packages),
            packages: Some(config.packages),
            areas: Some(config.areas),
        }
    }
}
