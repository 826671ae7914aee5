use super::*;

/// Builder for constructing a [`MimeConfig`] with validation.
///
/// Setters return `&mut Self` for chaining; `build()` validates and drains
/// the builder, so a second call produces a default config.
///
/// ```rust
/// use mimeo_core::config::{AreaConfig, MimeConfig};
///
/// let config = MimeConfig::builder()
///     .cache_capacity(0)
///     .area(AreaConfig::new("strict").with_package("bundled:freedesktop.org.xml"))
///     .default_area("strict")
///     .build()
///     .expect("valid config");
/// assert_eq!(config.default_area, "strict");
/// ```
#[derive(Debug, Default)]
pub struct MimeConfigBuilder {
    default_area: Option<String>,
    cache_capacity: Option<usize>,
    system_packages: Option<bool>,
    packages: Vec<String>,
    areas: Vec<AreaConfig>,
}

impl MimeConfigBuilder {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub fn default_area(&mut self, name: impl Into<String>) -> &mut Self {
        self.default_area = Some(name.into());
        self
    }

    /// `0` means unbounded.
    pub fn cache_capacity(&mut self, capacity: usize) -> &mut Self {
        self.cache_capacity = Some(capacity);
        self
    }

    pub fn system_packages(&mut self, enabled: bool) -> &mut Self {
        self.system_packages = Some(enabled);
        self
    }

    /// Append an extra package for the default area.
    pub fn package(&mut self, package: impl Into<String>) -> &mut Self {
        self.packages.push(package.into());
        self
    }

    pub fn area(&mut self, area: AreaConfig) -> &mut Self {
        self.areas.push(area);
        self
    }

    /// Build and validate.
    pub fn build(&mut self) -> Result<MimeConfig, ConfigError> {
        let config = self.build_unchecked();
        config.validate()?;
        Ok(config)
    }

    /// Build without validation.
    pub fn build_unchecked(&mut self) -> MimeConfig {
        let layer = ConfigLayer {
            default_area: self.default_area.take(),
            cache_capacity: self.cache_capacity.take(),
            system_packages: self.system_packages.take(),
            packages: Some(std::mem::take(&mut self.packages)),
            areas: Some(std::mem::take(&mut self.areas)),
        };
        MimeConfig::from_layers([layer])
    }
}
