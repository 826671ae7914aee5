//! Area bindings and the process-wide default database.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::area::Area;
use crate::cache::CacheCapacity;
use crate::config::{ConfigLayer, MimeConfig};
use crate::error::{MimeError, MimeResult};
use crate::package::{self, PackageSource};

/// Name of the area every [`MimeDb`] binds on construction.
pub const DEFAULT_AREA: &str = "default";

static GLOBAL: OnceLock<MimeDb> = OnceLock::new();

/// The packages an area loads, in precedence order, and its cache size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaBinding {
    pub sources: Vec<PackageSource>,
    pub capacity: CacheCapacity,
}

impl AreaBinding {
    pub fn new(sources: Vec<PackageSource>, capacity: CacheCapacity) -> Self {
        Self { sources, capacity }
    }

    /// Every bundled package.
    pub fn bundled() -> Self {
        Self::new(package::bundled_sources(), CacheCapacity::default())
    }

    /// Exactly one package, for a fully controlled area.
    pub fn single(source: PackageSource) -> Self {
        Self::new(vec![source], CacheCapacity::default())
    }

    pub fn with_capacity(mut self, capacity: CacheCapacity) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Named areas, built lazily on first reference.
///
/// Binding a name only records which packages it loads. The area itself is
/// built the first time [`MimeDb::area`] asks for it and then shared until
/// the name is bound again.
#[derive(Debug)]
pub struct MimeDb {
    default_area: String,
    bindings: RwLock<HashMap<String, AreaBinding>>,
    areas: RwLock<HashMap<String, Arc<Area>>>,
}

impl MimeDb {
    /// A database whose default area loads every bundled package.
    pub fn new() -> Self {
        Self::with_default(AreaBinding::bundled())
    }

    pub fn with_default(binding: AreaBinding) -> Self {
        Self {
            default_area: DEFAULT_AREA.to_string(),
            bindings: RwLock::new(HashMap::from([(DEFAULT_AREA.to_string(), binding)])),
            areas: RwLock::new(HashMap::new()),
        }
    }

    /// Bind the default area and every configured area.
    pub fn from_config(config: &MimeConfig) -> MimeResult<Self> {
        config.validate()?;
        let mut db = Self::with_default(config.default_binding());
        for area in &config.areas {
            db.bind_area(area.name.clone(), area.binding(config.cache_capacity));
        }
        db.default_area.clone_from(&config.default_area);
        Ok(db)
    }

    /// The process-wide database, configured from the environment on first
    /// use (`MIMEO_AREA`, `MIMEO_CACHE_SIZE`).
    pub fn global() -> &'static MimeDb {
        GLOBAL.get_or_init(|| {
            let env = ConfigLayer::from_env().unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring invalid environment configuration");
                ConfigLayer::default()
            });
            let config = MimeConfig::from_layers([env]);
            MimeDb::from_config(&config).unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to the bundled default area");
                MimeDb::new()
            })
        })
    }

    pub fn default_area_name(&self) -> &str {
        &self.default_area
    }

    /// Bind `name` to `binding`, replacing any earlier binding. An area
    /// already built under this name is dropped and rebuilt on next use;
    /// callers holding the old `Arc<Area>` keep a working snapshot.
    pub fn bind_area(&self, name: impl Into<String>, binding: AreaBinding) -> Option<AreaBinding> {
        let name = name.into();
        debug!(area = %name, packages = binding.sources.len(), "Binding area");
        self.areas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name);
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, binding)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Bound area names, sorted.
    pub fn area_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn binding(&self, name: &str) -> MimeResult<AreaBinding> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| MimeError::UnknownNamespace(name.to_string()))
    }

    fn built(&self, name: &str) -> Option<Arc<Area>> {
        self.areas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// The area bound to `name`, building it on first use.
    ///
    /// Packages load without holding any lock, so two threads asking for a
    /// new area at once may both build it; the first one stored is kept.
    pub fn area(&self, name: &str) -> MimeResult<Arc<Area>> {
        if let Some(area) = self.built(name) {
            return Ok(area);
        }
        let binding = self.binding(name)?;
        Ok(self.store(name, &binding))
    }

    fn store(&self, name: &str, binding: &AreaBinding) -> Arc<Area> {
        let built = Arc::new(Area::from_sources(name, &binding.sources, binding.capacity));
        let mut areas = self.areas.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(areas.entry(name.to_string()).or_insert(built))
    }

    /// The area queries use when none is named.
    pub fn default_area(&self) -> Arc<Area> {
        match self.area(&self.default_area) {
            Ok(area) => area,
            Err(_) => self.store(&self.default_area, &AreaBinding::bundled()),
        }
    }

    /// Change an area's cache limit, now and for future rebuilds.
    pub fn set_capacity(&self, name: &str, capacity: CacheCapacity) -> MimeResult<()> {
        {
            let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
            let binding = bindings
                .get_mut(name)
                .ok_or_else(|| MimeError::UnknownNamespace(name.to_string()))?;
            binding.capacity = capacity;
        }
        if let Some(area) = self.built(name) {
            area.cache().set_capacity(capacity);
        }
        Ok(())
    }

    /// Empty an area's cache. The registry is kept.
    pub fn clear(&self, name: &str) -> MimeResult<()> {
        if !self.is_bound(name) {
            return Err(MimeError::UnknownNamespace(name.to_string()));
        }
        if let Some(area) = self.built(name) {
            area.cache().clear();
        }
        Ok(())
    }
}

impl Default for MimeDb {
    fn default() -> Self {
        Self::new()
    }
}
