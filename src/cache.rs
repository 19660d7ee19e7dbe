use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use moka::sync::Cache;
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::{Result, XmlError};
use crate::schema::{CompiledSchema, TypeKey, XmlType};

/// Process-wide cache used by the free conversion functions
static GLOBAL_CACHE: OnceLock<Arc<SchemaCache>> = OnceLock::new();

/// In-memory cache of compiled schemas keyed by type
///
/// Compiling a schema is the expensive step of every conversion, so each type is
/// compiled once and the result shared through `Arc` for the rest of the process.
/// It uses `moka` to handle concurrent access and "thundering herd" protection
/// (a schema is only compiled once even if many threads request it simultaneously).
/// Entries are never evicted: the working set is the fixed set of types an
/// application converts.
pub struct SchemaCache {
    cache: Cache<TypeKey, Arc<CompiledSchema>>,
    hits: AtomicU64,
    misses: AtomicU64,
    compilations: AtomicU64,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::with_config(&CacheConfig::default())
    }

    pub fn with_config(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .initial_capacity(config.initial_capacity)
            .build();

        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            compilations: AtomicU64::new(0),
        }
    }

    /// The shared cache behind [`crate::to_xml`] and [`crate::from_xml`]
    pub fn global() -> Arc<SchemaCache> {
        GLOBAL_CACHE
            .get_or_init(|| Arc::new(SchemaCache::new()))
            .clone()
    }

    /// Get the compiled schema for `T`, compiling it if missing.
    ///
    /// Concurrent requests for the same missing type wait for a single compilation.
    /// A failed compilation is not cached; the next request tries again.
    pub fn schema<T: XmlType>(&self) -> Result<Arc<CompiledSchema>> {
        let key = TypeKey::of::<T>();

        if let Some(schema) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(schema);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        self.cache
            .try_get_with(key, || {
                debug!(type_name = key.name(), "Compiling XML schema");
                self.compilations.fetch_add(1, Ordering::Relaxed);
                CompiledSchema::compile(key, &T::descriptor()).map(Arc::new)
            })
            .map_err(|e| XmlError::SchemaCompilation {
                type_name: key.name(),
                source: (*e).clone(), // Unwrap the Arc<SchemaError> from moka
            })
    }

    /// Check if a schema for `T` has been compiled
    pub fn contains<T: XmlType>(&self) -> bool {
        self.cache.contains_key(&TypeKey::of::<T>())
    }

    /// Get cache statistics
    pub fn stats(&self) -> SchemaCacheStats {
        // Run pending maintenance so the entry count is exact
        self.cache.run_pending_tasks();

        SchemaCacheStats {
            entry_count: self.cache.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compilations: self.compilations.load(Ordering::Relaxed),
        }
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for schema cache operations
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchemaCacheStats {
    pub entry_count: u64,
    pub hits: u64,
    pub misses: u64,
    pub compilations: u64,
}
