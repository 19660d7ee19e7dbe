//! Conversion entry points
//!
//! Marshalling and unmarshalling fail differently. Producing XML is
//! loud: every schema or value problem comes back as an error. Reading XML is
//! quiet: [`XmlMapper::from_xml`] logs the cause and returns `None`, and only
//! [`XmlMapper::try_from_xml`] hands the cause to the caller. Schema compilation
//! failures are errors on every path.

use std::sync::Arc;

use tracing::error;

use crate::cache::SchemaCache;
use crate::config::Config;
use crate::error::{Result, XmlError};
use crate::options::ConversionOptions;
use crate::reader::Unmarshaller;
use crate::schema::{CompiledSchema, TypeKey, XmlType};
use crate::writer::Marshaller;

/// Schema cache handle plus default conversion options
#[derive(Clone)]
pub struct XmlMapper {
    cache: Arc<SchemaCache>,
    defaults: ConversionOptions,
}

impl XmlMapper {
    /// Mapper over the global cache with default options
    pub fn new() -> Self {
        Self::with_cache(SchemaCache::global())
    }

    pub fn with_cache(cache: Arc<SchemaCache>) -> Self {
        Self {
            cache,
            defaults: ConversionOptions::default(),
        }
    }

    /// Mapper using the configured default options, over a cache of its own
    /// sized by `config.cache`. Clones of the mapper share that cache.
    pub fn from_config(config: &Config) -> Self {
        Self::with_cache(Arc::new(SchemaCache::with_config(&config.cache)))
            .with_defaults(config.conversion_options())
    }

    pub fn with_defaults(mut self, defaults: ConversionOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &ConversionOptions {
        &self.defaults
    }

    pub fn cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    pub fn schema<T: XmlType>(&self) -> Result<Arc<CompiledSchema>> {
        self.cache.schema::<T>()
    }

    /// Marshal with this mapper's default options.
    pub fn to_xml<T: XmlType>(&self, value: &T) -> Result<String> {
        self.to_xml_with(value, &self.defaults)
    }

    pub fn to_xml_with<T: XmlType>(&self, value: &T, options: &ConversionOptions) -> Result<String> {
        let schema = self.cache.schema::<T>()?;
        Marshaller::new(schema, options)
            .marshal(value)
            .map_err(|source| XmlError::Marshal {
                type_name: TypeKey::of::<T>().name(),
                source,
            })
    }

    /// Unmarshal, logging and discarding any parse failure.
    pub fn from_xml<T: XmlType>(&self, text: &str) -> Result<Option<T>> {
        match self.try_from_xml(text) {
            Ok(value) => Ok(Some(value)),
            Err(XmlError::Unmarshal { type_name, source }) => {
                error!(type_name, error = %source, "Failed to unmarshal XML");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Unmarshal, surfacing the parse failure.
    pub fn try_from_xml<T: XmlType>(&self, text: &str) -> Result<T> {
        let schema = self.cache.schema::<T>()?;
        Unmarshaller::new(schema)
            .unmarshal(text)
            .map_err(|source| XmlError::Unmarshal {
                type_name: TypeKey::of::<T>().name(),
                source,
            })
    }
}

impl Default for XmlMapper {
    fn default() -> Self {
        Self::new()
    }
}

/// Marshal `value` with default options through the global cache.
pub fn to_xml<T: XmlType>(value: &T) -> Result<String> {
    XmlMapper::new().to_xml(value)
}

pub fn to_xml_with<T: XmlType>(value: &T, options: &ConversionOptions) -> Result<String> {
    XmlMapper::new().to_xml_with(value, options)
}

/// Unmarshal through the global cache; parse failures are logged and give `None`.
pub fn from_xml<T: XmlType>(text: &str) -> Result<Option<T>> {
    XmlMapper::new().from_xml(text)
}

pub fn try_from_xml<T: XmlType>(text: &str) -> Result<T> {
    XmlMapper::new().try_from_xml(text)
}
