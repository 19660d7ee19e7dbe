use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Post-processing applied to marshalled text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Escaping {
    /// Return the document verbatim
    #[default]
    None,
    /// Escape for embedding inside another XML document
    Xml,
    /// Escape for embedding inside HTML
    Html,
}

/// Chooses the prefix written for a namespace URI
///
/// `suggestion` is the prefix that would be generated otherwise. Returning `None`
/// keeps it; returning `Some("")` asks for the default namespace.
pub trait NamespacePrefixMapper: Send + Sync {
    fn preferred_prefix(&self, namespace_uri: &str, suggestion: &str) -> Option<String>;
}

impl<F> NamespacePrefixMapper for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn preferred_prefix(&self, namespace_uri: &str, _suggestion: &str) -> Option<String> {
        self(namespace_uri)
    }
}

/// Fixed URI to prefix table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixTable {
    prefixes: BTreeMap<String, String>,
}

impl PrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, namespace_uri: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.prefixes.insert(namespace_uri.into(), prefix.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl From<BTreeMap<String, String>> for PrefixTable {
    fn from(prefixes: BTreeMap<String, String>) -> Self {
        Self { prefixes }
    }
}

impl NamespacePrefixMapper for PrefixTable {
    fn preferred_prefix(&self, namespace_uri: &str, _suggestion: &str) -> Option<String> {
        self.prefixes.get(namespace_uri).cloned()
    }
}

/// Per-call conversion behaviour
#[derive(Clone)]
pub struct ConversionOptions {
    pub namespace_prefix_mapper: Option<Arc<dyn NamespacePrefixMapper>>,
    /// Omit the XML declaration
    pub fragment: bool,
    pub pretty_print: bool,
    pub escaping: Escaping,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            namespace_prefix_mapper: None,
            fragment: true,
            pretty_print: false,
            escaping: Escaping::None,
        }
    }
}

impl ConversionOptions {
    pub fn with_prefix_mapper(mut self, mapper: impl NamespacePrefixMapper + 'static) -> Self {
        self.namespace_prefix_mapper = Some(Arc::new(mapper));
        self
    }

    pub fn with_fragment(mut self, fragment: bool) -> Self {
        self.fragment = fragment;
        self
    }

    pub fn with_pretty_print(mut self, pretty_print: bool) -> Self {
        self.pretty_print = pretty_print;
        self
    }

    pub fn with_escaping(mut self, escaping: Escaping) -> Self {
        self.escaping = escaping;
        self
    }
}

impl fmt::Debug for ConversionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionOptions")
            .field(
                "namespace_prefix_mapper",
                &self.namespace_prefix_mapper.as_ref().map(|_| ".."),
            )
            .field("fragment", &self.fragment)
            .field("pretty_print", &self.pretty_print)
            .field("escaping", &self.escaping)
            .finish()
    }
}
