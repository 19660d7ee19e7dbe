use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Once};

use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use xml_marshal::config::EnvProvider;
use xml_marshal::{SchemaCache, XmlMapper};

static TRACING: Once = Once::new();

/// Route library logs through the test harness; honours `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Mapper over a private cache so cache statistics are not shared between tests
pub fn isolated_mapper() -> XmlMapper {
    init_tracing();
    XmlMapper::with_cache(Arc::new(SchemaCache::new()))
}

/// Mock environment variable provider for testing
#[derive(Default)]
pub struct MockEnvProvider {
    vars: HashMap<String, String>,
}

impl MockEnvProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

impl EnvProvider for MockEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Write `content` to `name` inside a fresh temporary directory.
pub fn write_temp_file(name: &str, content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    (temp_dir, path)
}

/// Every `&` in `text` must open one of the entities the escaper produces.
pub fn ampersands_start_entities(text: &str) -> bool {
    text.match_indices('&').all(|(i, _)| {
        let rest = &text[i..];
        rest.starts_with("&amp;")
            || rest.starts_with("&lt;")
            || rest.starts_with("&gt;")
            || rest.starts_with("&quot;")
            || rest.starts_with("&apos;")
    })
}
