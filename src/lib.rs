//! # xml-marshal Library
//!
//! Cached, thread-safe conversion between typed Rust values and XML text.
//!
//! Types describe their XML shape once through [`XmlType`]; the compiled form is
//! cached per type for the life of the process and shared by every thread, while
//! each conversion builds its own one-shot writer or reader. Marshalling reports
//! every failure, unmarshalling logs failures and returns `None`.
//!
//! Alongside the core live a few small helpers: Base64 codecs, entity escaping,
//! text clean-up and application key generation.

pub mod app;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod escape;
pub mod mapper;
pub mod options;
pub mod reader;
pub mod schema;
pub mod text;
pub mod writer;

pub use cache::{SchemaCache, SchemaCacheStats};
pub use codec::{
    decode_base64_string, encode_base64_bytes, encode_base64_file, encode_base64_string,
};
pub use config::{CacheConfig, Config, ConfigManager, NamespaceConfig, OutputConfig};
pub use error::{MarshalError, SchemaError, UnmarshalError, XmlError};
pub use escape::{escape_html4, escape_xml, escape_xml11};
pub use mapper::{XmlMapper, from_xml, to_xml, to_xml_with, try_from_xml};
pub use options::{ConversionOptions, Escaping, NamespacePrefixMapper, PrefixTable};
pub use reader::Unmarshaller;
pub use schema::{
    CompiledSchema, FieldDescriptor, Occurrence, ScalarKind, TypeDescriptor, TypeKey, XmlType,
};
pub use writer::Marshaller;
