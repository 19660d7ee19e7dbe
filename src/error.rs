use thiserror::Error;

use crate::config::ConfigError;

/// Main library error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Schema compilation failed for {type_name}: {source}")]
    SchemaCompilation {
        type_name: &'static str,
        #[source]
        source: SchemaError,
    },

    #[error("Marshalling {type_name} failed: {source}")]
    Marshal {
        type_name: &'static str,
        #[source]
        source: MarshalError,
    },

    #[error("Unmarshalling {type_name} failed: {source}")]
    Unmarshal {
        type_name: &'static str,
        #[source]
        source: UnmarshalError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    #[error("Decoded content is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Reasons a type description cannot be turned into a compiled schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Invalid XML name '{name}' in {context}")]
    InvalidName { name: String, context: String },

    #[error("Empty namespace URI in {context}")]
    EmptyNamespace { context: String },

    #[error("Duplicate field '{field}' in <{element}>")]
    DuplicateField { element: String, field: String },

    #[error("Duplicate {node} '{name}' in <{element}>")]
    DuplicateNode {
        element: String,
        node: &'static str,
        name: String,
    },

    #[error("Unsupported shape for field '{field}' in <{element}>: {reason}")]
    UnsupportedShape {
        element: String,
        field: String,
        reason: String,
    },
}

/// Reasons a value cannot be written against its compiled schema
#[derive(Error, Debug)]
pub enum MarshalError {
    #[error("Value could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Expected a structure at {path}, found {found}")]
    NotAStructure { path: String, found: &'static str },

    #[error("Expected a sequence at {path}, found {found}")]
    NotASequence { path: String, found: &'static str },

    #[error("Missing required field at {path}")]
    MissingField { path: String },

    #[error("Field '{field}' at {path} has no mapping in the schema")]
    UnmappedField { path: String, field: String },

    #[error("Expected {expected} at {path}, found {found}")]
    ScalarMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Character U+{code_point:04X} at {path} cannot appear in XML")]
    InvalidCharacter { path: String, code_point: u32 },

    #[error("XML writer error: {0}")]
    Writer(String),
}

/// Reasons XML text cannot be read into a value
#[derive(Error, Debug)]
pub enum UnmarshalError {
    #[error("Malformed XML: {0}")]
    Parse(#[from] roxmltree::Error),

    #[error("Unexpected root element {found}, expected {expected}")]
    UnexpectedRoot { expected: String, found: String },

    #[error("Unknown element {name} at {path}")]
    UnknownElement { path: String, name: String },

    #[error("Unknown attribute {name} at {path}")]
    UnknownAttribute { path: String, name: String },

    #[error("Missing required {node} '{name}' at {path}")]
    Missing {
        path: String,
        node: &'static str,
        name: String,
    },

    #[error("Element '{name}' occurs more than once at {path}")]
    DuplicateElement { path: String, name: String },

    #[error("Unexpected text content at {path}")]
    UnexpectedText { path: String },

    #[error("Cannot read '{text}' as {expected} at {path}")]
    InvalidScalar {
        path: String,
        expected: &'static str,
        text: String,
    },

    #[error("Value could not be bound: {0}")]
    Bind(#[from] serde_json::Error),
}

impl From<ConfigError> for XmlError {
    fn from(err: ConfigError) -> Self {
        XmlError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, XmlError>;

/// Schema compilation result type alias
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

/// Marshal result type alias
pub type MarshalResult<T> = std::result::Result<T, MarshalError>;

/// Unmarshal result type alias
pub type UnmarshalResult<T> = std::result::Result<T, UnmarshalError>;
