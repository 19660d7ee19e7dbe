//! One-shot XML writer built from a compiled schema
//!
//! A [`Marshaller`] holds per-call state (resolved namespace prefixes, output
//! flags) and is consumed by [`Marshaller::marshal`]. It is never cached and never
//! handed to another thread; only the `Arc<CompiledSchema>` it was built from is
//! shared.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName as RawName;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{MarshalError, MarshalResult};
use crate::escape::{escape_html4, escape_xml11};
use crate::options::{ConversionOptions, Escaping, NamespacePrefixMapper};
use crate::schema::{
    CompiledSchema, ElementSchema, FieldSchema, FieldShape, Occurrence, QName, ScalarKind,
    is_xml_name,
};

const INDENT_SIZE: usize = 4;

/// Per-call XML writer
pub struct Marshaller {
    schema: Arc<CompiledSchema>,
    /// (namespace URI, prefix) in declaration order; an empty prefix is the default namespace
    prefixes: Vec<(String, String)>,
    fragment: bool,
    pretty_print: bool,
    escaping: Escaping,
}

impl Marshaller {
    pub fn new(schema: Arc<CompiledSchema>, options: &ConversionOptions) -> Self {
        let prefixes = assign_prefixes(&schema, options.namespace_prefix_mapper.as_deref());
        Self {
            schema,
            prefixes,
            fragment: options.fragment,
            pretty_print: options.pretty_print,
            escaping: options.escaping,
        }
    }

    /// Prefix chosen for `namespace_uri`, if the schema uses it
    pub fn prefix_for(&self, namespace_uri: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(uri, _)| uri == namespace_uri)
            .map(|(_, prefix)| prefix.as_str())
    }

    /// Serialize `value` and apply the configured escaping.
    pub fn marshal<T: Serialize + ?Sized>(self, value: &T) -> MarshalResult<String> {
        let value = serde_json::to_value(value)?;
        let root_name = self.schema.root_name();
        let Value::Object(map) = &value else {
            return Err(MarshalError::NotAStructure {
                path: root_name.local.clone(),
                found: value_kind(&value),
            });
        };

        let mut writer = if self.pretty_print {
            Writer::new_with_indent(Vec::new(), b' ', INDENT_SIZE)
        } else {
            Writer::new(Vec::new())
        };

        if !self.fragment {
            emit(
                &mut writer,
                Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
            )?;
        }
        self.write_element(
            &mut writer,
            root_name,
            self.schema.root(),
            map,
            &root_name.local,
            true,
        )?;

        let xml = String::from_utf8(writer.into_inner())
            .map_err(|e| MarshalError::Writer(e.to_string()))?;

        Ok(match self.escaping {
            Escaping::None => xml,
            Escaping::Xml => escape_xml11(&xml),
            Escaping::Html => escape_html4(&xml),
        })
    }

    fn qualify(&self, qname: &QName) -> String {
        match qname.namespace.as_deref().and_then(|uri| self.prefix_for(uri)) {
            Some("") | None => qname.local.clone(),
            Some(prefix) => format!("{}:{}", prefix, qname.local),
        }
    }

    fn write_element(
        &self,
        writer: &mut Writer<Vec<u8>>,
        qname: &QName,
        element: &ElementSchema,
        map: &Map<String, Value>,
        path: &str,
        is_root: bool,
    ) -> MarshalResult<()> {
        if let Some(field) = map.keys().find(|key| !element.has_field(key)) {
            return Err(MarshalError::UnmappedField {
                path: path.to_string(),
                field: field.clone(),
            });
        }

        let name = self.qualify(qname);
        let mut start = BytesStart::new(name.as_str());

        if is_root {
            for (uri, prefix) in &self.prefixes {
                if prefix.is_empty() {
                    start.push_attribute(("xmlns", uri.as_str()));
                } else {
                    start.push_attribute((format!("xmlns:{}", prefix).as_str(), uri.as_str()));
                }
            }
        }

        for field in &element.attributes {
            let field_path = format!("{}/@{}", path, field.qname.local);
            let Some(value) = present(map, field) else {
                if field.occurrence == Occurrence::Required {
                    return Err(MarshalError::MissingField { path: field_path });
                }
                continue;
            };
            let text = scalar_text(scalar_kind(field), value, &field_path)?;
            let key = self.qualify(&field.qname);
            start.push_attribute(Attribute {
                key: RawName(key.as_bytes()),
                value: Cow::Owned(escape_attribute(&text).into_bytes()),
            });
        }

        let text = match &element.text {
            Some(field) => match present(map, field) {
                Some(value) => Some(scalar_text(scalar_kind(field), value, path)?),
                None if field.occurrence == Occurrence::Required => {
                    return Err(MarshalError::MissingField {
                        path: format!("{}/text()", path),
                    });
                }
                None => None,
            },
            None => None,
        };

        let has_children = element.children.iter().any(|field| match present(map, field) {
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
            None => field.occurrence == Occurrence::Required,
        });

        if !has_children && text.as_deref().is_none_or(str::is_empty) {
            return emit(writer, Event::Empty(start));
        }

        emit(writer, Event::Start(start))?;
        if let Some(text) = &text {
            emit(writer, Event::Text(BytesText::from_escaped(escape_text(text))))?;
        }

        for field in &element.children {
            let field_path = format!("{}/{}", path, field.qname.local);
            match (field.occurrence, present(map, field)) {
                (Occurrence::Required, None) => {
                    return Err(MarshalError::MissingField { path: field_path });
                }
                (_, None) => {}
                (Occurrence::Repeated, Some(Value::Array(items))) => {
                    for (i, item) in items.iter().enumerate() {
                        self.write_child(writer, field, item, &format!("{}[{}]", field_path, i))?;
                    }
                }
                (Occurrence::Repeated, Some(other)) => {
                    return Err(MarshalError::NotASequence {
                        path: field_path,
                        found: value_kind(other),
                    });
                }
                (_, Some(value)) => self.write_child(writer, field, value, &field_path)?,
            }
        }

        emit(writer, Event::End(BytesEnd::new(name.as_str())))
    }

    fn write_child(
        &self,
        writer: &mut Writer<Vec<u8>>,
        field: &FieldSchema,
        value: &Value,
        path: &str,
    ) -> MarshalResult<()> {
        match &field.shape {
            FieldShape::Scalar(kind) => {
                let text = scalar_text(*kind, value, path)?;
                let name = self.qualify(&field.qname);
                if text.is_empty() {
                    return emit(writer, Event::Empty(BytesStart::new(name.as_str())));
                }
                emit(writer, Event::Start(BytesStart::new(name.as_str())))?;
                emit(writer, Event::Text(BytesText::from_escaped(escape_text(&text))))?;
                emit(writer, Event::End(BytesEnd::new(name.as_str())))
            }
            FieldShape::Complex(nested) => match value {
                Value::Object(map) => {
                    self.write_element(writer, &field.qname, nested, map, path, false)
                }
                other => Err(MarshalError::NotAStructure {
                    path: path.to_string(),
                    found: value_kind(other),
                }),
            },
        }
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> MarshalResult<()> {
    writer
        .write_event(event)
        .map_err(|e| MarshalError::Writer(e.to_string()))
}

/// Resolve one prefix per namespace URI. Mapper answers that are not valid
/// prefixes, or that collide with an earlier choice, fall back to `nsN`.
fn assign_prefixes(
    schema: &CompiledSchema,
    mapper: Option<&dyn NamespacePrefixMapper>,
) -> Vec<(String, String)> {
    let mut taken = HashSet::new();
    let mut prefixes = Vec::with_capacity(schema.namespaces().len());

    for (i, uri) in schema.namespaces().iter().enumerate() {
        let mut counter = i + 1;
        let generated = format!("ns{}", counter);

        let preferred = mapper
            .and_then(|mapper| mapper.preferred_prefix(uri, &generated))
            .filter(|prefix| {
                let usable = if prefix.is_empty() {
                    !schema.has_unqualified_elements() && !schema.qualifies_attributes(uri)
                } else {
                    is_prefix(prefix)
                };
                if !usable || taken.contains(prefix) {
                    warn!(
                        namespace = %uri,
                        prefix = %prefix,
                        fallback = %generated,
                        "Rejected namespace prefix"
                    );
                    return false;
                }
                true
            });

        let mut prefix = preferred.unwrap_or(generated);
        while taken.contains(&prefix) {
            counter += 1;
            prefix = format!("ns{}", counter);
        }
        taken.insert(prefix.clone());
        prefixes.push((uri.clone(), prefix));
    }

    prefixes
}

/// A usable namespace prefix: an XML name outside the reserved `xml` space
pub(crate) fn is_prefix(prefix: &str) -> bool {
    is_xml_name(prefix)
        && !prefix
            .get(..3)
            .is_some_and(|head| head.eq_ignore_ascii_case("xml"))
}

fn present<'v>(map: &'v Map<String, Value>, field: &FieldSchema) -> Option<&'v Value> {
    map.get(&field.name).filter(|value| !value.is_null())
}

fn scalar_kind(field: &FieldSchema) -> ScalarKind {
    match &field.shape {
        FieldShape::Scalar(kind) => *kind,
        // Compilation only admits scalar attributes and text.
        FieldShape::Complex(_) => ScalarKind::String,
    }
}

/// Attribute value with markup escaped and `\t \n \r` kept as character
/// references, so attribute-value normalization on read leaves them intact.
fn escape_attribute(text: &str) -> String {
    escape(text)
        .replace('\t', "&#9;")
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
}

/// Text content with markup escaped; `\r` is a character reference so that
/// line-ending normalization on read does not fold it away.
fn escape_text(text: &str) -> String {
    escape(text).replace('\r', "&#13;")
}

/// Characters outside the XML 1.0 `Char` production
fn is_forbidden_char(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}'
    )
}

fn scalar_text(kind: ScalarKind, value: &Value, path: &str) -> MarshalResult<String> {
    match (kind, value) {
        (ScalarKind::String, Value::String(s)) => {
            match s.chars().find(|&c| is_forbidden_char(c)) {
                Some(c) => Err(MarshalError::InvalidCharacter {
                    path: path.to_string(),
                    code_point: c as u32,
                }),
                None => Ok(s.clone()),
            }
        }
        (ScalarKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        (ScalarKind::Float, Value::Number(n)) => Ok(n.to_string()),
        (ScalarKind::Boolean, Value::Bool(b)) => Ok(b.to_string()),
        _ => Err(MarshalError::ScalarMismatch {
            path: path.to_string(),
            expected: kind.as_str(),
            found: value_kind(value),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "structure",
    }
}
