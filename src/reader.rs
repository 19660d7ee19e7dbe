//! One-shot XML reader built from a compiled schema
//!
//! The document is parsed with `roxmltree`, walked against the schema into the
//! serde data model, then bound to the target type.

use std::sync::Arc;

use roxmltree::{Document, Node};
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::error::{UnmarshalError, UnmarshalResult};
use crate::schema::{CompiledSchema, ElementSchema, FieldShape, Occurrence, QName, ScalarKind};

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Per-call XML reader
pub struct Unmarshaller {
    schema: Arc<CompiledSchema>,
}

impl Unmarshaller {
    pub fn new(schema: Arc<CompiledSchema>) -> Self {
        Self { schema }
    }

    pub fn unmarshal<T: DeserializeOwned>(self, text: &str) -> UnmarshalResult<T> {
        let document = Document::parse(text)?;
        let root = document.root_element();

        let expected = self.schema.root_name();
        let found = qname_of(&root);
        if &found != expected {
            return Err(UnmarshalError::UnexpectedRoot {
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }

        let map = read_element(&root, self.schema.root(), &expected.local)?;
        Ok(serde_json::from_value(Value::Object(map))?)
    }
}

fn qname_of(node: &Node<'_, '_>) -> QName {
    let tag = node.tag_name();
    QName {
        namespace: tag.namespace().map(str::to_string),
        local: tag.name().to_string(),
    }
}

fn read_element(
    node: &Node<'_, '_>,
    element: &ElementSchema,
    path: &str,
) -> UnmarshalResult<Map<String, Value>> {
    let mut map = Map::new();

    for attribute in node.attributes() {
        if attribute.namespace() == Some(XSI_NAMESPACE) {
            continue;
        }
        let qname = QName {
            namespace: attribute.namespace().map(str::to_string),
            local: attribute.name().to_string(),
        };
        let Some(field) = element.attribute(&qname) else {
            return Err(UnmarshalError::UnknownAttribute {
                path: path.to_string(),
                name: qname.to_string(),
            });
        };
        let value = scalar_value(
            field_kind(&field.shape),
            attribute.value(),
            &format!("{}/@{}", path, qname.local),
        )?;
        map.insert(field.name.clone(), value);
    }

    for field in &element.attributes {
        if !map.contains_key(&field.name) {
            if field.occurrence == Occurrence::Required {
                return Err(UnmarshalError::Missing {
                    path: path.to_string(),
                    node: "attribute",
                    name: field.qname.to_string(),
                });
            }
            map.insert(field.name.clone(), Value::Null);
        }
    }

    let mut text = String::new();
    for child in node.children() {
        if child.is_text() {
            text.push_str(child.text().unwrap_or_default());
            continue;
        }
        if !child.is_element() {
            continue;
        }

        let qname = qname_of(&child);
        let Some(field) = element.child(&qname) else {
            return Err(UnmarshalError::UnknownElement {
                path: path.to_string(),
                name: qname.to_string(),
            });
        };
        let child_path = format!("{}/{}", path, qname.local);
        let value = match &field.shape {
            FieldShape::Scalar(kind) => {
                scalar_value(*kind, &element_text(&child, &child_path)?, &child_path)?
            }
            FieldShape::Complex(nested) => {
                Value::Object(read_element(&child, nested, &child_path)?)
            }
        };

        if field.occurrence == Occurrence::Repeated {
            if let Value::Array(items) = map
                .entry(field.name.clone())
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                items.push(value);
            }
        } else if map.insert(field.name.clone(), value).is_some() {
            return Err(UnmarshalError::DuplicateElement {
                path: path.to_string(),
                name: qname.to_string(),
            });
        }
    }

    for field in &element.children {
        if map.contains_key(&field.name) {
            continue;
        }
        let absent = match field.occurrence {
            Occurrence::Required => {
                return Err(UnmarshalError::Missing {
                    path: path.to_string(),
                    node: "element",
                    name: field.qname.to_string(),
                });
            }
            Occurrence::Optional => Value::Null,
            Occurrence::Repeated => Value::Array(Vec::new()),
        };
        map.insert(field.name.clone(), absent);
    }

    match &element.text {
        Some(field) => {
            let kind = field_kind(&field.shape);
            let value = if text.is_empty() && field.occurrence == Occurrence::Optional {
                Value::Null
            } else {
                scalar_value(kind, &text, &format!("{}/text()", path))?
            };
            map.insert(field.name.clone(), value);
        }
        None if !text.trim().is_empty() => {
            return Err(UnmarshalError::UnexpectedText {
                path: path.to_string(),
            });
        }
        None => {}
    }

    Ok(map)
}

/// Text content of a simple element; nested elements are not allowed.
fn element_text(node: &Node<'_, '_>, path: &str) -> UnmarshalResult<String> {
    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            return Err(UnmarshalError::UnknownElement {
                path: path.to_string(),
                name: qname_of(&child).to_string(),
            });
        }
        if child.is_text() {
            text.push_str(child.text().unwrap_or_default());
        }
    }
    Ok(text)
}

fn field_kind(shape: &FieldShape) -> ScalarKind {
    match shape {
        FieldShape::Scalar(kind) => *kind,
        FieldShape::Complex(_) => ScalarKind::String,
    }
}

fn scalar_value(kind: ScalarKind, text: &str, path: &str) -> UnmarshalResult<Value> {
    let invalid = || UnmarshalError::InvalidScalar {
        path: path.to_string(),
        expected: kind.as_str(),
        text: text.to_string(),
    };

    match kind {
        ScalarKind::String => Ok(Value::String(text.to_string())),
        ScalarKind::Integer => {
            let trimmed = text.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                Ok(Value::Number(n.into()))
            } else {
                trimmed
                    .parse::<u64>()
                    .map(|n| Value::Number(n.into()))
                    .map_err(|_| invalid())
            }
        }
        ScalarKind::Float => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid),
        ScalarKind::Boolean => match text.trim() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
    }
}
