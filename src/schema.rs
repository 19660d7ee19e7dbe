//! Type descriptions and their compiled form
//!
//! A type that wants to travel through the XML pipelines implements [`XmlType`],
//! returning a [`TypeDescriptor`] that says which fields become attributes, child
//! elements or text. Field values themselves move through serde, so the same type
//! also derives `Serialize` and `Deserialize`.
//!
//! Compiling a descriptor validates it and builds the lookup tables the writer and
//! reader need. A [`CompiledSchema`] is immutable once built and is shared through
//! `Arc` by every caller that converts the same type.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{SchemaError, SchemaResult};

/// A type with a known XML shape
pub trait XmlType: Serialize + DeserializeOwned + 'static {
    /// Describe the XML structure of this type.
    fn descriptor() -> TypeDescriptor;
}

/// Stable identity of a Rust type, used as the schema cache key
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeKey").field(&self.name).finish()
    }
}

/// Kinds of simple content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Integer,
    Float,
    Boolean,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Boolean => "boolean",
        }
    }
}

/// Where a field lands in the XML tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Attribute,
    Element,
    Text,
}

impl NodeKind {
    fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Attribute => "attribute",
            NodeKind::Element => "element",
            NodeKind::Text => "text",
        }
    }
}

/// How often a field may occur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    Required,
    Optional,
    Repeated,
}

/// Content carried by a field
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Scalar(ScalarKind),
    Complex(TypeDescriptor),
}

/// Description of one complex type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub namespace: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Start a description whose root element is `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            fields: Vec::new(),
        }
    }

    /// Qualify the element and, by default, its child elements.
    pub fn namespace(mut self, uri: impl Into<String>) -> Self {
        self.namespace = Some(uri.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

/// Description of one field of a complex type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name in the serde data model
    pub name: String,
    /// Local XML name, defaults to `name`
    pub xml_name: String,
    pub node: NodeKind,
    pub content: Content,
    pub occurrence: Occurrence,
    /// Explicit namespace; elements otherwise inherit the enclosing type's
    pub namespace: Option<String>,
}

impl FieldDescriptor {
    fn new(name: impl Into<String>, node: NodeKind, content: Content) -> Self {
        let name = name.into();
        Self {
            xml_name: name.clone(),
            name,
            node,
            content,
            occurrence: Occurrence::Required,
            namespace: None,
        }
    }

    pub fn attribute(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::new(name, NodeKind::Attribute, Content::Scalar(kind))
    }

    pub fn element(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::new(name, NodeKind::Element, Content::Scalar(kind))
    }

    pub fn complex(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        Self::new(name, NodeKind::Element, Content::Complex(descriptor))
    }

    /// Simple content of the enclosing element.
    pub fn text(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::new(name, NodeKind::Text, Content::Scalar(kind))
    }

    pub fn xml_name(mut self, xml_name: impl Into<String>) -> Self {
        self.xml_name = xml_name.into();
        self
    }

    pub fn namespace(mut self, uri: impl Into<String>) -> Self {
        self.namespace = Some(uri.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.occurrence = Occurrence::Optional;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.occurrence = Occurrence::Repeated;
        self
    }
}

/// Qualified XML name: optional namespace URI plus local name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(uri) => write!(f, "{{{}}}{}", uri, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Compiled field shape
#[derive(Debug, Clone)]
pub enum FieldShape {
    Scalar(ScalarKind),
    Complex(Box<ElementSchema>),
}

/// Compiled field
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: String,
    pub qname: QName,
    pub shape: FieldShape,
    pub occurrence: Occurrence,
}

/// Compiled element: its fields grouped by node kind, plus lookup indexes
#[derive(Debug, Clone)]
pub struct ElementSchema {
    pub attributes: Vec<FieldSchema>,
    pub children: Vec<FieldSchema>,
    pub text: Option<FieldSchema>,
    attribute_index: HashMap<QName, usize>,
    child_index: HashMap<QName, usize>,
    field_names: HashSet<String>,
}

impl ElementSchema {
    pub fn attribute(&self, qname: &QName) -> Option<&FieldSchema> {
        self.attribute_index.get(qname).map(|&i| &self.attributes[i])
    }

    pub fn child(&self, qname: &QName) -> Option<&FieldSchema> {
        self.child_index.get(qname).map(|&i| &self.children[i])
    }

    /// Whether `name` is a serde field of this element
    pub fn has_field(&self, name: &str) -> bool {
        self.field_names.contains(name)
    }
}

/// Validated, indexed, immutable form of a [`TypeDescriptor`]
#[derive(Debug)]
pub struct CompiledSchema {
    key: TypeKey,
    root_name: QName,
    root: ElementSchema,
    namespaces: Vec<String>,
    attribute_namespaces: HashSet<String>,
    has_unqualified_elements: bool,
}

impl CompiledSchema {
    pub fn compile(key: TypeKey, descriptor: &TypeDescriptor) -> SchemaResult<Self> {
        let mut compiler = Compiler::default();

        check_name(&descriptor.name, "root element")?;
        let root_ns = compiler.namespace(descriptor.namespace.as_deref(), &descriptor.name)?;
        let root_name = QName {
            namespace: root_ns.clone(),
            local: descriptor.name.clone(),
        };
        compiler.note_element(&root_name);
        let root = compiler.element(descriptor, root_ns)?;

        Ok(Self {
            key,
            root_name,
            root,
            namespaces: compiler.namespaces,
            attribute_namespaces: compiler.attribute_namespaces,
            has_unqualified_elements: compiler.has_unqualified_elements,
        })
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn root_name(&self) -> &QName {
        &self.root_name
    }

    pub fn root(&self) -> &ElementSchema {
        &self.root
    }

    /// Distinct namespace URIs in order of first appearance
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    pub fn has_unqualified_elements(&self) -> bool {
        self.has_unqualified_elements
    }

    /// Whether some attribute is qualified with `uri`; such a namespace always
    /// needs a non-empty prefix.
    pub fn qualifies_attributes(&self, uri: &str) -> bool {
        self.attribute_namespaces.contains(uri)
    }
}

#[derive(Default)]
struct Compiler {
    namespaces: Vec<String>,
    attribute_namespaces: HashSet<String>,
    has_unqualified_elements: bool,
}

impl Compiler {
    fn namespace(&mut self, uri: Option<&str>, context: &str) -> SchemaResult<Option<String>> {
        match uri {
            None => Ok(None),
            Some("") => Err(SchemaError::EmptyNamespace {
                context: format!("<{}>", context),
            }),
            Some(uri) => {
                if !self.namespaces.iter().any(|known| known == uri) {
                    self.namespaces.push(uri.to_string());
                }
                Ok(Some(uri.to_string()))
            }
        }
    }

    fn note_element(&mut self, qname: &QName) {
        if qname.namespace.is_none() {
            self.has_unqualified_elements = true;
        }
    }

    /// `element_ns` is the namespace the element itself was written in; child
    /// elements inherit the descriptor's namespace, falling back to it.
    fn element(
        &mut self,
        descriptor: &TypeDescriptor,
        element_ns: Option<String>,
    ) -> SchemaResult<ElementSchema> {
        let element = descriptor.name.as_str();
        let own_ns = self.namespace(descriptor.namespace.as_deref(), element)?;
        let child_ns = own_ns.or(element_ns);

        let mut schema = ElementSchema {
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
            attribute_index: HashMap::new(),
            child_index: HashMap::new(),
            field_names: HashSet::new(),
        };

        for field in &descriptor.fields {
            if field.name.is_empty() {
                return Err(SchemaError::InvalidName {
                    name: String::new(),
                    context: format!("field of <{}>", element),
                });
            }
            if !schema.field_names.insert(field.name.clone()) {
                return Err(SchemaError::DuplicateField {
                    element: element.to_string(),
                    field: field.name.clone(),
                });
            }

            let unsupported = |reason: &str| SchemaError::UnsupportedShape {
                element: element.to_string(),
                field: field.name.clone(),
                reason: reason.to_string(),
            };

            match field.node {
                NodeKind::Attribute => {
                    let Content::Scalar(kind) = field.content else {
                        return Err(unsupported("attributes hold simple content only"));
                    };
                    if field.occurrence == Occurrence::Repeated {
                        return Err(unsupported("attributes cannot repeat"));
                    }
                    check_name(&field.xml_name, &format!("attribute of <{}>", element))?;
                    // Unprefixed attributes are never in a namespace.
                    let namespace = self.namespace(field.namespace.as_deref(), element)?;
                    if let Some(uri) = &namespace {
                        self.attribute_namespaces.insert(uri.clone());
                    }
                    let qname = QName {
                        namespace,
                        local: field.xml_name.clone(),
                    };
                    if schema.attribute_index.contains_key(&qname) {
                        return Err(duplicate_node(element, NodeKind::Attribute, &qname));
                    }
                    schema
                        .attribute_index
                        .insert(qname.clone(), schema.attributes.len());
                    schema.attributes.push(FieldSchema {
                        name: field.name.clone(),
                        qname,
                        shape: FieldShape::Scalar(kind),
                        occurrence: field.occurrence,
                    });
                }
                NodeKind::Text => {
                    let Content::Scalar(kind) = field.content else {
                        return Err(unsupported("text holds simple content only"));
                    };
                    if field.occurrence == Occurrence::Repeated {
                        return Err(unsupported("text cannot repeat"));
                    }
                    if schema.text.is_some() {
                        return Err(duplicate_node(
                            element,
                            NodeKind::Text,
                            &QName {
                                namespace: None,
                                local: field.name.clone(),
                            },
                        ));
                    }
                    schema.text = Some(FieldSchema {
                        name: field.name.clone(),
                        qname: QName {
                            namespace: None,
                            local: field.name.clone(),
                        },
                        shape: FieldShape::Scalar(kind),
                        occurrence: field.occurrence,
                    });
                }
                NodeKind::Element => {
                    check_name(&field.xml_name, &format!("child of <{}>", element))?;
                    let namespace = match &field.namespace {
                        Some(uri) => self.namespace(Some(uri), element)?,
                        None => child_ns.clone(),
                    };
                    let qname = QName {
                        namespace,
                        local: field.xml_name.clone(),
                    };
                    if schema.child_index.contains_key(&qname) {
                        return Err(duplicate_node(element, NodeKind::Element, &qname));
                    }
                    self.note_element(&qname);

                    let shape = match &field.content {
                        Content::Scalar(kind) => FieldShape::Scalar(*kind),
                        Content::Complex(nested) => FieldShape::Complex(Box::new(
                            self.element(nested, qname.namespace.clone())?,
                        )),
                    };
                    schema.child_index.insert(qname.clone(), schema.children.len());
                    schema.children.push(FieldSchema {
                        name: field.name.clone(),
                        qname,
                        shape,
                        occurrence: field.occurrence,
                    });
                }
            }
        }

        if schema.text.is_some() && !schema.children.is_empty() {
            return Err(SchemaError::UnsupportedShape {
                element: element.to_string(),
                field: schema
                    .text
                    .as_ref()
                    .map(|text| text.name.clone())
                    .unwrap_or_default(),
                reason: "text cannot be mixed with child elements".to_string(),
            });
        }

        Ok(schema)
    }
}

fn duplicate_node(element: &str, node: NodeKind, qname: &QName) -> SchemaError {
    SchemaError::DuplicateNode {
        element: element.to_string(),
        node: node.as_str(),
        name: qname.to_string(),
    }
}

fn check_name(name: &str, context: &str) -> SchemaResult<()> {
    if is_xml_name(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidName {
            name: name.to_string(),
            context: context.to_string(),
        })
    }
}

/// Non-colonized XML name check, restricted to the characters this library emits.
pub fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
