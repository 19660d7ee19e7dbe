use serde::{Deserialize, Serialize};

use xml_marshal::{FieldDescriptor, ScalarKind, TypeDescriptor, XmlType};

pub const ORDER_NS: &str = "urn:example:orders";
pub const AUDIT_NS: &str = "urn:example:audit";

/// Purchase order covering attributes, nested, repeated and optional fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub status: String,
    pub customer: Customer,
    pub lines: Vec<Line>,
    pub note: Option<String>,
    pub express: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: Option<String>,
}

/// Order line; the description is the element's text content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub sku: String,
    pub quantity: i64,
    pub price: f64,
    pub description: String,
}

fn customer_descriptor() -> TypeDescriptor {
    TypeDescriptor::new("customer")
        .field(FieldDescriptor::element("name", ScalarKind::String))
        .field(FieldDescriptor::element("email", ScalarKind::String).optional())
}

fn line_descriptor() -> TypeDescriptor {
    TypeDescriptor::new("line")
        .field(FieldDescriptor::attribute("sku", ScalarKind::String))
        .field(FieldDescriptor::attribute("quantity", ScalarKind::Integer))
        .field(FieldDescriptor::attribute("price", ScalarKind::Float))
        .field(FieldDescriptor::text("description", ScalarKind::String))
}

impl XmlType for Order {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("order")
            .field(FieldDescriptor::attribute("id", ScalarKind::Integer))
            .field(FieldDescriptor::attribute("status", ScalarKind::String))
            .field(FieldDescriptor::complex("customer", customer_descriptor()))
            .field(
                FieldDescriptor::complex("lines", line_descriptor())
                    .xml_name("line")
                    .repeated(),
            )
            .field(FieldDescriptor::element("note", ScalarKind::String).optional())
            .field(FieldDescriptor::element("express", ScalarKind::Boolean))
    }
}

/// Namespaced document with a child element in a second namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditedOrder {
    pub id: u64,
    pub total: f64,
    pub audit: String,
}

impl XmlType for AuditedOrder {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("order")
            .namespace(ORDER_NS)
            .field(FieldDescriptor::attribute("id", ScalarKind::Integer))
            .field(FieldDescriptor::element("total", ScalarKind::Float))
            .field(FieldDescriptor::element("audit", ScalarKind::String).namespace(AUDIT_NS))
    }
}

/// Free-text message used for escaping checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub body: String,
}

impl XmlType for Message {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("message")
            .field(FieldDescriptor::attribute("from", ScalarKind::String))
            .field(FieldDescriptor::element("body", ScalarKind::String))
    }
}

/// Type whose description cannot compile: two fields share one element name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clashing {
    pub first: String,
    pub second: String,
}

impl XmlType for Clashing {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("clashing")
            .field(FieldDescriptor::element("first", ScalarKind::String).xml_name("value"))
            .field(FieldDescriptor::element("second", ScalarKind::String).xml_name("value"))
    }
}

/// Serializes fields its description does not know about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drifted {
    pub name: String,
    pub added_later: String,
}

impl XmlType for Drifted {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("drifted").field(FieldDescriptor::element("name", ScalarKind::String))
    }
}

pub fn sample_order() -> Order {
    Order {
        id: 1042,
        status: "open".to_string(),
        customer: Customer {
            name: "Ada Lovelace".to_string(),
            email: Some("ada@example.com".to_string()),
        },
        lines: vec![
            Line {
                sku: "A-100".to_string(),
                quantity: 2,
                price: 12.5,
                description: "Brass gear".to_string(),
            },
            Line {
                sku: "B-7".to_string(),
                quantity: 1,
                price: 99.95,
                description: "Punch cards & ink".to_string(),
            },
        ],
        note: None,
        express: true,
    }
}

pub fn sample_audited_order() -> AuditedOrder {
    AuditedOrder {
        id: 7,
        total: 10.25,
        audit: "checked".to_string(),
    }
}
