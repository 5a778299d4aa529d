//! Schema nodes and the introspection capability used by mock generation.
//!
//! Two schema representations flow through vitrine:
//!
//! - [`SchemaNode`], the typed abstraction widget authors build in Rust.
//! - JSON Schema documents (`serde_json::Value`) kept in the shared module on
//!   disk, which the metadata extractor reads without building anything.
//!
//! Both implement [`SchemaIntrospect`], so a single generator walks either one.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

static NULL: Value = Value::Null;

/// Explicit length bounds for an array node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arity {
    pub min: usize,
    pub max: usize,
}

impl Arity {
    pub fn new(min: usize, max: usize) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn exactly(len: usize) -> Self {
        Self { min: len, max: len }
    }
}

/// Declarative description of an expected value's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaNode {
    String,
    Number,
    Boolean,
    /// Fields in declaration order.
    Object { fields: Vec<(String, SchemaNode)> },
    Array {
        element: Box<SchemaNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arity: Option<Arity>,
    },
    Optional { inner: Box<SchemaNode> },
    Nullable { inner: Box<SchemaNode> },
    Enum { values: Vec<Value> },
    Union { variants: Vec<SchemaNode> },
    Literal { value: Value },
    Default { inner: Box<SchemaNode>, value: Value },
    /// A node kind the generator has no rule for.
    Unsupported { type_name: String },
}

impl SchemaNode {
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, SchemaNode)>,
        K: Into<String>,
    {
        SchemaNode::Object {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn array(element: SchemaNode) -> Self {
        SchemaNode::Array {
            element: Box::new(element),
            arity: None,
        }
    }

    pub fn array_with_arity(element: SchemaNode, arity: Arity) -> Self {
        SchemaNode::Array {
            element: Box::new(element),
            arity: Some(arity),
        }
    }

    pub fn optional(inner: SchemaNode) -> Self {
        SchemaNode::Optional {
            inner: Box::new(inner),
        }
    }

    pub fn nullable(inner: SchemaNode) -> Self {
        SchemaNode::Nullable {
            inner: Box::new(inner),
        }
    }

    pub fn enumeration<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        SchemaNode::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn union<I: IntoIterator<Item = SchemaNode>>(variants: I) -> Self {
        SchemaNode::Union {
            variants: variants.into_iter().collect(),
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        SchemaNode::Literal {
            value: value.into(),
        }
    }

    pub fn with_default(inner: SchemaNode, value: impl Into<Value>) -> Self {
        SchemaNode::Default {
            inner: Box::new(inner),
            value: value.into(),
        }
    }

    pub fn unsupported(type_name: impl Into<String>) -> Self {
        SchemaNode::Unsupported {
            type_name: type_name.into(),
        }
    }

    /// Convert a JSON Schema document into the typed abstraction.
    ///
    /// Follows the same reading rules as the [`SchemaIntrospect`] impl for
    /// `Value`, so generating from either side behaves identically.
    pub fn from_json_schema(schema: &Value) -> Self {
        match schema.shape() {
            SchemaShape::String => SchemaNode::String,
            SchemaShape::Number => SchemaNode::Number,
            SchemaShape::Boolean => SchemaNode::Boolean,
            SchemaShape::Object(fields) => SchemaNode::Object {
                fields: fields
                    .into_iter()
                    .map(|field| {
                        let node = SchemaNode::from_json_schema(field.schema);
                        let node = if field.required {
                            node
                        } else {
                            SchemaNode::optional(node)
                        };
                        (field.name.to_string(), node)
                    })
                    .collect(),
            },
            SchemaShape::Array { element, arity } => SchemaNode::Array {
                element: Box::new(SchemaNode::from_json_schema(element)),
                arity,
            },
            SchemaShape::Optional(inner) => SchemaNode::optional(SchemaNode::from_json_schema(&inner)),
            SchemaShape::Nullable(inner) => SchemaNode::nullable(SchemaNode::from_json_schema(&inner)),
            SchemaShape::Enum(values) => SchemaNode::Enum {
                values: values.to_vec(),
            },
            SchemaShape::Union(variants) => SchemaNode::Union {
                variants: variants.into_iter().map(SchemaNode::from_json_schema).collect(),
            },
            SchemaShape::Literal(value) => SchemaNode::literal(value.clone()),
            SchemaShape::Default { inner, value } => SchemaNode::Default {
                inner: Box::new(SchemaNode::from_json_schema(&inner)),
                value: value.clone(),
            },
            SchemaShape::Unsupported(type_name) => SchemaNode::Unsupported { type_name },
        }
    }
}

/// A declared object field as seen through [`SchemaIntrospect`].
#[derive(Debug)]
pub struct ObjectField<'a, S> {
    pub name: &'a str,
    pub schema: &'a S,
    /// `false` means the field is generated under the optional rule.
    pub required: bool,
}

/// One level of a schema, independent of how the schema is stored.
#[derive(Debug)]
pub enum SchemaShape<'a, S: Clone> {
    String,
    Number,
    Boolean,
    Object(Vec<ObjectField<'a, S>>),
    Array {
        element: &'a S,
        arity: Option<Arity>,
    },
    Optional(Cow<'a, S>),
    Nullable(Cow<'a, S>),
    Enum(&'a [Value]),
    Union(Vec<&'a S>),
    Literal(&'a Value),
    Default {
        inner: Cow<'a, S>,
        value: &'a Value,
    },
    Unsupported(String),
}

/// Read access to a schema's structure, one level at a time.
pub trait SchemaIntrospect: Clone {
    fn shape(&self) -> SchemaShape<'_, Self>;
}

impl SchemaIntrospect for SchemaNode {
    fn shape(&self) -> SchemaShape<'_, Self> {
        match self {
            SchemaNode::String => SchemaShape::String,
            SchemaNode::Number => SchemaShape::Number,
            SchemaNode::Boolean => SchemaShape::Boolean,
            SchemaNode::Object { fields } => SchemaShape::Object(
                fields
                    .iter()
                    .map(|(name, schema)| ObjectField {
                        name: name.as_str(),
                        schema,
                        required: true,
                    })
                    .collect(),
            ),
            SchemaNode::Array { element, arity } => SchemaShape::Array {
                element: element.as_ref(),
                arity: *arity,
            },
            SchemaNode::Optional { inner } => SchemaShape::Optional(Cow::Borrowed(inner.as_ref())),
            SchemaNode::Nullable { inner } => SchemaShape::Nullable(Cow::Borrowed(inner.as_ref())),
            SchemaNode::Enum { values } => SchemaShape::Enum(values.as_slice()),
            SchemaNode::Union { variants } => SchemaShape::Union(variants.iter().collect()),
            SchemaNode::Literal { value } => SchemaShape::Literal(value),
            SchemaNode::Default { inner, value } => SchemaShape::Default {
                inner: Cow::Borrowed(inner.as_ref()),
                value,
            },
            SchemaNode::Unsupported { type_name } => SchemaShape::Unsupported(type_name.clone()),
        }
    }
}

/// JSON Schema reading rules.
///
/// Keyword precedence: `default`, `const`, `enum`, `nullable`, `anyOf`/`oneOf`,
/// then `type`. A `type` array containing `"null"` reads as nullable.
impl SchemaIntrospect for Value {
    fn shape(&self) -> SchemaShape<'_, Self> {
        let Some(map) = self.as_object() else {
            return SchemaShape::Unsupported(format!("non-object schema: {}", self));
        };

        if let Some(value) = map.get("default") {
            let mut inner = map.clone();
            inner.remove("default");
            return SchemaShape::Default {
                inner: Cow::Owned(Value::Object(inner)),
                value,
            };
        }

        if let Some(value) = map.get("const") {
            return SchemaShape::Literal(value);
        }

        if let Some(values) = map.get("enum") {
            return match values.as_array() {
                Some(values) => SchemaShape::Enum(values.as_slice()),
                None => SchemaShape::Unsupported("enum must be an array".to_string()),
            };
        }

        if map.get("nullable").and_then(Value::as_bool) == Some(true) {
            let mut inner = map.clone();
            inner.remove("nullable");
            return SchemaShape::Nullable(Cow::Owned(Value::Object(inner)));
        }

        if let Some(variants) = map.get("anyOf").or_else(|| map.get("oneOf")) {
            return match variants.as_array() {
                Some(variants) => SchemaShape::Union(variants.iter().collect()),
                None => SchemaShape::Unsupported("anyOf/oneOf must be an array".to_string()),
            };
        }

        match map.get("type") {
            Some(Value::String(type_name)) => match type_name.as_str() {
                "string" => SchemaShape::String,
                "number" | "integer" => SchemaShape::Number,
                "boolean" => SchemaShape::Boolean,
                "null" => SchemaShape::Literal(&NULL),
                "object" => SchemaShape::Object(object_fields(self)),
                "array" => match map.get("items") {
                    Some(element) => SchemaShape::Array {
                        element,
                        arity: array_arity(self),
                    },
                    None => SchemaShape::Unsupported("array without items".to_string()),
                },
                other => SchemaShape::Unsupported(other.to_string()),
            },
            Some(Value::Array(types)) => {
                let non_null: Vec<&Value> = types.iter().filter(|t| t.as_str() != Some("null")).collect();
                if non_null.len() == 1 && non_null.len() < types.len() {
                    let mut inner = map.clone();
                    inner.insert("type".to_string(), non_null[0].clone());
                    SchemaShape::Nullable(Cow::Owned(Value::Object(inner)))
                } else {
                    SchemaShape::Unsupported(format!("type union {}", Value::Array(types.clone())))
                }
            }
            Some(other) => SchemaShape::Unsupported(format!("type {}", other)),
            // An untyped schema with properties is still an object.
            None if map.contains_key("properties") => SchemaShape::Object(object_fields(self)),
            None => SchemaShape::Unsupported("missing type".to_string()),
        }
    }
}

fn object_fields(schema: &Value) -> Vec<ObjectField<'_, Value>> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| {
            properties
                .iter()
                .map(|(name, field_schema)| ObjectField {
                    name: name.as_str(),
                    schema: field_schema,
                    required: required.contains(&name.as_str()),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn array_arity(schema: &Value) -> Option<Arity> {
    let bound = |key| {
        schema
            .get(key)
            .and_then(Value::as_u64)
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
    };
    match (bound("minItems"), bound("maxItems")) {
        (None, None) => None,
        (Some(min), None) => Some(Arity::new(min, min.saturating_add(2))),
        (None, Some(max)) => Some(Arity::new(1.min(max), max)),
        (Some(min), Some(max)) => Some(Arity::new(min, max)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_schema_object_reads_required_fields() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "nickname": { "type": "string" }
            },
            "required": ["name"]
        });

        match schema.shape() {
            SchemaShape::Object(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].name, "name");
                assert!(fields[0].required);
                assert_eq!(fields[1].name, "nickname");
                assert!(!fields[1].required);
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_json_schema_nullable_type_array() {
        let schema = json!({ "type": ["integer", "null"] });
        match schema.shape() {
            SchemaShape::Nullable(inner) => assert_eq!(&*inner, &json!({ "type": "integer" })),
            other => panic!("expected nullable, got {:?}", other),
        }
    }

    #[test]
    fn test_json_schema_item_bounds_saturate() {
        let schema = json!({ "type": "array", "items": { "type": "string" }, "minItems": u64::MAX });
        match schema.shape() {
            SchemaShape::Array { arity, .. } => {
                assert_eq!(arity, Some(Arity::new(usize::MAX, usize::MAX)));
            }
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_json_schema_unknown_type_is_unsupported() {
        let schema = json!({ "type": "date" });
        assert!(matches!(schema.shape(), SchemaShape::Unsupported(name) if name == "date"));
    }

    #[test]
    fn test_from_json_schema_wraps_optional_fields() {
        let schema = json!({
            "type": "object",
            "properties": {
                "id": { "type": "integer" },
                "tags": { "type": "array", "items": { "type": "string" }, "maxItems": 2 }
            },
            "required": ["id"]
        });

        let node = SchemaNode::from_json_schema(&schema);
        assert_eq!(
            node,
            SchemaNode::object([
                ("id", SchemaNode::Number),
                (
                    "tags",
                    SchemaNode::optional(SchemaNode::array_with_arity(SchemaNode::String, Arity::new(1, 2)))
                ),
            ])
        );
    }

    #[test]
    fn test_schema_node_serde_tagging() {
        let node = SchemaNode::nullable(SchemaNode::literal("x"));
        let encoded = serde_json::to_value(&node).unwrap();
        assert_eq!(
            encoded,
            json!({ "kind": "nullable", "inner": { "kind": "literal", "value": "x" } })
        );
    }
}
