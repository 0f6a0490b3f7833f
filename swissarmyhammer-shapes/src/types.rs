//! Core shape and type description types.
//!
//! All types serialize to/from YAML via serde. A shape definition describes
//! a named structure with ordered, typed fields. Field types are described
//! by [`TypeDesc`], which can nest inline objects or refer to other shapes by
//! name, so shapes may be arbitrarily deep and may even be cyclic.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The declared type of a field.
///
/// Covers the JSON kinds (`string`, `number`, `boolean`, `null`, arrays,
/// string-keyed maps, plain objects) plus the kinds that are not JSON-safe
/// (`unknown` and `opaque`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TypeDesc {
    String,
    Number,
    Boolean,
    Null,
    /// A single fixed JSON value, e.g. `"draft"` or `3`.
    Literal { value: serde_json::Value },
    /// The full JsonValue union.
    Json,
    Array { items: Box<TypeDesc> },
    /// String-keyed mapping with homogeneous values.
    Map { values: Box<TypeDesc> },
    Union { members: Vec<TypeDesc> },
    /// Inline plain mapping of named fields.
    Object {
        #[serde(default)]
        fields: IndexMap<String, TypeDesc>,
    },
    /// A named shape resolved through a [`crate::ShapeResolver`].
    Ref { shape: String },
    /// Fully dynamic value. Never assumed JSON-safe.
    Unknown,
    /// Any other non-JSON kind: dates, functions, class instances, bigint...
    Opaque { name: String },
}

impl TypeDesc {
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    pub fn array(items: TypeDesc) -> Self {
        Self::Array {
            items: Box::new(items),
        }
    }

    pub fn map(values: TypeDesc) -> Self {
        Self::Map {
            values: Box::new(values),
        }
    }

    pub fn union(members: impl IntoIterator<Item = TypeDesc>) -> Self {
        Self::Union {
            members: members.into_iter().collect(),
        }
    }

    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, TypeDesc)>) -> Self {
        Self::Object {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn reference(shape: impl Into<String>) -> Self {
        Self::Ref {
            shape: shape.into(),
        }
    }

    pub fn opaque(name: impl Into<String>) -> Self {
        Self::Opaque { name: name.into() }
    }

    /// The JsonLeaf union: `string | number | boolean | null`.
    pub fn json_leaf() -> Self {
        Self::union([Self::String, Self::Number, Self::Boolean, Self::Null])
    }
}

/// A shape definition: a named structure of typed fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShapeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: IndexMap<String, TypeDesc>,
}

impl ShapeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
        }
    }

    /// Append a field. A repeated name replaces the earlier type in place.
    pub fn field(mut self, name: impl Into<String>, ty: TypeDesc) -> Self {
        self.fields.insert(name.into(), ty);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The shape viewed as an inline object type.
    pub fn as_type(&self) -> TypeDesc {
        TypeDesc::Object {
            fields: self.fields.clone(),
        }
    }
}
