//! The restriction transform.
//!
//! `restrict` narrows an arbitrary shape to its JSON-safe counterpart:
//!
//! - a field whose type already classifies as JsonValue is kept unchanged,
//! - a field that is a plain mapping (inline object or named shape) is
//!   restricted recursively,
//! - every other field is widened to the full JsonValue union.
//!
//! Classification happens before recursion, so an already-safe nested
//! object keeps its exact type (literals and unions included). A named
//! shape that is re-entered while still being restricted is widened, which
//! keeps cyclic shapes finite.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::classify::{is_json_value, Classifier, ShapeResolver};
use crate::conform::conforms;
use crate::types::{ShapeDef, TypeDesc};

/// Tag describing how a restricted field was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    /// Already JSON-safe, type kept as declared.
    Preserved,
    /// Plain mapping restricted field by field.
    Nested,
    /// Replaced by the JsonValue union.
    Widened,
}

/// One field of a restricted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RestrictedField {
    Preserved {
        #[serde(rename = "type")]
        type_: TypeDesc,
    },
    Nested {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shape: Option<String>,
        fields: IndexMap<String, RestrictedField>,
    },
    Widened {
        original: TypeDesc,
    },
}

impl RestrictedField {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Preserved { .. } => FieldKind::Preserved,
            Self::Nested { .. } => FieldKind::Nested,
            Self::Widened { .. } => FieldKind::Widened,
        }
    }

    /// The effective JSON-safe type of this field.
    pub fn as_type(&self) -> TypeDesc {
        match self {
            Self::Preserved { type_ } => type_.clone(),
            Self::Nested { fields, .. } => fields_as_type(fields),
            Self::Widened { .. } => TypeDesc::Json,
        }
    }
}

/// The JSON-safe narrowing of a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictedShape {
    pub name: String,
    pub fields: IndexMap<String, RestrictedField>,
}

impl RestrictedShape {
    /// The restricted shape as an inline object type.
    pub fn as_type(&self) -> TypeDesc {
        fields_as_type(&self.fields)
    }

    /// Look up a field by dotted path, e.g. `"profile.avatar"`.
    pub fn field(&self, path: &str) -> Option<&RestrictedField> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            match current {
                RestrictedField::Nested { fields, .. } => current = fields.get(part)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Dotted paths of every widened field, depth first in declaration order.
    pub fn widened_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        collect_widened(&self.fields, "", &mut paths);
        paths
    }

    /// True when nothing had to be widened.
    pub fn is_lossless(&self) -> bool {
        self.widened_paths().is_empty()
    }

    /// Check a concrete JSON value against this shape.
    ///
    /// Preserved named shapes are looked up through `resolver`. Missing keys
    /// are accepted only where the field admits `null`, and keys the shape
    /// does not declare are rejected.
    pub fn admits<R: ShapeResolver + ?Sized>(&self, value: &serde_json::Value, resolver: &R) -> bool {
        conforms(&self.as_type(), value, resolver)
    }
}

fn fields_as_type(fields: &IndexMap<String, RestrictedField>) -> TypeDesc {
    TypeDesc::Object {
        fields: fields
            .iter()
            .map(|(name, field)| (name.clone(), field.as_type()))
            .collect(),
    }
}

fn collect_widened(fields: &IndexMap<String, RestrictedField>, prefix: &str, out: &mut Vec<String>) {
    for (name, field) in fields {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        match field {
            RestrictedField::Widened { .. } => out.push(path),
            RestrictedField::Nested { fields, .. } => collect_widened(fields, &path, out),
            RestrictedField::Preserved { .. } => {}
        }
    }
}

/// Derive the JSON-safe narrowing of `shape`.
///
/// Deterministic and side-effect free; field order is preserved.
pub fn restrict<R: ShapeResolver + ?Sized>(shape: &ShapeDef, resolver: &R) -> RestrictedShape {
    let mut restrictor = Restrictor {
        resolver,
        classifier: Classifier::new(resolver),
        in_progress: vec![shape.name.clone()],
    };
    let fields = restrictor.restrict_fields(&shape.fields);
    let restricted = RestrictedShape {
        name: shape.name.clone(),
        fields,
    };
    debug!(
        shape = %shape.name,
        widened = restricted.widened_paths().len(),
        "restricted shape"
    );
    restricted
}

/// Restrict a single declared type, outside of any shape.
pub fn restrict_type<R: ShapeResolver + ?Sized>(ty: &TypeDesc, resolver: &R) -> RestrictedField {
    Restrictor {
        resolver,
        classifier: Classifier::new(resolver),
        in_progress: Vec::new(),
    }
    .restrict_field(ty)
}

struct Restrictor<'a, R: ?Sized> {
    resolver: &'a R,
    classifier: Classifier<'a, R>,
    in_progress: Vec<String>,
}

impl<'a, R: ShapeResolver + ?Sized> Restrictor<'a, R> {
    fn restrict_fields(
        &mut self,
        fields: &IndexMap<String, TypeDesc>,
    ) -> IndexMap<String, RestrictedField> {
        fields
            .iter()
            .map(|(name, ty)| (name.clone(), self.restrict_field(ty)))
            .collect()
    }

    fn restrict_field(&mut self, ty: &TypeDesc) -> RestrictedField {
        if self.classifier.classify(ty) {
            return RestrictedField::Preserved { type_: ty.clone() };
        }
        match ty {
            TypeDesc::Object { fields } => RestrictedField::Nested {
                shape: None,
                fields: self.restrict_fields(fields),
            },
            TypeDesc::Ref { shape } => self.restrict_named(shape, ty),
            other => widen(other),
        }
    }

    fn restrict_named(&mut self, name: &str, ty: &TypeDesc) -> RestrictedField {
        if self.in_progress.iter().any(|n| n == name) {
            trace!(shape = name, "re-entered shape, widening");
            return widen(ty);
        }
        let resolver = self.resolver;
        let Some(def) = resolver.resolve(name) else {
            trace!(shape = name, "unresolved shape, widening");
            return widen(ty);
        };
        self.in_progress.push(name.to_string());
        let fields = self.restrict_fields(&def.fields);
        self.in_progress.pop();
        RestrictedField::Nested {
            shape: Some(name.to_string()),
            fields,
        }
    }
}

fn widen(ty: &TypeDesc) -> RestrictedField {
    RestrictedField::Widened {
        original: ty.clone(),
    }
}

/// Structural check that every field at every depth is JSON-safe.
pub fn is_fully_restricted<R: ShapeResolver + ?Sized>(shape: &RestrictedShape, resolver: &R) -> bool {
    is_json_value(&shape.as_type(), resolver)
}
