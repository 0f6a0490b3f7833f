//! JSON Schema export for restricted shapes.
//!
//! Produces draft 2020-12 documents so restricted shapes can be handed to
//! generic JSON tooling. Named shapes that survive restriction by reference
//! land in `$defs`.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::classify::ShapeResolver;
use crate::conform::is_optional;
use crate::restrict::RestrictedShape;
use crate::types::TypeDesc;

const DRAFT: &str = "https://json-schema.org/draft/2020-12/schema";

impl RestrictedShape {
    /// Export as a JSON Schema document.
    pub fn to_json_schema<R: ShapeResolver + ?Sized>(&self, resolver: &R) -> Value {
        let mut writer = SchemaWriter {
            resolver,
            defs: BTreeMap::new(),
        };
        let body = writer.type_schema(&self.as_type());

        let mut doc = Map::new();
        doc.insert("$schema".into(), json!(DRAFT));
        doc.insert("title".into(), json!(self.name));
        if let Value::Object(body) = body {
            doc.extend(body);
        }
        if !writer.defs.is_empty() {
            doc.insert(
                "$defs".into(),
                Value::Object(writer.defs.into_iter().collect()),
            );
        }
        Value::Object(doc)
    }
}

struct SchemaWriter<'a, R: ?Sized> {
    resolver: &'a R,
    defs: BTreeMap<String, Value>,
}

impl<R: ShapeResolver + ?Sized> SchemaWriter<'_, R> {
    fn type_schema(&mut self, ty: &TypeDesc) -> Value {
        match ty {
            TypeDesc::String => json!({"type": "string"}),
            TypeDesc::Number => json!({"type": "number"}),
            TypeDesc::Boolean => json!({"type": "boolean"}),
            TypeDesc::Null => json!({"type": "null"}),
            TypeDesc::Literal { value } => json!({"const": value}),
            TypeDesc::Json => json!({}),
            TypeDesc::Array { items } => json!({"type": "array", "items": self.type_schema(items)}),
            TypeDesc::Map { values } => {
                json!({"type": "object", "additionalProperties": self.type_schema(values)})
            }
            TypeDesc::Union { members } => {
                let any_of: Vec<Value> = members.iter().map(|m| self.type_schema(m)).collect();
                json!({"anyOf": any_of})
            }
            TypeDesc::Object { fields } => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for (name, field_ty) in fields {
                    properties.insert(name.clone(), self.type_schema(field_ty));
                    if !is_optional(field_ty, self.resolver) {
                        required.push(json!(name));
                    }
                }
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                    "additionalProperties": false,
                })
            }
            TypeDesc::Ref { shape } => {
                self.define(shape);
                json!({"$ref": format!("#/$defs/{shape}")})
            }
            // Never present in a restricted shape; an impossible schema keeps
            // the export honest if one slips through.
            TypeDesc::Unknown | TypeDesc::Opaque { .. } => json!({"not": {}}),
        }
    }

    fn define(&mut self, name: &str) {
        if self.defs.contains_key(name) {
            return;
        }
        let resolver = self.resolver;
        let Some(def) = resolver.resolve(name) else {
            self.defs.insert(name.to_string(), json!({"not": {}}));
            return;
        };
        // Placeholder first so self-references stop here.
        self.defs.insert(name.to_string(), json!({}));
        let schema = self.type_schema(&def.as_type());
        self.defs.insert(name.to_string(), schema);
    }
}
