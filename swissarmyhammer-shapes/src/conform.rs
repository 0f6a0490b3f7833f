//! Instance conformance: does a concrete JSON value fit a declared type?

use serde_json::Value;

use crate::classify::ShapeResolver;
use crate::types::TypeDesc;

/// Check `value` against `ty`.
///
/// Object fields that are missing from `value` are checked as `null`, so a
/// field may be omitted only when its type admits `null`. Keys that the type
/// does not declare are rejected. `unknown` and `opaque` types never match,
/// since no JSON value can stand in for them.
pub fn conforms<R: ShapeResolver + ?Sized>(ty: &TypeDesc, value: &Value, resolver: &R) -> bool {
    match ty {
        TypeDesc::String => value.is_string(),
        TypeDesc::Number => value.is_number(),
        TypeDesc::Boolean => value.is_boolean(),
        TypeDesc::Null => value.is_null(),
        TypeDesc::Literal { value: expected } => value == expected,
        TypeDesc::Json => true,
        TypeDesc::Array { items } => value
            .as_array()
            .is_some_and(|arr| arr.iter().all(|v| conforms(items, v, resolver))),
        TypeDesc::Map { values } => value
            .as_object()
            .is_some_and(|obj| obj.values().all(|v| conforms(values, v, resolver))),
        TypeDesc::Union { members } => members.iter().any(|m| conforms(m, value, resolver)),
        TypeDesc::Object { fields } => {
            let Some(obj) = value.as_object() else {
                return false;
            };
            obj.keys().all(|k| fields.contains_key(k))
                && fields.iter().all(|(name, field_ty)| {
                    conforms(field_ty, obj.get(name).unwrap_or(&Value::Null), resolver)
                })
        }
        TypeDesc::Ref { shape } => match resolver.resolve(shape) {
            Some(def) => conforms(&def.as_type(), value, resolver),
            None => false,
        },
        TypeDesc::Unknown | TypeDesc::Opaque { .. } => false,
    }
}

/// True when a field of this type may be left out of an object.
pub fn is_optional<R: ShapeResolver + ?Sized>(ty: &TypeDesc, resolver: &R) -> bool {
    conforms(ty, &Value::Null, resolver)
}
