//! JsonValue classification of declared field types.
//!
//! Answers "is this type already composed only of JSON primitives, arrays
//! and plain mappings?" Named shapes are looked up through a
//! [`ShapeResolver`]; a shape that is re-entered while it is still being
//! classified is not JSON-safe, so cyclic shapes terminate.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::trace;

use crate::types::{ShapeDef, TypeDesc};

/// Looks up shape definitions by name.
pub trait ShapeResolver {
    fn resolve(&self, name: &str) -> Option<&ShapeDef>;
}

impl ShapeResolver for [ShapeDef] {
    fn resolve(&self, name: &str) -> Option<&ShapeDef> {
        self.iter().find(|s| s.name == name)
    }
}

impl ShapeResolver for Vec<ShapeDef> {
    fn resolve(&self, name: &str) -> Option<&ShapeDef> {
        self.as_slice().resolve(name)
    }
}

impl ShapeResolver for HashMap<String, ShapeDef> {
    fn resolve(&self, name: &str) -> Option<&ShapeDef> {
        self.get(name)
    }
}

impl ShapeResolver for IndexMap<String, ShapeDef> {
    fn resolve(&self, name: &str) -> Option<&ShapeDef> {
        self.get(name)
    }
}

/// Classify a single type against the JsonValue union.
pub fn is_json_value<R: ShapeResolver + ?Sized>(ty: &TypeDesc, resolver: &R) -> bool {
    Classifier::new(resolver).classify(ty)
}

/// Classify every field of a shape. An empty shape is trivially JSON-safe.
pub fn is_json_shape<R: ShapeResolver + ?Sized>(shape: &ShapeDef, resolver: &R) -> bool {
    Classifier::new(resolver).classify_shape(shape)
}

/// Stateful classifier that memoizes named shapes.
///
/// A shape that comes back unsafe because it re-entered an in-progress
/// ancestor sits on a cycle with that ancestor, and every shape on a cycle is
/// unsafe, so memoized results do not depend on where the walk started.
pub(crate) struct Classifier<'a, R: ?Sized> {
    resolver: &'a R,
    visiting: HashSet<String>,
    resolved: HashMap<String, bool>,
}

impl<'a, R: ShapeResolver + ?Sized> Classifier<'a, R> {
    pub(crate) fn new(resolver: &'a R) -> Self {
        Self {
            resolver,
            visiting: HashSet::new(),
            resolved: HashMap::new(),
        }
    }

    pub(crate) fn classify(&mut self, ty: &TypeDesc) -> bool {
        match ty {
            TypeDesc::String
            | TypeDesc::Number
            | TypeDesc::Boolean
            | TypeDesc::Null
            | TypeDesc::Literal { .. }
            | TypeDesc::Json => true,
            TypeDesc::Array { items } => self.classify(items),
            TypeDesc::Map { values } => self.classify(values),
            TypeDesc::Union { members } => {
                !members.is_empty() && members.iter().all(|m| self.classify(m))
            }
            TypeDesc::Object { fields } => fields.values().all(|f| self.classify(f)),
            TypeDesc::Ref { shape } => self.classify_named(shape),
            TypeDesc::Unknown | TypeDesc::Opaque { .. } => false,
        }
    }

    pub(crate) fn classify_shape(&mut self, shape: &ShapeDef) -> bool {
        if let Some(&known) = self.resolved.get(&shape.name) {
            return known;
        }
        self.visiting.insert(shape.name.clone());
        let safe = shape.fields.values().all(|f| self.classify(f));
        self.visiting.remove(&shape.name);
        self.resolved.insert(shape.name.clone(), safe);
        safe
    }

    fn classify_named(&mut self, name: &str) -> bool {
        if let Some(&known) = self.resolved.get(name) {
            return known;
        }
        if self.visiting.contains(name) {
            trace!(shape = name, "cyclic shape reference, not JSON-safe");
            return false;
        }
        let resolver = self.resolver;
        match resolver.resolve(name) {
            Some(def) => self.classify_shape(def),
            None => {
                trace!(shape = name, "unresolved shape reference, not JSON-safe");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_shapes() -> Vec<ShapeDef> {
        Vec::new()
    }

    #[test]
    fn primitives_and_literals_are_json() {
        let shapes = no_shapes();
        for ty in [
            TypeDesc::String,
            TypeDesc::Number,
            TypeDesc::Boolean,
            TypeDesc::Null,
            TypeDesc::Json,
            TypeDesc::literal("draft"),
            TypeDesc::json_leaf(),
        ] {
            assert!(is_json_value(&ty, &shapes), "{ty:?} should be JSON-safe");
        }
    }

    #[test]
    fn unknown_is_never_assumed_safe() {
        let shapes = no_shapes();
        assert!(!is_json_value(&TypeDesc::Unknown, &shapes));
        assert!(!is_json_value(&TypeDesc::array(TypeDesc::Unknown), &shapes));
        assert!(!is_json_value(
            &TypeDesc::union([TypeDesc::String, TypeDesc::Unknown]),
            &shapes
        ));
    }

    #[test]
    fn containers_follow_their_elements() {
        let shapes = no_shapes();
        assert!(is_json_value(&TypeDesc::array(TypeDesc::Number), &shapes));
        assert!(is_json_value(&TypeDesc::map(TypeDesc::Boolean), &shapes));
        assert!(!is_json_value(&TypeDesc::array(TypeDesc::opaque("date")), &shapes));
        assert!(!is_json_value(&TypeDesc::map(TypeDesc::opaque("function")), &shapes));
        assert!(is_json_value(
            &TypeDesc::object([("a", TypeDesc::array(TypeDesc::String))]),
            &shapes
        ));
        assert!(!is_json_value(
            &TypeDesc::object([("a", TypeDesc::opaque("regexp"))]),
            &shapes
        ));
    }

    #[test]
    fn empty_union_is_not_json() {
        assert!(!is_json_value(&TypeDesc::Union { members: vec![] }, &no_shapes()));
    }

    #[test]
    fn refs_resolve_through_registry() {
        let shapes = vec![
            ShapeDef::new("point")
                .field("x", TypeDesc::Number)
                .field("y", TypeDesc::Number),
            ShapeDef::new("event").field("at", TypeDesc::opaque("date")),
        ];
        assert!(is_json_value(&TypeDesc::reference("point"), &shapes));
        assert!(!is_json_value(&TypeDesc::reference("event"), &shapes));
        assert!(!is_json_value(&TypeDesc::reference("missing"), &shapes));
    }

    #[test_log::test]
    fn self_reference_terminates_as_unsafe() {
        let shapes = vec![ShapeDef::new("node")
            .field("value", TypeDesc::Number)
            .field("next", TypeDesc::reference("node"))];
        assert!(!is_json_value(&TypeDesc::reference("node"), &shapes));
        assert!(!is_json_shape(&shapes[0], &shapes));
    }

    #[test]
    fn mutual_recursion_terminates_as_unsafe() {
        let shapes = vec![
            ShapeDef::new("a").field("b", TypeDesc::reference("b")),
            ShapeDef::new("b").field("a", TypeDesc::array(TypeDesc::reference("a"))),
        ];
        assert!(!is_json_value(&TypeDesc::reference("a"), &shapes));
        assert!(!is_json_value(&TypeDesc::reference("b"), &shapes));
    }

    #[test]
    fn shared_reference_is_not_mistaken_for_cycle() {
        let shapes = vec![
            ShapeDef::new("money")
                .field("amount", TypeDesc::Number)
                .field("currency", TypeDesc::String),
            ShapeDef::new("invoice")
                .field("net", TypeDesc::reference("money"))
                .field("gross", TypeDesc::reference("money")),
        ];
        assert!(is_json_value(&TypeDesc::reference("invoice"), &shapes));
    }

    #[test]
    fn empty_shape_is_json() {
        let shape = ShapeDef::new("empty");
        assert!(is_json_shape(&shape, &no_shapes()));
    }
}
