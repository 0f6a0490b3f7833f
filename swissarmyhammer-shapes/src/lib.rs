//! JSON-safe shape registry and restriction transform
//!
//! `swissarmyhammer-shapes` describes entity shapes as data and narrows them
//! to what can safely leave the edit surface as JSON. It knows nothing about
//! forms or rendering; consumers register shapes and ask for their
//! restricted forms.
//!
//! # Architecture
//!
//! - **Described, not reflected**: shapes are trees of [`TypeDesc`] values,
//!   nested inline or linked by name through a [`ShapeResolver`]
//! - **Classify before recursing**: fields that are already JSON-safe keep
//!   their exact declared type
//! - **Widen, never fail**: anything not JSON-safe becomes the JsonValue union
//! - **Cycle-safe**: shapes re-entered during a walk are treated as unsafe
//! - **YAML on disk**: [`ShapesContext`] keeps one `.yaml` per shape and
//!   caches restricted forms per definition

pub mod classify;
pub mod conform;
pub mod context;
pub mod error;
pub mod restrict;
pub mod schema;
pub mod types;

pub use classify::{is_json_shape, is_json_value, ShapeResolver};
pub use conform::{conforms, is_optional};
pub use context::{ShapeDefaults, ShapesContext, ShapesContextBuilder};
pub use error::{Result, ShapesError};
pub use restrict::{
    is_fully_restricted, restrict, restrict_type, FieldKind, RestrictedField, RestrictedShape,
};
pub use types::{ShapeDef, TypeDesc};
