//! Form: explicit registration of fields, key filters and validators.
//!
//! The host creates a `Form`, registers its fields and attaches filters and
//! validators to them up front. From then on it forwards key events to
//! [`Form::handle_key`] and value changes to [`Form::set_value`]; the form
//! re-runs every validator that reads the changed field and keeps the
//! resulting errors for the host to display.

use indexmap::IndexMap;
use serde_json::Value;
use swissarmyhammer_shapes::{RestrictedShape, ShapeResolver};
use tracing::{debug, trace};

use crate::error::{InputError, Result};
use crate::key::KeyEvent;
use crate::keystroke::{KeyDecision, KeyFilter};
use crate::validator::{FieldValidator, FormValues, ValidationFailure};

/// Failures on one field, keyed by the validator's error key.
pub type FieldErrors = IndexMap<String, ValidationFailure>;

#[derive(Default)]
struct FieldSlot {
    key_filter: Option<Box<dyn KeyFilter>>,
    validators: Vec<Box<dyn FieldValidator>>,
    errors: FieldErrors,
}

#[derive(Default)]
pub struct Form {
    fields: IndexMap<String, FieldSlot>,
    values: FormValues,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_field(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.fields.contains_key(&name) {
            return Err(InputError::DuplicateField { field: name });
        }
        self.fields.insert(name, FieldSlot::default());
        Ok(())
    }

    /// Attach a key filter, replacing any earlier one on the same field.
    pub fn register_key_filter(
        &mut self,
        field: &str,
        filter: impl KeyFilter + 'static,
    ) -> Result<()> {
        self.slot_mut(field)?.key_filter = Some(Box::new(filter));
        Ok(())
    }

    /// Attach a validator and run it once against the current values.
    ///
    /// Every field the validator depends on must already be registered.
    pub fn register_validator(
        &mut self,
        field: &str,
        validator: impl FieldValidator + 'static,
    ) -> Result<()> {
        if let Some(missing) = validator
            .depends_on()
            .iter()
            .find(|dep| !self.fields.contains_key(dep.as_str()))
        {
            return Err(InputError::UnknownField {
                field: missing.clone(),
            });
        }
        self.slot_mut(field)?.validators.push(Box::new(validator));
        self.validate_field(field);
        Ok(())
    }

    /// Filter one key event. Fields without a filter accept everything.
    pub fn handle_key(&self, field: &str, event: &KeyEvent) -> Result<KeyDecision> {
        let slot = self.slot(field)?;
        let decision = match &slot.key_filter {
            Some(filter) => filter.decide(event),
            None => KeyDecision::AcceptControlKey,
        };
        if decision.prevents_default() {
            trace!(field, key = %event.key, "keystroke suppressed");
        }
        Ok(decision)
    }

    /// Store a new value and re-validate the field and its dependents.
    pub fn set_value(&mut self, field: &str, value: Value) -> Result<()> {
        self.slot(field)?;
        self.values.insert(field.to_string(), value);
        self.revalidate_from(field);
        Ok(())
    }

    /// Reset a field to unset and re-validate it and its dependents.
    pub fn clear_value(&mut self, field: &str) -> Result<()> {
        self.slot(field)?;
        self.values.shift_remove(field);
        self.revalidate_from(field);
        Ok(())
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    /// Current failures on a field, `None` when it is valid or unknown.
    pub fn errors(&self, field: &str) -> Option<&FieldErrors> {
        self.fields
            .get(field)
            .map(|slot| &slot.errors)
            .filter(|errors| !errors.is_empty())
    }

    pub fn is_valid(&self) -> bool {
        self.fields.values().all(|slot| slot.errors.is_empty())
    }

    /// The form's values as a JSON object, checked against `shape`.
    ///
    /// Unset fields are left out. Fails with `NotSerializable` when the
    /// values do not conform.
    pub fn snapshot<R: ShapeResolver + ?Sized>(
        &self,
        shape: &RestrictedShape,
        resolver: &R,
    ) -> Result<Value> {
        let object: serde_json::Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let value = Value::Object(object);
        if !shape.admits(&value, resolver) {
            debug!(shape = %shape.name, "form snapshot rejected");
            return Err(InputError::NotSerializable {
                shape: shape.name.clone(),
            });
        }
        Ok(value)
    }

    fn slot(&self, field: &str) -> Result<&FieldSlot> {
        self.fields.get(field).ok_or_else(|| InputError::UnknownField {
            field: field.to_string(),
        })
    }

    fn slot_mut(&mut self, field: &str) -> Result<&mut FieldSlot> {
        self.fields
            .get_mut(field)
            .ok_or_else(|| InputError::UnknownField {
                field: field.to_string(),
            })
    }

    /// Re-run validation on `changed` and on every field whose validators
    /// read it, in registration order.
    fn revalidate_from(&mut self, changed: &str) {
        let affected: Vec<String> = self
            .fields
            .iter()
            .filter(|(name, slot)| {
                name.as_str() == changed
                    || slot
                        .validators
                        .iter()
                        .any(|v| v.depends_on().iter().any(|d| d == changed))
            })
            .map(|(name, _)| name.clone())
            .collect();
        for name in affected {
            self.validate_field(&name);
        }
    }

    fn validate_field(&mut self, field: &str) {
        let Some(slot) = self.fields.get_mut(field) else {
            return;
        };
        let value = self.values.get(field);
        let mut errors = FieldErrors::new();
        for validator in &slot.validators {
            if let Some(failure) = validator.validate(value, &self.values).failure() {
                errors.insert(validator.error_key().to_string(), failure.clone());
            }
        }
        if errors != slot.errors {
            debug!(field, errors = errors.len(), "field validity changed");
        }
        slot.errors = errors;
    }
}
