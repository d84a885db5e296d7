//! Partial updates on top of a full-replace API.
//!
//! The remote service only accepts whole records, so an update is computed
//! by copying the current record and replacing exactly the fields the
//! operator asked for.

use serde_json::Value;

use crate::error::ValidationError;
use crate::record::{self, FlagRecord, Variant};

/// One overridable field: either not provided, or an explicit value.
/// `Set(false)`, `Set(0)` and `Set(String::new())` are explicit values.
#[derive(Debug, Clone, PartialEq)]
pub enum Override<T> {
    Unset,
    Set(T),
}

impl<T> Default for Override<T> {
    fn default() -> Self {
        Override::Unset
    }
}

impl<T: Clone> Override<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Override::Set(_))
    }

    /// Write the value into `target` if one was provided.
    pub fn apply_to(&self, target: &mut T) {
        if let Override::Set(value) = self {
            *target = value.clone();
        }
    }
}

impl<T> From<Option<T>> for Override<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Override::Set(v),
            None => Override::Unset,
        }
    }
}

/// Validated field overrides for an update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateOverrides {
    pub description: Override<String>,
    pub enabled: Override<bool>,
    pub rollout: Override<u8>,
    pub config: Override<Value>,
    pub variants: Override<Vec<Variant>>,
    pub expression: Override<String>,
}

/// Overrides as they arrive from the command line, before validation.
/// `None` means the option was not given at all.
#[derive(Debug, Clone, Default)]
pub struct RawOverrides {
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub rollout: Option<i64>,
    pub config: Option<String>,
    pub variants: Option<String>,
    pub expression: Option<String>,
}

impl UpdateOverrides {
    /// Validate raw inputs. Runs before anything is fetched so a malformed
    /// override never costs a round trip.
    pub fn from_raw(raw: RawOverrides) -> Result<Self, ValidationError> {
        let rollout = raw.rollout.map(record::check_rollout).transpose()?;
        let config = raw.config.as_deref().map(record::parse_config).transpose()?;
        let variants = raw
            .variants
            .as_deref()
            .map(record::parse_variants)
            .transpose()?;
        if let Some(expr) = &raw.expression {
            record::validate_expression(expr)?;
        }

        Ok(Self {
            description: raw.description.into(),
            enabled: raw.enabled.into(),
            rollout: rollout.into(),
            config: config.into(),
            variants: variants.into(),
            expression: raw.expression.into(),
        })
    }

    pub fn is_empty(&self) -> bool {
        !(self.description.is_set()
            || self.enabled.is_set()
            || self.rollout.is_set()
            || self.config.is_set()
            || self.variants.is_set()
            || self.expression.is_set())
    }
}

/// Compute the record to submit: `existing` with every provided override
/// applied and the environment set to `target_env`. Fields that were not
/// provided keep their current value, unknown remote fields included.
pub fn build_replacement(
    existing: &FlagRecord,
    overrides: &UpdateOverrides,
    target_env: &str,
) -> FlagRecord {
    let mut next = existing.clone();
    next.environment = target_env.to_string();
    overrides.description.apply_to(&mut next.description);
    overrides.enabled.apply_to(&mut next.enabled);
    overrides.rollout.apply_to(&mut next.rollout);
    overrides.config.apply_to(&mut next.config);
    overrides.variants.apply_to(&mut next.variants);
    overrides.expression.apply_to(&mut next.expression);
    next
}
