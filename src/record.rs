use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// A feature flag as stored by the remote service, identified by
/// `(key, environment)`.
///
/// Fields the service returns that are not modelled here are kept in
/// `extra` and sent back untouched on replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRecord {
    pub key: String,
    /// Import files may leave this out; import sets it to the target.
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub rollout: u8,
    #[serde(default = "empty_object")]
    pub config: Value,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub expression: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default)]
    pub weight: u32,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl FlagRecord {
    /// A disabled flag with no targeting.
    pub fn new(key: &str, environment: &str) -> Self {
        Self {
            key: key.to_string(),
            environment: environment.to_string(),
            description: String::new(),
            enabled: false,
            rollout: 0,
            config: empty_object(),
            variants: Vec::new(),
            expression: String::new(),
            extra: Map::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_key(&self.key)?;
        check_rollout(i64::from(self.rollout))?;
        if !self.config.is_object() {
            return Err(ValidationError::ConfigNotObject);
        }
        validate_variants(&self.variants)?;
        validate_expression(&self.expression)
    }
}

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:-]{0,127}$").expect("flag key pattern is valid")
    })
}

pub fn validate_key(key: &str) -> Result<(), ValidationError> {
    if key_pattern().is_match(key) {
        Ok(())
    } else {
        Err(ValidationError::InvalidKey(key.to_string()))
    }
}

pub fn check_rollout(rollout: i64) -> Result<u8, ValidationError> {
    match u8::try_from(rollout) {
        Ok(r) if r <= 100 => Ok(r),
        _ => Err(ValidationError::RolloutOutOfRange(rollout)),
    }
}

/// Parse a `--config` argument. Only JSON objects are accepted.
pub fn parse_config(raw: &str) -> Result<Value, ValidationError> {
    let value: Value = serde_json::from_str(raw).map_err(ValidationError::InvalidConfigJson)?;
    if !value.is_object() {
        return Err(ValidationError::ConfigNotObject);
    }
    Ok(value)
}

/// Parse a `--variants` argument, a JSON array of `{name, weight, value}`.
pub fn parse_variants(raw: &str) -> Result<Vec<Variant>, ValidationError> {
    let variants: Vec<Variant> =
        serde_json::from_str(raw).map_err(ValidationError::InvalidVariantsJson)?;
    validate_variants(&variants)?;
    Ok(variants)
}

pub fn validate_variants(variants: &[Variant]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    let mut total: u32 = 0;
    for variant in variants {
        if variant.name.trim().is_empty() {
            return Err(ValidationError::InvalidVariant(
                "variant name must not be empty".to_string(),
            ));
        }
        if !seen.insert(variant.name.as_str()) {
            return Err(ValidationError::InvalidVariant(format!(
                "duplicate variant '{}'",
                variant.name
            )));
        }
        total = total.saturating_add(variant.weight);
    }
    if total > 100 {
        return Err(ValidationError::VariantWeightsExceed(total));
    }
    Ok(())
}

/// Cheap structural check of a targeting expression: quotes must be closed
/// and parentheses balanced. An empty expression means no targeting.
pub fn validate_expression(expr: &str) -> Result<(), ValidationError> {
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    for (i, ch) in expr.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    ValidationError::InvalidExpression(format!("unexpected ')' at offset {}", i))
                })?;
            }
            _ => {}
        }
    }
    if quote.is_some() {
        return Err(ValidationError::InvalidExpression(
            "unterminated string".to_string(),
        ));
    }
    if depth > 0 {
        return Err(ValidationError::InvalidExpression(format!(
            "{} unclosed '('",
            depth
        )));
    }
    Ok(())
}
