//! Attribute definition tables
//!
//! Each layer variant declares the extra settings it packs into the remote
//! attribute bag as a table of [`AttributeDefinition`]s. The table is pure
//! data; the schema builder and the codec interpret it.

use crate::error::{LayerError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Scalar kinds an attribute may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    String,
    Int,
    Bool,
}

impl ScalarKind {
    /// Value used when neither the caller nor the table supplies one
    pub fn zero(self) -> AttributeValue {
        match self {
            ScalarKind::String => AttributeValue::String(String::new()),
            ScalarKind::Int => AttributeValue::Int(0),
            ScalarKind::Bool => AttributeValue::Bool(false),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::String => write!(f, "string"),
            ScalarKind::Int => write!(f, "int"),
            ScalarKind::Bool => write!(f, "bool"),
        }
    }
}

/// A locally typed attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl AttributeValue {
    pub fn kind(&self) -> ScalarKind {
        match self {
            AttributeValue::Bool(_) => ScalarKind::Bool,
            AttributeValue::Int(_) => ScalarKind::Int,
            AttributeValue::String(_) => ScalarKind::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
            AttributeValue::Int(i) => serde_json::Value::from(*i),
            AttributeValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Local attribute values keyed by local field name; a missing key is unset
pub type AttributeValues = BTreeMap<String, AttributeValue>;

/// Input validation attached to an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// `arn:<partition>:<service>:<region>:<account>:<resource>`
    Arn,
    OneOf(&'static [&'static str]),
    IntBetween(i64, i64),
}

impl Validation {
    pub fn check(&self, key: &str, value: &AttributeValue) -> Result<()> {
        match (self, value) {
            (Validation::Arn, AttributeValue::String(s)) => {
                if is_valid_arn(s) {
                    Ok(())
                } else {
                    Err(LayerError::Validation(format!(
                        "{}: \"{}\" is not a valid ARN",
                        key, s
                    )))
                }
            }
            (Validation::OneOf(allowed), AttributeValue::String(s)) => check_one_of(key, s, allowed),
            (Validation::IntBetween(min, max), AttributeValue::Int(i)) => {
                check_range(key, *i, *min, *max)
            }
            (validation, value) => Err(LayerError::Validation(format!(
                "{}: {:?} cannot validate a {} value",
                key,
                validation,
                value.kind()
            ))),
        }
    }
}

pub(crate) fn check_one_of(field: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(LayerError::Validation(format!(
            "{}: expected one of {:?}, got \"{}\"",
            field, allowed, value
        )))
    }
}

pub(crate) fn check_range(field: &str, value: i64, min: i64, max: i64) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(LayerError::Validation(format!(
            "{}: expected a value between {} and {}, got {}",
            field, min, max, value
        )))
    }
}

/// Loose structural ARN check
pub fn is_valid_arn(value: &str) -> bool {
    let parts: Vec<&str> = value.splitn(6, ':').collect();
    parts.len() == 6
        && parts[0] == "arn"
        && !parts[1].is_empty()
        && !parts[2].is_empty()
        && !parts[5].is_empty()
}

/// One entry of a variant's attribute table
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDefinition {
    /// Local field name exposed in the schema
    pub key: &'static str,
    /// Key inside the remote attribute bag
    pub remote_key: &'static str,
    pub kind: ScalarKind,
    pub default: Option<AttributeValue>,
    /// Changing the value requires destroying and recreating the layer
    pub force_replace: bool,
    pub required: bool,
    /// The remote API answers with a redaction placeholder for this key
    pub write_only: bool,
    pub validation: Option<Validation>,
}

impl AttributeDefinition {
    pub fn new(key: &'static str, remote_key: &'static str, kind: ScalarKind) -> Self {
        Self {
            key,
            remote_key,
            kind,
            default: None,
            force_replace: false,
            required: false,
            write_only: false,
            validation: None,
        }
    }

    pub fn string(key: &'static str, remote_key: &'static str) -> Self {
        Self::new(key, remote_key, ScalarKind::String)
    }

    pub fn int(key: &'static str, remote_key: &'static str) -> Self {
        Self::new(key, remote_key, ScalarKind::Int)
    }

    pub fn bool(key: &'static str, remote_key: &'static str) -> Self {
        Self::new(key, remote_key, ScalarKind::Bool)
    }

    pub fn with_default(mut self, value: impl Into<AttributeValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn force_replace(mut self) -> Self {
        self.force_replace = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn validated_by(mut self, validation: Validation) -> Self {
        self.validation = Some(validation);
        self
    }

    /// The value to send: the local value, else the table default, else zero
    pub fn resolve<'a>(&'a self, values: &'a AttributeValues) -> Cow<'a, AttributeValue> {
        match values.get(self.key).or(self.default.as_ref()) {
            Some(v) => Cow::Borrowed(v),
            None => Cow::Owned(self.kind.zero()),
        }
    }
}

/// Check a table for authoring defects: duplicate keys, defaults of the wrong
/// kind, or a required attribute that also carries a default
pub fn validate_table(table: &[AttributeDefinition]) -> Result<()> {
    let mut keys = HashSet::new();
    let mut remote_keys = HashSet::new();

    for def in table {
        if !keys.insert(def.key) {
            return Err(LayerError::Validation(format!(
                "duplicate attribute key: {}",
                def.key
            )));
        }
        if !remote_keys.insert(def.remote_key) {
            return Err(LayerError::Validation(format!(
                "duplicate remote attribute key: {}",
                def.remote_key
            )));
        }
        if let Some(default) = &def.default {
            if default.kind() != def.kind {
                return Err(LayerError::Validation(format!(
                    "{}: default is {} but the attribute is declared {}",
                    def.key,
                    default.kind(),
                    def.kind
                )));
            }
            if def.required {
                return Err(LayerError::Validation(format!(
                    "{}: a required attribute cannot have a default",
                    def.key
                )));
            }
        }
    }

    Ok(())
}

/// Check caller-supplied values against a table
pub fn validate_values(table: &[AttributeDefinition], values: &AttributeValues) -> Result<()> {
    for key in values.keys() {
        if !table.iter().any(|def| def.key == key) {
            return Err(LayerError::Validation(format!(
                "unknown attribute: {}",
                key
            )));
        }
    }

    for def in table {
        match values.get(def.key) {
            Some(value) => {
                if value.kind() != def.kind {
                    return Err(LayerError::Validation(format!(
                        "{}: expected a {} value, got {}",
                        def.key,
                        def.kind,
                        value.kind()
                    )));
                }
                if let Some(validation) = &def.validation {
                    validation.check(def.key, value)?;
                }
            }
            None if def.required => {
                return Err(LayerError::Validation(format!(
                    "{}: required attribute is not set",
                    def.key
                )));
            }
            None => {}
        }
    }

    Ok(())
}
