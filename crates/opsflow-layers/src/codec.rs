//! Type coercion between the remote attribute bag and typed local values

use crate::attribute::{AttributeDefinition, AttributeValue, AttributeValues, ScalarKind};
use crate::error::{LayerError, Result};
use opsflow_cloud::RemoteAttributes;

/// Decode a remote attribute bag into typed local values.
///
/// Write-only attributes are always carried over from `prior`, whatever the
/// remote side reports. A missing key or an unparsable integer yields an
/// unset value. Booleans decode as `value != "false"`.
pub fn decode(
    remote: &RemoteAttributes,
    table: &[AttributeDefinition],
    prior: &AttributeValues,
) -> AttributeValues {
    let mut values = AttributeValues::new();

    for def in table {
        let decoded = if def.write_only {
            prior.get(def.key).cloned()
        } else {
            remote
                .get(def.remote_key)
                .and_then(|raw| decode_scalar(def.kind, raw))
        };

        if let Some(value) = decoded {
            values.insert(def.key.to_string(), value);
        }
    }

    values
}

fn decode_scalar(kind: ScalarKind, raw: &str) -> Option<AttributeValue> {
    match kind {
        ScalarKind::String => Some(AttributeValue::String(raw.to_string())),
        ScalarKind::Int => raw.parse::<i64>().ok().map(AttributeValue::Int),
        ScalarKind::Bool => Some(AttributeValue::Bool(raw != "false")),
    }
}

/// Encode typed local values into the remote attribute bag.
///
/// Every table entry is emitted: the local value, else the table default,
/// else the kind's zero value. Write-only attributes are sent like any other.
pub fn encode(values: &AttributeValues, table: &[AttributeDefinition]) -> Result<RemoteAttributes> {
    let mut remote = RemoteAttributes::new();

    for def in table {
        let value = def.resolve(values);
        if value.kind() != def.kind {
            return Err(LayerError::Validation(format!(
                "{}: cannot encode a {} value as {}",
                def.key,
                value.kind(),
                def.kind
            )));
        }
        remote.insert(def.remote_key.to_string(), encode_scalar(&value));
    }

    Ok(remote)
}

fn encode_scalar(value: &AttributeValue) -> String {
    match value {
        AttributeValue::String(s) => s.clone(),
        AttributeValue::Int(i) => i.to_string(),
        AttributeValue::Bool(b) => b.to_string(),
    }
}
