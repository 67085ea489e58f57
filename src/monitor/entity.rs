//! Tracked entity (a player-owned base / station) as observed upstream.

use std::time::SystemTime;

use serde_json::Value;

/// Owner reported when the upstream record carries none.
pub const UNKNOWN_OWNER: &str = "Unknown";

/// Last-observed state of one tracked base.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntity {
    /// Identity derived from the station/id field or mapping key.
    pub key: String,
    /// Owning player or faction.
    pub owner: String,
    /// Health percentage; `None` when the record has no usable value.
    pub health: Option<f64>,
    /// Items listing as a string (verbatim string or compact JSON).
    pub items: String,
    /// When this observation was taken.
    pub last_seen: SystemTime,
}

impl TrackedEntity {
    /// Builds an entity from one upstream record.
    ///
    /// Object records contribute `owner`, `health` and `items` fields.
    /// Any other JSON value (for example a bare goods list keyed by station)
    /// is treated as the items listing itself.
    #[must_use]
    pub fn from_record(key: impl Into<String>, record: &Value, last_seen: SystemTime) -> Self {
        let key = key.into();

        let Value::Object(fields) = record else {
            return Self {
                key,
                owner: UNKNOWN_OWNER.to_string(),
                health: None,
                items: items_text(record),
                last_seen,
            };
        };

        let owner = fields
            .get("owner")
            .and_then(scalar_text)
            .unwrap_or_else(|| UNKNOWN_OWNER.to_string());
        let health = fields.get("health").and_then(health_value);
        let items = fields.get("items").map(items_text).unwrap_or_default();

        Self {
            key,
            owner,
            health,
            items,
            last_seen,
        }
    }
}

/// Renders a scalar JSON value as text; `None` for null and containers.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn health_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|h| h.is_finite())
}

fn items_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
