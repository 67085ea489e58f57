//! Upstream payload shape detection and allow-list filtering.
//!
//! The upstream does not commit to one layout, so detection is an ordered
//! list of strategies:
//!
//! 1. A JSON object is a [`PayloadShape::KeyedMapping`] keyed by station.
//! 2. A JSON array whose first record carries one of [`IdField::PRIORITY`]
//!    is [`PayloadShape::RecordsWithField`]; the first field found wins.
//! 3. Anything else is [`PayloadShape::Unrecognized`] and passes through
//!    untouched.

use serde_json::Value;

use super::AllowList;
use super::entity::scalar_text;

/// Record field that identifies a station in list-shaped payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdField {
    /// `station`
    Station,
    /// `station_id`
    StationId,
    /// `id`
    Id,
    /// `base`
    Base,
    /// `name`; display names are only used when no id-like field exists.
    Name,
}

impl IdField {
    /// Detection order.
    pub const PRIORITY: [Self; 5] = [
        Self::Station,
        Self::StationId,
        Self::Id,
        Self::Base,
        Self::Name,
    ];

    /// JSON field name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Station => "station",
            Self::StationId => "station_id",
            Self::Id => "id",
            Self::Base => "base",
            Self::Name => "name",
        }
    }
}

/// Recognized layout of an upstream payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `{"<station>": {...}, ...}`
    KeyedMapping,
    /// `[{"<field>": "<station>", ...}, ...]`
    RecordsWithField(IdField),
    /// Neither of the above; no indexing or filtering is possible.
    Unrecognized,
}

impl PayloadShape {
    /// Detects the shape of a payload.
    ///
    /// An empty array is an empty record list rather than an unknown shape.
    #[must_use]
    pub fn detect(payload: &Value) -> Self {
        match payload {
            Value::Object(_) => Self::KeyedMapping,
            Value::Array(records) => match records.first() {
                None => Self::RecordsWithField(IdField::Station),
                Some(Value::Object(first)) => IdField::PRIORITY
                    .into_iter()
                    .find(|field| first.contains_key(field.as_str()))
                    .map_or(Self::Unrecognized, Self::RecordsWithField),
                Some(_) => Self::Unrecognized,
            },
            _ => Self::Unrecognized,
        }
    }

    /// Returns `true` for [`PayloadShape::Unrecognized`].
    #[must_use]
    pub const fn is_unrecognized(self) -> bool {
        matches!(self, Self::Unrecognized)
    }
}

/// Extracts the station key of a record using the detected field.
///
/// Returns `None` for non-object records and records lacking a scalar value
/// in that field.
#[must_use]
pub fn record_key(record: &Value, field: IdField) -> Option<String> {
    record.get(field.as_str()).and_then(scalar_text)
}

/// Splits a payload into `(key, record)` pairs in payload order.
///
/// Records without a usable key are skipped. Returns `None` when the shape is
/// unrecognized.
#[must_use]
pub fn index_entries(payload: &Value, shape: PayloadShape) -> Option<Vec<(String, &Value)>> {
    match (shape, payload) {
        (PayloadShape::KeyedMapping, Value::Object(map)) => {
            Some(map.iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        (PayloadShape::RecordsWithField(field), Value::Array(records)) => Some(
            records
                .iter()
                .filter_map(|record| {
                    let key = record_key(record, field);
                    if key.is_none() {
                        tracing::debug!("Skipping record without '{}' field", field.as_str());
                    }
                    key.map(|k| (k, record))
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Restricts a payload to allow-listed stations, preserving its shape.
///
/// Mappings keep the entries whose key is allowed; record lists keep the
/// records whose detected id field is allowed. Payloads of unknown shape are
/// returned unchanged and a warning is logged.
#[must_use]
pub fn filter_allowed(payload: Value, allow: &AllowList) -> Value {
    let shape = PayloadShape::detect(&payload);

    match (shape, payload) {
        (PayloadShape::KeyedMapping, Value::Object(map)) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| allow.contains(key))
                .collect(),
        ),
        (PayloadShape::RecordsWithField(field), Value::Array(records)) => Value::Array(
            records
                .into_iter()
                .filter(|record| record_key(record, field).is_some_and(|k| allow.contains(&k)))
                .collect(),
        ),
        (_, payload) => {
            tracing::warn!("Unknown payload shape, station filter not applied");
            payload
        }
    }
}

#[cfg(test)]
#[path = "shape_tests.rs"]
mod tests;
