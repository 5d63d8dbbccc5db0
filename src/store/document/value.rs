//! Firestore typed values
//!
//! The REST API wraps every field in a single-key object naming its type,
//! e.g. `{"stringValue": "Ava"}` or `{"integerValue": "87"}`. This module maps
//! those objects to and from `Value`, and documents of the `students`
//! collection to and from `Record`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::record::{Record, Timestamp};

/// Field names used by the `students` collection
pub const FIELD_NAME: &str = "name";
pub const FIELD_MARKS: &str = "marks";
pub const FIELD_TIMESTAMP: &str = "timestamp";

/// Largest integer an f64 holds exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A single Firestore value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// int64, transported as a decimal string
    IntegerValue(String),
    DoubleValue(f64),
    /// RFC 3339, UTC
    TimestampValue(String),
    StringValue(String),
    /// base64
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Value {
    /// Encode a number the way the web SDK does: integral values become
    /// `integerValue`, everything else `doubleValue`.
    pub fn number(n: f64) -> Self {
        if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
            Value::IntegerValue(format!("{}", n as i64))
        } else {
            Value::DoubleValue(n)
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::StringValue(s.into())
    }

    pub fn timestamp(ts: Timestamp) -> Self {
        Value::TimestampValue(format_timestamp(ts))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::IntegerValue(s) => s.parse::<i64>().ok().map(|i| i as f64),
            Value::DoubleValue(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::StringValue(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::TimestampValue(s) => parse_timestamp(s),
            _ => None,
        }
    }
}

/// A stored document as returned by the REST API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// `projects/{p}/databases/{d}/documents/{collection}/{id}`
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// Last path segment of the resource name
    pub fn id(&self) -> Result<String, DecodeError> {
        let raw = self
            .name
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DecodeError::BadName(self.name.clone()))?;

        urlencoding::decode(raw)
            .map(|id| id.into_owned())
            .map_err(|_| DecodeError::BadName(self.name.clone()))
    }
}

/// Why a document could not be turned into a `Record`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' is not a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("invalid document name '{0}'")]
    BadName(String),
}

/// Fields written for a new record; `timestamp` is set by the server
pub fn encode_record_fields(name: &str, marks: f64) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();
    fields.insert(FIELD_NAME.to_string(), Value::string(name));
    fields.insert(FIELD_MARKS.to_string(), Value::number(marks));
    fields
}

/// Decode a `students` document
///
/// A document whose `timestamp` field is absent falls back to the document's
/// own `createTime`.
pub fn decode_record(doc: &Document) -> Result<Record, DecodeError> {
    let name = doc
        .fields
        .get(FIELD_NAME)
        .ok_or(DecodeError::MissingField(FIELD_NAME))?
        .as_str()
        .ok_or(DecodeError::WrongType {
            field: FIELD_NAME,
            expected: "string",
        })?
        .to_string();

    let marks = doc
        .fields
        .get(FIELD_MARKS)
        .ok_or(DecodeError::MissingField(FIELD_MARKS))?
        .as_f64()
        .ok_or(DecodeError::WrongType {
            field: FIELD_MARKS,
            expected: "number",
        })?;

    let created_at = match doc.fields.get(FIELD_TIMESTAMP) {
        Some(value) => value.as_timestamp().ok_or(DecodeError::WrongType {
            field: FIELD_TIMESTAMP,
            expected: "timestamp",
        })?,
        None => doc
            .create_time
            .as_deref()
            .and_then(parse_timestamp)
            .ok_or(DecodeError::MissingField(FIELD_TIMESTAMP))?,
    };

    Ok(Record {
        id: doc.id()?,
        name,
        marks,
        created_at,
    })
}

pub fn parse_timestamp(s: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| Timestamp::from(dt.with_timezone(&Utc)))
}

pub fn format_timestamp(ts: Timestamp) -> String {
    ts.to_datetime()
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
