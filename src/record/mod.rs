//! Core record types
//!
//! - `Record`: a stored name/marks/timestamp tuple
//! - `Timestamp`: seconds + nanoseconds, the wire shape both backends share
//! - `ChartPoint`: the `{name, marks}` pair the chart renders
//! - `MarksPolicy`: what range of marks the submission form accepts

mod validation;

pub use validation::{validate_submission, ValidationError, ValidSubmission};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A stored candidate record
///
/// `id` is assigned by the store and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Store-assigned identifier
    pub id: String,
    /// Candidate name (non-empty after trimming)
    pub name: String,
    /// Score as submitted
    pub marks: f64,
    /// When the store accepted the record; the epoch if the backend sent none
    #[serde(rename = "timestamp", default)]
    pub created_at: Timestamp,
}

impl Record {
    /// Project the record to what the chart draws
    pub fn chart_point(&self) -> ChartPoint {
        ChartPoint {
            name: self.name.clone(),
            marks: self.marks,
        }
    }
}

/// Point in time as `{seconds, nanoseconds}` since the Unix epoch
///
/// Also reads the `{_seconds, _nanoseconds}` shape the Firestore admin SDK
/// serializes its timestamps to.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Timestamp {
    #[serde(alias = "_seconds")]
    pub seconds: i64,
    #[serde(alias = "_nanoseconds", default)]
    pub nanoseconds: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanoseconds).single()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanoseconds: dt.timestamp_subsec_nanos(),
        }
    }
}

/// One bar of the chart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub name: String,
    pub marks: f64,
}

/// Accepted range for submitted marks
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarksPolicy {
    /// Any finite number
    Unbounded,
    /// Inclusive `[min, max]`
    Bounded { min: f64, max: f64 },
}

impl MarksPolicy {
    /// The 0-100 percentage range used by the REST backend
    pub const PERCENT: MarksPolicy = MarksPolicy::Bounded {
        min: 0.0,
        max: 100.0,
    };

    pub fn accepts(&self, marks: f64) -> bool {
        match *self {
            MarksPolicy::Unbounded => marks.is_finite(),
            MarksPolicy::Bounded { min, max } => marks.is_finite() && marks >= min && marks <= max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_shape() {
        let record = Record {
            id: "abc".to_string(),
            name: "Ava".to_string(),
            marks: 87.0,
            created_at: Timestamp {
                seconds: 1_700_000_000,
                nanoseconds: 5,
            },
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["timestamp"]["seconds"], 1_700_000_000);
        assert_eq!(json["timestamp"]["nanoseconds"], 5);
        assert_eq!(json["marks"], 87.0);
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_record_parses_integer_marks() {
        let json = r#"{"id":"x","name":"Bo","marks":42,"timestamp":{"seconds":10,"nanoseconds":0}}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.marks, 42.0);
        assert_eq!(record.created_at.seconds, 10);
    }

    #[test]
    fn test_record_reads_admin_sdk_timestamp() {
        let json = r#"{"id":"a","name":"Ava","marks":87,"timestamp":{"_seconds":1714557605,"_nanoseconds":250}}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(
            record.created_at,
            Timestamp {
                seconds: 1_714_557_605,
                nanoseconds: 250
            }
        );

        // Written back in the canonical shape
        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["timestamp"]["seconds"], 1_714_557_605);
    }

    #[test]
    fn test_record_without_timestamp_uses_epoch() {
        let record: Record = serde_json::from_str(r#"{"id":"a","name":"Ava","marks":87}"#).unwrap();
        assert_eq!(record.created_at, Timestamp::default());
    }

    #[test]
    fn test_timestamp_datetime_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let ts = Timestamp::from(dt);
        assert_eq!(ts.to_datetime(), Some(dt));
    }

    #[test]
    fn test_percent_policy_bounds() {
        let policy = MarksPolicy::PERCENT;
        assert!(policy.accepts(0.0));
        assert!(policy.accepts(100.0));
        assert!(!policy.accepts(100.5));
        assert!(!policy.accepts(-1.0));
        assert!(!policy.accepts(f64::NAN));
        assert!(MarksPolicy::Unbounded.accepts(150.0));
        assert!(!MarksPolicy::Unbounded.accepts(f64::INFINITY));
    }
}
