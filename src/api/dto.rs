//! Data Transfer Objects
//!
//! Request and response types for the API endpoints. Responses to the
//! `/api` routes are wrapped in [`ApiEnvelope`](crate::store::ApiEnvelope).

use serde::{Deserialize, Serialize};

use crate::record::Record;
use crate::store::ApiEnvelope;

// ============================================
// STUDENT DTOs
// ============================================

/// POST /api/students body
///
/// Both fields are optional at the parsing stage so that a missing field
/// gets the same message as a blank one.
#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// A JSON number, or a numeric string
    #[serde(default)]
    pub marks: Option<serde_json::Value>,
}

impl CreateStudentRequest {
    /// Marks as the text a form would have held
    pub fn marks_text(&self) -> Option<String> {
        match self.marks.as_ref()? {
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            // Never parses as a number, so it fails the range check
            other => Some(other.to_string()),
        }
    }
}

pub type StudentResponse = ApiEnvelope<Record>;
pub type StudentListResponse = ApiEnvelope<Vec<Record>>;

/// GET /api/top-performers query string
#[derive(Debug, Deserialize)]
pub struct TopPerformersParams {
    #[serde(default)]
    pub limit: Option<usize>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: healthy or unhealthy
    pub status: String,
    /// Store status: ok or error
    pub store: String,
    /// Which store backs the server
    pub backing: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
