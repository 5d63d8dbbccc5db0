//! REST Store Client
//!
//! HTTP client for the `/students` API.
//!
//! - `GET  {base}/students` → `{success, data: Record[]}`
//! - `POST {base}/students` with `{name, marks}` → `{success, data?, message?, error?}`
//! - `GET  {base}/top-performers?limit=N` → `{success, data: Record[]}`

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{StoreError, StoreResult};
use super::{Created, RecordStore, StoreKind};
use crate::record::Record;

/// Fallback when the backend refuses a create without saying why
const DEFAULT_CREATE_FAILURE: &str = "Failed to submit data";

/// Configuration for the REST client
#[derive(Debug, Clone, Deserialize)]
pub struct RestConfig {
    /// Base URL including the `/api` prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:3001/api".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Response envelope used by every REST endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateRecordBody<'a> {
    name: &'a str,
    marks: f64,
}

/// Client for the REST backend
pub struct RestStore {
    client: Client,
    config: RestConfig,
}

impl RestStore {
    pub fn new(config: RestConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| StoreError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Fetch a record list, treating `success: false` as an empty list
    async fn fetch_list(&self, url: &str, query: &[(&str, String)]) -> StoreResult<Vec<Record>> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(StoreError::from_transport)?;

        let envelope: ApiEnvelope<Vec<serde_json::Value>> = read_envelope(response).await?;

        if envelope.success {
            Ok(decode_records(envelope.data.unwrap_or_default()))
        } else {
            tracing::warn!(
                url = %url,
                error = envelope.error.as_deref().unwrap_or("unspecified"),
                "Backend reported an unsuccessful read, showing no records"
            );
            Ok(Vec::new())
        }
    }
}

#[async_trait]
impl RecordStore for RestStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Rest
    }

    async fn create_record(&self, name: &str, marks: f64) -> StoreResult<Created> {
        let url = self.url("students");

        let response = self
            .client
            .post(&url)
            .json(&CreateRecordBody { name, marks })
            .send()
            .await
            .map_err(StoreError::from_transport)?;

        let envelope: ApiEnvelope<Record> = read_envelope(response).await?;

        if envelope.success {
            Ok(Created {
                record: envelope.data,
                message: envelope.message,
            })
        } else {
            Err(StoreError::Rejected {
                status: None,
                message: envelope
                    .error
                    .unwrap_or_else(|| DEFAULT_CREATE_FAILURE.to_string()),
            })
        }
    }

    async fn list_records(&self) -> StoreResult<Vec<Record>> {
        self.fetch_list(&self.url("students"), &[]).await
    }

    async fn top_performers(&self, limit: usize) -> StoreResult<Vec<Record>> {
        self.fetch_list(&self.url("top-performers"), &[("limit", limit.to_string())])
            .await
    }
}

/// Decode list items one at a time, dropping the ones that do not parse
fn decode_records(items: Vec<serde_json::Value>) -> Vec<Record> {
    items
        .into_iter()
        .filter_map(|item| {
            let id = item
                .get("id")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("?")
                .to_string();

            if item.get("timestamp").is_none() {
                tracing::debug!(record_id = %id, "Record has no timestamp, using the epoch");
            }

            match serde_json::from_value::<Record>(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(record_id = %id, error = %e, "Skipping undecodable record");
                    None
                }
            }
        })
        .collect()
}

/// Decode an envelope, turning HTTP failures into `Rejected`
///
/// Error statuses that still carry an envelope keep the backend's `error`
/// text; anything else reports the bare status code.
async fn read_envelope<T>(response: Response) -> StoreResult<ApiEnvelope<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    let body = response.text().await.map_err(StoreError::from_transport)?;

    if status.is_success() {
        return Ok(serde_json::from_str(&body)?);
    }

    let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
        .ok()
        .and_then(|envelope| envelope.error.or(envelope.message))
        .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));

    Err(StoreError::Rejected {
        status: Some(status.as_u16()),
        message,
    })
}
