//! Document Store Client
//!
//! Talks to the Firestore REST API directly.
//!
//! - create: `POST {root}:commit` with a server `REQUEST_TIME` transform on
//!   `timestamp`, under a client-generated 20 character id
//! - list: `POST {root}:runQuery`, ordered by `timestamp` descending
//! - subscribe: a listener task that re-runs the query on every tick of
//!   `listen_interval_ms` and right after a create through this adapter,
//!   pushing only snapshots that differ from the last one

pub mod value;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use self::value::{decode_record, encode_record_fields, Document, Value, FIELD_TIMESTAMP};
use super::error::{StoreError, StoreResult};
use super::subscription::Subscription;
use super::{Created, RecordStore, StoreKind};
use crate::record::{Record, Timestamp};

const AUTO_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const AUTO_ID_LEN: usize = 20;

/// Configuration for the Firestore client
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Google Cloud project id; required
    #[serde(default)]
    pub project_id: String,

    /// Web API key, sent as `?key=`
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// How often a live listener re-reads the collection
    #[serde(default = "default_listen_interval")]
    pub listen_interval_ms: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_endpoint() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_collection() -> String {
    "students".to_string()
}

fn default_listen_interval() -> u64 {
    1_000
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            project_id: String::new(),
            api_key: None,
            database: default_database(),
            collection: default_collection(),
            listen_interval_ms: default_listen_interval(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl DocumentConfig {
    fn validate(&self) -> StoreResult<()> {
        let segments = [
            ("project_id", &self.project_id),
            ("database", &self.database),
            ("collection", &self.collection),
        ];

        for (field, segment) in segments {
            if segment.trim().is_empty() {
                return Err(StoreError::Config(format!(
                    "store.document.{} must be set",
                    field
                )));
            }
            if segment.contains('/') {
                return Err(StoreError::Config(format!(
                    "store.document.{} must not contain '/'",
                    field
                )));
            }
        }

        if self.listen_interval_ms == 0 {
            return Err(StoreError::Config(
                "store.document.listen_interval_ms must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Firestore-backed record store
pub struct DocumentStore {
    client: Arc<FirestoreClient>,
    /// Bumped after every successful create so listeners re-read at once
    writes: watch::Sender<u64>,
}

impl DocumentStore {
    pub fn new(config: DocumentConfig) -> StoreResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| StoreError::Config(format!("failed to create HTTP client: {}", e)))?;

        let (writes, _) = watch::channel(0);

        Ok(Self {
            client: Arc::new(FirestoreClient { http, config }),
            writes,
        })
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.client.config
    }
}

#[async_trait]
impl RecordStore for DocumentStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Document
    }

    async fn create_record(&self, name: &str, marks: f64) -> StoreResult<Created> {
        let id = auto_id();
        let record = self.client.commit_new(&id, name, marks).await?;

        self.writes.send_modify(|v| *v += 1);
        tracing::debug!(record_id = %record.id, name = %record.name, marks, "Document created");

        Ok(Created {
            record: Some(record),
            message: None,
        })
    }

    async fn list_records(&self) -> StoreResult<Vec<Record>> {
        self.client.run_query().await
    }

    fn supports_subscribe(&self) -> bool {
        true
    }

    async fn subscribe(&self) -> StoreResult<Subscription> {
        let client = Arc::clone(&self.client);
        let mut writes = self.writes.subscribe();
        let period = Duration::from_millis(client.config.listen_interval_ms);

        Ok(Subscription::spawn(move |sink| async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last: Option<Vec<Record>> = None;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = writes.changed() => {
                        if changed.is_err() {
                            // Store dropped
                            return;
                        }
                    }
                }

                match client.run_query().await {
                    Ok(snapshot) => {
                        if last.as_ref() == Some(&snapshot) {
                            continue;
                        }
                        if !sink.push(snapshot.clone()).await {
                            return;
                        }
                        last = Some(snapshot);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Document listener stopped");
                        sink.fail(StoreError::Subscription(e.to_string())).await;
                        return;
                    }
                }
            }
        }))
    }
}

// ============================================================================
// Wire protocol
// ============================================================================

struct FirestoreClient {
    http: Client,
    config: DocumentConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommitRequest {
    writes: Vec<Write>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Write {
    update: NewDocument,
    current_document: Precondition,
    update_transforms: Vec<FieldTransform>,
}

#[derive(Debug, Serialize)]
struct NewDocument {
    name: String,
    fields: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
struct Precondition {
    exists: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldTransform {
    field_path: String,
    set_to_server_value: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    #[serde(default)]
    write_results: Vec<WriteResult>,
    #[serde(default)]
    commit_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteResult {
    #[serde(default)]
    transform_results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryItem {
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorStatus,
}

#[derive(Debug, Deserialize)]
struct ErrorStatus {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl FirestoreClient {
    /// `projects/{p}/databases/{d}/documents`
    fn root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.config.project_id, self.config.database
        )
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/{}:{}",
            self.config.endpoint.trim_end_matches('/'),
            self.root(),
            method
        )
    }

    fn post(&self, method: &str) -> reqwest::RequestBuilder {
        let request = self.http.post(self.url(method));
        match &self.config.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    fn commit_request(&self, id: &str, name: &str, marks: f64) -> CommitRequest {
        CommitRequest {
            writes: vec![Write {
                update: NewDocument {
                    name: format!("{}/{}/{}", self.root(), self.config.collection, id),
                    fields: encode_record_fields(name, marks),
                },
                current_document: Precondition { exists: false },
                update_transforms: vec![FieldTransform {
                    field_path: FIELD_TIMESTAMP.to_string(),
                    set_to_server_value: "REQUEST_TIME",
                }],
            }],
        }
    }

    fn query_request(&self) -> serde_json::Value {
        json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.config.collection }],
                "orderBy": [{
                    "field": { "fieldPath": FIELD_TIMESTAMP },
                    "direction": "DESCENDING",
                }],
            }
        })
    }

    async fn commit_new(&self, id: &str, name: &str, marks: f64) -> StoreResult<Record> {
        let response = self
            .post("commit")
            .json(&self.commit_request(id, name, marks))
            .send()
            .await
            .map_err(StoreError::from_transport)?;

        let body: CommitResponse = read_json(response).await?;

        // The transform result is the server time written to `timestamp`
        let created_at = body
            .write_results
            .first()
            .and_then(|w| w.transform_results.first())
            .and_then(Value::as_timestamp)
            .or_else(|| body.commit_time.as_deref().and_then(value::parse_timestamp))
            .unwrap_or_else(Timestamp::now);

        Ok(Record {
            id: id.to_string(),
            name: name.to_string(),
            marks,
            created_at,
        })
    }

    async fn run_query(&self) -> StoreResult<Vec<Record>> {
        let response = self
            .post("runQuery")
            .json(&self.query_request())
            .send()
            .await
            .map_err(StoreError::from_transport)?;

        let items: Vec<serde_json::Value> = read_json(response).await?;
        Ok(decode_snapshot(items))
    }
}

/// Turn `runQuery` items into records
///
/// Items are decoded one at a time: a document that does not parse, or does
/// not look like a student, is skipped without losing the rest.
fn decode_snapshot(items: Vec<serde_json::Value>) -> Vec<Record> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RunQueryItem>(item) {
            Ok(item) => item.document,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unparseable query result");
                None
            }
        })
        .filter_map(|doc| match decode_record(&doc) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(document = %doc.name, error = %e, "Skipping undecodable document");
                None
            }
        })
        .collect()
}

/// Decode a success body, or turn a Firestore error into `Rejected`
async fn read_json<T>(response: Response) -> StoreResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    let body = response.text().await.map_err(StoreError::from_transport)?;

    if status.is_success() {
        return Ok(serde_json::from_str(&body)?);
    }

    // runQuery wraps its error in a one-element array
    let error = serde_json::from_str::<ErrorBody>(&body)
        .or_else(|_| {
            serde_json::from_str::<Vec<ErrorBody>>(&body)
                .map_err(|_| ())
                .and_then(|mut all| all.pop().ok_or(()))
        })
        .ok()
        .map(|b| b.error);

    let message = match error {
        Some(ErrorStatus {
            message,
            status: Some(code),
        }) if !message.is_empty() => format!("{}: {}", code, message),
        Some(ErrorStatus { message, .. }) if !message.is_empty() => message,
        _ => format!("Request failed with status code {}", status.as_u16()),
    };

    Err(StoreError::Rejected {
        status: Some(status.as_u16()),
        message,
    })
}

/// 20 character alphanumeric id, same shape as the SDK's auto ids
///
/// Characters are drawn uniformly: the low 6 bits of each fully random uuid
/// byte pick an index, and the two indices past the alphabet are rejected.
pub fn auto_id() -> String {
    let mut id = String::with_capacity(AUTO_ID_LEN);

    while id.len() < AUTO_ID_LEN {
        let uuid = Uuid::new_v4();
        let indices = uuid
            .as_bytes()
            .iter()
            .enumerate()
            // Bytes 6 and 8 carry the version and variant bits
            .filter(|(i, _)| *i != 6 && *i != 8)
            .map(|(_, b)| usize::from(b & 0x3F));

        for index in indices {
            if id.len() == AUTO_ID_LEN {
                break;
            }
            if let Some(c) = AUTO_ID_ALPHABET.get(index) {
                id.push(char::from(*c));
            }
        }
    }

    id
}
