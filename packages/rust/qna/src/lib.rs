//! QnA knowledge-base payloads and API client.
//!
//! The knowledge-base service accepts a JSON-patch-style array of operations;
//! this pipeline only ever emits `add` operations, one per migrated page.
//! The wire shape is fixed by the service:
//!
//! ```json
//! {"op":"add","value":{"id":"...","answer":"...","source":"Editorial",
//!  "questions":["..."],"metadata":{},"dialog":{"isContextOnly":false,"prompts":[]}}}
//! ```

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use qnasync_shared::{QnaConfig, QnaSyncError, Result};

/// User-Agent string for QnA API requests.
const USER_AGENT: &str = concat!("qnasync/", env!("CARGO_PKG_VERSION"));

/// Request timeout in seconds.
const TIMEOUT_SECS: u64 = 60;

/// API version pinned in the qnas endpoint query string.
const API_VERSION: &str = "2021-10-01";

/// Source label stamped on every record.
const SOURCE: &str = "Editorial";

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// One `add` operation for the qnas PATCH endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QnaPayload {
    /// Operation kind; always `"add"` here.
    pub op: String,
    /// The record to add.
    pub value: QnaValue,
}

/// The QnA record itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QnaValue {
    /// Record id, reused from the source page id.
    pub id: String,
    /// Markdown answer body.
    pub answer: String,
    /// Fixed source label.
    pub source: String,
    /// Question phrasings; the pipeline emits exactly one (the page title).
    pub questions: Vec<String>,
    /// Always empty for migrated records.
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Dialog defaults; no prompts, not context-only.
    pub dialog: QnaDialog,
}

/// Dialog settings of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QnaDialog {
    pub is_context_only: bool,
    pub prompts: Vec<serde_json::Value>,
}

impl QnaPayload {
    /// Build an `add` operation for one (question, answer, id) triple.
    pub fn add(question: &str, answer: &str, id: &str) -> Self {
        Self {
            op: "add".into(),
            value: QnaValue {
                id: id.into(),
                answer: answer.into(),
                source: SOURCE.into(),
                questions: vec![question.into()],
                metadata: serde_json::Map::new(),
                dialog: QnaDialog {
                    is_context_only: false,
                    prompts: Vec::new(),
                },
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for one Language Studio QnA project.
pub struct QnaClient {
    client: Client,
    endpoint: String,
    key: String,
    project: String,
}

impl QnaClient {
    /// Create a client for the configured project.
    pub fn new(config: &QnaConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| QnaSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            key: config.key.clone(),
            project: config.project.clone(),
        })
    }

    /// PATCH a batch of operations into the project's knowledge base.
    ///
    /// Returns the HTTP status code; the service reports ingestion problems
    /// through the status, and the caller decides what a non-2xx means.
    #[instrument(skip(self, payloads), fields(count = payloads.len()))]
    pub async fn patch_qnas(&self, payloads: &[QnaPayload]) -> Result<u16> {
        let url = format!(
            "{}/language/query-knowledgebases/projects/{}/qnas?api-version={API_VERSION}",
            self.endpoint, self.project
        );

        let response = self
            .client
            .patch(&url)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .json(payloads)
            .send()
            .await
            .map_err(|e| QnaSyncError::Qna(format!("{url}: {e}")))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!(status, body = %body, "qnas PATCH response");

        Ok(status)
    }
}
