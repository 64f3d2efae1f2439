//! Confluence REST API client.
//!
//! Three endpoints are consumed:
//! - page by id with the storage-format body expanded
//! - CQL space search for batch page discovery
//! - attachment download for image rehosting
//!
//! Every request carries the bearer token from [`ConfluenceConfig`]. Non-2xx
//! responses and missing response fields are errors; there is no retry.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use qnasync_shared::{ConfluenceConfig, Page, PageRef, QnaSyncError, Result};

/// User-Agent string for Confluence requests.
const USER_AGENT: &str = concat!("qnasync/", env!("CARGO_PKG_VERSION"));

/// Request timeout in seconds.
const TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ContentResponse {
    id: String,
    title: String,
    body: ContentBody,
}

#[derive(Debug, Deserialize)]
struct ContentBody {
    storage: ContentStorage,
}

#[derive(Debug, Deserialize)]
struct ContentStorage {
    value: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: String,
    title: String,
    #[serde(rename = "_links")]
    links: SearchLinks,
}

#[derive(Debug, Deserialize)]
struct SearchLinks {
    #[serde(rename = "self")]
    self_url: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Authenticated Confluence API client.
pub struct ConfluenceClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl ConfluenceClient {
    /// Create a client for the configured Confluence instance.
    pub fn new(config: &ConfluenceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| QnaSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
        })
    }

    /// Fetch a page by id with its storage-format body expanded.
    #[instrument(skip(self))]
    pub async fn page(&self, id: &str) -> Result<Page> {
        let url = format!("{}/rest/api/content/{id}", self.endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[("expand", "body.storage")])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| QnaSyncError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QnaSyncError::Network(format!("{url}: HTTP {status}")));
        }

        let content: ContentResponse = response
            .json()
            .await
            .map_err(|e| QnaSyncError::parse(format!("page {id}: {e}")))?;

        debug!(id = %content.id, title = %content.title, "page fetched");

        Ok(Page {
            id: content.id,
            title: content.title,
            body: content.body.storage.value,
        })
    }

    /// List pages in a space via CQL search.
    #[instrument(skip(self))]
    pub async fn search_space(&self, space_key: &str) -> Result<Vec<PageRef>> {
        let url = format!("{}/rest/api/content/search", self.endpoint);
        let cql = format!("(space={space_key} and type=page)");

        let response = self
            .client
            .get(&url)
            .query(&[("cql", cql.as_str())])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| QnaSyncError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QnaSyncError::Network(format!("{url}: HTTP {status}")));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| QnaSyncError::parse(format!("space search {space_key}: {e}")))?;

        debug!(space = space_key, results = search.results.len(), "space searched");

        Ok(search
            .results
            .into_iter()
            .map(|r| PageRef {
                id: r.id,
                title: r.title,
                url: r.links.self_url,
            })
            .collect())
    }

    /// Download an attachment binary from a page.
    ///
    /// The filename is percent-encoded into the download path (attachment
    /// names routinely contain spaces).
    #[instrument(skip(self))]
    pub async fn attachment(&self, page_id: &str, filename: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/download/attachments/{page_id}/{}",
            self.endpoint,
            urlencoding::encode(filename)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| QnaSyncError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QnaSyncError::Network(format!("{url}: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| QnaSyncError::Network(format!("{url}: failed to read body: {e}")))?;

        debug!(filename, len = bytes.len(), "attachment downloaded");

        Ok(bytes.to_vec())
    }
}
