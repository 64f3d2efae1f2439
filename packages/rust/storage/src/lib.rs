//! Blob storage client: upload rehosted images and mint signed read URLs.
//!
//! Uploads go through the blob REST API as block blobs, authorized by a
//! short-lived create+write SAS; readers get a separate read-only SAS URL
//! whose lifetime the pipeline controls (24 hours for rehosted images).

mod sas;

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use reqwest::Client;
use tracing::{debug, instrument};

use qnasync_shared::{QnaSyncError, Result, StorageConfig};

pub use sas::{SAS_VERSION, SasScope, blob_sas_query};

/// User-Agent string for storage requests.
const USER_AGENT: &str = concat!("qnasync/", env!("CARGO_PKG_VERSION"));

/// Request timeout in seconds.
const TIMEOUT_SECS: u64 = 30;

/// Upload authorization window in minutes.
const UPLOAD_WINDOW_MINUTES: i64 = 15;

/// SAS windows start backdated by this many minutes to tolerate clock skew.
const CLOCK_SKEW_MINUTES: i64 = 5;

/// Client for one storage account + container.
pub struct BlobStore {
    client: Client,
    account: String,
    endpoint: String,
    container: String,
    account_key: String,
}

impl BlobStore {
    /// Create a store for the configured account and container.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(StdDuration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| QnaSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            account: config.account_name.clone(),
            endpoint: config.endpoint.clone(),
            container: config.container.clone(),
            account_key: config.account_key.clone(),
        })
    }

    /// Upload a block blob under `name`, overwriting any existing blob.
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let now = Utc::now();
        let scope = SasScope {
            account: &self.account,
            container: &self.container,
            blob: name,
            permissions: "cw",
            start: now - Duration::minutes(CLOCK_SKEW_MINUTES),
            expiry: now + Duration::minutes(UPLOAD_WINDOW_MINUTES),
        };
        let query = blob_sas_query(&scope, &self.account_key)?;
        let url = self.blob_url(name, &query);

        let response = self
            .client
            .put(&url)
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-version", SAS_VERSION)
            .body(bytes)
            .send()
            .await
            .map_err(|e| QnaSyncError::Network(format!("PUT {name}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QnaSyncError::Storage(format!("PUT {name}: HTTP {status}")));
        }

        debug!(name, "blob uploaded");
        Ok(())
    }

    /// Mint a read-only signed URL for `name`, valid for `ttl` from now.
    pub fn signed_read_url(&self, name: &str, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let scope = SasScope {
            account: &self.account,
            container: &self.container,
            blob: name,
            permissions: "r",
            start: now - Duration::minutes(CLOCK_SKEW_MINUTES),
            expiry: now + ttl,
        };
        let query = blob_sas_query(&scope, &self.account_key)?;

        Ok(self.blob_url(name, &query))
    }

    /// Full blob URL with the SAS query attached. The name is percent-encoded
    /// (attachment filenames routinely contain spaces).
    fn blob_url(&self, name: &str, query: &str) -> String {
        format!(
            "{}/{}/{}?{query}",
            self.endpoint,
            self.container,
            urlencoding::encode(name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // "storage-account-test-key" in base64
    const TEST_KEY: &str = "c3RvcmFnZS1hY2NvdW50LXRlc3Qta2V5";

    fn test_config(endpoint: &str) -> StorageConfig {
        StorageConfig {
            account_name: "acct".into(),
            endpoint: endpoint.to_string(),
            container: "media".into(),
            account_key: TEST_KEY.into(),
        }
    }

    #[tokio::test]
    async fn upload_puts_block_blob_with_write_sas() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/media/shot.png"))
            .and(query_param("sp", "cw"))
            .and(query_param("sr", "b"))
            .and(header("x-ms-blob-type", "BlockBlob"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let store = BlobStore::new(&test_config(&server.uri())).unwrap();
        store.upload("shot.png", b"png-bytes".to_vec()).await.unwrap();
    }

    #[tokio::test]
    async fn upload_failure_is_storage_error() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/media/denied.png"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let store = BlobStore::new(&test_config(&server.uri())).unwrap();
        let err = store.upload("denied.png", vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, QnaSyncError::Storage(_)));
        assert!(err.to_string().contains("HTTP 403"));
    }

    #[test]
    fn signed_read_url_shape() {
        let store = BlobStore::new(&test_config("https://acct.blob.example.net")).unwrap();
        let url = store
            .signed_read_url("login screen.png", Duration::hours(24))
            .unwrap();

        assert!(url.starts_with("https://acct.blob.example.net/media/login%20screen.png?sv="));
        assert!(url.contains("&sp=r&"));
        assert!(url.contains("sig="));
        assert!(!url.contains(' '));
    }

    #[test]
    fn bad_key_surfaces_from_signed_read_url() {
        let mut config = test_config("https://acct.blob.example.net");
        config.account_key = "***".into();
        let store = BlobStore::new(&config).unwrap();
        assert!(store.signed_read_url("a.png", Duration::hours(1)).is_err());
    }
}
