//! Application configuration for qnasync.
//!
//! All settings come from environment variables (the deployment surface is a
//! function host plus a one-shot CLI; there is no config file). The full set
//! is resolved once at process start into an [`AppConfig`] that is passed by
//! reference into each component.

use url::Url;

use crate::error::{QnaSyncError, Result};

/// Env var holding the Confluence bearer token.
pub const ENV_CONFLUENCE_TOKEN: &str = "CONFLUENCE_TOKEN";
/// Env var holding the Confluence base URL.
pub const ENV_CONFLUENCE_ENDPOINT: &str = "CONFLUENCE_ENDPOINT";
/// Env var holding the Confluence space key for batch ingestion.
pub const ENV_CONFLUENCE_SPACE_KEY: &str = "CONFLUENCE_SPACE_KEY";
/// Env var holding a comma-separated list of page titles to skip in batch runs.
pub const ENV_EXCLUDED_TITLES: &str = "EXCLUDED_TITLES";

/// Env var holding the storage account name.
pub const ENV_BLOB_ACCOUNT_NAME: &str = "BLOB_ACCOUNT_NAME";
/// Env var holding the blob service base URL.
pub const ENV_STORAGE_URL: &str = "AZURE_STORAGE_URL";
/// Env var holding the target container name.
pub const ENV_BLOB_CONTAINER_NAME: &str = "BLOB_CONTAINER_NAME";
/// Env var holding the base64 storage account key used for SAS signing.
pub const ENV_STORAGE_ACCOUNT_KEY: &str = "STORAGE_ACCOUNT_KEY";

/// Env var holding the Cognitive Services subscription key.
pub const ENV_COGNITIVE_KEY: &str = "COGNITIVE_KEY";
/// Env var holding the Cognitive Services endpoint.
pub const ENV_COGNITIVE_ENDPOINT: &str = "COGNITIVE_ENDPOINT";
/// Env var holding the Language Studio QnA project name.
pub const ENV_LANGUAGE_STUDIO_NAME: &str = "LANGUAGE_STUDIO_NAME";

/// Default space key when `CONFLUENCE_SPACE_KEY` is unset.
const DEFAULT_SPACE_KEY: &str = "GB";

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Top-level application config, resolved from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Confluence API settings.
    pub confluence: ConfluenceConfig,
    /// Blob storage settings.
    pub storage: StorageConfig,
    /// QnA knowledge-base API settings.
    pub qna: QnaConfig,
    /// Batch ingestion settings.
    pub batch: BatchConfig,
}

/// Confluence REST API settings.
#[derive(Debug, Clone)]
pub struct ConfluenceConfig {
    /// Base URL, e.g. `https://wiki.example.com`.
    pub endpoint: String,
    /// Bearer token for the `Authorization` header.
    pub token: String,
}

/// Blob storage settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage account name (part of the SAS canonicalized resource).
    pub account_name: String,
    /// Blob service base URL, e.g. `https://acct.blob.core.windows.net`.
    pub endpoint: String,
    /// Container that receives rehosted images.
    pub container: String,
    /// Base64-encoded account key used to sign SAS tokens.
    pub account_key: String,
}

/// QnA knowledge-base API settings.
#[derive(Debug, Clone)]
pub struct QnaConfig {
    /// Cognitive Services endpoint, e.g. `https://res.cognitiveservices.azure.com`.
    pub endpoint: String,
    /// Subscription key for the `Ocp-Apim-Subscription-Key` header.
    pub key: String,
    /// Language Studio project name.
    pub project: String,
}

/// Batch ingestion settings.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Space whose pages are ingested.
    pub space_key: String,
    /// Page titles omitted from batch runs (index pages, container pages).
    pub excluded_titles: Vec<String>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Resolve the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve the configuration through an arbitrary variable lookup.
    ///
    /// Tests inject a closure over a map instead of mutating process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |name: &str| -> Result<String> {
            match lookup(name) {
                Some(val) if !val.is_empty() => Ok(val),
                _ => Err(QnaSyncError::config(format!("{name} is not set"))),
            }
        };

        let confluence = ConfluenceConfig {
            endpoint: validate_endpoint(ENV_CONFLUENCE_ENDPOINT, require(ENV_CONFLUENCE_ENDPOINT)?)?,
            token: require(ENV_CONFLUENCE_TOKEN)?,
        };

        let storage = StorageConfig {
            account_name: require(ENV_BLOB_ACCOUNT_NAME)?,
            endpoint: validate_endpoint(ENV_STORAGE_URL, require(ENV_STORAGE_URL)?)?,
            container: require(ENV_BLOB_CONTAINER_NAME)?,
            account_key: require(ENV_STORAGE_ACCOUNT_KEY)?,
        };

        let qna = QnaConfig {
            endpoint: validate_endpoint(ENV_COGNITIVE_ENDPOINT, require(ENV_COGNITIVE_ENDPOINT)?)?,
            key: require(ENV_COGNITIVE_KEY)?,
            project: require(ENV_LANGUAGE_STUDIO_NAME)?,
        };

        let batch = BatchConfig {
            space_key: lookup(ENV_CONFLUENCE_SPACE_KEY)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_SPACE_KEY.to_string()),
            excluded_titles: lookup(ENV_EXCLUDED_TITLES)
                .map(|v| parse_title_list(&v))
                .unwrap_or_default(),
        };

        tracing::debug!(
            confluence = %confluence.endpoint,
            storage = %storage.endpoint,
            qna = %qna.endpoint,
            space = %batch.space_key,
            "configuration resolved"
        );

        Ok(Self {
            confluence,
            storage,
            qna,
            batch,
        })
    }
}

/// Parse an endpoint env var, trimming any trailing slash.
fn validate_endpoint(name: &str, value: String) -> Result<String> {
    Url::parse(&value)
        .map_err(|e| QnaSyncError::config(format!("{name} is not a valid URL: {e}")))?;
    Ok(value.trim_end_matches('/').to_string())
}

/// Split a comma-separated title list, dropping empty entries.
fn parse_title_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
