//! Core domain types shared across the pipeline crates.

use serde::{Deserialize, Serialize};

/// A Confluence page with its storage-format body.
///
/// Fetched once per pipeline run and discarded after the QnA payload is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Content id (numeric string in Confluence).
    pub id: String,
    /// Page title.
    pub title: String,
    /// Raw storage-format markup from `body.storage.value`.
    pub body: String,
}

/// A reference to a page discovered via space search, before its body is fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRef {
    /// Content id.
    pub id: String,
    /// Page title (used for exclusion filtering and as the QnA question).
    pub title: String,
    /// REST self link for the page.
    pub url: String,
}
