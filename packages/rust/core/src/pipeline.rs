//! End-to-end page migration: fetch → normalize → rehost → convert → submit.

use std::time::Instant;

use chrono::Duration;
use tracing::{info, instrument};

use qnasync_confluence::ConfluenceClient;
use qnasync_markup::{image_sources, normalize_storage_markup, replace_image_source};
use qnasync_qna::{QnaClient, QnaPayload};
use qnasync_shared::{AppConfig, BatchConfig, Result};
use qnasync_storage::BlobStore;

/// Lifetime of the signed image URLs embedded in migrated answers.
const IMAGE_URL_TTL_HOURS: i64 = 24;

// ---------------------------------------------------------------------------
// BatchSummary
// ---------------------------------------------------------------------------

/// Summary of a completed batch run.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    /// Pages returned by the space search.
    pub discovered: usize,
    /// Pages dropped by the title exclusion list.
    pub excluded: usize,
    /// Pages migrated into payloads.
    pub migrated: usize,
    /// QnA API status code; `None` on a dry run.
    pub status: Option<u16>,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each page is migrated.
    fn page_migrated(&self, title: &str, current: usize, total: usize);
    /// Called when the batch completes.
    fn done(&self, summary: &BatchSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_migrated(&self, _title: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &BatchSummary) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The migration pipeline, constructed once from [`AppConfig`].
///
/// Pages are processed strictly one at a time; any error aborts the current
/// page and, in a batch, the remaining pages with it.
pub struct Pipeline {
    confluence: ConfluenceClient,
    store: BlobStore,
    qna: QnaClient,
    batch: BatchConfig,
}

impl Pipeline {
    /// Build the pipeline's clients from the resolved configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            confluence: ConfluenceClient::new(&config.confluence)?,
            store: BlobStore::new(&config.storage)?,
            qna: QnaClient::new(&config.qna)?,
            batch: config.batch.clone(),
        })
    }

    /// Transform one page into a QnA `add` payload.
    ///
    /// The title becomes the question, the rehosted Markdown body the answer,
    /// and the page id the record id.
    #[instrument(skip(self, title))]
    pub async fn migrate_page(&self, id: &str, title: &str) -> Result<QnaPayload> {
        let page = self.confluence.page(id).await?;
        let html = normalize_storage_markup(&page.body);
        let html = self.rehost_images(id, &html).await?;
        let markdown = qnasync_markdown::convert(&html)?;

        Ok(QnaPayload::add(title, &markdown, id))
    }

    /// Rehost every referenced image into blob storage.
    ///
    /// Images are handled in DOM-discovery order: download the attachment,
    /// upload it under its filename, then rewrite the `src` attribute to a
    /// 24-hour signed read URL. The first failure aborts the page.
    async fn rehost_images(&self, page_id: &str, html: &str) -> Result<String> {
        let sources = image_sources(html);
        let mut out = html.to_string();

        for src in &sources {
            let bytes = self.confluence.attachment(page_id, src).await?;
            self.store.upload(src, bytes).await?;
            let url = self
                .store
                .signed_read_url(src, Duration::hours(IMAGE_URL_TTL_HOURS))?;
            out = replace_image_source(&out, src, &url);
        }

        if !sources.is_empty() {
            info!(page_id, images = sources.len(), "images rehosted");
        }

        Ok(out)
    }

    /// Migrate a single page and submit it. Returns the QnA API status code.
    #[instrument(skip(self, title))]
    pub async fn run_single(&self, id: &str, title: &str) -> Result<u16> {
        let payload = self.migrate_page(id, title).await?;
        let status = self.qna.patch_qnas(std::slice::from_ref(&payload)).await?;

        info!(id, status, "page submitted to knowledge base");
        Ok(status)
    }

    /// Migrate every page in the configured space and submit one combined
    /// batch. With `dry_run`, payloads are built but nothing is submitted.
    #[instrument(skip(self, progress))]
    pub async fn run_batch(
        &self,
        dry_run: bool,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchSummary> {
        let start = Instant::now();

        progress.phase("Listing space pages");
        let discovered = self.confluence.search_space(&self.batch.space_key).await?;
        let discovered_count = discovered.len();

        let pages: Vec<_> = discovered
            .into_iter()
            .filter(|p| !self.batch.excluded_titles.iter().any(|t| t == &p.title))
            .collect();
        let excluded = discovered_count - pages.len();

        info!(
            discovered = discovered_count,
            excluded,
            space = %self.batch.space_key,
            "pages identified for migration"
        );

        progress.phase("Migrating pages");
        let total = pages.len();
        let mut payloads = Vec::with_capacity(total);

        for (i, page) in pages.iter().enumerate() {
            let payload = self.migrate_page(&page.id, &page.title).await?;
            progress.page_migrated(&page.title, i + 1, total);
            payloads.push(payload);
        }

        let status = if dry_run {
            info!(count = payloads.len(), "dry run, skipping submission");
            None
        } else {
            progress.phase("Submitting to knowledge base");
            Some(self.qna.patch_qnas(&payloads).await?)
        };

        let summary = BatchSummary {
            discovered: discovered_count,
            excluded,
            migrated: payloads.len(),
            status,
            elapsed: start.elapsed(),
        };

        progress.done(&summary);

        info!(
            migrated = summary.migrated,
            excluded = summary.excluded,
            status = ?summary.status,
            elapsed_ms = summary.elapsed.as_millis(),
            "batch migration complete"
        );

        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // "storage-account-test-key" in base64
    const TEST_KEY: &str = "c3RvcmFnZS1hY2NvdW50LXRlc3Qta2V5";

    /// Point every endpoint at the same mock server; paths don't collide.
    fn test_config(uri: &str) -> AppConfig {
        AppConfig::from_lookup(|name| {
            let value = match name {
                "CONFLUENCE_TOKEN" => "tok",
                "CONFLUENCE_ENDPOINT" | "AZURE_STORAGE_URL" | "COGNITIVE_ENDPOINT" => uri,
                "BLOB_ACCOUNT_NAME" => "acct",
                "BLOB_CONTAINER_NAME" => "media",
                "STORAGE_ACCOUNT_KEY" => TEST_KEY,
                "COGNITIVE_KEY" => "cog",
                "LANGUAGE_STUDIO_NAME" => "helpdesk",
                "CONFLUENCE_SPACE_KEY" => "GB",
                "EXCLUDED_TITLES" => "Team knowledge base",
                _ => return None,
            };
            Some(value.to_string())
        })
        .expect("test config resolves")
    }

    fn page_body(id: &str, title: &str, storage_value: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": title,
            "body": {"storage": {"value": storage_value, "representation": "storage"}},
            "_links": {"self": format!("https://wiki.example.com/rest/api/content/{id}")}
        })
    }

    async fn mock_page(server: &MockServer, id: &str, title: &str, storage_value: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/rest/api/content/{id}")))
            .and(query_param("expand", "body.storage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(
                id,
                title,
                storage_value,
            )))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn migrate_page_rehosts_every_image_once() {
        let server = MockServer::start().await;

        let body = concat!(
            "<p>Two screenshots:</p>",
            "<ac:image ac:height=\"100\"><ri:attachment ri:filename=\"a.png\" /></ac:image>",
            "<ac:image ac:height=\"100\"><ri:attachment ri:filename=\"b.png\" /></ac:image>",
        );
        mock_page(&server, "77", "Two images", body).await;

        for name in ["a.png", "b.png"] {
            Mock::given(method("GET"))
                .and(path(format!("/download/attachments/77/{name}")))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
                .expect(1)
                .mount(&server)
                .await;

            Mock::given(method("PUT"))
                .and(path(format!("/media/{name}")))
                .respond_with(ResponseTemplate::new(201))
                .expect(1)
                .mount(&server)
                .await;
        }

        let pipeline = Pipeline::from_config(&test_config(&server.uri())).unwrap();
        let payload = pipeline.migrate_page("77", "Two images").await.unwrap();

        assert_eq!(payload.value.id, "77");
        assert_eq!(payload.value.questions, vec!["Two images"]);
        // Both references now point at signed blob URLs.
        let answer = &payload.value.answer;
        assert!(answer.contains(&format!("{}/media/a.png?sv=", server.uri())));
        assert!(answer.contains(&format!("{}/media/b.png?sv=", server.uri())));
        assert!(!answer.contains("](a.png)"));
    }

    #[tokio::test]
    async fn migrate_page_without_images_skips_storage() {
        let server = MockServer::start().await;
        mock_page(&server, "5", "Plain", "<p>Hello</p>").await;

        let pipeline = Pipeline::from_config(&test_config(&server.uri())).unwrap();
        let payload = pipeline.migrate_page("5", "Plain").await.unwrap();

        assert_eq!(payload.value.answer.trim(), "Hello");
        assert_eq!(payload.op, "add");
    }

    #[tokio::test]
    async fn run_single_submits_and_returns_status() {
        let server = MockServer::start().await;
        mock_page(&server, "5", "Plain", "<p>Hello</p>").await;

        Mock::given(method("PATCH"))
            .and(path("/language/query-knowledgebases/projects/helpdesk/qnas"))
            .and(body_partial_json(json!([{"op": "add", "value": {"id": "5"}}])))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let pipeline = Pipeline::from_config(&test_config(&server.uri())).unwrap();
        let status = pipeline.run_single("5", "Plain").await.unwrap();
        assert_eq!(status, 202);
    }

    #[tokio::test]
    async fn run_batch_filters_excluded_titles_and_submits_once() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/content/search"))
            .and(query_param("cql", "(space=GB and type=page)"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": "1", "title": "How to reset your password",
                     "_links": {"self": "https://wiki.example.com/rest/api/content/1"}},
                    {"id": "2", "title": "Team knowledge base",
                     "_links": {"self": "https://wiki.example.com/rest/api/content/2"}},
                    {"id": "3", "title": "How to request VPN access",
                     "_links": {"self": "https://wiki.example.com/rest/api/content/3"}}
                ],
                "size": 3
            })))
            .mount(&server)
            .await;

        mock_page(&server, "1", "How to reset your password", "<p>Reset steps.</p>").await;
        mock_page(&server, "3", "How to request VPN access", "<p>VPN steps.</p>").await;

        Mock::given(method("PATCH"))
            .and(path("/language/query-knowledgebases/projects/helpdesk/qnas"))
            .and(body_partial_json(json!([
                {"op": "add", "value": {"id": "1"}},
                {"op": "add", "value": {"id": "3"}}
            ])))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let pipeline = Pipeline::from_config(&test_config(&server.uri())).unwrap();
        let summary = pipeline.run_batch(false, &SilentProgress).await.unwrap();

        assert_eq!(summary.discovered, 3);
        assert_eq!(summary.excluded, 1);
        assert_eq!(summary.migrated, 2);
        assert_eq!(summary.status, Some(200));
    }

    #[tokio::test]
    async fn run_batch_dry_run_skips_submission() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/content/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": "1", "title": "Only page",
                     "_links": {"self": "https://wiki.example.com/rest/api/content/1"}}
                ],
                "size": 1
            })))
            .mount(&server)
            .await;

        mock_page(&server, "1", "Only page", "<p>Body</p>").await;

        // No PATCH mock mounted: a submission attempt would 404 and fail the
        // assertion below.
        let pipeline = Pipeline::from_config(&test_config(&server.uri())).unwrap();
        let summary = pipeline.run_batch(true, &SilentProgress).await.unwrap();

        assert_eq!(summary.migrated, 1);
        assert_eq!(summary.status, None);
    }

    #[tokio::test]
    async fn run_batch_halts_on_first_page_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/content/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": "1", "title": "Good page",
                     "_links": {"self": "https://wiki.example.com/rest/api/content/1"}},
                    {"id": "2", "title": "Broken page",
                     "_links": {"self": "https://wiki.example.com/rest/api/content/2"}}
                ],
                "size": 2
            })))
            .mount(&server)
            .await;

        mock_page(&server, "1", "Good page", "<p>Fine.</p>").await;
        Mock::given(method("GET"))
            .and(path("/rest/api/content/2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let pipeline = Pipeline::from_config(&test_config(&server.uri())).unwrap();
        let err = pipeline.run_batch(false, &SilentProgress).await.unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
    }
}
