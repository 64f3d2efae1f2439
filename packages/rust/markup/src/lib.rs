//! Confluence storage-markup normalization and image-reference rewriting.
//!
//! Storage format wraps embedded images in a proprietary container:
//!
//! ```html
//! <ac:image ac:height="250"><ri:attachment ri:filename="shot.png" /></ac:image>
//! ```
//!
//! [`normalize_storage_markup`] turns that into a plain `<img src="shot.png" />`
//! so the rest of the pipeline can treat the body as standard HTML. The
//! companion helpers find `<img>` sources in DOM order and rewrite a single
//! `src` attribute value once its blob has been rehosted.
//!
//! Everything here is pure string work: no network, no errors. Markup that
//! doesn't match the expected shape passes through untouched.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

/// Opening image wrapper tag, with or without the height attribute.
static AC_IMAGE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<ac:image(?: ac:height="[0-9]+")?>"#).expect("valid regex"));

/// Convert storage-format image markup into standard HTML.
///
/// Drops the `<ac:image>` wrapper (opening and closing tags) and renames the
/// attachment reference so `<ri:attachment ri:filename="...">` becomes
/// `<img src="...">`. All other markup is left as-is.
pub fn normalize_storage_markup(markup: &str) -> String {
    let out = markup.replace("</ac:image>", "");
    let out = AC_IMAGE_OPEN_RE.replace_all(&out, "");
    let out = out.replace("ri:attachment", "img");
    out.replace("ri:filename", "src")
}

/// Collect every `<img src>` value in DOM-discovery order.
///
/// Duplicate sources are reported once (first occurrence wins) so a page that
/// embeds the same screenshot twice is fetched and uploaded once.
pub fn image_sources(html: &str) -> Vec<String> {
    let doc = Html::parse_fragment(html);
    let img_sel = Selector::parse("img").expect("valid selector");

    let mut seen: Vec<String> = Vec::new();
    for img in doc.select(&img_sel) {
        if let Some(src) = img.value().attr("src") {
            if !src.is_empty() && !seen.iter().any(|s| s == src) {
                seen.push(src.to_string());
            }
        }
    }

    debug!(count = seen.len(), "image sources collected");
    seen
}

/// Rewrite `src="from"` attribute values to `src="to"`.
///
/// Replacement is scoped to the attribute so a filename that also appears in
/// the page text (say, a paragraph mentioning `shot.png`) is left alone.
pub fn replace_image_source(html: &str, from: &str, to: &str) -> String {
    let out = html.replace(
        &format!("src=\"{from}\""),
        &format!("src=\"{to}\""),
    );
    out.replace(&format!("src='{from}'"), &format!("src='{to}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORAGE_BODY: &str = concat!(
        "<p>Open the portal.</p>",
        "<ac:image ac:height=\"250\"><ri:attachment ri:filename=\"login.png\" /></ac:image>",
        "<p>Then click reset.</p>",
    );

    #[test]
    fn normalizes_image_wrapper() {
        let html = normalize_storage_markup(STORAGE_BODY);

        assert!(html.contains("<img src=\"login.png\" />"));
        assert!(!html.contains("ac:image"));
        assert!(!html.contains("ri:attachment"));
        assert!(!html.contains("ri:filename"));
        // Surrounding markup untouched
        assert!(html.contains("<p>Open the portal.</p>"));
    }

    #[test]
    fn normalizes_wrapper_without_height() {
        let markup = "<ac:image><ri:attachment ri:filename=\"a.png\" /></ac:image>";
        let html = normalize_storage_markup(markup);
        assert_eq!(html, "<img src=\"a.png\" />");
    }

    #[test]
    fn normalizes_multiple_images() {
        let markup = concat!(
            "<ac:image ac:height=\"100\"><ri:attachment ri:filename=\"a.png\" /></ac:image>",
            "<ac:image ac:height=\"200\"><ri:attachment ri:filename=\"b.png\" /></ac:image>",
        );
        let html = normalize_storage_markup(markup);
        assert_eq!(html, "<img src=\"a.png\" /><img src=\"b.png\" />");
    }

    #[test]
    fn plain_html_passes_through() {
        let markup = "<p>No images here, just <strong>text</strong>.</p>";
        assert_eq!(normalize_storage_markup(markup), markup);
    }

    #[test]
    fn malformed_markup_passes_through() {
        // Unclosed wrapper with an unexpected attribute shape: the regex does
        // not match, so the tag survives rather than erroring.
        let markup = "<ac:image ac:width=\"50\"><ri:attachment ri:filename=\"x.png\" />";
        let html = normalize_storage_markup(markup);
        assert!(html.contains("<img src=\"x.png\" />"));
        assert!(html.contains("<ac:image ac:width=\"50\">"));
    }

    #[test]
    fn image_sources_in_dom_order() {
        let html = r#"<p><img src="a.png" /></p><div><img src="b.png" /></div>"#;
        assert_eq!(image_sources(html), vec!["a.png", "b.png"]);
    }

    #[test]
    fn image_sources_dedup_first_occurrence() {
        let html = r#"<img src="a.png" /><img src="b.png" /><img src="a.png" />"#;
        assert_eq!(image_sources(html), vec!["a.png", "b.png"]);
    }

    #[test]
    fn image_sources_empty_when_no_images() {
        assert!(image_sources("<p>text only</p>").is_empty());
    }

    #[test]
    fn replace_rewrites_attribute_only() {
        let html = r#"<p>See a.png below.</p><img src="a.png" />"#;
        let out = replace_image_source(html, "a.png", "https://blobs.example.com/a.png?sig=x");

        assert!(out.contains("src=\"https://blobs.example.com/a.png?sig=x\""));
        // The prose mention of the filename is not rewritten.
        assert!(out.contains("See a.png below."));
    }

    #[test]
    fn replace_handles_single_quotes() {
        let html = "<img src='a.png' />";
        let out = replace_image_source(html, "a.png", "signed");
        assert_eq!(out, "<img src='signed' />");
    }

    #[test]
    fn normalize_then_scan_round_trip() {
        let html = normalize_storage_markup(STORAGE_BODY);
        assert_eq!(image_sources(&html), vec!["login.png"]);
    }
}
