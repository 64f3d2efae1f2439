//! HTML-to-Markdown conversion for rehosted page bodies.
//!
//! Converts normalized HTML to Markdown using the `htmd` crate, then applies
//! a small cleanup pass. Conversion is deterministic and has no side effects;
//! the input is expected to already carry rehosted image URLs.

mod cleanup;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use qnasync_shared::{QnaSyncError, Result};

/// Convert an HTML fragment to clean Markdown.
///
/// Steps:
/// 1. Lift `<table>` elements out behind placeholder tokens (htmd 0.1 drops
///    tables, and Confluence bodies are table-heavy)
/// 2. Convert HTML → Markdown via `htmd`
/// 3. Run the cleanup pass (blank lines, fence languages, trailing newline)
/// 4. Splice the pre-rendered Markdown tables back in
pub fn convert(html: &str) -> Result<String> {
    let (content, tables) = extract_tables(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style"])
        .build();

    let raw = converter
        .convert(&content)
        .map_err(|e| QnaSyncError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw.len(), tables = tables.len(), "htmd conversion complete");

    let mut markdown = cleanup::run_pipeline(&raw);
    for (token, table) in &tables {
        markdown = markdown.replace(token, table);
    }

    Ok(markdown)
}

// ---------------------------------------------------------------------------
// Table handling
// ---------------------------------------------------------------------------

/// Replace each `<table>` with a single-paragraph placeholder token and
/// render the table to Markdown separately.
///
/// Splicing raw Markdown into the HTML would not survive htmd's whitespace
/// collapsing, so tables ride through the conversion as opaque tokens. A
/// table whose serialization can't be located in the source (parser-inserted
/// wrappers) is left in place and dropped by htmd.
fn extract_tables(html: &str) -> (String, Vec<(String, String)>) {
    let doc = Html::parse_fragment(html);
    let table_sel = Selector::parse("table").expect("valid selector");

    if doc.select(&table_sel).next().is_none() {
        return (html.to_string(), Vec::new());
    }

    let mut out = html.to_string();
    let mut tables = Vec::new();

    for (i, table) in doc.select(&table_sel).enumerate() {
        let Some(rendered) = table_to_markdown(&table) else {
            continue;
        };

        let outer = table.html();
        if !out.contains(&outer) {
            continue;
        }

        let token = format!("QNASYNC-TABLE-{i}");
        out = out.replacen(&outer, &format!("<p>{token}</p>"), 1);
        tables.push((token, rendered));
    }

    (out, tables)
}

/// Render one table element as Markdown, or `None` for an empty table.
///
/// The first row doubles as the header row; short rows are padded to the
/// widest row.
fn table_to_markdown(table: &ElementRef) -> Option<String> {
    let row_sel = Selector::parse("tr").expect("valid selector");
    let cell_sel = Selector::parse("th, td").expect("valid selector");

    let rows: Vec<Vec<String>> = table
        .select(&row_sel)
        .map(|tr| {
            tr.select(&cell_sel)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    let width = rows.iter().map(Vec::len).max()?;

    let render_row = |row: &[String]| {
        let mut line = String::from("|");
        for col in 0..width {
            line.push(' ');
            line.push_str(row.get(col).map(String::as_str).unwrap_or(""));
            line.push_str(" |");
        }
        line
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        lines.push(render_row(row));
        if i == 0 {
            lines.push(format!("|{}", " --- |".repeat(width)));
        }
    }

    Some(lines.join("\n"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
