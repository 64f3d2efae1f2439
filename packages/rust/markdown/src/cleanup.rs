//! Post-conversion cleanup for Markdown output.
//!
//! Each pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;

/// Run the cleanup passes on raw Markdown text.
pub(crate) fn run_pipeline(md: &str) -> String {
    let result = collapse_blank_lines(md);
    let result = fix_code_fence_languages(&result);
    ensure_trailing_newline(&result)
}

/// Collapse runs of 2+ blank lines into exactly one.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").to_string()
}

/// Rewrite class-style fence hints (`language-js`, `lang-python`) to plain
/// language names.
fn fix_code_fence_languages(md: &str) -> String {
    static LANG_PREFIX_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^```(?:language-|lang-)(\w+)").expect("valid regex"));

    LANG_PREFIX_RE.replace_all(md, "```$1").to_string()
}

/// Make sure the document ends with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_end_matches('\n');
    format!("{trimmed}\n")
}
