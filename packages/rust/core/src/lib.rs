//! Shared migration pipeline: Confluence page → normalized HTML → rehosted
//! images → Markdown → QnA record.
//!
//! Both entry points (the HTTP trigger and the batch CLI) drive the same
//! [`Pipeline`]; they differ only in where the page descriptors come from.

pub mod pipeline;

pub use pipeline::{BatchSummary, Pipeline, ProgressReporter, SilentProgress};
