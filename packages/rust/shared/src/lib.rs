//! Shared types, error model, and configuration for qnasync.
//!
//! This crate is the foundation depended on by all other qnasync crates.
//! It provides:
//! - [`QnaSyncError`] — the unified error type
//! - Domain types ([`Page`], [`PageRef`])
//! - Configuration ([`AppConfig`] and its sections, resolved from env)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{AppConfig, BatchConfig, ConfluenceConfig, QnaConfig, StorageConfig};
pub use error::{QnaSyncError, Result};
pub use types::{Page, PageRef};
