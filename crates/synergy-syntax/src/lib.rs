//! # Synergy Syntax
//!
//! Incremental keyword and bracket-block highlighting on background
//! workers.
//!
//! ## Why Not a Parser?
//!
//! Keywords here are plain tokens split on whitespace and separators and
//! looked up in a per-group lexicon:
//! - **Cheap**: a trie lookup per token, no grammar
//! - **Incremental**: only blocks touched by an edit are re-tokenized
//! - **Configurable**: languages are data files, uploaded at runtime
//!
//! ## Learning: Stale Handles Instead of Indices
//!
//! The workers run on their own threads while the user keeps typing.
//! Everything they remember about the document is a
//! [`Position`](synergy_buffer::Position), and every pass starts by asking
//! the document which of those are still valid. Nothing is shifted by
//! offsets after an edit.
//!
//! ## Module Overview
//!
//! ```text
//! trie ──► language ──► tokenizer ──► worker::keyword ─┐
//! style ─► loader ───► registry                        ├─► highlighter
//!          worker (base, queue) ──► worker::bracket ───┘
//! ```

pub mod highlighter;
pub mod language;
pub mod loader;
pub mod registry;
pub mod style;
pub mod tokenizer;
pub mod trie;
pub mod worker;

pub use highlighter::Highlighter;
pub use language::{Group, GroupKind, Language, Match};
pub use loader::{LanguageDefinition, LanguageLoader};
pub use registry::{LanguageMapping, LanguageRegistry};
pub use style::StyleConverters;
pub use trie::Trie;
pub use worker::{
    Bracket, BracketKind, BracketWorker, IntervalQueue, KeywordWorker, WorkStatus, Worker,
    WorkerError, WorkerState,
};

/// Result type for syntax operations
pub type SyntaxResult<T> = Result<T, SyntaxError>;

/// Errors that can occur while loading languages or running highlighters.
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Config error: {0}")]
    Config(#[from] synergy_core::ConfigError),
}
