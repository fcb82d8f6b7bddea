//! # Synergy Core
//!
//! Foreground state shared by the highlighting engine and its hosts.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                EditorSession                  │
//! │  ┌────────────────┐     ┌─────────────────┐  │
//! │  │ SharedDocument │     │    EventBus     │──┼──► highlighter
//! │  └───────┬────────┘     └─────────────────┘  │
//! └──────────┼───────────────────────────────────┘
//!            │ Dispatcher::invoke
//!            ▼
//!      background workers
//! ```

pub mod config;
pub mod event;
pub mod session;

pub use config::{
    BracketConfig, Config, ConfigError, HighlightingConfig, RegistryConfig, WorkerConfig,
};
pub use event::{EditorEvent, EventBus, EventHandler};
pub use session::EditorSession;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Buffer error: {0}")]
    Buffer(#[from] synergy_buffer::BufferError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
