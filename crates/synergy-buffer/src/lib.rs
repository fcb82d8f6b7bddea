//! # Synergy Buffer
//!
//! The document side of the highlighting engine.
//!
//! ## Key Concepts
//!
//! ### Stale-checked positions
//! - A [`Position`] is a `(document, block, offset)` handle, not an index
//! - Only the issuing [`TextSurface`] can order or validate it
//! - Removing or merging a block silently invalidates handles into it
//!
//! ### One owner, many readers
//! - The document is owned by the foreground
//! - Workers reach it only through a [`Dispatcher`]
//! - [`SharedDocument`] is the in-process dispatcher used by tests and the CLI

mod dispatch;
mod document;
mod position;
mod style;
mod surface;

pub use dispatch::{Dispatcher, SharedDocument};
pub use document::{Geometry, RichDocument};
pub use position::{BlockId, DocumentId, Interval, Position};
pub use style::{Brush, Color, FontWeight, StyleProperty, StyledSpan};
pub use surface::{
    ConnectorLine, ConnectorStroke, ContentChange, Rect, TextSurface, TokenRun, Viewport,
};

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer operations
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("Block {0} is out of bounds")]
    BlockOutOfBounds(usize),

    #[error("Invalid character index: {0}")]
    InvalidCharIndex(usize),

    #[error("Position no longer refers to live content")]
    StalePosition,

    #[error("Range start is after its end")]
    InvalidRange,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_creation() {
        let doc = RichDocument::new();
        assert!(doc.is_empty());
        assert_eq!(doc.len_chars(), 0);
        assert_eq!(doc.len_blocks(), 1);
    }

    #[test]
    fn test_document_from_string() {
        let doc = RichDocument::from("Hello, World!");
        assert_eq!(doc.len_chars(), 13);
        assert_eq!(doc.text(), "Hello, World!");
    }

    #[test]
    fn test_insert_and_delete() {
        let mut doc = RichDocument::new();
        doc.insert(0, "Hello").unwrap();
        assert_eq!(doc.text(), "Hello");

        doc.insert(5, ", World!").unwrap();
        assert_eq!(doc.text(), "Hello, World!");

        doc.delete(5..7).unwrap();
        assert_eq!(doc.text(), "HelloWorld!");
    }

    #[test]
    fn test_out_of_bounds_edits() {
        let mut doc = RichDocument::from("abc");
        assert!(matches!(doc.insert(4, "x"), Err(BufferError::InvalidCharIndex(4))));
        assert!(doc.delete(1..9).is_err());
        assert!(matches!(
            doc.replace_block(3, "x"),
            Err(BufferError::BlockOutOfBounds(3))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = std::env::temp_dir().join(format!("synergy-buffer-{}", DocumentId::new()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sample.txt");
        std::fs::write(&path, "fn main() {\n}\n").unwrap();

        let doc = RichDocument::from_file(&path).unwrap();
        assert_eq!(doc.len_blocks(), 3);
        assert_eq!(doc.file_path(), Some(path.as_path()));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
