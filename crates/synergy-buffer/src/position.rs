//! Identity and position handles for the document surface.
//!
//! ## Stale Handles
//!
//! A `Position` is not an index into a vector. It names a block by its
//! stable id plus an offset inside that block, and only the surface that
//! issued it can say whether it still points at live content and how it
//! orders against another position. Edits to *other* blocks leave it
//! untouched; edits that remove or rewrite its block make it stale.
//!
//! That is why `Position` deliberately does not implement `Ord`: ordering
//! is a question for the document, asked through
//! [`TextSurface::compare`](crate::TextSurface::compare).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Creates a new unique document ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a structural block (a paragraph).
///
/// Ids are never reused within a document, so a dropped block can't be
/// confused with one created later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(u64);

impl BlockId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An opaque, time-variant handle into document content.
///
/// Equality is structural. Ordering and validity are only meaningful while
/// the issuing surface still considers the handle valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    document: DocumentId,
    block: BlockId,
    offset: usize,
}

impl Position {
    pub(crate) fn new(document: DocumentId, block: BlockId, offset: usize) -> Self {
        Self {
            document,
            block,
            offset,
        }
    }

    /// The document this handle was issued by.
    pub fn document(&self) -> DocumentId {
        self.document
    }

    /// The block this handle was issued into.
    pub fn block(&self) -> BlockId {
        self.block
    }

    /// Returns a handle to the first character of the same block.
    pub fn block_start(&self) -> Self {
        Self { offset: 0, ..*self }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    /// Returns a handle `chars` characters further into the same block.
    ///
    /// No validation happens here; the result may well be stale.
    pub(crate) fn advanced(&self, chars: usize) -> Self {
        Self {
            offset: self.offset + chars,
            ..*self
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{}", self.block, self.offset)
    }
}

/// A changed region between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: Position,
    pub end: Position,
}

impl Interval {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_ids_are_unique() {
        assert_ne!(DocumentId::new(), DocumentId::new());
    }

    #[test]
    fn test_advanced_stays_in_block() {
        let doc = DocumentId::new();
        let pos = Position::new(doc, BlockId::from_raw(3), 2);
        let next = pos.advanced(5);

        assert_eq!(next.block(), pos.block());
        assert_eq!(next.document(), doc);
        assert_eq!(next.offset(), 7);
    }

    #[test]
    fn test_display() {
        let pos = Position::new(DocumentId::new(), BlockId::from_raw(4), 1);
        assert_eq!(pos.to_string(), "#4+1");
    }
}
