//! The document surface consumed by the highlighting workers.
//!
//! Everything a worker needs from an editing surface goes through
//! [`TextSurface`]. Workers never hold the surface themselves; they reach it
//! through a [`Dispatcher`](crate::Dispatcher), which runs each access on
//! behalf of the document owner.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::style::{Color, StyleProperty};
use crate::{BlockId, BufferResult, DocumentId, Position};

/// A maximal span of contiguous plain text inside one block.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRun {
    pub block: BlockId,
    /// Position of the run's first character.
    pub start: Position,
    /// Literal text of the run.
    pub text: String,
}

impl TokenRun {
    /// Position of the `char_idx`-th character of the run.
    ///
    /// `char_idx == text.chars().count()` gives the run's end.
    pub fn position_at(&self, char_idx: usize) -> Position {
        self.start.advanced(char_idx)
    }
}

/// Axis-aligned rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// The visible part of the document.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Stroke used for bracket connector lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectorStroke {
    pub color: Color,
    /// Dash and gap lengths.
    pub dash: [f64; 2],
}

impl Default for ConnectorStroke {
    fn default() -> Self {
        Self {
            color: Color::LIGHT_GRAY,
            dash: [4.0, 3.0],
        }
    }
}

/// A vertical line joining a matched bracket pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectorLine {
    pub left: f64,
    pub top: f64,
    pub height: f64,
    pub stroke: ConnectorStroke,
}

/// One content delta reported by the document owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentChange {
    /// Character offset where the change starts.
    pub offset: usize,
    /// Characters inserted at `offset`.
    pub added_length: usize,
    /// Characters removed at `offset`.
    pub removed_length: usize,
}

impl ContentChange {
    pub fn inserted(offset: usize, added_length: usize) -> Self {
        Self {
            offset,
            added_length,
            removed_length: 0,
        }
    }

    /// Offset one past the inserted text.
    pub fn end(&self) -> usize {
        self.offset + self.added_length
    }
}

/// What the highlighting engine needs from a document.
pub trait TextSurface {
    fn document_id(&self) -> DocumentId;

    /// Orders two positions. `None` if either is stale.
    fn compare(&self, a: &Position, b: &Position) -> Option<Ordering>;

    /// Materializes a position from a document character offset.
    fn position_at_offset(&self, offset: usize) -> Option<Position>;

    fn content_start(&self) -> Position;

    fn content_end(&self) -> Position;

    /// Content start and end of the block containing `offset`.
    fn block_bounds_at(&self, offset: usize) -> Option<(Position, Position)>;

    fn is_valid(&self, pos: &Position) -> bool;

    /// The block a valid position lives in.
    fn block_of(&self, pos: &Position) -> Option<BlockId>;

    /// Reads the character right after `pos`.
    fn char_at(&self, pos: &Position) -> Option<char>;

    /// Non-empty token runs of every block intersecting `[start, end]`.
    fn runs_between(&self, start: &Position, end: &Position) -> Vec<TokenRun>;

    /// Applies one attribute over `[start, end)`.
    fn apply_style(
        &mut self,
        start: &Position,
        end: &Position,
        property: &StyleProperty,
    ) -> BufferResult<()>;

    /// Drops every attribute over `[start, end)`.
    fn clear_styles(&mut self, start: &Position, end: &Position) -> BufferResult<()>;

    /// Geometry of the character cell right after `pos`.
    fn character_rect(&self, pos: &Position) -> Option<Rect>;

    fn viewport(&self) -> Viewport;

    /// Replaces the whole connector overlay.
    fn replace_connectors(&mut self, lines: Vec<ConnectorLine>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_end() {
        let change = ContentChange::inserted(10, 4);
        assert_eq!(change.end(), 14);
        assert_eq!(change.removed_length, 0);
    }

    #[test]
    fn test_rect_bottom() {
        let rect = Rect {
            x: 0.0,
            y: 16.0,
            width: 8.0,
            height: 16.0,
        };
        assert_eq!(rect.bottom(), 32.0);
    }
}
