//! Rope-backed rich document.
//!
//! ## Why Blocks on Top of a Rope?
//!
//! The rope stores the text; blocks give every line a stable identity. A
//! [`Position`] names a block id plus an offset, so an edit in one block
//! doesn't disturb handles into any other block, while handles into a
//! removed block simply stop resolving.
//!
//! Invariant: `blocks.len() == rope.len_lines()` after every mutation.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use ropey::{Rope, RopeSlice};
use serde::{Deserialize, Serialize};

use crate::position::{BlockId, DocumentId, Position};
use crate::style::{StyleProperty, StyledSpan};
use crate::surface::{ConnectorLine, ContentChange, Rect, TextSurface, TokenRun, Viewport};
use crate::{BufferError, BufferResult};

#[derive(Debug, Clone)]
struct Block {
    id: BlockId,
    spans: Vec<StyledSpan>,
}

/// Monospace layout used to answer geometry queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub char_width: f64,
    pub line_height: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 16.0,
            viewport_width: 800.0,
            viewport_height: 600.0,
        }
    }
}

/// A block-structured document with style spans and a connector overlay.
///
/// # Thread Safety
///
/// `RichDocument` is `Send` but not meant to be shared directly. Wrap it in
/// a [`SharedDocument`](crate::SharedDocument) to hand it to workers.
#[derive(Debug, Clone)]
pub struct RichDocument {
    id: DocumentId,

    /// The rope holding our text content
    rope: Rope,

    /// One entry per rope line
    blocks: Vec<Block>,

    /// Block id -> current line index
    index: HashMap<BlockId, usize>,

    next_block: u64,

    geometry: Geometry,

    scroll_top: f64,

    connectors: Vec<ConnectorLine>,

    /// Whether the document has unsaved changes
    modified: bool,

    /// Associated file path (if any)
    file_path: Option<PathBuf>,
}

impl RichDocument {
    /// Creates a new empty document.
    ///
    /// # Example
    /// ```
    /// use synergy_buffer::RichDocument;
    ///
    /// let doc = RichDocument::new();
    /// assert!(doc.is_empty());
    /// assert_eq!(doc.len_blocks(), 1);
    /// ```
    pub fn new() -> Self {
        Self::with_geometry(Geometry::default())
    }

    /// Creates an empty document with custom layout metrics.
    pub fn with_geometry(geometry: Geometry) -> Self {
        let mut doc = Self {
            id: DocumentId::new(),
            rope: Rope::new(),
            blocks: Vec::new(),
            index: HashMap::new(),
            next_block: 0,
            geometry,
            scroll_top: 0.0,
            connectors: Vec::new(),
            modified: false,
            file_path: None,
        };
        doc.rebuild_blocks();
        doc
    }

    /// Loads a document from a file.
    pub fn from_file(path: impl AsRef<Path>) -> BufferResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let mut doc = Self::from(content.as_str());
        doc.file_path = Some(path.to_path_buf());
        Ok(doc)
    }

    // ==================== Text Access ====================

    /// Returns the entire text content.
    #[inline]
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        self.rope.slice(..).into()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    #[inline]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Number of blocks. An empty document has one empty block.
    #[inline]
    pub fn len_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Text of a block without its line break.
    pub fn block_text(&self, block_idx: usize) -> BufferResult<String> {
        if block_idx >= self.blocks.len() {
            return Err(BufferError::BlockOutOfBounds(block_idx));
        }
        let line = self.rope.line(block_idx);
        Ok(line.slice(..content_len(line)).into())
    }

    pub fn block_id(&self, block_idx: usize) -> Option<BlockId> {
        self.blocks.get(block_idx).map(|b| b.id)
    }

    /// Current line index of a block, if it still exists.
    pub fn block_index(&self, id: BlockId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Document character offset a valid position refers to.
    pub fn offset_of(&self, pos: &Position) -> Option<usize> {
        let (idx, offset) = self.resolve(pos)?;
        Some(self.rope.line_to_char(idx) + offset)
    }

    // ==================== Mutations ====================

    /// Inserts text at a character index.
    ///
    /// The block receiving the text keeps its id; every line break in
    /// `text` creates a fresh block after it.
    pub fn insert(&mut self, char_idx: usize, text: &str) -> BufferResult<ContentChange> {
        if char_idx > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(char_idx));
        }

        let anchor = self.rope.char_to_line(char_idx);
        self.rope.insert(char_idx, text);
        self.resync_blocks(anchor);
        self.modified = true;

        Ok(ContentChange::inserted(char_idx, text.chars().count()))
    }

    /// Deletes text in a character range.
    ///
    /// Blocks merged into the first touched block lose their ids.
    pub fn delete(&mut self, range: Range<usize>) -> BufferResult<ContentChange> {
        if range.end > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(range.end));
        }
        if range.start > range.end {
            return Err(BufferError::InvalidCharIndex(range.start));
        }

        let anchor = self.rope.char_to_line(range.start);
        let removed_length = range.len();
        self.rope.remove(range.clone());
        self.resync_blocks(anchor);
        self.modified = true;

        Ok(ContentChange {
            offset: range.start,
            added_length: 0,
            removed_length,
        })
    }

    /// Replaces the content of one block, keeping its id.
    pub fn replace_block(&mut self, block_idx: usize, text: &str) -> BufferResult<ContentChange> {
        if block_idx >= self.blocks.len() {
            return Err(BufferError::BlockOutOfBounds(block_idx));
        }

        let start = self.rope.line_to_char(block_idx);
        let end = start + content_len(self.rope.line(block_idx));

        let removed = self.delete(start..end)?;
        let inserted = self.insert(start, text)?;

        Ok(ContentChange {
            offset: start,
            added_length: inserted.added_length,
            removed_length: removed.removed_length,
        })
    }

    /// Swaps the whole content. Every previously issued position goes stale.
    pub fn set_text(&mut self, text: &str) -> ContentChange {
        let removed_length = self.len_chars();
        self.rope = Rope::from_str(text);
        self.rebuild_blocks();
        self.connectors.clear();
        self.scroll_top = 0.0;
        self.modified = false;

        ContentChange {
            offset: 0,
            added_length: self.len_chars(),
            removed_length,
        }
    }

    // ==================== View State ====================

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
    }

    /// Scrolls the viewport to a vertical offset.
    pub fn scroll_to(&mut self, top: f64) {
        self.scroll_top = top.max(0.0);
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    /// The connector overlay as last drawn.
    pub fn connectors(&self) -> &[ConnectorLine] {
        &self.connectors
    }

    // ==================== Style Queries ====================

    /// Style spans of a block, in block-relative offsets.
    pub fn block_spans(&self, block_idx: usize) -> &[StyledSpan] {
        self.blocks
            .get(block_idx)
            .map(|b| b.spans.as_slice())
            .unwrap_or(&[])
    }

    /// Every style span, in document character offsets.
    pub fn styled_ranges(&self) -> Vec<(Range<usize>, StyleProperty)> {
        let mut ranges = Vec::new();
        for (idx, block) in self.blocks.iter().enumerate() {
            let base = self.rope.line_to_char(idx);
            for span in &block.spans {
                ranges.push((base + span.start..base + span.end, span.property));
            }
        }
        ranges.sort_by_key(|(range, _)| (range.start, range.end));
        ranges
    }

    /// Properties covering the character at `offset`.
    pub fn styles_at(&self, offset: usize) -> Vec<StyleProperty> {
        self.styled_ranges()
            .into_iter()
            .filter(|(range, _)| range.contains(&offset))
            .map(|(_, property)| property)
            .collect()
    }

    // ==================== State Queries ====================

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn set_file_path(&mut self, path: Option<PathBuf>) {
        self.file_path = path;
    }

    // ==================== Internals ====================

    fn fresh_block(&mut self) -> Block {
        let id = BlockId::from_raw(self.next_block);
        self.next_block += 1;
        Block {
            id,
            spans: Vec::new(),
        }
    }

    fn rebuild_blocks(&mut self) {
        let lines = self.rope.len_lines();
        let blocks: Vec<Block> = (0..lines).map(|_| self.fresh_block()).collect();
        self.blocks = blocks;
        self.reindex();
    }

    /// Brings `blocks` back in line with the rope after an edit anchored at
    /// line `anchor`. Lines appear or vanish right after the anchor.
    fn resync_blocks(&mut self, anchor: usize) {
        let lines = self.rope.len_lines();
        let anchor = anchor.min(self.blocks.len().saturating_sub(1));

        if lines > self.blocks.len() {
            let extra = lines - self.blocks.len();
            let fresh: Vec<Block> = (0..extra).map(|_| self.fresh_block()).collect();
            self.blocks.splice(anchor + 1..anchor + 1, fresh);
        } else if lines < self.blocks.len() {
            let gone = self.blocks.len() - lines;
            let end = (anchor + 1 + gone).min(self.blocks.len());
            self.blocks.drain(anchor + 1..end);
            self.blocks.truncate(lines.max(1));
        }

        if let Some(block) = self.blocks.get_mut(anchor) {
            block.spans.clear();
        }
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .blocks
            .iter()
            .enumerate()
            .map(|(idx, block)| (block.id, idx))
            .collect();
    }

    fn block_len(&self, block_idx: usize) -> usize {
        content_len(self.rope.line(block_idx))
    }

    /// Resolves a position to `(line index, offset)` if it is still live.
    fn resolve(&self, pos: &Position) -> Option<(usize, usize)> {
        if pos.document() != self.id {
            return None;
        }
        let idx = self.block_index(pos.block())?;
        let offset = pos.offset();
        (offset <= self.block_len(idx)).then_some((idx, offset))
    }

    /// Resolves both ends and calls `f` with `(line, from, to)` for every
    /// block slice in `[start, end)`.
    fn for_each_block_slice(
        &mut self,
        start: &Position,
        end: &Position,
        mut f: impl FnMut(&mut Block, usize, usize),
    ) -> BufferResult<()> {
        let (s_idx, s_off) = self.resolve(start).ok_or(BufferError::StalePosition)?;
        let (e_idx, e_off) = self.resolve(end).ok_or(BufferError::StalePosition)?;
        if (s_idx, s_off) > (e_idx, e_off) {
            return Err(BufferError::InvalidRange);
        }

        for idx in s_idx..=e_idx {
            let from = if idx == s_idx { s_off } else { 0 };
            let to = if idx == e_idx { e_off } else { self.block_len(idx) };
            if from < to {
                f(&mut self.blocks[idx], from, to);
            }
        }
        Ok(())
    }
}

/// Removes the parts of matching spans that overlap `[from, to)`.
fn carve(spans: &mut Vec<StyledSpan>, from: usize, to: usize, matches: impl Fn(&StyleProperty) -> bool) {
    let mut kept = Vec::with_capacity(spans.len());
    for span in spans.drain(..) {
        if !matches(&span.property) || span.end <= from || span.start >= to {
            kept.push(span);
            continue;
        }
        if span.start < from {
            kept.push(StyledSpan { end: from, ..span });
        }
        if span.end > to {
            kept.push(StyledSpan { start: to, ..span });
        }
    }
    *spans = kept;
}

/// Length of a rope line without its trailing line break.
fn content_len(line: RopeSlice<'_>) -> usize {
    let len = line.len_chars();
    if len == 0 {
        return 0;
    }
    match line.char(len - 1) {
        '\n' if len >= 2 && line.char(len - 2) == '\r' => len - 2,
        '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}' => len - 1,
        _ => len,
    }
}

impl TextSurface for RichDocument {
    fn document_id(&self) -> DocumentId {
        self.id
    }

    fn compare(&self, a: &Position, b: &Position) -> Option<Ordering> {
        let a = self.resolve(a)?;
        let b = self.resolve(b)?;
        Some(a.cmp(&b))
    }

    fn position_at_offset(&self, offset: usize) -> Option<Position> {
        if offset > self.len_chars() {
            return None;
        }
        let idx = self.rope.char_to_line(offset);
        let column = (offset - self.rope.line_to_char(idx)).min(self.block_len(idx));
        Some(Position::new(self.id, self.blocks[idx].id, column))
    }

    fn content_start(&self) -> Position {
        Position::new(self.id, self.blocks[0].id, 0)
    }

    fn content_end(&self) -> Position {
        let last = self.blocks.len() - 1;
        Position::new(self.id, self.blocks[last].id, self.block_len(last))
    }

    fn block_bounds_at(&self, offset: usize) -> Option<(Position, Position)> {
        if offset > self.len_chars() {
            return None;
        }
        let idx = self.rope.char_to_line(offset);
        let id = self.blocks[idx].id;
        Some((
            Position::new(self.id, id, 0),
            Position::new(self.id, id, self.block_len(idx)),
        ))
    }

    fn is_valid(&self, pos: &Position) -> bool {
        self.resolve(pos).is_some()
    }

    fn block_of(&self, pos: &Position) -> Option<BlockId> {
        self.resolve(pos).map(|_| pos.block())
    }

    fn char_at(&self, pos: &Position) -> Option<char> {
        let (idx, offset) = self.resolve(pos)?;
        (offset < self.block_len(idx)).then(|| self.rope.char(self.rope.line_to_char(idx) + offset))
    }

    fn runs_between(&self, start: &Position, end: &Position) -> Vec<TokenRun> {
        let (Some((s_idx, _)), Some((e_idx, _))) = (self.resolve(start), self.resolve(end)) else {
            return Vec::new();
        };

        (s_idx..=e_idx)
            .filter_map(|idx| {
                let line = self.rope.line(idx);
                let len = content_len(line);
                (len > 0).then(|| {
                    let id = self.blocks[idx].id;
                    TokenRun {
                        block: id,
                        start: Position::new(self.id, id, 0),
                        text: line.slice(..len).into(),
                    }
                })
            })
            .collect()
    }

    fn apply_style(
        &mut self,
        start: &Position,
        end: &Position,
        property: &StyleProperty,
    ) -> BufferResult<()> {
        let property = *property;
        self.for_each_block_slice(start, end, |block, from, to| {
            carve(&mut block.spans, from, to, |p| p.same_kind(&property));
            block.spans.push(StyledSpan {
                start: from,
                end: to,
                property,
            });
        })
    }

    fn clear_styles(&mut self, start: &Position, end: &Position) -> BufferResult<()> {
        self.for_each_block_slice(start, end, |block, from, to| {
            carve(&mut block.spans, from, to, |_| true);
        })
    }

    fn character_rect(&self, pos: &Position) -> Option<Rect> {
        let (idx, offset) = self.resolve(pos)?;
        let g = &self.geometry;
        Some(Rect {
            x: offset as f64 * g.char_width,
            y: idx as f64 * g.line_height - self.scroll_top,
            width: g.char_width,
            height: g.line_height,
        })
    }

    fn viewport(&self) -> Viewport {
        Viewport {
            width: self.geometry.viewport_width,
            height: self.geometry.viewport_height,
        }
    }

    fn replace_connectors(&mut self, lines: Vec<ConnectorLine>) {
        self.connectors = lines;
    }
}

impl Default for RichDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for RichDocument {
    fn from(s: &str) -> Self {
        let mut doc = Self::new();
        doc.set_text(s);
        doc
    }
}

impl From<String> for RichDocument {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}
