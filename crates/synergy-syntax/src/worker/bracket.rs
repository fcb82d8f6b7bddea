//! Bracket-block connector lines.
//!
//! The worker keeps every delimiter it has seen in one list ordered by
//! document position. An edit never shifts that list by index. Instead,
//! each pass first drops the entries whose positions have gone stale, then
//! re-scans only the blocks the edit touched.
//!
//! Drawing pairs the list up with a stack. A pair spanning two or more
//! blocks gets a dashed vertical line from under the opening delimiter
//! down to the closing one:
//!
//! ```text
//! fn main() {
//!           ┆
//! }
//! ```

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use synergy_buffer::{
    BlockId, Brush, ConnectorLine, ConnectorStroke, Dispatcher, Interval, Position, TextSurface,
};
use synergy_core::{BracketConfig, WorkerConfig};

use super::queue::IntervalQueue;
use super::{Job, WorkContext, WorkStatus, Worker, WorkerError, WorkerState};
use crate::SyntaxResult;
use crate::style::parse_brush;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BracketKind {
    Open,
    Close,
}

/// A tracked delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bracket {
    pub position: Position,
    pub kind: BracketKind,
}

/// The delimiter pair a worker tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketPair {
    pub open: char,
    pub close: char,
}

impl BracketPair {
    pub fn kind_of(&self, ch: char) -> Option<BracketKind> {
        if ch == self.open {
            Some(BracketKind::Open)
        } else if ch == self.close {
            Some(BracketKind::Close)
        } else {
            None
        }
    }

    pub fn delimiter(&self, kind: BracketKind) -> char {
        match kind {
            BracketKind::Open => self.open,
            BracketKind::Close => self.close,
        }
    }
}

impl Default for BracketPair {
    fn default() -> Self {
        Self {
            open: '{',
            close: '}',
        }
    }
}

/// Inserts a bracket keeping the list ordered by position.
///
/// Walks the list until the first entry that doesn't precede the new
/// position. Returns `false` (and leaves the list alone) if a bracket is
/// already tracked at that exact position or the position is stale.
pub fn insert_ordered<S: TextSurface + ?Sized>(
    surface: &S,
    brackets: &mut Vec<Bracket>,
    bracket: Bracket,
) -> bool {
    if !surface.is_valid(&bracket.position) {
        return false;
    }
    for (idx, existing) in brackets.iter().enumerate() {
        match surface.compare(&bracket.position, &existing.position) {
            Some(CmpOrdering::Greater) | None => continue,
            Some(CmpOrdering::Equal) => return false,
            Some(CmpOrdering::Less) => {
                brackets.insert(idx, bracket);
                return true;
            }
        }
    }
    brackets.push(bracket);
    true
}

/// Lines for every matched pair spanning more than one block, culled to
/// the viewport. Unmatched closing delimiters are skipped.
pub fn connector_lines<S: TextSurface + ?Sized>(
    surface: &S,
    brackets: &[Bracket],
    stroke: ConnectorStroke,
) -> Vec<ConnectorLine> {
    let viewport = surface.viewport();
    let mut stack: Vec<&Bracket> = Vec::new();
    let mut lines = Vec::new();

    for bracket in brackets {
        if bracket.kind == BracketKind::Open {
            stack.push(bracket);
            continue;
        }
        let Some(open) = stack.pop() else {
            continue;
        };

        let (Some(open_block), Some(close_block)) = (
            surface.block_of(&open.position),
            surface.block_of(&bracket.position),
        ) else {
            continue;
        };
        if open_block == close_block {
            continue;
        }

        let (Some(from), Some(to)) = (
            surface.character_rect(&open.position),
            surface.character_rect(&bracket.position),
        ) else {
            continue;
        };
        if to.y < 0.0 || from.y > viewport.height {
            continue;
        }

        lines.push(ConnectorLine {
            left: from.x + from.width / 2.0,
            top: from.bottom(),
            height: to.y - from.bottom(),
            stroke,
        });
    }
    lines
}

/// Tracks delimiters in changed intervals and redraws connector lines.
pub struct BracketJob<D: Dispatcher> {
    dispatcher: D,
    queue: Arc<IntervalQueue>,
    scrolled: Arc<AtomicBool>,
    deferred: Vec<Interval>,
    brackets: Vec<Bracket>,
    /// Blocks that have contributed at least one tracked bracket
    known_blocks: HashSet<BlockId>,
    pair: BracketPair,
    stroke: ConnectorStroke,
    redraw_pending: bool,
}

impl<D: Dispatcher> BracketJob<D> {
    fn update(&mut self, interval: &Interval) {
        let pair = self.pair;
        let brackets = &mut self.brackets;
        let known = &mut self.known_blocks;

        self.dispatcher.invoke(|surface| {
            invalidate(&*surface, brackets, known, pair);

            let Some((start, end)) = scan_bounds(&*surface, interval) else {
                return;
            };
            let runs = surface.runs_between(&start, &end);
            // Only blocks that get rescanned and held brackets are reset.
            let touched: HashSet<BlockId> = runs
                .iter()
                .map(|run| run.block)
                .filter(|block| known.contains(block))
                .collect();
            if !touched.is_empty() {
                brackets.retain(|b| !touched.contains(&b.position.block()));
                known.retain(|block| !touched.contains(block));
            }

            for run in &runs {
                for (idx, ch) in run.text.chars().enumerate() {
                    let Some(kind) = pair.kind_of(ch) else {
                        continue;
                    };
                    let bracket = Bracket {
                        position: run.position_at(idx),
                        kind,
                    };
                    if insert_ordered(&*surface, brackets, bracket) {
                        known.insert(run.block);
                    }
                }
            }
        });
    }

    fn redraw(&mut self) {
        let brackets = &self.brackets;
        let stroke = self.stroke;
        let drawn = self.dispatcher.invoke(|surface| {
            let lines = connector_lines(&*surface, brackets, stroke);
            let drawn = lines.len();
            surface.replace_connectors(lines);
            drawn
        });
        tracing::debug!(
            "Bracket redraw: {} brackets, {} lines",
            self.brackets.len(),
            drawn
        );
    }
}

/// Resolves the part of `interval` that can still be scanned.
///
/// A stale start shrinks the scan to the block of a live end. A stale end
/// leaves nothing to scan; the edit that removed it queued its own interval.
fn scan_bounds<S: TextSurface + ?Sized>(
    surface: &S,
    interval: &Interval,
) -> Option<(Position, Position)> {
    match (surface.is_valid(&interval.start), surface.is_valid(&interval.end)) {
        (true, true) => Some((interval.start, interval.end)),
        (false, true) => Some((interval.end.block_start(), interval.end)),
        _ => None,
    }
}

/// Drops brackets whose position went stale or no longer holds the
/// expected delimiter, and forgets blocks left without brackets.
fn invalidate<S: TextSurface + ?Sized>(
    surface: &S,
    brackets: &mut Vec<Bracket>,
    known: &mut HashSet<BlockId>,
    pair: BracketPair,
) {
    brackets.retain(|b| {
        surface.is_valid(&b.position) && surface.char_at(&b.position) == Some(pair.delimiter(b.kind))
    });
    let live: HashSet<BlockId> = brackets.iter().map(|b| b.position.block()).collect();
    known.retain(|block| live.contains(block));
}

impl<D: Dispatcher> Job for BracketJob<D> {
    type Args = ();

    fn work(&mut self, cx: &WorkContext<'_>) -> WorkStatus {
        let mut intervals = std::mem::take(&mut self.deferred);
        intervals.extend(self.queue.drain());
        let scrolled = self.scrolled.swap(false, Ordering::AcqRel);

        if intervals.is_empty() && !scrolled && !self.redraw_pending {
            return WorkStatus::Idle;
        }

        let mut pending = intervals.into_iter();
        for interval in pending.by_ref() {
            self.update(&interval);
            if cx.should_yield() {
                break;
            }
        }
        self.deferred.extend(pending);

        self.redraw();
        self.redraw_pending = false;
        WorkStatus::Busy
    }
}

/// Foreground handle to the bracket highlighting worker.
pub struct BracketWorker<D: Dispatcher> {
    worker: Worker<BracketJob<D>>,
    queue: Arc<IntervalQueue>,
    scrolled: Arc<AtomicBool>,
}

impl<D: Dispatcher> BracketWorker<D> {
    /// Creates the worker. Fails if the configured stroke descriptor is
    /// malformed.
    pub fn new(dispatcher: D, brackets: &BracketConfig, workers: &WorkerConfig) -> SyntaxResult<Self> {
        let color = match parse_brush(&brackets.stroke)? {
            Brush::Solid(color) => color,
            Brush::LinearGradient { from, .. } => from,
        };
        let stroke = ConnectorStroke {
            color,
            dash: brackets.dash,
        };
        let pair = BracketPair {
            open: brackets.open,
            close: brackets.close,
        };
        Ok(Self::with_settings(dispatcher, pair, stroke, workers.idle_poll()))
    }

    pub fn with_settings(
        dispatcher: D,
        pair: BracketPair,
        stroke: ConnectorStroke,
        idle_poll: Duration,
    ) -> Self {
        let queue = Arc::new(IntervalQueue::new());
        let scrolled = Arc::new(AtomicBool::new(false));
        let job = BracketJob {
            dispatcher,
            queue: Arc::clone(&queue),
            scrolled: Arc::clone(&scrolled),
            deferred: Vec::new(),
            brackets: Vec::new(),
            known_blocks: HashSet::new(),
            pair,
            stroke,
            redraw_pending: false,
        };
        Self {
            worker: Worker::new("bracket-highlighter", job, idle_poll),
            queue,
            scrolled,
        }
    }

    pub fn run(&self) -> Result<(), WorkerError> {
        self.worker.run(())
    }

    pub fn push_interval(&self, start: Position, end: Position) {
        self.queue.push(Interval::new(start, end));
        self.worker.wake();
    }

    pub fn clear_intervals(&self) {
        self.queue.clear();
        self.worker.with_job(|job| job.deferred.clear());
    }

    /// Forgets every tracked bracket; the next cycle redraws an empty
    /// overlay.
    pub fn clear_bracket_list(&self) {
        self.worker.with_job(|job| {
            job.brackets.clear();
            job.known_blocks.clear();
            job.redraw_pending = true;
        });
        self.worker.wake();
    }

    /// Forces a redraw without re-scanning. Safe to call from any thread.
    pub fn notify_scrolled(&self) {
        self.scrolled.store(true, Ordering::Release);
        self.worker.wake();
    }

    /// Snapshot of the tracked brackets, in position order.
    pub fn brackets(&self) -> Vec<Bracket> {
        self.worker.with_job(|job| job.brackets.clone())
    }

    pub fn known_block_count(&self) -> usize {
        self.worker.with_job(|job| job.known_blocks.len())
    }

    pub fn suspend(&self) {
        self.worker.suspend();
    }

    pub fn resume(&self) {
        self.worker.resume();
    }

    pub fn suspend_wait(&self) {
        self.worker.suspend_wait();
    }

    pub fn abort(&self) {
        self.worker.abort();
    }

    pub fn join(&self) {
        self.worker.join();
    }

    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.worker.wait_idle(timeout)
    }

    pub fn state(&self) -> WorkerState {
        self.worker.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synergy_buffer::{RichDocument, SharedDocument};

    const WAIT: Duration = Duration::from_secs(5);

    fn setup(text: &str) -> (SharedDocument, BracketWorker<SharedDocument>) {
        let doc = SharedDocument::new(RichDocument::from(text));
        let worker = BracketWorker::with_settings(
            doc.clone(),
            BracketPair::default(),
            ConnectorStroke::default(),
            Duration::from_millis(5),
        );
        worker.run().unwrap();
        (doc, worker)
    }

    fn scan_all(doc: &SharedDocument, worker: &BracketWorker<SharedDocument>) {
        let (start, end) = doc.invoke(|d| (d.content_start(), d.content_end()));
        worker.push_interval(start, end);
        assert!(worker.wait_idle(WAIT));
    }

    fn connectors(doc: &SharedDocument) -> Vec<ConnectorLine> {
        doc.invoke(|d| d.connectors().to_vec())
    }

    #[test]
    fn test_nested_pairs_across_lines() {
        let (doc, worker) = setup("{a{\nb}c}");
        scan_all(&doc, &worker);

        assert_eq!(worker.brackets().len(), 4);
        let lines = connectors(&doc);
        assert_eq!(lines.len(), 2);

        // Inner pair closes first.
        assert_eq!(lines[0].left, 2.0 * 8.0 + 4.0);
        assert_eq!(lines[1].left, 4.0);
        assert_eq!(lines[0].top, 16.0);
        assert_eq!(lines[0].height, 0.0);
    }

    #[test]
    fn test_same_line_pairs_draw_nothing() {
        let (doc, worker) = setup("{a{b}c}");
        scan_all(&doc, &worker);
        assert_eq!(worker.brackets().len(), 4);
        assert!(connectors(&doc).is_empty());
    }

    #[test]
    fn test_line_geometry() {
        let (doc, worker) = setup("fn x() {\n  a\n  b\n}");
        scan_all(&doc, &worker);

        let lines = connectors(&doc);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].left, 7.0 * 8.0 + 4.0);
        assert_eq!(lines[0].top, 16.0);
        assert_eq!(lines[0].height, 3.0 * 16.0 - 16.0);
        assert_eq!(lines[0].stroke.dash, [4.0, 3.0]);
    }

    #[test]
    fn test_unmatched_close_is_skipped() {
        let (doc, worker) = setup("}\n{\n}");
        scan_all(&doc, &worker);
        assert_eq!(connectors(&doc).len(), 1);
    }

    #[test]
    fn test_replacing_block_invalidates_only_its_brackets() {
        let (doc, worker) = setup("{\n{ }\n}");
        scan_all(&doc, &worker);
        assert_eq!(worker.brackets().len(), 4);
        assert_eq!(worker.known_block_count(), 3);

        let (start, end) = doc.invoke(|d| {
            d.replace_block(1, "x").unwrap();
            d.block_bounds_at(2).unwrap()
        });
        worker.push_interval(start, end);
        assert!(worker.wait_idle(WAIT));

        let remaining = worker.brackets();
        assert_eq!(remaining.len(), 2);
        assert_eq!(worker.known_block_count(), 2);
        doc.invoke(|d| {
            assert_eq!(d.offset_of(&remaining[0].position), Some(0));
            assert_eq!(d.offset_of(&remaining[1].position), Some(4));
        });
        assert_eq!(connectors(&doc).len(), 1);
    }

    #[test]
    fn test_removed_block_brackets_dropped_lazily() {
        let (doc, worker) = setup("{\n}\nx {\ny }");
        scan_all(&doc, &worker);
        assert_eq!(connectors(&doc).len(), 2);

        // Delete the first two lines; report an interval elsewhere.
        let (start, end) = doc.invoke(|d| {
            d.delete(0..4).unwrap();
            d.block_bounds_at(0).unwrap()
        });
        worker.push_interval(start, end);
        assert!(worker.wait_idle(WAIT));

        assert_eq!(worker.brackets().len(), 2);
        assert_eq!(connectors(&doc).len(), 1);
    }

    #[test]
    fn test_stale_interval_start_keeps_live_end_block() {
        let (doc, worker) = setup("x\ny\nz {\n}");
        scan_all(&doc, &worker);
        assert_eq!(worker.brackets().len(), 2);

        worker.suspend_wait();
        let (start, end) = doc.invoke(|d| {
            let (start, _) = d.block_bounds_at(2).unwrap();
            let (_, end) = d.block_bounds_at(4).unwrap();
            (start, end)
        });
        worker.push_interval(start, end);

        // Merge "y" into "x": the queued start goes stale, "z {" stays live.
        let (merged_start, merged_end) = doc.invoke(|d| {
            d.delete(1..2).unwrap();
            d.block_bounds_at(0).unwrap()
        });
        worker.push_interval(merged_start, merged_end);
        worker.resume();
        assert!(worker.wait_idle(WAIT));

        assert_eq!(doc.invoke(|d| d.text().to_string()), "xy\nz {\n}");
        assert_eq!(worker.brackets().len(), 2);
        assert_eq!(connectors(&doc).len(), 1);
    }

    #[test]
    fn test_bracket_free_block_edit_keeps_list() {
        let (doc, worker) = setup("{\nplain\n}");
        scan_all(&doc, &worker);
        let before = worker.brackets();
        assert_eq!(worker.known_block_count(), 2);

        let (start, end) = doc.invoke(|d| {
            d.insert(3, "er").unwrap();
            d.block_bounds_at(3).unwrap()
        });
        worker.push_interval(start, end);
        assert!(worker.wait_idle(WAIT));

        assert_eq!(worker.brackets(), before);
        assert_eq!(worker.known_block_count(), 2);
        assert_eq!(connectors(&doc).len(), 1);
    }

    #[test]
    fn test_scan_bounds_resolution() {
        let mut doc = RichDocument::from("a\nb\nc {\n}");
        let (start, _) = doc.block_bounds_at(2).unwrap();
        let (_, end) = doc.block_bounds_at(4).unwrap();
        let interval = Interval::new(start, end);
        assert_eq!(scan_bounds(&doc, &interval), Some((start, end)));

        doc.delete(1..2).unwrap();
        let (bounds_start, bounds_end) = scan_bounds(&doc, &interval).unwrap();
        assert_eq!(bounds_end, end);
        assert_eq!(doc.offset_of(&bounds_start), Some(3));

        let stale_end = Interval::new(doc.content_start(), end);
        doc.delete(2..6).unwrap();
        assert_eq!(doc.text(), "ab\n}");
        assert_eq!(scan_bounds(&doc, &stale_end), None);
    }

    #[test]
    fn test_equal_positions_not_inserted_twice() {
        let (doc, worker) = setup("{\n}");
        scan_all(&doc, &worker);
        scan_all(&doc, &worker);
        assert_eq!(worker.brackets().len(), 2);

        doc.invoke(|d| {
            let mut list = Vec::new();
            let pos = d.position_at_offset(0).unwrap();
            let open = Bracket {
                position: pos,
                kind: BracketKind::Open,
            };
            assert!(insert_ordered(&*d, &mut list, open));
            assert!(!insert_ordered(&*d, &mut list, open));
        });
    }

    #[test]
    fn test_insert_ordered_out_of_order_input() {
        let doc = RichDocument::from("{a}\n{b}");
        let mut list = Vec::new();
        for offset in [6, 0, 4, 2] {
            let ch = doc.char_at(&doc.position_at_offset(offset).unwrap()).unwrap();
            let kind = BracketPair::default().kind_of(ch).unwrap();
            let bracket = Bracket {
                position: doc.position_at_offset(offset).unwrap(),
                kind,
            };
            assert!(insert_ordered(&doc, &mut list, bracket));
        }
        let offsets: Vec<_> = list.iter().map(|b| doc.offset_of(&b.position).unwrap()).collect();
        assert_eq!(offsets, vec![0, 2, 4, 6]);
    }

    #[test]
    fn test_offscreen_pairs_are_culled() {
        let mut text = String::from("{\n}\n");
        text.push_str(&"\n".repeat(60));
        text.push_str("{\n}");
        let (doc, worker) = setup(&text);
        scan_all(&doc, &worker);
        assert_eq!(connectors(&doc).len(), 1);

        doc.invoke(|d| d.scroll_to(62.0 * 16.0 - 100.0));
        worker.notify_scrolled();
        assert!(worker.wait_idle(WAIT));

        let lines = connectors(&doc);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].top, 116.0);
    }

    #[test]
    fn test_clear_bracket_list() {
        let (doc, worker) = setup("{\n}");
        scan_all(&doc, &worker);
        assert_eq!(connectors(&doc).len(), 1);

        worker.clear_bracket_list();
        assert!(worker.wait_idle(WAIT));
        assert!(worker.brackets().is_empty());
        assert!(connectors(&doc).is_empty());
    }

    #[test]
    fn test_custom_pair() {
        let doc = SharedDocument::new(RichDocument::from("(\n)"));
        let config = BracketConfig {
            open: '(',
            close: ')',
            ..BracketConfig::default()
        };
        let worker = BracketWorker::new(doc.clone(), &config, &WorkerConfig::default()).unwrap();
        worker.run().unwrap();
        scan_all(&doc, &worker);
        assert_eq!(connectors(&doc).len(), 1);
    }

    #[test]
    fn test_bad_stroke_rejected() {
        let config = BracketConfig {
            stroke: "grey".to_string(),
            ..BracketConfig::default()
        };
        let result = BracketWorker::new(SharedDocument::default(), &config, &WorkerConfig::default());
        assert!(result.is_err());
    }
}
