//! Keyword highlighting on a background worker.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use synergy_buffer::{Dispatcher, Interval, Position, TextSurface};
use synergy_core::WorkerConfig;

use super::queue::IntervalQueue;
use super::{Job, WorkContext, WorkStatus, Worker, WorkerError, WorkerState};
use crate::language::Language;
use crate::tokenizer::run_matches;

/// Re-tokenizes changed intervals and styles the keywords it finds.
pub struct KeywordJob<D: Dispatcher> {
    dispatcher: D,
    queue: Arc<IntervalQueue>,
    /// Intervals drained but not yet scanned when the last pass yielded
    deferred: Vec<Interval>,
    language: Option<Language>,
}

impl<D: Dispatcher> KeywordJob<D> {
    /// Clears old styles in the interval and offers each token to the
    /// language.
    fn scan(&mut self, interval: &Interval) {
        let runs = self.dispatcher.invoke(|surface| {
            if let Err(e) = surface.clear_styles(&interval.start, &interval.end) {
                tracing::trace!("Cannot clear styles over {}..{}: {}", interval.start, interval.end, e);
            }
            surface.runs_between(&interval.start, &interval.end)
        });

        let Some(language) = self.language.as_mut() else {
            return;
        };
        for run in &runs {
            for candidate in run_matches(run, Some(&*language)) {
                language.try_put(&candidate);
            }
        }
    }
}

impl<D: Dispatcher> Job for KeywordJob<D> {
    type Args = ();

    fn work(&mut self, cx: &WorkContext<'_>) -> WorkStatus {
        let mut intervals = std::mem::take(&mut self.deferred);
        intervals.extend(self.queue.drain());
        if intervals.is_empty() {
            return WorkStatus::Idle;
        }

        let total = intervals.len();
        let mut pending = intervals.into_iter();
        for interval in pending.by_ref() {
            self.scan(&interval);
            if cx.should_yield() {
                break;
            }
        }
        self.deferred.extend(pending);

        let written = match self.language.as_mut() {
            Some(language) => self
                .dispatcher
                .invoke(|surface| language.apply_styling(surface)),
            None => 0,
        };

        tracing::debug!(
            "Keyword pass: {} of {} intervals, {} styles written",
            total - self.deferred.len(),
            total,
            written
        );
        WorkStatus::Busy
    }
}

/// Foreground handle to the keyword highlighting worker.
pub struct KeywordWorker<D: Dispatcher> {
    worker: Worker<KeywordJob<D>>,
    queue: Arc<IntervalQueue>,
    language_name: Mutex<Option<String>>,
}

impl<D: Dispatcher> KeywordWorker<D> {
    pub fn new(dispatcher: D, config: &WorkerConfig) -> Self {
        Self::with_idle_poll(dispatcher, config.idle_poll())
    }

    pub fn with_idle_poll(dispatcher: D, idle_poll: Duration) -> Self {
        let queue = Arc::new(IntervalQueue::new());
        let job = KeywordJob {
            dispatcher,
            queue: Arc::clone(&queue),
            deferred: Vec::new(),
            language: None,
        };
        Self {
            worker: Worker::new("keyword-highlighter", job, idle_poll),
            queue,
            language_name: Mutex::new(None),
        }
    }

    pub fn run(&self) -> Result<(), WorkerError> {
        self.worker.run(())
    }

    /// Queues a changed region for re-highlighting.
    pub fn push_interval(&self, start: Position, end: Position) {
        self.queue.push(Interval::new(start, end));
        self.worker.wake();
    }

    /// Drops every queued interval.
    pub fn clear_intervals(&self) {
        self.queue.clear();
        self.worker.with_job(|job| job.deferred.clear());
    }

    /// Swaps the active language between two work units.
    ///
    /// `None` switches to plain text: intervals still get their styles
    /// cleared but nothing is highlighted.
    pub fn set_language(&self, language: Option<Language>) {
        let was_suspended = self.worker.is_suspend_requested();
        self.worker.suspend_wait();

        let name = language.as_ref().map(|l| l.name().to_string());
        self.worker.with_job(|job| job.language = language);
        tracing::info!("Keyword language set to {}", name.as_deref().unwrap_or("plain text"));
        *self.language_name.lock() = name;

        if !was_suspended {
            self.worker.resume();
        }
    }

    /// Name of the active language, `None` for plain text.
    pub fn current_language_name(&self) -> Option<String> {
        self.language_name.lock().clone()
    }

    /// Queues the whole document.
    pub fn highlight_all(&self, bounds: (Position, Position)) {
        self.push_interval(bounds.0, bounds.1);
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

    /// Aborts and waits for the thread to finish.
    pub fn join(&self) {
        self.worker.join();
    }

    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.worker.wait_idle(timeout)
    }

    pub fn state(&self) -> WorkerState {
        self.worker.state()
    }

    pub fn pending_intervals(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{Group, GroupKind};
    use synergy_buffer::{Brush, Color, FontWeight, RichDocument, SharedDocument, StyleProperty};

    const WAIT: Duration = Duration::from_secs(5);

    fn bold() -> StyleProperty {
        StyleProperty::FontWeight(FontWeight::BOLD)
    }

    fn red() -> StyleProperty {
        StyleProperty::Foreground(Brush::Solid(Color::rgb(255, 0, 0)))
    }

    fn c_like() -> Language {
        Language::new(
            "C",
            vec![".c".to_string()],
            vec![
                Group::new(GroupKind::Special, ["="], vec![red()]),
                Group::new(GroupKind::Normal, ["int", "return"], vec![bold()]),
            ],
        )
    }

    fn setup(text: &str) -> (SharedDocument, KeywordWorker<SharedDocument>) {
        let doc = SharedDocument::new(RichDocument::from(text));
        let worker = KeywordWorker::with_idle_poll(doc.clone(), Duration::from_millis(5));
        worker.run().unwrap();
        (doc, worker)
    }

    fn everything(doc: &SharedDocument) -> (Position, Position) {
        doc.invoke(|d| (d.content_start(), d.content_end()))
    }

    #[test]
    fn test_highlights_keywords() {
        let (doc, worker) = setup("int x=5;\nreturn x;");
        worker.set_language(Some(c_like()));
        assert_eq!(worker.current_language_name().as_deref(), Some("C"));

        worker.highlight_all(everything(&doc));
        assert!(worker.wait_idle(WAIT));

        doc.invoke(|d| {
            assert_eq!(d.styles_at(0), vec![bold()]);
            assert!(d.styles_at(4).is_empty());
            assert_eq!(d.styles_at(5), vec![red()]);
            assert_eq!(d.styles_at(9), vec![bold()]);
        });
    }

    #[test]
    fn test_plain_text_clears_styles() {
        let (doc, worker) = setup("int x;");
        worker.set_language(Some(c_like()));
        worker.highlight_all(everything(&doc));
        assert!(worker.wait_idle(WAIT));

        worker.set_language(None);
        assert_eq!(worker.current_language_name(), None);
        worker.highlight_all(everything(&doc));
        assert!(worker.wait_idle(WAIT));
        assert!(doc.invoke(|d| d.styled_ranges()).is_empty());
    }

    #[test]
    fn test_same_language_twice_is_idempotent() {
        let (doc, worker) = setup("int a = 1;\nreturn a;\n");
        worker.set_language(Some(c_like()));
        worker.highlight_all(everything(&doc));
        assert!(worker.wait_idle(WAIT));
        let first = doc.invoke(|d| d.styled_ranges());

        worker.set_language(Some(c_like()));
        worker.highlight_all(everything(&doc));
        assert!(worker.wait_idle(WAIT));
        let second = doc.invoke(|d| d.styled_ranges());

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_only_changed_block_is_rescanned() {
        let (doc, worker) = setup("int a;\nint b;");
        worker.set_language(Some(c_like()));
        worker.highlight_all(everything(&doc));
        assert!(worker.wait_idle(WAIT));

        let (start, end) = doc.invoke(|d| {
            d.replace_block(1, "return b;").unwrap();
            d.block_bounds_at(7).unwrap()
        });
        worker.push_interval(start, end);
        assert!(worker.wait_idle(WAIT));

        doc.invoke(|d| {
            assert_eq!(d.styles_at(0), vec![bold()]);
            assert_eq!(d.styles_at(7), vec![bold()]);
            assert_eq!(d.styles_at(12), vec![bold()]);
            assert!(d.styles_at(13).is_empty());
        });
    }

    #[test]
    fn test_intervals_pushed_while_suspended_survive() {
        let (doc, worker) = setup("int a;\nint b;\nint c;");
        worker.set_language(Some(c_like()));
        worker.suspend_wait();

        for offset in [0, 7, 14] {
            let (start, end) = doc.invoke(|d| d.block_bounds_at(offset).unwrap());
            worker.push_interval(start, end);
        }
        assert!(!worker.wait_idle(Duration::from_millis(30)));
        assert!(doc.invoke(|d| d.styled_ranges()).is_empty());

        worker.resume();
        assert!(worker.wait_idle(WAIT));
        assert_eq!(doc.invoke(|d| d.styled_ranges()).len(), 3);
        assert_eq!(worker.pending_intervals(), 0);
    }

    #[test]
    fn test_set_language_keeps_caller_suspension() {
        let (_doc, worker) = setup("");
        worker.suspend();
        worker.set_language(Some(c_like()));
        assert_eq!(worker.state(), WorkerState::Suspended);
        worker.resume();
    }

    #[test]
    fn test_clear_intervals() {
        let (doc, worker) = setup("int a;");
        worker.set_language(Some(c_like()));
        worker.suspend_wait();
        worker.highlight_all(everything(&doc));
        worker.clear_intervals();
        worker.resume();

        assert!(worker.wait_idle(WAIT));
        assert!(doc.invoke(|d| d.styled_ranges()).is_empty());
    }
}
