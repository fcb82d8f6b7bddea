//! The change-interval queue between the foreground and a worker.

use crossbeam::queue::SegQueue;
use synergy_buffer::Interval;

/// Lock-free FIFO of changed regions.
///
/// Any thread may push; the owning worker is the only consumer.
#[derive(Debug, Default)]
pub struct IntervalQueue {
    inner: SegQueue<Interval>,
}

impl IntervalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, interval: Interval) {
        self.inner.push(interval);
    }

    pub fn pop(&self) -> Option<Interval> {
        self.inner.pop()
    }

    /// Takes everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<Interval> {
        std::iter::from_fn(|| self.inner.pop()).collect()
    }

    /// Discards everything queued so far.
    pub fn clear(&self) {
        while self.inner.pop().is_some() {}
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use synergy_buffer::{RichDocument, TextSurface};

    fn interval(doc: &RichDocument, from: usize, to: usize) -> Interval {
        Interval::new(
            doc.position_at_offset(from).unwrap(),
            doc.position_at_offset(to).unwrap(),
        )
    }

    #[test]
    fn test_fifo_drain() {
        let doc = RichDocument::from("abcdef");
        let queue = IntervalQueue::new();
        let pushed: Vec<_> = (0..3).map(|i| interval(&doc, i * 2, i * 2 + 1)).collect();
        for i in &pushed {
            queue.push(*i);
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.drain(), pushed);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear() {
        let doc = RichDocument::from("ab");
        let queue = IntervalQueue::new();
        queue.push(interval(&doc, 0, 1));
        queue.clear();
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_concurrent_producers() {
        let doc = RichDocument::from("x");
        let queue = Arc::new(IntervalQueue::new());
        let item = interval(&doc, 0, 1);

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        queue.push(item);
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }

        assert_eq!(queue.drain().len(), 1000);
    }
}
