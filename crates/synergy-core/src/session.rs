//! The foreground document owner.
//!
//! `EditorSession` acts as a facade over the shared document and the event
//! bus: every mutation goes through it, and every mutation that matters to
//! highlighting is announced on the bus.

use std::ops::Range;
use std::path::{Path, PathBuf};

use synergy_buffer::{ContentChange, Dispatcher, RichDocument, SharedDocument};
use tokio::sync::broadcast;

use crate::config::Config;
use crate::event::{EditorEvent, EventBus};
use crate::{CoreError, CoreResult};

/// Owns the document and announces what happens to it.
///
/// ## Thread Safety
///
/// `EditorSession` is owned by a single (foreground) thread. Workers get a
/// clone of the [`SharedDocument`] and never mutate content.
pub struct EditorSession {
    document: SharedDocument,

    event_bus: EventBus,

    config: Config,

    /// File backing the document, if any
    path: Option<PathBuf>,
}

impl EditorSession {
    /// Creates a session over an empty document.
    pub fn new(config: Config) -> Self {
        let document = SharedDocument::new(RichDocument::with_geometry(config.view));
        Self {
            document,
            event_bus: EventBus::new(),
            config,
            path: None,
        }
    }

    /// The dispatcher workers should use.
    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribes to editor events.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.event_bus.subscribe()
    }

    /// Emits an event.
    pub fn emit(&self, event: EditorEvent) {
        self.event_bus.emit(event);
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn text(&self) -> String {
        self.document.invoke(|doc| doc.text().to_string())
    }

    // ==================== Document Operations ====================

    /// Loads a file into the document.
    ///
    /// Emits `FileOpened` only: opening replaces content wholesale, so no
    /// content deltas are reported.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> CoreResult<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let owned = path.to_path_buf();
        self.document.invoke(|doc| {
            doc.set_text(&content);
            doc.set_file_path(Some(owned));
        });
        self.path = Some(path.to_path_buf());

        tracing::info!("Opened {}", path.display());
        self.emit(EditorEvent::FileOpened(path.to_path_buf()));
        Ok(())
    }

    /// Replaces the whole text and reports it as one delta.
    pub fn set_text(&mut self, text: &str) -> ContentChange {
        let change = self.document.invoke(|doc| doc.set_text(text));
        self.emit(EditorEvent::ContentChanged(vec![change]));
        change
    }

    /// Inserts text at a character offset.
    pub fn insert(&mut self, offset: usize, text: &str) -> CoreResult<ContentChange> {
        let change = self.document.invoke(|doc| doc.insert(offset, text))?;
        self.emit(EditorEvent::ContentChanged(vec![change]));
        Ok(change)
    }

    /// Deletes a character range.
    pub fn delete(&mut self, range: Range<usize>) -> CoreResult<ContentChange> {
        let change = self.document.invoke(|doc| doc.delete(range))?;
        self.emit(EditorEvent::ContentChanged(vec![change]));
        Ok(change)
    }

    /// Rewrites one block in place.
    pub fn replace_block(&mut self, block_idx: usize, text: &str) -> CoreResult<ContentChange> {
        let change = self.document.invoke(|doc| doc.replace_block(block_idx, text))?;
        self.emit(EditorEvent::ContentChanged(vec![change]));
        Ok(change)
    }

    /// Scrolls the viewport.
    pub fn scroll_to(&mut self, top: f64) {
        self.document.invoke(|doc| doc.scroll_to(top));
        self.emit(EditorEvent::Scrolled(top));
    }

    // ==================== Highlighting Requests ====================

    /// Asks the highlighter to switch to a language by name.
    pub fn select_language(&self, name: impl Into<String>) {
        self.emit(EditorEvent::LanguageSelected(name.into()));
    }

    /// Turns bracket-block highlighting on or off.
    pub fn set_bracket_highlighting(&self, enabled: bool) {
        self.emit(EditorEvent::BracketHighlightingToggled(enabled));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventHandler;

    #[test]
    fn test_edits_emit_content_changes() {
        let mut session = EditorSession::new(Config::default());
        let mut events = EventHandler::new(session.subscribe());

        session.insert(0, "int x;").unwrap();
        session.delete(0..4).unwrap();

        let events = events.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            EditorEvent::ContentChanged(d) if d[0] == ContentChange::inserted(0, 6)
        ));
        assert!(matches!(
            &events[1],
            EditorEvent::ContentChanged(d) if d[0].removed_length == 4
        ));
        assert_eq!(session.text(), "x;");
    }

    #[test]
    fn test_failed_edit_emits_nothing() {
        let mut session = EditorSession::new(Config::default());
        let mut events = EventHandler::new(session.subscribe());

        assert!(session.insert(10, "x").is_err());
        assert!(events.drain().is_empty());
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.c");
        std::fs::write(&path, "int main() {\n}\n").unwrap();

        let mut session = EditorSession::new(Config::default());
        let mut events = EventHandler::new(session.subscribe());
        session.open_file(&path).unwrap();

        assert_eq!(session.file_path(), Some(path.as_path()));
        assert_eq!(session.text(), "int main() {\n}\n");
        let events = events.drain();
        assert!(matches!(&events[..], [EditorEvent::FileOpened(p)] if p == &path));
    }

    #[test]
    fn test_open_missing_file() {
        let mut session = EditorSession::new(Config::default());
        let result = session.open_file("/definitely/not/here.c");
        assert!(matches!(result, Err(CoreError::FileNotFound(_))));
    }

    #[test]
    fn test_scroll_updates_document() {
        let mut session = EditorSession::new(Config::default());
        session.scroll_to(48.0);
        let top = session.document().invoke(|doc| doc.scroll_top());
        assert_eq!(top, 48.0);
    }
}
