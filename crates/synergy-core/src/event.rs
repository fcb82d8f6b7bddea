//! Event system for editor notifications.
//!
//! The editor session is the only producer of content events; the
//! highlighter controller is the main subscriber. We use
//! `tokio::sync::broadcast` so several subscribers can listen without the
//! producer knowing about any of them.

use std::path::PathBuf;

use synergy_buffer::ContentChange;
use tokio::sync::broadcast;

/// Events that can occur in the editor.
#[derive(Debug, Clone)]
pub enum EditorEvent {
    // Document events
    /// Text changed; zero or more deltas
    ContentChanged(Vec<ContentChange>),
    /// A file's content replaced the document
    FileOpened(PathBuf),
    /// The viewport scrolled to a new vertical offset
    Scrolled(f64),

    // Highlighting events
    /// The user picked a language by name
    LanguageSelected(String),
    /// A language definition was uploaded to the registry
    LanguageUploaded(String),
    /// The active keyword language changed (`None` = plain text)
    LanguageChanged(Option<String>),
    /// Bracket-block highlighting was switched on or off
    BracketHighlightingToggled(bool),

    /// Editor is quitting
    Quit,
}

/// Event bus for broadcasting editor events.
pub struct EventBus {
    sender: broadcast::Sender<EditorEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    pub fn new() -> Self {
        // Capacity of 256 events in the buffer
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: EditorEvent) {
        // Ignore error if no receivers (not a problem)
        let _ = self.sender.send(event);
    }

    /// Subscribes to events.
    ///
    /// Returns a receiver that will get all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Helper for processing events, either async or by draining.
pub struct EventHandler {
    receiver: broadcast::Receiver<EditorEvent>,
}

impl EventHandler {
    /// Creates a new event handler.
    pub fn new(receiver: broadcast::Receiver<EditorEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next event.
    pub async fn next(&mut self) -> Option<EditorEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event handler lagged, missed {} events", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns every event already queued, without blocking.
    pub fn drain(&mut self) -> Vec<EditorEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!("Event handler lagged, missed {} events", n);
                }
                Err(_) => break,
            }
        }
        events
    }
}
