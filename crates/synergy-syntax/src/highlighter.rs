//! Foreground glue between editor events and the two workers.
//!
//! The [`Highlighter`] turns content deltas into block-aligned intervals,
//! picks languages when files are opened or chosen, and keeps the bracket
//! overlay in step with scrolling. It is built explicitly and handed its
//! dispatcher and registry; there is no global instance.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use synergy_buffer::{ContentChange, Dispatcher, Position, TextSurface};
use synergy_core::{Config, EditorEvent, EventBus, EventHandler};

use crate::language::Language;
use crate::registry::LanguageRegistry;
use crate::worker::{BracketWorker, KeywordWorker};
use crate::{SyntaxError, SyntaxResult};

/// Owns the keyword and bracket workers for one document.
pub struct Highlighter<D: Dispatcher> {
    dispatcher: D,
    keywords: KeywordWorker<D>,
    brackets: BracketWorker<D>,
    registry: LanguageRegistry,
    event_bus: Option<EventBus>,
    keywords_enabled: bool,
    brackets_enabled: bool,
    /// File currently shown, for language re-detection
    current_path: Option<PathBuf>,
}

impl<D: Dispatcher> Highlighter<D> {
    pub fn new(dispatcher: D, registry: LanguageRegistry, config: &Config) -> SyntaxResult<Self> {
        let keywords = KeywordWorker::new(dispatcher.clone(), &config.workers);
        let brackets = BracketWorker::new(dispatcher.clone(), &config.brackets, &config.workers)?;
        Ok(Self {
            dispatcher,
            keywords,
            brackets,
            registry,
            event_bus: None,
            keywords_enabled: config.highlighting.keywords_enabled,
            brackets_enabled: config.highlighting.brackets_enabled,
            current_path: None,
        })
    }

    /// Announces language changes and uploads on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Starts both workers.
    pub fn start(&self) -> SyntaxResult<()> {
        self.keywords.run()?;
        self.brackets.run()?;
        Ok(())
    }

    /// Reacts to one editor event.
    pub fn handle_event(&mut self, event: &EditorEvent) -> SyntaxResult<()> {
        match event {
            EditorEvent::ContentChanged(deltas) => self.content_changed(deltas),
            EditorEvent::FileOpened(path) => self.file_opened(path),
            EditorEvent::LanguageSelected(name) => self.select_language(name)?,
            EditorEvent::LanguageUploaded(_) => self.redetect_language(),
            EditorEvent::Scrolled(_) => {
                if self.brackets_enabled {
                    self.brackets.notify_scrolled();
                }
            }
            EditorEvent::BracketHighlightingToggled(enabled) => {
                self.set_bracket_highlighting(*enabled);
            }
            EditorEvent::LanguageChanged(_) | EditorEvent::Quit => {}
        }
        Ok(())
    }

    /// Consumes events until `Quit` or the bus closes.
    ///
    /// Errors from individual events are logged and do not end the loop.
    pub async fn listen(&mut self, mut events: EventHandler) {
        while let Some(event) = events.next().await {
            if matches!(event, EditorEvent::Quit) {
                break;
            }
            if let Err(e) = self.handle_event(&event) {
                tracing::warn!("Highlighter could not handle {:?}: {}", event, e);
            }
        }
    }

    /// Registers a language definition and announces it.
    pub fn upload_language(&mut self, path: impl AsRef<Path>) -> SyntaxResult<String> {
        let name = self.registry.upload(path)?;
        self.emit(EditorEvent::LanguageUploaded(name.clone()));
        Ok(name)
    }

    /// Name of the active keyword language, `None` for plain text.
    pub fn current_language_name(&self) -> Option<String> {
        self.keywords.current_language_name()
    }

    /// Installs a language and re-highlights the whole document.
    pub fn set_language(&mut self, language: Option<Language>) {
        self.keywords.clear_intervals();
        let name = language.as_ref().map(|l| l.name().to_string());
        self.keywords.set_language(language);
        self.emit(EditorEvent::LanguageChanged(name));
        if self.keywords_enabled {
            let (start, end) = self.document_bounds();
            self.keywords.push_interval(start, end);
        }
    }

    /// Queues the whole document on every enabled worker.
    pub fn highlight_all(&self) {
        let (start, end) = self.document_bounds();
        if self.keywords_enabled {
            self.keywords.push_interval(start, end);
        }
        if self.brackets_enabled {
            self.brackets.push_interval(start, end);
        }
    }

    /// Waits until both workers have gone idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let keywords = self.keywords.wait_idle(timeout);
        let remaining = deadline.saturating_duration_since(Instant::now());
        keywords && self.brackets.wait_idle(remaining)
    }

    /// Stops both workers and waits for their threads.
    pub fn shutdown(&self) {
        self.keywords.join();
        self.brackets.join();
        tracing::info!("Highlighter shut down");
    }

    pub fn keyword_worker(&self) -> &KeywordWorker<D> {
        &self.keywords
    }

    pub fn bracket_worker(&self) -> &BracketWorker<D> {
        &self.brackets
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    pub fn brackets_enabled(&self) -> bool {
        self.brackets_enabled
    }

    // ==================== Event Handling ====================

    fn content_changed(&self, deltas: &[ContentChange]) {
        for delta in deltas {
            let (start, end) = self.dispatcher.invoke(|surface| block_aligned(&*surface, delta));
            if self.keywords_enabled {
                self.keywords.push_interval(start, end);
            }
            if self.brackets_enabled {
                self.brackets.push_interval(start, end);
            }
        }
    }

    fn file_opened(&mut self, path: &Path) {
        self.keywords.clear_intervals();
        self.brackets.clear_intervals();
        self.brackets.clear_bracket_list();
        self.current_path = Some(path.to_path_buf());

        let language = self.detect_language(path);
        self.set_language(language);
        if self.brackets_enabled {
            let (start, end) = self.document_bounds();
            self.brackets.push_interval(start, end);
        }
    }

    fn select_language(&mut self, name: &str) -> SyntaxResult<()> {
        let language = self
            .registry
            .language_by_name(name)?
            .ok_or_else(|| SyntaxError::NotFound(format!("language '{name}'")))?;
        self.set_language(Some(language));
        Ok(())
    }

    fn redetect_language(&mut self) {
        let Some(path) = self.current_path.clone() else {
            return;
        };
        let language = self.detect_language(&path);
        self.set_language(language);
    }

    fn detect_language(&self, path: &Path) -> Option<Language> {
        match self.registry.language_for_path(path) {
            Ok(language) => language,
            Err(e) => {
                tracing::warn!("Cannot load language for {}: {}", path.display(), e);
                None
            }
        }
    }

    fn set_bracket_highlighting(&mut self, enabled: bool) {
        if enabled == self.brackets_enabled {
            return;
        }
        self.brackets_enabled = enabled;
        if enabled {
            let (start, end) = self.document_bounds();
            self.brackets.push_interval(start, end);
        } else {
            self.brackets.clear_intervals();
            self.brackets.clear_bracket_list();
        }
        tracing::info!("Bracket highlighting {}", if enabled { "on" } else { "off" });
    }

    fn document_bounds(&self) -> (Position, Position) {
        self.dispatcher
            .invoke(|surface| (surface.content_start(), surface.content_end()))
    }

    fn emit(&self, event: EditorEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(event);
        }
    }
}

/// Widens a delta to whole blocks: from the start of the block holding
/// `offset` to the end of the block holding `offset + added_length`.
///
/// Offsets past the end (the document moved on since the delta was
/// reported) fall back to the document bounds.
fn block_aligned<S: TextSurface + ?Sized>(surface: &S, delta: &ContentChange) -> (Position, Position) {
    let start = surface
        .block_bounds_at(delta.offset)
        .map(|(start, _)| start)
        .unwrap_or_else(|| surface.content_start());
    let end = surface
        .block_bounds_at(delta.end())
        .map(|(_, end)| end)
        .unwrap_or_else(|| surface.content_end());
    (start, end)
}
