//! Marshalling document access onto the document owner.
//!
//! Background workers never touch the document directly. Every read or
//! write is wrapped in a closure and handed to a [`Dispatcher`], which runs
//! it with exclusive access to the surface and hands back the result.
//!
//! A GUI host would implement `Dispatcher` by posting the closure to its UI
//! thread and blocking on the reply. [`SharedDocument`] is the in-process
//! version: the closure runs on the calling thread while holding the
//! document lock, which gives the same one-at-a-time guarantee.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::document::RichDocument;
use crate::surface::TextSurface;

/// Runs closures against a surface on behalf of its owner.
pub trait Dispatcher: Clone + Send + Sync + 'static {
    type Surface: TextSurface;

    fn invoke<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut Self::Surface) -> R + Send,
        R: Send;
}

/// A [`RichDocument`] shared between the foreground and the workers.
#[derive(Clone)]
pub struct SharedDocument {
    inner: Arc<Mutex<RichDocument>>,
}

impl SharedDocument {
    pub fn new(document: RichDocument) -> Self {
        Self {
            inner: Arc::new(Mutex::new(document)),
        }
    }
}

impl Default for SharedDocument {
    fn default() -> Self {
        Self::new(RichDocument::new())
    }
}

impl Dispatcher for SharedDocument {
    type Surface = RichDocument;

    fn invoke<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut RichDocument) -> R + Send,
        R: Send,
    {
        let mut doc = self.inner.lock();
        f(&mut doc)
    }
}
