//! Job source adapter.
//!
//! Normalizes the three accepted job-source shapes into one per-pass item
//! sequence:
//!
//! - a finite sequence, materialized eagerly and replayed every pass;
//! - a factory closure, re-invoked every pass to produce a fresh (possibly
//!   unbounded) iterator - "check the queue again" semantics;
//! - a caller-supplied iterator, driven directly, continuing across passes
//!   wherever it left off.
//!
//! The shape is chosen once at construction by which constructor the
//! caller picks, never by runtime inspection inside the dispatch loop.

use std::slice;

type BoxedIter<T> = Box<dyn Iterator<Item = T> + Send>;
type SourceFactory<T> = Box<dyn FnMut() -> BoxedIter<T> + Send>;

/// A normalized source of job items for the dispatch loop.
///
/// Items are opaque to the engine. `Clone` is required so the eagerly
/// materialized fixed shape can replay its items on every pass.
pub struct JobSource<T> {
    kind: SourceKind<T>,
}

enum SourceKind<T> {
    Fixed(Vec<T>),
    Factory(SourceFactory<T>),
    Stream(BoxedIter<T>),
}

impl<T> JobSource<T> {
    /// A finite ordered sequence, captured eagerly.
    ///
    /// The sequence is materialized immediately, preserving order, so
    /// later mutation of the underlying collection cannot change what is
    /// dispatched. Every pass replays the same items.
    pub fn fixed(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            kind: SourceKind::Fixed(items.into_iter().collect()),
        }
    }

    /// A factory invoked once per pass to produce a fresh item sequence.
    ///
    /// The returned iterator may be unbounded; the dispatch loop pulls it
    /// lazily and abandons it when the quit flag is set.
    pub fn factory<F, I>(mut factory: F) -> Self
    where
        F: FnMut() -> I + Send + 'static,
        I: Iterator<Item = T> + Send + 'static,
    {
        Self {
            kind: SourceKind::Factory(Box::new(move || {
                let pass: BoxedIter<T> = Box::new(factory());
                pass
            })),
        }
    }

    /// A caller-supplied iterator driven directly.
    ///
    /// Passes continue wherever the iterator left off; the engine imposes
    /// no restart behavior. Once exhausted, every later pass is empty and
    /// the loop idles until quit.
    pub fn stream<I>(iter: I) -> Self
    where
        I: Iterator<Item = T> + Send + 'static,
    {
        Self {
            kind: SourceKind::Stream(Box::new(iter)),
        }
    }

    /// Single-item smoke-test source yielding one sentinel value per pass.
    pub fn sentinel() -> Self
    where
        T: Default,
    {
        Self::fixed([T::default()])
    }

    /// Produces the item sequence for one pass of the dispatch loop.
    pub fn next_pass(&mut self) -> Pass<'_, T> {
        match &mut self.kind {
            SourceKind::Fixed(items) => Pass(PassKind::Fixed(items.iter())),
            SourceKind::Factory(factory) => Pass(PassKind::Fresh(factory())),
            SourceKind::Stream(iter) => Pass(PassKind::Live(iter)),
        }
    }
}

impl<T> std::fmt::Debug for JobSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape = match &self.kind {
            SourceKind::Fixed(items) => format!("Fixed(len={})", items.len()),
            SourceKind::Factory(_) => "Factory".to_string(),
            SourceKind::Stream(_) => "Stream".to_string(),
        };
        f.debug_struct("JobSource").field("shape", &shape).finish()
    }
}

/// One pass's lazy item sequence, borrowed from a [`JobSource`].
pub struct Pass<'a, T>(PassKind<'a, T>);

enum PassKind<'a, T> {
    Fixed(slice::Iter<'a, T>),
    Fresh(BoxedIter<T>),
    Live(&'a mut BoxedIter<T>),
}

impl<T: Clone> Iterator for Pass<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match &mut self.0 {
            PassKind::Fixed(iter) => iter.next().cloned(),
            PassKind::Fresh(iter) => iter.next(),
            PassKind::Live(iter) => iter.next(),
        }
    }
}
