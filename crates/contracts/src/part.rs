//! Part - single-use byte stream of one multipart section
//!
//! Also defines the flush accounting shared between a parser and the parts it emits.

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::Notify;

use crate::ParseError;

/// Boxed byte stream backing a [`Part`]
pub type PartBody = Pin<Box<dyn Stream<Item = Result<Bytes, ParseError>> + Send>>;

/// Count of byte streams a parser still has open
///
/// Cloning shares the same counter. The parser calls [`FlushState::begin`] for the
/// request body itself and for every part it emits; each [`FlushGuard`] releases its
/// slot when dropped.
#[derive(Debug, Clone, Default)]
pub struct FlushState {
    inner: Arc<FlushInner>,
}

#[derive(Debug, Default)]
struct FlushInner {
    open: AtomicUsize,
    notify: Notify,
}

impl FlushState {
    /// Create a tracker with nothing in flight
    pub fn new() -> Self {
        Self::default()
    }

    /// Open one stream slot
    pub fn begin(&self) -> FlushGuard {
        self.inner.open.fetch_add(1, Ordering::AcqRel);
        FlushGuard {
            inner: Some(Arc::clone(&self.inner)),
        }
    }

    /// Number of streams still flushing
    pub fn flushing(&self) -> usize {
        self.inner.open.load(Ordering::Acquire)
    }

    /// Wait until no stream is flushing
    pub async fn flushed(&self) {
        loop {
            // Registered before the check so a release in between is not missed.
            let notified = self.inner.notify.notified();
            if self.flushing() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// One open stream slot of a [`FlushState`]
#[derive(Debug)]
pub struct FlushGuard {
    inner: Option<Arc<FlushInner>>,
}

impl FlushGuard {
    /// Release the slot now instead of on drop
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(inner) = self.inner.take() {
            if inner.open.fetch_sub(1, Ordering::AcqRel) == 1 {
                inner.notify.notify_waiters();
            }
        }
    }
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// One file part of a multipart body
///
/// The part is consumed exactly once: either a handler reads it or the dispatcher
/// drains it. Dropping a part before its stream ends abandons the remaining bytes.
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    body: PartBody,
    finished: bool,
    guard: Option<FlushGuard>,
}

impl Part {
    /// Create a part from a byte stream
    pub fn new<S>(name: impl Into<String>, body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, ParseError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            body: Box::pin(body),
            finished: false,
            guard: None,
        }
    }

    /// Attach the client-supplied filename
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Attach the declared content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Tie this part to a parser's flush accounting
    pub fn tracked(mut self, guard: FlushGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Raw field name (may be empty)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Client-supplied filename
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Declared content type
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Whether the stream has reached its end
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read the next chunk, `None` once the part is exhausted
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, ParseError> {
        self.next().await.transpose()
    }

    /// Buffer the whole part in memory
    pub async fn bytes(mut self) -> Result<Bytes, ParseError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }

    /// Read the part to completion, discarding its bytes
    ///
    /// Returns the number of bytes discarded.
    pub async fn drain(mut self) -> Result<u64, ParseError> {
        let mut total = 0u64;
        while let Some(chunk) = self.chunk().await? {
            total += chunk.len() as u64;
        }
        Ok(total)
    }
}

impl Stream for Part {
    type Item = Result<Bytes, ParseError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        let polled = this.body.as_mut().poll_next(cx);
        if let Poll::Ready(None) = polled {
            this.finished = true;
            this.guard.take();
        }
        polled
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("name", &self.name)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, ParseError>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_drain_releases_flush_slot() {
        let state = FlushState::new();
        let part = Part::new("doc", chunks(&["ab", "cde"])).tracked(state.begin());
        assert_eq!(state.flushing(), 1);

        let drained = part.drain().await.unwrap();
        assert_eq!(drained, 5);
        assert_eq!(state.flushing(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_flush_slot() {
        let state = FlushState::new();
        let part = Part::new("doc", chunks(&["ab"])).tracked(state.begin());
        drop(part);
        assert_eq!(state.flushing(), 0);
    }

    #[tokio::test]
    async fn test_bytes_collects_all_chunks() {
        let part = Part::new("doc", chunks(&["hello ", "world"]))
            .with_filename("hello.txt")
            .with_content_type("text/plain");
        assert_eq!(part.filename(), Some("hello.txt"));
        assert_eq!(part.content_type(), Some("text/plain"));
        assert_eq!(part.bytes().await.unwrap(), Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn test_flushed_waits_for_last_guard() {
        let state = FlushState::new();
        let guard = state.begin();

        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.flushed().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        guard.release();
        waiter.await.unwrap();
        assert_eq!(state.flushing(), 0);
    }
}
