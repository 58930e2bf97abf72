//! Part router - handled-vs-drained decision for each incoming part

use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::{debug, warn};

use contracts::{HandlerError, ParseError, Part};

use crate::completion::CompletionTracker;
use crate::metrics::DispatchMetrics;
use crate::registry::HandlerRegistry;

/// Why a part was drained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainReason {
    /// The part had no name
    Unnamed,
    /// No exact or wildcard handler matched
    NoHandler,
}

/// How a routed part finished
#[derive(Debug)]
pub enum RouteResult {
    /// A handler consumed the part
    Handled {
        /// Registration name of the handler
        handler: String,
        elapsed: Duration,
        result: Result<(), HandlerError>,
    },
    /// The part was read and discarded
    Drained {
        reason: DrainReason,
        result: Result<u64, ParseError>,
    },
}

/// Completion of one routed part
#[derive(Debug)]
pub struct RouteOutcome {
    /// Raw part name
    pub part_name: String,
    pub result: RouteResult,
}

impl RouteOutcome {
    /// Whether a handler (rather than a drain) processed the part
    pub fn was_handled(&self) -> bool {
        matches!(self.result, RouteResult::Handled { .. })
    }
}

/// Work started for one part; resolves when the part is fully routed
pub type RouteTask = BoxFuture<'static, RouteOutcome>;

/// Route `part` to its handler or to a drain
///
/// When a handler matches, the tracker's pending count is incremented before the
/// handler is invoked.
pub fn route_part(
    registry: &HandlerRegistry,
    tracker: &mut CompletionTracker,
    metrics: &DispatchMetrics,
    part: Part,
) -> RouteTask {
    let part_name = part.name().to_string();

    if part_name.is_empty() {
        warn!(filename = ?part.filename(), "Unnamed part, draining");
        metrics.inc_parts_drained();
        return drain(part_name, part, DrainReason::Unnamed);
    }

    let Some(route) = registry.resolve_file_handler(&part_name) else {
        debug!(part = %part_name, "No handler for part, draining");
        metrics.inc_parts_drained();
        return drain(part_name, part, DrainReason::NoHandler);
    };

    let handler = route.key().to_string();
    debug!(part = %part_name, handler = %handler, "Routing part to handler");
    metrics.inc_parts_handled();

    tracker.handler_started();
    metrics.observe_pending(tracker.pending());
    let started = Instant::now();
    let invocation = (route.handler())(part);

    async move {
        let result = invocation.await;
        RouteOutcome {
            part_name,
            result: RouteResult::Handled {
                handler,
                elapsed: started.elapsed(),
                result,
            },
        }
    }
    .boxed()
}

fn drain(part_name: String, part: Part, reason: DrainReason) -> RouteTask {
    async move {
        let result = part.drain().await;
        RouteOutcome {
            part_name,
            result: RouteResult::Drained { reason, result },
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::WILDCARD;
    use bytes::Bytes;
    use futures_util::stream;

    fn part(name: &str, body: &'static [u8]) -> Part {
        Part::new(
            name,
            stream::iter(vec![Ok::<_, ParseError>(Bytes::from_static(body))]),
        )
    }

    #[tokio::test]
    async fn test_unnamed_part_is_drained_despite_wildcard() {
        let mut registry = HandlerRegistry::new();
        registry.on_file(WILDCARD, |_part| async { Err::<(), HandlerError>("called".into()) });
        let mut tracker = CompletionTracker::new();
        let metrics = DispatchMetrics::new();

        let outcome = route_part(&registry, &mut tracker, &metrics, part("", b"abc")).await;

        assert_eq!(tracker.pending(), 0);
        assert_eq!(metrics.parts_drained(), 1);
        match outcome.result {
            RouteResult::Drained { reason, result } => {
                assert_eq!(reason, DrainReason::Unnamed);
                assert_eq!(result.unwrap(), 3);
            }
            other => panic!("expected drain, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unmatched_part_is_drained() {
        let mut registry = HandlerRegistry::new();
        registry.on_file("avatar", |part: Part| async move {
            part.drain().await?;
            Ok::<(), HandlerError>(())
        });
        let mut tracker = CompletionTracker::new();
        let metrics = DispatchMetrics::new();

        let outcome = route_part(&registry, &mut tracker, &metrics, part("resume", b"cv")).await;
        assert!(!outcome.was_handled());
        assert_eq!(outcome.part_name, "resume");
    }

    #[tokio::test]
    async fn test_handler_increments_pending_before_running() {
        let mut registry = HandlerRegistry::new();
        registry.on_file("files", |part: Part| async move {
            let bytes = part.bytes().await?;
            assert_eq!(bytes, Bytes::from_static(b"data"));
            Ok::<(), HandlerError>(())
        });
        let mut tracker = CompletionTracker::new();
        let metrics = DispatchMetrics::new();

        let task = route_part(&registry, &mut tracker, &metrics, part("files[3]", b"data"));
        assert_eq!(tracker.pending(), 1);

        let outcome = task.await;
        match outcome.result {
            RouteResult::Handled {
                handler, result, ..
            } => {
                assert_eq!(handler, "files");
                assert!(result.is_ok());
            }
            other => panic!("expected handler, got {other:?}"),
        }
        assert_eq!(metrics.parts_handled(), 1);
        assert_eq!(metrics.peak_pending(), 1);
    }
}
