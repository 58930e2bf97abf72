//! Dispatcher - drives a form parser and fans parts out to handlers

use std::sync::Arc;

use futures_util::stream::{self, FuturesUnordered};
use futures_util::StreamExt;
use tracing::{debug, error, info, instrument, trace, warn};

use contracts::{FormEvent, FormParser, HandlerError, MultipartConfig, Part, PartHandler};
use observability::metrics as obs;
use observability::HandlerTimings;

use crate::completion::{CompletionState, CompletionTracker};
use crate::error::DispatchError;
use crate::metrics::DispatchMetrics;
use crate::registry::HandlerRegistry;
use crate::router::{route_part, RouteOutcome, RouteResult};

/// Streaming dispatcher for one `multipart/form-data` body
///
/// Handlers are registered by name, then [`Dispatcher::process`] parses the body once.
/// The dispatcher never buffers file contents: each part is either handed to a handler
/// or drained.
pub struct Dispatcher<P: FormParser> {
    source: Option<P::Source>,
    config: MultipartConfig,
    registry: HandlerRegistry,
    consumed: bool,
    tracker: CompletionTracker,
    metrics: Arc<DispatchMetrics>,
    timings: HandlerTimings,
}

impl<P: FormParser> Dispatcher<P> {
    /// Create a dispatcher over a request body
    pub fn new(source: P::Source, config: MultipartConfig) -> Self {
        Self::with_registry(source, config, HandlerRegistry::new())
    }

    /// Create a dispatcher with handlers already registered
    pub fn with_registry(
        source: P::Source,
        config: MultipartConfig,
        registry: HandlerRegistry,
    ) -> Self {
        Self {
            source: Some(source),
            config,
            registry,
            consumed: false,
            tracker: CompletionTracker::new(),
            metrics: Arc::new(DispatchMetrics::new()),
            timings: HandlerTimings::new(),
        }
    }

    /// Register the file handler for `name`
    ///
    /// `name` is matched against part names with the first `[n]` / `[]` removed;
    /// `"*"` catches every named part without its own handler.
    pub fn on_file<F, Fut>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Part) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.registry.on_file(name, handler);
        self
    }

    /// Register a [`PartHandler`] implementation for `name`
    pub fn on_file_handler<H>(&mut self, name: impl Into<String>, handler: H) -> &mut Self
    where
        H: PartHandler + Send + Sync + 'static,
    {
        self.registry.on_file_handler(name, handler);
        self
    }

    /// Register the field handler for `name`
    ///
    /// Field keys are matched as-is; `"*"` catches every unmatched field.
    pub fn on_field<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&str, &str) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.registry.on_field(name, handler);
        self
    }

    /// Registered handlers
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Parser limits
    pub fn config(&self) -> &MultipartConfig {
        &self.config
    }

    /// Whether `process` has been called
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// File handler invocations that have not returned
    pub fn pending_handlers(&self) -> usize {
        self.tracker.pending()
    }

    /// Completion state
    pub fn state(&self) -> CompletionState {
        self.tracker.state()
    }

    /// Routing counters
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Per-handler durations of completed invocations
    pub fn timings(&self) -> &HandlerTimings {
        &self.timings
    }

    /// Parse the body and dispatch every part and field
    ///
    /// Resolves once the parser has flushed every part and every file handler has
    /// returned, or with the first failure. May be called once.
    ///
    /// # Errors
    /// - `AlreadyConsumed` on a second call
    /// - `EntityTooLarge` when a field limit is exceeded
    /// - `Handler` with the handler's own error when a handler fails
    /// - `Parser` for any other parse failure
    #[instrument(
        name = "dispatcher_process",
        skip(self),
        fields(max_fields = self.config.max_fields)
    )]
    pub async fn process(&mut self) -> Result<(), DispatchError> {
        if self.consumed {
            warn!("process() called on a consumed dispatcher");
            return Err(DispatchError::AlreadyConsumed);
        }
        self.consumed = true;

        if !self.registry.has_handlers() {
            debug!("No handlers registered, leaving body unread");
            self.tracker.settle();
            obs::record_outcome("skipped");
            return Ok(());
        }

        let Some(source) = self.source.take() else {
            return Err(DispatchError::AlreadyConsumed);
        };

        let result = self.run(P::start(source, &self.config)).await;
        self.tracker.settle();
        obs::record_pending_handlers(self.tracker.pending());

        match &result {
            Ok(()) => {
                obs::record_outcome("ok");
                info!(metrics = ?self.metrics.snapshot(), "Dispatch complete");
            }
            Err(e) => {
                obs::record_outcome(e.code());
                error!(error = %e, code = e.code(), "Dispatch failed");
            }
        }
        result
    }

    async fn run(&mut self, parser: P) -> Result<(), DispatchError> {
        let flush = parser.flush_state();
        // Owning the pending `next_event` future keeps it alive across select! rounds.
        let events = stream::unfold(parser, |mut parser| async move {
            let event = parser.next_event().await?;
            Some((event, parser))
        });
        futures_util::pin_mut!(events);

        let mut in_flight = FuturesUnordered::new();
        let mut parser_open = true;
        self.tracker.start();
        debug!("Dispatcher started");

        loop {
            tokio::select! {
                Some(outcome) = in_flight.next(), if !in_flight.is_empty() => {
                    self.finish_part(outcome)?;
                    if self.tracker.is_complete(flush.flushing()) {
                        debug!("Last part routed");
                        return Ok(());
                    }
                }
                event = events.next(), if parser_open => match event {
                    Some(FormEvent::Part(part)) => {
                        let task =
                            route_part(&self.registry, &mut self.tracker, &self.metrics, part);
                        obs::record_pending_handlers(self.tracker.pending());
                        in_flight.push(task);
                    }
                    Some(FormEvent::Field { key, value }) => {
                        self.handle_field(&key, &value)?;
                    }
                    Some(FormEvent::Error(e)) => {
                        warn!(error = %e, "Parser error");
                        return Err(e.into());
                    }
                    Some(FormEvent::Close) | None => {
                        parser_open = false;
                        trace!(
                            flushing = flush.flushing(),
                            pending = self.tracker.pending(),
                            "Parser closed"
                        );
                        if self.tracker.is_complete(flush.flushing()) {
                            debug!("Parser closed after last part");
                            return Ok(());
                        }
                    }
                },
                else => break,
            }
        }

        // Parts still flushing here are owned outside the dispatcher (e.g. moved into a
        // spawned task by a handler).
        debug!(flushing = flush.flushing(), "Waiting for detached parts");
        flush.flushed().await;
        Ok(())
    }

    fn finish_part(&mut self, outcome: RouteOutcome) -> Result<(), DispatchError> {
        let RouteOutcome { part_name, result } = outcome;
        match result {
            RouteResult::Handled {
                handler,
                elapsed,
                result,
            } => {
                self.tracker.handler_finished();
                obs::record_pending_handlers(self.tracker.pending());

                let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
                obs::record_handler_duration_ms(&handler, elapsed_ms);
                obs::record_part_routed("handled");
                self.timings.record(&handler, elapsed_ms, result.is_ok());

                if let Err(e) = result {
                    self.metrics.inc_handler_failures();
                    error!(
                        part = %part_name,
                        handler = %handler,
                        error = %e,
                        "File handler failed"
                    );
                    return Err(DispatchError::handler(part_name, e));
                }
                trace!(part = %part_name, handler = %handler, elapsed_ms, "File handler finished");
                Ok(())
            }
            RouteResult::Drained { reason, result } => {
                obs::record_part_routed("drained");
                let bytes = result?;
                self.metrics.add_bytes_drained(bytes);
                obs::record_bytes_drained(bytes);
                trace!(part = %part_name, ?reason, bytes, "Part drained");
                Ok(())
            }
        }
    }

    fn handle_field(&self, key: &str, value: &str) -> Result<(), DispatchError> {
        let Some(route) = self.registry.resolve_field_handler(key) else {
            trace!(key, "No handler for field");
            self.metrics.inc_fields_ignored();
            obs::record_field(false);
            return Ok(());
        };

        self.metrics.inc_fields_handled();
        obs::record_field(true);
        (route.handler())(key, value).map_err(|e| {
            self.metrics.inc_handler_failures();
            error!(key, handler = route.key(), error = %e, "Field handler failed");
            DispatchError::handler(key, e)
        })
    }
}

impl<P: FormParser> std::fmt::Debug for Dispatcher<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("consumed", &self.consumed)
            .field("tracker", &self.tracker)
            .finish()
    }
}
