//! Scripted form parser
//!
//! Replays a fixed sequence of steps instead of parsing a body. Used for tests
//! that need exact control over event order and timing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    FlushGuard, FlushState, FormEvent, FormParser, MultipartConfig, ParseError, Part,
};
use futures_util::{stream, StreamExt};
use tracing::trace;

use crate::limits::FieldLimits;

/// One scripted step
#[derive(Debug)]
pub enum ScriptStep {
    /// Emit a file part
    Part {
        name: String,
        filename: Option<String>,
        content_type: Option<String>,
        chunks: Vec<Bytes>,
        /// Delay before each chunk is yielded
        chunk_delay: Option<Duration>,
    },
    /// Emit a field
    Field { key: String, value: String },
    /// Emit a parser error and stop
    Error(ParseError),
    /// Sleep before the next step
    Pause(Duration),
}

/// Observes a script from the outside
#[derive(Debug, Clone, Default)]
pub struct ScriptProbe {
    started: Arc<AtomicBool>,
    events: Arc<AtomicUsize>,
}

impl ScriptProbe {
    /// Whether a parser was started over the script
    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Number of events yielded so far
    pub fn events(&self) -> usize {
        self.events.load(Ordering::SeqCst)
    }
}

/// Builder for a [`ScriptedParser`] source
#[derive(Debug, Default)]
pub struct FormScript {
    steps: VecDeque<ScriptStep>,
    probe: ScriptProbe,
}

impl FormScript {
    /// Create an empty script (yields only `Close`)
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file part delivered in one chunk
    pub fn file(
        self,
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.step(ScriptStep::Part {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some("application/octet-stream".to_string()),
            chunks: vec![data.into()],
            chunk_delay: None,
        })
    }

    /// Append a file part whose chunks trickle in with `delay` between them
    pub fn slow_file(
        self,
        name: impl Into<String>,
        filename: impl Into<String>,
        chunks: Vec<Bytes>,
        delay: Duration,
    ) -> Self {
        self.step(ScriptStep::Part {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some("application/octet-stream".to_string()),
            chunks,
            chunk_delay: Some(delay),
        })
    }

    /// Append a field
    pub fn field(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.step(ScriptStep::Field {
            key: key.into(),
            value: value.into(),
        })
    }

    /// Append a parser error
    pub fn error(self, error: ParseError) -> Self {
        self.step(ScriptStep::Error(error))
    }

    /// Append a pause
    pub fn pause(self, duration: Duration) -> Self {
        self.step(ScriptStep::Pause(duration))
    }

    /// Append an arbitrary step
    pub fn step(mut self, step: ScriptStep) -> Self {
        self.steps.push_back(step);
        self
    }

    /// Probe shared with the parser started over this script
    pub fn probe(&self) -> ScriptProbe {
        self.probe.clone()
    }
}

/// Parser replaying a [`FormScript`]
pub struct ScriptedParser {
    steps: VecDeque<ScriptStep>,
    probe: ScriptProbe,
    limits: FieldLimits,
    flush: FlushState,
    body_guard: Option<FlushGuard>,
    done: bool,
}

impl ScriptedParser {
    fn finish(&mut self, event: FormEvent) -> Option<FormEvent> {
        self.done = true;
        self.body_guard.take();
        self.emit(event)
    }

    fn emit(&self, event: FormEvent) -> Option<FormEvent> {
        self.probe.events.fetch_add(1, Ordering::SeqCst);
        trace!(event = ?event, "scripted event");
        Some(event)
    }

    fn build_part(
        &self,
        name: String,
        filename: Option<String>,
        content_type: Option<String>,
        chunks: Vec<Bytes>,
        chunk_delay: Option<Duration>,
    ) -> Part {
        let body = stream::iter(chunks).then(move |chunk| async move {
            if let Some(delay) = chunk_delay {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, ParseError>(chunk)
        });

        let mut part = Part::new(name, body).tracked(self.flush.begin());
        if let Some(filename) = filename {
            part = part.with_filename(filename);
        }
        if let Some(content_type) = content_type {
            part = part.with_content_type(content_type);
        }
        part
    }
}

impl FormParser for ScriptedParser {
    type Source = FormScript;

    fn start(source: FormScript, config: &MultipartConfig) -> Self {
        source.probe.started.store(true, Ordering::SeqCst);
        let flush = FlushState::new();
        let body_guard = Some(flush.begin());

        Self {
            steps: source.steps,
            probe: source.probe,
            limits: FieldLimits::new(config),
            flush,
            body_guard,
            done: false,
        }
    }

    async fn next_event(&mut self) -> Option<FormEvent> {
        if self.done {
            return None;
        }

        loop {
            let Some(step) = self.steps.pop_front() else {
                return self.finish(FormEvent::Close);
            };

            match step {
                ScriptStep::Pause(duration) => {
                    tokio::time::sleep(duration).await;
                }
                ScriptStep::Error(error) => {
                    return self.finish(FormEvent::Error(error));
                }
                ScriptStep::Field { key, value } => {
                    let counted = self
                        .limits
                        .count_part()
                        .and_then(|()| self.limits.add_field_value(value.len()));
                    if let Err(error) = counted {
                        return self.finish(FormEvent::Error(error));
                    }
                    return self.emit(FormEvent::Field { key, value });
                }
                ScriptStep::Part {
                    name,
                    filename,
                    content_type,
                    chunks,
                    chunk_delay,
                } => {
                    if let Err(error) = self.limits.count_part() {
                        return self.finish(FormEvent::Error(error));
                    }
                    let part = self.build_part(name, filename, content_type, chunks, chunk_delay);
                    return self.emit(FormEvent::Part(part));
                }
            }
        }
    }

    fn flush_state(&self) -> FlushState {
        self.flush.clone()
    }
}
