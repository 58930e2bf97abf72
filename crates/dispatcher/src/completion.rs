//! Completion tracking state machine
//!
//! `Idle -> Running -> Settled`. The outcome may settle once all of these hold:
//! - the parser reports no stream still flushing
//! - no file handler invocation is pending
//!
//! The predicate is checked both when a part finishes routing and when the parser
//! closes, since either one can be the last to happen.

/// Lifecycle of one `process()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionState {
    /// `process()` has not started parsing
    #[default]
    Idle,
    /// Parser started, outcome not yet settled
    Running,
    /// Outcome settled; terminal
    Settled,
}

/// Pending handler count plus settlement guard
#[derive(Debug, Default)]
pub struct CompletionTracker {
    state: CompletionState,
    pending: usize,
}

impl CompletionTracker {
    /// Create an idle tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> CompletionState {
        self.state
    }

    /// In-flight file handler invocations
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Enter `Running`; no-op unless idle
    pub fn start(&mut self) {
        if self.state == CompletionState::Idle {
            self.state = CompletionState::Running;
        }
    }

    /// Count a handler invocation about to start
    pub fn handler_started(&mut self) {
        self.pending += 1;
    }

    /// Count a handler invocation that returned, successfully or not
    pub fn handler_finished(&mut self) {
        debug_assert!(self.pending > 0, "handler finished without being started");
        self.pending = self.pending.saturating_sub(1);
    }

    /// Completion predicate for the given parser flush count
    pub fn is_complete(&self, flushing: usize) -> bool {
        self.state == CompletionState::Running && flushing == 0 && self.pending == 0
    }

    /// Move to `Settled`
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn settle(&mut self) -> bool {
        if self.state == CompletionState::Settled {
            return false;
        }
        self.state = CompletionState::Settled;
        true
    }
}
