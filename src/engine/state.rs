// src/engine/state.rs

//! Pure session state machine.
//!
//! The controller reports what happened as a [`Signal`]; [`SessionState::next`]
//! decides where that leads. No IO, no Tokio, so the table can be tested on
//! its own.

/// Lifecycle of one watch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Building the watched-path registry.
    Initializing,
    /// Waiting for the next debounced burst.
    Watching,
    /// A change set is being pushed.
    Dispatching,
    /// Running the descriptor's pre-stop commands.
    CleaningUp,
    Terminated,
}

/// Something the controller observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    WatchRequested,
    /// The root could not be watched.
    SetupFailed,
    /// The registry was built.
    Ready,
    /// The coalescer released a non-empty change set.
    ChangesReady,
    /// Dispatch returned, successfully or not.
    DispatchFinished,
    /// External cancellation fired.
    Cancelled,
    /// The notification source failed.
    SourceFailed,
    CleanupFinished,
}

impl SessionState {
    /// Apply `signal`. Signals that make no sense in the current state leave
    /// it unchanged; in particular cancellation during a dispatch is only
    /// acted on once the dispatch has finished.
    pub fn next(self, signal: Signal) -> SessionState {
        use SessionState::*;
        use Signal::*;

        match (self, signal) {
            (Idle, WatchRequested) => Initializing,
            (Initializing, SetupFailed) => Terminated,
            (Initializing, Ready) => Watching,
            (Watching, ChangesReady) => Dispatching,
            (Dispatching, DispatchFinished) => Watching,
            (Watching, Cancelled) | (Watching, SourceFailed) => CleaningUp,
            (CleaningUp, CleanupFinished) => Terminated,
            (state, _) => state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminated)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}
