//! Miscellaneous solver state.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Satisfiability state.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SatState {
    Unknown,
    Sat,
    Unsat,
}

impl Default for SatState {
    fn default() -> SatState {
        SatState::Unknown
    }
}

/// Resource limits for a single search.
///
/// All bounds are absolute values compared against the running statistics, computed when the limit
/// is set.
#[derive(Default)]
pub struct Limits {
    pub conflicts: Option<u64>,
    pub decisions: Option<u64>,
    pub deadline: Option<Instant>,
}

/// Miscellaneous solver state.
///
/// Anything larger or any larger group of related state variables should be moved into a separate
/// part of [`Context`](crate::context::Context).
pub struct SolverState {
    pub sat_state: SatState,
    pub limits: Limits,
    /// Shared cancellation flag, set asynchronously e.g. from a signal handler.
    pub terminate: Arc<AtomicBool>,
}

impl Default for SolverState {
    fn default() -> SolverState {
        SolverState {
            sat_state: SatState::default(),
            limits: Limits::default(),
            terminate: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SolverState {
    /// Whether the cancellation flag was set.
    pub fn terminate_requested(&self) -> bool {
        self.terminate.load(Ordering::Relaxed)
    }
}
