//! Search statistics.

/// Counters accumulated over the whole search.
///
/// The tick counter approximates the work done by the propagation engine (one tick per clause
/// dereference) and feeds the scheduling heuristics together with the conflict count.
#[derive(Copy, Clone, Default)]
pub struct Stats {
    pub conflicts: u64,
    pub decisions: u64,
    pub random_decisions: u64,
    pub propagations: u64,
    pub ticks: u64,
    pub restarts: u64,
    pub reused_trails: u64,
    pub reductions: u64,
    pub deleted_clauses: u64,
    pub learned_units: u64,
    pub learned_binaries: u64,
    pub learned_longs: u64,
    pub minimized_lits: u64,
    pub shrunken_lits: u64,
}
