//! Unit propagation.
pub mod assignment;
pub mod binary;
pub mod graph;
pub mod long;
pub mod watch;

pub use assignment::{backtrack, enqueue_assignment, Assignment, Trail};
pub use graph::{Conflict, ImplGraph, ImplNode, Reason};
pub use watch::{Watch, Watchlists};

use partial_ref::{partial, PartialRef};

use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ImplGraphP, StatsP, TrailP,
    WatchlistsP,
};

/// Propagate all enqueued assignments.
///
/// Propagation works through the trail in assignment order. Each literal is first propagated
/// through the binary implication index, then through the watched long clauses. On a conflict the
/// conflicting clause is returned and the remaining trail entries stay queued; otherwise the
/// queue is drained completely.
pub fn propagate(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ImplGraphP,
        mut StatsP,
        mut TrailP,
        mut WatchlistsP,
        BinaryClausesP,
        ClauseDbP,
    ),
) -> Result<(), Conflict> {
    enable_watchlists(ctx.borrow());

    while let Some(lit) = ctx.part_mut(TrailP).pop_queue() {
        ctx.part_mut(StatsP).propagations += 1;

        binary::propagate_binary(ctx.borrow(), lit)?;
        long::propagate_long(ctx.borrow(), lit)?;
    }

    Ok(())
}

/// Rebuild the watchlists from the clause database if they are invalidated.
///
/// Clause references go stale whenever the clause arena is compacted. Instead of remapping each
/// watch entry, the watchlists are rebuilt here before the next propagation needs them. The first
/// two literals of every live clause are its watched literals, so rebuilding preserves the watch
/// invariant.
fn enable_watchlists(
    mut ctx: partial!(Context, mut WatchlistsP, ClauseAllocP, ClauseDbP),
) {
    let (watchlists, mut ctx) = ctx.split_part_mut(WatchlistsP);

    if watchlists.enabled() {
        return;
    }

    let (db, ctx) = ctx.split_part(ClauseDbP);
    let alloc = ctx.part(ClauseAllocP);

    for &cref in db.clauses().iter() {
        let clause = alloc.clause(cref);
        if clause.header().garbage() {
            continue;
        }
        let lits = clause.lits();
        watchlists.watch_clause(cref, [lits[0], lits[1]]);
    }

    watchlists.set_enabled();
}
