//! Propagation of long clauses.
use std::mem::take;

use partial_ref::{partial, PartialRef};

use kestrel_formula::Lit;

use crate::context::{
    AssignmentP, ClauseAllocP, Context, ImplGraphP, StatsP, TrailP, WatchlistsP,
};

use super::enqueue_assignment;
use super::{Conflict, Reason, Watch};

/// Propagate all literals implied by long clauses watched by the given literal.
///
/// On conflict return the clause propagating the conflicting assignment.
///
/// See [`prop::watch`](crate::prop::watch) for the invariants that this has to uphold.
pub fn propagate_long(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ImplGraphP,
        mut StatsP,
        mut TrailP,
        mut WatchlistsP,
    ),
    lit: Lit,
) -> Result<(), Conflict> {
    let (watchlists, mut ctx) = ctx.split_part_mut(WatchlistsP);
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);

    // The list is detached while it is rewritten, so that moved watches can be appended to the
    // lists of other literals in the meantime.
    let mut watches = take(watchlists.watched_by_mut(lit));

    let false_lit = !lit;

    let mut read = 0;
    let mut write = 0;
    let mut result = Ok(());

    'watches: while read < watches.len() {
        let watch = watches[read];
        read += 1;

        ctx.part_mut(StatsP).ticks += 1;

        // If the blocking literal (which is part of the watched clause) is already true, the
        // watched clause is satisfied and we don't even have to look at it.
        if ctx.part(AssignmentP).lit_is_true(watch.blocking) {
            watches[write] = watch;
            write += 1;
            continue;
        }

        let cref = watch.cref;

        let (len, searched, garbage) = {
            let header = alloc.header(cref);
            (header.len(), header.searched(), header.garbage())
        };

        // Deleting a clause only marks its header, the watch entries are dropped here when they
        // are encountered.
        if garbage {
            continue;
        }

        ctx.part_mut(StatsP).ticks += 1;

        let lits = alloc.clause_mut(cref).lits_mut();

        // First we ensure that the literal we're currently propagating is at index 1. This
        // prepares the literal order for further propagations, as the propagating literal has to
        // be at index 0. Doing this here also avoids a similar check later should the clause be
        // satisfied by a non-watched literal, as we can just move it to index 1.
        let mut other = lits[0];
        if other == false_lit {
            lits.swap(0, 1);
            other = lits[0];
        }

        // We create a new watch with the other watched literal as blocking literal. This will
        // either replace the currently processed watch or be added to another literal's watch
        // list.
        let new_watch = Watch {
            cref,
            blocking: other,
        };

        // If the other watched literal (now the first) isn't the blocking literal, check whether
        // that one is true. If so nothing else needs to be done.
        if other != watch.blocking && ctx.part(AssignmentP).lit_is_true(other) {
            watches[write] = new_watch;
            write += 1;
            continue;
        }

        // At this point we try to find a non-false unwatched literal to replace our current
        // literal as the watched literal. The search resumes where it stopped the last time this
        // clause was scanned and wraps around to the first unwatched literal, so every size class
        // picks the same replacement: the first non-false literal in the cyclic order starting at
        // the remembered position.
        let replacement = if len == 3 {
            // A ternary clause has a single unwatched literal to inspect.
            if ctx.part(AssignmentP).lit_is_false(lits[2]) {
                None
            } else {
                Some(2)
            }
        } else {
            debug_assert!(searched >= 2 && searched < len);

            let mut position = searched;
            let mut found = None;
            loop {
                if !ctx.part(AssignmentP).lit_is_false(lits[position]) {
                    found = Some(position);
                    break;
                }
                position += 1;
                if position == len {
                    position = 2;
                }
                if position == searched {
                    break;
                }
            }
            found
        };

        if let Some(position) = replacement {
            // We found a non-false literal and make it a watched literal by reordering the
            // literals and adding the watch to the corresponding watchlist.
            let replacement_lit = lits[position];
            lits[1] = replacement_lit;
            lits[position] = false_lit;

            if len > 3 {
                alloc.header_mut(cref).set_searched(position);
            }

            watchlists.add_watch(replacement_lit, new_watch);
            continue 'watches;
        }

        // We didn't find a non-false unwatched literal, so either we're propagating or we have a
        // conflict.
        watches[write] = new_watch;
        write += 1;

        // If the other watched literal is false we have a conflict.
        if ctx.part(AssignmentP).lit_is_false(other) {
            // The unprocessed watches are kept verbatim.
            while read < watches.len() {
                watches[write] = watches[read];
                write += 1;
                read += 1;
            }

            result = Err(Conflict::Long(cref));
            break 'watches;
        }

        // Otherwise we enqueue a new propagation.
        enqueue_assignment(ctx.borrow(), other, Reason::Long(cref));
    }

    watches.truncate(write);
    *watchlists.watched_by_mut(lit) = watches;

    result
}
