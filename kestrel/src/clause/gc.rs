//! Garbage collection of long clauses.
use partial_ref::{partial, PartialRef};

use crate::context::{ClauseAllocP, ClauseDbP, Context, ImplGraphP, TrailP, WatchlistsP};
use crate::prop::Reason;

use super::ClauseAlloc;

/// Perform a garbage collection of long clauses if necessary.
pub fn collect_garbage(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut WatchlistsP,
        TrailP,
    ),
) {
    let alloc = ctx.part(ClauseAllocP);
    let db = ctx.part(ClauseDbP);

    // Collecting when a fixed fraction of the allocation is garbage amortizes collection costs.
    if db.garbage_size * 2 > alloc.buffer_size() {
        collect_garbage_now(ctx.borrow());
    }
}

/// Unconditionally perform a garbage collection of long clauses.
///
/// The surviving clauses are copied into a fresh arena in their original order. Anything that
/// holds a clause reference has to be updated: watch lists are invalidated wholesale and rebuilt
/// before the next propagation, reasons of assigned variables are remapped using a flag bit set on
/// their clauses beforehand.
fn collect_garbage_now(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut WatchlistsP,
        TrailP,
    ),
) {
    ctx.part_mut(WatchlistsP).disable();

    flag_reason_clauses(ctx.borrow());

    let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
    let (impl_graph, mut ctx) = ctx.split_part_mut(ImplGraphP);
    let alloc = ctx.part_mut(ClauseAllocP);

    assert!(
        db.garbage_size <= alloc.buffer_size(),
        "Inconsistent garbage tracking in ClauseDb"
    );
    let current_size = alloc.buffer_size() - db.garbage_size;

    // Allocating just the current size would lead to an immediate growing when new clauses are
    // learned, overallocating here avoids that.
    let mut new_alloc = ClauseAlloc::with_capacity(current_size * 2);

    let mut new_clauses = vec![];

    for &cref in db.clauses.iter() {
        let clause = alloc.clause(cref);
        let mut header = *clause.header();
        if header.garbage() {
            continue;
        }

        let clause_is_reason = header.reason();
        header.set_reason(false);

        let new_cref = new_alloc.add_clause(header, clause.lits());

        new_clauses.push(new_cref);

        if clause_is_reason {
            let propagated = clause.lits()[0];

            debug_assert_eq!(impl_graph.reason(propagated.var()), &Reason::Long(cref));
            impl_graph.update_reason(propagated.var(), Reason::Long(new_cref));
        }
    }

    *ctx.part_mut(ClauseAllocP) = new_alloc;
    db.clauses = new_clauses;
    db.garbage_size = 0;
}

/// Flag the clauses that are the reason of an assignment, to track them through the collection.
fn flag_reason_clauses(mut ctx: partial!(Context, mut ClauseAllocP, ImplGraphP, TrailP)) {
    let (trail, mut ctx) = ctx.split_part(TrailP);
    let (alloc, ctx) = ctx.split_part_mut(ClauseAllocP);
    let impl_graph = ctx.part(ImplGraphP);

    for &lit in trail.trail().iter() {
        if let &Reason::Long(cref) = impl_graph.reason(lit.var()) {
            alloc.header_mut(cref).set_reason(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;
    use proptest::*;

    use kestrel_formula::{cnf::strategy::*, Lit};

    use crate::clause::{db, ClauseHeader};
    use crate::context::{set_var_count, AssignmentP};
    use crate::prop::enqueue_assignment;

    proptest! {
        /// Deletes three of every four clauses, collects unconditionally and checks that the
        /// survivors come out in order with identical literals and metadata, and that the reasons
        /// of assigned variables follow their clauses into the new arena.
        #[test]
        fn collection_preserves_survivors_and_reasons(
            input in cnf_formula(2..100usize, 8..400, 3..24),
        ) {
            let mut ctx = Context::default();
            let mut ctx = ctx.into_partial_ref_mut();

            set_var_count(ctx.borrow(), input.var_count());

            let mut crefs = vec![];

            for (index, lits) in input.iter().enumerate() {
                let mut header = ClauseHeader::new();
                header.set_glue(index % 7 + 1);
                header.set_used(index % 3);
                header.set_redundant(index % 2 == 0);
                let cref = db::add_clause(ctx.borrow(), header, lits);
                crefs.push(cref);

                // Every fourth clause survives; make some of the survivors reasons of an
                // assignment so the collection has references to remap.
                if index % 4 == 0 && ctx.part(AssignmentP).lit_value(lits[0]) == None {
                    // This isn't consistent, as the clause isn't actually propagating, but that
                    // isn't checked during garbage collection
                    enqueue_assignment(ctx.borrow(), lits[0], Reason::Long(cref));
                }
            }

            for (index, &cref) in crefs.iter().enumerate() {
                if index % 4 != 0 {
                    db::delete_clause(ctx.borrow(), cref);
                }
            }

            collect_garbage_now(ctx.borrow());

            prop_assert_eq!(ctx.part(ClauseDbP).garbage_size, 0);
            prop_assert!(!ctx.part(WatchlistsP).enabled());

            // The clause list now holds exactly the survivors, in their original relative order,
            // with literals and header metadata copied unchanged.
            let survivors: Vec<(usize, &[Lit])> = input
                .iter()
                .enumerate()
                .filter(|(index, _)| index % 4 == 0)
                .collect();

            let db_clauses = ctx.part(ClauseDbP).clauses().to_vec();
            prop_assert_eq!(db_clauses.len(), survivors.len());

            for (&new_cref, &(index, lits)) in db_clauses.iter().zip(survivors.iter()) {
                let clause = ctx.part(ClauseAllocP).clause(new_cref);
                prop_assert_eq!(clause.lits(), lits);

                let header = clause.header();
                prop_assert!(!header.garbage());
                prop_assert!(!header.reason());
                prop_assert_eq!(header.glue(), index % 7 + 1);
                prop_assert_eq!(header.used(), index % 3);
                prop_assert_eq!(header.redundant(), index % 2 == 0);
            }

            // No stale references: every long reason on the trail points at a clause in the new
            // arena that still propagates its literal from position 0.
            for &lit in ctx.part(TrailP).trail() {
                if let &Reason::Long(cref) = ctx.part(ImplGraphP).reason(lit.var()) {
                    prop_assert!(db_clauses.contains(&cref));
                    prop_assert_eq!(ctx.part(ClauseAllocP).clause(cref).lits()[0], lit);
                }
            }
        }
    }
}
