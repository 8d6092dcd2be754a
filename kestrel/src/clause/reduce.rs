//! Clause database reduction.
use log::debug;

use partial_ref::{partial, PartialRef};

use crate::context::{
    AssignmentP, ClauseAllocP, ClauseDbP, Context, ImplGraphP, SolverConfigP, StatsP, TrailP,
    WatchlistsP,
};

use super::{db, gc};

/// Delete low quality redundant clauses and collect the freed storage.
///
/// Candidates are the redundant clauses that are not currently the reason of an assignment, have
/// no `used` shielding left and whose glue is above the tier one threshold. The candidates are
/// ranked by their packed (length, glue) key so that long high-glue clauses are deleted first, and
/// the worst fraction of them is dropped. The fraction grows with the logarithm of the conflict
/// count between the configured low and high bounds.
pub fn reduce(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut StatsP,
        mut WatchlistsP,
        AssignmentP,
        SolverConfigP,
        TrailP,
    ),
) {
    let tier1 = ctx.part(SolverConfigP).tier1_glue as usize;

    let mut candidates: Vec<(u64, super::ClauseRef)> = vec![];

    {
        let mut scan_ctx: partial!(
            Context,
            ClauseDbP,
            mut ClauseAllocP,
            AssignmentP,
            ImplGraphP,
        ) = ctx.borrow();
        let (db, mut scan_ctx) = scan_ctx.split_part(ClauseDbP);
        let (alloc, scan_ctx) = scan_ctx.split_part_mut(ClauseAllocP);
        let assignment = scan_ctx.part(AssignmentP);
        let impl_graph = scan_ctx.part(ImplGraphP);

        for &cref in db.clauses.iter() {
            let header = alloc.header_mut(cref);

            if !header.redundant() || header.garbage() || header.glue() <= tier1 {
                continue;
            }

            let used = header.used();
            if used > 0 {
                header.set_used(used - 1);
                continue;
            }

            let propagated = alloc.clause(cref).lits()[0];
            if assignment.lit_is_true(propagated)
                && impl_graph.reason(propagated.var()) == &crate::prop::Reason::Long(cref)
            {
                continue;
            }

            let header = alloc.header(cref);
            let rank = ((header.len() as u64) << 32) | header.glue() as u64;
            candidates.push((rank, cref));
        }
    }

    // Worst clauses first, clause order as a deterministic tie break
    candidates.sort_unstable_by(|a, b| b.cmp(a));

    let per_mille = reduce_fraction(
        ctx.part(StatsP).conflicts,
        ctx.part(SolverConfigP).reduce_low,
        ctx.part(SolverConfigP).reduce_high,
    );

    let target = candidates.len() * per_mille as usize / 1000;

    let mut deleted = 0;

    for &(_, cref) in candidates.iter().take(target) {
        if db::try_delete_clause(ctx.borrow(), cref) {
            deleted += 1;
        }
    }

    // Surviving candidates get a round of shielding, so an immediate second reduction finds an
    // empty candidate pool.
    for &(_, cref) in candidates.iter().skip(target) {
        let header = ctx.part_mut(ClauseAllocP).header_mut(cref);
        header.set_used(header.used().max(1));
    }

    let stats = ctx.part_mut(StatsP);
    stats.reductions += 1;
    stats.deleted_clauses += deleted;

    debug!(
        "reduce: {} deleted of {} candidates ({}% target)",
        deleted,
        candidates.len(),
        per_mille / 10
    );

    gc::collect_garbage(ctx.borrow());
}

/// Fraction of reduction candidates to delete, in tenths of a percent.
///
/// Interpolates between the low and high bound on a log scale of the conflict count, reaching the
/// high bound at a million conflicts.
fn reduce_fraction(conflicts: u64, low: u64, high: u64) -> u64 {
    let (low, high) = (low.min(high), low.max(high));
    let t = ((conflicts.max(1) as f64).log10() / 6.0).min(1.0);
    low + ((high - low) as f64 * t) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use kestrel_formula::cnf_formula;

    use crate::clause::ClauseHeader;
    use crate::context::set_var_count;

    #[test]
    fn fraction_interpolates_between_bounds() {
        assert_eq!(reduce_fraction(0, 500, 900), 500);
        assert_eq!(reduce_fraction(1, 500, 900), 500);
        assert_eq!(reduce_fraction(1_000_000, 500, 900), 900);
        assert_eq!(reduce_fraction(u64::max_value(), 500, 900), 900);

        let mid = reduce_fraction(1000, 500, 900);
        assert!(mid > 500 && mid < 900);

        // Bounds given in either order
        assert_eq!(reduce_fraction(0, 900, 500), 500);
    }

    #[test]
    fn reduce_deletes_worst_clauses_only() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            1, 2, 3;
            1, 2, 3, 4;
            1, 2, 3, 4, 5;
            1, 2, 3, 4, 5, 6;
        ];

        set_var_count(ctx.borrow(), formula.var_count());

        let mut crefs = vec![];
        for (index, lits) in formula.iter().enumerate() {
            let mut header = ClauseHeader::new();
            header.set_redundant(true);
            header.set_glue(3 + index);
            crefs.push(db::add_clause(ctx.borrow(), header, lits));
        }

        // Push the conflict count high enough to delete the full high fraction
        ctx.part_mut(StatsP).conflicts = 1_000_000;
        ctx.part_mut(SolverConfigP).reduce_high = 500;
        ctx.part_mut(SolverConfigP).reduce_low = 500;

        reduce(ctx.borrow());

        // Half of the four candidates go, and it is the two worst ranked ones
        assert_eq!(ctx.part(ClauseDbP).redundant_count(), 2);
        assert_eq!(ctx.part(StatsP).deleted_clauses, 2);
        assert_eq!(ctx.part(StatsP).reductions, 1);

        let db_clauses: Vec<usize> = ctx
            .part(ClauseDbP)
            .clauses()
            .iter()
            .filter(|&&cref| !ctx.part(ClauseAllocP).header(cref).garbage())
            .map(|&cref| ctx.part(ClauseAllocP).clause(cref).lits().len())
            .collect();

        assert_eq!(db_clauses, vec![3, 4]);
    }

    #[test]
    fn second_reduce_deletes_nothing() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            1, 2, 3, 4, 5;
            -1, -2, -3, -4;
            2, 3, 4, 5;
        ];

        set_var_count(ctx.borrow(), formula.var_count());

        for lits in formula.iter() {
            let mut header = ClauseHeader::new();
            header.set_redundant(true);
            header.set_glue(4);
            db::add_clause(ctx.borrow(), header, lits);
        }

        ctx.part_mut(StatsP).conflicts = 1_000_000;

        reduce(ctx.borrow());
        let deleted_once = ctx.part(StatsP).deleted_clauses;
        assert!(deleted_once > 0);

        reduce(ctx.borrow());
        assert_eq!(ctx.part(StatsP).deleted_clauses, deleted_once);
    }

    #[test]
    fn used_and_low_glue_clauses_are_shielded() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            1, 2, 3, 4;
            -1, -2, -3, -4;
        ];

        set_var_count(ctx.borrow(), formula.var_count());

        let mut crefs = vec![];
        for lits in formula.iter() {
            let mut header = ClauseHeader::new();
            header.set_redundant(true);
            header.set_glue(10);
            crefs.push(db::add_clause(ctx.borrow(), header, lits));
        }

        ctx.part_mut(ClauseAllocP).header_mut(crefs[0]).set_used(1);
        ctx.part_mut(ClauseAllocP).header_mut(crefs[1]).set_glue(2);

        ctx.part_mut(StatsP).conflicts = 1_000_000;
        ctx.part_mut(SolverConfigP).reduce_high = 1000;
        ctx.part_mut(SolverConfigP).reduce_low = 1000;

        reduce(ctx.borrow());

        // Clause 0 spent its shielding, clause 1 is below the tier threshold
        assert_eq!(ctx.part(ClauseDbP).redundant_count(), 2);
        assert_eq!(ctx.part(ClauseAllocP).header(crefs[0]).used(), 0);

        reduce(ctx.borrow());

        // Now only the high glue clause is a candidate and gets deleted
        assert_eq!(ctx.part(ClauseDbP).redundant_count(), 1);
        assert!(ctx.part(ClauseAllocP).header(crefs[0]).garbage());
        assert!(!ctx.part(ClauseAllocP).header(crefs[1]).garbage());
    }
}
