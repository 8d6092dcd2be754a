//! Conflict driven clause learning.
use std::time::Instant;

use partial_ref::{partial, PartialRef};

use crate::analyze_conflict::analyze_conflict;
use crate::clause::{db, ClauseHeader};
use crate::context::{
    AnalyzeConflictP, AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ImplGraphP,
    PhasesP, ScheduleP, SolverConfigP, SolverStateP, StatsP, TmpDataP, TrailP, VmtfP, VsidsP,
    WatchlistsP,
};
use crate::decision::make_decision;
use crate::glue::compute_glue;
use crate::prop::{backtrack, enqueue_assignment, propagate, Conflict, Reason};
use crate::state::SatState;

/// Outcome of a single search step.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SearchStep {
    /// A conflict was found, analyzed and resolved by learning a clause of the given glue.
    Conflict { glue: usize },
    /// The search finished, the satisfiability state is set.
    Done,
    /// A limit was hit or cancellation was requested before the search finished.
    Interrupted,
}

/// Find a conflict, learn a clause and backtrack.
///
/// If no conflict is found the formula is satisfiable and the search stops. A conflict without
/// any decisions proves the formula unsatisfiable.
pub fn conflict_step(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut PhasesP,
        mut ScheduleP,
        mut SolverStateP,
        mut StatsP,
        mut TmpDataP,
        mut TrailP,
        mut VmtfP,
        mut VsidsP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) -> SearchStep {
    let conflict = match find_conflict(ctx.borrow()) {
        FoundConflict::Sat => {
            ctx.part_mut(SolverStateP).sat_state = SatState::Sat;
            return SearchStep::Done;
        }
        FoundConflict::Interrupted => return SearchStep::Interrupted,
        FoundConflict::Conflict(conflict) => conflict,
    };

    ctx.part_mut(StatsP).conflicts += 1;

    let backtrack_to = analyze_conflict(ctx.borrow(), conflict);

    let tier2 = ctx.part(SolverConfigP).tier2_glue as usize;

    let (analyze, mut ctx) = ctx.split_part(AnalyzeConflictP);

    // Clauses resolved on during the analysis proved themselves useful, so they get another
    // round of shielding from reduction.
    for &cref in analyze.involved() {
        let header = ctx.part_mut(ClauseAllocP).header_mut(cref);
        if header.redundant() {
            let shield = if header.glue() <= tier2 { 2 } else { 1 };
            header.set_used(header.used().max(shield));
        }
    }

    let clause = analyze.clause();

    if clause.is_empty() {
        ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
        return SearchStep::Done;
    }

    let glue = compute_glue(ctx.borrow(), clause) - 1;

    backtrack(ctx.borrow(), backtrack_to);

    let reason = match clause.len() {
        1 => {
            ctx.part_mut(StatsP).learned_units += 1;
            Reason::Unit
        }
        2 => {
            ctx.part_mut(StatsP).learned_binaries += 1;
            ctx.part_mut(BinaryClausesP)
                .add_binary_clause([clause[0], clause[1]]);
            Reason::Binary([clause[1]])
        }
        _ => {
            ctx.part_mut(StatsP).learned_longs += 1;

            let mut header = ClauseHeader::new();
            header.set_redundant(true);
            header.set_glue(glue);
            header.set_used(if glue <= tier2 { 2 } else { 1 });

            let cref = db::add_clause(ctx.borrow(), header, clause);

            if ctx.part(WatchlistsP).enabled() {
                ctx.part_mut(WatchlistsP)
                    .watch_clause(cref, [clause[0], clause[1]]);
            }

            Reason::Long(cref)
        }
    };

    enqueue_assignment(ctx.borrow(), clause[0], reason);

    SearchStep::Conflict { glue }
}

/// Return type of [`find_conflict`].
enum FoundConflict {
    /// All variables are assigned without a conflict.
    Sat,
    /// Propagation found a conflict.
    Conflict(Conflict),
    /// A limit was hit or cancellation was requested.
    Interrupted,
}

/// Find a conflict.
///
/// Alternates between propagating all enqueued assignments and making decisions. Limits and the
/// cancellation flag are checked between propagation rounds.
fn find_conflict(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ImplGraphP,
        mut PhasesP,
        mut ScheduleP,
        mut StatsP,
        mut TrailP,
        mut VmtfP,
        mut VsidsP,
        mut WatchlistsP,
        BinaryClausesP,
        ClauseDbP,
        SolverConfigP,
        SolverStateP,
    ),
) -> FoundConflict {
    loop {
        if search_interrupted(ctx.borrow()) {
            return FoundConflict::Interrupted;
        }

        if let Err(conflict) = propagate(ctx.borrow()) {
            return FoundConflict::Conflict(conflict);
        }

        if !make_decision(ctx.borrow()) {
            return FoundConflict::Sat;
        }
    }
}

/// Whether a limit was hit or cancellation was requested.
fn search_interrupted(ctx: partial!(Context, SolverStateP, StatsP)) -> bool {
    let state = ctx.part(SolverStateP);

    if state.terminate_requested() {
        return true;
    }

    let stats = ctx.part(StatsP);
    let limits = &state.limits;

    if let Some(bound) = limits.conflicts {
        if stats.conflicts >= bound {
            return true;
        }
    }

    if let Some(bound) = limits.decisions {
        if stats.decisions >= bound {
            return true;
        }
    }

    if let Some(deadline) = limits.deadline {
        if Instant::now() >= deadline {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use partial_ref::IntoPartialRefMut;

    use kestrel_formula::{cnf_formula, test::*};

    use crate::context::set_var_count;
    use crate::load::load_clause;

    fn search(ctx: &mut Context) {
        let mut ctx = ctx.into_partial_ref_mut();
        while ctx.part(SolverStateP).sat_state == SatState::Unknown {
            if conflict_step(ctx.borrow()) == SearchStep::Interrupted {
                break;
            }
        }
    }

    #[test]
    fn level_0_unsat() {
        let mut ctx = Context::default();

        let formula = cnf_formula![
            1, 2, 3;
            -1;
            1, -2;
            2, -3;
        ];

        {
            let mut ctx = ctx.into_partial_ref_mut();
            set_var_count(ctx.borrow(), formula.var_count());

            for clause in formula.iter() {
                load_clause(ctx.borrow(), clause);
            }
        }

        search(&mut ctx);

        let mut ctx = ctx.into_partial_ref_mut();
        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
    }

    #[test]
    fn conflict_limit_interrupts() {
        let mut ctx = Context::default();

        let formula = cnf_formula![
            1, 2;
            -1, 2;
            1, -2;
            -1, -2;
        ];

        {
            let mut ctx = ctx.into_partial_ref_mut();
            set_var_count(ctx.borrow(), formula.var_count());
            ctx.part_mut(SolverStateP).limits.conflicts = Some(0);

            for clause in formula.iter() {
                load_clause(ctx.borrow(), clause);
            }
        }

        search(&mut ctx);

        let mut ctx = ctx.into_partial_ref_mut();
        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unknown);
    }

    proptest! {
        #[test]
        fn sgen_unsat(formula in sgen_unsat_formula(1..7usize)) {
            let mut ctx = Context::default();

            {
                let mut ctx = ctx.into_partial_ref_mut();
                set_var_count(ctx.borrow(), formula.var_count());

                for clause in formula.iter() {
                    load_clause(ctx.borrow(), clause);
                }
            }

            search(&mut ctx);

            let mut ctx = ctx.into_partial_ref_mut();
            prop_assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut ctx = Context::default();

            {
                let mut ctx = ctx.into_partial_ref_mut();
                set_var_count(ctx.borrow(), formula.var_count());

                for clause in formula.iter() {
                    load_clause(ctx.borrow(), clause);
                }
            }

            search(&mut ctx);

            let mut ctx = ctx.into_partial_ref_mut();
            prop_assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Sat);

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|&lit| ctx.part(AssignmentP).lit_is_true(lit)));
            }
        }

        #[test]
        fn sgen_unsat_incremental_clauses(formula in sgen_unsat_formula(1..7usize)) {
            let mut ctx = Context::default();

            {
                let mut ctx = ctx.into_partial_ref_mut();
                set_var_count(ctx.borrow(), formula.var_count());
            }

            let mut last_state = SatState::Sat;

            for clause in formula.iter() {
                {
                    let mut ctx = ctx.into_partial_ref_mut();
                    load_clause(ctx.borrow(), clause);
                }

                search(&mut ctx);

                let mut ctx = ctx.into_partial_ref_mut();
                if ctx.part(SolverStateP).sat_state != last_state {
                    prop_assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
                    prop_assert_eq!(last_state, SatState::Sat);
                    last_state = ctx.part(SolverStateP).sat_state;
                }
            }

            prop_assert_eq!(last_state, SatState::Unsat);
        }
    }
}
