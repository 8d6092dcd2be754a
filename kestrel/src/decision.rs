//! Decision heuristics.
pub mod vmtf;
pub mod vsids;

use partial_ref::{partial, PartialRef};

use kestrel_formula::Var;

use crate::context::{
    AssignmentP, Context, ImplGraphP, PhasesP, ScheduleP, SolverConfigP, StatsP, TrailP, VmtfP,
    VsidsP,
};
use crate::phases::update_target_phases;
use crate::prop::{enqueue_assignment, Reason};
use crate::schedule::SearchMode;

/// Hand a variable back to the decision heuristics after it was unassigned.
pub fn make_available(mut ctx: partial!(Context, mut VmtfP, mut VsidsP), var: Var) {
    ctx.part_mut(VsidsP).make_available(var);
    ctx.part_mut(VmtfP).make_available(var);
}

/// Make a decision and enqueue it.
///
/// The variable is picked by the heuristic of the active search mode, or uniformly at random
/// while a random decision sequence is running. The polarity follows the configured phase policy:
/// a forced phase if one is configured, otherwise the target phase when enabled for the current
/// mode, otherwise the saved phase, otherwise the initial phase.
///
/// Returns `false` if no decision was made because all variables are assigned.
pub fn make_decision(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut PhasesP,
        mut ScheduleP,
        mut StatsP,
        mut TrailP,
        mut VmtfP,
        mut VsidsP,
        SolverConfigP,
    ),
) -> bool {
    let (config, mut ctx) = ctx.split_part(SolverConfigP);

    if ctx.part(TrailP).trail().len() == ctx.part(AssignmentP).assignment().len() {
        return false;
    }

    let stable = ctx.part(ScheduleP).mode == SearchMode::Stable;
    let use_target = config.target == 2 || (config.target == 1 && stable);

    if use_target {
        update_target_phases(ctx.borrow());
    }

    let var = {
        let mut inner_ctx: partial!(
            Context,
            AssignmentP,
            mut ScheduleP,
            mut StatsP,
            mut VmtfP,
            mut VsidsP,
        ) = ctx.borrow();
        let (schedule, mut inner_ctx) = inner_ctx.split_part_mut(ScheduleP);
        let (assignment, mut inner_ctx) = inner_ctx.split_part(AssignmentP);

        if config.random_decisions && schedule.random_remaining > 0 {
            schedule.random_remaining -= 1;
            inner_ctx.part_mut(StatsP).random_decisions += 1;
            random_unassigned(schedule, assignment)
        } else if stable {
            inner_ctx.part_mut(VsidsP).peek_unassigned(assignment)
        } else {
            inner_ctx.part_mut(VmtfP).next_unassigned(assignment)
        }
    };

    let var = match var {
        Some(var) => var,
        None => return false,
    };

    let polarity = if config.force_phase {
        config.initial_phase
    } else if use_target {
        ctx.part(PhasesP).target(var.index())
    } else if config.phase_saving {
        ctx.part(AssignmentP).last_var_value(var)
    } else {
        config.initial_phase
    };

    ctx.part_mut(TrailP).new_decision_level();
    enqueue_assignment(ctx.borrow(), var.lit(polarity), Reason::Decision);
    ctx.part_mut(StatsP).decisions += 1;

    true
}

/// A uniformly sampled unassigned variable.
///
/// Samples an index and probes forward from it, so a single random draw suffices even on a mostly
/// assigned trail.
fn random_unassigned(
    schedule: &mut crate::schedule::Schedule,
    assignment: &crate::prop::Assignment,
) -> Option<Var> {
    let count = assignment.assignment().len();
    if count == 0 {
        return None;
    }

    let start = schedule.rng.below(count as u64) as usize;

    for offset in 0..count {
        let index = start + offset;
        let index = if index >= count { index - count } else { index };
        let var = Var::from_index(index);
        if assignment.var_value(var).is_none() {
            return Some(var);
        }
    }

    None
}
