//! Target phase memory.
use partial_ref::{partial, PartialRef};

use crate::context::{AssignmentP, Context, PhasesP, TrailP};

/// Remembers the polarities of the largest trail seen so far.
///
/// While the search makes progress towards a satisfying assignment, the assignment that covered
/// the most variables without running into a conflict is a good candidate to steer decisions
/// back towards that region. The target polarities are consulted by phase selection and reset
/// when the search mode changes.
#[derive(Default)]
pub struct Phases {
    target: Vec<bool>,
    best_len: usize,
}

impl Phases {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize, initial_phase: bool) {
        self.target.resize(count, initial_phase);
    }

    /// The target polarity of a variable.
    pub fn target(&self, index: usize) -> bool {
        self.target[index]
    }

    /// Length of the largest conflict-free trail recorded.
    pub fn best_len(&self) -> usize {
        self.best_len
    }

    /// Forget the recorded trail length, keeping the polarities.
    pub fn reset_best(&mut self) {
        self.best_len = 0;
    }
}

/// Record the current trail as the target if it is the largest seen so far.
///
/// Has to be called with a fully propagated trail, so the recorded polarities are conflict-free.
pub fn update_target_phases(mut ctx: partial!(Context, mut PhasesP, TrailP)) {
    let (phases, ctx) = ctx.split_part_mut(PhasesP);
    let trail = ctx.part(TrailP);

    debug_assert!(trail.fully_propagated());

    if trail.trail().len() > phases.best_len {
        phases.best_len = trail.trail().len();
        for &lit in trail.trail().iter() {
            phases.target[lit.index()] = lit.is_positive();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use kestrel_formula::{lit, var};

    use crate::context::set_var_count;
    use crate::prop::{enqueue_assignment, Reason};

    #[test]
    fn longer_trails_overwrite_the_target() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 4);

        enqueue_assignment(ctx.borrow(), lit![-1], Reason::Unit);
        ctx.part_mut(crate::context::TrailP).reset_queue();
        while ctx.part_mut(crate::context::TrailP).pop_queue().is_some() {}

        update_target_phases(ctx.borrow());
        assert_eq!(ctx.part(PhasesP).best_len(), 1);
        assert!(!ctx.part(PhasesP).target(var!(1).index()));

        enqueue_assignment(ctx.borrow(), lit![2], Reason::Unit);
        while ctx.part_mut(crate::context::TrailP).pop_queue().is_some() {}

        update_target_phases(ctx.borrow());
        assert_eq!(ctx.part(PhasesP).best_len(), 2);
        assert!(ctx.part(PhasesP).target(var!(2).index()));

        // Re-recording after a reset keeps the polarities of the full trail
        ctx.part_mut(PhasesP).reset_best();
        update_target_phases(ctx.borrow());
        assert_eq!(ctx.part(PhasesP).best_len(), 2);
        assert!(!ctx.part(PhasesP).target(var!(1).index()));
    }
}
