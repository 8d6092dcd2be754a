//! Database for long clauses.
use partial_ref::{partial, PartialRef};

use kestrel_formula::Lit;

use crate::context::{AssignmentP, ClauseAllocP, ClauseDbP, Context, ImplGraphP};
use crate::prop::Reason;

use super::header::HEADER_LEN;
use super::{ClauseHeader, ClauseRef};

/// Database for long clauses.
///
/// Tracks all long clauses of the arena. Deleted clauses stay in the `clauses` list until the next
/// garbage collection, so iteration has to check the header's garbage flag.
#[derive(Default)]
pub struct ClauseDb {
    /// May contain garbage clauses, see above.
    pub(super) clauses: Vec<ClauseRef>,
    /// Number of live irredundant clauses.
    pub(super) irredundant_count: usize,
    /// Number of live redundant clauses.
    pub(super) redundant_count: usize,
    /// Size of deleted but not yet collected clauses.
    pub(super) garbage_size: usize,
}

impl ClauseDb {
    /// The number of live irredundant clauses.
    pub fn irredundant_count(&self) -> usize {
        self.irredundant_count
    }

    /// The number of live redundant clauses.
    pub fn redundant_count(&self) -> usize {
        self.redundant_count
    }

    /// References of all stored clauses, including not yet collected garbage clauses.
    pub fn clauses(&self) -> &[ClauseRef] {
        &self.clauses
    }
}

/// Add a long clause to the database.
pub fn add_clause(
    mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP),
    header: ClauseHeader,
    lits: &[Lit],
) -> ClauseRef {
    let redundant = header.redundant();

    let cref = ctx.part_mut(ClauseAllocP).add_clause(header, lits);

    let db = ctx.part_mut(ClauseDbP);

    db.clauses.push(cref);
    if redundant {
        db.redundant_count += 1;
    } else {
        db.irredundant_count += 1;
    }

    cref
}

/// Delete a long clause from the database.
///
/// The clause is marked as garbage and its storage is reclaimed by the next collection.
pub fn delete_clause(mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP), cref: ClauseRef) {
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let db = ctx.part_mut(ClauseDbP);

    let header = alloc.header_mut(cref);

    debug_assert!(!header.garbage(), "delete_clause for already deleted clause");

    header.set_garbage(true);

    if header.redundant() {
        db.redundant_count -= 1;
    } else {
        db.irredundant_count -= 1;
    }

    db.garbage_size += header.len() + HEADER_LEN;
}

/// Whether a clause is the reason of a currently assigned variable.
///
/// Uses the invariant that a propagating clause keeps the propagated literal in position 0.
pub fn clause_is_reason(
    ctx: partial!(Context, AssignmentP, ClauseAllocP, ImplGraphP),
    cref: ClauseRef,
) -> bool {
    let propagated = ctx.part(ClauseAllocP).clause(cref).lits()[0];

    ctx.part(AssignmentP).lit_is_true(propagated)
        && ctx.part(ImplGraphP).reason(propagated.var()) == &Reason::Long(cref)
}

/// Delete a long clause unless it is the reason of a current assignment.
///
/// Returns whether the clause was deleted.
pub fn try_delete_clause(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        AssignmentP,
        ImplGraphP
    ),
    cref: ClauseRef,
) -> bool {
    if clause_is_reason(ctx.borrow(), cref) {
        return false;
    }

    delete_clause(ctx.borrow(), cref);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;
    use proptest::*;

    use kestrel_formula::{cnf::strategy::*, cnf_formula};

    #[test]
    fn counts_track_deletes() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let clauses = cnf_formula![
            1, 2, 3;
            4, -5, 6;
            -2, 3, -4;
            -3, 5, 2, 7, 5;
        ];

        let mut crefs = vec![];

        for (index, clause) in clauses.iter().enumerate() {
            let mut header = ClauseHeader::new();
            header.set_redundant(index % 2 == 1);
            let cref = add_clause(ctx.borrow(), header, clause);
            crefs.push(cref);
        }

        assert_eq!(ctx.part(ClauseDbP).irredundant_count(), 2);
        assert_eq!(ctx.part(ClauseDbP).redundant_count(), 2);

        delete_clause(ctx.borrow(), crefs[0]);
        delete_clause(ctx.borrow(), crefs[3]);

        assert_eq!(ctx.part(ClauseDbP).irredundant_count(), 1);
        assert_eq!(ctx.part(ClauseDbP).redundant_count(), 1);

        assert!(ctx.part(ClauseAllocP).header(crefs[0]).garbage());
        assert!(!ctx.part(ClauseAllocP).header(crefs[1]).garbage());
        assert!(ctx.part(ClauseDbP).garbage_size > 0);
    }

    proptest! {
        #[test]
        fn garbage_accounting(
            input in cnf_formula(1..100usize, 1..500, 3..30),
        ) {
            let mut ctx = Context::default();
            let mut ctx = ctx.into_partial_ref_mut();

            let mut crefs = vec![];
            let mut total_size = 0;

            for lits in input.iter() {
                let header = ClauseHeader::new();
                crefs.push(add_clause(ctx.borrow(), header, lits));
                total_size += lits.len() + HEADER_LEN;
            }

            for cref in crefs {
                delete_clause(ctx.borrow(), cref);
            }

            prop_assert_eq!(ctx.part(ClauseDbP).garbage_size, total_size);
            prop_assert_eq!(ctx.part(ClauseDbP).irredundant_count(), 0);
            prop_assert_eq!(ctx.part(ClauseAllocP).buffer_size(), total_size);
        }
    }
}
