//! Watchlists to detect long clauses that became unit.
//!
//! Each long clause is watched by two of its literals, kept in position 0 and 1 of the clause.
//! The watch entries live in the watchlists of the two *falsifying* literals, so that assigning a
//! literal visits exactly the clauses whose watched literal just became false. As long as neither
//! watched literal is false, or one of them is true, the clause can neither be unit nor in
//! conflict and propagation can ignore it.
//!
//! When a watched literal becomes false the propagation engine scans the clause for a non-false
//! replacement. If one exists the watch moves there, otherwise the clause is unit (propagating
//! its remaining watched literal) or, if that literal is false as well, a conflict.
//!
//! Backtracking never invalidates the invariant, so watchlists are untouched by it.
//!
//! Each watch additionally carries a blocking literal of the same clause. If the blocking literal
//! is already true the clause is satisfied and the clause storage doesn't have to be touched at
//! all. See [Section 4.5.1 of the "Handbook of Satisfiability"][handbook-ch4] for more details
//! and references.
//!
//! After a garbage collection all watch entries contain stale clause references. Instead of
//! remapping them, the watchlists are invalidated as a whole and rebuilt from the clause database
//! before the next propagation.
//!
//! [handbook-ch4]: https://www.satassociation.org/articles/FAIA185-0131.pdf

use kestrel_formula::Lit;

use crate::clause::ClauseRef;

/// A watch on a long clause.
#[derive(Copy, Clone)]
pub struct Watch {
    /// Clause which has the referring lit in position 0 or 1.
    pub cref: ClauseRef,
    /// A lit of the clause, different from the referring lit.
    pub blocking: Lit,
}

/// Watchlists to detect long clauses that became unit.
#[derive(Default)]
pub struct Watchlists {
    /// Watches of clauses whose watched literal is the negation of the indexing literal.
    watches: Vec<Vec<Watch>>,
    /// Whether the watchlists are up to date with the clause database.
    enabled: bool,
}

impl Watchlists {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.watches.resize(count * 2, vec![]);
    }

    /// Start watching a clause.
    ///
    /// `lits` have to be the first two literals of the given clause.
    pub fn watch_clause(&mut self, cref: ClauseRef, lits: [Lit; 2]) {
        for i in 0..2 {
            let watch = Watch {
                cref,
                blocking: lits[i ^ 1],
            };
            self.watches[(!lits[i]).code()].push(watch);
        }
    }

    /// Return watches for a given newly assigned literal.
    pub fn watched_by_mut(&mut self, lit: Lit) -> &mut Vec<Watch> {
        &mut self.watches[lit.code()]
    }

    /// Make a literal watch a clause.
    pub fn add_watch(&mut self, lit: Lit, watch: Watch) {
        self.watches[(!lit).code()].push(watch)
    }

    /// Whether the watchlists are up to date with the clause database.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Mark the watchlists as up to date.
    pub fn set_enabled(&mut self) {
        self.enabled = true;
    }

    /// Invalidate the watchlists.
    ///
    /// They are rebuilt from the clause database before the next propagation.
    pub fn disable(&mut self) {
        self.enabled = false;
        for watchlist in self.watches.iter_mut() {
            watchlist.clear();
        }
    }
}
