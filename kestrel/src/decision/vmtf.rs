//! The move-to-front branching heuristic.
//!
//! Keeps all variables in a doubly-linked queue ordered by a monotonically increasing stamp.
//! Bumping a variable moves it to the front of the queue with a fresh stamp, so the front end
//! always holds the most recently bumped variables. Decisions branch on the unassigned variable
//! closest to the front.
//!
//! The search for that variable starts at a cached cursor instead of the front. The cursor
//! maintains the invariant that every variable with a larger stamp is assigned: moving a bumped
//! and still assigned variable to the front keeps it intact, and backtracking advances the cursor
//! whenever it unassigns a variable with a larger stamp.

use kestrel_formula::Var;

use crate::prop::Assignment;

const NIL: u32 = !0;

#[derive(Copy, Clone)]
struct Link {
    prev: u32,
    next: u32,
}

/// The move-to-front branching heuristic.
pub struct Vmtf {
    /// Queue links per variable; `prev` points towards the front.
    links: Vec<Link>,
    /// Bump stamp per variable.
    stamp: Vec<u64>,
    /// Most recently bumped variable.
    head: u32,
    /// Least recently bumped variable.
    tail: u32,
    /// Cached start of the search for an unassigned variable.
    search: u32,
    next_stamp: u64,
}

impl Default for Vmtf {
    fn default() -> Vmtf {
        Vmtf {
            links: vec![],
            stamp: vec![],
            head: NIL,
            tail: NIL,
            search: NIL,
            next_stamp: 1,
        }
    }
}

impl Vmtf {
    /// Update structures for a new variable count.
    ///
    /// New variables enter the queue at the front, so they are decided early.
    pub fn set_var_count(&mut self, count: usize) {
        let old_count = self.links.len();
        self.links.resize(
            count,
            Link {
                prev: NIL,
                next: NIL,
            },
        );
        self.stamp.resize(count, 0);

        for index in old_count..count {
            self.link_front(index as u32);
            self.search = self.head;
        }
    }

    /// The bump stamp of a variable.
    pub fn stamp(&self, var: Var) -> u64 {
        self.stamp[var.index()]
    }

    /// Move a variable to the front of the queue.
    ///
    /// The variable has to be assigned, otherwise the search cursor would miss it until it is
    /// unassigned again. Conflict analysis only bumps assigned variables, so this holds.
    pub fn bump(&mut self, var: Var) {
        let index = var.index() as u32;
        self.unlink(index);
        self.link_front(index);
    }

    /// Move a batch of analyzed variables to the front of the queue.
    ///
    /// The variables are moved in increasing stamp order, so their relative recency is preserved.
    pub fn bump_analyzed(&mut self, vars: &mut Vec<Var>) {
        let stamps = &self.stamp;
        vars.sort_unstable_by_key(|var| stamps[var.index()]);

        for &var in vars.iter() {
            self.bump(var);
        }
    }

    /// Let the cursor know that a variable was unassigned.
    pub fn make_available(&mut self, var: Var) {
        let index = var.index() as u32;
        if self.search == NIL || self.stamp[index as usize] > self.stamp[self.search as usize] {
            self.search = index;
        }
    }

    /// The unassigned variable closest to the front of the queue.
    ///
    /// Walks from the cached cursor towards the back and leaves the cursor on the result.
    pub fn next_unassigned(&mut self, assignment: &Assignment) -> Option<Var> {
        let mut at = if self.search == NIL {
            self.head
        } else {
            self.search
        };

        while at != NIL {
            let var = Var::from_index(at as usize);
            if assignment.var_value(var).is_none() {
                self.search = at;
                return Some(var);
            }
            at = self.links[at as usize].next;
        }

        None
    }

    fn link_front(&mut self, index: u32) {
        self.stamp[index as usize] = self.next_stamp;
        self.next_stamp += 1;

        self.links[index as usize] = Link {
            prev: NIL,
            next: self.head,
        };
        if self.head != NIL {
            self.links[self.head as usize].prev = index;
        } else {
            self.tail = index;
        }
        self.head = index;
    }

    fn unlink(&mut self, index: u32) {
        let link = self.links[index as usize];

        if link.prev != NIL {
            self.links[link.prev as usize].next = link.next;
        } else if self.head == index {
            self.head = link.next;
        } else {
            // The variable was not linked yet
            return;
        }

        if link.next != NIL {
            self.links[link.next as usize].prev = link.prev;
        } else {
            self.tail = link.prev;
        }

        if self.search == index {
            self.search = if link.next != NIL { link.next } else { self.head };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::prop::Assignment;

    fn assignment_with(count: usize, assigned: &[usize]) -> Assignment {
        let mut assignment = Assignment::default();
        assignment.set_var_count(count, true);
        for &index in assigned {
            assignment.assign_lit(Var::from_index(index).positive());
        }
        assignment
    }

    #[test]
    fn fresh_variables_are_decided_in_reverse_insertion_order() {
        let mut vmtf = Vmtf::default();
        vmtf.set_var_count(4);

        let assignment = assignment_with(4, &[]);

        assert_eq!(vmtf.next_unassigned(&assignment), Some(Var::from_index(3)));
    }

    #[test]
    fn bumped_variable_is_next_after_unassignment() {
        let mut vmtf = Vmtf::default();
        vmtf.set_var_count(4);

        let assigned = assignment_with(4, &[1]);
        vmtf.bump(Var::from_index(1));

        // While 1 is assigned the cursor stays on the older queue entries
        assert_eq!(vmtf.next_unassigned(&assigned), Some(Var::from_index(3)));

        // After unassignment the bumped variable is decided first
        let unassigned = assignment_with(4, &[]);
        vmtf.make_available(Var::from_index(1));
        assert_eq!(vmtf.next_unassigned(&unassigned), Some(Var::from_index(1)));
    }

    #[test]
    fn cursor_skips_assigned_prefix() {
        let mut vmtf = Vmtf::default();
        vmtf.set_var_count(5);

        let assignment = assignment_with(5, &[0, 2, 4]);
        vmtf.bump(Var::from_index(2));
        vmtf.bump(Var::from_index(4));

        // Queue order is now 4, 2, 3, 1, 0 from front to back, with 4 and 2 assigned
        assert_eq!(vmtf.next_unassigned(&assignment), Some(Var::from_index(3)));

        // Unassigning 4 moves the cursor back to the front
        let assignment = assignment_with(5, &[0, 2]);
        vmtf.make_available(Var::from_index(4));
        assert_eq!(vmtf.next_unassigned(&assignment), Some(Var::from_index(4)));
    }

    #[test]
    fn analyzed_batch_keeps_relative_recency() {
        let mut vmtf = Vmtf::default();
        vmtf.set_var_count(6);

        let assignment = assignment_with(6, &[1, 3, 4]);

        let mut batch = vec![Var::from_index(4), Var::from_index(1), Var::from_index(3)];
        vmtf.bump_analyzed(&mut batch);

        // The batch is in front of the rest of the queue, ordered by its previous stamps
        assert_eq!(vmtf.next_unassigned(&assignment), Some(Var::from_index(5)));

        let assignment = assignment_with(6, &[1, 3]);
        vmtf.make_available(Var::from_index(4));
        assert_eq!(vmtf.next_unassigned(&assignment), Some(Var::from_index(4)));

        let assignment = assignment_with(6, &[1]);
        vmtf.make_available(Var::from_index(3));
        assert_eq!(vmtf.next_unassigned(&assignment), Some(Var::from_index(4)));
    }
}
