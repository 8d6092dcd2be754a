//! Boolean satisfiability solver.
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Error;
use log::info;

use partial_ref::{IntoPartialRef, IntoPartialRefMut, PartialRef};

use kestrel_dimacs::DimacsParser;
use kestrel_formula::{CnfFormula, ExtendFormula, Lit, Var};

use crate::config::{ConfigError, SolverConfigUpdate};
use crate::context::{
    config_changed, set_var_count, AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context,
    ImplGraphP, SolverConfigP, SolverStateP, StatsP,
};
use crate::load::load_clause;
use crate::schedule::schedule_step;
use crate::state::SatState;
use crate::stats::Stats;

/// Result of checking the satisfiability of a formula.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SolveResult {
    Sat,
    Unsat,
    /// The search was stopped by a limit or a cancellation before reaching a verdict.
    Unknown,
}

/// A resource limit for the next [`solve`](Solver::solve) call.
///
/// Limits are absolute: they are computed from the statistics at the time the limit is set.
#[derive(Copy, Clone, Debug)]
pub enum Limit {
    /// Stop after this many further conflicts.
    Conflicts(u64),
    /// Stop after this many further decisions.
    Decisions(u64),
    /// Stop when this much wall clock time has passed.
    Time(Duration),
}

/// Handle to asynchronously cancel a running [`solve`](Solver::solve) call.
///
/// Setting the flag is a single atomic store, so this is safe to use from a signal handler or
/// another thread.
#[derive(Clone)]
pub struct Terminator {
    flag: Arc<AtomicBool>,
}

impl Terminator {
    /// Ask the solver to stop as soon as possible.
    ///
    /// The solver returns [`SolveResult::Unknown`] from the interrupted call.
    pub fn terminate(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

/// A boolean satisfiability solver.
#[derive(Default)]
pub struct Solver {
    ctx: Box<Context>,
    pending_clause: Vec<Lit>,
}

impl Solver {
    /// Create a new solver.
    pub fn new() -> Solver {
        Solver::default()
    }

    /// Change the solver configuration.
    pub fn config(&mut self, update: &SolverConfigUpdate) -> Result<(), ConfigError> {
        let mut ctx = self.ctx.into_partial_ref_mut();
        update.apply(ctx.part_mut(SolverConfigP))?;
        config_changed(ctx.borrow());
        Ok(())
    }

    /// Add a formula to the solver.
    pub fn add_formula(&mut self, formula: &CnfFormula) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        set_var_count(ctx.borrow(), formula.var_count());
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }
    }

    /// Reads and adds a formula in DIMACS CNF format.
    ///
    /// Using this avoids creating a temporary [`CnfFormula`].
    pub fn add_dimacs_cnf(&mut self, input: impl io::Read) -> Result<(), Error> {
        let parser = DimacsParser::parse_incremental(input, |parser| {
            self.add_formula(&parser.take_formula());
            Ok(())
        })?;

        info!(
            "parsed formula with {} variables and {} clauses",
            parser.var_count(),
            parser.clause_count()
        );

        Ok(())
    }

    /// Add a single literal of a clause in the DIMACS CNF integer encoding.
    ///
    /// Nonzero values extend the current clause, a zero terminates it and adds it to the solver.
    pub fn add_dimacs_lit(&mut self, dimacs_lit: i32) {
        if dimacs_lit == 0 {
            let clause = std::mem::take(&mut self.pending_clause);
            self.add_clause(&clause);
        } else {
            self.pending_clause.push(Lit::from_dimacs(dimacs_lit as isize));
        }
    }

    /// Check the satisfiability of the current formula.
    pub fn solve(&mut self) -> SolveResult {
        debug_assert!(
            self.pending_clause.is_empty(),
            "solve called with an unterminated clause"
        );

        let mut ctx = self.ctx.into_partial_ref_mut();

        while schedule_step(ctx.borrow()) {}

        match ctx.part(SolverStateP).sat_state {
            SatState::Unknown => SolveResult::Unknown,
            SatState::Sat => SolveResult::Sat,
            SatState::Unsat => SolveResult::Unsat,
        }
    }

    /// Set a resource limit for the following [`solve`](Solver::solve) calls.
    pub fn set_limit(&mut self, limit: Limit) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        let stats = *ctx.part(StatsP);
        let limits = &mut ctx.part_mut(SolverStateP).limits;

        match limit {
            Limit::Conflicts(bound) => limits.conflicts = Some(stats.conflicts + bound),
            Limit::Decisions(bound) => limits.decisions = Some(stats.decisions + bound),
            Limit::Time(duration) => limits.deadline = Some(Instant::now() + duration),
        }
    }

    /// A handle that cancels a running [`solve`](Solver::solve) call when triggered.
    pub fn terminator(&self) -> Terminator {
        let ctx = self.ctx.into_partial_ref();
        Terminator {
            flag: ctx.part(SolverStateP).terminate.clone(),
        }
    }

    /// Set of literals that satisfy the formula.
    ///
    /// Only available after [`solve`](Solver::solve) returned [`SolveResult::Sat`].
    pub fn model(&self) -> Option<Vec<Lit>> {
        let ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state == SatState::Sat {
            Some(
                ctx.part(AssignmentP)
                    .assignment()
                    .iter()
                    .enumerate()
                    .flat_map(|(index, assignment)| {
                        assignment.map(|polarity| Lit::from_index(index, polarity))
                    })
                    .collect(),
            )
        } else {
            None
        }
    }

    /// The value assigned to a variable given in the 1-based DIMACS CNF encoding.
    ///
    /// Only available after [`solve`](Solver::solve) returned [`SolveResult::Sat`].
    pub fn value(&self, dimacs_var: isize) -> Option<bool> {
        let ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state != SatState::Sat {
            return None;
        }

        let var = Var::from_dimacs(dimacs_var);
        if var.index() >= ctx.part(AssignmentP).assignment().len() {
            return None;
        }

        ctx.part(AssignmentP).var_value(var)
    }

    /// Search statistics accumulated so far.
    pub fn stats(&self) -> Stats {
        let ctx = self.ctx.into_partial_ref();
        *ctx.part(StatsP)
    }

    /// Whether a literal is assigned by the top level unit propagation.
    ///
    /// Part of the interface used by an external clause simplifier.
    pub fn lit_implied_at_top_level(&self, lit: Lit) -> Option<bool> {
        let ctx = self.ctx.into_partial_ref();

        if lit.index() >= ctx.part(AssignmentP).assignment().len() {
            return None;
        }

        if ctx.part(ImplGraphP).level(lit.var()) != 0 {
            return None;
        }

        ctx.part(AssignmentP).lit_value(lit)
    }

    /// Visit every irredundant clause of the current formula.
    ///
    /// Unit clauses are visible as top level assignments instead. Part of the interface used by
    /// an external clause simplifier, which re-adds strengthened clauses through
    /// [`add_clause`](ExtendFormula::add_clause).
    pub fn visit_irredundant_clauses(&self, mut visit: impl FnMut(&[Lit])) {
        let ctx = self.ctx.into_partial_ref();

        let var_count = ctx.part(AssignmentP).assignment().len();

        for code in 0..var_count * 2 {
            let lit = Lit::from_code(code);
            for &other in ctx.part(BinaryClausesP).implied(lit).iter() {
                // Each binary clause is indexed under both its literals, visit it only once
                if !lit < other {
                    visit(&[!lit, other]);
                }
            }
        }

        for &cref in ctx.part(ClauseDbP).clauses().iter() {
            let clause = ctx.part(ClauseAllocP).clause(cref);
            if clause.header().garbage() || clause.header().redundant() {
                continue;
            }
            visit(clause.lits());
        }
    }
}

impl ExtendFormula for Solver {
    fn add_clause(&mut self, literals: &[Lit]) {
        let mut ctx = self.ctx.into_partial_ref_mut();

        let required_vars = literals
            .iter()
            .map(|lit| lit.index() + 1)
            .max()
            .unwrap_or(0);

        set_var_count(ctx.borrow(), required_vars);
        load_clause(ctx.borrow(), literals);
    }

    fn new_var(&mut self) -> Var {
        let mut ctx = self.ctx.into_partial_ref_mut();
        let count = ctx.part(AssignmentP).assignment().len();
        set_var_count(ctx.borrow(), count + 1);
        Var::from_index(count)
    }
}
