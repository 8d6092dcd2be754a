//! Kestrel is a CDCL based SAT solver.
//!
//! The solver takes a formula in conjunctive normal form and decides whether it has a satisfying
//! assignment. The main interface is the [`Solver`](solver::Solver) struct.

pub mod config;
pub mod solver;

mod analyze_conflict;
mod binary;
mod cdcl;
mod clause;
mod context;
mod decision;
mod glue;
mod load;
mod phases;
mod prop;
mod rng;
mod schedule;
mod state;
mod stats;
mod tmp;

pub use kestrel_dimacs as dimacs;
pub use kestrel_formula::{cnf, lit, CnfFormula, ExtendFormula, Lit, Var};

pub use solver::{Limit, SolveResult, Solver, Terminator};
