//! End-to-end scenarios over the public solver interface.
use kestrel::{ExtendFormula, Lit, SolveResult, Solver};

fn solve_dimacs(input: &str) -> (SolveResult, Option<Vec<Lit>>) {
    let mut solver = Solver::new();
    solver
        .add_dimacs_cnf(input.as_bytes())
        .expect("parsing failed");
    let result = solver.solve();
    (result, solver.model())
}

#[test]
fn empty_formula() {
    let (result, model) = solve_dimacs("p cnf 0 0\n");
    assert_eq!(result, SolveResult::Sat);
    assert_eq!(model, Some(vec![]));
}

#[test]
fn empty_clause() {
    let mut solver = Solver::new();
    solver.add_clause(&[]);
    assert_eq!(solver.solve(), SolveResult::Unsat);
}

#[test]
fn single_unit() {
    let (result, model) = solve_dimacs("p cnf 1 1\n1 0\n");
    assert_eq!(result, SolveResult::Sat);
    assert_eq!(model, Some(vec![Lit::from_dimacs(1)]));
}

#[test]
fn contradicting_units() {
    let (result, _) = solve_dimacs("p cnf 1 2\n1 0\n-1 0\n");
    assert_eq!(result, SolveResult::Unsat);
}

#[test]
fn exactly_one_of_two() {
    let mut solver = Solver::new();
    solver
        .add_dimacs_cnf(&b"p cnf 2 2\n1 2 0\n-1 -2 0\n"[..])
        .expect("parsing failed");

    assert_eq!(solver.solve(), SolveResult::Sat);

    assert_ne!(solver.value(1), solver.value(2));
}

#[test]
fn small_implication_cycle() {
    let (result, model) = solve_dimacs("p cnf 3 3\n1 2 0\n-1 3 0\n-2 -3 0\n");
    assert_eq!(result, SolveResult::Sat);

    let model = model.unwrap();
    for clause in &[[1, 2], [-1, 3], [-2, -3]] {
        assert!(clause
            .iter()
            .any(|&lit| model.contains(&Lit::from_dimacs(lit))));
    }
}

#[test]
fn all_literals_blocked() {
    let (result, _) = solve_dimacs("p cnf 3 4\n1 2 3 0\n-1 0\n-2 0\n-3 0\n");
    assert_eq!(result, SolveResult::Unsat);
}

/// Three-coloring of the complete graph on four vertices is impossible.
#[test]
fn k4_three_coloring() {
    let mut solver = Solver::new();

    let color = |vertex: usize, color: usize| Lit::from_index(vertex * 3 + color, true);

    for vertex in 0..4 {
        let choices: Vec<Lit> = (0..3).map(|c| color(vertex, c)).collect();
        solver.add_clause(&choices);

        for c1 in 0..3 {
            for c2 in 0..c1 {
                solver.add_clause(&[!color(vertex, c1), !color(vertex, c2)]);
            }
        }
    }

    for v1 in 0..4 {
        for v2 in 0..v1 {
            for c in 0..3 {
                solver.add_clause(&[!color(v1, c), !color(v2, c)]);
            }
        }
    }

    assert_eq!(solver.solve(), SolveResult::Unsat);
}

/// Three-coloring of the cycle on four vertices has solutions.
#[test]
fn c4_three_coloring() {
    let mut solver = Solver::new();

    let color = |vertex: usize, color: usize| Lit::from_index(vertex * 3 + color, true);

    for vertex in 0..4 {
        let choices: Vec<Lit> = (0..3).map(|c| color(vertex, c)).collect();
        solver.add_clause(&choices);

        for c1 in 0..3 {
            for c2 in 0..c1 {
                solver.add_clause(&[!color(vertex, c1), !color(vertex, c2)]);
            }
        }
    }

    for &(v1, v2) in &[(0, 1), (1, 2), (2, 3), (3, 0)] {
        for c in 0..3 {
            solver.add_clause(&[!color(v1, c), !color(v2, c)]);
        }
    }

    assert_eq!(solver.solve(), SolveResult::Sat);

    let model = solver.model().unwrap();
    let assigned_color = |vertex: usize| (0..3).find(|&c| model.contains(&color(vertex, c)));

    for &(v1, v2) in &[(0, 1), (1, 2), (2, 3), (3, 0)] {
        assert!(assigned_color(v1).is_some());
        assert_ne!(assigned_color(v1), assigned_color(v2));
    }
}

/// Adding clauses after a SAT result resumes the search.
#[test]
fn clauses_after_sat() {
    let mut solver = Solver::new();

    solver.add_clause(&[Lit::from_dimacs(1), Lit::from_dimacs(2)]);
    assert_eq!(solver.solve(), SolveResult::Sat);

    solver.add_clause(&[Lit::from_dimacs(-1)]);
    assert_eq!(solver.solve(), SolveResult::Sat);
    assert_eq!(solver.value(1), Some(false));
    assert_eq!(solver.value(2), Some(true));

    solver.add_clause(&[Lit::from_dimacs(-2)]);
    assert_eq!(solver.solve(), SolveResult::Unsat);

    // Once unsatisfiable, further clauses change nothing
    solver.add_clause(&[Lit::from_dimacs(1)]);
    assert_eq!(solver.solve(), SolveResult::Unsat);
}
