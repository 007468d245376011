//! Linear assignment solver tests

use daestruct_algo::{Assignment, DaeError, IncidenceMatrix, LapSolver, PartialSolution, Solution};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn matrix(dimension: usize, entries: &[(usize, usize, i32)]) -> IncidenceMatrix {
    let mut m = IncidenceMatrix::new(dimension);
    for &(i, j, cost) in entries {
        m.insert(i, j, cost).unwrap();
    }
    m
}

fn partial(
    u: Vec<i32>,
    v: Vec<i32>,
    rowsol: &[Option<usize>],
    colsol: &[Option<usize>],
) -> PartialSolution {
    PartialSolution {
        u,
        v,
        row_assignment: rowsol.iter().map(|&a| Assignment::from(a)).collect(),
        col_assignment: colsol.iter().map(|&a| Assignment::from(a)).collect(),
    }
}

/// Dual feasibility plus complementary slackness of a solution.
fn assert_optimal_certificate(m: &IncidenceMatrix, solution: &Solution) {
    for (i, j, sigma) in m.iter() {
        assert!(
            solution.u[i] + solution.v[j] <= sigma,
            "dual infeasible at ({i}, {j})"
        );
    }
    let mut cost = 0;
    for (i, &j) in solution.rowsol.iter().enumerate() {
        assert_eq!(solution.colsol[j], i);
        let sigma = m.get(i, j).expect("matched pair must be an entry");
        assert_eq!(solution.u[i] + solution.v[j], sigma);
        cost += sigma;
    }
    assert_eq!(cost, solution.cost);
}

/// Minimum cost over all perfect matchings, `None` if there is none.
fn brute_force(m: &IncidenceMatrix) -> Option<i32> {
    fn search(
        m: &IncidenceMatrix,
        row: usize,
        used: &mut [bool],
        acc: i32,
        best: &mut Option<i32>,
    ) {
        if row == m.dimension() {
            if best.map_or(true, |b| acc < b) {
                *best = Some(acc);
            }
            return;
        }
        for (j, cost) in m.row(row) {
            if !used[j] {
                used[j] = true;
                search(m, row + 1, used, acc + cost, best);
                used[j] = false;
            }
        }
    }
    let mut best = None;
    let mut used = vec![false; m.dimension()];
    search(m, 0, &mut used, 0, &mut best);
    best
}

fn random_matrix(rng: &mut StdRng, n: usize, density: f64, regular: bool) -> IncidenceMatrix {
    let mut m = IncidenceMatrix::new(n);
    if regular {
        let mut perm: Vec<usize> = (0..n).collect();
        perm.shuffle(rng);
        for (i, &j) in perm.iter().enumerate() {
            m.set_derivative(i, j, rng.gen_range(0..4)).unwrap();
        }
    }
    for i in 0..n {
        for j in 0..n {
            if rng.gen_bool(density) {
                m.set_derivative(i, j, rng.gen_range(0..4)).unwrap();
            }
        }
    }
    m
}

#[test]
fn test_taxi_example() {
    let costs = [
        [12, 8, 11, 18, 11],
        [14, 22, 8, 12, 14],
        [14, 14, 16, 14, 15],
        [19, 11, 14, 17, 15],
        [13, 9, 17, 20, 11],
    ];
    let mut m = IncidenceMatrix::new(5);
    for (i, row) in costs.iter().enumerate() {
        for (j, &c) in row.iter().enumerate() {
            m.insert(i, j, c).unwrap();
        }
    }

    let solver = LapSolver::new();
    let solution = solver.solve(&m).unwrap();
    assert_eq!(solution.rowsol, vec![0, 2, 3, 1, 4]);
    assert_eq!(solution.colsol, vec![0, 3, 1, 2, 4]);
    assert_eq!(solution.cost, 56);
    assert_optimal_certificate(&m, &solution);

    let mut warm = PartialSolution::from(&solution);
    warm.unassign_row(0).unwrap();
    let again = solver.solve_delta(&m, &warm).unwrap();
    assert_eq!(again.rowsol, vec![0, 2, 3, 1, 4]);
    assert_eq!(again.colsol, vec![0, 3, 1, 2, 4]);
    assert_eq!(again.cost, 56);
}

#[test]
fn test_delta_with_negative_costs() {
    //      0   1   2
    // 0 | -1  -1   . |
    // 1 | -2  -1  -1 |
    // 2 |  .  -3  -1 |
    let m = matrix(
        3,
        &[(0, 0, -1), (0, 1, -1), (1, 0, -2), (1, 1, -1), (1, 2, -1), (2, 1, -3), (2, 2, -1)],
    );
    let warm = partial(
        vec![0, 0, 0],
        vec![-2, -3, 0],
        &[None, Some(0), Some(1)],
        &[Some(1), Some(2), None],
    );

    let solver = LapSolver::new();
    let delta = solver.solve_delta(&m, &warm).unwrap();
    assert_eq!(delta.cost, -5);
    assert_eq!(delta.rowsol, vec![0, 2, 1]);
    assert_eq!(delta.colsol, vec![0, 2, 1]);

    let full = solver.solve(&m).unwrap();
    assert_eq!(full.cost, delta.cost);
}

#[test]
fn test_delta_after_cost_improvement() {
    // only the anti-diagonal is available at first
    let before = matrix(2, &[(0, 0, 0), (0, 1, 3), (1, 0, 1)]);
    let solver = LapSolver::new();
    let first = solver.solve(&before).unwrap();
    assert_eq!(first.rowsol, vec![1, 0]);
    assert_eq!(first.colsol, vec![1, 0]);
    assert_eq!(first.cost, 4);
    assert_eq!(first.u, vec![0, 1]);
    assert_eq!(first.v, vec![0, 3]);

    // (1,1) appears; row 1 and column 0 are released
    let after = matrix(2, &[(0, 0, 0), (0, 1, 3), (1, 0, 1), (1, 1, 3)]);
    let warm = partial(first.u, first.v, &[Some(1), None], &[None, Some(0)]);
    let delta = solver.solve_delta(&after, &warm).unwrap();
    assert_eq!(delta.rowsol, vec![0, 1]);
    assert_eq!(delta.colsol, vec![0, 1]);
    assert_eq!(delta.cost, 3);
}

#[test]
fn test_identity_and_repeated_delta() {
    let m = matrix(5, &(0..5).map(|i| (i, i, 1)).collect::<Vec<_>>());
    let solver = LapSolver::new();
    let solution = solver.solve(&m).unwrap();
    assert_eq!(solution.rowsol, vec![0, 1, 2, 3, 4]);
    assert_eq!(solution.cost, 5);

    let mut warm = PartialSolution::from(&solution);
    warm.unassign_row(2).unwrap();
    let second = solver.solve_delta(&m, &warm).unwrap();
    assert_eq!(second.rowsol, vec![0, 1, 2, 3, 4]);

    let mut warm = PartialSolution::from(&second);
    warm.unassign_row(2).unwrap();
    warm.unassign_row(1).unwrap();
    let third = solver.solve_delta(&m, &warm).unwrap();
    assert_eq!(third.rowsol, vec![0, 1, 2, 3, 4]);
    assert_eq!(third.colsol, vec![0, 1, 2, 3, 4]);
    assert_optimal_certificate(&m, &third);
}

#[test]
fn test_lifted_identity() {
    let m = matrix(
        5,
        &[
            (0, 0, 4),
            (1, 1, 4),
            (2, 2, 4),
            (3, 3, 4),
            (4, 4, 4),
            (1, 0, 2),
            (2, 0, 2),
            (3, 0, 2),
            (4, 0, 2),
            (2, 1, 1),
            (3, 1, 1),
            (4, 1, 1),
            (3, 2, 0),
            (4, 2, 0),
            (4, 3, 0),
        ],
    );
    let solution = LapSolver::new().solve(&m).unwrap();
    assert_eq!(solution.rowsol, vec![0, 1, 2, 3, 4]);
    assert_eq!(solution.colsol, vec![0, 1, 2, 3, 4]);
    assert_eq!(solution.cost, 20);
    assert_optimal_certificate(&m, &solution);
}

#[test]
fn test_structural_singularity() {
    // two equations in the same single variable
    let m = matrix(3, &[(0, 0, 0), (1, 0, 0), (2, 1, 0), (2, 2, 0)]);
    let err = LapSolver::new().solve(&m).unwrap_err();
    assert!(err.is_structural());

    // three rows share two columns, but row 2 has a way out
    let m = matrix(
        3,
        &[(0, 0, 0), (0, 1, 0), (1, 0, 0), (1, 1, 0), (2, 0, 0), (2, 1, 0), (2, 2, 0)],
    );
    let ok = LapSolver::new().solve(&m);
    assert!(ok.is_ok(), "row 2 can take column 2");

    // no way out this time
    let m = matrix(
        4,
        &[(0, 0, 0), (0, 1, 0), (1, 0, 0), (1, 1, 0), (2, 0, 0), (2, 1, 0), (3, 2, 0), (3, 3, 0)],
    );
    match LapSolver::new().solve(&m) {
        Err(DaeError::StructuralSingularity {
            dimension,
            structural_rank,
            unmatched_equations,
        }) => {
            assert_eq!(dimension, 4);
            assert_eq!(structural_rank, 3);
            assert_eq!(unmatched_equations.len(), 1);
            assert!(unmatched_equations[0] < 3);
        }
        other => panic!("expected singularity, got {other:?}"),
    }
}

#[test]
fn test_delta_rejects_inconsistent_partial() {
    let m = matrix(2, &[(0, 0, 0), (1, 1, 0)]);
    let warm = partial(vec![0, 0], vec![0, 0], &[Some(1), None], &[None, None]);
    assert!(matches!(
        LapSolver::new().solve_delta(&m, &warm),
        Err(DaeError::InconsistentAssignment(_))
    ));

    let short = partial(vec![0], vec![0, 0], &[None, None], &[None, None]);
    assert!(matches!(
        LapSolver::new().solve_delta(&m, &short),
        Err(DaeError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_random_against_brute_force() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let solver = LapSolver::new();

    for _ in 0..400 {
        let n = rng.gen_range(1..=6);
        let regular = rng.gen_bool(0.8);
        let m = random_matrix(&mut rng, n, 0.3, regular);

        match (solver.solve(&m), brute_force(&m)) {
            (Ok(solution), Some(best)) => {
                assert_eq!(solution.cost, best);
                assert_optimal_certificate(&m, &solution);
            }
            (Err(err), None) => assert!(err.is_structural()),
            (got, expected) => panic!("solver {got:?} disagrees with brute force {expected:?}"),
        }
    }
}

#[test]
fn test_random_delta_matches_full_solve() {
    let mut rng = StdRng::seed_from_u64(42);
    let solver = LapSolver::new();

    for _ in 0..300 {
        let n = rng.gen_range(2..=8);
        let m = random_matrix(&mut rng, n, 0.35, true);
        let solution = solver.solve(&m).unwrap();

        let mut warm = PartialSolution::from(&solution);
        for i in 0..n {
            if rng.gen_bool(0.4) {
                warm.unassign_row(i).unwrap();
            }
        }
        let delta = solver.solve_delta(&m, &warm).unwrap();
        assert_eq!(delta.cost, solution.cost);
        assert_optimal_certificate(&m, &delta);
    }
}
