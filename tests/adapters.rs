//! Tests for the operator and preconditioner adapters driving the solver.
//!
//! The engine must behave identically whether A and M are explicit matrices
//! or caller-supplied apply/solve functions, and pre-flight dimension checks
//! must reject mismatched adapters before any iteration runs.

use approx::assert_abs_diff_eq;
use faer::Mat;
use hgmres::error::GmresError;
use hgmres::operator::{FnOperator, MatOperator};
use hgmres::preconditioner::{FnPrecond, MatrixPrecond};
use hgmres::solver::GmresSolver;

fn laplacian_1d(n: usize) -> Mat<f64> {
    Mat::from_fn(n, n, |i, j| {
        if i == j {
            2.0
        } else if i.abs_diff(j) == 1 {
            -1.0
        } else {
            0.0
        }
    })
}

#[test]
fn matrix_free_operator_matches_explicit_matrix() {
    let n = 16;
    let a = laplacian_1d(n);
    let b = Mat::from_fn(n, 1, |i, _| ((i + 1) as f64).sin());
    let solver = GmresSolver::new().with_tol(1e-10).with_maxit(n);

    let explicit = solver
        .solve(&MatOperator::new(a.clone()), &b, None, None, None)
        .unwrap();

    // same stencil as an apply callable, no matrix formed
    let stencil = FnOperator::new(n, |x: &Mat<f64>, y: &mut Mat<f64>| {
        for j in 0..x.ncols() {
            for i in 0..x.nrows() {
                let left = if i > 0 { x[(i - 1, j)] } else { 0.0 };
                let right = if i + 1 < x.nrows() { x[(i + 1, j)] } else { 0.0 };
                y[(i, j)] = 2.0 * x[(i, j)] - left - right;
            }
        }
    });
    let matrix_free = solver.solve(&stencil, &b, None, None, None).unwrap();

    assert_eq!(explicit.flag.code(), 0);
    assert_eq!(matrix_free.flag.code(), 0);
    for i in 0..n {
        assert_abs_diff_eq!(explicit.x[(i, 0)], matrix_free.x[(i, 0)], epsilon = 1e-6);
    }
}

#[test]
fn callable_preconditioner_accelerates_like_matrix_form() {
    let n = 12;
    let a = Mat::from_fn(n, n, |i, j| {
        if i == j {
            (i + 1) as f64 * 2.0
        } else if i.abs_diff(j) == 1 {
            0.5
        } else {
            0.0
        }
    });
    let b = Mat::from_fn(n, 1, |i, _| 1.0 + i as f64);
    let op = MatOperator::new(a.clone());
    let solver = GmresSolver::new().with_tol(1e-10).with_maxit(n);

    let m = Mat::from_fn(n, n, |i, j| if i == j { (i + 1) as f64 * 2.0 } else { 0.0 });
    let as_matrix = MatrixPrecond::new(m);
    let sol_matrix = solver.solve(&op, &b, Some(&as_matrix), None, None).unwrap();

    let as_fn = FnPrecond::new(n, |r: &Mat<f64>, z: &mut Mat<f64>| {
        for j in 0..r.ncols() {
            for i in 0..r.nrows() {
                z[(i, j)] = r[(i, j)] / ((i + 1) as f64 * 2.0);
            }
        }
    });
    let sol_fn = solver.solve(&op, &b, Some(&as_fn), None, None).unwrap();

    assert_eq!(sol_matrix.flag.code(), 0);
    assert_eq!(sol_fn.flag.code(), 0);
    for i in 0..n {
        assert_abs_diff_eq!(sol_matrix.x[(i, 0)], sol_fn.x[(i, 0)], epsilon = 1e-6);
    }
}

#[test]
fn two_preconditioners_compose_in_sequence() {
    let n = 10;
    let a = Mat::from_fn(n, n, |i, j| {
        if i == j {
            6.0
        } else if i.abs_diff(j) == 1 {
            1.0
        } else {
            0.0
        }
    });
    let b = Mat::from_fn(n, 1, |i, _| (i % 3) as f64 + 1.0);
    let op = MatOperator::new(a.clone());

    // M = M1·M2 split as two diagonal factors: composed solve must match the
    // single-preconditioner run
    let m1 = FnPrecond::new(n, |r: &Mat<f64>, z: &mut Mat<f64>| {
        for j in 0..r.ncols() {
            for i in 0..r.nrows() {
                z[(i, j)] = r[(i, j)] / 2.0;
            }
        }
    });
    let m2 = FnPrecond::new(n, |r: &Mat<f64>, z: &mut Mat<f64>| {
        for j in 0..r.ncols() {
            for i in 0..r.nrows() {
                z[(i, j)] = r[(i, j)] / 3.0;
            }
        }
    });
    let combined = FnPrecond::new(n, |r: &Mat<f64>, z: &mut Mat<f64>| {
        for j in 0..r.ncols() {
            for i in 0..r.nrows() {
                z[(i, j)] = r[(i, j)] / 6.0;
            }
        }
    });

    let solver = GmresSolver::new().with_tol(1e-10).with_maxit(n);
    let split = solver.solve(&op, &b, Some(&m1), Some(&m2), None).unwrap();
    let merged = solver.solve(&op, &b, Some(&combined), None, None).unwrap();

    assert_eq!(split.flag.code(), 0);
    assert_eq!(merged.flag.code(), 0);
    for i in 0..n {
        assert_abs_diff_eq!(split.x[(i, 0)], merged.x[(i, 0)], epsilon = 1e-8);
    }
}

#[test]
fn exact_inverse_preconditioner_converges_in_one_step() {
    let n = 9;
    let a = laplacian_1d(n);
    let b = Mat::from_fn(n, 1, |i, _| (i as f64) - 4.0);
    let op = MatOperator::new(a.clone());
    let pc = MatrixPrecond::new(a);
    let sol = GmresSolver::new()
        .with_tol(1e-10)
        .solve(&op, &b, Some(&pc), None, None)
        .unwrap();
    assert_eq!(sol.flag.code(), 0);
    assert_eq!(sol.iter.0, 1);
    assert!(sol.iter.1 <= 2, "iter = {:?}", sol.iter);
}

#[test]
fn mismatched_preconditioner_is_rejected_preflight() {
    let op = MatOperator::new(laplacian_1d(6));
    let b = Mat::from_fn(6, 1, |_, _| 1.0);
    let pc = MatrixPrecond::new(laplacian_1d(5));
    let err = GmresSolver::<f64>::new().solve(&op, &b, None, Some(&pc), None);
    match err {
        Err(GmresError::Dimension { what, expected, found }) => {
            assert_eq!(what, "second preconditioner");
            assert_eq!(expected, 6);
            assert_eq!(found, 5);
        }
        other => panic!("expected dimension error, got {other:?}"),
    }
}
