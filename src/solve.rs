// src/solve.rs
//! Nonlinear-Equation Solver
//!
//! A damped Newton root finder for vector residuals R(y) = 0, used by the
//! two-step implicit scheme to resolve each step's implicit equation. The
//! Jacobian is approximated by forward differences and each Newton system
//! is solved with an LU factorization; the step is halved (up to a fixed
//! number of times) whenever the full step does not reduce the residual.
//!
//! Failures never panic: non-convergence, a singular Jacobian, or a
//! non-finite residual are all reported through [`SolveReport`], and the
//! caller decides whether that is fatal.

use nalgebra::{DMatrix, DVector};
use ndarray::Array1;

/// Configuration for the Newton iteration
#[derive(Debug, Clone, Copy)]
pub struct RootSolver {
    /// Maximum Newton iterations before giving up
    pub max_iters: usize,
    /// Relative perturbation for the forward-difference Jacobian
    pub fd_eps: f64,
    /// Maximum step halvings per iteration
    pub max_halvings: usize,
}

impl Default for RootSolver {
    fn default() -> Self {
        RootSolver {
            max_iters: 50,
            fd_eps: 1e-8,
            max_halvings: 8,
        }
    }
}

/// Outcome of a root solve
#[derive(Debug, Clone)]
pub struct SolveReport {
    /// Best iterate found (the root when `converged` is true)
    pub root: Array1<f64>,
    pub converged: bool,
    pub message: String,
    pub iterations: usize,
}

impl RootSolver {
    /// Solve R(y) = 0 near `x0`.
    ///
    /// Convergence is declared when the Newton update satisfies
    /// `|Δy| <= xtol * (xtol + |y|)` or the residual norm drops below
    /// `xtol`, whichever comes first.
    pub fn solve<F>(&self, residual: F, x0: &Array1<f64>, xtol: f64) -> SolveReport
    where
        F: Fn(&Array1<f64>) -> Array1<f64>,
    {
        let d = x0.len();
        let mut x = x0.clone();
        let mut r = residual(&x);
        let mut rnorm = norm(&r);

        if !rnorm.is_finite() {
            return SolveReport {
                root: x,
                converged: false,
                message: "residual is not finite at the initial guess".to_string(),
                iterations: 0,
            };
        }

        for iter in 1..=self.max_iters {
            if rnorm <= xtol {
                return SolveReport {
                    root: x,
                    converged: true,
                    message: format!("residual norm {} below tolerance", rnorm),
                    iterations: iter - 1,
                };
            }

            let jac = self.jacobian(&residual, &x, &r);
            let rhs = DVector::from_iterator(d, r.iter().map(|v| -v));
            let delta = match jac.lu().solve(&rhs) {
                Some(delta) => delta,
                None => {
                    return SolveReport {
                        root: x,
                        converged: false,
                        message: "Jacobian is singular".to_string(),
                        iterations: iter,
                    };
                }
            };

            // damped update: halve until the residual shrinks
            let mut lambda = 1.0;
            let mut accepted = false;
            for _ in 0..=self.max_halvings {
                let trial: Array1<f64> =
                    Array1::from_iter(x.iter().zip(delta.iter()).map(|(xi, di)| xi + lambda * di));
                let r_trial = residual(&trial);
                let rnorm_trial = norm(&r_trial);
                if rnorm_trial.is_finite() && rnorm_trial < rnorm {
                    let step = lambda * delta.norm();
                    let xnorm = norm(&trial);
                    x = trial;
                    r = r_trial;
                    rnorm = rnorm_trial;
                    accepted = true;
                    if step <= xtol * (xtol + xnorm) {
                        return SolveReport {
                            root: x,
                            converged: true,
                            message: format!("step size {} below tolerance", step),
                            iterations: iter,
                        };
                    }
                    break;
                }
                lambda *= 0.5;
            }
            if !accepted {
                return SolveReport {
                    root: x,
                    converged: false,
                    message: format!(
                        "line search stalled at iteration {} (residual norm {})",
                        iter, rnorm
                    ),
                    iterations: iter,
                };
            }
        }

        SolveReport {
            root: x,
            converged: rnorm <= xtol,
            message: format!(
                "reached {} iterations with residual norm {}",
                self.max_iters, rnorm
            ),
            iterations: self.max_iters,
        }
    }

    /// Forward-difference Jacobian of the residual at x
    fn jacobian<F>(&self, residual: &F, x: &Array1<f64>, r0: &Array1<f64>) -> DMatrix<f64>
    where
        F: Fn(&Array1<f64>) -> Array1<f64>,
    {
        let d = x.len();
        let mut jac = DMatrix::zeros(d, d);
        for col in 0..d {
            let step = self.fd_eps * x[col].abs().max(1.0);
            let mut xp = x.clone();
            xp[col] += step;
            let rp = residual(&xp);
            for row in 0..d {
                jac[(row, col)] = (rp[row] - r0[row]) / step;
            }
        }
        jac
    }
}

fn norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_solves_smooth_system() {
        // x² + y² = 4, x - y = 0 → x = y = √2
        let solver = RootSolver::default();
        let report = solver.solve(
            |v: &Array1<f64>| arr1(&[v[0] * v[0] + v[1] * v[1] - 4.0, v[0] - v[1]]),
            &arr1(&[1.0, 0.5]),
            1e-10,
        );
        assert!(report.converged, "{}", report.message);
        let s = 2.0f64.sqrt();
        assert!((report.root[0] - s).abs() < 1e-6);
        assert!((report.root[1] - s).abs() < 1e-6);
    }

    #[test]
    fn test_reports_failure_without_panicking() {
        // x² + 1 = 0 has no real root
        let solver = RootSolver {
            max_iters: 20,
            ..Default::default()
        };
        let report = solver.solve(
            |v: &Array1<f64>| arr1(&[v[0] * v[0] + 1.0]),
            &arr1(&[3.0]),
            1e-12,
        );
        assert!(!report.converged);
        assert!(!report.message.is_empty());
    }

    #[test]
    fn test_linear_system_one_iteration() {
        let solver = RootSolver::default();
        let report = solver.solve(
            |v: &Array1<f64>| arr1(&[2.0 * v[0] - 3.0]),
            &arr1(&[0.0]),
            1e-12,
        );
        assert!(report.converged);
        assert!((report.root[0] - 1.5).abs() < 1e-9);
    }
}
