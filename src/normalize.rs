// src/normalize.rs
//! Problem Normalizer
//!
//! Validation common to all integrators, run before any time-stepping:
//! derives the state dimension d and noise-channel count m from the first
//! evaluation of the system at (y0, t0), checks the time grid for uniform
//! spacing, and checks caller-supplied noise realizations against the
//! shapes the integrators will consume. Shape violations are rejected
//! here, never mid-integration.

use crate::error::{SdeError, SdeResult};
use crate::math_utils::is_close;
use crate::system::{Diffusion, Sde};
use ndarray::{Array1, Array2, Array3};

/// Dimensions derived from a validated problem
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dims {
    /// State dimension
    pub d: usize,
    /// Number of independent Wiener channels
    pub m: usize,
    /// Number of grid points
    pub n: usize,
    /// Uniform time step
    pub h: f64,
}

fn fmt_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(|s| s.to_string()).collect();
    format!("({})", dims.join(", "))
}

fn check_tspan(tspan: &[f64]) -> SdeResult<f64> {
    if tspan.len() < 2 {
        return Err(SdeError::InvalidTimeGrid {
            reason: format!("need at least 2 time points, got {}", tspan.len()),
        });
    }
    let mut min_diff = f64::INFINITY;
    let mut max_diff = f64::NEG_INFINITY;
    for w in tspan.windows(2) {
        let diff = w[1] - w[0];
        min_diff = min_diff.min(diff);
        max_diff = max_diff.max(diff);
    }
    if !(min_diff > 0.0) {
        return Err(SdeError::InvalidTimeGrid {
            reason: "time points must be strictly increasing".to_string(),
        });
    }
    if !is_close(min_diff, max_diff) {
        return Err(SdeError::InvalidTimeGrid {
            reason: format!(
                "time steps must be equally spaced (smallest step {}, largest step {})",
                min_diff, max_diff
            ),
        });
    }
    let n = tspan.len();
    Ok((tspan[n - 1] - tspan[0]) / (n - 1) as f64)
}

/// Validate a problem and derive its dimensions.
///
/// Checks, in order: the time grid, the drift shape against y0, the
/// diffusion shape (either calling convention), and any caller-supplied
/// Wiener increments dW of shape (n-1, m) or repeated-integral tensor
/// I/J of shape (n-1, m, m).
pub fn check_args(
    sde: &Sde,
    y0: &Array1<f64>,
    tspan: &[f64],
    dw: Option<&Array2<f64>>,
    ij: Option<&Array3<f64>>,
) -> SdeResult<Dims> {
    let h = check_tspan(tspan)?;
    let n = tspan.len();
    let t0 = tspan[0];

    let d = y0.len();
    let ftest = sde.drift(y0, t0);
    if ftest.len() != d {
        return Err(SdeError::ShapeMismatch {
            entity: "f(y0, t0)".to_string(),
            expected: fmt_shape(&[d]),
            actual: fmt_shape(&[ftest.len()]),
        });
    }

    let m = match sde.diffusion() {
        Diffusion::Matrix(g) => {
            let gtest = g(y0, t0);
            if gtest.nrows() != d {
                return Err(SdeError::ShapeMismatch {
                    entity: "G(y0, t0)".to_string(),
                    expected: format!("({}, m)", d),
                    actual: fmt_shape(gtest.shape()),
                });
            }
            gtest.ncols()
        }
        Diffusion::Columns(cols) => {
            for (k, g) in cols.iter().enumerate() {
                let gtest = g(y0, t0);
                if gtest.len() != d {
                    return Err(SdeError::ShapeMismatch {
                        entity: format!("G[{}](y0, t0)", k),
                        expected: fmt_shape(&[d]),
                        actual: fmt_shape(&[gtest.len()]),
                    });
                }
            }
            cols.len()
        }
    };

    if let Some(dw) = dw {
        if dw.shape() != &[n - 1, m] {
            return Err(SdeError::ShapeMismatch {
                entity: "dW".to_string(),
                expected: fmt_shape(&[n - 1, m]),
                actual: fmt_shape(dw.shape()),
            });
        }
    }
    if let Some(ij) = ij {
        if ij.shape() != &[n - 1, m, m] {
            return Err(SdeError::ShapeMismatch {
                entity: "I or J".to_string(),
                expected: fmt_shape(&[n - 1, m, m]),
                actual: fmt_shape(ij.shape()),
            });
        }
    }

    Ok(Dims { d, m, n, h })
}

/// Validate a Milstein correction tensor function against derived dims:
/// first axis d, last two axes equal and equal to m.
pub fn check_tensor(
    h_fn: &impl Fn(&Array1<f64>, f64) -> Array3<f64>,
    y0: &Array1<f64>,
    t0: f64,
    d: usize,
    m: usize,
) -> SdeResult<()> {
    let htest = h_fn(y0, t0);
    let shape = htest.shape().to_vec();
    if shape[0] != d || shape[1] != shape[2] || shape[1] != m {
        return Err(SdeError::ShapeMismatch {
            entity: "H(y0, t0)".to_string(),
            expected: fmt_shape(&[d, m, m]),
            actual: fmt_shape(&shape),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array2};

    fn linear_sde() -> Sde {
        Sde::new(
            |y: &Array1<f64>, _t| -y.clone(),
            |y: &Array1<f64>, _t| {
                let mut g = Array2::zeros((y.len(), 2));
                g.column_mut(0).assign(&(0.5 * y));
                g
            },
        )
    }

    fn tspan(n: usize, h: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * h).collect()
    }

    #[test]
    fn test_dims_derived() {
        let sde = linear_sde();
        let dims = check_args(&sde, &arr1(&[1.0, 2.0]), &tspan(11, 0.1), None, None).unwrap();
        assert_eq!(dims.d, 2);
        assert_eq!(dims.m, 2);
        assert_eq!(dims.n, 11);
        assert!((dims.h - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_irregular_grid_rejected() {
        let sde = linear_sde();
        let mut ts = tspan(11, 0.1);
        ts[5] += 0.03;
        let err = check_args(&sde, &arr1(&[1.0, 2.0]), &ts, None, None).unwrap_err();
        assert!(matches!(err, SdeError::InvalidTimeGrid { .. }));
    }

    #[test]
    fn test_dw_shape_rejected() {
        let sde = linear_sde();
        let dw = Array2::zeros((10, 3));
        let err =
            check_args(&sde, &arr1(&[1.0, 2.0]), &tspan(11, 0.1), Some(&dw), None).unwrap_err();
        match err {
            SdeError::ShapeMismatch { entity, expected, .. } => {
                assert_eq!(entity, "dW");
                assert_eq!(expected, "(10, 2)");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
