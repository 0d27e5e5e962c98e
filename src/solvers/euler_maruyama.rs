// src/solvers/euler_maruyama.rs
//! Euler-Maruyama Scheme for SDE Integration
//!
//! # Mathematical Framework
//!
//! For a general Ito SDE:
//! ```text
//! dy = f(y, t) dt + G(y, t) dW
//! ```
//!
//! with d-dimensional state and m independent Wiener channels, the
//! Euler-Maruyama scheme provides the discretization:
//! ```text
//! y_{n+1} = y_n + f(y_n, t_n) h + G(y_n, t_n) ΔW_n
//! ```
//!
//! # Convergence Properties
//!
//! - **Strong convergence**: Order 0.5 in step size
//! - **Weak convergence**: Order 1.0 in step size
//! - **Stability**: Conditionally stable (depends on drift/diffusion)
//!
//! # Use Cases
//!
//! - General-purpose SDE solver
//! - Cheapest scheme per step; the baseline the others are measured against

use crate::error::{validation::validate_downsample, SdeResult};
use crate::math_utils::l2_norm;
use crate::normalize::check_args;
use crate::rng::RngFactory;
use crate::solvers::{Recorder, Trajectory};
use crate::system::Sde;
use crate::wiener::delta_w;
use ndarray::{Array1, Array2};

/// Options for [`ito_euler`]
pub struct EulerConfig {
    /// Pre-realized Wiener increments of shape (N-1, m); generated from
    /// `seed` when absent
    pub dw: Option<Array2<f64>>,
    /// Project the state onto the unit sphere after every step
    pub normalized: bool,
    /// Retain every k-th step (step 0 always retained)
    pub downsample: usize,
    /// Seed for internally generated increments
    pub seed: u64,
}

impl Default for EulerConfig {
    fn default() -> Self {
        EulerConfig {
            dw: None,
            normalized: false,
            downsample: 1,
            seed: 12345,
        }
    }
}

/// Integrate the Ito equation dy = f dt + G dW with the Euler-Maruyama
/// scheme. Deterministic given (f, G, y0, dW).
pub fn ito_euler(
    sde: &Sde,
    y0: &Array1<f64>,
    tspan: &[f64],
    cfg: &EulerConfig,
) -> SdeResult<Trajectory> {
    let dims = check_args(sde, y0, tspan, cfg.dw.as_ref(), None)?;
    validate_downsample(cfg.downsample)?;
    let (m, n, h) = (dims.m, dims.n, dims.h);

    let generated;
    let dw = match cfg.dw.as_ref() {
        Some(dw) => dw,
        None => {
            generated = delta_w(n - 1, m, h, &RngFactory::new(cfg.seed));
            &generated
        }
    };

    let mut rec = Recorder::new(n, cfg.downsample, y0, tspan[0], false);
    let mut y = y0.clone();
    for step in 0..n - 1 {
        let tn = tspan[step];
        let dwn = dw.row(step).to_owned();
        let fn_ = sde.drift(&y, tn);
        let gn = sde.diffusion_matrix(&y, tn);

        let mut y_next = &y + &(fn_ * h) + gn.dot(&dwn);
        if cfg.normalized {
            y_next /= l2_norm(&y_next);
        }
        rec.record(step, tspan[step + 1], &y_next);
        y = y_next;
    }
    Ok(rec.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_zero_noise_is_forward_euler() {
        // dy = -y dt with G == 0 must reduce to the deterministic rule
        // y_{n+1} = (1 - h) y_n
        let sde = Sde::new(
            |y: &Array1<f64>, _t| -y.clone(),
            |_y: &Array1<f64>, _t| arr2(&[[0.0]]),
        );
        let tspan: Vec<f64> = (0..11).map(|i| i as f64 * 0.1).collect();
        let y0 = Array1::from_elem(1, 1.0);

        let traj = ito_euler(&sde, &y0, &tspan, &EulerConfig::default()).unwrap();
        let mut expected = 1.0;
        for row in 1..traj.len() {
            expected *= 1.0 - 0.1;
            assert!((traj.y[[row, 0]] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_first_row_is_initial_state() {
        let sde = Sde::scalar(|y, _t| -y, |y, _t| 0.5 * y);
        let tspan: Vec<f64> = (0..101).map(|i| i as f64 * 0.01).collect();
        let y0 = Array1::from_elem(1, 0.3);

        let traj = ito_euler(&sde, &y0, &tspan, &EulerConfig::default()).unwrap();
        assert_eq!(traj.y[[0, 0]], 0.3);
        assert_eq!(traj.len(), 101);
    }
}
