// src/solvers/mod.rs
//! Time-stepping integrators and the default-scheme dispatcher.
//!
//! Every integrator takes the system definition, the initial state, the
//! uniform time grid and a per-scheme config struct, and returns a
//! [`Trajectory`] (or a validation error before any stepping happens).
//! [`integrate_ito`] and [`integrate_stratonovich`] pick the default
//! strong scheme for each calculus.

pub mod euler_maruyama;
pub mod heun;
pub mod implicit_euler;
pub mod kp2is;
pub mod milstein;
pub mod srk2;

pub use euler_maruyama::{ito_euler, EulerConfig};
pub use heun::{strat_heun, HeunConfig};
pub use implicit_euler::{
    ito_implicit_euler, ito_quasi_implicit_euler, ImplicitEulerConfig, ImplicitType,
    QuasiImplicitEulerConfig,
};
pub use kp2is::{strat_kp2is, Kp2isConfig};
pub use milstein::{
    correction_tensor_numerical, ito_milstein, ito_milstein_numerical, MilsteinConfig,
    NumMilsteinConfig,
};
pub use srk2::{ito_sri2, strat_srs2, Sri2Config, Srs2Config};

use crate::error::SdeResult;
use crate::math_utils::l2_norm;
use crate::system::Sde;
use ndarray::{Array1, Array2};

/// Result of one integration call
#[derive(Debug, Clone)]
pub struct Trajectory {
    /// Retained time points (the full grid, or every k-th point when
    /// downsampling)
    pub t: Array1<f64>,
    /// One state row per retained time point; the first row is y0
    pub y: Array2<f64>,
    /// Post-step, pre-normalization state norms, for the integrators that
    /// record them
    pub norms: Option<Array1<f64>>,
}

impl Trajectory {
    /// Number of retained rows
    pub fn len(&self) -> usize {
        self.y.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.y.nrows() == 0
    }

    /// Final retained state
    pub fn last(&self) -> Array1<f64> {
        self.y.row(self.y.nrows() - 1).to_owned()
    }
}

/// Downsampling recorder shared by the integrators.
///
/// Row 0 always holds y0 unmodified; the result of step n (the state
/// y_{n+1}) is retained at row (n+1)/k exactly when (n+1) % k == 0, giving
/// floor((N-1)/k) + 1 retained rows whose times are t_0, t_k, t_2k, ...
pub(crate) struct Recorder {
    downsample: usize,
    t: Array1<f64>,
    y: Array2<f64>,
    norms: Option<Array1<f64>>,
}

impl Recorder {
    pub(crate) fn new(
        n: usize,
        downsample: usize,
        y0: &Array1<f64>,
        t0: f64,
        with_norms: bool,
    ) -> Self {
        let n_record = (n - 1) / downsample + 1;
        let mut t = Array1::zeros(n_record);
        let mut y = Array2::zeros((n_record, y0.len()));
        t[0] = t0;
        y.row_mut(0).assign(y0);
        let norms = if with_norms {
            let mut norms = Array1::zeros(n_record);
            norms[0] = l2_norm(y0);
            Some(norms)
        } else {
            None
        };
        Recorder {
            downsample,
            t,
            y,
            norms,
        }
    }

    /// Record the result of step n (0-based), i.e. the state at t_{n+1}
    pub(crate) fn record(&mut self, step: usize, t_next: f64, y_next: &Array1<f64>) {
        if (step + 1) % self.downsample == 0 {
            let idx = (step + 1) / self.downsample;
            self.t[idx] = t_next;
            self.y.row_mut(idx).assign(y_next);
        }
    }

    /// Record a step together with its pre-normalization norm
    pub(crate) fn record_with_norm(
        &mut self,
        step: usize,
        t_next: f64,
        y_next: &Array1<f64>,
        norm: f64,
    ) {
        if (step + 1) % self.downsample == 0 {
            let idx = (step + 1) / self.downsample;
            if let Some(norms) = self.norms.as_mut() {
                norms[idx] = norm;
            }
        }
        self.record(step, t_next, y_next);
    }

    pub(crate) fn finish(self) -> Trajectory {
        Trajectory {
            t: self.t,
            y: self.y,
            norms: self.norms,
        }
    }
}

/// Which stochastic calculus an equation is posed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquationType {
    Ito,
    Stratonovich,
}

/// Named integration schemes offered by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    EulerMaruyama,
    ImplicitEuler,
    QuasiImplicitEuler,
    Milstein,
    Sri2,
    Heun,
    Srs2,
    Kp2is,
}

/// The fixed default strong scheme for each calculus: a pure, stateless
/// mapping with no process-wide configuration behind it.
pub fn default_scheme(equation: EquationType) -> Scheme {
    match equation {
        EquationType::Ito => Scheme::Sri2,
        EquationType::Stratonovich => Scheme::Srs2,
    }
}

/// Integrate an Ito equation dy = f dt + G dW with the default strong
/// scheme (order-1.0 SRI2).
pub fn integrate_ito(
    sde: &Sde,
    y0: &Array1<f64>,
    tspan: &[f64],
    normalized: bool,
    seed: u64,
) -> SdeResult<Trajectory> {
    ito_sri2(
        sde,
        y0,
        tspan,
        &Sri2Config {
            normalized,
            seed,
            ..Default::default()
        },
    )
}

/// Integrate a Stratonovich equation dy = f dt + G ∘ dW with the default
/// strong scheme (order-1.0 SRS2).
pub fn integrate_stratonovich(
    sde: &Sde,
    y0: &Array1<f64>,
    tspan: &[f64],
    normalized: bool,
    seed: u64,
) -> SdeResult<Trajectory> {
    strat_srs2(
        sde,
        y0,
        tspan,
        &Srs2Config {
            normalized,
            seed,
            ..Default::default()
        },
    )
}
