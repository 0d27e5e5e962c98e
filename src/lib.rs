//! # stochdiff: Strong-Order Integrators for Stochastic Differential Equations
//!
//! A Rust library for numerically integrating Ito and Stratonovich SDEs
//! dy = f(y,t) dt + G(y,t) dW with general (non-diagonal, non-commutative)
//! noise, producing sample trajectories with documented strong convergence
//! orders.
//!
//! ## Key Features
//!
//! - **General noise**: d-dimensional state, m independent Wiener channels,
//!   arbitrary noise coefficient matrices
//! - **Scheme family**: Euler-Maruyama, an implicit Euler family, a
//!   port-selective quasi-implicit Euler, Milstein (exact or numerically
//!   differentiated correction tensor), the Roessler order-1.0 strong SRK2
//!   pair (SRI2/SRS2), the Stratonovich Heun predictor-corrector, and the
//!   Kloeden-Platen two-step implicit scheme
//! - **Reproducible noise**: pass your own Wiener increments and repeated
//!   integrals, or let the crate generate them from a single seed
//! - **Validated up front**: shapes and grid spacing are checked before the
//!   first step; integrators never fail mid-run on a shape
//!
//! ## Quick Start
//!
//! ```rust
//! use ndarray::arr1;
//! use stochdiff::solvers::{ito_euler, EulerConfig};
//! use stochdiff::system::Sde;
//!
//! // Scalar linear Ito equation dy = -y dt + 0.5 y dW
//! let sde = Sde::scalar(|y, _t| -y, |y, _t| 0.5 * y);
//! let tspan: Vec<f64> = (0..101).map(|i| i as f64 * 0.01).collect();
//!
//! let traj = ito_euler(&sde, &arr1(&[1.0]), &tspan, &EulerConfig::default())
//!     .expect("valid problem");
//! assert_eq!(traj.y[[0, 0]], 1.0);
//! ```
//!
//! ## Mathematical Foundation
//!
//! Strong-order-1.0 schemes with non-commuting noise need the repeated
//! stochastic integrals I_ij (Ito) or J_ij (Stratonovich) alongside the
//! increments; the [`wiener`] module approximates them with the
//! Kloeden-Platen-Schurz series or the Wiktorsson tail-corrected variant.

// Module declarations
pub mod error;
pub mod math_utils;
pub mod normalize;
pub mod output;
pub mod rng;
pub mod solve;
pub mod solvers;
pub mod system;
pub mod wiener;

// Re-export commonly used types for convenience
pub use error::{SdeError, SdeResult};
pub use solvers::{integrate_ito, integrate_stratonovich, EquationType, Scheme, Trajectory};
pub use system::{Diffusion, Sde};
