// src/system.rs
//! System Definition for Vector SDEs
//!
//! An SDE  dy = f(y,t) dt + G(y,t) dW  is described by a drift function
//! returning a length-d vector and a diffusion function returning a d x m
//! matrix of noise coefficients. The diffusion can be given either as one
//! matrix-valued function or as m separate column functions; integrators
//! that need per-column access switch on the [`Diffusion`] tag instead of
//! probing types at runtime.
//!
//! Scalar equations are promoted here, at construction: [`Sde::scalar`]
//! wraps scalar drift/diffusion closures into length-1 vector and 1x1
//! matrix adapters, so every integrator only ever sees vector shapes.

use ndarray::{arr1, Array1, Array2, Array3};

/// Drift function f(y, t) -> vector of length d
pub type DriftFn = Box<dyn Fn(&Array1<f64>, f64) -> Array1<f64>>;
/// Matrix-valued diffusion function G(y, t) -> d x m matrix
pub type MatrixFn = Box<dyn Fn(&Array1<f64>, f64) -> Array2<f64>>;
/// Single diffusion column g_k(y, t) -> vector of length d
pub type ColumnFn = Box<dyn Fn(&Array1<f64>, f64) -> Array1<f64>>;
/// Milstein correction tensor H(y, t) -> (d, m, m) tensor
pub type TensorFn = Box<dyn Fn(&Array1<f64>, f64) -> Array3<f64>>;

/// Noise-coefficient function, in one of its two calling conventions
pub enum Diffusion {
    /// A single function returning the whole d x m matrix
    Matrix(MatrixFn),
    /// m separate functions, each returning one length-d column
    Columns(Vec<ColumnFn>),
}

impl Diffusion {
    pub fn from_matrix_fn(
        g: impl Fn(&Array1<f64>, f64) -> Array2<f64> + 'static,
    ) -> Self {
        Diffusion::Matrix(Box::new(g))
    }

    pub fn from_columns(cols: Vec<ColumnFn>) -> Self {
        Diffusion::Columns(cols)
    }

    /// True when given as separate column functions
    pub fn is_columns(&self) -> bool {
        matches!(self, Diffusion::Columns(_))
    }

    /// Assemble the full d x m matrix at (y, t)
    pub fn matrix(&self, y: &Array1<f64>, t: f64) -> Array2<f64> {
        match self {
            Diffusion::Matrix(g) => g(y, t),
            Diffusion::Columns(cols) => {
                let (d, m) = (y.len(), cols.len());
                let mut gn = Array2::zeros((d, m));
                for (k, g) in cols.iter().enumerate() {
                    gn.column_mut(k).assign(&g(y, t));
                }
                gn
            }
        }
    }

    /// Evaluate column k at (y, t)
    pub fn column(&self, k: usize, y: &Array1<f64>, t: f64) -> Array1<f64> {
        match self {
            Diffusion::Matrix(g) => g(y, t).column(k).to_owned(),
            Diffusion::Columns(cols) => cols[k](y, t),
        }
    }
}

/// A stochastic differential equation dy = f(y,t) dt + G(y,t) dW
pub struct Sde {
    drift: DriftFn,
    diffusion: Diffusion,
}

impl Sde {
    /// Vector system with matrix-valued diffusion
    pub fn new(
        f: impl Fn(&Array1<f64>, f64) -> Array1<f64> + 'static,
        g: impl Fn(&Array1<f64>, f64) -> Array2<f64> + 'static,
    ) -> Self {
        Sde {
            drift: Box::new(f),
            diffusion: Diffusion::from_matrix_fn(g),
        }
    }

    /// Vector system with diffusion given as m column functions
    pub fn with_columns(
        f: impl Fn(&Array1<f64>, f64) -> Array1<f64> + 'static,
        cols: Vec<ColumnFn>,
    ) -> Self {
        Sde {
            drift: Box::new(f),
            diffusion: Diffusion::Columns(cols),
        }
    }

    /// Scalar equation dy = f(y,t) dt + g(y,t) dW, promoted to a
    /// one-dimensional vector system
    pub fn scalar(
        f: impl Fn(f64, f64) -> f64 + 'static,
        g: impl Fn(f64, f64) -> f64 + 'static,
    ) -> Self {
        Sde {
            drift: Box::new(move |y, t| arr1(&[f(y[0], t)])),
            diffusion: Diffusion::Matrix(Box::new(move |y, t| {
                Array2::from_elem((1, 1), g(y[0], t))
            })),
        }
    }

    pub fn drift(&self, y: &Array1<f64>, t: f64) -> Array1<f64> {
        (self.drift)(y, t)
    }

    pub fn diffusion(&self) -> &Diffusion {
        &self.diffusion
    }

    /// Full diffusion matrix at (y, t)
    pub fn diffusion_matrix(&self, y: &Array1<f64>, t: f64) -> Array2<f64> {
        self.diffusion.matrix(y, t)
    }
}

/// Wrap a scalar initial value into the length-1 state vector that the
/// promoted system expects
pub fn scalar_state(y0: f64) -> Array1<f64> {
    arr1(&[y0])
}

/// Build a correction tensor closure from a plain function
pub fn tensor_fn(h: impl Fn(&Array1<f64>, f64) -> Array3<f64> + 'static) -> TensorFn {
    Box::new(h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_columns_assemble_to_matrix() {
        let cols: Vec<ColumnFn> = vec![
            Box::new(|y: &Array1<f64>, _t| arr1(&[y[0], 0.0])),
            Box::new(|y: &Array1<f64>, _t| arr1(&[0.0, 2.0 * y[1]])),
        ];
        let diff = Diffusion::from_columns(cols);
        let y = arr1(&[3.0, 4.0]);

        let gn = diff.matrix(&y, 0.0);
        assert_eq!(gn, arr2(&[[3.0, 0.0], [0.0, 8.0]]));
        assert_eq!(diff.column(1, &y, 0.0), arr1(&[0.0, 8.0]));
    }

    #[test]
    fn test_matrix_column_access() {
        let diff =
            Diffusion::from_matrix_fn(|y: &Array1<f64>, _t| arr2(&[[y[0], 1.0], [2.0, y[1]]]));
        let y = arr1(&[5.0, 7.0]);

        assert_eq!(diff.column(0, &y, 0.0), arr1(&[5.0, 2.0]));
        assert!(!diff.is_columns());
    }

    #[test]
    fn test_scalar_promotion_shapes() {
        let sde = Sde::scalar(|y, _t| -y, |y, _t| 0.5 * y);
        let y0 = scalar_state(2.0);

        assert_eq!(sde.drift(&y0, 0.0), arr1(&[-2.0]));
        assert_eq!(sde.diffusion_matrix(&y0, 0.0), arr2(&[[1.0]]));
    }
}
