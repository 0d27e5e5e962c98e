// src/math_utils.rs
use ndarray::Array1;
use statrs::function::erf;
use std::f64::consts::SQRT_2;

pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf::erf(x / SQRT_2))
}

/// Approximate floating-point equality, |a - b| <= atol + rtol*|b|
pub fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

/// Euclidean norm of a state vector
pub fn l2_norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}
