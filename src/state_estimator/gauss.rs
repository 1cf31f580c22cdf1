use crate::error::{FilterError, Result};
use nalgebra::{SMatrix, SVector};

/// Gaussian state estimate: mean `x` and covariance `P`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussParams<const N: usize> {
    pub x: SVector<f64, N>,
    pub P: SMatrix<f64, N, N>,
}

impl<const N: usize> GaussParams<N> {
    pub fn new(x: SVector<f64, N>, P: SMatrix<f64, N, N>) -> Self {
        GaussParams { x, P }
    }

    pub fn from_diagonal(x: SVector<f64, N>, variances: &SVector<f64, N>) -> Self {
        GaussParams {
            x,
            P: SMatrix::from_diagonal(variances),
        }
    }

    pub fn trace(&self) -> f64 {
        self.P.trace()
    }

    /// Frobenius norm of `P - Pᵀ`.
    pub fn asymmetry(&self) -> f64 {
        (self.P - self.P.transpose()).norm()
    }

    /// Normalized estimation error squared against a ground truth state.
    pub fn NEES(&self, x_gt: &SVector<f64, N>) -> Result<f64> {
        let x_err = self.x - x_gt;
        let P_inv_x_err = self
            .P
            .cholesky()
            .ok_or(FilterError::SingularCovariance)?
            .solve(&x_err);
        Ok(x_err.dot(&P_inv_x_err))
    }
}
