pub mod dynamic;
pub mod measurement;

use nalgebra::{SMatrix, SVector};

pub trait DynamicModel<const N: usize> {
    fn f(&self, x: &SVector<f64, N>, ts: f64) -> SVector<f64, N>;
    fn F(&self, x: &SVector<f64, N>, ts: f64) -> SMatrix<f64, N, N>;
    fn Q(&self, x: &SVector<f64, N>, ts: f64) -> SMatrix<f64, N, N>;
}

pub trait MeasurementModel<const N: usize, const M: usize> {
    fn h(&self, x: &SVector<f64, N>) -> SVector<f64, M>;
    fn H(&self, x: &SVector<f64, N>) -> SMatrix<f64, M, N>;
    fn R(&self, x: &SVector<f64, N>, z: &SVector<f64, M>) -> SMatrix<f64, M, M>;
}
