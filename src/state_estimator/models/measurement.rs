use super::MeasurementModel;
use nalgebra::{Matrix2, Matrix2x3, Matrix2x4, Vector2, Vector3, Vector4};

fn diagonal_R(sigma_x: f64, sigma_y: f64) -> Matrix2<f64> {
    Matrix2::new(sigma_x.powi(2), 0., 0., sigma_y.powi(2))
}

#[derive(Debug, Clone)]
pub struct CartesianPosition {
    sigma_x: f64,
    sigma_y: f64,
}

impl CartesianPosition {
    pub fn new(sigma_x: f64, sigma_y: f64) -> Self {
        CartesianPosition { sigma_x, sigma_y }
    }
}

impl MeasurementModel<4, 2> for CartesianPosition {
    /// Assumes p is the first state
    fn h(&self, x: &Vector4<f64>) -> Vector2<f64> {
        Vector2::new(x[0], x[1])
    }

    fn H(&self, _x: &Vector4<f64>) -> Matrix2x4<f64> {
        Matrix2x4::identity()
    }

    fn R(&self, _x: &Vector4<f64>, _z: &Vector2<f64>) -> Matrix2<f64> {
        diagonal_R(self.sigma_x, self.sigma_y)
    }
}

/// Cartesian position observed from polar state `[r, theta, omega]`.
#[derive(Debug, Clone)]
pub struct PolarPosition {
    sigma_x: f64,
    sigma_y: f64,
}

impl PolarPosition {
    pub fn new(sigma_x: f64, sigma_y: f64) -> Self {
        PolarPosition { sigma_x, sigma_y }
    }
}

impl MeasurementModel<3, 2> for PolarPosition {
    fn h(&self, x: &Vector3<f64>) -> Vector2<f64> {
        let (r, theta) = (x[0], x[1]);
        Vector2::new(r * theta.cos(), r * theta.sin())
    }

    // The theta column scales with r, so at r = 0 the angle is unobservable.
    fn H(&self, x: &Vector3<f64>) -> Matrix2x3<f64> {
        let (r, theta) = (x[0], x[1]);
        let (sth, cth) = theta.sin_cos();
        Matrix2x3::new(
            cth, -r * sth, 0.,
            sth, r * cth, 0.,
        )
    }

    fn R(&self, _x: &Vector3<f64>, _z: &Vector2<f64>) -> Matrix2<f64> {
        diagonal_R(self.sigma_x, self.sigma_y)
    }
}
