use super::DynamicModel;
use nalgebra::{Matrix3, Matrix4, Matrix4x2, Vector2, Vector3, Vector4};

/// Constant velocity on `[x, y, vx, vy]` with an optional acceleration input `u`.
#[derive(Debug, Clone)]
pub struct CV {
    // Acceleration noise standard deviation
    sigma_a: f64,
    u: Vector2<f64>,
}

impl CV {
    pub fn new(sigma_a: f64) -> Self {
        CV {
            sigma_a,
            u: Vector2::zeros(),
        }
    }

    pub fn with_control(sigma_a: f64, u: Vector2<f64>) -> Self {
        CV { sigma_a, u }
    }

    pub fn control(&self) -> &Vector2<f64> {
        &self.u
    }

    pub fn A(ts: f64) -> Matrix4<f64> {
        let mut A = Matrix4::identity();
        A[(0, 2)] = ts;
        A[(1, 3)] = ts;
        A
    }

    pub fn B(ts: f64) -> Matrix4x2<f64> {
        let half_ts2 = ts.powi(2) / 2.0;
        Matrix4x2::new(
            half_ts2, 0.,
            0., half_ts2,
            ts, 0.,
            0., ts,
        )
    }
}

impl DynamicModel<4> for CV {
    fn f(&self, x: &Vector4<f64>, ts: f64) -> Vector4<f64> {
        Self::A(ts) * x + Self::B(ts) * self.u
    }

    fn F(&self, _x: &Vector4<f64>, ts: f64) -> Matrix4<f64> {
        Self::A(ts)
    }

    // Discrete white noise acceleration. Every term carries a power of ts, so Q vanishes at ts = 0.
    fn Q(&self, _x: &Vector4<f64>, ts: f64) -> Matrix4<f64> {
        let q11 = ts.powi(4) / 4.0;
        let q12 = ts.powi(3) / 2.0;
        let q22 = ts.powi(2);
        Matrix4::new(
            q11, 0., q12, 0.,
            0., q11, 0., q12,
            q12, 0., q22, 0.,
            0., q12, 0., q22,
        ) * self.sigma_a.powi(2)
    }
}

/// Circular motion on polar state `[r, theta, omega]`: constant radius and angular velocity.
///
/// Only meaningful for trajectories that actually are circles about the origin.
#[derive(Debug, Clone)]
pub struct CircularPolar {
    var_r: f64,
    var_theta: f64,
    var_omega: f64,
}

impl CircularPolar {
    pub fn new(var_r: f64, var_theta: f64, sigma_omega: f64) -> Self {
        CircularPolar {
            var_r,
            var_theta,
            var_omega: sigma_omega.powi(2),
        }
    }
}

impl DynamicModel<3> for CircularPolar {
    // Theta is left unwrapped, h() wraps it through cos/sin.
    fn f(&self, x: &Vector3<f64>, ts: f64) -> Vector3<f64> {
        let r = x[0];
        let theta = x[1];
        let omega = x[2];
        Vector3::new(r, theta + omega * ts, omega)
    }

    fn F(&self, _x: &Vector3<f64>, ts: f64) -> Matrix3<f64> {
        Matrix3::new(
            1., 0., 0.,
            0., 1., ts,
            0., 0., 1.,
        )
    }

    // Per-step noise, independent of ts.
    fn Q(&self, _x: &Vector3<f64>, _ts: f64) -> Matrix3<f64> {
        Matrix3::from_diagonal(&Vector3::new(self.var_r, self.var_theta, self.var_omega))
    }
}
