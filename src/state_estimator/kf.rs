use super::ekf::EKF;
use super::gauss::GaussParams;
use super::models::dynamic::CV;
use super::models::measurement::CartesianPosition;
use super::{Position, StateEstimator};
use crate::config::LinearKfConfig;
use crate::consistency::Consistency;
use crate::error::{FilterError, Result};
use nalgebra::{Vector2, Vector4};
use tracing::{debug, trace};

/// Linear Kalman filter on `[x, y, vx, vy]` with a constant velocity model.
#[derive(Debug, Clone)]
pub struct LinearKalmanFilter {
    filter: EKF<CV, CartesianPosition>,
    dt: f64,
    state: GaussParams<4>,
}

impl LinearKalmanFilter {
    pub fn new(config: &LinearKfConfig) -> Result<Self> {
        config.validate()?;

        let dynmod = CV::with_control(config.std_acc, Vector2::from(config.control));
        let measmod = CartesianPosition::new(config.x_std_meas, config.y_std_meas);
        let state = GaussParams::from_diagonal(
            Vector4::from(config.initial_state),
            &Vector4::from(config.initial_variance),
        );
        debug!(
            dt = config.dt,
            x = state.x[0],
            y = state.x[1],
            "linear Kalman filter initialised"
        );

        Ok(LinearKalmanFilter {
            filter: EKF::init(dynmod, measmod),
            dt: config.dt,
            state,
        })
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Predict over `ts` instead of the configured timestep. Zero leaves the estimate as is.
    pub fn predict_by(&mut self, ts: f64) -> Result<Position> {
        if !(ts.is_finite() && ts >= 0.0) {
            return Err(FilterError::InvalidConfiguration(format!(
                "prediction interval must be finite and >= 0, got {}",
                ts
            )));
        }
        self.state = self.filter.predict(&self.state, ts);
        trace!(x = self.state.x[0], y = self.state.x[1], "kf predict");
        Ok(self.position())
    }

    pub fn velocity(&self) -> Vector2<f64> {
        Vector2::new(self.state.x[2], self.state.x[3])
    }
}

impl StateEstimator for LinearKalmanFilter {
    type Params = GaussParams<4>;

    fn predict(&mut self) -> Position {
        self.state = self.filter.predict(&self.state, self.dt);
        trace!(x = self.state.x[0], y = self.state.x[1], "kf predict");
        self.position()
    }

    fn update(&mut self, z: &Position) -> Result<Position> {
        self.state = self.filter.update(z, &self.state)?;
        trace!(x = self.state.x[0], y = self.state.x[1], "kf update");
        Ok(self.position())
    }

    fn estimate(&self) -> &GaussParams<4> {
        &self.state
    }

    fn position(&self) -> Position {
        Vector2::new(self.state.x[0], self.state.x[1])
    }
}

impl Consistency for LinearKalmanFilter {
    type Measurement = Position;
    type GroundTruth = Vector4<f64>;

    fn NIS(&self, z: &Position) -> Result<f64> {
        self.filter.NIS(&self.state, z)
    }

    fn NEES(&self, x_gt: &Vector4<f64>) -> Result<f64> {
        self.state.NEES(x_gt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix4;

    fn config() -> LinearKfConfig {
        LinearKfConfig {
            dt: 0.1,
            std_acc: 1.55,
            x_std_meas: 3.0,
            y_std_meas: 3.0,
            initial_state: [10., 0., 0., 0.],
            ..LinearKfConfig::default()
        }
    }

    #[test]
    fn test_exact_predict_step() {
        let mut kf = LinearKalmanFilter::new(&config()).unwrap();
        let p = kf.predict();
        assert_eq!(p, Vector2::new(10.0, 0.0));
    }

    #[test]
    fn test_predict_covariance() {
        let mut kf = LinearKalmanFilter::new(&config()).unwrap();
        kf.predict();
        let dt: f64 = 0.1;
        let q = 1.55f64.powi(2);
        let p11 = 1. + dt * dt + q * dt.powi(4) / 4.;
        let p13 = dt + q * dt.powi(3) / 2.;
        let p33 = 1. + q * dt * dt;
        let P_correct = Matrix4::new(
            p11, 0., p13, 0.,
            0., p11, 0., p13,
            p13, 0., p33, 0.,
            0., p13, 0., p33,
        );
        assert!(P_correct.relative_eq(&kf.estimate().P, 1e-12, 1e-12));
    }

    #[test]
    fn test_control_input() {
        let config = LinearKfConfig {
            control: [2., 0.],
            ..config()
        };
        let mut kf = LinearKalmanFilter::new(&config).unwrap();
        let p = kf.predict();
        assert!(Vector2::new(10.01, 0.).relative_eq(&p, 1e-12, 1e-12));
        assert!(Vector2::new(0.2, 0.).relative_eq(&kf.velocity(), 1e-12, 1e-12));
    }

    #[test]
    fn test_zero_interval_is_identity() {
        let config = LinearKfConfig {
            initial_state: [1., 2., 3., 4.],
            control: [0.5, -0.5],
            ..config()
        };
        let mut kf = LinearKalmanFilter::new(&config).unwrap();
        kf.step(&Vector2::new(1.5, 2.5)).unwrap();
        let before = kf.estimate().clone();
        kf.predict_by(0.0).unwrap();
        assert_eq!(kf.estimate(), &before);
    }

    #[test]
    fn test_predict_by_rejects_negative() {
        let mut kf = LinearKalmanFilter::new(&config()).unwrap();
        assert!(matches!(
            kf.predict_by(-1.0),
            Err(FilterError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_update_moves_towards_measurement() {
        let mut kf = LinearKalmanFilter::new(&config()).unwrap();
        kf.predict();
        let p = kf.update(&Vector2::new(13., -3.)).unwrap();
        assert!(p[0] > 10. && p[0] < 13.);
        assert!(p[1] < 0. && p[1] > -3.);
    }

    #[test]
    fn test_invalid_configuration() {
        for config in [
            LinearKfConfig { dt: 0.0, ..config() },
            LinearKfConfig { dt: -0.1, ..config() },
            LinearKfConfig { std_acc: 0.0, ..config() },
            LinearKfConfig { x_std_meas: -3.0, ..config() },
            LinearKfConfig { y_std_meas: 0.0, ..config() },
            LinearKfConfig { initial_variance: [1., -1., 1., 1.], ..config() },
        ] {
            assert!(matches!(
                LinearKalmanFilter::new(&config),
                Err(FilterError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_dimension_mismatch_keeps_state() {
        let mut kf = LinearKalmanFilter::new(&config()).unwrap();
        kf.predict();
        let before = kf.estimate().clone();
        assert_eq!(
            kf.update_from_slice(&[1.]),
            Err(FilterError::DimensionMismatch { expected: 2, found: 1 })
        );
        assert_eq!(kf.estimate(), &before);
        assert!(kf.update_from_slice(&[10., 1.]).is_ok());
    }

    #[test]
    fn test_singular_innovation_keeps_state() {
        let mut kf = LinearKalmanFilter::new(&config()).unwrap();
        kf.filter = EKF::init(CV::new(1.55), CartesianPosition::new(0., 0.));
        kf.state.P = Matrix4::zeros();
        let before = kf.estimate().clone();
        assert_eq!(
            kf.update(&Vector2::new(1., 1.)),
            Err(FilterError::SingularInnovationCovariance)
        );
        assert_eq!(kf.estimate(), &before);
    }

    #[test]
    fn test_covariance_trace_non_increasing() {
        // Starting above the steady state, the Riccati recursion decreases monotonically.
        // From the default P0 = I the trace rises again within the first 100 steps.
        let config = LinearKfConfig {
            initial_variance: [100.; 4],
            ..config()
        };
        let mut kf = LinearKalmanFilter::new(&config).unwrap();
        let mut previous = kf.estimate().trace();
        for k in 0..100 {
            let t = k as f64 * 0.1;
            kf.step(&Vector2::new(10. + t, 0.5 * t)).unwrap();
            let trace = kf.estimate().trace();
            assert!(trace <= previous + 1e-9, "trace grew at step {}: {} > {}", k, trace, previous);
            assert!(kf.estimate().asymmetry() < 1e-9);
            previous = trace;
        }
    }

    #[test]
    fn test_NIS_and_NEES() {
        let kf = LinearKalmanFilter::new(&config()).unwrap();
        // S = P + R = 10 I
        let nis = kf.NIS(&Vector2::new(13., 4.)).unwrap();
        assert!((nis - 2.5).abs() < 1e-12);
        let nees = kf.NEES(&Vector4::new(10., 0., 1., 0.)).unwrap();
        assert!((nees - 1.0).abs() < 1e-12);
    }
}
