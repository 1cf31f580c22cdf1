use super::gauss::GaussParams;
use super::models::dynamic::CircularPolar;
use super::models::measurement::PolarPosition;
use super::models::{DynamicModel, MeasurementModel};
use super::{Position, StateEstimator};
use crate::config::ExtendedKfConfig;
use crate::consistency::Consistency;
use crate::error::{FilterError, Result};
use nalgebra::{Matrix2x3, SMatrix, SVector, Vector3};
use tracing::{debug, trace};

/// Predict/update equations over a dynamic and a measurement model.
///
/// Stateless: every call takes a `GaussParams` and returns a new one. With linear models the
/// update is the ordinary Kalman filter update.
#[derive(Debug, Clone)]
pub struct EKF<D, M> {
    dynmod: D,
    measmod: M,
}

impl<D, M> EKF<D, M> {
    pub fn init(dynmod: D, measmod: M) -> Self {
        EKF { dynmod, measmod }
    }

    pub fn dynmod(&self) -> &D {
        &self.dynmod
    }

    pub fn measmod(&self) -> &M {
        &self.measmod
    }

    pub fn predict<const N: usize>(&self, eststate: &GaussParams<N>, ts: f64) -> GaussParams<N>
    where
        D: DynamicModel<N>,
    {
        let x = self.dynmod.f(&eststate.x, ts);
        // NOTE: F is linearised about the predicted mean, not the prior one. The models here
        // leave every component F depends on untouched by f, so the order has no effect. A
        // model where f changes omega would need the prior mean instead.
        let F = self.dynmod.F(&x, ts);
        let Q = self.dynmod.Q(&x, ts);
        let P = F * eststate.P * F.transpose() + Q;

        GaussParams::new(x, P)
    }

    pub fn update<const N: usize, const K: usize>(
        &self,
        z: &SVector<f64, K>,
        eststate: &GaussParams<N>,
    ) -> Result<GaussParams<N>>
    where
        M: MeasurementModel<N, K>,
    {
        let (v, S) = self.innovation(eststate, z);

        let x = eststate.x;
        let P = eststate.P;
        let H = self.measmod.H(&x);
        let R = self.measmod.R(&x, z);

        // Kalman gain W = P Hᵀ S⁻¹, solved from S Wᵀ = H P
        let W = cholesky_solve(S, H * P)?.transpose();

        // Joseph form keeps P symmetric
        let Jo = SMatrix::<f64, N, N>::identity() - W * H;
        let P = Jo * P * Jo.transpose() + W * R * W.transpose();
        let x = x + W * v;

        Ok(GaussParams::new(x, P))
    }

    /// Innovation `z - h(x)` and its covariance `H P Hᵀ + R`, both at the given state.
    pub fn innovation<const N: usize, const K: usize>(
        &self,
        eststate: &GaussParams<N>,
        z: &SVector<f64, K>,
    ) -> (SVector<f64, K>, SMatrix<f64, K, K>)
    where
        M: MeasurementModel<N, K>,
    {
        let x = &eststate.x;
        let v = z - self.measmod.h(x);
        let H = self.measmod.H(x);
        let S = H * eststate.P * H.transpose() + self.measmod.R(x, z);
        (v, S)
    }

    pub fn NIS<const N: usize, const K: usize>(
        &self,
        eststate: &GaussParams<N>,
        z: &SVector<f64, K>,
    ) -> Result<f64>
    where
        M: MeasurementModel<N, K>,
    {
        let (v, S) = self.innovation(eststate, z);
        let S_inv_v = cholesky_solve(S, v)?;
        Ok(v.dot(&S_inv_v))
    }
}

fn cholesky_solve<const K: usize, const C: usize>(
    S: SMatrix<f64, K, K>,
    b: SMatrix<f64, K, C>,
) -> Result<SMatrix<f64, K, C>> {
    if !S.iter().all(|s| s.is_finite()) {
        return Err(FilterError::SingularInnovationCovariance);
    }
    let chol = S
        .cholesky()
        .ok_or(FilterError::SingularInnovationCovariance)?;
    Ok(chol.solve(&b))
}

/// Extended Kalman filter on polar state `[r, theta, omega]`, observed in Cartesian coordinates.
#[derive(Debug, Clone)]
pub struct ExtendedKalmanFilter {
    filter: EKF<CircularPolar, PolarPosition>,
    dt: f64,
    state: GaussParams<3>,
}

impl ExtendedKalmanFilter {
    pub fn new(config: &ExtendedKfConfig) -> Result<Self> {
        config.validate()?;

        let dynmod = CircularPolar::new(config.var_r, config.var_theta, config.std_acc);
        let measmod = PolarPosition::new(config.x_std_meas, config.y_std_meas);
        let state = GaussParams::from_diagonal(
            Vector3::from(config.initial_state),
            &Vector3::from(config.initial_variance),
        );
        debug!(
            dt = config.dt,
            r = state.x[0],
            theta = state.x[1],
            omega = state.x[2],
            "extended Kalman filter initialised"
        );

        Ok(ExtendedKalmanFilter {
            filter: EKF::init(dynmod, measmod),
            dt: config.dt,
            state,
        })
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Predict over `ts` instead of the configured timestep.
    pub fn predict_by(&mut self, ts: f64) -> Result<Position> {
        if !(ts.is_finite() && ts >= 0.0) {
            return Err(FilterError::InvalidConfiguration(format!(
                "prediction interval must be finite and >= 0, got {}",
                ts
            )));
        }
        self.state = self.filter.predict(&self.state, ts);
        trace!(r = self.state.x[0], theta = self.state.x[1], "ekf predict");
        Ok(self.position())
    }

    /// Observation Jacobian at the current estimate.
    pub fn observation_jacobian(&self) -> Matrix2x3<f64> {
        self.filter.measmod().H(&self.state.x)
    }
}

impl StateEstimator for ExtendedKalmanFilter {
    type Params = GaussParams<3>;

    fn predict(&mut self) -> Position {
        self.state = self.filter.predict(&self.state, self.dt);
        trace!(r = self.state.x[0], theta = self.state.x[1], "ekf predict");
        self.position()
    }

    fn update(&mut self, z: &Position) -> Result<Position> {
        // Only committed on success
        self.state = self.filter.update(z, &self.state)?;
        trace!(r = self.state.x[0], theta = self.state.x[1], "ekf update");
        Ok(self.position())
    }

    fn estimate(&self) -> &GaussParams<3> {
        &self.state
    }

    fn position(&self) -> Position {
        self.filter.measmod().h(&self.state.x)
    }
}

impl Consistency for ExtendedKalmanFilter {
    type Measurement = Position;
    type GroundTruth = Vector3<f64>;

    fn NIS(&self, z: &Position) -> Result<f64> {
        self.filter.NIS(&self.state, z)
    }

    fn NEES(&self, x_gt: &Vector3<f64>) -> Result<f64> {
        self.state.NEES(x_gt)
    }
}
