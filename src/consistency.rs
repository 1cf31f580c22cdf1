use crate::error::Result;

/// Filter consistency measures evaluated at the current estimate.
pub trait Consistency {
    type Measurement;
    type GroundTruth;

    /// Normalized innovation squared of a measurement against the current prediction.
    fn NIS(&self, z: &Self::Measurement) -> Result<f64>;
    /// Normalized estimation error squared against the true state.
    fn NEES(&self, x_gt: &Self::GroundTruth) -> Result<f64>;
}
