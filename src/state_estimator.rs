pub mod ekf;
pub mod gauss;
pub mod kf;
pub mod models;

use crate::error::{FilterError, Result};
use nalgebra::Vector2;

/// Cartesian position `(x, y)`. Measurements are always given in this frame.
pub type Position = Vector2<f64>;

/// Recursive estimator that owns its state and is advanced one sample at a time.
///
/// Not reentrant: predict and update mutate the estimate in place.
pub trait StateEstimator {
    type Params;

    fn predict(&mut self) -> Position;

    /// On error the estimate is left as it was before the call.
    fn update(&mut self, z: &Position) -> Result<Position>;

    fn step(&mut self, z: &Position) -> Result<Position> {
        self.predict();
        self.update(z)
    }

    fn estimate(&self) -> &Self::Params;

    /// Cartesian position of the current estimate.
    fn position(&self) -> Position;

    fn update_from_slice(&mut self, z: &[f64]) -> Result<Position> {
        if z.len() != 2 {
            return Err(FilterError::DimensionMismatch {
                expected: 2,
                found: z.len(),
            });
        }
        self.update(&Position::from_column_slice(z))
    }
}
