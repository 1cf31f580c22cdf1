use crate::error::{ensure_positive, FilterError, Result};
use crate::state_estimator::Position;
use nalgebra::Vector3;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Ground truth motion in the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trajectory {
    /// Circle about the origin, starting on the positive x axis.
    Circular { radius: f64, omega: f64 },
    Straight { start: [f64; 2], velocity: [f64; 2] },
}

impl Trajectory {
    pub fn position(&self, t: f64) -> Position {
        match *self {
            Trajectory::Circular { radius, omega } => {
                let (s, c) = (omega * t).sin_cos();
                Position::new(radius * c, radius * s)
            }
            Trajectory::Straight { start, velocity } => {
                Position::new(start[0] + velocity[0] * t, start[1] + velocity[1] * t)
            }
        }
    }

    pub fn velocity(&self, t: f64) -> Position {
        match *self {
            Trajectory::Circular { radius, omega } => {
                let (s, c) = (omega * t).sin_cos();
                Position::new(-radius * omega * s, radius * omega * c)
            }
            Trajectory::Straight { velocity, .. } => Position::new(velocity[0], velocity[1]),
        }
    }

    /// `[r, theta, omega]` about the origin. Undefined omega at the origin is reported as zero.
    pub fn polar_state(&self, t: f64) -> Vector3<f64> {
        match *self {
            Trajectory::Circular { radius, omega } => Vector3::new(radius, omega * t, omega),
            Trajectory::Straight { .. } => {
                let p = self.position(t);
                let v = self.velocity(t);
                let r2 = p.norm_squared();
                let omega = if r2 > 0.0 {
                    (p[0] * v[1] - p[1] * v[0]) / r2
                } else {
                    0.0
                };
                Vector3::new(r2.sqrt(), p[1].atan2(p[0]), omega)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub t: f64,
    pub truth: Position,
    pub measurement: Position,
}

/// Everything needed to reproduce a run apart from the noise seed.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub trajectory: Trajectory,
    pub dt: f64,
    pub duration: f64,
    pub x_std_meas: f64,
    pub y_std_meas: f64,
}

impl Scenario {
    /// Samples at `t = k * dt` for `k` in `0..steps`.
    pub fn steps(&self) -> usize {
        (self.duration / self.dt).round() as usize
    }

    pub fn simulate(&self, seed: u64) -> Result<Vec<Sample>> {
        Ok(TrajectorySimulator::new(self, seed)?.collect())
    }
}

/// Upper bound on the number of samples in one scenario.
pub const MAX_STEPS: usize = 10_000_000;

/// Yields ground truth positions on a fixed time grid together with noisy measurements of them.
pub struct TrajectorySimulator {
    trajectory: Trajectory,
    dt: f64,
    steps: usize,
    k: usize,
    noise_x: Normal<f64>,
    noise_y: Normal<f64>,
    rng: StdRng,
}

fn noise(name: &str, std: f64) -> Result<Normal<f64>> {
    if !(std.is_finite() && std >= 0.0) {
        return Err(FilterError::InvalidConfiguration(format!(
            "{} must be finite and >= 0, got {}",
            name, std
        )));
    }
    Normal::new(0.0, std).map_err(|e| {
        FilterError::InvalidConfiguration(format!("{} = {}: {}", name, std, e))
    })
}

impl TrajectorySimulator {
    pub fn new(scenario: &Scenario, seed: u64) -> Result<Self> {
        ensure_positive("dt", scenario.dt)?;
        if !(scenario.duration.is_finite() && scenario.duration >= 0.0) {
            return Err(FilterError::InvalidConfiguration(format!(
                "duration must be finite and >= 0, got {}",
                scenario.duration
            )));
        }
        if scenario.duration / scenario.dt > MAX_STEPS as f64 {
            return Err(FilterError::InvalidConfiguration(format!(
                "duration / dt must be at most {}, got {}",
                MAX_STEPS,
                scenario.duration / scenario.dt
            )));
        }

        Ok(TrajectorySimulator {
            trajectory: scenario.trajectory,
            dt: scenario.dt,
            steps: scenario.steps(),
            k: 0,
            noise_x: noise("x_std_meas", scenario.x_std_meas)?,
            noise_y: noise("y_std_meas", scenario.y_std_meas)?,
            rng: StdRng::seed_from_u64(seed),
        })
    }
}

impl Iterator for TrajectorySimulator {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if self.k >= self.steps {
            return None;
        }
        let t = self.k as f64 * self.dt;
        self.k += 1;

        let truth = self.trajectory.position(t);
        let measurement = Position::new(
            truth[0] + self.noise_x.sample(&mut self.rng),
            truth[1] + self.noise_y.sample(&mut self.rng),
        );
        Some(Sample {
            t,
            truth,
            measurement,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.steps - self.k;
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(x_std_meas: f64) -> Scenario {
        Scenario {
            trajectory: Trajectory::Circular {
                radius: 10.0,
                omega: 1.0,
            },
            dt: 0.1,
            duration: 20.0,
            x_std_meas,
            y_std_meas: x_std_meas,
        }
    }

    #[test]
    fn test_grid() {
        let samples = circle(3.0).simulate(1).unwrap();
        assert_eq!(samples.len(), 200);
        assert_eq!(samples[0].t, 0.0);
        assert!((samples[199].t - 19.9).abs() < 1e-9);
        assert_eq!(samples[0].truth, Position::new(10., 0.));
    }

    #[test]
    fn test_noise_free() {
        let scenario = circle(0.0);
        for s in scenario.simulate(7).unwrap() {
            assert_eq!(s.truth, s.measurement);
            assert!((s.truth.norm() - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_reproducible_per_seed() {
        let scenario = circle(3.0);
        let a = scenario.simulate(42).unwrap();
        let b = scenario.simulate(42).unwrap();
        let c = scenario.simulate(43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_noise_std() {
        let scenario = Scenario {
            duration: 2000.0,
            ..circle(3.0)
        };
        let samples = scenario.simulate(3).unwrap();
        let n = samples.len() as f64;
        let var_x = samples
            .iter()
            .map(|s| (s.measurement[0] - s.truth[0]).powi(2))
            .sum::<f64>()
            / n;
        assert!((var_x.sqrt() - 3.0).abs() < 0.2, "std = {}", var_x.sqrt());
    }

    #[test]
    fn test_invalid_scenario() {
        assert!(Scenario { dt: 0.0, ..circle(3.0) }.simulate(1).is_err());
        assert!(circle(-1.0).simulate(1).is_err());
        assert!(Scenario { y_std_meas: -0.5, ..circle(3.0) }.simulate(1).is_err());
        assert!(circle(f64::INFINITY).simulate(1).is_err());
        assert!(Scenario { duration: f64::NAN, ..circle(3.0) }.simulate(1).is_err());
    }

    #[test]
    fn test_step_limit() {
        let scenario = Scenario {
            duration: 1e300,
            dt: 1e-3,
            ..circle(3.0)
        };
        assert!(matches!(
            TrajectorySimulator::new(&scenario, 1),
            Err(FilterError::InvalidConfiguration(_))
        ));

        let scenario = Scenario {
            duration: MAX_STEPS as f64 * 0.05,
            ..circle(3.0)
        };
        assert!(TrajectorySimulator::new(&scenario, 1).is_ok());
    }

    #[test]
    fn test_polar_state() {
        let circle = Trajectory::Circular {
            radius: 10.0,
            omega: 1.0,
        };
        assert_eq!(circle.polar_state(0.0), Vector3::new(10., 0., 1.));

        let line = Trajectory::Straight {
            start: [0.0, 5.0],
            velocity: [-2.0, 0.0],
        };
        // Moving left above the origin turns counter-clockwise
        let x = line.polar_state(0.0);
        assert!(Vector3::new(5., std::f64::consts::FRAC_PI_2, 0.4).relative_eq(&x, 1e-12, 1e-12));
    }
}
