use crate::error::{ensure_positive, FilterError, Result};
use crate::simulator::{Scenario, Trajectory};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path, path::PathBuf};

fn ensure_finite(name: &str, values: &[f64]) -> Result<()> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(v) => Err(FilterError::InvalidConfiguration(format!(
            "{} must be finite, got {}",
            name, v
        ))),
        None => Ok(()),
    }
}

fn ensure_variances(name: &str, values: &[f64]) -> Result<()> {
    ensure_finite(name, values)?;
    match values.iter().find(|v| **v < 0.0) {
        Some(v) => Err(FilterError::InvalidConfiguration(format!(
            "{} must be >= 0, got {}",
            name, v
        ))),
        None => Ok(()),
    }
}

/// Constructor-time settings of the linear Kalman filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearKfConfig {
    pub dt: f64,
    /// Acceleration noise std scaling Q
    pub std_acc: f64,
    pub x_std_meas: f64,
    pub y_std_meas: f64,
    /// `[x, y, vx, vy]`
    pub initial_state: [f64; 4],
    /// Diagonal of the initial covariance
    pub initial_variance: [f64; 4],
    /// Acceleration input `u`
    pub control: [f64; 2],
}

impl Default for LinearKfConfig {
    fn default() -> Self {
        LinearKfConfig {
            dt: 0.1,
            std_acc: 1.55,
            x_std_meas: 3.0,
            y_std_meas: 3.0,
            initial_state: [10., 0., 0., 0.],
            initial_variance: [1.; 4],
            control: [0.; 2],
        }
    }
}

impl LinearKfConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("dt", self.dt)?;
        ensure_positive("std_acc", self.std_acc)?;
        ensure_positive("x_std_meas", self.x_std_meas)?;
        ensure_positive("y_std_meas", self.y_std_meas)?;
        ensure_finite("initial_state", &self.initial_state)?;
        ensure_variances("initial_variance", &self.initial_variance)?;
        ensure_finite("control", &self.control)
    }

    /// Position taken from the trajectory at `t`, velocity left at zero.
    pub fn seeded_from(mut self, trajectory: &Trajectory, t: f64) -> Self {
        let p = trajectory.position(t);
        self.initial_state = [p[0], p[1], 0., 0.];
        self
    }
}

/// Constructor-time settings of the extended Kalman filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtendedKfConfig {
    pub dt: f64,
    /// Angular acceleration noise std, the omega entry of Q
    pub std_acc: f64,
    pub x_std_meas: f64,
    pub y_std_meas: f64,
    /// Per-step radius variance in Q
    pub var_r: f64,
    /// Per-step angle variance in Q
    pub var_theta: f64,
    /// `[r, theta, omega]`
    pub initial_state: [f64; 3],
    pub initial_variance: [f64; 3],
}

impl Default for ExtendedKfConfig {
    fn default() -> Self {
        ExtendedKfConfig {
            dt: 0.1,
            std_acc: 0.3,
            x_std_meas: 3.0,
            y_std_meas: 3.0,
            var_r: 0.01,
            var_theta: 0.05,
            initial_state: [10., 0., 1.],
            initial_variance: [0.1; 3],
        }
    }
}

impl ExtendedKfConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("dt", self.dt)?;
        ensure_positive("std_acc", self.std_acc)?;
        ensure_positive("x_std_meas", self.x_std_meas)?;
        ensure_positive("y_std_meas", self.y_std_meas)?;
        ensure_positive("var_r", self.var_r)?;
        ensure_positive("var_theta", self.var_theta)?;
        ensure_finite("initial_state", &self.initial_state)?;
        ensure_variances("initial_variance", &self.initial_variance)
    }

    /// Polar state of the trajectory at `t`.
    pub fn seeded_from(mut self, trajectory: &Trajectory, t: f64) -> Self {
        let x = trajectory.polar_state(t);
        self.initial_state = [x[0], x[1], x[2]];
        self
    }
}

/// Filter settings as read from a JSON file, e.g. `{"filter": "linear", "std_acc": 2.0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum FilterConfig {
    Linear(LinearKfConfig),
    Extended(ExtendedKfConfig),
}

impl FilterConfig {
    pub fn kind(&self) -> FilterKind {
        match self {
            FilterConfig::Linear(_) => FilterKind::Linear,
            FilterConfig::Extended(_) => FilterKind::Extended,
        }
    }
}

pub fn read_filter_config(path: impl AsRef<Path>) -> anyhow::Result<FilterConfig> {
    let file = File::open(path)?;
    let config = serde_json::from_reader(file)?;

    Ok(config)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterKind {
    /// Constant velocity Kalman filter in Cartesian coordinates
    Linear,
    /// Circular motion extended Kalman filter in polar coordinates
    Extended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TrajectoryKind {
    Circle,
    Line,
}

/// Kalman filter tracking simulation
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Filter to run
    #[arg(long, value_enum, default_value_t = FilterKind::Extended)]
    pub filter: FilterKind,

    /// JSON file with filter settings, overrides --filter and the noise options
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ground truth trajectory
    #[arg(long, value_enum, default_value_t = TrajectoryKind::Circle)]
    pub trajectory: TrajectoryKind,

    /// Timestep in seconds
    #[arg(long, default_value_t = 0.1)]
    pub dt: f64,

    /// Simulated duration in seconds
    #[arg(long, default_value_t = 20.0)]
    pub duration: f64,

    /// Process noise std, defaults to the filter's own default
    #[arg(long)]
    pub std_acc: Option<f64>,

    /// Measurement noise std along x
    #[arg(long, default_value_t = 3.0)]
    pub x_std_meas: f64,

    /// Measurement noise std along y
    #[arg(long, default_value_t = 3.0)]
    pub y_std_meas: f64,

    /// Seed for the measurement noise, random if not given
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of independent Monte Carlo trials
    #[arg(long, default_value_t = 1)]
    pub trials: usize,

    /// Start the linear filter at the origin instead of the true start position
    #[arg(long, default_value_t = false)]
    pub zero_init: bool,

    /// Save a plot of the (first) run to this PNG file
    #[arg(long, value_name = "FILE")]
    pub plot: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Verbose logging (DEBUG level)
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    pub fn trajectory(&self) -> Trajectory {
        match self.trajectory {
            TrajectoryKind::Circle => Trajectory::Circular {
                radius: 10.0,
                omega: 1.0,
            },
            TrajectoryKind::Line => Trajectory::Straight {
                start: [10.0, 0.0],
                velocity: [1.0, 0.5],
            },
        }
    }

    pub fn scenario(&self) -> Scenario {
        Scenario {
            trajectory: self.trajectory(),
            dt: self.dt,
            duration: self.duration,
            x_std_meas: self.x_std_meas,
            y_std_meas: self.y_std_meas,
        }
    }

    /// Filter settings from the command line, seeded from the scenario's start.
    pub fn filter_config(&self) -> FilterConfig {
        let trajectory = self.trajectory();
        match self.filter {
            FilterKind::Linear => {
                let mut config = LinearKfConfig {
                    dt: self.dt,
                    x_std_meas: self.x_std_meas,
                    y_std_meas: self.y_std_meas,
                    ..LinearKfConfig::default()
                };
                if let Some(std_acc) = self.std_acc {
                    config.std_acc = std_acc;
                }
                if self.zero_init {
                    config.initial_state = [0.; 4];
                } else {
                    config = config.seeded_from(&trajectory, 0.0);
                }
                FilterConfig::Linear(config)
            }
            FilterKind::Extended => {
                let mut config = ExtendedKfConfig {
                    dt: self.dt,
                    x_std_meas: self.x_std_meas,
                    y_std_meas: self.y_std_meas,
                    ..ExtendedKfConfig::default()
                }
                .seeded_from(&trajectory, 0.0);
                if let Some(std_acc) = self.std_acc {
                    config.std_acc = std_acc;
                }
                FilterConfig::Extended(config)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(LinearKfConfig::default().validate().is_ok());
        assert!(ExtendedKfConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_finite_state() {
        let config = LinearKfConfig {
            initial_state: [f64::NAN, 0., 0., 0.],
            ..LinearKfConfig::default()
        };
        assert!(config.validate().is_err());
        let config = ExtendedKfConfig {
            initial_variance: [0.1, -0.1, 0.1],
            ..ExtendedKfConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_filter_config_from_json() {
        let json = r#"{"filter": "linear", "std_acc": 2.0, "initial_state": [1.0, 2.0, 0.0, 0.0]}"#;
        let config: FilterConfig = serde_json::from_str(json).unwrap();
        let expected = LinearKfConfig {
            std_acc: 2.0,
            initial_state: [1., 2., 0., 0.],
            ..LinearKfConfig::default()
        };
        assert_eq!(config, FilterConfig::Linear(expected));
        assert_eq!(config.kind(), FilterKind::Linear);

        let config: FilterConfig = serde_json::from_str(r#"{"filter": "extended"}"#).unwrap();
        assert_eq!(config, FilterConfig::Extended(ExtendedKfConfig::default()));
    }

    #[test]
    fn test_cli_seeds_from_trajectory() {
        let config = Config::parse_from(["kf-tracking", "--filter", "linear", "--trajectory", "line"]);
        match config.filter_config() {
            FilterConfig::Linear(c) => assert_eq!(c.initial_state, [10., 0., 0., 0.]),
            other => panic!("unexpected config {:?}", other),
        }

        let config = Config::parse_from(["kf-tracking", "--filter", "linear", "--zero-init"]);
        match config.filter_config() {
            FilterConfig::Linear(c) => assert_eq!(c.initial_state, [0.; 4]),
            other => panic!("unexpected config {:?}", other),
        }

        let config = Config::parse_from(["kf-tracking", "--std-acc", "0.5"]);
        match config.filter_config() {
            FilterConfig::Extended(c) => {
                assert_eq!(c.std_acc, 0.5);
                assert_eq!(c.initial_state, [10., 0., 1.]);
            }
            other => panic!("unexpected config {:?}", other),
        }
    }
}
