use crate::error::Result;
use crate::evaluation::{improvement_percent, mean_squared_error};
use crate::simulator::{Sample, Scenario};
use crate::state_estimator::{gauss::GaussParams, Position, StateEstimator};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

/// Per-step record of one filter run over one simulated trajectory.
#[derive(Debug, Clone, Default)]
pub struct TrackingRun {
    pub times: Vec<f64>,
    pub truth: Vec<Position>,
    pub measurements: Vec<Position>,
    pub estimates: Vec<Position>,
    pub covariance_traces: Vec<f64>,
    pub max_asymmetry: f64,
    /// Measurements the filter rejected; the prediction stands in for them.
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub steps: usize,
    pub mse_measurements: f64,
    pub mse_filtered: f64,
    pub improvement_percent: f64,
    pub skipped: usize,
}

impl TrackingRun {
    pub fn summary(&self) -> Result<RunSummary> {
        let mse_measurements = mean_squared_error(&self.truth, &self.measurements)?;
        let mse_filtered = mean_squared_error(&self.truth, &self.estimates)?;
        Ok(RunSummary {
            steps: self.truth.len(),
            mse_measurements,
            mse_filtered,
            improvement_percent: improvement_percent(mse_measurements, mse_filtered),
            skipped: self.skipped,
        })
    }
}

/// Runs predict-then-update over every sample in order.
///
/// A failed update is logged and skipped, the filter carries on from its prediction.
pub fn track<S, const N: usize>(filter: &mut S, samples: &[Sample]) -> TrackingRun
where
    S: StateEstimator<Params = GaussParams<N>>,
{
    let mut run = TrackingRun {
        times: Vec::with_capacity(samples.len()),
        truth: Vec::with_capacity(samples.len()),
        measurements: Vec::with_capacity(samples.len()),
        estimates: Vec::with_capacity(samples.len()),
        covariance_traces: Vec::with_capacity(samples.len()),
        ..TrackingRun::default()
    };

    for sample in samples {
        let predicted = filter.predict();
        let estimate = match filter.update(&sample.measurement) {
            Ok(p) => p,
            Err(e) => {
                warn!(t = sample.t, error = %e, "skipping measurement");
                run.skipped += 1;
                predicted
            }
        };
        let eststate = filter.estimate();

        run.times.push(sample.t);
        run.truth.push(sample.truth);
        run.measurements.push(sample.measurement);
        run.estimates.push(estimate);
        run.covariance_traces.push(eststate.trace());
        run.max_asymmetry = run.max_asymmetry.max(eststate.asymmetry());
    }
    run
}

/// Aggregate over independent trials.
#[derive(Debug, Clone, Serialize)]
pub struct TrialStatistics {
    pub trials: usize,
    pub mean_mse_measurements: f64,
    pub mean_mse_filtered: f64,
    pub mean_improvement_percent: f64,
    /// Fraction of trials where the filter beat the raw measurements
    pub improved_fraction: f64,
}

pub fn trial_statistics(summaries: &[RunSummary]) -> TrialStatistics {
    let n = summaries.len().max(1) as f64;
    let mean = |f: fn(&RunSummary) -> f64| summaries.iter().map(f).sum::<f64>() / n;
    let improved = summaries
        .iter()
        .filter(|s| s.mse_filtered < s.mse_measurements)
        .count();
    TrialStatistics {
        trials: summaries.len(),
        mean_mse_measurements: mean(|s| s.mse_measurements),
        mean_mse_filtered: mean(|s| s.mse_filtered),
        mean_improvement_percent: mean(|s| s.improvement_percent),
        improved_fraction: improved as f64 / n,
    }
}

/// Independent Monte Carlo trials, one fresh filter and noise seed each, run in parallel.
pub fn run_trials<S, F, const N: usize>(
    make_filter: F,
    scenario: &Scenario,
    seeds: &[u64],
) -> Result<Vec<RunSummary>>
where
    S: StateEstimator<Params = GaussParams<N>>,
    F: Fn() -> Result<S> + Sync,
{
    seeds
        .par_iter()
        .map(|&seed| -> Result<RunSummary> {
            let samples = scenario.simulate(seed)?;
            let mut filter = make_filter()?;
            let summary = track(&mut filter, &samples).summary()?;
            debug!(seed, mse = summary.mse_filtered, "trial finished");
            Ok(summary)
        })
        .collect()
}
