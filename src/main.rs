#![allow(non_snake_case)]
use anyhow::{anyhow, Context};
use clap::Parser;
use itertools::izip;
use kf_tracking::{
    config::{read_filter_config, Config, FilterConfig},
    error,
    plotting,
    simulator::Scenario,
    state_estimator::{
        ekf::ExtendedKalmanFilter, gauss::GaussParams, kf::LinearKalmanFilter, StateEstimator,
    },
    tracking::{run_trials, trial_statistics, track},
};
use tracing::{debug, info, warn};

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    init_logging(config.verbose);

    let scenario = config.scenario();
    let filter_config = match &config.config {
        Some(path) => read_filter_config(path)
            .with_context(|| format!("reading filter config {}", path.display()))?,
        None => config.filter_config(),
    };
    if config.config.is_some() && config.filter != filter_config.kind() {
        info!(filter = ?filter_config.kind(), "filter taken from config file");
    }
    let seed = config.seed.unwrap_or_else(rand::random);
    info!(
        filter = ?filter_config.kind(),
        trajectory = ?config.trajectory,
        steps = scenario.steps(),
        seed,
        "starting simulation"
    );

    match filter_config {
        FilterConfig::Linear(c) => {
            if c.dt != scenario.dt {
                warn!(filter_dt = c.dt, scenario_dt = scenario.dt, "filter and scenario timesteps differ");
            }
            execute(&config, &scenario, seed, || LinearKalmanFilter::new(&c))
        }
        FilterConfig::Extended(c) => {
            if c.dt != scenario.dt {
                warn!(filter_dt = c.dt, scenario_dt = scenario.dt, "filter and scenario timesteps differ");
            }
            execute(&config, &scenario, seed, || ExtendedKalmanFilter::new(&c))
        }
    }
}

fn execute<S, F, const N: usize>(
    config: &Config,
    scenario: &Scenario,
    seed: u64,
    make_filter: F,
) -> anyhow::Result<()>
where
    S: StateEstimator<Params = GaussParams<N>>,
    F: Fn() -> error::Result<S> + Sync,
{
    let samples = scenario.simulate(seed)?;
    let mut filter = make_filter()?;
    let run = track(&mut filter, &samples);
    for (t, gt, z, est) in izip!(&run.times, &run.truth, &run.measurements, &run.estimates) {
        debug!(
            t,
            truth = ?(gt[0], gt[1]),
            measurement = ?(z[0], z[1]),
            estimate = ?(est[0], est[1]),
            "step"
        );
    }
    let summary = run.summary()?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Steps:                  {}", summary.steps);
        println!("Measurement MSE:        {:.4}", summary.mse_measurements);
        println!("Filtered MSE:           {:.4}", summary.mse_filtered);
        println!("Improvement:            {:.2}%", summary.improvement_percent);
        if summary.skipped > 0 {
            println!("Skipped measurements:   {}", summary.skipped);
        }
    }

    if config.trials > 1 {
        let seeds: Vec<u64> = (0..config.trials as u64)
            .map(|i| seed.wrapping_add(i))
            .collect();
        let summaries = run_trials(&make_filter, scenario, &seeds)?;
        let stats = trial_statistics(&summaries);
        if config.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Trials:                 {}", stats.trials);
            println!("Mean measurement MSE:   {:.4}", stats.mean_mse_measurements);
            println!("Mean filtered MSE:      {:.4}", stats.mean_mse_filtered);
            println!("Mean improvement:       {:.2}%", stats.mean_improvement_percent);
            println!("Improved in:            {:.0}% of trials", stats.improved_fraction * 100.0);
        }
    }

    if let Some(path) = &config.plot {
        plotting::plot_run(&run, "Kalman filter tracking", path).map_err(|e| anyhow!("{}", e))?;
        info!("plot saved to {}", path.display());
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_writer(std::io::stderr);

    if verbose {
        subscriber.with_max_level(tracing::Level::DEBUG).init();
        info!("Verbose logging enabled (DEBUG level)");
    } else {
        subscriber.with_max_level(tracing::Level::INFO).init();
    }
}
