use crate::evaluation::euclidean_errors;
use crate::tracking::TrackingRun;
use gnuplot::*;
use std::path::Path;

/// Trajectory on the left, per-step Euclidean error on the right, saved as PNG.
pub fn plot_run(
    run: &TrackingRun,
    title: &str,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let measurement_errors = euclidean_errors(&run.truth, &run.measurements)?;
    let estimate_errors = euclidean_errors(&run.truth, &run.estimates)?;

    let mut fg = Figure::new();
    fg.set_multiplot_layout(1, 2);

    fg.axes2d()
        .set_title(title, &[])
        .set_x_label("x [m]", &[])
        .set_y_label("y [m]", &[])
        .set_x_grid(true)
        .set_y_grid(true)
        .set_aspect_ratio(AutoOption::Fix(1.0))
        .points(
            run.measurements.iter().map(|z| z[0]),
            run.measurements.iter().map(|z| z[1]),
            &[Caption("Measurements"), PointSymbol('o'), PointSize(0.5)],
        )
        .lines(
            run.truth.iter().map(|p| p[0]),
            run.truth.iter().map(|p| p[1]),
            &[Caption("Ground truth"), LineWidth(3.0)],
        )
        .lines(
            run.estimates.iter().map(|p| p[0]),
            run.estimates.iter().map(|p| p[1]),
            &[Caption("Estimate"), LineWidth(2.0)],
        );

    fg.axes2d()
        .set_title("Error over time", &[])
        .set_x_label("t [s]", &[])
        .set_y_label("Euclidean error [m]", &[])
        .set_x_grid(true)
        .set_y_grid(true)
        .lines(
            run.times.iter().copied(),
            measurement_errors.iter().copied(),
            &[Caption("Measurement error")],
        )
        .lines(
            run.times.iter().copied(),
            estimate_errors.iter().copied(),
            &[Caption("Estimate error"), LineWidth(2.0)],
        );

    fg.save_to_png(output, 1400, 600)
        .map_err(|e| format!("gnuplot failed: {:?}", e))?;
    Ok(())
}
