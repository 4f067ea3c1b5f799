use std::error::Error;

use crate::types::Float;
use plotters::prelude::*;

/// Plot sampled time series against time into a png at `path`.
///
/// Every series holds one value per step of `dt`, starting at t = 0.
pub fn plot(
    series: &[(&str, &[Float])],
    dt: Float,
    caption: &str,
    path: &str,
) -> Result<(), Box<dyn Error>> {
    let num_steps = series.iter().map(|(_, data)| data.len()).max().unwrap_or(0);
    let final_time = (num_steps.max(2) - 1) as Float * dt;

    // Determine y-axis limits based on the minimum and maximum values in the data
    let values = || series.iter().flat_map(|(_, data)| data.iter().cloned());
    let mut min_y = values().fold(Float::INFINITY, Float::min);
    let mut max_y = values().fold(Float::NEG_INFINITY, Float::max);
    if !(min_y < max_y) {
        min_y = if min_y.is_finite() { min_y - 1. } else { -1. };
        max_y = min_y + 2.;
    }

    let root = BitMapBackend::new(path, (640, 480)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 20))
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0.0..final_time, min_y..max_y)?;
    chart.configure_mesh().draw()?;

    for (i, (label, data)) in series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(LineSeries::new(
                data.iter().enumerate().map(|(k, y)| (k as Float * dt, *y)),
                &color,
            ))?
            .label(*label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}
