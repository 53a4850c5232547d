//! SVG rendering of staleness series.

use crate::series::{rolling_median, HotspotSeries};
use crate::PlotError;
use chrono::DateTime;
use plotters::coord::Shift;
use plotters::prelude::*;

const WIDTH: u32 = 1200;
const PANEL_HEIGHT: u32 = 200;
const ROLLING_WINDOW: usize = 30;

fn render_error<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::Render(e.to_string())
}

/// Upper bound of the y axis: always shows the threshold with some headroom.
fn y_axis_max(max_staleness: u64, threshold: u64) -> i64 {
    let with_threshold = threshold.saturating_mul(5) / 4;
    let with_data = max_staleness.saturating_mul(11) / 10;
    with_threshold.max(with_data).max(1) as i64
}

fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%b %d %H:%M").to_string())
        .unwrap_or_default()
}

/// Draw one stacked panel per hotspot and return the SVG document.
pub fn render_svg(series: &[HotspotSeries], threshold: u64) -> Result<String, PlotError> {
    let rows = series.len().max(1);
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, PANEL_HEIGHT * rows as u32))
            .into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        let panels = root.split_evenly((rows, 1));
        for (panel, hotspot) in panels.iter().zip(series) {
            draw_panel(panel, hotspot, threshold)?;
        }
        root.present().map_err(render_error)?;
    }
    Ok(svg)
}

fn draw_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    series: &HotspotSeries,
    threshold: u64,
) -> Result<(), PlotError> {
    let (Some((first, _)), Some((last, _))) = (series.points.first(), series.points.last()) else {
        return Ok(());
    };
    let x_start = first.timestamp();
    let x_end = last.timestamp().max(x_start + 1);
    let latest = series.latest();
    let threshold_y = threshold as i64;

    let color = if latest > threshold { RED } else { BLUE };

    let mut chart = ChartBuilder::on(area)
        .caption(format!("[{}] {}", latest, series.name), ("sans-serif", 16))
        .margin(8)
        .x_label_area_size(24)
        .y_label_area_size(48)
        .build_cartesian_2d(x_start..x_end, 0i64..y_axis_max(series.max(), threshold))
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .x_labels(6)
        .y_labels(4)
        .x_label_formatter(&|ts: &i64| format_timestamp(*ts))
        .draw()
        .map_err(render_error)?;

    chart
        .draw_series(LineSeries::new(
            vec![(x_start, threshold_y), (x_end, threshold_y)],
            BLACK.mix(0.75),
        ))
        .map_err(render_error)?;

    chart
        .draw_series(LineSeries::new(
            series
                .points
                .iter()
                .map(|(ts, staleness)| (ts.timestamp(), *staleness as i64)),
            color.stroke_width(2),
        ))
        .map_err(render_error)?;

    let medians: Vec<(i64, i64)> = series
        .points
        .iter()
        .zip(rolling_median(&series.values(), ROLLING_WINDOW))
        .filter_map(|((ts, _), median)| median.map(|m| (ts.timestamp(), m.round() as i64)))
        .collect();
    if !medians.is_empty() {
        chart
            .draw_series(LineSeries::new(medians, BLACK.mix(0.5)))
            .map_err(render_error)?;
    }

    Ok(())
}
