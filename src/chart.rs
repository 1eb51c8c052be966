use anyhow::Result;
use log::info;
use plotters::prelude::*;
use std::path::Path;

use crate::energy::EnergySeries;
use crate::error::{PipelineError, PipelineResult};
use crate::math::{range, CubicSpline};

const CURVE_SAMPLES: usize = 400;
const LINE_COLOR: RGBColor = RGBColor(0x1f, 0x77, 0xb4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 840,
        }
    }
}

/// Relative energies at the images and a smooth curve through them.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub points: Vec<(f64, f64)>,
    pub curve: Vec<(f64, f64)>,
}

impl ChartData {
    #[must_use]
    pub fn new(series: &EnergySeries) -> Self {
        let points = series
            .relative()
            .into_iter()
            .map(|(i, e)| (i as f64, e))
            .collect::<Vec<_>>();
        let (x, y): (Vec<f64>, Vec<f64>) = points.iter().copied().unzip();
        let curve = match CubicSpline::natural(&x, &y) {
            Some(spline) => range::f64(x[0], x[x.len() - 1], CURVE_SAMPLES)
                .map(|t| (t, spline.at(t)))
                .collect(),
            None => points.clone(),
        };
        Self { points, curve }
    }

    fn x_range(&self) -> (f64, f64) {
        let first = self.points.first().map_or(1.0, |p| p.0);
        let last = self.points.last().map_or(1.0, |p| p.0);
        (first - 0.5, last + 0.5)
    }

    fn y_range(&self) -> (f64, f64) {
        let (lo, hi) = self
            .curve
            .iter()
            .chain(&self.points)
            .fold((0.0_f64, 0.0_f64), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));
        let pad = ((hi - lo) * 0.08).max(0.05);
        (lo - pad, hi + pad)
    }
}

fn draw(data: &ChartData, output: &Path, style: ChartStyle) -> Result<()> {
    let root = BitMapBackend::new(output, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE)?;
    let (x_lo, x_hi) = data.x_range();
    let (y_lo, y_hi) = data.y_range();
    let mut chart = ChartBuilder::on(&root)
        .margin(30)
        .x_label_area_size(70)
        .y_label_area_size(100)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
    let count = data.points.len();
    chart
        .configure_mesh()
        .x_labels(count.clamp(2, 20))
        .x_label_formatter(&|x| format!("{x:.0}"))
        .y_label_formatter(&|y| format!("{y:.2}"))
        .x_desc("Reaction Coordinate (image)")
        .y_desc("Relative Energy (eV)")
        .axis_desc_style(("sans-serif", 30))
        .label_style(("sans-serif", 24))
        .light_line_style(WHITE)
        .bold_line_style(BLACK.mix(0.12))
        .axis_style(BLACK.stroke_width(2))
        .draw()?;
    chart.draw_series(LineSeries::new(
        data.curve.iter().copied(),
        LINE_COLOR.stroke_width(5),
    ))?;
    chart.draw_series(data.points.iter().map(|&p| {
        EmptyElement::at(p)
            + Circle::new((0, 0), 10, WHITE.filled())
            + Circle::new((0, 0), 7, LINE_COLOR.filled())
    }))?;
    root.present()?;
    Ok(())
}

/// Draws the energy profile of `series` into a PNG at `output`.
pub fn plot_energy_chart(
    series: &EnergySeries,
    output: &Path,
    style: ChartStyle,
) -> PipelineResult<ChartData> {
    if series.is_empty() {
        return Err(PipelineError::Plot("no energies to plot".into()));
    }
    let data = ChartData::new(series);
    draw(&data, output, style).map_err(|err| PipelineError::Plot(format!("{err:#}")))?;
    info!("energy profile written to {}", output.display());
    Ok(data)
}
