//! SVG chart files rendered with Plotters.
//!
//! Each chart is written to its own file in the output directory:
//! - `cost_vs_response.svg`: per-city scatter + trend facets (needs raw records)
//! - `p_values.svg`: p-value strip plot with the significance threshold
//! - `r_squared.svg`: R² strip plot
//! - `roas.svg`: ROAS bar chart with value labels

use std::collections::BTreeMap;
use std::error::Error;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::info;

use crate::domain::{CitySummary, ClassifiedCity, Palette, Record, RenderConfig};
use crate::error::{AppError, ErrorKind};

type DrawResult = Result<(), Box<dyn Error>>;

/// Pixels per `RenderConfig` unit.
const PX: u32 = 10;

/// Everything the SVG charts can draw. `records` is optional because a saved
/// report has no raw observations.
pub struct SvgInput<'a> {
    pub records: Option<&'a [Record]>,
    pub summaries: &'a [CitySummary],
    pub ranked: &'a [ClassifiedCity],
    pub p_threshold: f64,
}

/// Write all available charts to `dir`, returning the written paths.
pub fn write_svg_charts(dir: &Path, input: &SvgInput<'_>, render: &RenderConfig) -> Result<Vec<PathBuf>, AppError> {
    create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create SVG dir '{}': {e}", dir.display())))?;

    let mut written = Vec::new();

    if let Some(records) = input.records {
        let path = dir.join("cost_vs_response.svg");
        draw_facets(&path, records, input.ranked, render).map_err(|e| render_err(&path, e))?;
        written.push(path);
    }

    let p_values: Vec<(String, f64)> = input
        .ranked
        .iter()
        .map(|c| (c.regression.city.clone(), c.regression.p_value))
        .collect();
    let path = dir.join("p_values.svg");
    draw_strip(&path, "P-value by City", "P-value", &p_values, Some(input.p_threshold), render)
        .map_err(|e| render_err(&path, e))?;
    written.push(path);

    let r2: Vec<(String, f64)> = input
        .ranked
        .iter()
        .map(|c| (c.regression.city.clone(), c.regression.r_squared))
        .collect();
    let path = dir.join("r_squared.svg");
    draw_strip(&path, "R-squared by City", "R-squared", &r2, None, render)
        .map_err(|e| render_err(&path, e))?;
    written.push(path);

    let path = dir.join("roas.svg");
    draw_roas(&path, input.summaries, render).map_err(|e| render_err(&path, e))?;
    written.push(path);

    info!(dir = %dir.display(), files = written.len(), "wrote SVG charts");
    Ok(written)
}

fn render_err(path: &Path, e: Box<dyn Error>) -> AppError {
    AppError::new(
        ErrorKind::Render,
        format!("Failed to render '{}': {e}", path.display()),
    )
}

fn rgb(palette: Palette, i: usize, n: usize) -> RGBColor {
    let (r, g, b) = palette.color(i, n);
    RGBColor(r, g, b)
}

fn canvas_size(render: &RenderConfig) -> (u32, u32) {
    let w = (render.width as u32).max(60) * PX;
    let h = (render.height as u32).max(40) * PX * 3 / 2;
    (w, h)
}

fn padded(lo: f64, hi: f64) -> (f64, f64) {
    let span = hi - lo;
    if span > 0.0 {
        (lo - span * 0.05, hi + span * 0.05)
    } else {
        let pad = lo.abs().max(1.0) * 0.05;
        (lo - pad, hi + pad)
    }
}

fn draw_facets(path: &Path, records: &[Record], ranked: &[ClassifiedCity], render: &RenderConfig) -> DrawResult {
    let mut groups: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
    for r in records {
        groups.entry(r.city.as_str()).or_default().push((r.cost, r.response));
    }
    if groups.is_empty() {
        return Err("no records to plot".into());
    }

    let cols = render.facet_cols.clamp(1, groups.len());
    let rows = groups.len().div_ceil(cols);
    let panel = 40 * PX;
    let size = (panel * cols as u32, panel * rows as u32 + 6 * PX);

    // Shared axes across facets.
    let (mut x0, mut x1) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y0, mut y1) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in groups.values().flatten() {
        x0 = x0.min(x);
        x1 = x1.max(x);
        y0 = y0.min(y);
        y1 = y1.max(y);
    }
    let (x0, x1) = padded(x0, x1);
    let (y0, y1) = padded(y0, y1);

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Cost vs Response Relationship by City", ("sans-serif", 24).into_font())?;
    let areas = root.split_evenly((rows, cols));

    let point_color = rgb(render.palette, 1, 4);
    for (area, (city, points)) in areas.iter().zip(&groups) {
        let mut chart = ChartBuilder::on(area)
            .caption(*city, ("sans-serif", 16).into_font())
            .margin(8)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(x0..x1, y0..y1)?;

        chart
            .configure_mesh()
            .x_desc("Cost")
            .y_desc("Response")
            .x_labels(5)
            .y_labels(5)
            .draw()?;

        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 4, point_color.mix(0.5).filled())),
            )?
            .label("Data Points")
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, point_color.filled()));

        if let Some(c) = ranked.iter().find(|c| c.regression.city == *city) {
            let lo = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
            let hi = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
            chart
                .draw_series(LineSeries::new(
                    [(lo, c.regression.predict(lo)), (hi, c.regression.predict(hi))],
                    RED.stroke_width(2),
                ))?
                .label("Trend Line")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

            chart.draw_series(std::iter::once(Text::new(
                format!("R² = {:.2}", c.regression.r_squared),
                (x0 + 0.05 * (x1 - x0), y1 - 0.05 * (y1 - y0)),
                ("sans-serif", 14).into_font(),
            )))?;
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::LowerRight)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn draw_strip(
    path: &Path,
    title: &str,
    y_desc: &str,
    values: &[(String, f64)],
    threshold: Option<f64>,
    render: &RenderConfig,
) -> DrawResult {
    let n = values.len().max(1);
    let names: Vec<String> = values.iter().map(|(c, _)| c.clone()).collect();

    let root = SVGBackend::new(path, canvas_size(render)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22).into_font())
        .margin(16)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..n as f64, 0.0..1.05)?;

    let label_at = |v: &f64| category_label(&names, *v);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("City")
        .y_desc(y_desc)
        .x_labels(n * 2 + 1)
        .x_label_formatter(&label_at)
        .draw()?;

    chart.draw_series(values.iter().enumerate().filter(|(_, (_, v))| v.is_finite()).map(
        |(i, (_, v))| {
            let color = rgb(render.palette, i, n);
            Circle::new((i as f64 + 0.5, *v), 6, color.filled())
        },
    ))?;

    if let Some(t) = threshold {
        // Dashes as short path segments.
        let dash = n as f64 / 40.0;
        chart
            .draw_series((0..40).step_by(2).map(|k| {
                let a = k as f64 * dash;
                PathElement::new(vec![(a, t), (a + dash, t)], RED.stroke_width(2))
            }))?
            .label(format!("Significance Threshold (p={t})"))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn draw_roas(path: &Path, summaries: &[CitySummary], render: &RenderConfig) -> DrawResult {
    let n = summaries.len().max(1);
    let names: Vec<String> = summaries.iter().map(|s| s.city.clone()).collect();
    let finite = || summaries.iter().map(|s| s.roas).filter(|v| v.is_finite());
    let y_max = finite().fold(0.0, f64::max);
    let y_min = finite().fold(0.0, f64::min);
    let (y_min, y_max) = (y_min * 1.15, if y_max > 0.0 { y_max * 1.15 } else { 1.0 });

    let root = SVGBackend::new(path, canvas_size(render)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("ROAS by City", ("sans-serif", 22).into_font())
        .margin(16)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..n as f64, y_min..y_max)?;

    let label_at = |v: &f64| category_label(&names, *v);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("City")
        .y_desc("ROAS")
        .x_labels(n * 2 + 1)
        .x_label_formatter(&label_at)
        .draw()?;

    chart.draw_series(summaries.iter().enumerate().filter(|(_, s)| s.roas.is_finite()).map(
        |(i, s)| {
            let color = rgb(render.palette, i, n);
            Rectangle::new([(i as f64 + 0.1, 0.0), (i as f64 + 0.9, s.roas)], color.filled())
        },
    ))?;

    chart.draw_series(summaries.iter().enumerate().filter(|(_, s)| s.roas.is_finite()).map(
        |(i, s)| {
            Text::new(
                format!("{:.2}", s.roas),
                (i as f64 + 0.35, s.roas + (y_max - y_min) * 0.04),
                ("sans-serif", 14).into_font(),
            )
        },
    ))?;

    root.present()?;
    Ok(())
}

/// Label category slot centers (`i + 0.5`) with the city name.
fn category_label(names: &[String], v: f64) -> String {
    let idx = v.floor();
    if idx < 0.0 || (v - idx - 0.5).abs() > 0.01 {
        return String::new();
    }
    names.get(idx as usize).cloned().unwrap_or_default()
}
