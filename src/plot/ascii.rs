//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Charts:
//! - cost vs response facets, one panel per city: points `o`, trend line `-`
//! - strip plots of p-value and R² per city (threshold as a dashed row)
//! - horizontal ROAS bars

use std::collections::BTreeMap;

use crate::domain::{CitySummary, ClassifiedCity, Record, RenderConfig};
use crate::report::format::truncate;

/// Columns between facets.
const FACET_GAP: usize = 2;

/// Per-city scatter + trend facets with shared axes.
pub fn render_city_facets(records: &[Record], ranked: &[ClassifiedCity], render: &RenderConfig) -> String {
    let mut groups: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
    for r in records {
        groups.entry(r.city.as_str()).or_default().push((r.cost, r.response));
    }
    if groups.is_empty() {
        return "No data to plot.\n".to_string();
    }

    let trends: BTreeMap<&str, &ClassifiedCity> = ranked
        .iter()
        .map(|c| (c.regression.city.as_str(), c))
        .collect();

    let all: Vec<(f64, f64)> = groups.values().flatten().copied().collect();
    let (x_min, x_max) = value_range(all.iter().map(|p| p.0)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = value_range(all.iter().map(|p| p.1)).unwrap_or((0.0, 1.0));
    let (x_min, x_max) = pad_range(x_min, x_max, 0.05);
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let cols = render.facet_cols.clamp(1, groups.len());
    let panel_w = (render.width.saturating_sub(FACET_GAP * (cols - 1)) / cols).max(12);
    let panel_h = (render.height / 2).max(5);

    let mut panels: Vec<Vec<String>> = Vec::with_capacity(groups.len());
    for (city, points) in &groups {
        let mut grid = vec![vec![' '; panel_w]; panel_h];

        let trend = trends.get(city);
        if let Some(c) = trend {
            let (lo, hi) = value_range(points.iter().map(|p| p.0)).unwrap_or((x_min, x_max));
            let (x0, y0) = (
                map_x(lo, x_min, x_max, panel_w),
                map_y(c.regression.predict(lo), y_min, y_max, panel_h),
            );
            let (x1, y1) = (
                map_x(hi, x_min, x_max, panel_w),
                map_y(c.regression.predict(hi), y_min, y_max, panel_h),
            );
            draw_line(&mut grid, x0, y0, x1, y1, '-');
        }

        for &(x, y) in points {
            grid[map_y(y, y_min, y_max, panel_h)][map_x(x, x_min, x_max, panel_w)] = 'o';
        }

        let r2_label = match trend {
            Some(c) => format!("R² = {:.2}", c.regression.r_squared),
            None => "R² = n/a".to_string(),
        };

        let mut lines = Vec::with_capacity(panel_h + 2);
        lines.push(pad_to(&truncate(city, panel_w), panel_w));
        lines.push(pad_to(&r2_label, panel_w));
        lines.extend(grid.into_iter().map(|row| row.into_iter().collect::<String>()));
        panels.push(lines);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Cost vs Response by City | cost=[{x_min:.2}, {x_max:.2}] | response=[{y_min:.2}, {y_max:.2}]\n"
    ));
    let gap = " ".repeat(FACET_GAP);
    for (row_idx, row) in panels.chunks(cols).enumerate() {
        if row_idx > 0 {
            out.push('\n');
        }
        for line in 0..panel_h + 2 {
            let joined: Vec<&str> = row.iter().map(|p| p[line].as_str()).collect();
            out.push_str(joined.join(&gap).trim_end());
            out.push('\n');
        }
    }
    out
}

/// Strip plot of p-values, with the significance threshold as a dashed row.
pub fn render_p_value_strip(ranked: &[ClassifiedCity], threshold: f64, render: &RenderConfig) -> String {
    let values: Vec<(&str, f64)> = ranked
        .iter()
        .map(|c| (c.regression.city.as_str(), c.regression.p_value))
        .collect();
    render_strip("P-value by City", &values, Some(threshold), render)
}

/// Strip plot of R² values.
pub fn render_r2_strip(ranked: &[ClassifiedCity], render: &RenderConfig) -> String {
    let values: Vec<(&str, f64)> = ranked
        .iter()
        .map(|c| (c.regression.city.as_str(), c.regression.r_squared))
        .collect();
    render_strip("R-squared by City", &values, None, render)
}

/// One column slot per city on a fixed `[0, 1]` axis.
fn render_strip(title: &str, values: &[(&str, f64)], threshold: Option<f64>, render: &RenderConfig) -> String {
    let width = render.width.max(10);
    let height = render.height.max(5);

    let mut out = String::new();
    out.push_str(&format!("{title} | y=[0.00, 1.00]"));
    if let Some(t) = threshold {
        out.push_str(&format!(" | - - threshold={t:.2}"));
    }
    out.push('\n');

    if values.is_empty() {
        out.push_str("(no cities)\n");
        return out;
    }

    let slot = (width / values.len()).max(1);
    let mut grid = vec![vec![' '; slot * values.len()]; height];

    if let Some(t) = threshold {
        let row = map_y(t, 0.0, 1.0, height);
        for (x, cell) in grid[row].iter_mut().enumerate() {
            if x % 2 == 0 {
                *cell = '-';
            }
        }
    }

    for (i, &(_, v)) in values.iter().enumerate() {
        if v.is_finite() {
            grid[map_y(v, 0.0, 1.0, height)][i * slot + slot / 2] = 'o';
        }
    }

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    let label_w = slot.saturating_sub(1).max(1);
    for &(city, _) in values {
        out.push_str(&pad_to(&truncate(city, label_w), slot));
    }
    out.push('\n');
    out
}

/// Horizontal ROAS bars with two-decimal labels.
pub fn render_roas_bars(summaries: &[CitySummary], render: &RenderConfig) -> String {
    let mut out = String::from("ROAS by City\n");
    if summaries.is_empty() {
        out.push_str("(no cities)\n");
        return out;
    }

    let name_w = summaries
        .iter()
        .map(|s| s.city.chars().count())
        .max()
        .unwrap_or(4)
        .min(16);
    let bar_w = render.width.saturating_sub(name_w + 10).max(10);
    let max_roas = summaries
        .iter()
        .map(|s| s.roas)
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max);

    for s in summaries {
        let len = if max_roas > 0.0 && s.roas > 0.0 {
            ((s.roas / max_roas) * bar_w as f64).round() as usize
        } else {
            0
        };
        let bar = format!("{:<bar_w$}", "#".repeat(len.min(bar_w)));
        out.push_str(&format!(
            "{:<name_w$} |{bar} {:.2}\n",
            truncate(&s.city, name_w),
            s.roas
        ));
    }
    out
}

fn pad_to(s: &str, width: usize) -> String {
    let n = s.chars().count();
    if n >= width {
        return s.to_string();
    }
    let mut out = s.to_string();
    out.push_str(&" ".repeat(width - n));
    out
}

fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;
    for v in values {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v.is_finite() && max_v.is_finite() {
        Some((min_v, max_v))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = if span > 0.0 { span * frac } else { min.abs().max(1.0) * frac };
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
            grid[y0 as usize][x0 as usize] = ch;
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
