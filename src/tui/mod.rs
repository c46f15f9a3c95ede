//! Ratatui-based terminal UI.
//!
//! The TUI runs the analysis once, then lets the user browse cities: a city list,
//! the selected city's summary and regression details, and a cost/response chart
//! with the fitted trend line.

use std::cmp::Ordering;
use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use tracing::info;

use crate::app::pipeline::RunOutput;
use crate::domain::{AnalysisConfig, Category, Record};
use crate::error::{AppError, ErrorKind};

mod plotters_chart;

use plotters_chart::CityChart;

/// Start the TUI.
///
/// The analysis runs before the terminal switches to the alternate screen, so
/// load errors are reported like any other command.
pub fn run(config: AnalysisConfig) -> Result<(), AppError> {
    let run = crate::app::pipeline::run_analysis(&config)?;
    info!(cities = run.summaries.len(), "starting TUI");

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend).map_err(|e| render_err("Failed to initialize terminal", e))?;

    let mut app = App::new(run, config);
    app.event_loop(&mut terminal)
}

fn render_err(context: &str, e: impl std::fmt::Display) -> AppError {
    AppError::new(ErrorKind::Render, format!("{context}: {e}"))
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| render_err("Failed to enable raw mode", e))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(render_err("Failed to enter alternate screen", e));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// City list ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortMode {
    /// Ascending p-value; cities without a regression last.
    PValue,
    /// Descending ROAS.
    Roas,
    City,
}

impl SortMode {
    fn next(self) -> Self {
        match self {
            SortMode::PValue => SortMode::Roas,
            SortMode::Roas => SortMode::City,
            SortMode::City => SortMode::PValue,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SortMode::PValue => "p-value",
            SortMode::Roas => "ROAS",
            SortMode::City => "city",
        }
    }
}

struct App {
    run: RunOutput,
    config: AnalysisConfig,
    sort: SortMode,
    /// Indices into `run.summaries`, in display order.
    order: Vec<usize>,
    selected: usize,
    status: String,
}

impl App {
    fn new(run: RunOutput, config: AnalysisConfig) -> Self {
        let sort = SortMode::PValue;
        let order = sorted_order(&run, sort);
        let status = format!(
            "{} cities | {} regressed | {} excluded",
            run.summaries.len(),
            run.ranked.len(),
            run.skipped.len()
        );
        Self {
            run,
            config,
            sort,
            order,
            selected: 0,
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| render_err("Terminal draw error", e))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100)).map_err(|e| render_err("Event poll error", e))? {
                continue;
            }

            match event::read().map_err(|e| render_err("Event read error", e))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.order.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = self.order.len().saturating_sub(1),
            KeyCode::Char('s') => {
                // Keep the same city selected across re-sorts.
                let current = self.order.get(self.selected).copied();
                self.sort = self.sort.next();
                self.order = sorted_order(&self.run, self.sort);
                self.selected = current
                    .and_then(|idx| self.order.iter().position(|&i| i == idx))
                    .unwrap_or(0);
                self.status = format!("sort: {}", self.sort.label());
            }
            _ => {}
        }
        false
    }

    fn selected_city(&self) -> Option<&str> {
        self.order
            .get(self.selected)
            .and_then(|&i| self.run.summaries.get(i))
            .map(|s| s.city.as_str())
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let stats = &self.run.dataset.stats;
        let lines = vec![
            Line::from(vec![
                Span::styled("geo", Style::default().fg(Color::Cyan)),
                Span::raw(format!(" - {}", self.config.csv_path.display())),
            ]),
            Line::from(Span::styled(
                format!(
                    "rows: {} used / {} read | dates: {} .. {} | p < {} | R² >= {}",
                    stats.rows_used,
                    stats.rows_read,
                    stats.date_min,
                    stats.date_max,
                    self.run.thresholds.p_value,
                    self.run.thresholds.r_squared,
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(32), Constraint::Min(0)])
            .split(area);
        self.draw_city_list(frame, cols[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(9), Constraint::Min(0)])
            .split(cols[1]);
        self.draw_details(frame, right[0]);
        self.draw_chart(frame, right[1]);
    }

    fn draw_city_list(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .order
            .iter()
            .filter_map(|&i| self.run.summaries.get(i))
            .map(|s| {
                let (tag, color) = match self.run.ranked_for(&s.city) {
                    Some(c) => (category_tag(c.category), category_color(c.category)),
                    None => ("--", Color::Red),
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{tag} "), Style::default().fg(color)),
                    Span::raw(s.city.clone()),
                ]))
            })
            .collect();

        let title = format!("Cities (sort: {})", self.sort.label());
        let list = List::new(items)
            .block(Block::default().title(title).borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_details(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Details").borders(Borders::ALL);
        let Some(city) = self.selected_city() else {
            frame.render_widget(Paragraph::new("No cities.").block(block), area);
            return;
        };

        let mut lines: Vec<Line> = Vec::new();
        if let Some(s) = self.run.summaries.iter().find(|s| s.city == city) {
            lines.push(Line::from(format!(
                "total cost {:.2} | total response {:.2} | ROAS {:.4}",
                s.total_cost, s.total_response, s.roas
            )));
            lines.push(Line::from(format!(
                "avg cost {:.2} | avg response {:.2} | records {}",
                s.avg_cost, s.avg_response, s.count
            )));
        }

        if let Some(c) = self.run.ranked_for(city) {
            let r = &c.regression;
            lines.push(Line::from(format!(
                "slope {:.4} | intercept {:.2} | p {:.4} | R² {:.4} | n {}",
                r.slope, r.intercept, r.p_value, r.r_squared, r.n
            )));
            lines.push(Line::from(Span::styled(
                c.category.as_str(),
                Style::default()
                    .fg(category_color(c.category))
                    .add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(c.interpretation.clone()));
        } else if let Some(s) = self.run.skipped_for(city) {
            lines.push(Line::from(Span::styled(
                format!("excluded from regression: {}", s.reason),
                Style::default().fg(Color::Red),
            )));
        }

        let p = Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(p, area);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let city = self.selected_city().unwrap_or("-");
        let block = Block::default()
            .title(format!("{city}: cost vs response"))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let points = city_points(&self.run.dataset.records, city);
        let Some((x_bounds, y_bounds)) = chart_bounds(&points) else {
            let msg = Paragraph::new("No data for this city.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let trend: Vec<(f64, f64)> = match self.run.ranked_for(city) {
            Some(c) => x_bounds
                .iter()
                .map(|&x| (x, c.regression.predict(x)))
                .collect(),
            None => Vec::new(),
        };

        let n = self.run.summaries.len();
        let idx = self.order.get(self.selected).copied().unwrap_or(0);
        let (chart_rect, insets) = chart_layout(inner);
        let widget = CityChart {
            points: &points,
            trend: &trend,
            x_bounds,
            y_bounds,
            point_color: self.config.render.palette.color(idx, n),
            fmt_x: fmt_axis,
            fmt_y: fmt_axis,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, x_bounds, y_bounds);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  s sort  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Indices into `run.summaries` ordered by `mode`. Ties fall back to city name.
fn sorted_order(run: &RunOutput, mode: SortMode) -> Vec<usize> {
    let mut order: Vec<usize> = (0..run.summaries.len()).collect();
    let city = |i: usize| run.summaries[i].city.as_str();

    match mode {
        SortMode::City => order.sort_by(|&a, &b| city(a).cmp(city(b))),
        SortMode::Roas => order.sort_by(|&a, &b| {
            run.summaries[b]
                .roas
                .total_cmp(&run.summaries[a].roas)
                .then_with(|| city(a).cmp(city(b)))
        }),
        SortMode::PValue => {
            let p = |i: usize| run.ranked_for(city(i)).map(|c| c.regression.p_value);
            order.sort_by(|&a, &b| {
                let by_p = match (p(a), p(b)) {
                    (Some(pa), Some(pb)) => pa.total_cmp(&pb),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                by_p.then_with(|| city(a).cmp(city(b)))
            });
        }
    }
    order
}

fn city_points(records: &[Record], city: &str) -> Vec<(f64, f64)> {
    records
        .iter()
        .filter(|r| r.city == city)
        .map(|r| (r.cost, r.response))
        .collect()
}

/// Padded chart bounds, or `None` when there is nothing to draw.
fn chart_bounds(points: &[(f64, f64)]) -> Option<([f64; 2], [f64; 2])> {
    if points.is_empty() {
        return None;
    }
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in points {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    Some((padded(x_min, x_max), padded(y_min, y_max)))
}

fn padded(lo: f64, hi: f64) -> [f64; 2] {
    let span = hi - lo;
    let pad = if span > 0.0 { span * 0.05 } else { lo.abs().max(1.0) * 0.1 };
    [lo - pad, hi + pad]
}

fn category_tag(category: Category) -> &'static str {
    match category {
        Category::SignificantStrong => "++",
        Category::SignificantWeak => "+ ",
        Category::NotSignificant => "  ",
    }
}

fn category_color(category: Category) -> Color {
    match category {
        Category::SignificantStrong => Color::Green,
        Category::SignificantWeak => Color::Yellow,
        Category::NotSignificant => Color::Gray,
    }
}

fn fmt_axis(v: f64) -> String {
    format!("{v:.0}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 9,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_axis(x_val);
        let label_len = label.len() as u16;
        let start = x.saturating_sub(label_len / 2);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_axis(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("cost")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new("response").style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}
