//! Ratatui-based terminal UI.
//!
//! The TUI provides a settings panel for choosing the model family, the
//! initial guess and the solver knobs, then renders the data, the fitted curve
//! and (for synthetic data) the generating curve.

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
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::app::pipeline::{RunOutput, run_fit};
use crate::cli::{FitArgs, parse_param_list};
use crate::domain::{DataSource, FitConfig};
use crate::error::AppError;
use crate::report::fmt_vec;

mod plotters_chart;

use plotters_chart::LmPlottersChart;

/// Settings rows, in display order.
const FIELDS: [Field; 7] = [
    Field::Model,
    Field::Guess,
    Field::Noise,
    Field::MaxIterations,
    Field::Tolerance,
    Field::Damping,
    Field::Seed,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Model,
    Guess,
    Noise,
    MaxIterations,
    Tolerance,
    Damping,
    Seed,
}

/// Start the TUI.
pub fn run(args: FitArgs) -> Result<(), AppError> {
    let mut app = App::new(crate::app::fit_config_from_args(&args)?);
    app.refit();

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
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

struct App {
    config: FitConfig,
    guess_input: String,
    selected_field: usize,
    editing_guess: bool,
    status: String,
    run: Option<RunOutput>,
}

impl App {
    fn new(config: FitConfig) -> Self {
        let guess_input = join_params(&config.initial_guess);
        Self {
            config,
            guess_input,
            selected_field: 0,
            editing_guess: false,
            status: String::new(),
            run: None,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
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

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing_guess {
            self.handle_guess_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < FIELDS.len() {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Enter => {
                if FIELDS[self.selected_field] == Field::Guess {
                    self.editing_guess = true;
                    self.status = "Editing guess (comma-separated). Enter to apply, Esc to cancel.".to_string();
                }
            }
            KeyCode::Char('r') => {
                if let DataSource::Synthetic { seed, .. } = &mut self.config.source {
                    *seed = seed.wrapping_add(1);
                }
                self.refit();
            }
            _ => {}
        }

        false
    }

    fn handle_guess_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing_guess = false;
                self.guess_input = join_params(&self.config.initial_guess);
                self.status = "Guess edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing_guess = false;
                self.apply_guess_input();
            }
            KeyCode::Backspace => {
                self.guess_input.pop();
            }
            KeyCode::Char(c) => {
                if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | ',' | 'e' | 'E' | ' ') {
                    self.guess_input.push(c);
                }
            }
            _ => {}
        }
    }

    fn apply_guess_input(&mut self) {
        match parse_param_list(self.guess_input.trim()) {
            Ok(list) => {
                self.config.initial_guess = list.0;
                self.refit();
            }
            Err(e) => {
                self.status = format!("Invalid guess: {e}");
            }
        }
    }

    fn adjust_field(&mut self, delta: i32) {
        let up = delta >= 0;
        match FIELDS[self.selected_field] {
            Field::Model => {
                let family = if up {
                    self.config.family.next()
                } else {
                    self.config.family.prev()
                };
                self.config.family = family;
                self.config.initial_guess = family.default_guess();
                self.guess_input = join_params(&self.config.initial_guess);
                if let DataSource::Synthetic { true_params, .. } = &mut self.config.source {
                    *true_params = family.default_true_params();
                }
            }
            Field::Guess => return,
            Field::Noise => {
                let DataSource::Synthetic { noise_std, .. } = &mut self.config.source else {
                    self.status = "Noise only applies to synthetic data.".to_string();
                    return;
                };
                *noise_std = step_noise(*noise_std, up);
            }
            Field::MaxIterations => {
                let cur = self.config.solver.max_iterations;
                self.config.solver.max_iterations = if up { cur.saturating_add(10) } else { cur.saturating_sub(10) };
            }
            Field::Tolerance => {
                self.config.solver.tolerance = step_decade(self.config.solver.tolerance, up, 1e-12, 1e-1);
            }
            Field::Damping => {
                self.config.solver.initial_damping =
                    step_decade(self.config.solver.initial_damping, up, 1e-12, 1e6);
            }
            Field::Seed => {
                let DataSource::Synthetic { seed, .. } = &mut self.config.source else {
                    self.status = "Seed only applies to synthetic data.".to_string();
                    return;
                };
                *seed = if up { seed.wrapping_add(1) } else { seed.wrapping_sub(1) };
            }
        }
        self.refit();
    }

    /// Run the pipeline; failures land in the status line instead of closing the UI.
    fn refit(&mut self) {
        match run_fit(&self.config) {
            Ok(run) => {
                self.status = format!(
                    "{} after {} iteration(s)",
                    run.outcome.termination.label(),
                    run.outcome.iterations
                );
                self.run = Some(run);
            }
            Err(err) => {
                self.status = format!("Fit failed: {err}");
                self.run = None;
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("lm", Style::default().fg(Color::Cyan)),
            Span::raw(" | Levenberg-Marquardt curve fit"),
        ]));

        let n = self.run.as_ref().map(|r| r.samples.len()).unwrap_or(0);
        lines.push(Line::from(Span::styled(
            format!(
                "model: {} | {} | n={n}",
                self.config.family.display_name(),
                self.config.family.formula()
            ),
            Style::default().fg(Color::Gray),
        )));

        if let Some(run) = &self.run {
            lines.push(Line::from(Span::styled(
                format!(
                    "params={} | mse={:.6} | {} ({} iter)",
                    fmt_vec(&run.outcome.params),
                    run.mse,
                    run.outcome.termination.label(),
                    run.outcome.iterations,
                ),
                Style::default().fg(Color::Gray),
            )));
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(FIELDS.len() as u16 + 2)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_settings(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Fit").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(run) = &self.run else {
            let msg = Paragraph::new("No fit to show.")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        };

        let series = chart_series(run, &self.config);

        let widget = LmPlottersChart {
            curve: &series.curve,
            truth: &series.truth,
            points: &series.points,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            x_label: "t",
            y_label: "y",
            fmt_x: fmt_axis,
            fmt_y: fmt_axis,
        };

        frame.render_widget(widget, inner);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let (noise, seed) = match &self.config.source {
            DataSource::Synthetic { noise_std, seed, .. } => (format!("{noise_std:.2}"), seed.to_string()),
            DataSource::File(path) => (format!("n/a ({})", path.display()), "n/a".to_string()),
        };
        let guess = if self.editing_guess {
            format!("{}_", self.guess_input)
        } else {
            self.guess_input.clone()
        };
        let solver = &self.config.solver;

        let items: Vec<ListItem> = FIELDS
            .iter()
            .map(|field| {
                let text = match field {
                    Field::Model => format!("Model: {}", self.config.family.display_name()),
                    Field::Guess => format!("Guess: [{guess}]"),
                    Field::Noise => format!("Noise σ: {noise}"),
                    Field::MaxIterations => format!("Max iterations: {}", solver.max_iterations),
                    Field::Tolerance => format!("Tolerance: {:.0e}", solver.tolerance),
                    Field::Damping => format!("Initial damping: {:.0e}", solver.initial_damping),
                    Field::Seed => format!("Seed: {seed}"),
                };
                ListItem::new(text)
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);

        if self.editing_guess {
            let hint = Paragraph::new("Editing guess…")
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
            let rect = Rect {
                x: area.x + area.width.saturating_sub(18),
                y: area.y,
                width: 16.min(area.width),
                height: 1,
            };
            frame.render_widget(hint, rect);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  Enter edit guess  r reseed  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn join_params(params: &[f64]) -> String {
    params.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(",")
}

fn step_noise(noise: f64, up: bool) -> f64 {
    let next = if up { noise + 0.05 } else { noise - 0.05 };
    // Snap to the 0.05 grid so repeated presses do not drift.
    ((next.max(0.0) * 20.0).round() / 20.0).min(10.0)
}

fn step_decade(value: f64, up: bool, min: f64, max: f64) -> f64 {
    let next = if up { value * 10.0 } else { value / 10.0 };
    next.clamp(min, max)
}

/// Series and bounds handed to the chart widget.
struct ChartSeries {
    curve: Vec<(f64, f64)>,
    truth: Vec<(f64, f64)>,
    points: Vec<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

fn chart_series(run: &RunOutput, config: &FitConfig) -> ChartSeries {
    let stats = run.samples.stats();
    let (mut t0, mut t1) = (stats.t_min, stats.t_max);
    if !t0.is_finite() || !t1.is_finite() || t1 <= t0 {
        t0 -= 0.5;
        t1 += 0.5;
    }
    if !t0.is_finite() || !t1.is_finite() {
        t0 = 0.0;
        t1 = 10.0;
    }
    let x_bounds = [t0, t1];

    let points: Vec<(f64, f64)> = run.samples.iter().collect();

    let ts = crate::data::linspace(t0, t1, 200);
    let grid = |params: &[f64]| -> Vec<(f64, f64)> {
        ts.iter()
            .map(|&t| (t, crate::models::predict(config.family, t, params)))
            .collect()
    };
    let curve = grid(&run.outcome.params);
    let truth = config.true_params().map(grid).unwrap_or_default();

    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, y) in points.iter().chain(&curve).chain(&truth) {
        if y.is_finite() {
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }
    if !y_min.is_finite() || !y_max.is_finite() || y_max <= y_min {
        y_min = 0.0;
        y_max = 1.0;
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);
    let y_bounds = [y_min - pad, y_max + pad];

    ChartSeries {
        curve,
        truth,
        points,
        x_bounds,
        y_bounds,
    }
}

fn fmt_axis(v: f64) -> String {
    format!("{v:.2}")
}
