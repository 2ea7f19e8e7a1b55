//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed samples: `o`
//! - fitted curve: `-`
//! - generating (true) curve for synthetic data: `.`

use crate::domain::{CurveFile, ModelFamily, SampleSet};
use crate::models::predict;

/// Render observed samples, the fitted curve and (optionally) the true curve.
pub fn render_ascii_plot(
    samples: &SampleSet,
    family: ModelFamily,
    params: &[f64],
    true_params: Option<&[f64]>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let (t_min, t_max) = t_range(samples.t()).unwrap_or((0.0, 10.0));
    let ts = column_times(t_min, t_max, width);

    let fitted: Vec<f64> = ts.iter().map(|&t| predict(family, t, params)).collect();
    let truth: Option<Vec<f64>> = true_params.map(|p| ts.iter().map(|&t| predict(family, t, p)).collect());

    let observed = samples.y().iter().copied();
    let curves = fitted.iter().chain(truth.iter().flatten()).copied();
    let (y_min, y_max) = y_range(observed.chain(curves));

    let mut canvas = Canvas::new(width, height, (t_min, t_max), (y_min, y_max));
    canvas.trace(&fitted, '-');
    if let Some(truth) = &truth {
        canvas.trace(truth, '.');
    }
    for (t, y) in samples.iter() {
        canvas.mark(t, y, 'o');
    }
    canvas.render()
}

/// Render a plot from a saved curve JSON file (curve only, no overlay points).
pub fn render_ascii_plot_from_curve_file(curve: &CurveFile, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let (t_min, t_max) = t_range(&curve.grid.t).unwrap_or((0.0, 10.0));
    let fitted: Vec<f64> = column_times(t_min, t_max, width)
        .into_iter()
        .map(|t| interpolate(&curve.grid.t, &curve.grid.y, t))
        .collect();
    let (y_min, y_max) = y_range(fitted.iter().copied());

    let mut canvas = Canvas::new(width, height, (t_min, t_max), (y_min, y_max));
    canvas.trace(&fitted, '-');

    let mut out = format!(
        "{} fit: {}\n",
        curve.model.display_name(),
        crate::report::fmt_vec(&curve.params)
    );
    out.push_str(&canvas.render());
    out
}

/// Fixed-size character grid with row 0 at the top (largest y).
struct Canvas {
    cells: Vec<Vec<char>>,
    t_span: (f64, f64),
    y_span: (f64, f64),
}

impl Canvas {
    fn new(width: usize, height: usize, t_span: (f64, f64), y_span: (f64, f64)) -> Self {
        Self {
            cells: vec![vec![' '; width.max(1)]; height.max(1)],
            t_span,
            y_span,
        }
    }

    fn width(&self) -> usize {
        self.cells[0].len()
    }

    fn height(&self) -> usize {
        self.cells.len()
    }

    fn column(&self, t: f64) -> usize {
        let (lo, hi) = self.t_span;
        let u = ((t - lo) / (hi - lo)).clamp(0.0, 1.0);
        (u * (self.width() - 1) as f64).round() as usize
    }

    fn row(&self, y: f64) -> usize {
        let (lo, hi) = self.y_span;
        let u = ((y - lo) / (hi - lo)).clamp(0.0, 1.0);
        ((1.0 - u) * (self.height() - 1) as f64).round() as usize
    }

    /// Draw one value per column, bridging vertical jumps so steep sections
    /// stay connected. Only blank cells are written.
    fn trace(&mut self, ys: &[f64], ch: char) {
        let mut prev: Option<usize> = None;
        for (x, &y) in ys.iter().enumerate().take(self.width()) {
            if !y.is_finite() {
                prev = None;
                continue;
            }
            let r = self.row(y);
            let (top, bottom) = match prev {
                Some(p) if p + 1 < r => (p + 1, r),
                Some(p) if r + 1 < p => (r, p - 1),
                _ => (r, r),
            };
            for row in &mut self.cells[top..=bottom] {
                if row[x] == ' ' {
                    row[x] = ch;
                }
            }
            prev = Some(r);
        }
    }

    /// Overwrite the cell nearest `(t, y)`.
    fn mark(&mut self, t: f64, y: f64, ch: char) {
        if !(t.is_finite() && y.is_finite()) {
            return;
        }
        let (x, r) = (self.column(t), self.row(y));
        self.cells[r][x] = ch;
    }

    fn render(self) -> String {
        let (t_min, t_max) = self.t_span;
        let (y_min, y_max) = self.y_span;
        let mut out = format!("Plot: t=[{t_min:.3}, {t_max:.3}] | y=[{y_min:.2}, {y_max:.2}]\n");
        for row in self.cells {
            out.extend(row);
            out.push('\n');
        }
        out
    }
}

fn column_times(t_min: f64, t_max: f64, width: usize) -> Vec<f64> {
    let n = width.max(2);
    let last = (n - 1) as f64;
    (0..n).map(|x| t_min + (x as f64 / last) * (t_max - t_min)).collect()
}

/// Piecewise-linear lookup into a sorted grid, clamped at both ends.
fn interpolate(ts: &[f64], ys: &[f64], t: f64) -> f64 {
    let n = ts.len().min(ys.len());
    if n == 0 {
        return f64::NAN;
    }
    if t <= ts[0] {
        return ys[0];
    }
    if t >= ts[n - 1] {
        return ys[n - 1];
    }
    let i = ts[..n].partition_point(|&v| v <= t).clamp(1, n - 1);
    let (t0, t1) = (ts[i - 1], ts[i]);
    if t1 <= t0 {
        return ys[i];
    }
    let w = (t - t0) / (t1 - t0);
    ys[i - 1] + w * (ys[i] - ys[i - 1])
}

fn t_range(t: &[f64]) -> Option<(f64, f64)> {
    let (lo, hi) = t
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return None;
    }
    Some(if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) })
}

/// Padded y-range over all finite values; `(0, 1)` when there are none.
fn y_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let (lo, hi) = if !lo.is_finite() {
        (0.0, 1.0)
    } else if hi > lo {
        (lo, hi)
    } else {
        (lo - 0.5, hi + 0.5)
    };
    let pad = ((hi - lo) * 0.05).max(1e-12);
    (lo - pad, hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_golden_snapshot_small() {
        let samples = SampleSet::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        let txt = render_ascii_plot(&samples, ModelFamily::Polynomial, &[0.0, 1.0, 0.0], None, 10, 5);
        let expected = concat!(
            "Plot: t=[0.000, 1.000] | y=[-0.05, 1.05]\n",
            "         o\n",
            "      --- \n",
            "    --    \n",
            " ---      \n",
            "o         \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn true_curve_is_drawn_with_dots() {
        let samples = SampleSet::new(vec![0.0, 5.0, 10.0], vec![1.0, 2.0, 3.0]).unwrap();
        let txt = render_ascii_plot(
            &samples,
            ModelFamily::Polynomial,
            &[1.0, 0.2, 0.0],
            Some(&[3.0, -0.2, 0.0]),
            40,
            12,
        );
        let body: String = txt.lines().skip(1).collect::<Vec<_>>().join("\n");
        assert!(body.contains('.'));
        assert!(body.contains('-'));
        assert_eq!(body.matches('o').count(), 3);
        assert_eq!(txt.lines().count(), 13);
    }

    #[test]
    fn steep_sections_stay_connected() {
        let mut canvas = Canvas::new(3, 6, (0.0, 2.0), (0.0, 5.0));
        canvas.trace(&[0.0, 5.0, 5.0], '-');
        let col1: String = canvas.cells.iter().map(|row| row[1]).collect();
        assert_eq!(col1, "----- ");
    }

    #[test]
    fn degenerate_ranges_still_render() {
        let samples = SampleSet::new(vec![2.0, 2.0], vec![6.0, 6.0]).unwrap();
        let txt = render_ascii_plot(&samples, ModelFamily::Polynomial, &[2.0, 2.0, 2.0], None, 10, 5);
        assert!(txt.starts_with("Plot: t=[1.500, 2.500]"));
        assert!(txt.lines().skip(1).any(|l| l.contains('o')));
    }

    #[test]
    fn interpolation_is_linear_and_clamped() {
        let ts = [0.0, 1.0, 2.0];
        let ys = [0.0, 10.0, 30.0];
        assert_eq!(interpolate(&ts, &ys, -1.0), 0.0);
        assert_eq!(interpolate(&ts, &ys, 0.5), 5.0);
        assert_eq!(interpolate(&ts, &ys, 1.5), 20.0);
        assert_eq!(interpolate(&ts, &ys, 3.0), 30.0);
        assert!(interpolate(&[], &[], 1.0).is_nan());
    }
}
