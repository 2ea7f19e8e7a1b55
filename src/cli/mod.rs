//! Command-line parsing for the Levenberg-Marquardt curve fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::ModelFamily;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "lm", version, about = "Levenberg-Marquardt curve fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a model to synthetic or file data, print the summary, and optionally plot/export.
    Fit(FitArgs),
    /// Plot a previously exported curve JSON.
    Plot(PlotArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same underlying fit pipeline as `lm fit`, but lets you
    /// change the model, guess and solver settings and refit on the fly.
    Tui(FitArgs),
}

/// Comma-separated parameter list, e.g. `2.5,1.3`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamList(pub Vec<f64>);

pub fn parse_param_list(raw: &str) -> Result<ParamList, String> {
    let values = raw
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("'{part}' is not a finite number"))
        })
        .collect::<Result<Vec<f64>, String>>()?;
    Ok(ParamList(values))
}

fn parse_family(raw: &str) -> Result<ModelFamily, String> {
    raw.parse::<ModelFamily>().map_err(|e| e.to_string())
}

/// Common options for fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Model family (exponential, polynomial, sinusoidal).
    #[arg(short = 'm', long, value_parser = parse_family, default_value = "exponential")]
    pub model: ModelFamily,

    /// Initial guess, comma-separated (default: all ones).
    #[arg(short = 'g', long, value_parser = parse_param_list, allow_hyphen_values = true)]
    pub guess: Option<ParamList>,

    /// Parameters used to generate synthetic data (default depends on model).
    #[arg(long = "true-params", value_parser = parse_param_list, allow_hyphen_values = true)]
    pub true_params: Option<ParamList>,

    /// Two-column CSV (t,y) to fit instead of synthetic data.
    #[arg(short = 'f', long, value_name = "CSV")]
    pub data: Option<PathBuf>,

    /// Number of synthetic samples.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub points: usize,

    /// Start of the synthetic sample range.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub t_min: f64,

    /// End of the synthetic sample range.
    #[arg(long, default_value_t = 10.0, allow_hyphen_values = true)]
    pub t_max: f64,

    /// Standard deviation of the Gaussian noise added to synthetic data.
    #[arg(long, default_value_t = 0.1)]
    pub noise: f64,

    /// Random seed for synthetic noise.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Maximum number of LM iterations.
    #[arg(long, default_value_t = 100)]
    pub max_iterations: usize,

    /// Convergence threshold on the step norm.
    #[arg(long, default_value_t = 1e-6)]
    pub tolerance: f64,

    /// Initial damping factor.
    #[arg(long, default_value_t = 0.01)]
    pub damping: f64,

    /// Print the per-iteration solver table.
    #[arg(long)]
    pub trace: bool,

    /// Show the N largest residuals.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export per-sample results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export curve (model + params + fitted grid) to JSON.
    #[arg(long = "export-curve")]
    pub export_curve: Option<PathBuf>,
}

/// Options for plotting a saved curve.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Curve JSON file produced by `lm fit --export-curve`.
    #[arg(long, value_name = "JSON")]
    pub curve: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_lists_parse_with_spaces_and_signs() {
        assert_eq!(parse_param_list("1.0, 1.0").unwrap(), ParamList(vec![1.0, 1.0]));
        assert_eq!(parse_param_list("-2,0.5,3e-1").unwrap(), ParamList(vec![-2.0, 0.5, 0.3]));
        assert!(parse_param_list("1.0,,2").is_err());
        assert!(parse_param_list("a,b").is_err());
    }

    #[test]
    fn fit_args_defaults_match_solver_defaults() {
        let cli = Cli::parse_from(["lm", "fit"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.model, ModelFamily::Exponential);
        assert_eq!(args.max_iterations, 100);
        assert_eq!(args.tolerance, 1e-6);
        assert_eq!(args.damping, 0.01);
        assert!(args.guess.is_none());
    }

    #[test]
    fn unknown_model_is_rejected_by_the_parser() {
        let err = Cli::try_parse_from(["lm", "fit", "--model", "cubic"]).unwrap_err();
        assert!(err.to_string().contains("unsupported model"), "got: {err}");

        let cli = Cli::try_parse_from(["lm", "fit", "-m", "Sinusoidal", "-g", "-1,1.5,0"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.model, ModelFamily::Sinusoidal);
        assert_eq!(args.guess, Some(ParamList(vec![-1.0, 1.5, 0.0])));
    }
}
