//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - builds a `FitConfig` from flags and model defaults
//! - runs the fit pipeline
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, FitArgs, PlotArgs};
use crate::domain::{DataSource, FitConfig, SolverOptions};
use crate::error::AppError;
use crate::fit::TableReporter;

pub mod pipeline;

/// Entry point for the `lm` binary.
pub fn run() -> Result<(), AppError> {
    // `lm` and `lm --model sinusoidal` behave like `lm tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Plot(args) => handle_plot(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args)?;
    log::debug!("fit config: {config:?}");

    let run = if config.trace {
        let mut reporter = TableReporter::new();
        pipeline::run_fit_with_reporter(&config, Some(&mut reporter))?
    } else {
        pipeline::run_fit(&config)?
    };

    println!("{}", crate::report::format_run_summary(&run, &config));
    if args.top > 0 {
        let top = crate::report::largest_residuals(&run.residuals, args.top);
        println!("{}", crate::report::format_residual_table(&top));
    }

    if config.plot {
        let plot = crate::plot::render_ascii_plot(
            &run.samples,
            config.family,
            &run.outcome.params,
            config.true_params(),
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_results {
        crate::io::write_results_csv(path, &run.residuals, run.clean.as_deref())?;
        log::info!("wrote results to {}", path.display());
    }
    if let Some(path) = &config.export_curve {
        let curve = crate::io::build_curve_file(
            config.family,
            &run.outcome,
            &config.solver,
            &run.samples.stats(),
            run.mse,
        );
        crate::io::write_curve_json(path, &curve)?;
        log::info!("wrote curve to {}", path.display());
    }

    Ok(())
}

fn handle_tui(args: FitArgs) -> Result<(), AppError> {
    crate::tui::run(args)
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let curve = crate::io::read_curve_json(&args.curve)?;
    let plot = crate::plot::render_ascii_plot_from_curve_file(&curve, args.width, args.height);
    println!("{plot}");
    Ok(())
}

/// Resolve CLI flags into a pipeline configuration.
///
/// Missing `--guess` and `--true-params` fall back to the model's defaults.
/// A guess of the wrong length is left for the solver to report.
pub fn fit_config_from_args(args: &FitArgs) -> Result<FitConfig, AppError> {
    let family = args.model;
    let initial_guess = args
        .guess
        .as_ref()
        .map(|g| g.0.clone())
        .unwrap_or_else(|| family.default_guess());

    let source = match &args.data {
        Some(path) => DataSource::File(path.clone()),
        None => {
            let true_params = args
                .true_params
                .as_ref()
                .map(|p| p.0.clone())
                .unwrap_or_else(|| family.default_true_params());
            family.check_params(&true_params)?;
            if !(args.noise.is_finite() && args.noise >= 0.0) {
                return Err(AppError::new(2, "--noise must be a finite, non-negative number."));
            }
            DataSource::Synthetic {
                true_params,
                n_points: args.points,
                t_min: args.t_min,
                t_max: args.t_max,
                noise_std: args.noise,
                seed: args.seed,
            }
        }
    };

    let solver = SolverOptions {
        max_iterations: args.max_iterations,
        tolerance: args.tolerance,
        initial_damping: args.damping,
    };
    solver.validate()?;

    Ok(FitConfig {
        family,
        initial_guess,
        source,
        solver,
        trace: args.trace,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_results: args.export.clone(),
        export_curve: args.export_curve.clone(),
    })
}

/// Rewrite argv so `lm` defaults to `lm tui`.
///
/// Rules:
/// - `lm`                      -> `lm tui`
/// - `lm --model poly ...`     -> `lm tui --model poly ...`
/// - `lm --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "plot" | "tui");
    if is_subcommand {
        return argv;
    }

    // A leading flag means "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}
