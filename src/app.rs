//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging
//! - runs the analysis pipeline
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{AnalyzeArgs, Command, PlotArgs, RenderArgs, SampleArgs};
use crate::domain::{AnalysisConfig, RenderConfig, Thresholds};
use crate::error::AppError;
use crate::plot::SvgInput;

pub mod pipeline;

/// Environment variable holding the log filter (`tracing_subscriber::EnvFilter` syntax).
pub const LOG_ENV: &str = "GEO_LOG";

/// Entry point for the `geo` binary.
pub fn run() -> Result<(), AppError> {
    // Must happen before parsing so `.env` can supply GEO_P_THRESHOLD etc.
    dotenvy::dotenv().ok();

    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_tracing(cli.verbose, matches!(cli.command, Command::Tui(_)));

    match cli.command {
        Command::Analyze(args) => handle_analyze(args, OutputMode::Full),
        Command::Summary(args) => handle_analyze(args, OutputMode::SummaryOnly),
        Command::Rank(args) => handle_analyze(args, OutputMode::RankOnly),
        Command::Plot(args) => handle_plot(args),
        Command::Tui(args) => handle_tui(args),
        Command::Sample(args) => handle_sample(args),
    }
}

/// Logs go to stderr so stdout stays clean for reports.
///
/// In the TUI, logging is off unless `GEO_LOG` or `--verbose` asks for it,
/// since stderr shares the terminal with the alternate screen.
fn init_tracing(verbose: bool, tui: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        match EnvFilter::try_from_env(LOG_ENV) {
            Ok(filter) => filter,
            Err(_) if tui => return,
            Err(_) => EnvFilter::new("warn"),
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    SummaryOnly,
    RankOnly,
}

fn handle_analyze(args: AnalyzeArgs, mode: OutputMode) -> Result<(), AppError> {
    let config = config_from_args(&args)?;
    let run = pipeline::run_analysis(&config)?;

    match mode {
        OutputMode::Full => {
            println!(
                "{}",
                crate::report::format_full_report(&run, &config.csv_path, config.top_n)
            );
        }
        OutputMode::SummaryOnly => {
            println!("{}", crate::report::format_city_summary(&run.summaries));
            println!("{}", crate::report::format_roas(&run.summaries));
        }
        OutputMode::RankOnly => {
            println!("{}", crate::report::format_rankings(&run.ranked, config.top_n));
            println!("{}", crate::report::format_interpretations(&run.ranked));
            let skipped = crate::report::format_skipped(&run.skipped);
            if !skipped.is_empty() {
                println!("{skipped}");
            }
        }
    }

    if mode == OutputMode::Full && config.plot {
        let render = &config.render;
        println!(
            "{}",
            crate::plot::render_city_facets(&run.dataset.records, &run.ranked, render)
        );
        println!(
            "{}",
            crate::plot::render_p_value_strip(&run.ranked, config.thresholds.p_value, render)
        );
        println!("{}", crate::plot::render_r2_strip(&run.ranked, render));
        println!("{}", crate::plot::render_roas_bars(&run.summaries, render));
    }

    // Optional exports.
    if let Some(path) = &config.export_summary {
        crate::io::export::write_summary_csv(path, &run.summaries)?;
        info!(path = %path.display(), "wrote summary CSV");
    }
    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, &run.ranked)?;
        info!(path = %path.display(), "wrote results CSV");
    }
    if let Some(path) = &config.export_report {
        let report = run.to_report_file(&config.csv_path);
        crate::io::report_json::write_report_json(path, &report)?;
        info!(path = %path.display(), "wrote report JSON");
    }
    if let Some(dir) = &config.svg_dir {
        let input = SvgInput {
            records: Some(&run.dataset.records),
            summaries: &run.summaries,
            ranked: &run.ranked,
            p_threshold: config.thresholds.p_value,
        };
        crate::plot::write_svg_charts(dir, &input, &config.render)?;
    }

    Ok(())
}

fn handle_tui(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = config_from_args(&args)?;
    crate::tui::run(config)
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let report = crate::io::report_json::read_report_json(&args.report)?;
    let render = render_config_from_args(&args.render)?;
    debug!(input = %report.input.display(), cities = report.summaries.len(), "loaded report");

    // A saved report has no raw records, so per-city facets are unavailable.
    println!(
        "{}",
        crate::plot::render_p_value_strip(&report.ranked, report.thresholds.p_value, &render)
    );
    println!("{}", crate::plot::render_r2_strip(&report.ranked, &render));
    println!("{}", crate::plot::render_roas_bars(&report.summaries, &render));

    if let Some(dir) = &args.svg_dir {
        let input = SvgInput {
            records: None,
            summaries: &report.summaries,
            ranked: &report.ranked,
            p_threshold: report.thresholds.p_value,
        };
        crate::plot::write_svg_charts(dir, &input, &render)?;
    }
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = crate::data::SampleConfig {
        cities: args.cities,
        days: args.days,
        seed: args.seed,
        start: args.start,
    };
    let records = crate::data::generate_sample(&config)?;
    crate::data::write_sample_csv(&args.out, &records)?;
    println!("Wrote {} rows to {}", records.len(), args.out.display());
    Ok(())
}

/// Resolve CLI flags (already merged with env/defaults by clap) into a validated config.
pub fn config_from_args(args: &AnalyzeArgs) -> Result<AnalysisConfig, AppError> {
    let thresholds = Thresholds {
        p_value: args.p_threshold,
        r_squared: args.r2_threshold,
    };
    if !(thresholds.p_value > 0.0 && thresholds.p_value <= 1.0) {
        return Err(AppError::config(format!(
            "p-value threshold must be in (0, 1], got {}",
            thresholds.p_value
        )));
    }
    if !(0.0..=1.0).contains(&thresholds.r_squared) {
        return Err(AppError::config(format!(
            "R² threshold must be in [0, 1], got {}",
            thresholds.r_squared
        )));
    }

    Ok(AnalysisConfig {
        csv_path: args.csv.clone(),
        thresholds,
        top_n: args.top,
        plot: !args.no_plot,
        render: render_config_from_args(&args.render)?,
        export_summary: args.export_summary.clone(),
        export_results: args.export_results.clone(),
        export_report: args.export_report.clone(),
        svg_dir: args.svg_dir.clone(),
    })
}

fn render_config_from_args(args: &RenderArgs) -> Result<RenderConfig, AppError> {
    if args.width == 0 || args.height == 0 || args.facet_cols == 0 {
        return Err(AppError::config("Plot width, height and facet columns must be > 0."));
    }
    Ok(RenderConfig {
        width: args.width,
        height: args.height,
        facet_cols: args.facet_cols,
        palette: args.palette,
    })
}

/// Rewrite argv so `geo data.csv ...` means `geo analyze data.csv ...`.
///
/// Rules:
/// - `geo`                          -> unchanged (clap prints usage)
/// - `geo --help/--version/-h/help` -> unchanged
/// - `geo <subcommand> ...`         -> unchanged
/// - `geo <path> ...`               -> `geo analyze <path> ...`
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        return argv;
    };

    if arg1.starts_with('-') || arg1 == "help" {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "analyze" | "summary" | "rank" | "plot" | "tui" | "sample"
    );
    if is_subcommand {
        return argv;
    }

    argv.insert(1, "analyze".to_string());
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn analyze_args(extra: &[&str]) -> AnalyzeArgs {
        let mut all = vec!["geo", "analyze", "data.csv"];
        all.extend_from_slice(extra);
        match Cli::try_parse_from(all).unwrap().command {
            Command::Analyze(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn bare_path_defaults_to_analyze() {
        assert_eq!(
            rewrite_args(argv(&["geo", "data.csv", "--top", "3"])),
            argv(&["geo", "analyze", "data.csv", "--top", "3"])
        );
        assert_eq!(rewrite_args(argv(&["geo", "rank", "x.csv"])), argv(&["geo", "rank", "x.csv"]));
        assert_eq!(rewrite_args(argv(&["geo", "--help"])), argv(&["geo", "--help"]));
        assert_eq!(rewrite_args(argv(&["geo"])), argv(&["geo"]));
    }

    #[test]
    fn no_plot_wins() {
        let config = config_from_args(&analyze_args(&["--no-plot"])).unwrap();
        assert!(!config.plot);
        let config = config_from_args(&analyze_args(&[])).unwrap();
        assert!(config.plot);
        assert!(Cli::try_parse_from(["geo", "analyze", "data.csv", "--plot"]).is_err());
    }

    #[test]
    fn threshold_validation() {
        let err = config_from_args(&analyze_args(&["--p-threshold", "0"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let err = config_from_args(&analyze_args(&["--r2-threshold", "1.5"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let config = config_from_args(&analyze_args(&["--p-threshold", "0.1", "--r2-threshold", "0.3"])).unwrap();
        assert_eq!(config.thresholds.p_value, 0.1);
        assert_eq!(config.thresholds.r_squared, 0.3);
    }

    #[test]
    fn zero_width_is_rejected() {
        let err = config_from_args(&analyze_args(&["--width", "0"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
