//! Vincian CLI - static quality analysis for TypeScript and JavaScript.

use std::io::stdout;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{info_span, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vincian::cache::AnalysisCache;
use vincian::cli::{Cli, Command, WeightArgs};
use vincian::config::Config;
use vincian::core::progress::ProgressTracker;
use vincian::core::{AnalysisContext, AnalysisOptions, Deadline, FileSet, SourceUnit};
use vincian::engine::{Engine, ProjectAnalysis};
use vincian::output::Format;

/// Analyzers walk the syntax tree recursively, up to the parser's depth cap.
const WORKER_STACK_BYTES: usize = 8 * 1024 * 1024;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .stack_size(WORKER_STACK_BYTES)
        .build_global()
    {
        warn!(error = %e, "Using the default worker pool");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> vincian::core::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default(&cli.path)?,
    };
    if cli.timeout_ms.is_some() {
        config.timeout_ms = cli.timeout_ms;
    }
    if let Command::Project(args) = &cli.command {
        if args.max_files > 0 {
            config.project.max_files = args.max_files;
        }
    }

    let format = cli
        .format
        .map(Format::from)
        .unwrap_or_else(|| Format::from(config.output.format));

    let cache = (config.cache.enabled && !cli.no_cache)
        .then(|| AnalysisCache::new(config.cache.clone()));
    let engine = Engine::new(&config)?;

    let ctx = context(&config, cache.as_ref());

    let mut out = stdout();
    match cli.command {
        Command::File(args) => {
            let options = options(&config, &args.weights).with_metrics(args.include_metrics);
            let analysis = engine.analyze_path(&ctx, &args.file, &options)?;
            format.render(&analysis, &mut out)?;
        }
        Command::Score(args) => {
            let options = options(&config, &args.weights);
            let analysis = engine.analyze_path(&ctx, &args.file, &options)?;
            format.render(&analysis.composite_score, &mut out)?;
        }
        Command::Metrics(args) => {
            let unit = SourceUnit::load(&args.file)?;
            let root = engine.parse(&unit, &deadline(&config))?;
            let (metrics, _) = engine.code_metrics(&ctx, &unit, &root);
            format.format(&metrics, &mut out)?;
        }
        Command::Semantic(args) => {
            let unit = SourceUnit::load(&args.file)?;
            let root = engine.parse(&unit, &deadline(&config))?;
            format.format(&engine.semantic(&root), &mut out)?;
        }
        Command::Project(args) => {
            let options = options(&config, &args.weights);
            let mut project = run_project(&engine, &config, cache.as_ref(), &cli.path, &options)?;
            if args.summary_only {
                project.files.clear();
            }
            format.render(&project, &mut out)?;
        }
        Command::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn context<'a>(config: &'a Config, cache: Option<&'a AnalysisCache>) -> AnalysisContext<'a> {
    let ctx = AnalysisContext::new(config).with_span(info_span!("vincian"));
    match cache {
        Some(cache) => ctx.with_cache(cache),
        None => ctx,
    }
}

fn options(config: &Config, weights: &WeightArgs) -> AnalysisOptions {
    let options = AnalysisOptions::from_config(config);
    match weights.apply(&config.weights) {
        Some(weights) => options.with_weights(weights),
        None => options,
    }
}

fn deadline(config: &Config) -> Deadline {
    Deadline::start(config.timeout_ms.map(Duration::from_millis))
}

fn run_project(
    engine: &Engine,
    config: &Config,
    cache: Option<&AnalysisCache>,
    path: &Path,
    options: &AnalysisOptions,
) -> vincian::core::Result<ProjectAnalysis> {
    let file_set = FileSet::from_path(path, config)?;
    let tracker = ProgressTracker::for_files(file_set.len());

    let progress = tracker.clone();
    let ctx = context(config, cache).with_progress(move |_, _| {
        progress.inc();
    });

    let result = engine.analyze_project(&ctx, file_set.root(), file_set.files(), options);
    tracker.finish_and_clear();
    result
}
