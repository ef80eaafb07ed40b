//! task-insight
//!
//! Correlates tracked tasks with the commits that implement them and turns
//! the result into effort features and workload plans.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use task_insight::cache::ReplayCache;
use task_insight::classifier::GroqClassifier;
use task_insight::cli::distribute::DistributeArgs;
use task_insight::cli::features::FeaturesArgs;
use task_insight::cli::run::RunArgs;
use task_insight::cli::windows::WindowsArgs;
use task_insight::cli::{Cli, Command};
use task_insight::config::{Config, ConfigLoader, ConfigPaths};
use task_insight::distribute::{HistoricalPredictor, distribute};
use task_insight::export::{Document, read_records, write_document};
use task_insight::features::{TaskFeatures, derive_all};
use task_insight::format::{
    OutputFormat, format_correlated_markdown, format_distribution_markdown,
    format_windows_markdown, to_json,
};
use task_insight::logging::{LogTarget, init_tracing};
use task_insight::pipeline::Pipeline;
use task_insight::prompts::Prompts;
use task_insight::source::{load_profile_sources, read_tasks, select_tasks};
use task_insight::tokens::{Cl100kCounter, TokenCounter};
use task_insight::types::CorrelatedTask;
use task_insight::window::{WindowParams, extract_windows};
use tracing::{debug, error, info};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let target = LogTarget::parse(&cli.log);
    if let Err(e) = init_tracing(&target, cli.verbose) {
        eprintln!("Error: failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            if target != LogTarget::Stderr {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let loader = ConfigLoader::load(cli.config.as_deref())?;
    for (tier, path) in loader.sources() {
        debug!(%tier, path = %path.display(), "Loaded config tier");
    }
    let paths = loader.paths.clone();
    let config = loader.into_config();

    match cli.command {
        Command::Run(args) => run_pipeline(&config, &paths, cli.profile.as_deref(), args),
        Command::Windows(args) => run_windows(&config, cli.profile.as_deref(), args),
        Command::Features(args) => run_features(args),
        Command::Distribute(args) => run_distribute(args),
    }
}

/// Write `content` to `output`, or print it when no file is given.
fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "Wrote output");
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn run_pipeline(
    config: &Config,
    paths: &ConfigPaths,
    profile_name: Option<&str>,
    args: RunArgs,
) -> Result<()> {
    let profile = config.profile(profile_name)?;
    let name = profile_name
        .or(config.profiles.default_profile.as_deref())
        .unwrap_or_default();

    let tasks_path = args.tasks.as_deref().unwrap_or(&config.sources.tasks_path);
    let commits_path = args.commits.as_deref().unwrap_or(&config.sources.commits_path);
    let limit = args.limit.or(config.profiles.task_limit);
    let (tasks, commits) = load_profile_sources(tasks_path, commits_path, profile, limit)?;

    let counter: Arc<dyn TokenCounter> = Arc::new(Cl100kCounter::new()?);
    let classifier = GroqClassifier::from_env(&config.llm, Arc::clone(&counter));
    let prompts = Prompts::load(paths);
    let cache = ReplayCache::new(&profile.cache_dir).refreshing(args.refresh);

    info!(profile = name, cache_dir = %profile.cache_dir.display(), "Starting run");
    let records = Pipeline::new(&classifier, counter.as_ref(), &prompts, cache)
        .with_batching(config.effective_batching())
        .with_windows(WindowParams::from(&config.windows))
        .run(tasks, &commits)?;

    let output = args.output_path(&profile.cache_dir, &config.sources.output_file);
    let linked = records.iter().filter(|r| !r.commits.is_empty()).count();
    let summary = match args.format {
        Some(OutputFormat::Json) => Some(format!("{}\n", to_json(&records)?)),
        Some(OutputFormat::Markdown) => Some(format_correlated_markdown(&records)),
        None => None,
    };
    write_document(&output, &Document::new(records).with_profile(name))?;
    info!(path = %output.display(), linked, "Wrote correlated tasks");

    match summary {
        Some(content) => emit(&content, None),
        None => Ok(()),
    }
}

fn run_windows(config: &Config, profile_name: Option<&str>, args: WindowsArgs) -> Result<()> {
    let profile = config.profile(profile_name)?;
    let tasks_path = args.tasks.as_deref().unwrap_or(&config.sources.tasks_path);
    let tasks = select_tasks(
        read_tasks(tasks_path)?,
        &profile.assignee_id,
        config.profiles.task_limit,
    );

    let specs = extract_windows(&tasks, &WindowParams::from(&config.windows))?;
    let content = match args.format {
        OutputFormat::Json => format!("{}\n", to_json(&specs)?),
        OutputFormat::Markdown => format_windows_markdown(&specs),
    };
    emit(&content, args.output.as_deref())
}

fn run_features(args: FeaturesArgs) -> Result<()> {
    let records: Vec<CorrelatedTask> = read_records(&args.input)?;
    let features = derive_all(&records);
    info!(
        records = records.len(),
        features = features.len(),
        "Derived effort features"
    );

    match args.output {
        Some(path) => {
            write_document(&path, &Document::new(features))?;
            info!(path = %path.display(), "Wrote effort features");
            Ok(())
        }
        None => emit(&format!("{}\n", to_json(&features)?), None),
    }
}

fn run_distribute(args: DistributeArgs) -> Result<()> {
    let tasks: Vec<TaskFeatures> = read_records(&args.input)?;
    let predictor = match &args.history {
        Some(path) => HistoricalPredictor::from_history(&read_records::<TaskFeatures>(path)?),
        None => HistoricalPredictor::from_history(&tasks),
    };

    let assignees = args.resolve_assignees(&tasks);
    let loads = distribute(&tasks, &assignees, &predictor);

    let content = match args.format {
        OutputFormat::Json => format!("{}\n", to_json(&loads)?),
        OutputFormat::Markdown => format_distribution_markdown(&loads),
    };
    emit(&content, None)
}
