use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

mod cli;

use cli::Cli;
use cli::commands::{Commands, TargetArgs};
use ever_thinker::Config;
use ever_thinker::analysis::{FanOutExecutor, builtin_analyzers};
use ever_thinker::daemon::{TickConfig, run_host_loop};
use ever_thinker::domain::{CycleResult, FeedbackResolution, Improvement, Task};
use ever_thinker::feedback::{ConsoleReviewer, FeedbackRegistry};
use ever_thinker::id::now_ms;
use ever_thinker::learning::OutcomeStore;
use ever_thinker::orchestrator::{ControllerConfig, CycleController};
use ever_thinker::scoring::{rank, score_with_oracle};
use ever_thinker::tasks::{RecentTasks, TaskFeed};

fn setup_logging(level: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ever-thinker")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("ever-thinker.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            token.cancel();
        }
    });
}

fn target_task(target: &TargetArgs) -> Task {
    let project = target.project.clone().unwrap_or_else(|| {
        target
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    Task::new(format!("adhoc-{}", now_ms()), &target.root)
        .with_project(project)
        .with_files(target.files.clone())
}

fn print_improvement(position: usize, imp: &Improvement) {
    let score = imp.score.map(|s| format!("{:6.2}", s)).unwrap_or_else(|| "     -".to_string());
    println!(
        "{:>3}. {} {} [{} / {}]",
        position,
        score.green(),
        imp.category.cyan(),
        imp.impact,
        imp.effort
    );
    if let Some(location) = &imp.target_location {
        println!("       {}", location.dimmed());
    }
    println!("       {}", imp.description);
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Analyze { target, limit } => handle_analyze_command(target, *limit, config).await,
        Commands::Cycle { target } => handle_cycle_command(target, config).await,
        Commands::Watch => handle_watch_command(config).await,
        Commands::Stats => handle_stats_command(config),
    }
}

async fn handle_analyze_command(target: &TargetArgs, limit: usize, config: &Config) -> Result<()> {
    let task = target_task(target);
    info!("Analyzing {} ({} files)", task.root.display(), task.files.len());
    println!("{} {}", "Analyzing:".green(), task.root.display());

    let executor = FanOutExecutor::new(builtin_analyzers(&config.analysis));
    let (improvements, report) = executor
        .run_all_with_report(Arc::new(task))
        .await
        .context("Analysis failed")?;

    let store = OutcomeStore::open(&config.storage.data_dir).context("Failed to open outcome store")?;
    let mut scored = Vec::with_capacity(improvements.len());
    for improvement in improvements {
        scored.push(score_with_oracle(improvement, &store).await);
    }
    let ranked = rank(scored);

    println!(
        "{} {} analyzers succeeded, {} failed, {} findings",
        "Done:".green(),
        report.succeeded,
        report.failed,
        ranked.len()
    );
    for (i, imp) in ranked.iter().take(limit).enumerate() {
        print_improvement(i + 1, imp);
    }
    if ranked.len() > limit {
        println!("{}", format!("... {} more", ranked.len() - limit).dimmed());
    }
    Ok(())
}

async fn handle_cycle_command(target: &TargetArgs, config: &Config) -> Result<()> {
    let task = target_task(target);
    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    let (registry, proposals) = FeedbackRegistry::new();
    let registry = Arc::new(registry);
    let reviewer_cancel = shutdown.child_token();
    let reviewer = tokio::spawn(ConsoleReviewer::new(Arc::clone(&registry), proposals).run(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        reviewer_cancel.clone(),
    ));

    let history = RecentTasks::new(config.storage.history_len);
    history.push(task);

    let store = OutcomeStore::open(&config.storage.data_dir).context("Failed to open outcome store")?;
    let controller_config = ControllerConfig {
        idle_quiet_window: Duration::ZERO,
        ..ControllerConfig::from(&config.cycle)
    };
    let controller = CycleController::new(
        controller_config,
        FanOutExecutor::new(builtin_analyzers(&config.analysis)),
        Arc::new(store),
        registry,
        Arc::new(history),
    )
    .with_shutdown(shutdown);

    let result = controller.run_cycle_if_idle().await.context("Cycle failed")?;
    reviewer_cancel.cancel();
    if let Err(e) = reviewer.await {
        log::warn!("Reviewer task ended abnormally: {}", e);
    }

    match result {
        CycleResult::Proposed(report) => {
            let verdict = match report.resolution {
                FeedbackResolution::Received(outcome) => outcome.to_string().green(),
                FeedbackResolution::TimedOut => "no response".yellow(),
                FeedbackResolution::Cancelled => "cancelled".red(),
            };
            println!("{} {} -> {}", "Proposal:".green(), report.proposal_id, verdict);
        }
        CycleResult::Skipped(reason) => println!("{} {}", "Skipped:".yellow(), reason),
        CycleResult::Halted => println!(
            "{} cycle budget of {} reached",
            "Halted:".red(),
            config.cycle.max_cycles
        ),
    }
    Ok(())
}

async fn handle_watch_command(config: &Config) -> Result<()> {
    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    let feed = Arc::new(
        TaskFeed::open(&config.storage.data_dir, config.storage.history_len).context("Failed to open task feed")?,
    );
    println!("{} {}", "Watching:".green(), feed.path().display());

    let (registry, proposals) = FeedbackRegistry::new();
    let registry = Arc::new(registry);
    let reviewer = tokio::spawn(ConsoleReviewer::new(Arc::clone(&registry), proposals).run(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        shutdown.child_token(),
    ));

    let store = OutcomeStore::open(&config.storage.data_dir).context("Failed to open outcome store")?;
    let controller = Arc::new(
        CycleController::new(
            ControllerConfig::from(&config.cycle),
            FanOutExecutor::new(builtin_analyzers(&config.analysis)),
            Arc::new(store),
            registry,
            Arc::clone(&feed) as Arc<dyn ever_thinker::tasks::TaskSource>,
        )
        .with_shutdown(shutdown.clone()),
    );

    let state = run_host_loop(controller, feed, TickConfig::from(&config.cycle), shutdown.clone())
        .await
        .context("Host loop failed")?;
    shutdown.cancel();
    if let Err(e) = reviewer.await {
        log::warn!("Reviewer task ended abnormally: {}", e);
    }

    println!(
        "{} {} proposals, {} resets over {} ticks",
        "Stopped:".cyan(),
        state.proposals,
        state.resets,
        state.tick_count
    );
    Ok(())
}

fn handle_stats_command(config: &Config) -> Result<()> {
    let store = OutcomeStore::open(&config.storage.data_dir).context("Failed to open outcome store")?;
    let stats = store.stats().context("Failed to read outcome stats")?;

    if stats.is_empty() {
        println!("{}", "No outcomes recorded yet".yellow());
        return Ok(());
    }

    println!(
        "{:<40} {:>8} {:>8} {:>8} {:>6}",
        "category".bold(),
        "accepted".bold(),
        "rejected".bold(),
        "silent".bold(),
        "rate".bold()
    );
    for (category, s) in &stats {
        let rate = s
            .acceptance_rate()
            .map(|r| format!("{:.2}", r))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<40} {:>8} {:>8} {:>8} {:>6}",
            category, s.accepted, s.rejected, s.no_response, rate
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging; RUST_LOG wins over the config level
    let level = if cli.is_verbose() {
        "debug".to_string()
    } else {
        config.log_level.clone().unwrap_or_else(|| "info".to_string())
    };
    setup_logging(&level).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
