use std::{
    env,
    num::NonZeroU32,
    path::{Path, PathBuf},
    process,
    sync::Arc,
    time::Duration,
};

use governor::{Quota, RateLimiter};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use inquire::Confirm;
use tokio::sync::Mutex;
use tracing_subscriber::{filter::LevelFilter, fmt};

use onoma_app::cli::{Cli, Commands, RenameArgs, RenameFormat};
use onoma_app::config;
use onoma_app::error::AppError;
use onoma_app::services::{
    Archiver, BatchOrchestrator, DirArchiver, FileRecord, FileStatus, GeminiNamingClient,
    NamingOracle, OrchestratorConfig, RenameQueue, RetryPolicy, RetryingOracle, collect_completed,
    collect_image_targets,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log_level = determine_log_level(&cli);
    init_tracing(log_level);

    if let Err(err) = run(cli).await {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn init_tracing(level: LevelFilter) {
    let subscriber = fmt().with_max_level(level).with_target(false).finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already set; skipping re-initialization.");
    }
}

fn determine_log_level(cli: &Cli) -> LevelFilter {
    match cli.verbose {
        0 => LevelFilter::OFF,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Some(Commands::Rename(args)) => run_rename(args).await,
        None => {
            Cli::print_help();
            Ok(())
        }
    }
}

async fn run_rename(args: RenameArgs) -> Result<(), AppError> {
    let cfg = config::load()?;
    let chunk_size = args.chunk_size.unwrap_or(cfg.batch.chunk_size);
    let cooldown = Duration::from_secs(args.cooldown_secs.unwrap_or(cfg.batch.cooldown_secs));
    let model = args.model.clone().unwrap_or_else(|| cfg.oracle.model.clone());

    let targets = collect_image_targets(&args.path, args.limit)?;
    if targets.is_empty() {
        tracing::info!(event = "rename_nothing", path = %args.path.display(), "no supported images found");
        println!("no supported images found at {}", args.path.display());
        return Ok(());
    }
    let source_dir = if args.path.is_file() {
        args.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        args.path.clone()
    };

    let mut queue = RenameQueue::new();
    for target in &targets {
        let Some(name) = target.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        queue.enqueue(name);
    }
    let total = queue.len() as u64;
    let queue = Arc::new(Mutex::new(queue));

    let quota = Quota::per_second(
        NonZeroU32::new(cfg.oracle.requests_per_second.max(1)).expect("quota must be non-zero"),
    );
    let limiter = Arc::new(RateLimiter::direct(quota));
    let client = GeminiNamingClient::from_env(model, Some(limiter))?;
    let policy = RetryPolicy {
        max_retries: cfg.oracle.retry_budget,
        base_delay: Duration::from_secs(cfg.oracle.retry_base_secs),
    };
    let oracle: Arc<dyn NamingOracle> = Arc::new(RetryingOracle::new(client, policy));

    let orchestrator = BatchOrchestrator::new(
        Arc::clone(&queue),
        oracle,
        OrchestratorConfig {
            chunk_size,
            cooldown,
        },
    );

    tracing::info!(event = "rename_run_start", files = total, chunk_size, "starting rename run");
    let driver = orchestrator.clone();
    let worker = tokio::spawn(async move { driver.run().await });

    let pb = make_progress_bar(total);
    loop {
        let counts = orchestrator.counts().await;
        pb.set_position(counts.processed() as u64);
        pb.set_message(format!(
            "{} renamed, {} failed",
            counts.completed, counts.errored
        ));
        if worker.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    if let Err(err) = worker.await {
        tracing::warn!(error = %err, "rename worker task aborted");
    }

    let counts = orchestrator.counts().await;
    pb.finish_with_message(format!(
        "{} renamed, {} failed",
        counts.completed, counts.errored
    ));
    tracing::info!(
        event = "rename_run_finished",
        completed = counts.completed,
        errored = counts.errored,
    );

    let snapshot = orchestrator.snapshot().await;
    report_results(&snapshot, args.format)?;

    if args.dry_run {
        return Ok(());
    }
    if counts.completed == 0 {
        println!("nothing to export: no files completed");
        return Ok(());
    }

    let output = resolve_output_dir(&args.output)?;
    confirm_overwrite(&output, args.force)?;
    let entries = collect_completed(&snapshot, &source_dir)?;
    let archiver = DirArchiver::new(&output);
    let dest = archiver.bundle(&entries)?;
    tracing::info!(event = "rename_export_complete", files = entries.len(), dest = %dest.display());
    println!("exported {} files to {}", entries.len(), dest.display());

    Ok(())
}

fn report_results(records: &[FileRecord], format: RenameFormat) -> Result<(), AppError> {
    match format {
        RenameFormat::Json => {
            println!("{}", serde_json::to_string_pretty(records)?);
        }
        RenameFormat::Table => {
            for record in records {
                match record.status {
                    FileStatus::Completed => {
                        if let Some(new_name) = record.new_name.as_deref() {
                            println!("renamed {} -> {}", record.original_name, new_name);
                        }
                    }
                    FileStatus::Error => {
                        println!(
                            "failed  {} ({})",
                            record.original_name,
                            record.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                    _ => {
                        println!("skipped {} ({:?})", record.original_name, record.status);
                    }
                }
            }
        }
    }
    Ok(())
}

fn resolve_output_dir(path: &Path) -> Result<PathBuf, AppError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let cwd = env::current_dir().map_err(AppError::WorkingDir)?;
    Ok(cwd.join(path))
}

fn confirm_overwrite(path: &Path, force: bool) -> Result<(), AppError> {
    if force || !path.exists() {
        return Ok(());
    }
    let prompt = format!(
        "output directory {} already exists; overwrite matching files?",
        path.display()
    );
    match Confirm::new(&prompt).with_default(false).prompt() {
        Ok(true) => Ok(()),
        Ok(false) => Err(AppError::ExportCancelled {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(AppError::ExportPromptFailed { source }),
    }
}

fn make_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} [{elapsed_precise}] {pos}/{len} files ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(12));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
