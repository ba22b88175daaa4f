use archive_worker::{
    task_metadata, ArchiveWorker, Cli, OutputFormatter, OutputMode, TaskRequest,
    UserFriendlyError, WorkerError,
};
use clap::Parser;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();
    setup_logging(cli.verbosity_level(), cli.quiet);

    // Handle special commands first
    if cli.task_metadata {
        return handle_task_metadata();
    }

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let worker = match ArchiveWorker::from_cli(&cli) {
        Ok(worker) => worker,
        Err(e) => {
            print_startup_error(&e);
            return exit_code(&e);
        }
    };

    let request = match cli.build_request(worker.config()) {
        Ok(request) => request,
        Err(e) => {
            worker.handle_error(&e);
            return exit_code(&e);
        }
    };

    if cli.dry_run {
        return handle_dry_run(&worker, request);
    }

    let outcome = match worker.run_task(request).await {
        Ok(result) => worker.output_formatter().print_task_result(&result),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(()) => 0,
        Err(e) => {
            worker.handle_error(&e);
            exit_code(&e)
        }
    }
}

fn exit_code(error: &WorkerError) -> i32 {
    match error {
        WorkerError::Cancelled => 130, // Interrupted (SIGINT)
        WorkerError::InvalidInput { .. } => 2,
        WorkerError::ExtractionProcess { .. } => 3,
        WorkerError::NoFilesExtracted { .. } => 4,
        WorkerError::Payload { .. } => 5,
        WorkerError::Timeout { .. } => 9,
        _ => 1,
    }
}

fn handle_task_metadata() -> i32 {
    match serde_json::to_string_pretty(&task_metadata()) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Failed to serialize task metadata: {}", e);
            1
        }
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "archive-worker.toml".to_string());

    match ArchiveWorker::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  archive-worker <archive> --config {}", config_path);
            println!("\nEdit the file to point at your unzip and 7zz binaries.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(worker: &ArchiveWorker, request: TaskRequest) -> i32 {
    let formatter = worker.output_formatter();
    let config = worker.config();

    formatter.info("DRY RUN MODE - No archives will be extracted");
    formatter.print_separator();

    let commands = match worker.plan(request) {
        Ok(commands) => commands,
        Err(e) => {
            worker.handle_error(&e);
            return exit_code(&e);
        }
    };

    let binary = config.extractor.active();
    println!("  Extractor: {} ({})", config.extractor.kind, binary.path.display());
    println!("  Wait mode: {:?}", binary.wait);
    println!("  Timeout: {} seconds", config.task.timeout);
    println!("  Output directory: {}", config.output.base_directory.display());

    formatter.print_separator();
    for command in &commands {
        println!("  {}", command.invocation_string());
    }

    formatter.print_separator();
    formatter.success(&format!("Dry run completed: {} archive(s) would be extracted", commands.len()));
    formatter.info("Run without --dry-run to perform the extraction");

    0
}

fn print_startup_error(error: &WorkerError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

/// Send `tracing` events to stderr. `RUST_LOG` takes precedence over `-v`.
fn setup_logging(verbosity: u8, quiet: bool) {
    let level = match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("archive_worker={}", level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
