//! gaiarun Server

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gaiarun_server::benchmark::{self, BenchmarkOptions, BenchmarkSummary};
use gaiarun_server::config::{BenchmarkArgs, Command, ServeArgs};
use gaiarun_server::{
    http, AgentTaskRunner, AppState, Cli, FakeTaskRunner, FileRunStore, JsonDatasetLoader,
    MemoryRunStore, RunService, TaskCatalog, TaskRunStore, TaskRunner,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gaiarun_server=info,gaiarun_agent=info,tower_http=info")),
        )
        .with_target(true)
        .init();

    match cli.command {
        Command::Serve(args) => {
            let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
            runtime.block_on(serve(args))
        }
        // Worker threads build their own runtimes
        Command::Benchmark(args) => run_benchmark(args),
    }
}

fn load_catalog(path: &std::path::Path) -> anyhow::Result<TaskCatalog> {
    TaskCatalog::load(&JsonDatasetLoader::new(path))
        .with_context(|| format!("Failed to load tasks from '{}'", path.display()))
}

fn agent_runner(agent: &gaiarun_server::config::AgentArgs) -> Arc<dyn TaskRunner> {
    Arc::new(
        AgentTaskRunner::new(Arc::new(agent.executor()), agent.defaults())
            .with_files_dir(&agent.files_dir),
    )
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let catalog = load_catalog(&args.tasks)?;

    let runner: Arc<dyn TaskRunner> = match &args.results {
        Some(path) => {
            info!(path = %path.display(), "Using canned results");
            Arc::new(FakeTaskRunner::from_file(path)?)
        }
        None => agent_runner(&args.agent),
    };

    let runs: Arc<dyn TaskRunStore> = match &args.runs {
        Some(path) => Arc::new(MemoryRunStore::from_file(path)?),
        None => Arc::new(FileRunStore::open(&args.store)?),
    };

    let state = AppState::new(catalog, runner, runs, args.event_capacity);
    let router = http::create_router(RunService::new(state));

    let listener = TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;

    info!(addr = %args.addr, "HTTP server listening");
    axum::serve(listener, router).await?;

    Ok(())
}

fn run_benchmark(args: BenchmarkArgs) -> anyhow::Result<()> {
    let catalog = load_catalog(&args.tasks)?;
    let options = BenchmarkOptions {
        command: args.command(),
        files_dir: args.agent.files_dir.clone(),
        threads: args.threads,
    };

    let records =
        benchmark::run_benchmark_threaded(catalog.tasks().to_vec(), agent_runner(&args.agent), &options)?;
    benchmark::write_records(&args.output, &records)?;

    let summary = BenchmarkSummary::from_records(&records);
    info!(
        output = %args.output.display(),
        total = summary.total,
        correct = summary.correct,
        incorrect = summary.incorrect,
        not_found = summary.not_found,
        error = summary.error,
        "Benchmark results written"
    );
    Ok(())
}
