//! gaiarun CLI - Command line client for the gaiarun benchmark server.

mod client;
mod error;

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gaiarun_core::{RunConfiguration, RunId, TaskId, TaskResult, TaskRunPreview, TaskUpdate};

use client::GaiaClient;

/// gaiarun CLI - Benchmark server client
#[derive(Parser)]
#[command(name = "gaiarun")]
#[command(about = "CLI for the gaiarun benchmark server", long_about = None)]
struct Cli {
    /// Server address
    #[arg(short, long, default_value = "http://127.0.0.1:8000")]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server is reachable
    #[command(name = "check-connection")]
    CheckConnection {
        /// Timeout in milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },

    /// List all tasks
    #[command(name = "list-tasks")]
    ListTasks,

    /// Show one task
    #[command(name = "get-task")]
    GetTask {
        /// Task ID
        id: String,
    },

    /// List the runs of one task
    #[command(name = "task-runs")]
    TaskRuns {
        /// Task ID
        id: String,
    },

    /// List all runs
    #[command(name = "list-runs")]
    ListRuns,

    /// Show one run with its transcript
    #[command(name = "get-run")]
    GetRun {
        /// Run ID
        id: String,
    },

    /// Run a task
    Invoke {
        /// Task ID
        task_id: String,

        /// Wait for the result instead of running in the background
        #[arg(long, conflicts_with = "follow")]
        wait: bool,

        /// Run in the background and follow updates until it finishes
        #[arg(long)]
        follow: bool,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print run updates as they happen
    Watch,
}

/// Per-run agent configuration.
#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    auto_run: bool,

    #[arg(long)]
    os_mode: bool,

    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    context_window: Option<u32>,

    #[arg(long)]
    api_base: Option<String>,

    #[arg(long)]
    api_key: Option<String>,

    #[arg(long)]
    system_prompt: Option<String>,
}

impl From<ConfigArgs> for RunConfiguration {
    fn from(args: ConfigArgs) -> Self {
        RunConfiguration {
            auto_run: args.auto_run,
            os_mode: args.os_mode,
            model: args.model,
            context_window: args.context_window,
            api_base: args.api_base,
            api_key: args.api_key,
            system_prompt: args.system_prompt,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = GaiaClient::new(&cli.addr);

    match cli.command {
        Commands::CheckConnection { timeout_ms } => {
            let ok = client
                .check_connection(Duration::from_millis(timeout_ms))
                .await
                .unwrap_or(false);
            println!("{}", if ok { "good" } else { "unreachable" });
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::ListTasks => {
            let tasks = client.tasks().await?;
            println!("Tasks ({}):", tasks.len());
            println!("{:<36}  {:<5}  {}", "ID", "LEVEL", "QUESTION");
            println!("{}", "-".repeat(80));
            for task in tasks {
                println!("{:<36}  {:<5}  {}", task.task_id, task.level, truncate(&task.question, 60));
            }
        }
        Commands::GetTask { id } => {
            let task = client.task(&TaskId::new(id)).await?;
            println!("  ID:         {}", task.task_id);
            println!("  Level:      {}", task.level);
            println!("  Answer:     {}", task.final_answer);
            if task.has_attachment() {
                println!("  File:       {}", task.file_name);
            }
            println!("  Question:");
            println!("{}", task.question);
        }
        Commands::TaskRuns { id } => {
            print_runs(&client.task_runs(&TaskId::new(id)).await?);
        }
        Commands::ListRuns => {
            print_runs(&client.runs().await?);
        }
        Commands::GetRun { id } => {
            let run = client.run(&RunId::new(id)).await?;
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
        Commands::Invoke {
            task_id,
            wait,
            follow,
            config,
        } => {
            let task_id = TaskId::new(task_id);
            let command = RunConfiguration::from(config);

            if wait {
                let result = client.invoke_task(task_id, command).await?;
                print_result(&result);
            } else if follow {
                // Subscribe before invoking so no update is missed
                let mut updates = client.updates().await?;
                let run_id = client.invoke(task_id, command).await?;
                println!("Started run {}", run_id);

                while let Some(update) = updates.next().await {
                    if let TaskUpdate::Finished { run_id: id, .. } = update? {
                        if id == run_id {
                            break;
                        }
                    }
                }
                let run = client.run(&run_id).await?;
                if let Some(result) = &run.result {
                    print_result(result);
                }
            } else {
                let run_id = client.invoke(task_id, command).await?;
                println!("{}", run_id);
            }
        }
        Commands::Watch => {
            let mut updates = client.updates().await?;
            while let Some(update) = updates.next().await {
                match update? {
                    TaskUpdate::Started { run_id } => println!("{}  started", run_id),
                    TaskUpdate::Finished { run_id, result } => println!("{}  finished ({})", run_id, result),
                }
            }
        }
    }

    Ok(())
}

fn print_runs(runs: &[TaskRunPreview]) {
    println!("Runs ({}):", runs.len());
    println!("{:<36}  {:<36}  {:<10}  {}", "ID", "TASK", "RESULT", "STARTED");
    println!("{}", "-".repeat(110));
    for run in runs {
        let result = run.result.map(|s| s.to_string()).unwrap_or_else(|| "running".to_string());
        println!(
            "{:<36}  {:<36}  {:<10}  {}",
            run.id,
            run.task.task_id,
            result,
            run.started.format("%Y-%m-%d %H:%M:%S")
        );
    }
}

fn print_result(result: &TaskResult) {
    println!("Result: {}", result.status());
    match result {
        TaskResult::Correct { actual, .. } => println!("  Answer:   {}", actual),
        TaskResult::Incorrect { expected, actual, .. } => {
            println!("  Answer:   {}", actual);
            println!("  Expected: {}", expected);
        }
        TaskResult::NotFound { .. } => println!("  No final answer in transcript"),
        TaskResult::Error { message, .. } => println!("  Error:    {}", message),
    }
    println!("  Messages: {}", result.transcript().len());
}

fn truncate(text: &str, max: usize) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() <= max {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
