//! Command-line configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use gaiarun_agent::InterpreterExecutor;
use gaiarun_core::RunConfiguration;

use crate::state::DEFAULT_EVENT_CAPACITY;

/// gaiarun benchmark server.
#[derive(Parser, Debug)]
#[command(name = "gaiarun-server", about = "GAIA benchmark server for the interpreter agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API
    Serve(ServeArgs),

    /// Run every task offline and write the results
    Benchmark(BenchmarkArgs),
}

/// Agent settings shared by both subcommands.
#[derive(Args, Debug, Clone)]
pub struct AgentArgs {
    /// Interpreter executable (PATH lookup or full path)
    #[arg(long, default_value = "interpreter")]
    pub interpreter: String,

    /// Directory holding task attachments
    #[arg(long, default_value = "files")]
    pub files_dir: PathBuf,

    /// Kill an agent run after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Default model
    #[arg(long)]
    pub model: Option<String>,

    /// Default API base URL
    #[arg(long)]
    pub api_base: Option<String>,

    /// Default context window
    #[arg(long)]
    pub context_window: Option<u32>,

    /// Default API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl AgentArgs {
    /// Settings used wherever a request leaves a field unset.
    pub fn defaults(&self) -> RunConfiguration {
        RunConfiguration {
            model: self.model.clone(),
            api_base: self.api_base.clone(),
            context_window: self.context_window,
            api_key: self.api_key.clone(),
            ..RunConfiguration::default()
        }
    }

    pub fn executor(&self) -> InterpreterExecutor {
        let executor = InterpreterExecutor::new(&self.interpreter);
        match self.timeout_secs {
            Some(secs) => executor.with_timeout(Duration::from_secs(secs)),
            None => executor,
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// HTTP server address
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: SocketAddr,

    /// Dataset file (.json array or .jsonl)
    #[arg(long)]
    pub tasks: PathBuf,

    /// Serve canned results from this file instead of running the agent
    #[arg(long)]
    pub results: Option<PathBuf>,

    /// Keep runs in memory, seeded from this file
    #[arg(long, conflicts_with = "store")]
    pub runs: Option<PathBuf>,

    /// Durable run store file
    #[arg(long, default_value = "runs.json")]
    pub store: PathBuf,

    /// Capacity of the run update channel
    #[arg(long, default_value_t = DEFAULT_EVENT_CAPACITY)]
    pub event_capacity: usize,

    #[command(flatten)]
    pub agent: AgentArgs,
}

#[derive(Args, Debug)]
pub struct BenchmarkArgs {
    /// Dataset file (.json array or .jsonl)
    #[arg(long)]
    pub tasks: PathBuf,

    /// Where to write the JSON results
    #[arg(long, default_value = "benchmark-results.json")]
    pub output: PathBuf,

    /// Number of worker threads
    #[arg(long, default_value_t = 2)]
    pub threads: usize,

    /// Run generated code without confirmation
    #[arg(long)]
    pub auto_run: bool,

    /// Give the agent OS-level access
    #[arg(long)]
    pub os_mode: bool,

    /// Custom instructions for the agent
    #[arg(long)]
    pub system_prompt: Option<String>,

    #[command(flatten)]
    pub agent: AgentArgs,
}

impl BenchmarkArgs {
    /// The configuration every benchmark task runs with.
    pub fn command(&self) -> RunConfiguration {
        RunConfiguration {
            auto_run: self.auto_run,
            os_mode: self.os_mode,
            system_prompt: self.system_prompt.clone(),
            ..self.agent.defaults()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["gaiarun-server", "serve", "--tasks", "gaia.jsonl"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.addr, "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(args.store, PathBuf::from("runs.json"));
        assert_eq!(args.event_capacity, 1024);
        assert_eq!(args.agent.interpreter, "interpreter");
        assert_eq!(args.agent.files_dir, PathBuf::from("files"));
        assert!(args.results.is_none());
    }

    #[test]
    fn test_benchmark_command() {
        let cli = Cli::try_parse_from([
            "gaiarun-server",
            "benchmark",
            "--tasks",
            "gaia.json",
            "--threads",
            "4",
            "--auto-run",
            "--model",
            "gpt-4o",
            "--system-prompt",
            "Be brief",
        ])
        .unwrap();
        let Command::Benchmark(args) = cli.command else {
            panic!("expected benchmark");
        };
        assert_eq!(args.threads, 4);

        let command = args.command();
        assert!(command.auto_run);
        assert!(!command.os_mode);
        assert_eq!(command.model.as_deref(), Some("gpt-4o"));
        assert_eq!(command.system_prompt.as_deref(), Some("Be brief"));
    }

    #[test]
    fn test_tasks_required() {
        assert!(Cli::try_parse_from(["gaiarun-server", "serve"]).is_err());
    }
}
