//! Offline batch benchmark over the whole catalog.
//!
//! Tasks are dealt round-robin into one private queue per worker thread
//! before any thread starts, so the threads never share a work queue.
//! Each thread drives its queue on its own current-thread runtime and
//! sends finished records into a single results channel.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use gaiarun_core::{ResultStatus, RunConfiguration, Task, TaskId, TaskResult};

use crate::runner::{build_prompt, TaskRunner};

/// Benchmark errors.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("Failed to build worker runtime: {0}")]
    Runtime(std::io::Error),

    #[error("Benchmark worker thread {0} panicked")]
    WorkerPanicked(usize),

    #[error("Failed to write results to '{path}': {message}")]
    Output { path: PathBuf, message: String },
}

/// Outcome of one task in a benchmark pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub task_id: TaskId,
    #[serde(serialize_with = "gaiarun_core::config::serialize_redacted")]
    pub command: RunConfiguration,
    pub prompt: String,
    pub started: DateTime<Utc>,
    pub ended: DateTime<Utc>,
    pub result: TaskResult,
}

impl BenchmarkRecord {
    pub fn status(&self) -> ResultStatus {
        self.result.status()
    }
}

/// Counts per result status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BenchmarkSummary {
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub not_found: usize,
    pub error: usize,
}

impl BenchmarkSummary {
    pub fn from_records(records: &[BenchmarkRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };
        for record in records {
            match record.status() {
                ResultStatus::Correct => summary.correct += 1,
                ResultStatus::Incorrect => summary.incorrect += 1,
                ResultStatus::NotFound => summary.not_found += 1,
                ResultStatus::Error => summary.error += 1,
            }
        }
        summary
    }
}

/// Deal `items` into `n` queues: item `i` goes to queue `i % n`.
pub fn partition_round_robin<T>(items: Vec<T>, n: usize) -> Vec<Vec<T>> {
    let n = n.max(1);
    let mut queues: Vec<Vec<T>> = (0..n).map(|_| Vec::new()).collect();
    for (i, item) in items.into_iter().enumerate() {
        queues[i % n].push(item);
    }
    queues
}

/// Benchmark pass settings.
#[derive(Debug, Clone)]
pub struct BenchmarkOptions {
    pub command: RunConfiguration,
    pub files_dir: PathBuf,
    pub threads: usize,
}

/// Run every task across `options.threads` worker threads.
///
/// Records arrive in completion order.
pub fn run_benchmark_threaded(
    tasks: Vec<Task>,
    runner: Arc<dyn TaskRunner>,
    options: &BenchmarkOptions,
) -> Result<Vec<BenchmarkRecord>, BenchmarkError> {
    let total = tasks.len();
    let queues = partition_round_robin(tasks, options.threads);
    info!(tasks = total, threads = queues.len(), "Assigned tasks to threads");

    let (tx, rx) = mpsc::channel::<BenchmarkRecord>();

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(queues.len());
        for (index, queue) in queues.into_iter().enumerate() {
            let tx = tx.clone();
            let runner = runner.clone();
            info!(thread = index, tasks = queue.len(), "Starting benchmark thread");
            handles.push(scope.spawn(move || drive_queue(queue, runner, options, tx)));
        }
        drop(tx);

        for (index, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(outcome) => outcome?,
                Err(_) => return Err(BenchmarkError::WorkerPanicked(index)),
            }
        }
        Ok(())
    })?;

    let records: Vec<BenchmarkRecord> = rx.into_iter().collect();
    info!(records = records.len(), "Benchmark finished");
    Ok(records)
}

fn drive_queue(
    queue: Vec<Task>,
    runner: Arc<dyn TaskRunner>,
    options: &BenchmarkOptions,
    results: mpsc::Sender<BenchmarkRecord>,
) -> Result<(), BenchmarkError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(BenchmarkError::Runtime)?;

    runtime.block_on(async {
        for task in queue {
            let prompt = build_prompt(&task, &options.files_dir);
            let started = Utc::now();
            let result = match runner.run(&options.command, &task).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(task_id = %task.task_id, error = %e, "Runner failed");
                    TaskResult::Error {
                        message: e.to_string(),
                        transcript: Vec::new(),
                    }
                }
            };
            let record = BenchmarkRecord {
                task_id: task.task_id.clone(),
                command: options.command.redacted(),
                prompt,
                started,
                ended: Utc::now(),
                result,
            };
            info!(task_id = %record.task_id, status = %record.status(), "Benchmark task done");

            if results.send(record).is_err() {
                warn!("Results channel closed, stopping thread");
                break;
            }
        }
    });
    Ok(())
}

/// Write records as a pretty JSON array.
pub fn write_records(path: &Path, records: &[BenchmarkRecord]) -> Result<(), BenchmarkError> {
    let output_err = |message: String| BenchmarkError::Output {
        path: path.to_path_buf(),
        message,
    };

    let file = File::create(path).map_err(|e| output_err(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records).map_err(|e| output_err(e.to_string()))?;
    writer.flush().map_err(|e| output_err(e.to_string()))?;
    Ok(())
}
