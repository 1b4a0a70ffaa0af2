//! RunService: owns the start/finish transition of every run.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use gaiarun_core::{
    RunConfiguration, RunId, Task, TaskId, TaskPreview, TaskResult, TaskRun, TaskRunPreview, TaskRunRequest,
    TaskUpdate,
};

use crate::runner::RunnerError;
use crate::service::ServiceError;
use crate::state::AppState;

/// Request/response and event-stream operations over the shared state.
#[derive(Clone)]
pub struct RunService {
    state: Arc<AppState>,
}

impl RunService {
    /// Create a new RunService.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn tasks(&self) -> Vec<TaskPreview> {
        self.state.catalog.list()
    }

    pub fn task(&self, task_id: &TaskId) -> Result<Task, ServiceError> {
        self.state
            .catalog
            .get(task_id)
            .cloned()
            .ok_or_else(|| ServiceError::TaskNotFound(task_id.clone()))
    }

    /// Runs of one task. Unknown tasks are an error, not an empty list.
    pub async fn task_runs(&self, task_id: &TaskId) -> Result<Vec<TaskRunPreview>, ServiceError> {
        self.task(task_id)?;
        Ok(self.state.runs.runs_for_task(task_id).await?)
    }

    pub async fn runs(&self) -> Result<Vec<TaskRunPreview>, ServiceError> {
        Ok(self.state.runs.previews().await?)
    }

    pub async fn run(&self, run_id: &RunId) -> Result<TaskRun, ServiceError> {
        Ok(self.state.runs.get(run_id).await?)
    }

    /// Run a task to completion and return its result.
    ///
    /// Execution and the final store write run on their own task, so the
    /// run is still finished if the caller stops waiting.
    pub async fn invoke_sync(&self, request: TaskRunRequest) -> Result<TaskResult, ServiceError> {
        let task = self.task(&request.task_id)?;
        let command = request.command;
        let run = self.state.runs.start(task, command.clone()).await?;
        info!(run_id = %run.id, task_id = %run.task_id(), "Run started (sync)");

        let run_id = run.id.clone();
        let handle = tokio::spawn(run_to_completion(self.state.clone(), run, command));
        handle.await.map_err(|e| {
            error!(run_id = %run_id, error = %e, "Run task aborted");
            ServiceError::Aborted(e.to_string())
        })?
    }

    /// Start a run in the background and return its id immediately.
    ///
    /// Subscribers see `started` once execution begins and `finished`
    /// after the result is stored.
    pub async fn invoke_async(&self, request: TaskRunRequest) -> Result<RunId, ServiceError> {
        let task = self.task(&request.task_id)?;
        let command = request.command;
        let run = self.state.runs.start(task, command.clone()).await?;
        let run_id = run.id.clone();
        info!(run_id = %run_id, task_id = %run.task_id(), "Run started (async)");

        let state = self.state.clone();
        tokio::spawn(async move {
            state.notify(TaskUpdate::Started {
                run_id: run.id.clone(),
            });

            let result = match execute(&state, &run, &command).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(run_id = %run.id, error = %e, "Runner failed, recording error result");
                    runner_failure(&e)
                }
            };
            let status = result.status();

            match state.runs.finish(&run.id, result).await {
                Ok(_) => {
                    info!(run_id = %run.id, status = %status, "Run finished");
                    state.notify(TaskUpdate::Finished {
                        run_id: run.id.clone(),
                        result: status,
                    });
                }
                Err(e) => {
                    error!(run_id = %run.id, error = %e, "Failed to record run result");
                }
            }
        });

        Ok(run_id)
    }

    /// Receive every update published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskUpdate> {
        self.state.subscribe()
    }
}

/// The stored run carries a redacted command, so the caller's own is used.
async fn execute(
    state: &AppState,
    run: &TaskRun,
    command: &RunConfiguration,
) -> Result<TaskResult, RunnerError> {
    state.runner.run(command, &run.task).await
}

async fn run_to_completion(
    state: Arc<AppState>,
    run: TaskRun,
    command: RunConfiguration,
) -> Result<TaskResult, ServiceError> {
    match execute(&state, &run, &command).await {
        Ok(result) => {
            state.runs.finish(&run.id, result.clone()).await?;
            info!(run_id = %run.id, status = %result.status(), "Run finished (sync)");
            Ok(result)
        }
        Err(e) => {
            warn!(run_id = %run.id, error = %e, "Runner failed, recording error result");
            state.runs.finish(&run.id, runner_failure(&e)).await?;
            Err(e.into())
        }
    }
}

fn runner_failure(err: &RunnerError) -> TaskResult {
    TaskResult::Error {
        message: err.to_string(),
        transcript: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use gaiarun_core::{Message, ResultStatus};

    use crate::catalog::TaskCatalog;
    use crate::runner::{FakeTaskRunner, TaskRunner};
    use crate::state::DEFAULT_EVENT_CAPACITY;
    use crate::store::MemoryRunStore;

    /// Runner that takes a while before answering.
    struct SlowRunner(Duration);

    #[async_trait]
    impl TaskRunner for SlowRunner {
        async fn run(&self, _config: &RunConfiguration, _task: &Task) -> Result<TaskResult, RunnerError> {
            tokio::time::sleep(self.0).await;
            Ok(TaskResult::NotFound { transcript: vec![] })
        }
    }

    /// Runner that remembers the api key it was handed.
    #[derive(Default)]
    struct Recorder(std::sync::Mutex<Option<String>>);

    impl Recorder {
        fn seen_key(&self) -> Option<String> {
            self.0.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskRunner for Recorder {
        async fn run(&self, config: &RunConfiguration, _task: &Task) -> Result<TaskResult, RunnerError> {
            *self.0.lock().unwrap() = config.api_key.clone();
            Ok(TaskResult::NotFound { transcript: vec![] })
        }
    }

    fn service_with_runner(runner: Arc<dyn TaskRunner>) -> RunService {
        let catalog = TaskCatalog::from_tasks(vec![
            Task::new("t1", 1, "What is 3 + 4?", "7"),
            Task::new("t2", 2, "Capital of France?", "Paris"),
        ])
        .unwrap();
        let state = AppState::new(catalog, runner, Arc::new(MemoryRunStore::new()), DEFAULT_EVENT_CAPACITY);
        RunService::new(state)
    }

    fn service_with(results: Vec<TaskResult>) -> RunService {
        service_with_runner(Arc::new(FakeTaskRunner::new(results)))
    }

    fn request(task_id: &str) -> TaskRunRequest {
        TaskRunRequest {
            command: RunConfiguration::default(),
            task_id: TaskId::new(task_id),
        }
    }

    fn correct() -> TaskResult {
        TaskResult::Correct {
            actual: "7".to_string(),
            transcript: vec![Message::assistant("FINAL ANSWER: 7")],
        }
    }

    async fn next_update(rx: &mut broadcast::Receiver<TaskUpdate>) -> TaskUpdate {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("update in time")
            .unwrap()
    }

    #[tokio::test]
    async fn test_invoke_sync_records_result() {
        let service = service_with(vec![correct()]);

        let result = service.invoke_sync(request("t1")).await.unwrap();
        assert_eq!(result, correct());

        let runs = service.runs().await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].result, Some(ResultStatus::Correct));

        let run = service.run(&runs[0].id).await.unwrap();
        assert_eq!(run.result, Some(correct()));
    }

    #[tokio::test]
    async fn test_invoke_sync_finishes_after_caller_gives_up() {
        let service = service_with_runner(Arc::new(SlowRunner(Duration::from_millis(200))));

        let waited = tokio::time::timeout(Duration::from_millis(20), service.invoke_sync(request("t1"))).await;
        assert!(waited.is_err());

        let runs = service.runs().await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].result, None);

        let finished = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let run = service.run(&runs[0].id).await.unwrap();
                if run.is_finished() {
                    return run;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("run finished in time");
        assert_eq!(finished.result.map(|r| r.status()), Some(ResultStatus::NotFound));
    }

    #[tokio::test]
    async fn test_runner_sees_api_key_but_store_does_not() {
        let runner = Arc::new(Recorder::default());
        let service = service_with_runner(runner.clone());
        let mut req = request("t1");
        req.command.api_key = Some("sk-secret".to_string());

        service.invoke_sync(req).await.unwrap();

        assert_eq!(runner.seen_key().as_deref(), Some("sk-secret"));
        let runs = service.runs().await.unwrap();
        let run = service.run(&runs[0].id).await.unwrap();
        assert_eq!(run.command.api_key, None);
    }

    #[tokio::test]
    async fn test_invoke_unknown_task() {
        let service = service_with(vec![correct()]);

        assert!(matches!(
            service.invoke_sync(request("missing")).await,
            Err(ServiceError::TaskNotFound(_))
        ));
        assert!(matches!(
            service.invoke_async(request("missing")).await,
            Err(ServiceError::TaskNotFound(_))
        ));
        assert!(service.runs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_async_publishes_started_then_finished() {
        let service = service_with(vec![TaskResult::Incorrect {
            expected: "7".to_string(),
            actual: "8".to_string(),
            transcript: vec![],
        }]);
        let mut rx = service.subscribe();

        let run_id = service.invoke_async(request("t1")).await.unwrap();

        assert_eq!(
            next_update(&mut rx).await,
            TaskUpdate::Started {
                run_id: run_id.clone()
            }
        );
        assert_eq!(
            next_update(&mut rx).await,
            TaskUpdate::Finished {
                run_id: run_id.clone(),
                result: ResultStatus::Incorrect,
            }
        );

        // The result is stored before `finished` is published.
        let run = service.run(&run_id).await.unwrap();
        assert_eq!(run.result.map(|r| r.status()), Some(ResultStatus::Incorrect));
    }

    #[tokio::test]
    async fn test_exhausted_runner_still_finishes_run() {
        let service = service_with(vec![]);
        let mut rx = service.subscribe();

        let run_id = service.invoke_async(request("t2")).await.unwrap();
        next_update(&mut rx).await;
        assert_eq!(
            next_update(&mut rx).await,
            TaskUpdate::Finished {
                run_id: run_id.clone(),
                result: ResultStatus::Error,
            }
        );

        let sync = service.invoke_sync(request("t2")).await;
        assert!(matches!(sync, Err(ServiceError::Runner(RunnerError::Exhausted))));

        let runs = service.runs().await.unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.result == Some(ResultStatus::Error)));
    }

    #[tokio::test]
    async fn test_task_runs() {
        let service = service_with(vec![correct(), correct(), correct()]);
        service.invoke_sync(request("t1")).await.unwrap();
        service.invoke_sync(request("t2")).await.unwrap();
        service.invoke_sync(request("t1")).await.unwrap();

        assert_eq!(service.task_runs(&TaskId::new("t1")).await.unwrap().len(), 2);
        assert_eq!(service.task_runs(&TaskId::new("t2")).await.unwrap().len(), 1);
        assert!(matches!(
            service.task_runs(&TaskId::new("t9")).await,
            Err(ServiceError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_run() {
        let service = service_with(vec![]);
        assert!(matches!(
            service.run(&RunId::new("nope")).await,
            Err(ServiceError::RunNotFound(_))
        ));
    }

    #[test]
    fn test_task_lookup() {
        let service = service_with(vec![]);
        assert_eq!(service.tasks().len(), 2);
        assert_eq!(service.task(&TaskId::new("t2")).unwrap().final_answer, "Paris");
    }
}
