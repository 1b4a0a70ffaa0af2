//! JSON-file run store.
//!
//! The whole run map lives in one file shaped `{"runs": {id: run}}`.
//! Every mutation reads the entire map, changes it and writes the entire
//! map back through a temp file that is renamed over the original.
//! An advisory lock on `<path>.lock` serializes readers and writers
//! across processes; an async mutex serializes writers inside one.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fs2::FileExt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info};

use gaiarun_core::{RunConfiguration, RunId, Task, TaskResult, TaskRun, TaskRunPreview};

use super::{StoreError, TaskRunStore};

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    runs: IndexMap<RunId, TaskRun>,
}

#[derive(Debug)]
struct Paths {
    data: PathBuf,
    lock: PathBuf,
}

impl Paths {
    fn new(data: PathBuf) -> Self {
        let mut lock = OsString::from(data.as_os_str());
        lock.push(".lock");
        Self {
            data,
            lock: PathBuf::from(lock),
        }
    }

    fn lock_file(&self) -> Result<File, StoreError> {
        Ok(OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock)?)
    }

    fn read(&self) -> Result<StoreFile, StoreError> {
        let file = File::open(&self.data)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn write(&self, contents: &StoreFile) -> Result<(), StoreError> {
        let dir = match self.data.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, contents)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.data).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    /// Read the whole map under a shared lock.
    fn load_shared(&self) -> Result<StoreFile, StoreError> {
        let lock = self.lock_file()?;
        lock.lock_shared()?;
        let contents = self.read();
        lock.unlock()?;
        contents
    }

    /// Read, mutate and write back the whole map under an exclusive lock.
    fn update<R>(&self, f: impl FnOnce(&mut StoreFile) -> Result<R, StoreError>) -> Result<R, StoreError> {
        let lock = self.lock_file()?;
        lock.lock_exclusive()?;
        let outcome = self.read().and_then(|mut contents| {
            let value = f(&mut contents)?;
            self.write(&contents)?;
            Ok(value)
        });
        lock.unlock()?;
        outcome
    }
}

/// Run store persisted to a single JSON file.
pub struct FileRunStore {
    paths: Arc<Paths>,
    writer: Mutex<()>,
}

impl FileRunStore {
    /// Open the store at `path`, creating an empty one if it is missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let paths = Paths::new(path.into());

        let lock = paths.lock_file()?;
        lock.lock_exclusive()?;
        let created = if paths.data.exists() {
            false
        } else {
            paths.write(&StoreFile::default())?;
            true
        };
        lock.unlock()?;

        info!(path = %paths.data.display(), created, "Opened run store");

        Ok(Self {
            paths: Arc::new(paths),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.paths.data
    }

    /// Run blocking file work off the async runtime.
    async fn blocking<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        R: Send + 'static,
        F: FnOnce(&Paths) -> Result<R, StoreError> + Send + 'static,
    {
        let paths = self.paths.clone();
        tokio::task::spawn_blocking(move || f(&paths))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

#[async_trait]
impl TaskRunStore for FileRunStore {
    async fn start(&self, task: Task, command: RunConfiguration) -> Result<TaskRun, StoreError> {
        let run = TaskRun::new(task, command);
        let stored = run.clone();

        let _guard = self.writer.lock().await;
        self.blocking(move |paths| {
            paths.update(|contents| {
                contents.runs.insert(stored.id.clone(), stored);
                Ok(())
            })
        })
        .await?;

        debug!(run_id = %run.id, "Run persisted");
        Ok(run)
    }

    async fn finish(&self, run_id: &RunId, result: TaskResult) -> Result<TaskRun, StoreError> {
        let run_id = run_id.clone();

        let _guard = self.writer.lock().await;
        self.blocking(move |paths| {
            paths.update(move |contents| {
                let run = contents
                    .runs
                    .get_mut(&run_id)
                    .ok_or_else(|| StoreError::RunNotFound(run_id.clone()))?;
                run.finish(result)
                    .map_err(|_| StoreError::AlreadyFinished(run_id.clone()))?;
                Ok(run.clone())
            })
        })
        .await
    }

    async fn get(&self, run_id: &RunId) -> Result<TaskRun, StoreError> {
        let run_id = run_id.clone();
        self.blocking(move |paths| {
            let mut contents = paths.load_shared()?;
            contents
                .runs
                .shift_remove(&run_id)
                .ok_or(StoreError::RunNotFound(run_id))
        })
        .await
    }

    async fn previews(&self) -> Result<Vec<TaskRunPreview>, StoreError> {
        self.blocking(|paths| {
            let contents = paths.load_shared()?;
            Ok(contents.runs.values().map(TaskRun::to_preview).collect())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use crate::store::contract;
    use gaiarun_core::TaskId;

    fn temp_store() -> (tempfile::TempDir, FileRunStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRunStore::open(dir.path().join("runs.json")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_start_then_get() {
        let (_dir, store) = temp_store();
        contract::start_then_get_is_running(&store).await;
    }

    #[tokio::test]
    async fn test_finish_then_get() {
        let (_dir, store) = temp_store();
        contract::finish_then_get_has_result(&store).await;
    }

    #[tokio::test]
    async fn test_second_finish() {
        let (_dir, store) = temp_store();
        contract::second_finish_is_rejected(&store).await;
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let (_dir, store) = temp_store();
        contract::unknown_ids_are_not_found(&store).await;
    }

    #[tokio::test]
    async fn test_previews() {
        let (_dir, store) = temp_store();
        contract::previews_count_every_start(&store).await;
    }

    #[tokio::test]
    async fn test_creates_empty_file() {
        let (dir, store) = temp_store();
        let raw = fs::read_to_string(dir.path().join("runs.json")).unwrap();
        assert_eq!(raw, r#"{"runs":{}}"#);
        assert!(store.previews().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.json");

        let run_id = {
            let store = FileRunStore::open(&path).unwrap();
            let run = store
                .start(Task::new("t1", 1, "q", "7"), RunConfiguration::default())
                .await
                .unwrap();
            store
                .finish(&run.id, TaskResult::NotFound { transcript: vec![] })
                .await
                .unwrap();
            run.id
        };

        let reopened = FileRunStore::open(&path).unwrap();
        let run = reopened.get(&run_id).await.unwrap();
        assert_eq!(run.task.task_id, TaskId::new("t1"));
        assert!(run.is_finished());
    }

    #[tokio::test]
    async fn test_concurrent_finishes_lose_nothing() {
        let (_dir, store) = temp_store();
        let store = Arc::new(store);

        let mut ids = Vec::new();
        for i in 0..8 {
            let run = store
                .start(Task::new(format!("t{}", i), 1, "q", "7"), RunConfiguration::default())
                .await
                .unwrap();
            ids.push(run.id);
        }

        let mut handles = Vec::new();
        for id in ids.clone() {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .finish(&id, TaskResult::NotFound { transcript: vec![] })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let previews = store.previews().await.unwrap();
        assert_eq!(previews.len(), 8);
        assert!(previews.iter().all(|p| p.result.is_some()));
    }

    #[tokio::test]
    async fn test_two_instances_share_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.json");
        let a = FileRunStore::open(&path).unwrap();
        let b = FileRunStore::open(&path).unwrap();

        let run = a
            .start(Task::new("t1", 1, "q", "7"), RunConfiguration::default())
            .await
            .unwrap();
        b.finish(&run.id, TaskResult::NotFound { transcript: vec![] })
            .await
            .unwrap();

        assert!(a.get(&run.id).await.unwrap().is_finished());
    }
}
