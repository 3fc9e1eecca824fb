use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::config::WorkerConfig;
use crate::errors::TaskQueueError;
use crate::models::{Task, TaskKind, TaskReceipt, TaskStatusView};
use crate::services::task_log::TaskLog;
use crate::worker::{self, RadioPipeline};

/// What a finished pipeline hands back to the queue.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub result: Value,
    pub output_file: Option<String>,
}

#[derive(Default)]
struct QueueState {
    tasks: HashMap<String, Task>,
    current_task: Option<String>,
    active_log: Option<Arc<TaskLog>>,
}

impl QueueState {
    /// Stores the task under an id no other task holds and returns that id.
    fn register(&mut self, mut task: Task) -> String {
        loop {
            match self.tasks.entry(task.id.clone()) {
                Entry::Vacant(slot) => {
                    let id = task.id.clone();
                    slot.insert(task);
                    return id;
                }
                Entry::Occupied(_) => task.reroll_id(),
            }
        }
    }
}

struct QueueInner {
    state: Mutex<QueueState>,
    sender: mpsc::Sender<String>,
    receiver: Mutex<Option<mpsc::Receiver<String>>>,
    pipeline: Arc<RadioPipeline>,
    log_dir: PathBuf,
    config: WorkerConfig,
}

/// In-memory task table plus a bounded FIFO of task ids drained by a single
/// background worker. Cloning shares the same queue.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<QueueInner>,
}

impl TaskQueue {
    pub fn new(pipeline: Arc<RadioPipeline>, log_dir: impl Into<PathBuf>, config: WorkerConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                sender,
                receiver: Mutex::new(Some(receiver)),
                pipeline,
                log_dir: log_dir.into(),
                config,
            }),
        }
    }

    /// Registers a pending task and enqueues it, starting the worker on first
    /// use. Never waits for room in the queue.
    pub fn create_task(&self, kind: TaskKind, params: Value) -> Result<TaskReceipt, TaskQueueError> {
        let runtime = Handle::try_current().map_err(|_| TaskQueueError::NotInitialized)?;

        let task = Task::new(kind, params, Utc::now());
        let status = task.status;
        let kind = task.kind.to_string();
        let task_id = self.state().register(task);
        let receipt = TaskReceipt {
            task_id: task_id.clone(),
            log_file: self.log_path(&task_id).to_string_lossy().into_owned(),
            status,
        };

        if let Err(e) = self.inner.sender.try_send(task_id.clone()) {
            self.state().tasks.remove(&task_id);
            return Err(match e {
                TrySendError::Full(_) => TaskQueueError::QueueFull(self.inner.config.queue_capacity),
                TrySendError::Closed(_) => TaskQueueError::WorkerStopped,
            });
        }

        self.ensure_worker(&runtime);
        tracing::info!("Created task {} ({})", receipt.task_id, kind);
        Ok(receipt)
    }

    pub fn get_task_status(&self, task_id: &str) -> Option<TaskStatusView> {
        self.state().tasks.get(task_id).map(Task::view)
    }

    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        self.state().tasks.get(task_id).cloned()
    }

    pub fn current_task(&self) -> Option<String> {
        self.state().current_task.clone()
    }

    /// Records pipeline progress on the task and appends it to the task log.
    pub fn update_task_progress(&self, task_id: &str, step: &str, progress: u8, message: &str) {
        let log = {
            let mut state = self.state();
            match state.tasks.get_mut(task_id) {
                Some(task) => task.record_progress(step, progress),
                None => {
                    tracing::warn!("Progress update for unknown task {}", task_id);
                    return;
                }
            }
            state
                .active_log
                .clone()
                .filter(|_| state.current_task.as_deref() == Some(task_id))
        };

        let line = format!("Task {} - {}: {}", task_id, step, message);
        match log {
            Some(log) => log.info(line),
            None => tracing::info!("{}", line),
        }
    }

    /// Drops terminal tasks whose completion is older than the configured
    /// retention. Returns how many were removed.
    pub fn reap_expired(&self, now: DateTime<Utc>) -> usize {
        let ttl = ChronoDuration::seconds(self.inner.config.task_ttl_secs as i64);
        let mut state = self.state();
        let before = state.tasks.len();
        state.tasks.retain(|_, task| {
            !(task.status.is_terminal()
                && task.completed_at.is_some_and(|done| done + ttl <= now))
        });
        before - state.tasks.len()
    }

    pub fn log_path(&self, task_id: &str) -> PathBuf {
        self.inner.log_dir.join(crate::models::log_file_name(task_id))
    }

    pub(crate) fn log_dir(&self) -> &Path {
        &self.inner.log_dir
    }

    pub(crate) fn pipeline(&self) -> Arc<RadioPipeline> {
        self.inner.pipeline.clone()
    }

    /// Moves a pending task to processing and publishes it as the current
    /// task. Returns the task snapshot to execute.
    pub(crate) fn claim(&self, task_id: &str, log: Arc<TaskLog>) -> Option<Task> {
        let mut state = self.state();
        let task = state.tasks.get_mut(task_id)?;
        if let Err(e) = task.start(Utc::now()) {
            tracing::warn!("Skipping task {}: {}", task_id, e);
            return None;
        }
        let snapshot = task.clone();
        state.current_task = Some(task_id.to_string());
        state.active_log = Some(log);
        Some(snapshot)
    }

    pub(crate) fn finish(&self, task_id: &str, outcome: Result<TaskOutcome, String>) {
        let mut state = self.state();
        let Some(task) = state.tasks.get_mut(task_id) else {
            tracing::warn!("Finished task {} is no longer tracked", task_id);
            return;
        };
        let now = Utc::now();
        let recorded = match outcome {
            Ok(outcome) => task.complete(now, outcome.result, outcome.output_file),
            Err(error) => task.fail(now, error),
        };
        if let Err(e) = recorded {
            tracing::error!("Could not record outcome of task {}: {}", task_id, e);
        }
    }

    /// Clears the current-task pointer if it still names `task_id`.
    pub(crate) fn release(&self, task_id: &str) {
        let mut state = self.state();
        if state.current_task.as_deref() == Some(task_id) {
            state.current_task = None;
            state.active_log = None;
        }
    }

    fn ensure_worker(&self, runtime: &Handle) {
        let receiver = self
            .inner
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(receiver) = receiver else {
            return;
        };

        tracing::info!("Starting task worker");
        let poll_interval = Duration::from_millis(self.inner.config.poll_interval_ms);
        runtime.spawn(worker::worker_process(self.clone(), receiver, poll_interval));

        let reap_every = Duration::from_secs(self.inner.config.reap_interval_secs.max(1));
        let queue = self.clone();
        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(reap_every);
            // First tick fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let reaped = queue.reap_expired(Utc::now());
                if reaped > 0 {
                    tracing::info!("Reaped {} expired tasks", reaped);
                }
            }
        });
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle the pipeline uses to report on the task it is executing.
#[derive(Clone)]
pub struct TaskContext {
    queue: TaskQueue,
    task_id: String,
    log: Arc<TaskLog>,
}

impl TaskContext {
    pub(crate) fn new(queue: TaskQueue, task_id: String, log: Arc<TaskLog>) -> Self {
        Self { queue, task_id, log }
    }

    pub fn log(&self) -> &TaskLog {
        &self.log
    }

    pub fn progress(&self, step: &str, progress: u8, message: &str) {
        self.queue
            .update_task_progress(&self.task_id, step, progress, message);
    }
}
