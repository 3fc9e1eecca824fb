use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use crate::errors::{PipelineError, PipelineResult};
use crate::models::{GenerateRadioParams, Task, TaskKind};
use crate::services::task_log::TaskLog;
use crate::services::task_queue::{TaskContext, TaskOutcome, TaskQueue};

/// Drains the task queue one id at a time for the lifetime of the process.
pub async fn worker_process(queue: TaskQueue, mut receiver: mpsc::Receiver<String>, poll_interval: Duration) {
    tracing::info!("Worker started");

    loop {
        let task_id = match timeout(poll_interval, receiver.recv()).await {
            Ok(Some(task_id)) => task_id,
            Ok(None) => {
                tracing::info!("Task queue closed, worker stopping");
                break;
            }
            // Idle; keep waiting.
            Err(_) => continue,
        };

        process_task(&queue, &task_id).await;
    }
}

/// Clears the queue's current-task pointer when the task is done with,
/// however processing ends.
struct Release<'a> {
    queue: &'a TaskQueue,
    task_id: &'a str,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.queue.release(self.task_id);
    }
}

async fn process_task(queue: &TaskQueue, task_id: &str) {
    let log = Arc::new(TaskLog::open(queue.log_dir(), task_id).await);
    log.info(format!("=== Starting new task: {} ===", task_id));
    log.info(format!("Log file: {}", log.path().display()));

    let Some(task) = queue.claim(task_id, log.clone()) else {
        log.warn(format!("Task {} is not pending, skipping", task_id));
        log.close().await;
        return;
    };
    let release = Release { queue, task_id };

    log.info(format!("Processing task {} of type {}", task_id, task.kind));
    let outcome = run_task(queue, task, log.clone()).await;
    match &outcome {
        Ok(_) => log.info(format!("Task {} completed successfully", task_id)),
        Err(e) => log.error(format!("Task {} failed: {}", task_id, e)),
    }
    log.info(format!("=== Task {} finished ===", task_id));

    // The file is complete before the outcome becomes visible.
    log.close().await;
    queue.finish(task_id, outcome.map_err(|e| e.to_string()));
    drop(release);
}

async fn run_task(queue: &TaskQueue, task: Task, log: Arc<TaskLog>) -> PipelineResult<TaskOutcome> {
    match task.kind {
        TaskKind::GenerateRadio => {
            let params: GenerateRadioParams = serde_json::from_value(task.params)?;
            let pipeline = queue.pipeline();
            let ctx = TaskContext::new(queue.clone(), task.id, log);

            // A panicking pipeline surfaces as a JoinError instead of taking
            // the worker down with it.
            tokio::spawn(async move { pipeline.run(&ctx, params).await })
                .await
                .unwrap_or_else(|e| Err(PipelineError::TaskPanic(e.to_string())))
        }
        TaskKind::Unsupported(kind) => Err(PipelineError::UnsupportedTaskType(kind)),
    }
}
