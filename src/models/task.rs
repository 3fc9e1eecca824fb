use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::errors::TaskQueueError;

const GENERATE_RADIO: &str = "generate_radio";

/// Kind of work a task performs. Anything the worker has no handler for is
/// kept verbatim so it can be reported back as unsupported.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum TaskKind {
    GenerateRadio,
    Unsupported(String),
}

impl TaskKind {
    pub fn as_str(&self) -> &str {
        match self {
            TaskKind::GenerateRadio => GENERATE_RADIO,
            TaskKind::Unsupported(name) => name,
        }
    }
}

impl From<String> for TaskKind {
    fn from(value: String) -> Self {
        if value == GENERATE_RADIO {
            TaskKind::GenerateRadio
        } else {
            TaskKind::Unsupported(value)
        }
    }
}

impl From<&str> for TaskKind {
    fn from(value: &str) -> Self {
        TaskKind::from(value.to_string())
    }
}

impl From<TaskKind> for String {
    fn from(kind: TaskKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn task_id(kind: &TaskKind, now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen();
    format!("{}_{}_{:04x}", kind, now.timestamp_millis(), suffix)
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub params: Value,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub current_step: Option<String>,
    pub progress: u8,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub log_file: String,
    pub output_file: Option<String>,
}

impl Task {
    pub fn new(kind: TaskKind, params: Value, now: DateTime<Utc>) -> Self {
        let id = task_id(&kind, now);
        let log_file = log_file_name(&id);

        Self {
            id,
            kind,
            params,
            status: TaskStatus::Pending,
            created_at: now,
            started_at: None,
            completed_at: None,
            current_step: None,
            progress: 0,
            result: None,
            error: None,
            log_file,
            output_file: None,
        }
    }

    /// Draws a fresh id suffix, keeping the type and creation time.
    pub fn reroll_id(&mut self) {
        self.id = task_id(&self.kind, self.created_at);
        self.log_file = log_file_name(&self.id);
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TaskQueueError> {
        self.transition(TaskStatus::Processing)?;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn complete(
        &mut self,
        now: DateTime<Utc>,
        result: Value,
        output_file: Option<String>,
    ) -> Result<(), TaskQueueError> {
        self.transition(TaskStatus::Completed)?;
        self.completed_at = Some(now);
        self.result = Some(result);
        self.output_file = output_file;
        Ok(())
    }

    pub fn fail(&mut self, now: DateTime<Utc>, error: String) -> Result<(), TaskQueueError> {
        self.transition(TaskStatus::Failed)?;
        self.completed_at = Some(now);
        self.error = Some(error);
        self.output_file = None;
        Ok(())
    }

    /// Progress only moves forward while the task is processing.
    pub fn record_progress(&mut self, step: &str, progress: u8) {
        if self.status != TaskStatus::Processing {
            return;
        }
        self.current_step = Some(step.to_string());
        self.progress = self.progress.max(progress.min(100));
    }

    pub fn view(&self) -> TaskStatusView {
        TaskStatusView {
            id: self.id.clone(),
            status: self.status,
            progress: self.progress,
            current_step: self.current_step.clone(),
            error: self.error.clone(),
            log_file: self.log_file.clone(),
            output_file: self.output_file.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }

    fn transition(&mut self, to: TaskStatus) -> Result<(), TaskQueueError> {
        let allowed = matches!(
            (self.status, to),
            (TaskStatus::Pending, TaskStatus::Processing)
                | (TaskStatus::Processing, TaskStatus::Completed)
                | (TaskStatus::Processing, TaskStatus::Failed)
        );
        if !allowed {
            return Err(TaskQueueError::InvalidTransition {
                task_id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

pub fn log_file_name(task_id: &str) -> String {
    format!("task_{}.log", task_id)
}

/// Read-only projection served by the status endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskStatusView {
    pub id: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub current_step: Option<String>,
    pub error: Option<String>,
    pub log_file: String,
    pub output_file: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Returned to the submitter right after enqueueing.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TaskReceipt {
    pub task_id: String,
    pub log_file: String,
    pub status: TaskStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending() -> Task {
        Task::new(TaskKind::GenerateRadio, json!({}), Utc::now())
    }

    #[test]
    fn id_carries_type_prefix_and_log_name() {
        let task = pending();
        assert!(task.id.starts_with("generate_radio_"));
        assert_eq!(task.log_file, format!("task_{}.log", task.id));
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        let mut task = pending();
        assert!(task.complete(Utc::now(), json!({}), None).is_err());

        task.start(Utc::now()).expect("pending -> processing");
        assert!(task.start(Utc::now()).is_err());

        task.fail(Utc::now(), "boom".into()).expect("processing -> failed");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("boom"));
        assert!(task.output_file.is_none());
        assert!(task.start(Utc::now()).is_err());
        assert!(task.complete(Utc::now(), json!({}), Some("x.mp3".into())).is_err());
    }

    #[test]
    fn progress_never_decreases() {
        let mut task = pending();
        task.record_progress("ignored", 50);
        assert_eq!(task.progress, 0, "pending tasks do not take progress");

        task.start(Utc::now()).unwrap();
        task.record_progress("script_generation", 40);
        task.record_progress("late_report", 20);
        assert_eq!(task.progress, 40);
        assert_eq!(task.current_step.as_deref(), Some("late_report"));

        task.record_progress("overflow", 250);
        assert_eq!(task.progress, 100);
    }

    #[test]
    fn unknown_kind_round_trips_as_string() {
        let kind: TaskKind = serde_json::from_value(json!("transcode")).unwrap();
        assert_eq!(kind, TaskKind::Unsupported("transcode".into()));
        assert_eq!(serde_json::to_value(&kind).unwrap(), json!("transcode"));
        assert_eq!(TaskKind::from("generate_radio"), TaskKind::GenerateRadio);
    }

    #[test]
    fn view_omits_params_and_result() {
        let mut task = pending();
        task.start(Utc::now()).unwrap();
        task.complete(Utc::now(), json!({"script": "hi"}), Some("a.mp3".into()))
            .unwrap();

        let view = serde_json::to_value(task.view()).unwrap();
        assert_eq!(view["status"], "completed");
        assert_eq!(view["output_file"], "a.mp3");
        assert!(view.get("params").is_none());
        assert!(view.get("result").is_none());
    }
}
