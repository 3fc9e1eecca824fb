use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};

use crate::models::log_file_name;

#[derive(Debug, Clone, Copy)]
enum Level {
    Info,
    Warning,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }
}

/// Background writer for the log file. Dropping the guard flushes every
/// queued line and stops the writer thread.
struct FileSink {
    writer: NonBlocking,
    _guard: WorkerGuard,
}

/// Log sink for one task: every line goes to the console subscriber and,
/// when the file could be opened, to `task_{id}.log`. File writes are handed
/// to a `tracing-appender` writer thread and never touch the runtime.
pub struct TaskLog {
    task_id: String,
    path: PathBuf,
    sink: Mutex<Option<FileSink>>,
}

impl TaskLog {
    /// Opens (appending) the task's log file. Failure to open degrades to
    /// console-only logging.
    pub async fn open(log_dir: &Path, task_id: &str) -> Self {
        let path = log_dir.join(log_file_name(task_id));
        let sink = match open_append(log_dir, &path).await {
            Ok(file) => {
                let (writer, guard) = NonBlockingBuilder::default().lossy(false).finish(file);
                Some(FileSink {
                    writer,
                    _guard: guard,
                })
            }
            Err(e) => {
                tracing::warn!(
                    "Could not open log file {} for task {}: {}",
                    path.display(),
                    task_id,
                    e
                );
                None
            }
        };

        Self {
            task_id: task_id.to_string(),
            path,
            sink: Mutex::new(sink),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.write(Level::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.write(Level::Warning, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.write(Level::Error, message.as_ref());
    }

    /// Flushes the file and detaches it. Later lines only reach the console.
    pub async fn close(&self) {
        let sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(sink) = sink else {
            return;
        };
        // The guard joins the writer thread on drop.
        if let Err(e) = tokio::task::spawn_blocking(move || drop(sink)).await {
            tracing::warn!("Failed to flush log for task {}: {}", self.task_id, e);
        }
    }

    fn write(&self, level: Level, message: &str) {
        match level {
            Level::Info => tracing::info!(task_id = %self.task_id, "{}", message),
            Level::Warning => tracing::warn!(task_id = %self.task_id, "{}", message),
            Level::Error => tracing::error!(task_id = %self.task_id, "{}", message),
        }

        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sink) = sink.as_mut() else {
            return;
        };
        let line = format!(
            "{} - {} - {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            level.as_str(),
            message
        );
        if let Err(e) = sink.writer.write_all(line.as_bytes()) {
            tracing::warn!("Failed to write log for task {}: {}", self.task_id, e);
        }
    }
}

async fn open_append(log_dir: &Path, path: &Path) -> std::io::Result<std::fs::File> {
    tokio::fs::create_dir_all(log_dir).await?;
    let file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    Ok(file.into_std().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lines_are_appended_with_level() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = TaskLog::open(dir.path(), "generate_radio_1").await;
        log.info("first");
        log.error("second");
        log.close().await;

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - INFO - first"));
        assert!(lines[1].ends_with(" - ERROR - second"));
        assert_eq!(log.path().file_name().unwrap(), "task_generate_radio_1.log");
    }

    #[tokio::test]
    async fn lines_after_close_stay_on_the_console() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = TaskLog::open(dir.path(), "t").await;
        log.info("kept");
        log.close().await;
        log.info("console only");
        log.close().await;

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[tokio::test]
    async fn reopening_appends_to_the_same_file() {
        let dir = tempfile::TempDir::new().unwrap();
        for message in ["one", "two"] {
            let log = TaskLog::open(dir.path(), "t").await;
            log.info(message);
            log.close().await;
        }

        let content = std::fs::read_to_string(dir.path().join("task_t.log")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn unopenable_file_falls_back_to_console() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"").unwrap();

        let log = TaskLog::open(&blocker, "t").await;
        log.info("still fine");
        assert!(!log.path().exists());
        log.close().await;
    }
}
