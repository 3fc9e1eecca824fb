use std::io;
use thiserror::Error;

use crate::models::TaskStatus;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Artist directory '{0}' does not exist")]
    ArtistNotFound(String),

    #[error("Artist directory '{0}' already exists")]
    ArtistExists(String),

    #[error("Invalid artist name: '{0}'")]
    InvalidArtistName(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Progress session {0} not found")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed progress document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum TaskQueueError {
    #[error("Task queue is not initialized: no async runtime available for the worker")]
    NotInitialized,

    #[error("Task queue is full ({0} tasks waiting)")]
    QueueFull(usize),

    #[error("Task worker is not running")]
    WorkerStopped,

    #[error("Task {task_id} cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}
