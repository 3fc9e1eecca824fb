// Error types for each layer of the service, built on thiserror.
use thiserror::Error;

use crate::models::TaskStatus;

pub mod response;
pub mod service;
pub mod store;
pub mod worker;

pub use service::{ServiceError, ServiceResult};
pub use store::{LibraryError, ProgressError, TaskQueueError};
pub use worker::{PipelineError, PipelineResult, StepContext};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{message}")]
    Conflict {
        message: String,
        current_task: String,
    },

    #[error("Task not completed")]
    NotCompleted { status: TaskStatus, progress: u8 },

    #[error("Queue error: {0}")]
    Queue(#[from] TaskQueueError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Progress error: {0}")]
    Progress(#[from] ProgressError),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;
