use std::path::PathBuf;
use thiserror::Error;

use super::{LibraryError, ServiceError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No songs found for artist: {0}")]
    NoSongs(String),

    #[error("{0}")]
    Library(#[from] LibraryError),

    #[error("Invalid task parameters: {0}")]
    InvalidParams(#[from] serde_json::Error),

    #[error("unsupported task type: {0}")]
    UnsupportedTaskType(String),

    #[error("Generated script is empty")]
    EmptyScript,

    #[error("Song file not found: {}", .0.display())]
    SongMissing(PathBuf),

    #[error("Failed to create audio file: {}", .0.display())]
    MissingAudio(PathBuf),

    #[error("Could not store audio file {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Audio mixer could not combine {0} files")]
    CombineFailed(usize),

    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("Task panicked: {0}")]
    TaskPanic(String),

    #[error("{step} failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<PipelineError>,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Wraps any pipeline error with the name of the step it happened in.
pub trait StepContext<T> {
    fn step(self, step: &'static str) -> PipelineResult<T>;
}

impl<T, E> StepContext<T> for Result<T, E>
where
    E: Into<PipelineError>,
{
    fn step(self, step: &'static str) -> PipelineResult<T> {
        self.map_err(|e| PipelineError::Step {
            step,
            source: Box::new(e.into()),
        })
    }
}
