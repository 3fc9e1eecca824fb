use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use crate::errors::{AppError, LibraryError, ProgressError, TaskQueueError};

// The IntoResponse trait implementation converts AppError into a JSON error response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, msg),

            AppError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, msg),

            // A busy worker tells the caller which task holds it
            AppError::Conflict { message, current_task } => (
                StatusCode::CONFLICT,
                Json(json!({ "error": message, "current_task": current_task })),
            )
                .into_response(),

            AppError::NotCompleted { status, progress } => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Task not completed",
                    "status": status,
                    "progress": progress,
                })),
            )
                .into_response(),

            AppError::Queue(err) => convert_queue_error(err),

            AppError::Library(err) => convert_library_error(err),

            AppError::Progress(ProgressError::NotFound(id)) => error_body(
                StatusCode::NOT_FOUND,
                format!("Progress session {} not found", id),
            ),

            AppError::Progress(err) => internal(err.to_string()),

            AppError::File(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error_body(StatusCode::NOT_FOUND, format!("File not found: {}", e))
            }

            AppError::File(e) => internal(format!("File error: {}", e)),

            AppError::Internal(msg) => internal(msg),
        }
    }
}

fn convert_queue_error(err: TaskQueueError) -> Response {
    match err {
        TaskQueueError::QueueFull(_) | TaskQueueError::NotInitialized | TaskQueueError::WorkerStopped => {
            error_body(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        TaskQueueError::InvalidTransition { .. } => internal(err.to_string()),
    }
}

fn convert_library_error(err: LibraryError) -> Response {
    match err {
        LibraryError::ArtistNotFound(_) => error_body(StatusCode::NOT_FOUND, err.to_string()),
        LibraryError::ArtistExists(_) => error_body(StatusCode::CONFLICT, err.to_string()),
        LibraryError::InvalidArtistName(_) => error_body(StatusCode::BAD_REQUEST, err.to_string()),
        LibraryError::Io(_) => internal(err.to_string()),
    }
}

fn internal(message: String) -> Response {
    tracing::error!("Internal error: {}", message);
    error_body(StatusCode::INTERNAL_SERVER_ERROR, message)
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}
