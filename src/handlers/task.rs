use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use super::AppState;
use crate::errors::{AppError, AppResult};
use crate::models::{GenerationRequest, TaskKind, TaskStatus};

pub async fn start_generation(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> AppResult<Response> {
    let params = request
        .into_params()
        .ok_or_else(|| AppError::BadRequest("Artist name is required".into()))?;

    if let Some(current_task) = state.queue.current_task() {
        tracing::info!(
            "Rejecting generation for {}: task {} in progress",
            params.artist_name,
            current_task
        );
        return Err(AppError::Conflict {
            message: "A radio generation task is already in progress".into(),
            current_task,
        });
    }

    tracing::info!("Starting radio generation for artist: {}", params.artist_name);
    let params = serde_json::to_value(&params).map_err(|e| AppError::Internal(e.to_string()))?;
    let receipt = state.queue.create_task(TaskKind::GenerateRadio, params)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Radio generation started",
            "task_id": receipt.task_id,
            "log_file": receipt.log_file,
            "status": receipt.status,
        })),
    )
        .into_response())
}

pub async fn get_task_status(
    Path(task_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    tracing::debug!("Checking status for task: {}", task_id);

    let view = state.queue.get_task_status(&task_id).ok_or_else(|| {
        tracing::warn!("Task not found: {}", task_id);
        AppError::NotFound(format!("Task {} not found", task_id))
    })?;

    Ok(Json(view).into_response())
}

pub async fn get_task_log(
    Path(task_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    if !is_task_id(&task_id) {
        return Err(AppError::NotFound(format!("Log for task {} not found", task_id)));
    }

    let content = match tokio::fs::read_to_string(state.queue.log_path(&task_id)).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("Log for task {} not found", task_id)));
        }
        Err(e) => return Err(AppError::File(e)),
    };

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        content,
    )
        .into_response())
}

pub async fn get_task_output(
    Path(task_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    tracing::info!("Starting download for task: {}", task_id);

    let task = state
        .queue
        .get_task(&task_id)
        .ok_or_else(|| AppError::NotFound(format!("Task {} not found", task_id)))?;

    if task.status != TaskStatus::Completed {
        return Err(AppError::NotCompleted {
            status: task.status,
            progress: task.progress,
        });
    }

    let filename = task
        .output_file
        .ok_or_else(|| AppError::NotFound(format!("Task {} has no output file", task_id)))?;
    let path = state.audio_dir.join(&filename);

    let file = File::open(&path).await.map_err(|e| {
        tracing::error!("Failed to open output file {}: {}", path.display(), e);
        AppError::File(e)
    })?;
    let file_size = file.metadata().await?.len();

    let body = Body::from_stream(ReaderStream::new(file));
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename*=UTF-8''{}",
                urlencoding::encode(&filename)
            ),
        )
        .header(header::CONTENT_LENGTH, file_size.to_string())
        .body(body)
        .map_err(|e| {
            tracing::error!("Failed to build download response: {}", e);
            AppError::Internal(format!("Failed to build download response: {}", e))
        })?;

    tracing::debug!("Sending {} ({} bytes) for task {}", filename, file_size, task_id);
    Ok(response)
}

fn is_task_id(task_id: &str) -> bool {
    !task_id.is_empty()
        && task_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
