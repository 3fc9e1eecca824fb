use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};

use super::AppState;
use crate::errors::AppResult;

pub async fn get_progress(
    Path(progress_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let session = state.progress.get_progress(&progress_id).await?;
    Ok(Json(session).into_response())
}
