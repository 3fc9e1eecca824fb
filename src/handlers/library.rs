use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use super::AppState;
use crate::errors::{AppError, AppResult};
use crate::models::CreateArtistForm;

const FEATURED_ARTISTS: usize = 5;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn list_artists(State(state): State<AppState>) -> AppResult<Response> {
    let artists = state.library.list_artists().await?;
    Ok(Json(json!({ "artists": artists })).into_response())
}

pub async fn create_artist(
    State(state): State<AppState>,
    Json(form): Json<CreateArtistForm>,
) -> AppResult<Response> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Artist name is required".into()));
    }

    state.library.create_artist(name).await?;
    tracing::info!("Created artist directory for {}", name);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Artist created", "name": name })),
    )
        .into_response())
}

pub async fn get_artist(
    Path(artist): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let info = state.library.artist_info(&artist).await?;
    Ok(Json(info).into_response())
}

pub async fn get_artist_songs(
    Path(artist): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let songs = state.library.artist_songs(&artist).await?;
    Ok(Json(json!({ "songs": songs })).into_response())
}

/// The first few artists with their song names, for the front page.
pub async fn artists_with_songs(State(state): State<AppState>) -> AppResult<Response> {
    let artists = state.library.list_artists().await?;

    let mut featured = Vec::new();
    for artist in artists.into_iter().take(FEATURED_ARTISTS) {
        let songs: Vec<String> = state
            .library
            .artist_songs(&artist)
            .await?
            .into_iter()
            .map(|song| song.name)
            .collect();
        featured.push(json!({ "name": artist, "songs": songs }));
    }

    Ok(Json(json!({ "artists": featured })).into_response())
}
