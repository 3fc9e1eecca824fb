mod library;
mod progress;
mod task;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    routing::post,
    Router,
};
use std::path::PathBuf;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use crate::services::{MusicLibrary, ProgressStore, TaskQueue};

pub use library::{artists_with_songs, create_artist, get_artist, get_artist_songs, health, list_artists};
pub use progress::get_progress;
pub use task::{get_task_log, get_task_output, get_task_status, start_generation};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub queue: TaskQueue,
    pub library: MusicLibrary,
    pub progress: ProgressStore,
    pub audio_dir: PathBuf,
    pub output_dir: PathBuf,
}

pub fn router(state: AppState, max_body_size: usize) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/artists", get(list_artists).post(create_artist))
        .route("/artists/:artist", get(get_artist))
        .route("/artists/:artist/songs", get(get_artist_songs))
        .route("/artists-with-songs", get(artists_with_songs))
        .route("/start-generation", post(start_generation))
        .route("/task-status/:task_id", get(get_task_status))
        .route("/task-log/:task_id", get(get_task_log))
        .route("/task-output/:task_id", get(get_task_output))
        .route("/progress/:progress_id", get(get_progress))
        .nest_service("/audio", ServeDir::new(&state.audio_dir))
        .nest_service("/output", ServeDir::new(&state.output_dir));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .with_state(state)
}
