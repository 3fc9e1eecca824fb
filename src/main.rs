mod config;
mod errors;
mod handlers;
mod models;
mod services;
mod worker;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::handlers::AppState;
use crate::services::{
    script_generator::load_templates, CommandTranscriber, ElevenLabsSynthesizer, FfmpegMixer,
    LlmScriptGenerator, MusicLibrary, ProgressStore, TaskQueue,
};
use crate::worker::{Collaborators, RadioPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load().context("Failed to load configuration")?;
    config
        .ensure_directories()
        .context("Failed to create storage directories")?;

    let library = MusicLibrary::new(&config.storage.music_dir);
    let progress = ProgressStore::new(&config.storage.progress_dir);
    let audio_dir = config.storage.audio_dir();

    let templates = load_templates(config.generator.templates_path.as_deref());
    tracing::info!("Loaded {} intro templates", templates.len());

    let services = Collaborators {
        transcriber: Arc::new(CommandTranscriber::new(config.transcriber.clone())),
        generator: Arc::new(LlmScriptGenerator::new(config.generator.clone(), templates)),
        synthesizer: Arc::new(ElevenLabsSynthesizer::new(config.speech.clone())),
        mixer: Arc::new(FfmpegMixer::new(config.mixer.ffmpeg_path.clone())),
    };
    let pipeline = RadioPipeline::new(library.clone(), progress.clone(), &audio_dir, services);
    let queue = TaskQueue::new(
        Arc::new(pipeline),
        &config.storage.logs_dir,
        config.worker.clone(),
    );

    let state = AppState {
        queue,
        library,
        progress,
        audio_dir,
        output_dir: config.storage.output_dir.clone(),
    };
    let app = handlers::router(state, config.upload.max_body_size);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("Server running on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
