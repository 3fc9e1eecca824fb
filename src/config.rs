use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub worker: WorkerConfig,
    pub upload: UploadConfig,
    pub generator: GeneratorConfig,
    pub speech: SpeechConfig,
    pub mixer: MixerConfig,
    pub transcriber: TranscriberConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub music_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub progress_dir: PathBuf,
}

impl StorageConfig {
    /// Directory holding synthesized intros, transitions and full shows.
    pub fn audio_dir(&self) -> PathBuf {
        self.cache_dir.join("audio")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    pub queue_capacity: usize,
    pub poll_interval_ms: u64,
    pub task_ttl_secs: u64,
    pub reap_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            poll_interval_ms: 1000,
            task_ttl_secs: 24 * 60 * 60,
            reap_interval_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub max_body_size: usize, // request bodies are small JSON documents
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    pub use_openai: bool,
    pub openai_url: String,
    #[serde(default)]
    pub openai_api_key: String,
    pub openai_model: String,
    pub local_url: String,
    pub local_model: String,
    pub templates_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpeechConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub voice_id: String,
    pub model_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MixerConfig {
    pub ffmpeg_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranscriberConfig {
    pub program: String,
    /// Arguments passed to `program`; `{input}` is replaced by the song path.
    pub args: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Creates every storage directory the service writes into.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [
            &self.storage.music_dir,
            &self.storage.output_dir,
            &self.storage.logs_dir,
            &self.storage.progress_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::create_dir_all(self.storage.audio_dir())
    }
}
